//! Mock environment sensor (temperature + relative humidity).
//!
//! First-boot values are fixed seeds; each sample tick replaces them
//! with base + small random jitter. Peers therefore see the seed pair
//! until the first tick lands, then a slowly wandering pair.

/// Value served before the first sample tick (°C).
const SEED_TEMPERATURE_C: f32 = 26.5;
/// Value served before the first sample tick (% RH).
const SEED_HUMIDITY_PCT: f32 = 88.5;

/// Jitter span added above the configured base on each sample.
const JITTER_SPAN: u32 = 15;

pub struct EnvSensor {
    temperature_c: f32,
    humidity_pct: f32,
    base_temperature_c: f32,
    base_humidity_pct: f32,
}

impl EnvSensor {
    pub fn new(base_temperature_c: f32, base_humidity_pct: f32) -> Self {
        Self {
            temperature_c: SEED_TEMPERATURE_C,
            humidity_pct: SEED_HUMIDITY_PCT,
            base_temperature_c,
            base_humidity_pct,
        }
    }

    pub fn temperature_c(&self) -> f32 {
        self.temperature_c
    }

    pub fn humidity_pct(&self) -> f32 {
        self.humidity_pct
    }

    /// Refresh both quantities. Called on the environment sample tick.
    pub fn sample(&mut self) {
        self.temperature_c =
            self.base_temperature_c + (super::random_u32() % JITTER_SPAN) as f32;
        self.humidity_pct =
            self.base_humidity_pct + (super::random_u32() % JITTER_SPAN) as f32;
    }
}
