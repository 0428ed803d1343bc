//! Mock heart-rate sensor.
//!
//! Resting-pulse simulation: a fresh value in the 60–80 bpm band on
//! every sample tick.

const BPM_FLOOR: u8 = 60;
const BPM_SPAN: u32 = 21; // inclusive ceiling of 80

pub struct HeartRateSensor {
    bpm: u8,
}

impl HeartRateSensor {
    pub fn new() -> Self {
        Self { bpm: 70 }
    }

    pub fn bpm(&self) -> u8 {
        self.bpm
    }

    /// Refresh the value. Called on the heart-rate sample tick.
    pub fn sample(&mut self) {
        self.bpm = BPM_FLOOR + (super::random_u32() % BPM_SPAN) as u8;
    }
}

impl Default for HeartRateSensor {
    fn default() -> Self {
        Self::new()
    }
}
