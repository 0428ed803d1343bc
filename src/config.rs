//! Tunable parameters for the sensor node.
//!
//! Values can be overridden via NVS (non-volatile storage); defaults
//! apply on first boot or after a corrupt/obsolete blob.

use core::fmt;

use serde::{Deserialize, Serialize};

/// GAP device name length cap (fits the advertising payload).
pub const MAX_DEVICE_NAME_LEN: usize = 24;

/// Everything the node reads at boot, as one persistable struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Identity ---
    /// GAP device name carried in advertising data
    pub device_name: heapless::String<MAX_DEVICE_NAME_LEN>,

    // --- Timing ---
    /// Heart-rate sample/notify interval (milliseconds)
    pub heart_rate_interval_ms: u32,
    /// Environment sample/notify interval (milliseconds)
    pub env_sample_interval_ms: u32,

    // --- Mock sensor tuning ---
    /// Base temperature the mock sensor jitters above (Celsius)
    pub temperature_base_c: f32,
    /// Base relative humidity the mock sensor jitters above (%)
    pub humidity_base_pct: f32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        // Fits well inside MAX_DEVICE_NAME_LEN; push cannot fail.
        let _ = device_name.push_str("SensorNode");
        Self {
            device_name,

            // Timing
            heart_rate_interval_ms: 1000,  // 1 Hz
            env_sample_interval_ms: 2000,  // 0.5 Hz

            // Mock sensors
            temperature_base_c: 25.0,
            humidity_base_pct: 70.0,
        }
    }
}

impl SystemConfig {
    /// Reject blobs that deserialize but carry unusable values —
    /// a zero interval would wedge the esp_timer setup.
    pub fn is_valid(&self) -> bool {
        !self.device_name.is_empty()
            && self.heart_rate_interval_ms > 0
            && self.env_sample_interval_ms > 0
            && self.temperature_base_c.is_finite()
            && self.humidity_base_pct.is_finite()
    }
}

// ── Persistence boundary ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored blob did not deserialize into a `SystemConfig`.
    Corrupted,
    /// Config failed range validation before persistence.
    ValidationFailed(&'static str),
    /// Backing store read/write failed.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "stored config is corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::IoError => write!(f, "config store I/O error"),
        }
    }
}

/// Load/persist boundary for [`SystemConfig`]. Backed by NVS on the
/// device and an in-memory map in simulation.
pub trait ConfigPort {
    fn load(&self) -> Result<SystemConfig, ConfigError>;
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}
