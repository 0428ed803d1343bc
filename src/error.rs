//! Unified error type for the sensor-node firmware.
//!
//! Each subsystem's error converts into the one `Error` enum, so startup
//! code handles a single type. Variants are `Copy` and allocation-free;
//! `main` wraps whatever reaches it in `anyhow` for the final report.

use core::fmt;

use crate::gatt::ports::{IndicationError, RegistrationError};

// ---------------------------------------------------------------------------
// Firmware error
// ---------------------------------------------------------------------------

/// What any fallible startup or runtime step reports upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Building the attribute table into the BLE stack failed.
    Registration(RegistrationError),
    /// An indication send was refused by the stack.
    Indication(IndicationError),
    /// BLE controller / host bring-up failed.
    BleInit(&'static str),
    /// A driver or peripheral did not come up.
    Init(&'static str),
    /// Stored or supplied configuration was unusable.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registration(e) => write!(f, "registration: {e}"),
            Self::Indication(e) => write!(f, "indication: {e}"),
            Self::BleInit(msg) => write!(f, "ble init: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<RegistrationError> for Error {
    fn from(e: RegistrationError) -> Self {
        Self::Registration(e)
    }
}

impl From<IndicationError> for Error {
    fn from(e: IndicationError) -> Self {
        Self::Indication(e)
    }
}

// ---------------------------------------------------------------------------
// Result alias
// ---------------------------------------------------------------------------

/// Shorthand used throughout the firmware.
pub type Result<T> = core::result::Result<T, Error>;
