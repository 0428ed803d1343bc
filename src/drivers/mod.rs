//! Peripheral drivers: the LED output and the sampling tick timers.

pub mod hw_timer;
pub mod led;
