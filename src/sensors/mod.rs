//! Sensor subsystem — the mock quantity generators behind the GATT table.
//!
//! The reference board carries no physical heart-rate or environment
//! part; both drivers synthesize plausible values on each sample tick,
//! the same shapes a real driver would produce. The hardware adapter
//! aggregates them into the `ValueSource` the attribute server reads.

pub mod env;
pub mod heart_rate;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU32, Ordering};

/// Hardware RNG on target; deterministic xorshift on host so tests can
/// assert jitter ranges without a device.
#[cfg(target_os = "espidf")]
pub(crate) fn random_u32() -> u32 {
    // SAFETY: esp_random has no preconditions once the system is up.
    unsafe { esp_idf_svc::sys::esp_random() }
}

#[cfg(not(target_os = "espidf"))]
static SIM_RNG_STATE: AtomicU32 = AtomicU32::new(0x2545_F491);

#[cfg(not(target_os = "espidf"))]
pub(crate) fn random_u32() -> u32 {
    // xorshift32 — quality is irrelevant, only spread matters.
    let mut x = SIM_RNG_STATE.load(Ordering::Relaxed);
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    SIM_RNG_STATE.store(x, Ordering::Relaxed);
    x
}
