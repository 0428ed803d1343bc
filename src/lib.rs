//! SensorNode firmware library.
//!
//! Exposes the transport-neutral GATT server core and the adapter ring
//! for integration testing and external inspection. All ESP-IDF-specific
//! code is guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod config;
pub mod error;
pub mod events;
pub mod gatt;

mod pins;

// Re-export the platform-facing modules so the crate compiles on the
// host; the actual FFI implementations are guarded by cfg attributes
// inside.
pub mod adapters;
pub mod drivers;
pub mod sensors;
