//! SensorNode Firmware — Main Entry Point
//!
//! Hexagonal architecture: a transport-neutral GATT server core wired
//! to the platform through port traits at the boundary.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BleTransport          HardwareAdapter        NvsAdapter       │
//! │  (Registrar+Sender)    (ValueSource)          (ConfigPort)     │
//! │  LogEventSink                                                  │
//! │  (EventSink)                                                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              GattServer (pure logic)                   │    │
//! │  │  registry · access dispatch · subscriptions · notify   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  esp_timer ticks → lock-free event queue → main loop           │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
pub mod config;
mod error;
mod events;
mod pins;

pub mod gatt;

mod adapters;
mod drivers;
mod sensors;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{info, warn};

use adapters::ble;
use adapters::hardware::HardwareAdapter;
use adapters::log_sink::LogEventSink;
use adapters::nvs::NvsAdapter;
use config::{ConfigPort, SystemConfig};
use gatt::registry::device_registry;
use gatt::server::GattServer;

/// Main-loop poll cadence. Sleeping between drains keeps the idle duty
/// cycle low; the queue absorbs anything the timers push meanwhile.
const EVENT_POLL_INTERVAL_MS: u64 = 50;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SensorNode v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}); defaults in effect, nothing will persist", e);
            NvsAdapter::unpersisted()
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config restored from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), rewriting defaults", e);
            let cfg = SystemConfig::default();
            if let Err(e) = nvs.save(&cfg) {
                warn!("Config save failed ({}), continuing unpersisted", e);
            }
            cfg
        }
    };
    info!(
        "Intervals: heart rate {} ms, environment {} ms",
        config.heart_rate_interval_ms, config.env_sample_interval_ms
    );

    // ── 3. Construct adapters and the server core ─────────────
    let hw = HardwareAdapter::new(&config);
    let server = GattServer::new(device_registry());
    ble::install_runtime(server, hw, LogEventSink);

    // ── 4. Bring up the transport and place the table ─────────
    ble::start_stack()?;
    ble::register_attributes()?;
    ble::start_advertising(config.device_name.as_str());

    // ── 5. Periodic sampling timers ───────────────────────────
    drivers::hw_timer::start_timers(
        config.heart_rate_interval_ms,
        config.env_sample_interval_ms,
    );

    info!("Startup complete; entering event loop");

    // ── 6. Event loop ─────────────────────────────────────────
    #[cfg(not(target_os = "espidf"))]
    let mut sim_heart_ms: u64 = 0;
    #[cfg(not(target_os = "espidf"))]
    let mut sim_env_ms: u64 = 0;

    loop {
        std::thread::sleep(std::time::Duration::from_millis(EVENT_POLL_INTERVAL_MS));

        // Simulate the periodic timers via the sleep cadence on
        // non-espidf targets. On real hardware, esp_timer callbacks
        // push these events from the timer task.
        #[cfg(not(target_os = "espidf"))]
        {
            sim_heart_ms += EVENT_POLL_INTERVAL_MS;
            if sim_heart_ms >= u64::from(config.heart_rate_interval_ms) {
                events::push_event(events::Event::HeartRateTick);
                sim_heart_ms = 0;
            }
            sim_env_ms += EVENT_POLL_INTERVAL_MS;
            if sim_env_ms >= u64::from(config.env_sample_interval_ms) {
                events::push_event(events::Event::EnvSampleTick);
                sim_env_ms = 0;
            }
        }

        events::drain_events(ble::dispatch_event);
    }
}
