//! [`EventSink`] adapter that writes to the logger.
//!
//! Structured server events land on the ESP-IDF log output (UART /
//! USB-CDC in production). A future telemetry adapter would implement
//! the same trait.

use log::info;

use crate::gatt::events::ServerEvent;
use crate::gatt::ports::EventSink;

/// Adapter that logs every [`ServerEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::ServiceRegistered { uuid, handle } => {
                info!("REG | svc {} | handle={}", uuid, handle);
            }
            ServerEvent::CharacteristicRegistered {
                id,
                uuid,
                value_handle,
            } => {
                info!("REG | chr {:?} {} | val_handle={}", id, uuid, value_handle);
            }
            ServerEvent::DescriptorRegistered { id, cccd_handle } => {
                info!("REG | dsc {:?} cccd | handle={}", id, cccd_handle);
            }
            ServerEvent::SubscriptionChanged { id, conn, enabled } => match conn {
                Some(c) => info!(
                    "SUB | {:?} | conn={} | indications={}",
                    id,
                    c,
                    if *enabled { "on" } else { "off" }
                ),
                None if *enabled => info!("SUB | {:?} | stack-local | indications=on", id),
                None => info!("SUB | {:?} | cleared", id),
            },
        }
    }
}
