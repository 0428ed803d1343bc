//! Outbound server events.
//!
//! The [`GattServer`](super::server::GattServer) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them — log to serial, mirror to telemetry, etc.
//! Purely observational: no event ever feeds back into server logic.

use super::{AttHandle, CharacteristicId, ConnHandle, Uuid};

/// Structured events emitted by the attribute-server core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A service finished registering with the transport stack.
    ServiceRegistered { uuid: Uuid, handle: AttHandle },

    /// A characteristic's value handle was bound.
    CharacteristicRegistered {
        id: CharacteristicId,
        uuid: Uuid,
        value_handle: AttHandle,
    },

    /// A CCCD descriptor was created for a notifiable characteristic.
    DescriptorRegistered {
        id: CharacteristicId,
        cccd_handle: AttHandle,
    },

    /// A subscribe/unsubscribe event updated a subscription slot.
    /// Carries the new state of the slot, not a delta.
    SubscriptionChanged {
        id: CharacteristicId,
        conn: Option<ConnHandle>,
        enabled: bool,
    },
}
