//! Subscription tracking for notifiable characteristics.
//!
//! Each characteristic carries one [`Subscription`] slot: at most one
//! subscriber connection plus an enabled flag, written by CCCD traffic.
//! A later subscriber silently replaces an earlier one — the protocol
//! serializes attribute access, so there is no race to arbitrate, and
//! replacement matches what a reconnecting central expects.
//!
//! Disconnects sweep the table: every slot held by the departing
//! connection is cleared so no indication is ever aimed at a dead
//! handle.

use super::events::ServerEvent;
use super::ports::EventSink;
use super::server::GattServer;
use super::{AttHandle, Caps, ConnHandle};

/// Subscriber slot for one characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    subscriber: Option<ConnHandle>,
    enabled: bool,
}

impl Subscription {
    pub(super) const IDLE: Subscription = Subscription {
        subscriber: None,
        enabled: false,
    };

    pub fn subscriber(&self) -> Option<ConnHandle> {
        self.subscriber
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Connection to deliver to, or `None` when the slot is not live.
    /// Live means: a subscriber is present *and* delivery is enabled.
    pub(super) fn target(&self) -> Option<ConnHandle> {
        if self.enabled { self.subscriber } else { None }
    }

    #[cfg(test)]
    pub(super) fn test_slot(subscriber: Option<ConnHandle>, enabled: bool) -> Subscription {
        Subscription {
            subscriber,
            enabled,
        }
    }
}

impl GattServer {
    /// Apply a subscription change for the characteristic bound to `attr`.
    ///
    /// `attr` may be the characteristic's value handle or its CCCD handle;
    /// transports differ in which one their subscribe event carries.
    /// Events for unknown handles or non-notifiable characteristics are
    /// dropped without error.
    ///
    /// Last-writer-wins: the slot takes exactly what arrived, replacing
    /// any previous subscriber. `conn` is `None` when the stack raised
    /// the event without a peer connection (e.g. replaying a persisted
    /// CCCD at startup).
    pub fn on_subscribe(
        &mut self,
        conn: Option<ConnHandle>,
        attr: AttHandle,
        enabled: bool,
        sink: &mut impl EventSink,
    ) {
        let Some(id) = self.id_by_handle(attr).or_else(|| self.id_by_cccd(attr)) else {
            log::warn!("subscribe for unknown attribute handle {attr}; ignored");
            return;
        };
        let slot = self.slot_mut(id);
        if !slot
            .spec
            .is_some_and(|spec| spec.access.contains(Caps::NOTIFY))
        {
            log::warn!("subscribe for non-notifiable {id:?}; ignored");
            return;
        }
        slot.subscription = Subscription {
            subscriber: conn,
            enabled,
        };
        sink.emit(&ServerEvent::SubscriptionChanged { id, conn, enabled });
    }

    /// Clear every subscription held by a departing connection.
    pub fn on_disconnect(&mut self, conn: ConnHandle, sink: &mut impl EventSink) {
        for id in super::CharacteristicId::ALL {
            let slot = self.slot_mut(id);
            if slot.subscription.subscriber() == Some(conn) {
                slot.subscription = Subscription::IDLE;
                sink.emit(&ServerEvent::SubscriptionChanged {
                    id,
                    conn: None,
                    enabled: false,
                });
            }
        }
    }
}
