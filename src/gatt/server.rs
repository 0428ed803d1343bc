//! Attribute-server state.
//!
//! One [`GattServer`] is constructed at startup and owns everything the
//! protocol core mutates: an arena of characteristic slots indexed by
//! [`CharacteristicId`], each holding the (once-bound) attribute handle
//! and the subscription record. The registry itself stays immutable
//! `'static` data.
//!
//! The operational surface is split across sibling modules, one per
//! concern: [`access`](super::access), [`subscribe`](super::subscribe),
//! [`notify`](super::notify), [`registration`](super::registration).

use super::registry::{AttributeRegistry, CharacteristicSpec};
use super::subscribe::Subscription;
use super::{AttHandle, CharacteristicId, ConnHandle};

/// Per-characteristic slot: spec reference, bound handles, subscription.
#[derive(Debug, Clone, Copy)]
pub(super) struct Slot {
    pub(super) spec: Option<&'static CharacteristicSpec>,
    pub(super) handle: Option<AttHandle>,
    /// CCCD handle; bound only for notifiable characteristics.
    pub(super) cccd: Option<AttHandle>,
    pub(super) subscription: Subscription,
}

impl Slot {
    const EMPTY: Slot = Slot {
        spec: None,
        handle: None,
        cccd: None,
        subscription: Subscription::IDLE,
    };
}

/// The attribute server: registry plus all mutable protocol state.
pub struct GattServer {
    pub(super) registry: AttributeRegistry,
    pub(super) slots: [Slot; CharacteristicId::COUNT],
}

impl GattServer {
    /// Build the server state for a registry. Handles stay unbound until
    /// [`register_all`](Self::register_all) succeeds.
    pub fn new(registry: AttributeRegistry) -> Self {
        debug_assert!(
            registry.ids_are_unique(),
            "duplicate characteristic ids in registry"
        );
        let mut slots = [Slot::EMPTY; CharacteristicId::COUNT];
        for id in CharacteristicId::ALL {
            slots[id.index()].spec = registry.spec_of(id);
        }
        Self { registry, slots }
    }

    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    // ── Slot access (core-internal) ───────────────────────────

    pub(super) fn slot(&self, id: CharacteristicId) -> &Slot {
        &self.slots[id.index()]
    }

    pub(super) fn slot_mut(&mut self, id: CharacteristicId) -> &mut Slot {
        &mut self.slots[id.index()]
    }

    /// Resolve a transport handle to the characteristic bound to it.
    /// Linear scan — the arena is four entries.
    pub(super) fn id_by_handle(&self, handle: AttHandle) -> Option<CharacteristicId> {
        CharacteristicId::ALL
            .into_iter()
            .find(|id| self.slots[id.index()].handle == Some(handle))
    }

    /// Resolve a CCCD descriptor handle to its owning characteristic.
    pub(super) fn id_by_cccd(&self, handle: AttHandle) -> Option<CharacteristicId> {
        CharacteristicId::ALL
            .into_iter()
            .find(|id| self.slots[id.index()].cccd == Some(handle))
    }

    // ── Public state queries ──────────────────────────────────

    /// Bound handle for a characteristic, once registered.
    pub fn handle_of(&self, id: CharacteristicId) -> Option<AttHandle> {
        self.slot(id).handle
    }

    /// Bound CCCD handle for a notifiable characteristic, once registered.
    pub fn cccd_of(&self, id: CharacteristicId) -> Option<AttHandle> {
        self.slot(id).cccd
    }

    /// Characteristic owning a CCCD handle, if the handle is one —
    /// adapters use this to route descriptor traffic to the
    /// subscription path instead of access dispatch.
    pub fn cccd_owner(&self, handle: AttHandle) -> Option<CharacteristicId> {
        self.id_by_cccd(handle)
    }

    /// True once every characteristic in the registry has a bound handle.
    pub fn fully_registered(&self) -> bool {
        CharacteristicId::ALL.into_iter().all(|id| {
            self.slot(id).spec.is_none() || self.slot(id).handle.is_some()
        })
    }

    /// Current subscriber of a characteristic, if any.
    pub fn subscriber_of(&self, id: CharacteristicId) -> Option<ConnHandle> {
        self.slot(id).subscription.subscriber()
    }

    /// Whether indications are currently enabled for a characteristic.
    pub fn indications_enabled(&self, id: CharacteristicId) -> bool {
        self.slot(id).subscription.is_enabled()
    }
}

#[cfg(test)]
impl GattServer {
    /// Bind synthetic handles without a transport. Unit tests only; real
    /// binding happens in [`register_all`](Self::register_all).
    pub(super) fn bind_synthetic_handles(&mut self) {
        use super::Caps;
        for (i, id) in CharacteristicId::ALL.into_iter().enumerate() {
            let slot = &mut self.slots[id.index()];
            slot.handle = Some(0x0010 + i as AttHandle);
            if slot.spec.is_some_and(|s| s.access.contains(Caps::NOTIFY)) {
                slot.cccd = Some(0x0100 + i as AttHandle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::registry::device_registry;
    use super::*;

    #[test]
    fn new_server_has_no_bound_handles() {
        let srv = GattServer::new(device_registry());
        for id in CharacteristicId::ALL {
            assert_eq!(srv.handle_of(id), None);
            assert_eq!(srv.subscriber_of(id), None);
            assert!(!srv.indications_enabled(id));
        }
        assert!(!srv.fully_registered());
    }

    #[test]
    fn unknown_handle_resolves_to_none() {
        let srv = GattServer::new(device_registry());
        assert_eq!(srv.id_by_handle(0x1234), None);
    }

    #[test]
    fn slots_carry_their_specs() {
        let srv = GattServer::new(device_registry());
        for id in CharacteristicId::ALL {
            let spec = srv.slot(id).spec.expect("spec missing");
            assert_eq!(spec.id, id);
        }
    }
}
