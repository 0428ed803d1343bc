//! Attribute registry — the static Service → Characteristic tree.
//!
//! Pure data, fixed at compile time as `'static` tables (the registry
//! is immutable for the process lifetime; only the transport-assigned
//! handles, held separately in the server's slot arena, are filled in at
//! registration). Malformed tables are a programming error caught by the
//! unit tests and a debug assertion at server construction, never a
//! runtime condition.

use super::{Caps, CharacteristicId, Uuid, ValueCodec};

/// Upper bound on services per registry.
pub const MAX_SERVICES: usize = 4;
/// Upper bound on characteristics per service.
pub const MAX_CHARS_PER_SERVICE: usize = 4;

// ── SIG-assigned numbers ──────────────────────────────────────

pub const UUID_SVC_HEART_RATE: u16 = 0x180D;
pub const UUID_CHR_HEART_RATE_MEASUREMENT: u16 = 0x2A37;

pub const UUID_SVC_ENV_SENSING: u16 = 0x181A;
pub const UUID_CHR_TEMPERATURE: u16 = 0x2A6E;
pub const UUID_CHR_HUMIDITY: u16 = 0x2A6F;

pub const UUID_SVC_AUTOMATION_IO: u16 = 0x1815;
/// Vendor LED characteristic (Nordic LED-button-service layout).
pub const UUID_CHR_LED: u128 = 0x00001525_1212_efde_1523_785feabcd123;

/// Client Characteristic Configuration descriptor.
pub const UUID_DSC_CCCD: u16 = 0x2902;

// ── Table entry types ─────────────────────────────────────────

/// One exposed data point: identity, protocol type, capabilities, codec.
#[derive(Debug, Clone, Copy)]
pub struct CharacteristicSpec {
    pub id: CharacteristicId,
    pub uuid: Uuid,
    pub access: Caps,
    pub codec: ValueCodec,
}

/// A named grouping of characteristics sharing a service UUID.
/// No state beyond its ordered characteristic list.
#[derive(Debug, Clone, Copy)]
pub struct ServiceSpec {
    pub uuid: Uuid,
    pub characteristics: &'static [CharacteristicSpec],
}

/// The full, ordered service tree handed to the registration driver
/// exactly once at startup.
#[derive(Debug, Clone, Copy)]
pub struct AttributeRegistry {
    services: &'static [ServiceSpec],
}

impl AttributeRegistry {
    pub const fn new(services: &'static [ServiceSpec]) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &'static [ServiceSpec] {
        self.services
    }

    /// Total characteristics across all services.
    pub fn characteristic_count(&self) -> usize {
        self.services.iter().map(|s| s.characteristics.len()).sum()
    }

    /// Characteristics carrying Notify capability (each needs a CCCD).
    pub fn notifiable_count(&self) -> usize {
        self.services
            .iter()
            .flat_map(|s| s.characteristics)
            .filter(|c| c.access.contains(Caps::NOTIFY))
            .count()
    }

    /// Spec for a characteristic id, if the registry exposes it.
    pub fn spec_of(&self, id: CharacteristicId) -> Option<&'static CharacteristicSpec> {
        self.services
            .iter()
            .flat_map(|s| s.characteristics)
            .find(|c| c.id == id)
    }

    /// Registry well-formedness: each id appears at most once.
    /// Checked by `GattServer::new` under debug assertions.
    pub fn ids_are_unique(&self) -> bool {
        let mut seen = [false; CharacteristicId::COUNT];
        for chr in self.services.iter().flat_map(|s| s.characteristics) {
            let idx = chr.id.index();
            if seen[idx] {
                return false;
            }
            seen[idx] = true;
        }
        true
    }
}

// ── This device's table ───────────────────────────────────────
//
// Mirrors the attribute layout the node advertises: heart rate,
// environmental sensing, and an LED under Automation IO.

const HEART_RATE_CHARS: &[CharacteristicSpec] = &[CharacteristicSpec {
    id: CharacteristicId::HeartRate,
    uuid: Uuid::Sig(UUID_CHR_HEART_RATE_MEASUREMENT),
    access: Caps::READ.union(Caps::NOTIFY),
    codec: ValueCodec::FlagU8,
}];

const ENV_SENSING_CHARS: &[CharacteristicSpec] = &[
    CharacteristicSpec {
        id: CharacteristicId::Temperature,
        uuid: Uuid::Sig(UUID_CHR_TEMPERATURE),
        access: Caps::READ.union(Caps::NOTIFY),
        codec: ValueCodec::F32Le,
    },
    CharacteristicSpec {
        id: CharacteristicId::Humidity,
        uuid: Uuid::Sig(UUID_CHR_HUMIDITY),
        access: Caps::READ.union(Caps::NOTIFY),
        codec: ValueCodec::F32Le,
    },
];

const AUTOMATION_IO_CHARS: &[CharacteristicSpec] = &[CharacteristicSpec {
    id: CharacteristicId::Led,
    uuid: Uuid::Vendor(UUID_CHR_LED),
    access: Caps::READ.union(Caps::WRITE),
    codec: ValueCodec::U8,
}];

pub static DEVICE_SERVICES: &[ServiceSpec] = &[
    ServiceSpec {
        uuid: Uuid::Sig(UUID_SVC_HEART_RATE),
        characteristics: HEART_RATE_CHARS,
    },
    ServiceSpec {
        uuid: Uuid::Sig(UUID_SVC_ENV_SENSING),
        characteristics: ENV_SENSING_CHARS,
    },
    ServiceSpec {
        uuid: Uuid::Sig(UUID_SVC_AUTOMATION_IO),
        characteristics: AUTOMATION_IO_CHARS,
    },
];

/// Registry for this device's attribute layout.
pub fn device_registry() -> AttributeRegistry {
    AttributeRegistry::new(DEVICE_SERVICES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_registry_is_well_formed() {
        let reg = device_registry();
        assert!(reg.ids_are_unique());
        assert_eq!(reg.services().len(), 3);
        assert_eq!(reg.characteristic_count(), 4);
        assert_eq!(reg.notifiable_count(), 3);
    }

    #[test]
    fn device_registry_fits_capacity_bounds() {
        let reg = device_registry();
        assert!(reg.services().len() <= MAX_SERVICES);
        for svc in reg.services() {
            assert!(svc.characteristics.len() <= MAX_CHARS_PER_SERVICE);
        }
    }

    #[test]
    fn every_characteristic_is_resolvable_by_id() {
        let reg = device_registry();
        for id in CharacteristicId::ALL {
            assert!(reg.spec_of(id).is_some(), "missing spec for {:?}", id);
        }
    }

    #[test]
    fn notifiable_characteristics_are_readable() {
        // The indication path fetches the value through the read path,
        // so Notify without Read would be unservable.
        let reg = device_registry();
        for chr in reg.services().iter().flat_map(|s| s.characteristics) {
            if chr.access.contains(Caps::NOTIFY) {
                assert!(
                    chr.access.contains(Caps::READ),
                    "{:?} is notifiable but not readable",
                    chr.id
                );
            }
        }
    }

    #[test]
    fn codec_widths_match_wire_layout() {
        let reg = device_registry();
        let width = |id: CharacteristicId| reg.spec_of(id).unwrap().codec.width();
        assert_eq!(width(CharacteristicId::HeartRate), 2);
        assert_eq!(width(CharacteristicId::Temperature), 4);
        assert_eq!(width(CharacteristicId::Humidity), 4);
        assert_eq!(width(CharacteristicId::Led), 1);
    }

    #[test]
    fn led_uuid_is_vendor_form() {
        let reg = device_registry();
        let led = reg.spec_of(CharacteristicId::Led).unwrap();
        assert_eq!(led.uuid, Uuid::Vendor(UUID_CHR_LED));
    }
}
