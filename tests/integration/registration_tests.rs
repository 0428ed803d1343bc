//! Attribute-table registration against scripted stacks.

use crate::mock_ports::{RecordingSink, ScriptedRegistrar};
use sensornode::gatt::events::ServerEvent;
use sensornode::gatt::ports::RegistrationError;
use sensornode::gatt::registry::device_registry;
use sensornode::gatt::server::GattServer;
use sensornode::gatt::CharacteristicId;

#[test]
fn full_table_registration_binds_and_reports() {
    let mut server = GattServer::new(device_registry());
    let mut registrar = ScriptedRegistrar::new();
    let mut sink = RecordingSink::new();

    server
        .register_all(&mut registrar, &mut sink)
        .expect("registration");

    assert!(server.fully_registered());
    for id in CharacteristicId::ALL {
        assert!(server.handle_of(id).is_some(), "{id:?} unbound");
    }

    // Three services, four characteristics, three CCCDs.
    assert_eq!(
        sink.count_of(|e| matches!(e, ServerEvent::ServiceRegistered { .. })),
        3
    );
    assert_eq!(
        sink.count_of(|e| matches!(e, ServerEvent::CharacteristicRegistered { .. })),
        4
    );
    assert_eq!(
        sink.count_of(|e| matches!(e, ServerEvent::DescriptorRegistered { .. })),
        3
    );

    // A service is always announced before its characteristics.
    assert!(matches!(
        sink.events.first(),
        Some(ServerEvent::ServiceRegistered { .. })
    ));
}

#[test]
fn reserve_failure_aborts_before_any_placement() {
    let mut server = GattServer::new(device_registry());
    let mut registrar = ScriptedRegistrar {
        fail_reserve: true,
        ..ScriptedRegistrar::new()
    };
    let mut sink = RecordingSink::new();

    let err = server.register_all(&mut registrar, &mut sink).unwrap_err();

    assert_eq!(err, RegistrationError::Timeout);
    assert!(sink.events.is_empty());
    assert!(!server.fully_registered());
}

#[test]
fn short_handle_list_is_a_count_mismatch() {
    let mut server = GattServer::new(device_registry());
    let mut registrar = ScriptedRegistrar {
        drop_last_char: true,
        ..ScriptedRegistrar::new()
    };
    let mut sink = RecordingSink::new();

    let err = server.register_all(&mut registrar, &mut sink).unwrap_err();

    // The heart-rate service declares one characteristic.
    assert_eq!(
        err,
        RegistrationError::HandleCountMismatch {
            expected: 1,
            got: 0
        }
    );
}

#[test]
fn missing_cccd_is_rejected_for_notifiable_characteristics() {
    let mut server = GattServer::new(device_registry());
    let mut registrar = ScriptedRegistrar {
        omit_cccds: true,
        ..ScriptedRegistrar::new()
    };
    let mut sink = RecordingSink::new();

    let err = server.register_all(&mut registrar, &mut sink).unwrap_err();

    assert_eq!(
        err,
        RegistrationError::MissingDescriptor(CharacteristicId::HeartRate)
    );
}

#[test]
fn rebinding_a_bound_table_is_rejected() {
    let mut server = GattServer::new(device_registry());
    let mut registrar = ScriptedRegistrar::new();
    let mut sink = RecordingSink::new();

    server
        .register_all(&mut registrar, &mut sink)
        .expect("first registration");

    let err = server.register_all(&mut registrar, &mut sink).unwrap_err();
    assert!(matches!(err, RegistrationError::AlreadyBound(_)));
}
