//! End-to-end attribute server behaviour over mock transports.
//!
//! Everything here goes through the public surface: a registered
//! server, a mock value source, and a recording indication sender.

use crate::mock_ports::{registered_server, BenchSource, RecordingSender, RecordingSink};
use sensornode::gatt::ports::IndicationError;
use sensornode::gatt::{AccessRequest, AttStatus, CharacteristicId, Value, ValueBuf};

// ── Reads ─────────────────────────────────────────────────────

#[test]
fn temperature_read_is_a_little_endian_float() {
    let server = registered_server();
    let mut source = BenchSource::new();
    let handle = server.handle_of(CharacteristicId::Temperature).unwrap();

    let mut out = ValueBuf::new();
    let status = server.handle_access(
        Some(5),
        handle,
        AccessRequest::Read { out: &mut out },
        &mut source,
    );

    assert_eq!(status, AttStatus::Ok);
    assert_eq!(out.as_slice(), &26.5f32.to_le_bytes());
}

#[test]
fn heart_rate_read_carries_flags_then_bpm() {
    let server = registered_server();
    let mut source = BenchSource::new();
    let handle = server.handle_of(CharacteristicId::HeartRate).unwrap();

    let mut out = ValueBuf::new();
    let status = server.handle_access(
        Some(5),
        handle,
        AccessRequest::Read { out: &mut out },
        &mut source,
    );

    assert_eq!(status, AttStatus::Ok);
    assert_eq!(out.as_slice(), &[0x00, 72]);
}

#[test]
fn reads_never_mutate_the_source() {
    let server = registered_server();
    let mut source = BenchSource::new();

    for id in CharacteristicId::ALL {
        if let Some(handle) = server.handle_of(id) {
            let mut out = ValueBuf::new();
            server.handle_access(
                Some(5),
                handle,
                AccessRequest::Read { out: &mut out },
                &mut source,
            );
        }
    }

    assert_eq!(source.reads.len(), CharacteristicId::COUNT);
    assert!(source.writes.is_empty());
}

// ── Writes ────────────────────────────────────────────────────

#[test]
fn led_write_drives_the_source() {
    let server = registered_server();
    let mut source = BenchSource::new();
    let handle = server.handle_of(CharacteristicId::Led).unwrap();

    let status = server.handle_access(
        Some(5),
        handle,
        AccessRequest::Write { payload: &[1] },
        &mut source,
    );

    assert_eq!(status, AttStatus::Ok);
    assert!(source.led_on);
    assert_eq!(source.writes, vec![(CharacteristicId::Led, Value::U8(1))]);

    let status = server.handle_access(
        Some(5),
        handle,
        AccessRequest::Write { payload: &[0] },
        &mut source,
    );
    assert_eq!(status, AttStatus::Ok);
    assert!(!source.led_on);
}

#[test]
fn empty_led_write_is_rejected_without_effect() {
    let server = registered_server();
    let mut source = BenchSource::new();
    let handle = server.handle_of(CharacteristicId::Led).unwrap();

    let status = server.handle_access(
        Some(5),
        handle,
        AccessRequest::Write { payload: &[] },
        &mut source,
    );

    assert_eq!(status, AttStatus::InvalidAttributeValueLength);
    assert!(source.writes.is_empty());
    assert!(!source.led_on);
}

#[test]
fn write_to_a_read_only_characteristic_fails_on_capability() {
    let server = registered_server();
    let mut source = BenchSource::new();
    let handle = server.handle_of(CharacteristicId::Temperature).unwrap();

    // Wrong length too — the capability check must win.
    let status = server.handle_access(
        Some(5),
        handle,
        AccessRequest::Write { payload: &[1, 2, 3] },
        &mut source,
    );

    assert_eq!(status, AttStatus::UnlikelyError);
    assert!(source.writes.is_empty());
}

#[test]
fn unknown_handle_reports_unlikely_error() {
    let server = registered_server();
    let mut source = BenchSource::new();

    let mut out = ValueBuf::new();
    let status = server.handle_access(
        Some(5),
        0xBEEF,
        AccessRequest::Read { out: &mut out },
        &mut source,
    );

    assert_eq!(status, AttStatus::UnlikelyError);
    assert!(out.is_empty());
}

// ── Subscriptions and delivery ────────────────────────────────

#[test]
fn replacement_subscriber_takes_over_delivery() {
    let mut server = registered_server();
    let mut sink = RecordingSink::new();
    let handle = server.handle_of(CharacteristicId::HeartRate).unwrap();

    server.on_subscribe(Some(5), handle, true, &mut sink);
    server.on_subscribe(Some(7), handle, true, &mut sink);

    let mut sender = RecordingSender::new();
    server.notify(CharacteristicId::HeartRate, &mut sender);

    assert_eq!(sender.sent, vec![(7, handle)]);
}

#[test]
fn disabled_subscription_suppresses_delivery() {
    let mut server = registered_server();
    let mut sink = RecordingSink::new();
    let handle = server.handle_of(CharacteristicId::HeartRate).unwrap();

    server.on_subscribe(Some(5), handle, false, &mut sink);

    let mut sender = RecordingSender::new();
    server.notify(CharacteristicId::HeartRate, &mut sender);

    assert!(sender.sent.is_empty());
}

#[test]
fn cccd_write_subscribes_via_the_descriptor_handle() {
    let mut server = registered_server();
    let mut sink = RecordingSink::new();
    let value_handle = server.handle_of(CharacteristicId::HeartRate).unwrap();
    let cccd = server.cccd_of(CharacteristicId::HeartRate).unwrap();

    server.on_subscribe(Some(9), cccd, true, &mut sink);
    assert_eq!(server.subscriber_of(CharacteristicId::HeartRate), Some(9));

    let mut sender = RecordingSender::new();
    server.notify(CharacteristicId::HeartRate, &mut sender);
    assert_eq!(sender.sent, vec![(9, value_handle)]);
}

#[test]
fn disconnect_clears_only_that_connections_subscriptions() {
    let mut server = registered_server();
    let mut sink = RecordingSink::new();
    let hr = server.handle_of(CharacteristicId::HeartRate).unwrap();
    let temp = server.handle_of(CharacteristicId::Temperature).unwrap();
    let hum = server.handle_of(CharacteristicId::Humidity).unwrap();

    server.on_subscribe(Some(4), hr, true, &mut sink);
    server.on_subscribe(Some(4), temp, true, &mut sink);
    server.on_subscribe(Some(6), hum, true, &mut sink);

    server.on_disconnect(4, &mut sink);

    let mut sender = RecordingSender::new();
    server.notify(CharacteristicId::HeartRate, &mut sender);
    server.notify(CharacteristicId::Temperature, &mut sender);
    server.notify(CharacteristicId::Humidity, &mut sender);

    assert_eq!(sender.sent, vec![(6, hum)]);
}

#[test]
fn transport_failure_does_not_drop_the_subscription() {
    let mut server = registered_server();
    let mut sink = RecordingSink::new();
    let handle = server.handle_of(CharacteristicId::HeartRate).unwrap();

    server.on_subscribe(Some(5), handle, true, &mut sink);

    let mut failing = RecordingSender {
        fail_with: Some(IndicationError::SendFailed(-1)),
        ..RecordingSender::default()
    };
    server.notify(CharacteristicId::HeartRate, &mut failing);
    assert!(failing.sent.is_empty());

    // Link recovers; the next delivery still targets conn 5.
    let mut sender = RecordingSender::new();
    server.notify(CharacteristicId::HeartRate, &mut sender);
    assert_eq!(sender.sent, vec![(5, handle)]);
}
