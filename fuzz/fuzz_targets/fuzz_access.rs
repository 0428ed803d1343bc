//! Fuzz target: `GattServer::handle_access`
//!
//! Drives arbitrary attribute handles and payloads through the access
//! dispatcher and asserts that it never panics, never overruns the
//! fixed value buffer, and never mutates the source on a rejected
//! write.
//!
//! cargo fuzz run fuzz_access

#![no_main]

use libfuzzer_sys::fuzz_target;
use sensornode::adapters::ble::SimAttributeRegistrar;
use sensornode::adapters::log_sink::LogEventSink;
use sensornode::gatt::ports::ValueSource;
use sensornode::gatt::registry::device_registry;
use sensornode::gatt::server::GattServer;
use sensornode::gatt::{
    AccessRequest, AttStatus, CharacteristicId, Value, ValueBuf, MAX_VALUE_LEN,
};

struct FuzzSource {
    writes: usize,
}

impl ValueSource for FuzzSource {
    fn read(&mut self, id: CharacteristicId) -> Value {
        match id {
            CharacteristicId::HeartRate | CharacteristicId::Led => Value::U8(1),
            CharacteristicId::Temperature | CharacteristicId::Humidity => Value::F32(0.5),
        }
    }

    fn write(&mut self, _id: CharacteristicId, _value: Value) {
        self.writes += 1;
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let handle = u16::from_le_bytes([data[0], data[1]]);
    let payload = &data[2..];

    let mut server = GattServer::new(device_registry());
    server
        .register_all(&mut SimAttributeRegistrar::new(), &mut LogEventSink)
        .unwrap();
    let mut source = FuzzSource { writes: 0 };

    // Reads must stay inside the fixed value buffer.
    let mut out = ValueBuf::new();
    let status = server.handle_access(
        Some(1),
        handle,
        AccessRequest::Read { out: &mut out },
        &mut source,
    );
    if status == AttStatus::Ok {
        assert!(out.len() <= MAX_VALUE_LEN, "read overran the value buffer");
    } else {
        assert!(out.is_empty(), "rejected read must not emit bytes");
    }

    // A rejected write must leave the source untouched.
    let before = source.writes;
    let status = server.handle_access(
        Some(1),
        handle,
        AccessRequest::Write { payload },
        &mut source,
    );
    if status != AttStatus::Ok {
        assert_eq!(source.writes, before, "rejected write reached the source");
    }
});
