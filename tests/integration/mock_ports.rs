//! Mock port implementations for integration tests.
//!
//! Record every interaction so tests can assert on the full history
//! without touching a radio or real GPIO.

use sensornode::gatt::events::ServerEvent;
use sensornode::gatt::ports::{
    AttributeRegistrar, CharacteristicRegistration, EventSink, IndicationError, IndicationSender,
    RegistrationError, ServiceRegistration, ValueSource,
};
use sensornode::gatt::registry::{device_registry, AttributeRegistry, ServiceSpec};
use sensornode::gatt::server::GattServer;
use sensornode::gatt::{AttHandle, Caps, CharacteristicId, ConnHandle, Value};

// ── Value source ──────────────────────────────────────────────

/// Bench values with a full read/write log.
pub struct BenchSource {
    pub bpm: u8,
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub led_on: bool,
    pub reads: Vec<CharacteristicId>,
    pub writes: Vec<(CharacteristicId, Value)>,
}

#[allow(dead_code)]
impl BenchSource {
    pub fn new() -> Self {
        Self {
            bpm: 72,
            temperature_c: 26.5,
            humidity_pct: 88.5,
            led_on: false,
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }
}

impl Default for BenchSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueSource for BenchSource {
    fn read(&mut self, id: CharacteristicId) -> Value {
        self.reads.push(id);
        match id {
            CharacteristicId::HeartRate => Value::U8(self.bpm),
            CharacteristicId::Temperature => Value::F32(self.temperature_c),
            CharacteristicId::Humidity => Value::F32(self.humidity_pct),
            CharacteristicId::Led => Value::U8(u8::from(self.led_on)),
        }
    }

    fn write(&mut self, id: CharacteristicId, value: Value) {
        if let (CharacteristicId::Led, Value::U8(raw)) = (id, value) {
            self.led_on = raw != 0;
        }
        self.writes.push((id, value));
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<ServerEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_of(&self, matcher: impl Fn(&ServerEvent) -> bool) -> usize {
        self.events.iter().filter(|e| matcher(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &ServerEvent) {
        self.events.push(event.clone());
    }
}

// ── Indication sender ─────────────────────────────────────────

/// Accepts or fails every send, recording the target of each accept.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Vec<(ConnHandle, AttHandle)>,
    pub fail_with: Option<IndicationError>,
}

#[allow(dead_code)]
impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndicationSender for RecordingSender {
    fn send_indication(
        &mut self,
        conn: ConnHandle,
        handle: AttHandle,
    ) -> Result<(), IndicationError> {
        if let Some(err) = self.fail_with {
            return Err(err);
        }
        self.sent.push((conn, handle));
        Ok(())
    }
}

// ── Registrar ─────────────────────────────────────────────────

/// Sequential synthetic handles with failure injection knobs.
pub struct ScriptedRegistrar {
    pub next_handle: AttHandle,
    pub fail_reserve: bool,
    /// Report one characteristic fewer than the service declares.
    pub drop_last_char: bool,
    /// Never assign CCCD handles, even for notifiable characteristics.
    pub omit_cccds: bool,
}

#[allow(dead_code)]
impl ScriptedRegistrar {
    pub fn new() -> Self {
        Self {
            next_handle: 0x0028,
            fail_reserve: false,
            drop_last_char: false,
            omit_cccds: false,
        }
    }

    fn bump(&mut self) -> AttHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }
}

impl Default for ScriptedRegistrar {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeRegistrar for ScriptedRegistrar {
    fn reserve(&mut self, _registry: &AttributeRegistry) -> Result<(), RegistrationError> {
        if self.fail_reserve {
            return Err(RegistrationError::Timeout);
        }
        Ok(())
    }

    fn register_service(
        &mut self,
        service: &ServiceSpec,
    ) -> Result<ServiceRegistration, RegistrationError> {
        let mut assigned = ServiceRegistration {
            service_handle: self.bump(),
            ..ServiceRegistration::default()
        };
        for (i, chr) in service.characteristics.iter().enumerate() {
            if self.drop_last_char && i + 1 == service.characteristics.len() {
                break;
            }
            self.bump(); // declaration attribute
            let value_handle = self.bump();
            let cccd_handle = if !self.omit_cccds && chr.access.contains(Caps::NOTIFY) {
                Some(self.bump())
            } else {
                None
            };
            let placed = CharacteristicRegistration {
                value_handle,
                cccd_handle,
            };
            if assigned.characteristics.push(placed).is_err() {
                return Err(RegistrationError::OutOfResources);
            }
        }
        Ok(assigned)
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// A server with the whole device table bound to synthetic handles.
pub fn registered_server() -> GattServer {
    let mut server = GattServer::new(device_registry());
    let mut registrar = ScriptedRegistrar::new();
    let mut sink = RecordingSink::new();
    server
        .register_all(&mut registrar, &mut sink)
        .expect("device table registration");
    server
}
