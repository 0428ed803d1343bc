//! Port traits — the hexagonal boundary between the attribute-server core
//! and the outside world.
//!
//! ```text
//!   BLE adapter ──▶ AttributeRegistrar / IndicationSender ──▶ GattServer
//!   GattServer  ──▶ ValueSource / EventSink ──▶ hardware / log adapters
//! ```
//!
//! Adapters implement these traits; the [`GattServer`](super::server::GattServer)
//! consumes them via generics at each call site, so the core never touches
//! the BLE stack or real hardware directly.

use core::fmt;

use super::registry::{AttributeRegistry, ServiceSpec, MAX_CHARS_PER_SERVICE};
use super::{AttHandle, CharacteristicId, ConnHandle, Value};

// ───────────────────────────────────────────────────────────────
// Value source (driven adapter: hardware → core)
// ───────────────────────────────────────────────────────────────

/// Supplier/sink for the actual quantity values behind each characteristic.
///
/// `read` must be synchronous and non-blocking — it is called on the
/// transport's access-dispatch path. Writes arrive only for quantities the
/// dispatcher has already capability-checked; implementations log and drop
/// anything else.
pub trait ValueSource {
    /// Current value of the given quantity.
    fn read(&mut self, id: CharacteristicId) -> Value;

    /// Apply a decoded write to the given quantity.
    fn write(&mut self, id: CharacteristicId, value: Value);
}

// ───────────────────────────────────────────────────────────────
// Attribute registrar (driving adapter: core → transport stack)
// ───────────────────────────────────────────────────────────────

/// Handles assigned by the transport for one registered characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicRegistration {
    pub value_handle: AttHandle,
    /// CCCD descriptor handle; present for notifiable characteristics.
    pub cccd_handle: Option<AttHandle>,
}

/// Result of registering one service with the transport stack.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistration {
    pub service_handle: AttHandle,
    /// One entry per characteristic, in the service's declaration order.
    pub characteristics: heapless::Vec<CharacteristicRegistration, MAX_CHARS_PER_SERVICE>,
}

/// Errors while building the attribute table into the transport stack.
///
/// All of these are fatal to startup — there is no partial-registration
/// recovery path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationError {
    /// The stack rejected the configuration with the given status code.
    Rejected(i32),
    /// The stack ran out of attribute-table resources.
    OutOfResources,
    /// The stack did not complete the registration chain in time.
    Timeout,
    /// A characteristic's handle was already bound (double registration).
    AlreadyBound(CharacteristicId),
    /// The registrar returned a different number of handles than the
    /// service declares characteristics.
    HandleCountMismatch { expected: usize, got: usize },
    /// A notifiable characteristic came back without a CCCD handle.
    MissingDescriptor(CharacteristicId),
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(rc) => write!(f, "stack rejected registration (rc={})", rc),
            Self::OutOfResources => write!(f, "attribute table resources exhausted"),
            Self::Timeout => write!(f, "registration chain timed out"),
            Self::AlreadyBound(id) => write!(f, "handle already bound for {:?}", id),
            Self::HandleCountMismatch { expected, got } => {
                write!(f, "handle count mismatch (expected {}, got {})", expected, got)
            }
            Self::MissingDescriptor(id) => {
                write!(f, "no CCCD handle returned for notifiable {:?}", id)
            }
        }
    }
}

/// Builds the attribute registry into the transport stack's table.
///
/// `reserve` sizes stack resources for the whole registry up front;
/// `register_service` is then called once per service, in registry order,
/// and returns the assigned handles.
pub trait AttributeRegistrar {
    fn reserve(&mut self, registry: &AttributeRegistry) -> Result<(), RegistrationError>;

    fn register_service(
        &mut self,
        service: &ServiceSpec,
    ) -> Result<ServiceRegistration, RegistrationError>;
}

// ───────────────────────────────────────────────────────────────
// Indication sender (driving adapter: core → transport stack)
// ───────────────────────────────────────────────────────────────

/// Errors from one indication send attempt. Logged by the notification
/// path and otherwise swallowed — indications are best-effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicationError {
    /// The stack refused the send (disconnected peer, queue full, …).
    SendFailed(i32),
    /// The value fetch backing the indication did not produce bytes.
    ValueUnavailable,
}

impl fmt::Display for IndicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendFailed(rc) => write!(f, "stack send failed (rc={})", rc),
            Self::ValueUnavailable => write!(f, "value fetch failed"),
        }
    }
}

/// Pushes the current value of a registered attribute to one connection.
///
/// Fire-and-forget from the core's perspective: the transport fetches and
/// encodes the live value at send time through the registered read path,
/// so no payload crosses this boundary.
pub trait IndicationSender {
    fn send_indication(
        &mut self,
        conn: ConnHandle,
        handle: AttHandle,
    ) -> Result<(), IndicationError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: core → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`ServerEvent`](super::events::ServerEvent)s
/// through this port — registration results and subscription changes.
/// Observability only; nothing feeds back into server logic.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::ServerEvent);
}
