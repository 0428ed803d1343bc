//! GATT attribute-server core.
//!
//! The server state machine lives here: the immutable attribute registry,
//! read/write access dispatch, per-characteristic subscription tracking,
//! and the triggered-indication path. Transport specifics (Bluedroid) stay
//! on the far side of the port traits in [`ports`]; the core never touches
//! the BLE stack directly.
//!
//! ## Exposed attribute table
//!
//! | Service            | Characteristic | UUID                  | Access | Codec    |
//! |--------------------|----------------|-----------------------|--------|----------|
//! | Heart Rate 0x180D  | HeartRate      | 0x2A37                | R + N  | flag+u8  |
//! | Env Sensing 0x181A | Temperature    | 0x2A6E                | R + N  | f32 LE   |
//! | Env Sensing 0x181A | Humidity       | 0x2A6F                | R + N  | f32 LE   |
//! | Automation IO 0x1815 | Led          | 00001525-…-785FEABCD123 | R + W | u8      |
//!
//! ```text
//!   BLE stack ──▶ adapter ──▶ handle_access / on_subscribe / on_disconnect
//!   timer tick ──▶ main loop ──▶ notify ──▶ IndicationSender ──▶ BLE stack
//! ```

pub mod access;
pub mod events;
pub mod notify;
pub mod ports;
pub mod registration;
pub mod registry;
pub mod server;
pub mod subscribe;

use core::fmt;

// ── Protocol-level scalar types ───────────────────────────────

/// Transport-assigned opaque attribute reference.
pub type AttHandle = u16;

/// Transport-assigned connection reference.
pub type ConnHandle = u16;

/// Sentinel the BLE stack uses when an access originates locally
/// (e.g. the value fetch backing an indication) rather than from a peer.
/// Adapters map it to `None` before calling into the core.
pub const CONN_HANDLE_NONE: ConnHandle = 0xFFFF;

/// Largest encoded characteristic value this server produces.
pub const MAX_VALUE_LEN: usize = 8;

/// Fixed-capacity buffer for one encoded characteristic value.
pub type ValueBuf = heapless::Vec<u8, MAX_VALUE_LEN>;

// ── Attribute status codes ────────────────────────────────────

/// Status codes returned to the transport stack from access dispatch.
///
/// The raw values are the ATT error codes on the wire — they are the
/// external contract and must not be remapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttStatus {
    /// Access succeeded.
    Ok = 0x00,
    /// Write payload length does not match the attribute's fixed width.
    InvalidAttributeValueLength = 0x0D,
    /// Unreachable/default branch reached — protocol or programming
    /// inconsistency on the remote or local side.
    UnlikelyError = 0x0E,
    /// Value encoding could not be completed (buffer exhaustion).
    InsufficientResources = 0x11,
}

impl AttStatus {
    /// Raw wire code handed back to the stack.
    pub const fn as_raw(self) -> u8 {
        self as u8
    }
}

// ── Access errors ─────────────────────────────────────────────

/// Per-access failure taxonomy. Local to one dispatch; never crosses an
/// access boundary except as the mapped [`AttStatus`] code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// Unknown attribute handle, or an operation the characteristic's
    /// capability set does not include.
    UnsupportedOperation,
    /// Write payload length differs from the codec's fixed width.
    InvalidPayload,
    /// Encoded value did not fit the response buffer.
    OutOfResources,
}

impl AccessError {
    /// Protocol rejection code for this error.
    pub const fn status(self) -> AttStatus {
        match self {
            Self::UnsupportedOperation => AttStatus::UnlikelyError,
            Self::InvalidPayload => AttStatus::InvalidAttributeValueLength,
            Self::OutOfResources => AttStatus::InsufficientResources,
        }
    }
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedOperation => write!(f, "unsupported operation"),
            Self::InvalidPayload => write!(f, "invalid payload length"),
            Self::OutOfResources => write!(f, "response buffer exhausted"),
        }
    }
}

// ── UUIDs ─────────────────────────────────────────────────────

/// Protocol-level attribute type identifier.
///
/// SIG-assigned characteristics use the short 16-bit form; vendor
/// characteristics carry the full 128 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uuid {
    Sig(u16),
    Vendor(u128),
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sig(v) => write!(f, "0x{:04x}", v),
            Self::Vendor(v) => write!(
                f,
                "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
                (v >> 96) as u32,
                (v >> 80) as u16,
                (v >> 64) as u16,
                (v >> 48) as u16,
                v & 0xffff_ffff_ffff
            ),
        }
    }
}

// ── Capability set ────────────────────────────────────────────

/// Access capability set for one characteristic.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Caps(u8);

impl Caps {
    pub const READ: Caps = Caps(0b001);
    pub const WRITE: Caps = Caps(0b010);
    pub const NOTIFY: Caps = Caps(0b100);

    pub const fn contains(self, other: Caps) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Caps) -> Caps {
        Caps(self.0 | other.0)
    }
}

impl core::ops::BitOr for Caps {
    type Output = Caps;
    fn bitor(self, rhs: Caps) -> Caps {
        self.union(rhs)
    }
}

impl fmt::Debug for Caps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (bit, tag) in [(Self::READ, "R"), (Self::WRITE, "W"), (Self::NOTIFY, "N")] {
            if self.contains(bit) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", tag)?;
                first = false;
            }
        }
        if first {
            write!(f, "-")?;
        }
        Ok(())
    }
}

// ── Characteristic identifiers ────────────────────────────────

/// Stable logical identifier for each exposed characteristic.
///
/// Doubles as the index into the server's slot arena, so discriminants
/// are explicit and dense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CharacteristicId {
    HeartRate = 0,
    Temperature = 1,
    Humidity = 2,
    Led = 3,
}

impl CharacteristicId {
    pub const COUNT: usize = 4;

    pub const ALL: [CharacteristicId; Self::COUNT] = [
        CharacteristicId::HeartRate,
        CharacteristicId::Temperature,
        CharacteristicId::Humidity,
        CharacteristicId::Led,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

// ── Values and codecs ─────────────────────────────────────────

/// One characteristic value crossing the ValueSource boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    U8(u8),
    F32(f32),
}

/// Errors from encoding/decoding a characteristic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Payload length differs from the codec's fixed width.
    LengthMismatch { expected: usize, got: usize },
    /// Value variant does not belong to this codec (registry bug).
    TypeMismatch,
    /// Output buffer could not take the encoded bytes.
    Overflow,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { expected, got } => {
                write!(f, "length mismatch (expected {}, got {})", expected, got)
            }
            Self::TypeMismatch => write!(f, "value type does not match codec"),
            Self::Overflow => write!(f, "encode buffer overflow"),
        }
    }
}

/// Fixed-width binary encoding rule for one characteristic's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCodec {
    /// Single unsigned byte.
    U8,
    /// Flags byte (always 0) followed by an unsigned byte value — the
    /// heart-rate measurement layout.
    FlagU8,
    /// IEEE-754 binary32, little-endian.
    F32Le,
}

impl ValueCodec {
    /// Encoded width in bytes. Writes must match this exactly.
    pub const fn width(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::FlagU8 => 2,
            Self::F32Le => 4,
        }
    }

    /// Append the encoded form of `value` to `out`.
    pub fn encode(self, value: Value, out: &mut ValueBuf) -> Result<(), CodecError> {
        match (self, value) {
            (Self::U8, Value::U8(v)) => {
                out.push(v).map_err(|_| CodecError::Overflow)?;
            }
            (Self::FlagU8, Value::U8(v)) => {
                out.extend_from_slice(&[0, v]).map_err(|_| CodecError::Overflow)?;
            }
            (Self::F32Le, Value::F32(v)) => {
                out.extend_from_slice(&v.to_le_bytes())
                    .map_err(|_| CodecError::Overflow)?;
            }
            _ => return Err(CodecError::TypeMismatch),
        }
        Ok(())
    }

    /// Decode a write payload. Length is validated here, against the
    /// fixed width — there are no variable-width characteristics.
    pub fn decode(self, payload: &[u8]) -> Result<Value, CodecError> {
        if payload.len() != self.width() {
            return Err(CodecError::LengthMismatch {
                expected: self.width(),
                got: payload.len(),
            });
        }
        match self {
            Self::U8 => Ok(Value::U8(payload[0])),
            Self::FlagU8 => Ok(Value::U8(payload[1])),
            Self::F32Le => {
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(payload);
                Ok(Value::F32(f32::from_le_bytes(bytes)))
            }
        }
    }
}

// ── Access requests ───────────────────────────────────────────

/// One read or write delivered by the transport stack.
///
/// Reads carry the response buffer the encoded value is appended to;
/// writes carry the raw payload as received.
pub enum AccessRequest<'a> {
    Read { out: &'a mut ValueBuf },
    Write { payload: &'a [u8] },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_att_contract() {
        assert_eq!(AttStatus::Ok.as_raw(), 0x00);
        assert_eq!(AttStatus::InvalidAttributeValueLength.as_raw(), 0x0D);
        assert_eq!(AttStatus::UnlikelyError.as_raw(), 0x0E);
        assert_eq!(AttStatus::InsufficientResources.as_raw(), 0x11);
    }

    #[test]
    fn access_error_status_mapping() {
        assert_eq!(
            AccessError::UnsupportedOperation.status(),
            AttStatus::UnlikelyError
        );
        assert_eq!(
            AccessError::InvalidPayload.status(),
            AttStatus::InvalidAttributeValueLength
        );
        assert_eq!(
            AccessError::OutOfResources.status(),
            AttStatus::InsufficientResources
        );
    }

    #[test]
    fn caps_contains_and_union() {
        let rw = Caps::READ | Caps::WRITE;
        assert!(rw.contains(Caps::READ));
        assert!(rw.contains(Caps::WRITE));
        assert!(!rw.contains(Caps::NOTIFY));
        assert!((rw | Caps::NOTIFY).contains(Caps::NOTIFY));
    }

    #[test]
    fn f32_codec_is_little_endian() {
        let mut out = ValueBuf::new();
        ValueCodec::F32Le.encode(Value::F32(26.5), &mut out).unwrap();
        assert_eq!(out.as_slice(), &26.5f32.to_le_bytes());
        assert_eq!(out.len(), ValueCodec::F32Le.width());

        let back = ValueCodec::F32Le.decode(&out).unwrap();
        assert_eq!(back, Value::F32(26.5));
    }

    #[test]
    fn flag_u8_codec_prefixes_zero_flags() {
        let mut out = ValueBuf::new();
        ValueCodec::FlagU8.encode(Value::U8(72), &mut out).unwrap();
        assert_eq!(out.as_slice(), &[0x00, 72]);
    }

    #[test]
    fn decode_rejects_wrong_width() {
        let err = ValueCodec::U8.decode(&[]).unwrap_err();
        assert_eq!(err, CodecError::LengthMismatch { expected: 1, got: 0 });

        let err = ValueCodec::F32Le.decode(&[1, 2, 3]).unwrap_err();
        assert_eq!(err, CodecError::LengthMismatch { expected: 4, got: 3 });
    }

    #[test]
    fn encode_rejects_mismatched_value() {
        let mut out = ValueBuf::new();
        let err = ValueCodec::F32Le.encode(Value::U8(1), &mut out).unwrap_err();
        assert_eq!(err, CodecError::TypeMismatch);
        assert!(out.is_empty());
    }

    #[test]
    fn uuid_display_forms() {
        assert_eq!(Uuid::Sig(0x180D).to_string(), "0x180d");
        assert_eq!(
            Uuid::Vendor(0x00001525_1212_efde_1523_785feabcd123).to_string(),
            "00001525-1212-efde-1523-785feabcd123"
        );
    }
}
