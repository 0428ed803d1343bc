//! Read/write access dispatch.
//!
//! Every peer read, peer write, and stack-local value fetch funnels
//! through [`GattServer::handle_access`]. The checks run in a fixed
//! order: resolve the handle, check the capability set, then validate
//! the payload shape. Capability rejection always wins over length
//! rejection — a write to a read-only attribute reports "unlikely
//! error", never "invalid length", regardless of the payload.
//!
//! Reads take `&self` on the server: only the [`ValueSource`] is
//! consulted, server state is never written.

use super::ports::ValueSource;
use super::registry::CharacteristicSpec;
use super::server::GattServer;
use super::{
    AccessError, AccessRequest, AttHandle, AttStatus, Caps, CharacteristicId, CodecError,
    ConnHandle, ValueBuf,
};

impl GattServer {
    /// Dispatch one attribute access and return the status code for the
    /// transport response. `conn` is `None` for stack-local accesses
    /// (the value fetch backing an indication).
    pub fn handle_access(
        &self,
        conn: Option<ConnHandle>,
        attr: AttHandle,
        req: AccessRequest<'_>,
        source: &mut impl ValueSource,
    ) -> AttStatus {
        let Some(id) = self.id_by_handle(attr) else {
            log::error!("access to unknown attribute handle {attr}");
            return AttStatus::UnlikelyError;
        };
        let Some(spec) = self.slot(id).spec else {
            // A handle only binds through registration, which fills the
            // slot's spec; reaching here means the arena was corrupted.
            log::error!("attribute handle {attr} bound without a spec");
            return AttStatus::UnlikelyError;
        };
        match req {
            AccessRequest::Read { out } => self.read_value(conn, id, spec, source, out),
            AccessRequest::Write { payload } => self.write_value(conn, id, spec, source, payload),
        }
    }

    fn read_value(
        &self,
        conn: Option<ConnHandle>,
        id: CharacteristicId,
        spec: &CharacteristicSpec,
        source: &mut impl ValueSource,
        out: &mut ValueBuf,
    ) -> AttStatus {
        if !spec.access.contains(Caps::READ) {
            log::warn!("read rejected on {id:?}: not readable");
            return AccessError::UnsupportedOperation.status();
        }
        match conn {
            Some(c) => log::debug!("chr read: {id:?} conn={c}"),
            None => log::debug!("chr read: {id:?} (stack-local)"),
        }
        let value = source.read(id);
        match spec.codec.encode(value, out) {
            Ok(()) => AttStatus::Ok,
            Err(CodecError::Overflow) => {
                log::error!("read on {id:?}: response buffer exhausted");
                AccessError::OutOfResources.status()
            }
            Err(err) => {
                log::error!("read on {id:?}: encode failed: {err}");
                AttStatus::UnlikelyError
            }
        }
    }

    fn write_value(
        &self,
        conn: Option<ConnHandle>,
        id: CharacteristicId,
        spec: &CharacteristicSpec,
        source: &mut impl ValueSource,
        payload: &[u8],
    ) -> AttStatus {
        if !spec.access.contains(Caps::WRITE) {
            log::warn!("write rejected on {id:?}: not writable");
            return AccessError::UnsupportedOperation.status();
        }
        let value = match spec.codec.decode(payload) {
            Ok(v) => v,
            Err(CodecError::LengthMismatch { expected, got }) => {
                log::warn!("write rejected on {id:?}: expected {expected} bytes, got {got}");
                return AccessError::InvalidPayload.status();
            }
            Err(err) => {
                log::error!("write on {id:?}: decode failed: {err}");
                return AttStatus::UnlikelyError;
            }
        };
        match conn {
            Some(c) => log::info!("chr write: {id:?} conn={c}"),
            None => log::info!("chr write: {id:?} (stack-local)"),
        }
        source.write(id, value);
        AttStatus::Ok
    }
}
