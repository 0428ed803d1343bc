//! Triggered indications.
//!
//! [`GattServer::notify`] is the data-side entry point: timers and
//! sensor updates name a characteristic, and the server decides whether
//! anything leaves the device. Ineligible triggers (no subscriber,
//! delivery disabled, handle not yet bound) are dropped silently —
//! sampling cadence is not the peer's concern.
//!
//! The trigger carries no value. The [`IndicationSender`] hands the
//! stack a `(conn, handle)` pair and the stack reads the attribute at
//! transmission time, so the peer always sees the freshest sample even
//! if the trigger sat in a queue.

use super::ports::IndicationSender;
use super::server::GattServer;
use super::CharacteristicId;

impl GattServer {
    /// Send an indication of `id`'s current value to its subscriber, if
    /// delivery is currently eligible. Fire-and-forget: transport
    /// failures are logged and dropped, never propagated to the caller.
    pub fn notify(&self, id: CharacteristicId, sender: &mut impl IndicationSender) {
        let slot = self.slot(id);
        let Some(conn) = slot.subscription.target() else {
            return;
        };
        let Some(handle) = slot.handle else {
            return;
        };
        if let Err(err) = sender.send_indication(conn, handle) {
            log::warn!("indication for {id:?} to conn={conn} failed: {err}");
        }
    }
}
