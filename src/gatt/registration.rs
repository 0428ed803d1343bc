//! Startup registration driver.
//!
//! [`GattServer::register_all`] walks the registry once, in declaration
//! order: reserve stack resources for the whole table, then register
//! service by service, binding the returned handles into the slot arena.
//! Handles bind exactly once — any inconsistency from the registrar
//! (wrong handle count, missing CCCD, double bind) aborts with a
//! [`RegistrationError`], and startup treats that as fatal. There is no
//! partial-table recovery.

use super::events::ServerEvent;
use super::ports::{AttributeRegistrar, EventSink, RegistrationError};
use super::server::GattServer;
use super::Caps;

impl GattServer {
    /// Build the whole attribute table into the transport stack.
    ///
    /// Called once at startup, before any peer can connect. Emits one
    /// event per registered service, characteristic, and descriptor.
    pub fn register_all(
        &mut self,
        registrar: &mut impl AttributeRegistrar,
        sink: &mut impl EventSink,
    ) -> Result<(), RegistrationError> {
        let services = self.registry.services();
        log::info!(
            "registering attribute table: {} services, {} characteristics",
            services.len(),
            self.registry.characteristic_count()
        );

        registrar.reserve(&self.registry)?;

        for service in services {
            let assigned = registrar.register_service(service)?;
            if assigned.characteristics.len() != service.characteristics.len() {
                return Err(RegistrationError::HandleCountMismatch {
                    expected: service.characteristics.len(),
                    got: assigned.characteristics.len(),
                });
            }
            sink.emit(&ServerEvent::ServiceRegistered {
                uuid: service.uuid,
                handle: assigned.service_handle,
            });

            for (spec, binding) in service.characteristics.iter().zip(&assigned.characteristics) {
                if spec.access.contains(Caps::NOTIFY) && binding.cccd_handle.is_none() {
                    return Err(RegistrationError::MissingDescriptor(spec.id));
                }
                let slot = self.slot_mut(spec.id);
                if slot.handle.is_some() {
                    return Err(RegistrationError::AlreadyBound(spec.id));
                }
                slot.handle = Some(binding.value_handle);
                slot.cccd = binding.cccd_handle;

                sink.emit(&ServerEvent::CharacteristicRegistered {
                    id: spec.id,
                    uuid: spec.uuid,
                    value_handle: binding.value_handle,
                });
                if let Some(cccd_handle) = binding.cccd_handle {
                    sink.emit(&ServerEvent::DescriptorRegistered {
                        id: spec.id,
                        cccd_handle,
                    });
                }
            }
        }

        log::info!("attribute table registered");
        Ok(())
    }
}
