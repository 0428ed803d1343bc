//! BLE GATT transport adapter.
//!
//! Bridges the platform Bluetooth stack to the transport-neutral server
//! core in [`crate::gatt`]. The core never sees a stack type; this
//! module owns every `esp_idf_svc::sys` call.
//!
//! ## Targets
//!
//! - **`target_os = "espidf"`**: Bluedroid GATT server via `esp_idf_svc::sys`.
//! - **anything else**: simulation stand-ins so host tests can drive the
//!   same registration and indication paths.
//!
//! ## Callback bridge (espidf)
//!
//! Bluedroid delivers GATT events on its own task. The handlers below
//! translate each raw event into a call on the [`GattServer`] held in
//! the shared [`GattRuntime`]:
//!
//! | Bluedroid event          | Core call                                |
//! |--------------------------|------------------------------------------|
//! | `READ_EVT`               | `handle_access(Read)` + `send_response`  |
//! | `WRITE_EVT` (value)      | `handle_access(Write)` + rsp if needed   |
//! | `WRITE_EVT` (CCCD)       | `on_subscribe`                           |
//! | `DISCONNECT_EVT`         | `on_disconnect` + advertising restart    |
//! | `CREATE/ADD_CHAR[_DESCR]`| registration chain (see `RegChain`)      |
//!
//! Attribute placement is sequential: Bluedroid confirms each attribute
//! with its own event, so [`EspAttributeRegistrar`] installs a
//! `RegChain`, issues one `add_char`/`add_char_descr` at a time from
//! the callback task, and polls until the chain reports done or failed.

use std::sync::Mutex;

use log::{error, info};
#[cfg(target_os = "espidf")]
use log::warn;

use crate::adapters::hardware::HardwareAdapter;
use crate::adapters::log_sink::LogEventSink;
use crate::error::Error;
use crate::events::Event;
use crate::gatt::ports::{
    AttributeRegistrar, CharacteristicRegistration, IndicationError, IndicationSender,
    RegistrationError, ServiceRegistration,
};
use crate::gatt::registry::{AttributeRegistry, ServiceSpec};
use crate::gatt::server::GattServer;
use crate::gatt::{AccessRequest, AttHandle, AttStatus, Caps, CharacteristicId, ConnHandle, ValueBuf};

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

#[cfg(target_os = "espidf")]
use crate::config::MAX_DEVICE_NAME_LEN;
#[cfg(target_os = "espidf")]
use crate::events::push_event;
#[cfg(target_os = "espidf")]
use crate::gatt::registry::{CharacteristicSpec, UUID_DSC_CCCD};
#[cfg(target_os = "espidf")]
use crate::gatt::Uuid;

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

/// CCCD bitfield written by centrals (Core spec Vol 3 Part G 3.3.3.3).
#[cfg(target_os = "espidf")]
const CCCD_NOTIFY_BIT: u16 = 0x0001;
#[cfg(target_os = "espidf")]
const CCCD_INDICATE_BIT: u16 = 0x0002;

#[cfg(target_os = "espidf")]
const REG_POLL_INTERVAL_MS: u64 = 10;
/// Bound on waiting for the stack to confirm a registration step.
#[cfg(target_os = "espidf")]
const REG_TIMEOUT_MS: u64 = 2000;

// ───────────────────────────────────────────────────────────────
// Shared runtime
// ───────────────────────────────────────────────────────────────

/// Everything the Bluedroid callbacks and the main loop both touch:
/// the server core, the hardware it samples, and the event sink.
pub struct GattRuntime {
    pub server: GattServer,
    pub hw: HardwareAdapter,
    pub sink: LogEventSink,
}

// GATTS events arrive on the Bluedroid task, never in ISR context, so a
// std Mutex is fine here.
static RUNTIME: Mutex<Option<GattRuntime>> = Mutex::new(None);

/// Hand the assembled runtime to the transport layer. Call once at boot,
/// before the stack starts delivering events.
pub fn install_runtime(server: GattServer, hw: HardwareAdapter, sink: LogEventSink) {
    if let Ok(mut guard) = RUNTIME.lock() {
        *guard = Some(GattRuntime { server, hw, sink });
        info!("gatt runtime installed");
    } else {
        error!("gatt runtime lock poisoned; install dropped");
    }
}

/// Run `f` against the installed runtime. Returns `None` (and logs)
/// when nothing is installed yet.
pub fn with_runtime<T>(f: impl FnOnce(&mut GattRuntime) -> T) -> Option<T> {
    let Ok(mut guard) = RUNTIME.lock() else {
        error!("gatt runtime lock poisoned");
        return None;
    };
    match guard.as_mut() {
        Some(rt) => Some(f(rt)),
        None => {
            error!("gatt runtime not installed");
            None
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Main-loop event dispatch
// ───────────────────────────────────────────────────────────────

/// React to one queued event: sample on timer ticks and push fresh
/// values to whoever is subscribed. Delivery is fire-and-forget — the
/// server core drops it silently when nobody listens.
pub fn dispatch_event(event: Event) {
    with_runtime(|rt| match event {
        Event::HeartRateTick => {
            rt.hw.sample_heart_rate();
            indicate(rt, CharacteristicId::HeartRate);
        }
        Event::EnvSampleTick => {
            rt.hw.sample_env();
            indicate(rt, CharacteristicId::Temperature);
            indicate(rt, CharacteristicId::Humidity);
        }
        Event::BleConnected => info!("link: central connected"),
        Event::BleDisconnected => info!("link: central gone, advertising resumed"),
    });
}

fn indicate(rt: &mut GattRuntime, id: CharacteristicId) {
    let GattRuntime { server, hw, .. } = rt;
    let server: &GattServer = server;
    let mut sender = PlatformIndicationSender { server, hw };
    server.notify(id, &mut sender);
}

#[cfg(target_os = "espidf")]
type PlatformIndicationSender<'a> = EspIndicationSender<'a>;
#[cfg(not(target_os = "espidf"))]
type PlatformIndicationSender<'a> = SimIndicationSender<'a>;

// ───────────────────────────────────────────────────────────────
// Attribute registration
// ───────────────────────────────────────────────────────────────

/// Place the whole attribute table with the platform stack and bind the
/// resulting handles into the server core.
pub fn register_attributes() -> Result<(), Error> {
    #[cfg(target_os = "espidf")]
    let mut registrar = EspAttributeRegistrar;
    #[cfg(not(target_os = "espidf"))]
    let mut registrar = SimAttributeRegistrar::new();

    match with_runtime(|rt| {
        let GattRuntime { server, sink, .. } = rt;
        server.register_all(&mut registrar, sink)
    }) {
        Some(Ok(())) => Ok(()),
        Some(Err(e)) => Err(Error::Registration(e)),
        None => Err(Error::Init("gatt runtime not installed")),
    }
}

// ───────────────────────────────────────────────────────────────
// espidf: Bluedroid statics
// ───────────────────────────────────────────────────────────────

/// Sentinel for "no GATT interface yet". Bluedroid interface ids are
/// small u8s, so `u32::MAX` is safely out of band.
#[cfg(target_os = "espidf")]
const NO_GATTS_IF: u32 = u32::MAX;

#[cfg(target_os = "espidf")]
static BLE_GATTS_IF: AtomicU32 = AtomicU32::new(NO_GATTS_IF);

#[cfg(target_os = "espidf")]
fn gatts_interface() -> Option<esp_idf_svc::sys::esp_gatt_if_t> {
    let raw = BLE_GATTS_IF.load(AtomicOrdering::Relaxed);
    (raw != NO_GATTS_IF).then_some(raw as esp_idf_svc::sys::esp_gatt_if_t)
}

/// In-flight service registration. Bluedroid confirms one attribute per
/// event, so the callback walks this chain until every characteristic
/// (and CCCD) of the current service is placed.
#[cfg(target_os = "espidf")]
struct RegChain {
    service: ServiceSpec,
    next_char: usize,
    assigned: ServiceRegistration,
    failed: Option<i32>,
    done: bool,
}

#[cfg(target_os = "espidf")]
static REG_CHAIN: Mutex<Option<RegChain>> = Mutex::new(None);

#[cfg(target_os = "espidf")]
fn clear_chain() {
    if let Ok(mut slot) = REG_CHAIN.lock() {
        *slot = None;
    }
}

// ───────────────────────────────────────────────────────────────
// espidf: FFI helpers
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn uuid_to_esp(uuid: Uuid) -> esp_idf_svc::sys::esp_bt_uuid_t {
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    match uuid {
        Uuid::Sig(short) => {
            t.len = 2;
            unsafe {
                t.uuid.uuid16 = short;
            }
        }
        Uuid::Vendor(long) => {
            t.len = 16;
            unsafe {
                t.uuid.uuid128 = long.to_le_bytes();
            }
        }
    }
    t
}

#[cfg(target_os = "espidf")]
fn char_perm_prop(access: Caps) -> (u32, u32) {
    use esp_idf_svc::sys::{
        ESP_GATT_CHAR_PROP_BIT_INDICATE, ESP_GATT_CHAR_PROP_BIT_READ, ESP_GATT_CHAR_PROP_BIT_WRITE,
        ESP_GATT_PERM_READ, ESP_GATT_PERM_WRITE,
    };
    let mut perm = 0;
    let mut prop = 0;
    if access.contains(Caps::READ) {
        perm |= ESP_GATT_PERM_READ;
        prop |= ESP_GATT_CHAR_PROP_BIT_READ;
    }
    if access.contains(Caps::WRITE) {
        perm |= ESP_GATT_PERM_WRITE;
        prop |= ESP_GATT_CHAR_PROP_BIT_WRITE;
    }
    if access.contains(Caps::NOTIFY) {
        prop |= ESP_GATT_CHAR_PROP_BIT_INDICATE;
    }
    (perm, prop)
}

#[cfg(target_os = "espidf")]
fn add_gatt_char(svc_handle: u16, chr: &CharacteristicSpec) {
    use esp_idf_svc::sys::{esp_ble_gatts_add_char, esp_gatt_char_prop_t, esp_gatt_perm_t};
    let mut char_uuid = uuid_to_esp(chr.uuid);
    let (perm, prop) = char_perm_prop(chr.access);
    let rc = unsafe {
        esp_ble_gatts_add_char(
            svc_handle,
            &mut char_uuid,
            perm as esp_gatt_perm_t,
            prop as esp_gatt_char_prop_t,
            core::ptr::null_mut(),
            core::ptr::null_mut(),
        )
    };
    if rc != esp_idf_svc::sys::ESP_OK as i32 {
        error!("BLE GATTS: add_char {:?} rejected ({})", chr.id, rc);
    }
}

#[cfg(target_os = "espidf")]
fn add_gatt_cccd(svc_handle: u16) {
    use esp_idf_svc::sys::{
        esp_ble_gatts_add_char_descr, esp_gatt_perm_t, ESP_GATT_PERM_READ, ESP_GATT_PERM_WRITE,
    };
    let mut descr_uuid = uuid_to_esp(Uuid::Sig(UUID_DSC_CCCD));
    let rc = unsafe {
        esp_ble_gatts_add_char_descr(
            svc_handle,
            &mut descr_uuid,
            (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
            core::ptr::null_mut(),
            core::ptr::null_mut(),
        )
    };
    if rc != esp_idf_svc::sys::ESP_OK as i32 {
        error!("BLE GATTS: add_char_descr rejected ({})", rc);
    }
}

/// Issue the add for the characteristic at `next_char`, or mark the
/// chain done when the service is fully placed.
#[cfg(target_os = "espidf")]
fn issue_next_char(chain: &mut RegChain) {
    match chain.service.characteristics.get(chain.next_char) {
        Some(chr) => add_gatt_char(chain.assigned.service_handle, chr),
        None => chain.done = true,
    }
}

#[cfg(target_os = "espidf")]
fn start_advertising_raw() {
    use esp_idf_svc::sys::{
        esp_ble_adv_params_t, esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
        esp_ble_adv_channel_t_ADV_CHNL_ALL, esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
        esp_ble_adv_type_t_ADV_TYPE_IND, esp_ble_gap_start_advertising,
    };
    let mut adv_params = unsafe {
        esp_ble_adv_params_t {
            adv_int_min: 0x20,
            adv_int_max: 0x40,
            adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
            own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
            channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
            adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
            ..core::mem::zeroed()
        }
    };
    unsafe {
        esp_ble_gap_start_advertising(&mut adv_params);
    }
}

// ───────────────────────────────────────────────────────────────
// espidf: GAP / GATTS callbacks
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    _param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::{
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT,
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT,
    };
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            info!("BLE GAP: advertising active");
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
            info!("BLE GAP: advertising halted");
        }
        _ => {}
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_idf_svc::sys::esp_gatts_cb_event_t,
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
) {
    use esp_idf_svc::sys::{
        esp_ble_gatts_start_service, esp_gatt_status_t_ESP_GATT_OK,
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT, esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT,
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT, esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT,
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT, esp_gatts_cb_event_t_ESP_GATTS_READ_EVT,
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT, esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT,
    };

    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            let p = unsafe { &(*param).reg };
            if p.status == esp_gatt_status_t_ESP_GATT_OK {
                BLE_GATTS_IF.store(u32::from(gatts_if), AtomicOrdering::Relaxed);
                info!("BLE GATTS: app {} registered (if={})", p.app_id, gatts_if);
            } else {
                error!("BLE GATTS: app registration failed (status={})", p.status);
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let p = unsafe { &(*param).create };
            let Ok(mut slot) = REG_CHAIN.lock() else { return };
            let Some(chain) = slot.as_mut() else {
                warn!("BLE GATTS: CREATE event outside a registration");
                return;
            };
            if p.status != esp_gatt_status_t_ESP_GATT_OK {
                chain.failed = Some(p.status as i32);
                return;
            }
            chain.assigned.service_handle = p.service_handle;
            info!(
                "BLE GATTS: service {} created (handle={})",
                chain.service.uuid, p.service_handle
            );
            unsafe {
                esp_ble_gatts_start_service(p.service_handle);
            }
            issue_next_char(chain);
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let p = unsafe { &(*param).add_char };
            let Ok(mut slot) = REG_CHAIN.lock() else { return };
            let Some(chain) = slot.as_mut() else {
                warn!("BLE GATTS: ADD_CHAR event outside a registration");
                return;
            };
            if p.status != esp_gatt_status_t_ESP_GATT_OK {
                chain.failed = Some(p.status as i32);
                return;
            }
            let Some(chr) = chain.service.characteristics.get(chain.next_char) else {
                chain.failed = Some(-1);
                return;
            };
            let placed = CharacteristicRegistration {
                value_handle: p.attr_handle,
                cccd_handle: None,
            };
            if chain.assigned.characteristics.push(placed).is_err() {
                chain.failed = Some(-1);
                return;
            }
            info!(
                "BLE GATTS: characteristic {:?} placed (value_handle={})",
                chr.id, p.attr_handle
            );
            if chr.access.contains(Caps::NOTIFY) {
                add_gatt_cccd(chain.assigned.service_handle);
            } else {
                chain.next_char += 1;
                issue_next_char(chain);
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
            let p = unsafe { &(*param).add_char_descr };
            let Ok(mut slot) = REG_CHAIN.lock() else { return };
            let Some(chain) = slot.as_mut() else {
                warn!("BLE GATTS: ADD_CHAR_DESCR event outside a registration");
                return;
            };
            if p.status != esp_gatt_status_t_ESP_GATT_OK {
                chain.failed = Some(p.status as i32);
                return;
            }
            let Some(placed) = chain.assigned.characteristics.last_mut() else {
                chain.failed = Some(-1);
                return;
            };
            placed.cccd_handle = Some(p.attr_handle);
            info!("BLE GATTS: CCCD placed (handle={})", p.attr_handle);
            chain.next_char += 1;
            issue_next_char(chain);
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let p = unsafe { &(*param).connect };
            info!("BLE GATTS: central connected (conn_id={})", p.conn_id);
            push_event(Event::BleConnected);
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            let p = unsafe { &(*param).disconnect };
            info!(
                "BLE GATTS: client disconnected (conn_id={}, reason={:#04x})",
                p.conn_id, p.reason
            );
            with_runtime(|rt| {
                let GattRuntime { server, sink, .. } = rt;
                server.on_disconnect(p.conn_id, sink);
            });
            push_event(Event::BleDisconnected);
            start_advertising_raw();
        }
        esp_gatts_cb_event_t_ESP_GATTS_READ_EVT => {
            let p = unsafe { &(*param).read };
            on_gatts_read(gatts_if, p);
        }
        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = unsafe { &(*param).write };
            let data = if p.len == 0 {
                &[][..]
            } else {
                // SAFETY: value/len describe the live write payload for
                // the duration of this callback.
                unsafe { core::slice::from_raw_parts(p.value, p.len as usize) }
            };
            on_gatts_write(gatts_if, p, data);
        }
        _ => {}
    }
}

/// Serve an ATT read. CCCD reads answer from the subscription table;
/// everything else goes through access dispatch with a stack response
/// carrying the dispatch status verbatim.
#[cfg(target_os = "espidf")]
fn on_gatts_read(
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    p: &esp_idf_svc::sys::esp_ble_gatts_cb_param_t_gatts_read_evt_param,
) {
    use esp_idf_svc::sys::{esp_ble_gatts_send_response, esp_gatt_rsp_t, esp_gatt_status_t};

    let handle = p.handle;
    let mut rsp: esp_gatt_rsp_t = unsafe { core::mem::zeroed() };
    unsafe {
        rsp.attr_value.handle = handle;
    }

    let status = with_runtime(|rt| {
        if let Some(id) = rt.server.cccd_owner(handle) {
            let bits: u16 = if rt.server.indications_enabled(id) {
                CCCD_INDICATE_BIT
            } else {
                0
            };
            unsafe {
                rsp.attr_value.len = 2;
                rsp.attr_value.value[..2].copy_from_slice(&bits.to_le_bytes());
            }
            return AttStatus::Ok;
        }
        let mut out = ValueBuf::new();
        let GattRuntime { server, hw, .. } = rt;
        let status = server.handle_access(
            Some(p.conn_id),
            handle,
            AccessRequest::Read { out: &mut out },
            hw,
        );
        if status == AttStatus::Ok {
            unsafe {
                rsp.attr_value.len = out.len() as u16;
                rsp.attr_value.value[..out.len()].copy_from_slice(&out);
            }
        }
        status
    })
    .unwrap_or(AttStatus::UnlikelyError);

    let rc = unsafe {
        esp_ble_gatts_send_response(
            gatts_if,
            p.conn_id,
            p.trans_id,
            esp_gatt_status_t::from(status.as_raw()),
            &mut rsp,
        )
    };
    if rc != esp_idf_svc::sys::ESP_OK as i32 {
        error!("BLE GATTS: read response failed ({})", rc);
    }
}

/// Serve an ATT write. CCCD writes feed the subscription table; value
/// writes go through access dispatch. Prepared (long) writes are not
/// supported — no attribute is longer than one MTU.
#[cfg(target_os = "espidf")]
fn on_gatts_write(
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    p: &esp_idf_svc::sys::esp_ble_gatts_cb_param_t_gatts_write_evt_param,
    data: &[u8],
) {
    use esp_idf_svc::sys::{esp_ble_gatts_send_response, esp_gatt_status_t};

    let handle = p.handle;
    let status = if p.is_prep {
        error!("BLE GATTS: prepared write not supported (handle={})", handle);
        AttStatus::UnlikelyError
    } else {
        with_runtime(|rt| {
            let GattRuntime { server, hw, sink } = rt;
            if server.cccd_owner(handle).is_some() {
                if data.len() == 2 {
                    let bits = u16::from_le_bytes([data[0], data[1]]);
                    let enabled = bits & (CCCD_NOTIFY_BIT | CCCD_INDICATE_BIT) != 0;
                    server.on_subscribe(Some(p.conn_id), handle, enabled, sink);
                    AttStatus::Ok
                } else {
                    warn!("BLE GATTS: CCCD write with {} bytes (want 2)", data.len());
                    AttStatus::InvalidAttributeValueLength
                }
            } else {
                server.handle_access(
                    Some(p.conn_id),
                    handle,
                    AccessRequest::Write { payload: data },
                    hw,
                )
            }
        })
        .unwrap_or(AttStatus::UnlikelyError)
    };

    if p.need_rsp {
        let rc = unsafe {
            esp_ble_gatts_send_response(
                gatts_if,
                p.conn_id,
                p.trans_id,
                esp_gatt_status_t::from(status.as_raw()),
                core::ptr::null_mut(),
            )
        };
        if rc != esp_idf_svc::sys::ESP_OK as i32 {
            error!("BLE GATTS: write response failed ({})", rc);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// espidf: stack lifecycle
// ───────────────────────────────────────────────────────────────

/// Bring up the Bluedroid stack and register the GATT application.
/// Attribute placement happens afterwards via [`register_attributes`].
#[cfg(target_os = "espidf")]
pub fn start_stack() -> Result<(), Error> {
    use esp_idf_svc::sys::{
        esp_ble_gap_register_callback, esp_ble_gatts_app_register, esp_ble_gatts_register_callback,
        esp_bluedroid_enable, esp_bluedroid_init, esp_bt_controller_config_t,
        esp_bt_controller_enable, esp_bt_controller_init, esp_bt_controller_mem_release,
        esp_bt_mode_t_ESP_BT_MODE_BLE, esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT, ESP_OK,
    };
    unsafe {
        // Release classic BT memory (BLE-only mode saves ~30 KB).
        esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

        let mut bt_cfg = esp_bt_controller_config_t::default();
        let rc = esp_bt_controller_init(&mut bt_cfg);
        if rc != ESP_OK as i32 {
            error!("BLE: bt_controller_init failed (rc={})", rc);
            return Err(Error::BleInit("bt_controller_init"));
        }
        let rc = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
        if rc != ESP_OK as i32 {
            error!("BLE: bt_controller_enable failed (rc={})", rc);
            return Err(Error::BleInit("bt_controller_enable"));
        }
        let rc = esp_bluedroid_init();
        if rc != ESP_OK as i32 {
            error!("BLE: bluedroid_init failed (rc={})", rc);
            return Err(Error::BleInit("bluedroid_init"));
        }
        let rc = esp_bluedroid_enable();
        if rc != ESP_OK as i32 {
            error!("BLE: bluedroid_enable failed (rc={})", rc);
            return Err(Error::BleInit("bluedroid_enable"));
        }

        esp_ble_gap_register_callback(Some(ble_gap_event_handler));
        esp_ble_gatts_register_callback(Some(ble_gatts_event_handler));
        esp_ble_gatts_app_register(0);
    }
    info!("BLE(espidf): Bluedroid stack up");
    Ok(())
}

/// Set the advertised name and start connectable advertising.
#[cfg(target_os = "espidf")]
pub fn start_advertising(device_name: &str) {
    use esp_idf_svc::sys::esp_ble_gap_set_device_name;

    // Bluedroid wants a NUL-terminated C string.
    let mut name_buf = heapless::Vec::<u8, { MAX_DEVICE_NAME_LEN + 1 }>::new();
    let bytes = device_name.as_bytes();
    let take = bytes.len().min(MAX_DEVICE_NAME_LEN);
    let _ = name_buf.extend_from_slice(&bytes[..take]);
    let _ = name_buf.push(0);
    unsafe {
        esp_ble_gap_set_device_name(name_buf.as_ptr().cast());
    }
    start_advertising_raw();
    info!("BLE: advertising as '{}'", device_name);
}

// ───────────────────────────────────────────────────────────────
// espidf: port implementations
// ───────────────────────────────────────────────────────────────

/// Registrar backed by the Bluedroid attribute chain. The add calls are
/// confirmed asynchronously on the callback task, so each service
/// registration installs a [`RegChain`] and polls it to completion.
#[cfg(target_os = "espidf")]
pub struct EspAttributeRegistrar;

#[cfg(target_os = "espidf")]
impl AttributeRegistrar for EspAttributeRegistrar {
    fn reserve(&mut self, registry: &AttributeRegistry) -> Result<(), RegistrationError> {
        let mut waited_ms: u64 = 0;
        while gatts_interface().is_none() {
            if waited_ms >= REG_TIMEOUT_MS {
                error!("BLE: GATT app never registered with the stack");
                return Err(RegistrationError::Timeout);
            }
            std::thread::sleep(core::time::Duration::from_millis(REG_POLL_INTERVAL_MS));
            waited_ms += REG_POLL_INTERVAL_MS;
        }
        info!(
            "BLE: interface ready; placing {} services / {} characteristics",
            registry.services().len(),
            registry.characteristic_count()
        );
        Ok(())
    }

    fn register_service(
        &mut self,
        service: &ServiceSpec,
    ) -> Result<ServiceRegistration, RegistrationError> {
        use esp_idf_svc::sys::{
            esp_ble_gatts_create_service, esp_gatt_id_t, esp_gatt_srvc_id_t, ESP_OK,
        };

        let cccds = service
            .characteristics
            .iter()
            .filter(|c| c.access.contains(Caps::NOTIFY))
            .count();
        // 1 service declaration + (declaration + value) per
        // characteristic + one CCCD per notifiable one.
        let num_handles = 1 + 2 * service.characteristics.len() + cccds;

        let Some(gatts_if) = gatts_interface() else {
            return Err(RegistrationError::Timeout);
        };
        {
            let Ok(mut slot) = REG_CHAIN.lock() else {
                return Err(RegistrationError::OutOfResources);
            };
            *slot = Some(RegChain {
                service: *service,
                next_char: 0,
                assigned: ServiceRegistration::default(),
                failed: None,
                done: false,
            });
        }

        let mut svc_id = esp_gatt_srvc_id_t {
            id: esp_gatt_id_t {
                uuid: uuid_to_esp(service.uuid),
                inst_id: 0,
            },
            is_primary: true,
        };
        let rc = unsafe { esp_ble_gatts_create_service(gatts_if, &mut svc_id, num_handles as u16) };
        if rc != ESP_OK as i32 {
            clear_chain();
            return Err(RegistrationError::Rejected(rc));
        }

        let mut waited_ms: u64 = 0;
        loop {
            std::thread::sleep(core::time::Duration::from_millis(REG_POLL_INTERVAL_MS));
            waited_ms += REG_POLL_INTERVAL_MS;

            let Ok(mut slot) = REG_CHAIN.lock() else {
                return Err(RegistrationError::OutOfResources);
            };
            if let Some(chain) = slot.as_ref() {
                if let Some(rc) = chain.failed {
                    *slot = None;
                    return Err(RegistrationError::Rejected(rc));
                }
                if chain.done {
                    let assigned = chain.assigned.clone();
                    *slot = None;
                    return Ok(assigned);
                }
            }
            drop(slot);

            if waited_ms >= REG_TIMEOUT_MS {
                clear_chain();
                return Err(RegistrationError::Timeout);
            }
        }
    }
}

/// Sends one indication through Bluedroid, fetching the current value
/// from the source at send time (stack-local access, no connection).
#[cfg(target_os = "espidf")]
pub struct EspIndicationSender<'a> {
    pub server: &'a GattServer,
    pub hw: &'a mut HardwareAdapter,
}

#[cfg(target_os = "espidf")]
impl IndicationSender for EspIndicationSender<'_> {
    fn send_indication(
        &mut self,
        conn: ConnHandle,
        handle: AttHandle,
    ) -> Result<(), IndicationError> {
        use esp_idf_svc::sys::{esp_ble_gatts_send_indicate, ESP_OK};

        let mut out = ValueBuf::new();
        let fetched = self.server.handle_access(
            None,
            handle,
            AccessRequest::Read { out: &mut out },
            self.hw,
        );
        if fetched != AttStatus::Ok {
            return Err(IndicationError::ValueUnavailable);
        }
        let Some(gatts_if) = gatts_interface() else {
            return Err(IndicationError::SendFailed(-1));
        };
        let rc = unsafe {
            esp_ble_gatts_send_indicate(
                gatts_if,
                conn,
                handle,
                out.len() as u16,
                out.as_ptr().cast_mut(),
                true,
            )
        };
        if rc == ESP_OK as i32 {
            Ok(())
        } else {
            Err(IndicationError::SendFailed(rc))
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation (non-espidf)
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub fn start_stack() -> Result<(), Error> {
    info!("BLE(sim): stack up");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn start_advertising(device_name: &str) {
    info!("BLE(sim): advertising as '{}'", device_name);
}

/// Host-side registrar: hands out ascending synthetic handles with the
/// same attribute layout the real stack would produce.
#[cfg(not(target_os = "espidf"))]
pub struct SimAttributeRegistrar {
    next_handle: AttHandle,
}

#[cfg(not(target_os = "espidf"))]
impl SimAttributeRegistrar {
    pub fn new() -> Self {
        Self {
            next_handle: 0x0028,
        }
    }

    fn bump(&mut self) -> AttHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for SimAttributeRegistrar {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl AttributeRegistrar for SimAttributeRegistrar {
    fn reserve(&mut self, registry: &AttributeRegistry) -> Result<(), RegistrationError> {
        info!(
            "BLE(sim): reserving {} services / {} characteristics",
            registry.services().len(),
            registry.characteristic_count()
        );
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
        for chr in service.characteristics {
            self.bump(); // characteristic declaration attribute
            let value_handle = self.bump();
            let cccd_handle = if chr.access.contains(Caps::NOTIFY) {
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
        info!(
            "BLE(sim): service {} online (handle={})",
            service.uuid, assigned.service_handle
        );
        Ok(assigned)
    }
}

/// Host-side sender: fetches the value exactly like the real path, then
/// logs instead of radioing.
#[cfg(not(target_os = "espidf"))]
pub struct SimIndicationSender<'a> {
    pub server: &'a GattServer,
    pub hw: &'a mut HardwareAdapter,
}

#[cfg(not(target_os = "espidf"))]
impl IndicationSender for SimIndicationSender<'_> {
    fn send_indication(
        &mut self,
        conn: ConnHandle,
        handle: AttHandle,
    ) -> Result<(), IndicationError> {
        let mut out = ValueBuf::new();
        let fetched = self.server.handle_access(
            None,
            handle,
            AccessRequest::Read { out: &mut out },
            self.hw,
        );
        if fetched != AttStatus::Ok {
            return Err(IndicationError::ValueUnavailable);
        }
        info!(
            "BLE(sim): indication conn={} handle={} payload={:02x?}",
            conn,
            handle,
            &out[..]
        );
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SystemConfig;
    use crate::gatt::registry::device_registry;

    #[test]
    fn sim_registrar_places_cccds_for_notifiable_only() {
        let registry = device_registry();
        let mut registrar = SimAttributeRegistrar::new();
        assert!(registrar.reserve(&registry).is_ok());

        // Automation IO: the LED is write-only, no CCCD.
        let led_svc = registry.services()[2];
        let placed = registrar.register_service(&led_svc).unwrap();
        assert_eq!(placed.characteristics.len(), 1);
        assert!(placed.characteristics[0].cccd_handle.is_none());

        // Heart rate measurement is notifiable, so it gets one.
        let hr_svc = registry.services()[0];
        let placed = registrar.register_service(&hr_svc).unwrap();
        assert!(placed.characteristics[0].cccd_handle.is_some());
    }

    #[test]
    fn sim_registration_binds_every_slot() {
        let mut server = GattServer::new(device_registry());
        let mut registrar = SimAttributeRegistrar::new();
        let mut sink = LogEventSink;
        server.register_all(&mut registrar, &mut sink).unwrap();
        assert!(server.fully_registered());
    }

    #[test]
    fn sim_sender_reads_value_at_send_time() {
        let mut server = GattServer::new(device_registry());
        let mut registrar = SimAttributeRegistrar::new();
        let mut sink = LogEventSink;
        server.register_all(&mut registrar, &mut sink).unwrap();

        let mut hw = HardwareAdapter::new(&SystemConfig::default());
        let handle = server.handle_of(CharacteristicId::Temperature).unwrap();
        let mut sender = SimIndicationSender {
            server: &server,
            hw: &mut hw,
        };
        assert!(sender.send_indication(7, handle).is_ok());
    }
}
