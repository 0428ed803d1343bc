//! Periodic sampling ticks via ESP-IDF's esp_timer API.
//!
//! Two timers feed the SPSC queue at the configured heart-rate and
//! environment cadences. On simulation targets the sleep loop in main
//! produces the same events instead.
//!
//! esp_timer dispatches callbacks on its own task rather than in ISR
//! context, and push_event() is atomic either way.

#[cfg(target_os = "espidf")]
use crate::events::{push_event, Event};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
static mut HEART_RATE_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut ENV_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: HEART_RATE_TIMER is written exactly once in `start_timers()`,
/// on the main task, before either callback can run.
#[cfg(target_os = "espidf")]
unsafe fn heart_rate_timer() -> esp_timer_handle_t {
    unsafe { HEART_RATE_TIMER }
}

/// SAFETY: Same invariants as `heart_rate_timer()`.
#[cfg(target_os = "espidf")]
unsafe fn env_timer() -> esp_timer_handle_t {
    unsafe { ENV_TIMER }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn heart_rate_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::HeartRateTick);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn env_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::EnvSampleTick);
}

/// Start the sampling tick timers with the configured periods.
#[cfg(target_os = "espidf")]
pub fn start_timers(heart_rate_interval_ms: u32, env_sample_interval_ms: u32) {
    // SAFETY: both handle statics are written here once, on the main
    // task, before the first callback can fire. The callbacks never
    // touch the handles; they only push events.
    unsafe {
        let hr_args = esp_timer_create_args_t {
            callback: Some(heart_rate_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"heart_rate\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&hr_args, &raw mut HEART_RATE_TIMER);
        if ret != ESP_OK {
            log::error!(
                "hw_timer: heart-rate timer create failed (rc={ret}) — continuing without ticks"
            );
            return;
        }
        let ret = esp_timer_start_periodic(HEART_RATE_TIMER, u64::from(heart_rate_interval_ms) * 1000);
        if ret != ESP_OK {
            log::error!("hw_timer: heart-rate timer start failed (rc={ret})");
            return;
        }

        let env_args = esp_timer_create_args_t {
            callback: Some(env_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"env\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&env_args, &raw mut ENV_TIMER);
        if ret != ESP_OK {
            log::error!(
                "hw_timer: env timer create failed (rc={ret}) — continuing without env ticks"
            );
            return;
        }
        let ret = esp_timer_start_periodic(ENV_TIMER, u64::from(env_sample_interval_ms) * 1000);
        if ret != ESP_OK {
            log::error!("hw_timer: env timer start failed (rc={ret})");
            return;
        }

        info!(
            "hw_timer: heart-rate@{heart_rate_interval_ms}ms + env@{env_sample_interval_ms}ms started"
        );
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn start_timers(_heart_rate_interval_ms: u32, _env_sample_interval_ms: u32) {
    log::info!("hw_timer(sim): no timers; the sleep loop produces the ticks");
}

/// Stop all sampling tick timers.
#[cfg(target_os = "espidf")]
pub fn stop_timers() {
    // SAFETY: handles are valid if start_timers() succeeded; null-check
    // prevents touching timers that never got created.
    unsafe {
        // SAFETY: heart_rate_timer()/env_timer() contract — main task only.
        let hr = heart_rate_timer();
        if !hr.is_null() {
            esp_timer_stop(hr);
        }
        let env = env_timer();
        if !env.is_null() {
            esp_timer_stop(env);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_timers() {}
