//! NVS-backed [`ConfigPort`] implementation.
//!
//! The whole [`SystemConfig`] travels as one postcard blob under a single
//! key, committed atomically by nvs_commit(). Fields are range-checked
//! before anything touches flash, and the node's namespace keeps the blob
//! apart from anything else sharing the partition.

use crate::config::{ConfigError, ConfigPort, SystemConfig};
use log::{info, warn};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "sensornode";
#[cfg(not(target_os = "espidf"))]
const CONFIG_KEY: &str = "nodecfg";

/// The config blob is a handful of scalars; anything bigger is noise.
#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 256;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Bring up NVS flash and hand back the adapter.
    ///
    /// A freshly-provisioned or version-bumped partition is erased and
    /// re-initialised in place; only an unrecoverable init failure
    /// surfaces as `Err(ConfigError::IoError)`.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: runs on the main task before the timers or the BLE
            // stack start, so nothing else touches NVS concurrently.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: stale partition, erasing and retrying init");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: flash partition ready");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: in-memory sim backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    /// Degraded-mode adapter for when flash init fails: loads fall back
    /// to defaults and saves are dropped, so the node still boots.
    pub fn unpersisted() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Run a closure against an opened NVS namespace; the handle is closed
    /// on every path out.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if cfg.device_name.is_empty() {
        return Err(ConfigError::ValidationFailed("device_name must be non-empty"));
    }
    if !(100..=60_000).contains(&cfg.heart_rate_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "heart_rate_interval_ms must be 100–60000",
        ));
    }
    if !(100..=600_000).contains(&cfg.env_sample_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "env_sample_interval_ms must be 100–600000",
        ));
    }
    if !(-40.0..=85.0).contains(&cfg.temperature_base_c) {
        return Err(ConfigError::ValidationFailed(
            "temperature_base_c must be -40.0–85.0",
        ));
    }
    if !(0.0..=100.0).contains(&cfg.humidity_base_pct) {
        return Err(ConfigError::ValidationFailed(
            "humidity_base_pct must be 0.0–100.0",
        ));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
            if let Some(bytes) = self.store.borrow().get(&key) {
                let cfg: SystemConfig =
                    postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: config read from sim store");
                Ok(cfg)
            } else {
                info!("NvsAdapter: nothing stored yet, using defaults");
                Ok(SystemConfig::default())
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, false, |handle| {
                let key = b"nodecfg\0";
                let mut size: usize = 0;

                // Probe for the blob size before allocating.
                let rc = unsafe {
                    nvs_get_blob(
                        handle,
                        key.as_ptr() as *const _,
                        core::ptr::null_mut(),
                        &mut size,
                    )
                };
                if rc == ESP_ERR_NVS_NOT_FOUND {
                    return Err(ESP_ERR_NVS_NOT_FOUND);
                }
                if rc != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                    return Err(rc);
                }

                let mut blob = vec![0u8; size];
                let rc = unsafe {
                    nvs_get_blob(
                        handle,
                        key.as_ptr() as *const _,
                        blob.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if rc != ESP_OK {
                    return Err(rc);
                }

                Ok(blob)
            });

            match result {
                Ok(blob) => {
                    let cfg: SystemConfig =
                        postcard::from_bytes(&blob).map_err(|_| ConfigError::Corrupted)?;
                    info!("NvsAdapter: config blob read ({} bytes)", blob.len());
                    Ok(cfg)
                }
                Err(rc) if rc == ESP_ERR_NVS_NOT_FOUND => {
                    info!("NvsAdapter: nothing stored yet, using defaults");
                    Ok(SystemConfig::default())
                }
                Err(rc) => {
                    warn!("NvsAdapter: read failed (rc={}), using defaults", rc);
                    Ok(SystemConfig::default())
                }
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;

        #[cfg(not(target_os = "espidf"))]
        {
            let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
            let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
            self.store.borrow_mut().insert(key, bytes);
            info!("NvsAdapter: config stored (sim)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let blob = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, true, |handle| {
                let key = b"nodecfg\0";
                let rc = unsafe {
                    nvs_set_blob(
                        handle,
                        key.as_ptr() as *const _,
                        blob.as_ptr() as *const _,
                        blob.len(),
                    )
                };
                if rc != ESP_OK {
                    return Err(rc);
                }
                let rc = unsafe { nvs_commit(handle) };
                if rc != ESP_OK {
                    return Err(rc);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: config blob written ({} bytes)", blob.len());
                    Ok(())
                }
                Err(rc) => {
                    warn!("NvsAdapter: write failed (rc={})", rc);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_without_save_yields_defaults() {
        let nvs = NvsAdapter::new().unwrap();
        let cfg = nvs.load().unwrap();
        assert_eq!(cfg, SystemConfig::default());
    }

    #[test]
    fn save_then_load_roundtrip() {
        let nvs = NvsAdapter::new().unwrap();
        let mut cfg = SystemConfig::default();
        cfg.heart_rate_interval_ms = 500;
        cfg.env_sample_interval_ms = 4000;
        nvs.save(&cfg).unwrap();
        assert_eq!(nvs.load().unwrap(), cfg);
    }

    #[test]
    fn save_rejects_out_of_range_interval() {
        let nvs = NvsAdapter::new().unwrap();
        let mut cfg = SystemConfig::default();
        cfg.heart_rate_interval_ms = 10; // below the floor
        assert!(matches!(
            nvs.save(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
        // Nothing persisted — load still yields defaults.
        assert_eq!(nvs.load().unwrap(), SystemConfig::default());
    }

    #[test]
    fn save_rejects_empty_device_name() {
        let nvs = NvsAdapter::new().unwrap();
        let mut cfg = SystemConfig::default();
        cfg.device_name = heapless::String::new();
        assert!(matches!(
            nvs.save(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn corrupted_blob_is_reported() {
        let nvs = NvsAdapter::new().unwrap();
        let key = NvsAdapter::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
        nvs.store
            .borrow_mut()
            .insert(key, vec![0xFF, 0xFE, 0x01]);
        assert_eq!(nvs.load(), Err(ConfigError::Corrupted));
    }
}
