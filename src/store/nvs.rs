//! NVS persistence for WiFi credentials.
//!
//! Credentials live in ESP32 Non-Volatile Storage as two strings and two
//! `u32` tags, so they survive reboots. The namespace is opened read-only for
//! loading and read-write for saving and erasing.

use super::{CredentialStore, StoreError, StoredCredentials, PASS_KEY, PASS_TAG_KEY, SSID_KEY, SSID_TAG_KEY};
use crate::config::{MAX_PASSWORD_LEN, MAX_SSID_LEN};
use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};
use esp_idf_sys::{esp, EspError};
use log::{debug, info};
use std::ffi::CString;

/// String read buffer: longest value plus NUL terminator.
const MAX_STRING_BUFFER: usize = if MAX_PASSWORD_LEN > MAX_SSID_LEN {
    MAX_PASSWORD_LEN + 1
} else {
    MAX_SSID_LEN + 1
};

/// Credential store in one NVS namespace.
pub struct NvsStore {
    partition: EspNvsPartition<NvsDefault>,
    namespace: String,
}

impl NvsStore {
    /// Use `namespace` on the default NVS partition.
    pub fn new(partition: EspNvsPartition<NvsDefault>, namespace: impl Into<String>) -> Self {
        Self {
            partition,
            namespace: namespace.into(),
        }
    }

    /// Take the default NVS partition and use `namespace` on it.
    ///
    /// The partition can only be taken once per boot; share the returned
    /// store (or pass an existing partition to [`NvsStore::new`]) instead of
    /// calling this twice.
    pub fn take(namespace: impl Into<String>) -> Result<Self, EspError> {
        let partition = EspNvsPartition::<NvsDefault>::take()?;
        Ok(Self::new(partition, namespace))
    }

    fn open(&self, read_write: bool) -> Result<EspNvs<NvsDefault>, EspError> {
        EspNvs::new(self.partition.clone(), &self.namespace, read_write)
    }
}

/// Raw NVS handle for namespace-wide operations `EspNvs` does not expose.
struct RawHandle(esp_idf_sys::nvs_handle_t);

impl RawHandle {
    fn open_read_write(namespace: &str) -> Result<Self, StoreError> {
        let name = CString::new(namespace)
            .map_err(|_| StoreError::Format(format!("bad namespace '{}'", namespace)))?;
        let mut handle: esp_idf_sys::nvs_handle_t = 0;
        // SAFETY: `name` is NUL-terminated and `handle` is writable
        esp!(unsafe {
            esp_idf_sys::nvs_open(
                name.as_ptr(),
                esp_idf_sys::nvs_open_mode_t_NVS_READWRITE,
                &mut handle,
            )
        })?;
        Ok(Self(handle))
    }

    fn erase_all(&self) -> Result<(), EspError> {
        // SAFETY: the handle is open until drop
        esp!(unsafe { esp_idf_sys::nvs_erase_all(self.0) })?;
        esp!(unsafe { esp_idf_sys::nvs_commit(self.0) })
    }
}

impl Drop for RawHandle {
    fn drop(&mut self) {
        // SAFETY: opened by `nvs_open` and closed exactly once
        unsafe { esp_idf_sys::nvs_close(self.0) }
    }
}

fn is_not_found(e: &EspError) -> bool {
    e.code() == esp_idf_sys::ESP_ERR_NVS_NOT_FOUND as i32
}

fn read_string(nvs: &EspNvs<NvsDefault>, key: &str) -> Result<String, EspError> {
    let mut buf = [0u8; MAX_STRING_BUFFER];
    Ok(nvs.get_str(key, &mut buf)?.unwrap_or_default().to_string())
}

impl CredentialStore for NvsStore {
    fn read(&self) -> Result<StoredCredentials, StoreError> {
        let nvs = match self.open(false) {
            Ok(nvs) => nvs,
            // A namespace that was never written cannot be opened read-only
            Err(e) if is_not_found(&e) => {
                debug!("NVS namespace '{}' not found", self.namespace);
                return Ok(StoredCredentials::default());
            }
            Err(e) => return Err(e.into()),
        };

        Ok(StoredCredentials {
            ssid: read_string(&nvs, SSID_KEY)?,
            password: read_string(&nvs, PASS_KEY)?,
            ssid_tag: nvs.get_u32(SSID_TAG_KEY)?.unwrap_or(0),
            password_tag: nvs.get_u32(PASS_TAG_KEY)?.unwrap_or(0),
        })
    }

    fn write(&mut self, record: &StoredCredentials) -> Result<(), StoreError> {
        let mut nvs = self.open(true)?;
        nvs.set_str(SSID_KEY, &record.ssid)?;
        nvs.set_str(PASS_KEY, &record.password)?;
        nvs.set_u32(SSID_TAG_KEY, record.ssid_tag)?;
        nvs.set_u32(PASS_TAG_KEY, record.password_tag)?;
        info!("Credentials written to NVS namespace '{}'", self.namespace);
        Ok(())
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        RawHandle::open_read_write(&self.namespace)?.erase_all()?;
        info!("NVS namespace '{}' erased", self.namespace);
        Ok(())
    }
}

#[cfg(feature = "tap-tests")]
mod tap_tests {
    use super::*;
    use crate::config::WifiConfig;
    use crate::store::{clear_credentials, load_credentials, save_credentials, LoadedCredentials};
    use cardputer_wifi_setup_macros::tap_test;

    const TEST_NAMESPACE: &str = "wifi_test";

    #[tap_test]
    fn nvs_round_trip_and_erase() -> crate::testing::TestResult {
        let mut store = NvsStore::take(TEST_NAMESPACE)?;
        let config = WifiConfig::new("HomeNet", "pass1234")?;

        save_credentials(&mut store, &config)?;
        assert_eq!(load_credentials(&store)?, LoadedCredentials::Valid(config));

        clear_credentials(&mut store)?;
        assert_eq!(load_credentials(&store)?, LoadedCredentials::Missing);
        Ok(())
    }

    #[tap_test]
    fn nvs_erase_clears_foreign_keys() -> crate::testing::TestResult {
        let mut store = NvsStore::take(TEST_NAMESPACE)?;
        save_credentials(&mut store, &WifiConfig::new("HomeNet", "pass1234")?)?;
        store.open(true)?.set_u8("volume", 7)?;

        clear_credentials(&mut store)?;

        let nvs = store.open(true)?;
        assert!(!nvs.contains("volume")?);
        assert!(!nvs.contains(SSID_KEY)?);
        Ok(())
    }
}
