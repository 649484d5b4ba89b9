//! Credential persistence.
//!
//! Credentials are kept as four key-value pairs in one namespace: the SSID,
//! the passphrase, and an [integrity tag](crate::integrity) for each. A record
//! is only trusted when both tags still match their strings, which catches
//! writes that were interrupted part way through.
//!
//! # Backends
//!
//! - [`MemoryStore`] - in-memory, for tests and simulation
//! - [`file::FileStore`] - JSON file (host only)
//! - [`nvs::NvsStore`] - ESP32 Non-Volatile Storage (ESP32 only)

#[cfg(not(target_os = "espidf"))]
pub mod file;
#[cfg(feature = "esp32")]
pub mod nvs;

use crate::config::WifiConfig;
use crate::integrity;
use log::{debug, info, warn};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key for the network SSID.
pub const SSID_KEY: &str = "wifi_ssid";

/// Key for the network passphrase.
pub const PASS_KEY: &str = "wifi_pass";

/// Key for the SSID integrity tag.
pub const SSID_TAG_KEY: &str = "ssid_hash";

/// Key for the passphrase integrity tag.
pub const PASS_TAG_KEY: &str = "pass_hash";

/// The raw persisted fields.
///
/// Missing keys read back as an empty string or a zero tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct StoredCredentials {
    pub ssid: String,
    pub password: String,
    pub ssid_tag: u32,
    pub password_tag: u32,
}

impl StoredCredentials {
    /// Build the record for `config`, computing both tags.
    pub fn seal(config: &WifiConfig) -> Self {
        Self {
            ssid: config.ssid.clone(),
            password: config.password.clone(),
            ssid_tag: integrity::integrity_tag(&config.ssid),
            password_tag: integrity::integrity_tag(&config.password),
        }
    }

    /// True if the SSID is present and both tags match their strings.
    pub fn is_intact(&self) -> bool {
        !self.ssid.is_empty()
            && integrity::verify(&self.ssid, self.ssid_tag)
            && integrity::verify(&self.password, self.password_tag)
    }
}

/// Key-value persistence for one credential namespace.
pub trait CredentialStore {
    /// Read all fields. Opens the namespace read-only where the backend
    /// distinguishes.
    fn read(&self) -> Result<StoredCredentials, StoreError>;

    /// Write all fields as one logical update.
    ///
    /// Backends make no promise that the four writes land together; an
    /// interrupted write is detected by the tags on the next read.
    fn write(&mut self, record: &StoredCredentials) -> Result<(), StoreError>;

    /// Erase the whole namespace, including keys this crate did not write.
    fn erase(&mut self) -> Result<(), StoreError>;
}

/// Result of checking the stored credentials at boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedCredentials {
    /// Tags match; safe to auto-connect.
    Valid(WifiConfig),
    /// Nothing stored (empty SSID).
    Missing,
    /// Something is stored but fails the integrity check.
    Corrupted,
}

impl LoadedCredentials {
    /// True only for [`LoadedCredentials::Valid`].
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// The trusted configuration, if any.
    pub fn into_config(self) -> Option<WifiConfig> {
        match self {
            Self::Valid(config) => Some(config),
            _ => None,
        }
    }
}

/// Load credentials and check their integrity. Has no side effects.
///
/// An intact record whose strings break the [`WifiConfig`] length limits is
/// reported as [`LoadedCredentials::Corrupted`]; this crate never writes one.
pub fn load_credentials(store: &dyn CredentialStore) -> Result<LoadedCredentials, StoreError> {
    let record = store.read()?;

    if record.ssid.is_empty() {
        debug!("No credentials stored");
        return Ok(LoadedCredentials::Missing);
    }

    if !record.is_intact() {
        warn!("Stored credentials failed integrity check");
        return Ok(LoadedCredentials::Corrupted);
    }

    match WifiConfig::new(record.ssid.clone(), record.password.clone()) {
        Ok(config) => {
            debug!("Loaded credentials for '{}'", config.ssid);
            Ok(LoadedCredentials::Valid(config))
        }
        Err(e) => {
            warn!("Stored credentials are unusable: {}", e);
            Ok(LoadedCredentials::Corrupted)
        }
    }
}

/// Persist `config` together with its integrity tags.
pub fn save_credentials(store: &mut dyn CredentialStore, config: &WifiConfig) -> Result<(), StoreError> {
    store.write(&StoredCredentials::seal(config))?;
    info!(
        "Saved credentials for '{}' ({} char passphrase)",
        config.ssid,
        config.password.len()
    );
    Ok(())
}

/// Erase all stored credentials.
pub fn clear_credentials(store: &mut dyn CredentialStore) -> Result<(), StoreError> {
    store.erase()?;
    warn!("Stored credentials erased");
    Ok(())
}

/// In-memory credential store.
///
/// Can simulate a write that only persists the first few fields, the way a
/// power cut in the middle of saving would.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ssid: Option<String>,
    password: Option<String>,
    ssid_tag: Option<u32>,
    password_tag: Option<u32>,
    persist_limit: Option<usize>,
    failing_writes: usize,
    writes: usize,
    erases: usize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `record`.
    pub fn with_record(record: &StoredCredentials) -> Self {
        let mut store = Self::new();
        store.put(record, 4);
        store
    }

    /// Only persist the first `fields` fields of each write
    /// (order: SSID, passphrase, SSID tag, passphrase tag).
    pub fn persist_only(mut self, fields: usize) -> Self {
        self.persist_limit = Some(fields);
        self
    }

    /// The next `count` writes fail without storing anything.
    pub fn with_failing_writes(mut self, count: usize) -> Self {
        self.failing_writes = count;
        self
    }

    /// Mutable access to the stored SSID, for corrupting it in tests.
    pub fn ssid_mut(&mut self) -> Option<&mut String> {
        self.ssid.as_mut()
    }

    /// Mutable access to the stored passphrase, for corrupting it in tests.
    pub fn password_mut(&mut self) -> Option<&mut String> {
        self.password.as_mut()
    }

    /// Number of completed `write` calls.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Number of completed `erase` calls.
    pub fn erases(&self) -> usize {
        self.erases
    }

    /// True if no field is stored.
    pub fn is_empty(&self) -> bool {
        self.ssid.is_none()
            && self.password.is_none()
            && self.ssid_tag.is_none()
            && self.password_tag.is_none()
    }

    fn put(&mut self, record: &StoredCredentials, fields: usize) {
        if fields > 0 {
            self.ssid = Some(record.ssid.clone());
        }
        if fields > 1 {
            self.password = Some(record.password.clone());
        }
        if fields > 2 {
            self.ssid_tag = Some(record.ssid_tag);
        }
        if fields > 3 {
            self.password_tag = Some(record.password_tag);
        }
    }
}

impl CredentialStore for MemoryStore {
    fn read(&self) -> Result<StoredCredentials, StoreError> {
        Ok(StoredCredentials {
            ssid: self.ssid.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
            ssid_tag: self.ssid_tag.unwrap_or(0),
            password_tag: self.password_tag.unwrap_or(0),
        })
    }

    fn write(&mut self, record: &StoredCredentials) -> Result<(), StoreError> {
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "flash write failed",
            )));
        }
        let fields = self.persist_limit.unwrap_or(4);
        self.put(record, fields);
        self.writes += 1;
        Ok(())
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        self.ssid = None;
        if let Some(password) = self.password.as_mut() {
            password.zeroize();
        }
        self.password = None;
        self.ssid_tag = None;
        self.password_tag = None;
        self.erases += 1;
        Ok(())
    }
}

/// Errors that can occur while reading or writing credentials.
#[derive(Debug)]
pub enum StoreError {
    /// Host file I/O failed.
    Io(std::io::Error),
    /// Stored data could not be decoded.
    Format(String),
    /// Written data did not read back identically.
    VerifyFailed,
    /// ESP-IDF NVS error.
    #[cfg(feature = "esp32")]
    Esp(esp_idf_sys::EspError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Format(msg) => write!(f, "invalid stored data: {}", msg),
            Self::VerifyFailed => write!(f, "read-back verification failed"),
            #[cfg(feature = "esp32")]
            Self::Esp(e) => write!(f, "NVS error: {:?}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for StoreError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Esp(e)
    }
}
