//! Credential store for host (development) builds.
//!
//! Keeps the same four keys as the device namespace in a small JSON file,
//! `~/.cardputer-wifi-setup/credentials.json` by default.

use super::{CredentialStore, StoreError, StoredCredentials};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// On-disk layout. Missing keys decode as empty/zero, like a fresh namespace.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct FileRecord {
    wifi_ssid: String,
    wifi_pass: String,
    ssid_hash: u32,
    pass_hash: u32,
}

impl From<&StoredCredentials> for FileRecord {
    fn from(record: &StoredCredentials) -> Self {
        Self {
            wifi_ssid: record.ssid.clone(),
            wifi_pass: record.password.clone(),
            ssid_hash: record.ssid_tag,
            pass_hash: record.password_tag,
        }
    }
}

impl From<FileRecord> for StoredCredentials {
    fn from(record: FileRecord) -> Self {
        Self {
            ssid: record.wifi_ssid,
            password: record.wifi_pass,
            ssid_tag: record.ssid_hash,
            password_tag: record.pass_hash,
        }
    }
}

/// Get the default credential file path.
///
/// Returns `~/.cardputer-wifi-setup/credentials.json`
pub fn default_store_path() -> io::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "HOME not set"))?;
    Ok(PathBuf::from(home)
        .join(".cardputer-wifi-setup")
        .join("credentials.json"))
}

/// JSON-file credential store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store backed by [`default_store_path`].
    pub fn at_default_path() -> io::Result<Self> {
        Ok(Self::new(default_store_path()?))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileStore {
    fn read(&self) -> Result<StoredCredentials, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No credential file at {:?}", self.path);
                return Ok(StoredCredentials::default());
            }
            Err(e) => return Err(e.into()),
        };

        let record: FileRecord =
            serde_json::from_str(&text).map_err(|e| StoreError::Format(e.to_string()))?;
        Ok(record.into())
    }

    fn write(&mut self, record: &StoredCredentials) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&FileRecord::from(record))
            .map_err(|e| StoreError::Format(e.to_string()))?;
        fs::write(&self.path, &json)?;

        // Read back to catch silent write failures
        if fs::read_to_string(&self.path)? != json {
            return Err(StoreError::VerifyFailed);
        }

        info!("Credentials written to {:?}", self.path);
        Ok(())
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WifiConfig;
    use crate::store::{load_credentials, save_credentials, LoadedCredentials};
    use std::env;
    use std::sync::atomic::{AtomicU32, Ordering};

    // Counter to ensure unique test files even in parallel execution
    static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn unique_store_path() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let pid = std::process::id();
        env::temp_dir()
            .join(format!("cardputer-wifi-test-{}-{}", pid, id))
            .join("credentials.json")
    }

    #[test]
    fn test_round_trip() {
        let path = unique_store_path();
        let mut store = FileStore::new(&path);
        let config = WifiConfig::new("HomeNet", "pass1234").unwrap();

        save_credentials(&mut store, &config).unwrap();
        let loaded = load_credentials(&FileStore::new(&path)).unwrap();
        assert_eq!(loaded, LoadedCredentials::Valid(config));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let store = FileStore::new(unique_store_path());
        assert_eq!(store.read().unwrap(), StoredCredentials::default());
        assert_eq!(
            load_credentials(&store).unwrap(),
            LoadedCredentials::Missing
        );
    }

    #[test]
    fn test_uses_namespace_key_names() {
        let path = unique_store_path();
        let mut store = FileStore::new(&path);
        save_credentials(&mut store, &WifiConfig::new("A", "12345678").unwrap()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        for key in ["wifi_ssid", "wifi_pass", "ssid_hash", "pass_hash"] {
            assert!(text.contains(key), "missing key {}", key);
        }

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_tag_is_corrupted() {
        let path = unique_store_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"wifi_ssid":"HomeNet","wifi_pass":"pass1234"}"#).unwrap();

        let store = FileStore::new(&path);
        assert_eq!(
            load_credentials(&store).unwrap(),
            LoadedCredentials::Corrupted
        );

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_garbage_is_format_error() {
        let path = unique_store_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.read(), Err(StoreError::Format(_))));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_erase_removes_file_and_is_idempotent() {
        let path = unique_store_path();
        let mut store = FileStore::new(&path);
        save_credentials(&mut store, &WifiConfig::open("Cafe").unwrap()).unwrap();
        assert!(path.exists());

        store.erase().unwrap();
        assert!(!path.exists());
        store.erase().unwrap();

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
