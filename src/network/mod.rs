//! Network service abstraction.
//!
//! The provisioning flow talks to the WiFi stack only through
//! [`NetworkService`], so the same controller runs against:
//! - **ESP32** (`esp32` feature): [`esp::EspNetwork`] over `EspWifi`
//! - **Host / tests**: [`crate::sim::SimulatedNetwork`]

#[cfg(feature = "esp32")]
pub mod esp;
mod scan;

pub use scan::{filter_and_rank, scan_networks};

use crate::config::{WifiConfig, MIN_PASSWORD_LEN};
use std::fmt;

/// Security of an access point, reduced to what provisioning cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityKind {
    /// No authentication.
    Open,
    /// WEP.
    Legacy,
    /// WPA, WPA2, WPA3 or enterprise.
    Protected,
}

impl SecurityKind {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Legacy => "WEP",
            Self::Protected => "WPA",
        }
    }

    /// True for anything other than [`SecurityKind::Open`].
    pub fn is_secured(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

/// Security to require when joining `config`.
///
/// `advertised` is what the last scan reported for the SSID. Without a scan,
/// a passphrase too short for WPA can only be a WEP key.
pub fn join_security(config: &WifiConfig, advertised: Option<SecurityKind>) -> SecurityKind {
    if config.is_open() {
        return SecurityKind::Open;
    }
    match advertised {
        Some(kind) => kind,
        None if config.password.chars().count() < MIN_PASSWORD_LEN => SecurityKind::Legacy,
        None => SecurityKind::Protected,
    }
}

/// One access point from a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRecord {
    /// Network SSID.
    pub ssid: String,
    /// Received signal strength in dBm.
    pub signal_dbm: i8,
    /// Advertised security.
    pub security: SecurityKind,
}

impl NetworkRecord {
    /// Convenience constructor.
    pub fn new(ssid: impl Into<String>, signal_dbm: i8, security: SecurityKind) -> Self {
        Self {
            ssid: ssid.into(),
            signal_dbm,
            security,
        }
    }
}

/// Station connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Associated and holding an IP address.
    Connected,
    /// Connection requested, not yet up.
    Connecting,
    /// Not connected.
    Disconnected,
}

/// Progress of an asynchronous scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// Still scanning.
    Running,
    /// Finished with this many results available via [`NetworkService::network_at`].
    Complete(usize),
}

/// Details of an established connection, for the summary screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub ssid: String,
    pub ip: Option<String>,
    pub rssi_dbm: Option<i8>,
}

/// WiFi station operations used by the provisioning flow.
///
/// Only one scan is in flight at a time; its results stay available until
/// [`NetworkService::clear_scan_results`] or the next [`NetworkService::start_scan`].
pub trait NetworkService {
    /// Start connecting to `config`. Returns without waiting for the link.
    fn begin_connection(&mut self, config: &WifiConfig) -> Result<(), NetworkError>;

    /// Current station state.
    fn connection_status(&mut self) -> ConnectionStatus;

    /// Details of the current connection, if connected.
    fn connection_info(&mut self) -> Option<ConnectionInfo>;

    /// Start an asynchronous scan.
    fn start_scan(&mut self) -> Result<(), NetworkError>;

    /// Poll the scan started by [`NetworkService::start_scan`].
    fn scan_status(&mut self) -> Result<ScanStatus, NetworkError>;

    /// Result `index` of the last completed scan.
    fn network_at(&self, index: usize) -> Option<NetworkRecord>;

    /// Drop stored scan results.
    fn clear_scan_results(&mut self);
}

/// Errors that can occur during WiFi operations.
#[derive(Debug)]
pub enum NetworkError {
    /// SSID is invalid (too long or contains invalid characters).
    InvalidSsid,
    /// Password is invalid.
    InvalidPassword,
    /// The driver rejected the request.
    Driver(String),
    /// ESP-IDF error.
    #[cfg(feature = "esp32")]
    Esp(esp_idf_sys::EspError),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "invalid SSID"),
            Self::InvalidPassword => write!(f, "invalid password"),
            Self::Driver(msg) => write!(f, "WiFi driver error: {}", msg),
            #[cfg(feature = "esp32")]
            Self::Esp(e) => write!(f, "ESP error: {:?}", e),
        }
    }
}

impl std::error::Error for NetworkError {}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for NetworkError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Esp(e)
    }
}
