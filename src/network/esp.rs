//! ESP32 WiFi station.
//!
//! Wraps the non-blocking `EspWifi` driver: connecting and scanning are
//! started here and polled by the provisioning flow.

use super::{
    join_security, ConnectionInfo, ConnectionStatus, NetworkError, NetworkRecord, NetworkService,
    ScanStatus, SecurityKind,
};
use crate::config::WifiConfig;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AccessPointInfo, AuthMethod, ClientConfiguration, Configuration, EspWifi};
use esp_idf_sys::EspError;
use log::{debug, info, warn};

/// WiFi station backed by ESP-IDF.
pub struct EspNetwork<'a> {
    wifi: EspWifi<'a>,
    ssid: Option<String>,
    results: Vec<NetworkRecord>,
    results_ready: bool,
}

impl<'a> EspNetwork<'a> {
    /// Create the driver and start it in station mode.
    ///
    /// Passing the NVS partition lets the driver keep its own calibration data.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Result<Self, EspError> {
        let mut wifi = EspWifi::new(modem, sysloop, nvs)?;
        wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
        wifi.start()?;
        info!("WiFi station started");

        Ok(Self {
            wifi,
            ssid: None,
            results: Vec::new(),
            results_ready: false,
        })
    }
}

fn security_of(auth: Option<AuthMethod>) -> SecurityKind {
    match auth {
        Some(AuthMethod::None) => SecurityKind::Open,
        Some(AuthMethod::WEP) => SecurityKind::Legacy,
        _ => SecurityKind::Protected,
    }
}

/// Lowest auth mode the station accepts for `security`.
fn auth_threshold(security: SecurityKind) -> AuthMethod {
    match security {
        SecurityKind::Open => AuthMethod::None,
        SecurityKind::Legacy => AuthMethod::WEP,
        SecurityKind::Protected => AuthMethod::WPA2Personal,
    }
}

fn record_of(ap: &AccessPointInfo) -> NetworkRecord {
    NetworkRecord::new(ap.ssid.as_str(), ap.signal_strength, security_of(ap.auth_method))
}

impl NetworkService for EspNetwork<'_> {
    fn begin_connection(&mut self, config: &WifiConfig) -> Result<(), NetworkError> {
        info!("Connecting to WiFi: {}", config.ssid);

        let advertised = self
            .results
            .iter()
            .find(|n| n.ssid == config.ssid)
            .map(|n| n.security);
        let security = join_security(config, advertised);
        debug!("Joining '{}' as {}", config.ssid, security.label());
        let auth_method = auth_threshold(security);

        let client = Configuration::Client(ClientConfiguration {
            ssid: config
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| NetworkError::InvalidSsid)?,
            password: config
                .password
                .as_str()
                .try_into()
                .map_err(|_| NetworkError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        // Drop any half-open association from an earlier attempt
        if let Err(e) = self.wifi.disconnect() {
            debug!("disconnect before connect: {:?}", e);
        }
        self.wifi.set_configuration(&client)?;
        self.wifi.connect()?;
        self.ssid = Some(config.ssid.clone());
        Ok(())
    }

    fn connection_status(&mut self) -> ConnectionStatus {
        match (self.wifi.is_connected(), self.wifi.is_up()) {
            (_, Ok(true)) => ConnectionStatus::Connected,
            (Ok(true), _) => ConnectionStatus::Connecting,
            (Ok(false), _) if self.ssid.is_some() => ConnectionStatus::Connecting,
            (Err(e), _) => {
                warn!("Failed to query WiFi state: {:?}", e);
                ConnectionStatus::Disconnected
            }
            _ => ConnectionStatus::Disconnected,
        }
    }

    fn connection_info(&mut self) -> Option<ConnectionInfo> {
        if self.connection_status() != ConnectionStatus::Connected {
            return None;
        }

        let ip = self
            .wifi
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| format!("{}", info.ip));

        let mut ap = esp_idf_sys::wifi_ap_record_t::default();
        // SAFETY: `ap` is a valid, writable record for the duration of the call
        let rssi_dbm = esp_idf_sys::esp!(unsafe { esp_idf_sys::esp_wifi_sta_get_ap_info(&mut ap) })
            .ok()
            .map(|()| ap.rssi);

        Some(ConnectionInfo {
            ssid: self.ssid.clone().unwrap_or_default(),
            ip,
            rssi_dbm,
        })
    }

    fn start_scan(&mut self) -> Result<(), NetworkError> {
        self.results.clear();
        self.results_ready = false;
        self.wifi.start_scan(&Default::default(), false)?;
        debug!("Scan started");
        Ok(())
    }

    fn scan_status(&mut self) -> Result<ScanStatus, NetworkError> {
        if !self.results_ready {
            if !self.wifi.is_scan_done()? {
                return Ok(ScanStatus::Running);
            }
            self.results = self.wifi.get_scan_result()?.iter().map(record_of).collect();
            self.results_ready = true;
        }
        Ok(ScanStatus::Complete(self.results.len()))
    }

    fn network_at(&self, index: usize) -> Option<NetworkRecord> {
        self.results.get(index).cloned()
    }

    fn clear_scan_results(&mut self) {
        self.results.clear();
        self.results_ready = false;
    }
}
