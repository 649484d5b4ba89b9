//! Credential and provisioning configuration.
//!
//! # Components
//!
//! - [`wifi`] - WiFi credential type and validation (host-testable)
//! - [`settings`] - Timeouts, scan limits and display options for the
//!   provisioning flow

mod settings;
mod wifi;

pub use settings::{ProvisionSettings, DEFAULT_NAMESPACE};
pub use wifi::{ConfigError, WifiConfig, MAX_PASSWORD_LEN, MAX_SSID_LEN, MIN_PASSWORD_LEN};
