//! WiFi credential data structures.
//!
//! Platform-independent types for the credentials the provisioning flow
//! collects and persists.
//!
//! # Example
//!
//! ```
//! use cardputer_wifi_setup::config::WifiConfig;
//!
//! let config = WifiConfig::new("HomeNet", "pass1234").unwrap();
//! assert!(!config.is_open());
//! ```

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Maximum SSID length per IEEE 802.11 standard.
pub const MAX_SSID_LEN: usize = 32;

/// Maximum passphrase length for WPA2 (64 hex digits as a raw PSK).
pub const MAX_PASSWORD_LEN: usize = 64;

/// Minimum passphrase length for WPA/WPA2/WPA3 personal networks.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Credentials for connecting to an access point.
///
/// The passphrase is wiped from memory when the value is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct WifiConfig {
    /// Network SSID (1-32 bytes).
    pub ssid: String,
    /// Network passphrase (empty for open networks).
    pub password: String,
}

impl WifiConfig {
    /// Create a new WiFi configuration.
    ///
    /// Only structural limits are checked here. Whether a short passphrase is
    /// acceptable depends on the network, see [`WifiConfig::require_passphrase`].
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Result<Self, ConfigError> {
        let config = Self {
            ssid: ssid.into(),
            password: password.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a configuration for an open network (no passphrase).
    pub fn open(ssid: impl Into<String>) -> Result<Self, ConfigError> {
        Self::new(ssid, String::new())
    }

    /// Validate SSID and passphrase lengths.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ssid.is_empty() {
            return Err(ConfigError::SsidEmpty);
        }
        if self.ssid.len() > MAX_SSID_LEN {
            return Err(ConfigError::SsidTooLong {
                len: self.ssid.len(),
                max: MAX_SSID_LEN,
            });
        }
        if self.password.len() > MAX_PASSWORD_LEN {
            return Err(ConfigError::PasswordTooLong {
                len: self.password.len(),
                max: MAX_PASSWORD_LEN,
            });
        }
        Ok(())
    }

    /// Check the passphrase against the WPA personal minimum length.
    ///
    /// Used when the selected network advertises WPA-family security.
    pub fn require_passphrase(&self) -> Result<(), ConfigError> {
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(ConfigError::PasswordTooShort {
                len: self.password.len(),
                min: MIN_PASSWORD_LEN,
            });
        }
        Ok(())
    }

    /// Check if this is an open network (no passphrase).
    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

impl fmt::Debug for WifiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiConfig")
            .field("ssid", &self.ssid)
            .field("password", &format_args!("<{} bytes>", self.password.len()))
            .finish()
    }
}

/// Errors that can occur while building or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// SSID is empty.
    SsidEmpty,
    /// SSID exceeds maximum length.
    SsidTooLong { len: usize, max: usize },
    /// Passphrase is too short for WPA personal.
    PasswordTooShort { len: usize, min: usize },
    /// Passphrase exceeds maximum length.
    PasswordTooLong { len: usize, max: usize },
    /// A provisioning setting is out of range.
    InvalidSetting(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SsidEmpty => write!(f, "SSID cannot be empty"),
            Self::SsidTooLong { len, max } => {
                write!(f, "SSID too long: {} bytes (max {})", len, max)
            }
            Self::PasswordTooShort { len, min } => {
                write!(f, "password too short: {} bytes (min {})", len, min)
            }
            Self::PasswordTooLong { len, max } => {
                write!(f, "password too long: {} bytes (max {})", len, max)
            }
            Self::InvalidSetting(msg) => write!(f, "invalid setting: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
