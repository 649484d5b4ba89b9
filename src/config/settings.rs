//! Tunables for the provisioning flow.

use super::wifi::ConfigError;
use std::time::Duration;

/// Default credential store namespace.
pub const DEFAULT_NAMESPACE: &str = "M5_settings";

/// Settings for the provisioning flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionSettings {
    /// How long to wait for a connection before reconfiguring.
    pub connect_timeout: Duration,
    /// Poll interval while waiting for a connection.
    pub connect_poll_interval: Duration,
    /// Poll interval while a scan is running.
    pub scan_poll_interval: Duration,
    /// Poll interval for keyboard events.
    pub input_poll_interval: Duration,
    /// Networks weaker than this (dBm) are not offered.
    pub min_signal_dbm: i8,
    /// Maximum number of networks offered for selection.
    pub max_networks: usize,
    /// Echo `*` instead of the typed passphrase.
    pub mask_secret: bool,
    /// Draw one progress dot every this many connect polls.
    pub progress_dot_every: u32,
    /// How long the connection summary stays on screen.
    pub info_hold: Duration,
    /// How long the erase notice stays on screen before restart.
    pub reset_notice_hold: Duration,
    /// Credential store namespace.
    pub namespace: String,
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(20),
            connect_poll_interval: Duration::from_millis(50),
            scan_poll_interval: Duration::from_millis(100),
            input_poll_interval: Duration::from_millis(10),
            min_signal_dbm: -80,
            max_networks: 10,
            mask_secret: false,
            progress_dot_every: 10,
            info_hold: Duration::from_secs(2),
            reset_notice_hold: Duration::from_secs(1),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl ProvisionSettings {
    /// Default settings with passphrase masking switched on or off.
    pub fn with_masking(mask_secret: bool) -> Self {
        Self {
            mask_secret,
            ..Default::default()
        }
    }

    /// Validate settings values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::InvalidSetting("connect_timeout must be > 0"));
        }
        if self.connect_poll_interval.is_zero()
            || self.scan_poll_interval.is_zero()
            || self.input_poll_interval.is_zero()
        {
            return Err(ConfigError::InvalidSetting("poll intervals must be > 0"));
        }
        if self.max_networks == 0 {
            return Err(ConfigError::InvalidSetting("max_networks must be > 0"));
        }
        if !(-120..=0).contains(&self.min_signal_dbm) {
            return Err(ConfigError::InvalidSetting(
                "min_signal_dbm must be within -120..=0",
            ));
        }
        if self.progress_dot_every == 0 {
            return Err(ConfigError::InvalidSetting("progress_dot_every must be > 0"));
        }
        if self.namespace.is_empty() || self.namespace.len() > 15 {
            // NVS namespace names are limited to 15 characters
            return Err(ConfigError::InvalidSetting(
                "namespace must be 1-15 characters",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = ProvisionSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.connect_timeout, Duration::from_secs(20));
        assert_eq!(settings.min_signal_dbm, -80);
        assert_eq!(settings.max_networks, 10);
        assert_eq!(settings.namespace, "M5_settings");
        assert!(!settings.mask_secret);
    }

    #[test]
    fn test_with_masking() {
        assert!(ProvisionSettings::with_masking(true).mask_secret);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let settings = ProvisionSettings {
            connect_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidSetting(_))
        ));
    }

    #[test]
    fn test_zero_networks_rejected() {
        let settings = ProvisionSettings {
            max_networks: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_positive_signal_floor_rejected() {
        let settings = ProvisionSettings {
            min_signal_dbm: 5,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_long_namespace_rejected() {
        let settings = ProvisionSettings {
            namespace: "a_very_long_namespace".to_string(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
