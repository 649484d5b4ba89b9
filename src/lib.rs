//! WiFi provisioning for the M5Cardputer.
//!
//! On boot the stored credentials are checked against their integrity tags
//! and used to connect. If there are none, they are damaged, or the network
//! does not come up in time, the user picks a network from a scan, types the
//! passphrase, and the new credentials are saved and tried. Holding the reset
//! button while connecting erases the store and restarts.
//!
//! Everything except [`board`], [`store::nvs`] and [`network::esp`] is
//! platform-independent and tested on the host.

// Allow the crate to reference itself by name (needed for proc-macro generated code)
extern crate self as cardputer_wifi_setup;

#[cfg(feature = "esp32")]
pub mod board;
pub mod clock;
pub mod config;
pub mod controller;
pub mod integrity;
pub mod network;
pub mod sim;
pub mod store;
#[cfg(feature = "tap-tests")]
pub mod testing;
pub mod ui;

pub use clock::{Clock, SystemClock};
pub use config::{ConfigError, ProvisionSettings, WifiConfig};
pub use controller::{Outcome, ProvisionError, Provisioner, SessionState, System};
pub use integrity::integrity_tag;
pub use network::{NetworkRecord, NetworkService, SecurityKind};
pub use store::{CredentialStore, LoadedCredentials};

#[cfg(feature = "tap-tests")]
pub use testing::TestRunner;
