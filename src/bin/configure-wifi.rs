//! Preload WiFi credentials into NVS.
//!
//! Writes the SSID, passphrase and both integrity tags into the namespace the
//! provisioning firmware reads, so the next boot connects without manual
//! setup.
//!
//! Usage:
//!   WIFI_SSID="MyNetwork" WIFI_PASSWORD="secret" cargo configure-wifi
//!
//! For open networks (no password):
//!   WIFI_SSID="OpenNetwork" WIFI_PASSWORD="" cargo configure-wifi
//!
//! To erase stored credentials instead:
//!   WIFI_ERASE=1 cargo configure-wifi

/// WiFi SSID - set via WIFI_SSID environment variable at compile time.
#[cfg(feature = "esp32")]
const WIFI_SSID: Option<&str> = option_env!("WIFI_SSID");

/// WiFi password - set via WIFI_PASSWORD environment variable at compile time.
/// Empty string for open networks.
#[cfg(feature = "esp32")]
const WIFI_PASSWORD: Option<&str> = option_env!("WIFI_PASSWORD");

/// Erase instead of writing when set at compile time.
#[cfg(feature = "esp32")]
const WIFI_ERASE: Option<&str> = option_env!("WIFI_ERASE");

/// Print error message and stop. Pauses first so the serial monitor shows it.
#[cfg(feature = "esp32")]
fn halt_with_error(msg: &str) -> ! {
    eprintln!("\n{}", msg);
    eprintln!("\n=== Configuration failed ===\n");
    std::thread::sleep(std::time::Duration::from_secs(2));
    std::process::exit(1);
}

#[cfg(feature = "esp32")]
fn main() {
    use cardputer_wifi_setup::config::{WifiConfig, DEFAULT_NAMESPACE};
    use cardputer_wifi_setup::store::nvs::NvsStore;
    use cardputer_wifi_setup::store::{
        clear_credentials, load_credentials, save_credentials, LoadedCredentials,
    };

    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    println!("\n=== WiFi Configuration Utility ===\n");

    let mut store = match NvsStore::take(DEFAULT_NAMESPACE) {
        Ok(store) => store,
        Err(e) => halt_with_error(&format!("Error initializing NVS: {:?}", e)),
    };

    if WIFI_ERASE.is_some_and(|v| !v.is_empty()) {
        if let Err(e) = clear_credentials(&mut store) {
            halt_with_error(&format!("Error erasing NVS: {}", e));
        }
        println!("Stored credentials erased.");
        std::thread::sleep(std::time::Duration::from_secs(2));
        return;
    }

    let ssid = match WIFI_SSID {
        Some(s) if !s.is_empty() => s,
        _ => halt_with_error(
            "Error: WIFI_SSID environment variable not set at compile time.\n\n\
             Usage:\n  \
             WIFI_SSID=\"MyNetwork\" WIFI_PASSWORD=\"secret\" cargo configure-wifi\n\n\
             For open networks:\n  \
             WIFI_SSID=\"OpenNetwork\" WIFI_PASSWORD=\"\" cargo configure-wifi",
        ),
    };
    let password = WIFI_PASSWORD.unwrap_or("");

    println!("SSID: {}", ssid);
    println!(
        "Password: {} ({} chars)",
        if password.is_empty() { "(none)" } else { "****" },
        password.len()
    );

    let config = match WifiConfig::new(ssid, password) {
        Ok(config) if config.is_open() => config,
        Ok(config) => match config.require_passphrase() {
            Ok(()) => config,
            Err(e) => halt_with_error(&format!("Error: {}", e)),
        },
        Err(e) => halt_with_error(&format!("Error: {}", e)),
    };

    if let Err(e) = save_credentials(&mut store, &config) {
        halt_with_error(&format!("Error saving to NVS: {}", e));
    }

    match load_credentials(&store) {
        Ok(LoadedCredentials::Valid(stored)) if stored == config => {
            println!("\n=== WiFi configuration saved to NVS ===");
            println!("Integrity tags verified; the next boot will auto-connect.");
        }
        Ok(other) => halt_with_error(&format!("Error: read-back mismatch ({:?})", other)),
        Err(e) => halt_with_error(&format!("Error reading back from NVS: {}", e)),
    }

    println!("\n=== Done - you can disconnect the device ===\n");
    std::thread::sleep(std::time::Duration::from_secs(2));
}

#[cfg(not(feature = "esp32"))]
fn main() {
    eprintln!("This binary must be built for ESP32.");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  WIFI_SSID=\"MyNetwork\" WIFI_PASSWORD=\"secret\" cargo configure-wifi");
    std::process::exit(1);
}
