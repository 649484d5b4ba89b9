//! TAP test runner binary.
//!
//! Runs every test registered with `#[tap_test]` and prints TAP 14.
//!
//! # Usage
//!
//! ```bash
//! # Host (optional name filter as first argument)
//! cargo run --bin device-tests --features tap-tests -- integrity
//!
//! # Cardputer (filter fixed at compile time)
//! TAP_FILTER=store cargo espflash flash --bin device-tests \
//!     --features esp32,tap-tests --release --monitor
//! ```

#[cfg(feature = "esp32")]
use esp_idf_svc::sys as _;

fn main() {
    #[cfg(feature = "esp32")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();
    }

    #[cfg(feature = "esp32")]
    let filter: Option<String> = option_env!("TAP_FILTER").map(str::to_string);
    #[cfg(not(feature = "esp32"))]
    let filter: Option<String> = std::env::args().nth(1);

    let success = cardputer_wifi_setup::testing::run_matching(filter.as_deref());

    #[cfg(feature = "esp32")]
    {
        log::info!("Tests complete ({}). Halting.", if success { "pass" } else { "fail" });
        loop {
            std::thread::sleep(std::time::Duration::from_secs(1));
        }
    }

    #[cfg(not(feature = "esp32"))]
    std::process::exit(if success { 0 } else { 1 });
}
