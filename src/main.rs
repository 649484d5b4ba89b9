//! Cardputer WiFi provisioning firmware.

#[cfg(feature = "esp32")]
fn main() {
    // Link ESP-IDF patches (must be first!)
    esp_idf_sys::link_patches();

    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("=== Cardputer WiFi setup starting ===");

    if let Err(e) = run() {
        log::error!("Provisioning stopped: {}", e);
    }
    loop {
        std::thread::sleep(std::time::Duration::from_secs(10));
    }
}

#[cfg(feature = "esp32")]
fn run() -> Result<(), Box<dyn std::error::Error>> {
    use cardputer_wifi_setup::board::{CardputerInput, EspSystem};
    use cardputer_wifi_setup::network::esp::EspNetwork;
    use cardputer_wifi_setup::store::nvs::NvsStore;
    use cardputer_wifi_setup::ui::console::ConsoleDisplay;
    use cardputer_wifi_setup::{Outcome, ProvisionSettings, Provisioner, SystemClock};
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;

    let settings = ProvisionSettings::default();
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut store = NvsStore::new(nvs.clone(), settings.namespace.clone());
    let mut network = EspNetwork::new(peripherals.modem, sysloop, Some(nvs))?;
    let mut display = ConsoleDisplay::new();
    let mut input = CardputerInput::new(peripherals.pins.gpio0)?;
    let clock = SystemClock::new();
    let mut system = EspSystem;

    let outcome = Provisioner::new(
        settings,
        &mut store,
        &mut network,
        &mut display,
        &mut input,
        &clock,
        &mut system,
    )
    .run()?;

    if let Outcome::Connected(Some(info)) = outcome {
        log::info!(
            "Online as {} on '{}'",
            info.ip.as_deref().unwrap_or("?"),
            info.ssid
        );
    }

    // Keep the station up
    loop {
        std::thread::sleep(std::time::Duration::from_secs(10));
    }
}

#[cfg(not(feature = "esp32"))]
fn main() {
    println!("This binary requires the 'esp32' feature.");
    println!("Use 'cargo run --bin host-setup' to try the flow on the host.");
}
