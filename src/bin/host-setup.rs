//! Run the provisioning flow on the host.
//!
//! The screen is printed as text frames and keys are typed as lines (see
//! `cardputer_wifi_setup::ui::console`). WiFi is simulated with a few demo
//! access points; credentials persist in a JSON file, so a second run
//! reconnects without asking.
//!
//! Usage:
//!   cargo run --bin host-setup [-- --mask]
//!
//! `HOST_SETUP_STORE` overrides the credential file path. Type `!reset`
//! while "Connecting" is shown to erase it.

#[cfg(not(target_os = "espidf"))]
fn demo_network() -> cardputer_wifi_setup::sim::SimulatedNetwork {
    use cardputer_wifi_setup::sim::{ConnectBehavior, SimulatedNetwork};
    use cardputer_wifi_setup::{NetworkRecord, SecurityKind};

    SimulatedNetwork::new()
        .with_scan(vec![
            NetworkRecord::new("Neighbor", -75, SecurityKind::Protected),
            NetworkRecord::new("HomeNet", -42, SecurityKind::Protected),
            NetworkRecord::new("", -50, SecurityKind::Protected),
            NetworkRecord::new("CafeGuest", -67, SecurityKind::Open),
            NetworkRecord::new("OldRouter", -71, SecurityKind::Legacy),
            NetworkRecord::new("FarAway", -88, SecurityKind::Protected),
        ])
        .with_scan_polls(15)
        .with_passphrase("HomeNet", "pass1234")
        .with_passphrase("Neighbor", "hunter22")
        .with_connect_behavior(ConnectBehavior::After(30))
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    use cardputer_wifi_setup::sim::RecordingSystem;
    use cardputer_wifi_setup::store::file::FileStore;
    use cardputer_wifi_setup::ui::console::{ConsoleDisplay, ConsoleInput};
    use cardputer_wifi_setup::{Outcome, ProvisionSettings, Provisioner, SystemClock};
    use log::{error, info};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("=== Cardputer WiFi setup (host) ===");

    let mask = std::env::args().skip(1).any(|arg| arg == "--mask");
    let settings = ProvisionSettings::with_masking(mask);

    let mut store = match std::env::var_os("HOST_SETUP_STORE") {
        Some(path) => FileStore::new(path),
        None => match FileStore::at_default_path() {
            Ok(store) => store,
            Err(e) => {
                error!("No credential file path: {}", e);
                std::process::exit(1);
            }
        },
    };
    info!("Credential file: {}", store.path().display());

    let mut display = ConsoleDisplay::new();
    let mut input = ConsoleInput::stdin().exit_on_close();
    let clock = SystemClock::new();
    let mut system = RecordingSystem::new();

    loop {
        let mut network = demo_network();
        let outcome = Provisioner::new(
            settings.clone(),
            &mut store,
            &mut network,
            &mut display,
            &mut input,
            &clock,
            &mut system,
        )
        .run();

        match outcome {
            Ok(Outcome::Connected(info)) => {
                if let Some(info) = info {
                    info!(
                        "Connected to '{}' ({})",
                        info.ssid,
                        info.ip.as_deref().unwrap_or("no IP")
                    );
                }
                break;
            }
            Ok(Outcome::Restarting) => {
                info!("Simulated restart #{}", system.restarts());
            }
            Err(e) => {
                error!("Provisioning failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}

#[cfg(target_os = "espidf")]
fn main() {
    println!("host-setup runs on the development machine only.");
}
