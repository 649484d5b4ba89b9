//! The connect-or-configure flow.
//!
//! ```text
//! Idle -> LoadingCredentials -> AttemptingConnect -> Connected
//!                                  |        ^
//!                        timeout / |        | saved
//!                      no creds    v        |
//!   TimedOut -> Scanning -> Selecting -> EnteringSecret -> Saving
//!                 |    ^
//!                 v    | enter
//!        ScanEmpty / ScanFailed
//!
//! AttemptingConnect -> ResetRequested -> (store erased, restart) -> Idle
//! ```
//!
//! A failed save still goes on to `AttemptingConnect` with the entered
//! credentials; they are just not kept across a restart.
//!
//! [`Provisioner`] owns the current credentials and drives every
//! collaborator through trait objects, so the same flow runs on the
//! Cardputer and against the simulators in [`crate::sim`].

use crate::clock::Clock;
use crate::config::{ConfigError, ProvisionSettings, WifiConfig};
use crate::network::{
    scan_networks, ConnectionInfo, ConnectionStatus, NetworkError, NetworkRecord, NetworkService,
    SecurityKind,
};
use crate::store::{self, CredentialStore, LoadedCredentials, StoreError};
use crate::ui::select::select_network;
use crate::ui::text_entry::read_secret_text;
use crate::ui::{Display, Input, Ui, CHAR_WIDTH, LINE_HEIGHT};
use log::{debug, info, warn};
use std::fmt;

/// Where the flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    LoadingCredentials,
    AttemptingConnect,
    Connected,
    TimedOut,
    Scanning,
    /// A scan found nothing usable; waiting for the user to rescan.
    ScanEmpty,
    /// The driver refused the scan; waiting for the user to rescan.
    ScanFailed,
    Selecting,
    EnteringSecret,
    Saving,
    ResetRequested,
}

/// How a connection attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    TimedOut,
    /// The driver refused to start the attempt.
    Failed,
    /// The reset button was pressed while waiting.
    ResetRequested,
}

/// Why the flow fell back to manual configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconfigureReason {
    /// Nothing stored, or the stored record failed its integrity check.
    StoreInvalid,
    ConnectTimeout,
    ConnectFailed,
}

/// How [`Provisioner::run`] finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Connected; details if the driver could report them.
    Connected(Option<ConnectionInfo>),
    /// The store was erased and a restart requested.
    Restarting,
}

/// Device-level actions.
pub trait System {
    /// Restart the device. On hardware this does not return.
    fn restart(&mut self);
}

/// Failures that stop the flow: invalid settings, or a store that cannot be
/// erased after a reset request.
#[derive(Debug)]
pub enum ProvisionError {
    Store(StoreError),
    Network(NetworkError),
    Config(ConfigError),
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "credential store: {}", e),
            Self::Network(e) => write!(f, "network: {}", e),
            Self::Config(e) => write!(f, "configuration: {}", e),
        }
    }
}

impl std::error::Error for ProvisionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Network(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

impl From<StoreError> for ProvisionError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<NetworkError> for ProvisionError {
    fn from(e: NetworkError) -> Self {
        Self::Network(e)
    }
}

impl From<ConfigError> for ProvisionError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Y coordinate of the connect progress dots.
const PROGRESS_Y: i32 = 2 * LINE_HEIGHT;

/// Y coordinate of a validation error under the passphrase prompt.
const ENTRY_ERROR_Y: i32 = 74;

/// The provisioning controller.
pub struct Provisioner<'a> {
    settings: ProvisionSettings,
    store: &'a mut dyn CredentialStore,
    network: &'a mut dyn NetworkService,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    clock: &'a dyn Clock,
    system: &'a mut dyn System,
    credentials: Option<WifiConfig>,
    state: SessionState,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        settings: ProvisionSettings,
        store: &'a mut dyn CredentialStore,
        network: &'a mut dyn NetworkService,
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        clock: &'a dyn Clock,
        system: &'a mut dyn System,
    ) -> Self {
        Self {
            settings,
            store,
            network,
            display,
            input,
            clock,
            system,
            credentials: None,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Credentials in use, once loaded or entered.
    pub fn credentials(&self) -> Option<&WifiConfig> {
        self.credentials.as_ref()
    }

    fn transition(&mut self, next: SessionState) {
        debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn ui(&mut self) -> Ui<'_> {
        Ui {
            display: &mut *self.display,
            input: &mut *self.input,
            clock: self.clock,
            poll_interval: self.settings.input_poll_interval,
        }
    }

    fn show_lines(&mut self, lines: &[&str]) {
        self.display.clear_all();
        for (i, line) in lines.iter().enumerate() {
            self.display.draw_text(line, 1, 1 + i as i32 * LINE_HEIGHT);
        }
        self.display.present();
    }

    /// Run until connected or until a reset restarts the device.
    ///
    /// Missing or corrupted credentials, connection timeouts, refused scans
    /// and failed saves all lead back to manual configuration, which repeats
    /// until a connection succeeds. Only invalid settings and a failed erase
    /// are returned as errors.
    pub fn run(&mut self) -> Result<Outcome, ProvisionError> {
        self.settings.validate()?;

        self.transition(SessionState::LoadingCredentials);
        let mut pending = match self.load_credentials() {
            Some(config) => {
                self.credentials = Some(config);
                None
            }
            None => Some(ReconfigureReason::StoreInvalid),
        };

        loop {
            if let Some(reason) = pending.take() {
                self.reconfigure(reason);
            }
            let Some(config) = self.credentials.clone() else {
                pending = Some(ReconfigureReason::StoreInvalid);
                continue;
            };

            match self.attempt_connect(&config) {
                ConnectOutcome::Connected => {
                    self.transition(SessionState::Connected);
                    let details = self.show_connection_info();
                    return Ok(Outcome::Connected(details));
                }
                ConnectOutcome::TimedOut => pending = Some(ReconfigureReason::ConnectTimeout),
                ConnectOutcome::Failed => pending = Some(ReconfigureReason::ConnectFailed),
                ConnectOutcome::ResetRequested => {
                    self.reset_store()?;
                    return Ok(Outcome::Restarting);
                }
            }
        }
    }

    /// Read the stored credentials; `None` unless they pass the integrity
    /// check. A store read failure counts as invalid.
    pub fn load_credentials(&mut self) -> Option<WifiConfig> {
        match store::load_credentials(&*self.store) {
            Ok(LoadedCredentials::Valid(config)) => {
                info!("Found stored credentials for '{}'", config.ssid);
                Some(config)
            }
            Ok(LoadedCredentials::Missing) => {
                info!("No stored credentials");
                None
            }
            Ok(LoadedCredentials::Corrupted) => {
                warn!("Stored credentials are corrupted, reconfiguring");
                None
            }
            Err(e) => {
                warn!("Failed to read credentials: {}", e);
                None
            }
        }
    }

    /// Start connecting and wait for the link, the timeout, or the reset
    /// button, drawing a progress dot every few polls.
    pub fn attempt_connect(&mut self, config: &WifiConfig) -> ConnectOutcome {
        self.transition(SessionState::AttemptingConnect);
        let connecting = format!("Connecting to {}", config.ssid);
        self.show_lines(&["Connecting to WiFi", &connecting]);

        if let Err(e) = self.network.begin_connection(config) {
            warn!("Could not start connection to '{}': {}", config.ssid, e);
            return ConnectOutcome::Failed;
        }

        let timeout = self.settings.connect_timeout;
        let dot_every = self.settings.progress_dot_every.max(1);
        let columns = (self.display.width() / CHAR_WIDTH).max(1) as u32;
        let started = self.clock.now();
        let mut polls: u32 = 0;

        loop {
            if self.network.connection_status() == ConnectionStatus::Connected {
                info!(
                    "Connected to '{}' after {:?}",
                    config.ssid,
                    self.clock.elapsed_since(started)
                );
                return ConnectOutcome::Connected;
            }
            if self.input.reset_pressed() {
                warn!("Reset button pressed during connect");
                return ConnectOutcome::ResetRequested;
            }
            if self.clock.elapsed_since(started) >= timeout {
                warn!("Connection to '{}' timed out after {:?}", config.ssid, timeout);
                return ConnectOutcome::TimedOut;
            }

            self.clock.sleep(self.settings.connect_poll_interval);
            polls += 1;
            if polls % dot_every == 0 {
                let dot = (polls / dot_every - 1) % columns;
                if dot == 0 {
                    let width = self.display.width();
                    self.display.clear_region(0, PROGRESS_Y, width, LINE_HEIGHT);
                }
                self.display.draw_text(".", 1 + dot as i32 * CHAR_WIDTH, PROGRESS_Y);
                self.display.present();
            }
        }
    }

    /// Collect new credentials from the user and save them.
    ///
    /// The credentials are used for the next attempt even if saving fails.
    fn reconfigure(&mut self, reason: ReconfigureReason) {
        info!("Manual configuration ({:?})", reason);
        if reason != ReconfigureReason::StoreInvalid {
            self.transition(SessionState::TimedOut);
        }

        let network = loop {
            self.transition(SessionState::Scanning);
            let networks = match self.scan() {
                Ok(networks) => networks,
                Err(e) => {
                    warn!("Scan failed: {}", e);
                    self.transition(SessionState::ScanFailed);
                    self.show_lines(&["Scan failed.", "ENTER: rescan"]);
                    self.ui().wait_for_enter();
                    continue;
                }
            };
            if networks.is_empty() {
                self.transition(SessionState::ScanEmpty);
                self.show_lines(&["No networks found.", "ENTER: rescan"]);
                self.ui().wait_for_enter();
                continue;
            }

            self.transition(SessionState::Selecting);
            self.show_lines(&["Select WiFi network:"]);
            if let Some(chosen) = select_network(&mut self.ui(), &networks) {
                break chosen.clone();
            }
        };

        let config = self.enter_credentials(&network);
        if let Err(e) = self.save_credentials(&config) {
            warn!("Could not save credentials for '{}': {}", config.ssid, e);
            self.show_lines(&["Save failed.", "Not kept after restart."]);
            self.clock.sleep(self.settings.reset_notice_hold);
        }
        self.credentials = Some(config);
    }

    fn scan(&mut self) -> Result<Vec<NetworkRecord>, ProvisionError> {
        self.show_lines(&["Scanning for networks..."]);
        let networks = scan_networks(
            &mut *self.network,
            self.clock,
            self.settings.scan_poll_interval,
            self.settings.max_networks,
            self.settings.min_signal_dbm,
        )?;
        for n in &networks {
            debug!("  {} {} dBm {}", n.ssid, n.signal_dbm, n.security.label());
        }
        Ok(networks)
    }

    /// Prompt until the passphrase is acceptable for `network`.
    fn enter_credentials(&mut self, network: &NetworkRecord) -> WifiConfig {
        self.transition(SessionState::EnteringSecret);
        let ssid_line = format!("SSID: {}", network.ssid);
        let mut problem: Option<String> = None;

        loop {
            self.show_lines(&[&ssid_line]);
            if let Some(msg) = problem.take() {
                self.display.draw_text(&msg, 1, ENTRY_ERROR_Y);
            }

            let mask = self.settings.mask_secret;
            let secret = read_secret_text(&mut self.ui(), "Enter password:", mask);
            let checked = WifiConfig::new(network.ssid.clone(), secret).and_then(|config| {
                if network.security == SecurityKind::Protected {
                    config.require_passphrase()?;
                }
                Ok(config)
            });

            match checked {
                Ok(config) => return config,
                Err(e) => {
                    warn!("Rejected passphrase for '{}': {}", network.ssid, e);
                    problem = Some(e.to_string());
                }
            }
        }
    }

    /// Persist `config` with its integrity tags and confirm on screen.
    pub fn save_credentials(&mut self, config: &WifiConfig) -> Result<(), ProvisionError> {
        self.transition(SessionState::Saving);
        store::save_credentials(&mut *self.store, config)?;
        self.show_lines(&["Credentials saved."]);
        Ok(())
    }

    /// Erase the store, show the notice, and restart.
    pub fn reset_store(&mut self) -> Result<(), ProvisionError> {
        self.transition(SessionState::ResetRequested);
        store::clear_credentials(&mut *self.store)?;
        self.credentials = None;
        self.show_lines(&["Memory erased."]);
        self.clock.sleep(self.settings.reset_notice_hold);
        info!("Restarting");
        self.system.restart();
        self.transition(SessionState::Idle);
        Ok(())
    }

    /// Show SSID, IP and signal for a while, then clear the screen.
    pub fn show_connection_info(&mut self) -> Option<ConnectionInfo> {
        let details = self.network.connection_info();
        match &details {
            Some(d) => {
                let ip = d.ip.as_deref().unwrap_or("-");
                let rssi = d
                    .rssi_dbm
                    .map_or_else(|| "-".to_string(), |r| format!("{} dBm", r));
                info!("WiFi connected: {} ip={} rssi={}", d.ssid, ip, rssi);
                let ssid = format!("SSID: {}", d.ssid);
                let ip = format!("IP: {}", ip);
                let rssi = format!("RSSI: {}", rssi);
                self.show_lines(&["WiFi connected", &ssid, &ip, &rssi]);
            }
            None => self.show_lines(&["WiFi connected"]),
        }
        self.clock.sleep(self.settings.info_hold);
        self.display.clear_all();
        self.display.present();
        details
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::sim::{ConnectBehavior, InputStep, RecordingSystem, ScriptedInput, SimulatedNetwork};
    use crate::store::{MemoryStore, StoredCredentials};
    use crate::ui::screen::TextScreen;
    use crate::ui::{KeysState, KEY_DOWN};
    use std::time::Duration;

    struct Rig {
        store: MemoryStore,
        network: SimulatedNetwork,
        screen: TextScreen,
        input: ScriptedInput,
        clock: ManualClock,
        system: RecordingSystem,
        settings: ProvisionSettings,
    }

    impl Rig {
        fn new(store: MemoryStore, network: SimulatedNetwork, steps: Vec<InputStep>) -> Self {
            Self {
                store,
                network,
                screen: TextScreen::cardputer(),
                input: ScriptedInput::new(steps),
                clock: ManualClock::new(),
                system: RecordingSystem::new(),
                settings: ProvisionSettings::default(),
            }
        }

        /// Returns the outcome and the state the controller stopped in.
        fn run(&mut self) -> (Result<Outcome, ProvisionError>, SessionState) {
            let mut provisioner = Provisioner::new(
                self.settings.clone(),
                &mut self.store,
                &mut self.network,
                &mut self.screen,
                &mut self.input,
                &self.clock,
                &mut self.system,
            );
            let outcome = provisioner.run();
            (outcome, provisioner.state())
        }

        fn stored(&self) -> StoredCredentials {
            self.store.read().unwrap()
        }
    }

    fn home_store() -> MemoryStore {
        let config = WifiConfig::new("HomeNet", "pass1234").unwrap();
        MemoryStore::with_record(&StoredCredentials::seal(&config))
    }

    fn neighbourhood() -> Vec<NetworkRecord> {
        vec![
            NetworkRecord::new("A", -40, SecurityKind::Protected),
            NetworkRecord::new("B", -70, SecurityKind::Open),
            NetworkRecord::new("C", -90, SecurityKind::Protected),
        ]
    }

    fn typed(s: &str) -> Vec<InputStep> {
        s.chars().map(|c| InputStep::Keys(KeysState::char(c))).collect()
    }

    fn enter() -> InputStep {
        InputStep::Keys(KeysState::enter())
    }

    /// Select the first network, type `secret`, press enter.
    fn choose_first(secret: &str) -> Vec<InputStep> {
        let mut steps = vec![enter()];
        steps.extend(typed(secret));
        steps.push(enter());
        steps
    }

    #[test]
    fn test_valid_store_connects_without_scanning() {
        let network = SimulatedNetwork::new().with_connect_behavior(ConnectBehavior::After(5));
        let mut rig = Rig::new(home_store(), network, vec![]);

        let (outcome, state) = rig.run();

        let outcome = outcome.unwrap();
        assert!(matches!(outcome, Outcome::Connected(Some(ref info)) if info.ssid == "HomeNet"));
        assert_eq!(state, SessionState::Connected);
        assert_eq!(rig.network.scans_started(), 0);
        assert_eq!(rig.network.connect_attempts(), ["HomeNet".to_string()]);
        assert_eq!(rig.store.writes(), 0);
    }

    #[test]
    fn test_empty_store_goes_straight_to_scan() {
        let network = SimulatedNetwork::new().with_scan(neighbourhood());
        let mut rig = Rig::new(MemoryStore::new(), network, choose_first("pass1234"));

        let (outcome, state) = rig.run();

        assert!(matches!(outcome.unwrap(), Outcome::Connected(_)));
        assert_eq!(state, SessionState::Connected);
        assert_eq!(rig.network.scans_started(), 1);
        // Only the attempt with the new credentials
        assert_eq!(rig.network.connect_attempts(), ["A".to_string()]);
        let stored = rig.stored();
        assert_eq!(stored.ssid, "A");
        assert_eq!(stored.password, "pass1234");
        assert!(stored.is_intact());
    }

    #[test]
    fn test_corrupted_store_reconfigures() {
        let mut store = home_store();
        if let Some(ssid) = store.ssid_mut() {
            ssid.push('x');
        }
        let network = SimulatedNetwork::new().with_scan(neighbourhood());
        let mut rig = Rig::new(store, network, choose_first("pass1234"));

        let (outcome, _) = rig.run();

        assert!(outcome.is_ok());
        assert_eq!(rig.network.scans_started(), 1);
        assert_eq!(rig.stored().ssid, "A");
    }

    #[test]
    fn test_timeout_falls_back_to_scan_and_saves() {
        let network = SimulatedNetwork::new()
            .with_scan(neighbourhood())
            .with_attempts([ConnectBehavior::Never]);
        let mut steps = vec![InputStep::Keys(KeysState::char(KEY_DOWN))];
        steps.extend(choose_first(""));
        let mut rig = Rig::new(home_store(), network, steps);

        let (outcome, state) = rig.run();

        assert!(matches!(outcome.unwrap(), Outcome::Connected(_)));
        assert_eq!(state, SessionState::Connected);
        assert_eq!(
            rig.network.connect_attempts(),
            ["HomeNet".to_string(), "B".to_string()]
        );
        // 20 s timeout, 2 s info screen, plus input polling
        assert!(rig.clock.now() >= Duration::from_secs(22));
        let stored = rig.stored();
        assert_eq!(stored.ssid, "B");
        assert!(stored.password.is_empty());
        assert!(stored.is_intact());
    }

    #[test]
    fn test_timeout_respects_setting() {
        let network = SimulatedNetwork::new().with_connect_behavior(ConnectBehavior::Never);
        let mut rig = Rig::new(home_store(), network, vec![]);
        rig.settings.connect_timeout = Duration::from_millis(500);

        let mut provisioner = Provisioner::new(
            rig.settings.clone(),
            &mut rig.store,
            &mut rig.network,
            &mut rig.screen,
            &mut rig.input,
            &rig.clock,
            &mut rig.system,
        );
        let config = WifiConfig::new("HomeNet", "pass1234").unwrap();
        assert_eq!(provisioner.attempt_connect(&config), ConnectOutcome::TimedOut);
        assert_eq!(provisioner.state(), SessionState::AttemptingConnect);
        drop(provisioner);

        assert_eq!(rig.clock.now(), Duration::from_millis(500));
        // 10 polls, one dot
        assert!(rig.screen.contains("Connecting to HomeNet"));
        assert!(rig.screen.rows().iter().any(|row| row == "."));
    }

    #[test]
    fn test_reset_during_connect_erases_and_restarts() {
        let network = SimulatedNetwork::new().with_connect_behavior(ConnectBehavior::Never);
        let mut rig = Rig::new(home_store(), network, vec![InputStep::Reset]);

        let (outcome, state) = rig.run();

        assert_eq!(outcome.unwrap(), Outcome::Restarting);
        assert_eq!(state, SessionState::Idle);
        assert!(rig.store.is_empty());
        assert_eq!(rig.store.erases(), 1);
        assert_eq!(rig.system.restarts(), 1);
        assert!(rig.screen.contains("Memory erased."));
        assert_eq!(rig.network.scans_started(), 0);
    }

    #[test]
    fn test_held_reset_wins_over_slow_connect() {
        let network = SimulatedNetwork::new().with_connect_behavior(ConnectBehavior::After(3));
        let mut rig = Rig::new(home_store(), network, vec![]);
        rig.input = ScriptedInput::new(vec![]).with_reset_held();

        let (outcome, _) = rig.run();

        assert_eq!(outcome.unwrap(), Outcome::Restarting);
        assert_eq!(rig.clock.now(), Duration::from_secs(1));
    }

    #[test]
    fn test_empty_scan_waits_for_enter_then_rescans() {
        let network = SimulatedNetwork::new()
            .with_scan(vec![])
            .with_scan(neighbourhood());
        let mut steps = vec![enter()];
        steps.extend(choose_first("pass1234"));
        let mut rig = Rig::new(MemoryStore::new(), network, steps);

        let (outcome, _) = rig.run();

        assert!(outcome.is_ok());
        assert_eq!(rig.network.scans_started(), 2);
        assert_eq!(rig.stored().ssid, "A");
    }

    #[test]
    fn test_refused_scan_waits_for_enter_then_rescans() {
        let network = SimulatedNetwork::new()
            .with_scan_failures(1)
            .with_scan(neighbourhood());
        let mut steps = vec![enter()];
        steps.extend(choose_first("pass1234"));
        let mut rig = Rig::new(MemoryStore::new(), network, steps);

        let (outcome, state) = rig.run();

        assert!(matches!(outcome.unwrap(), Outcome::Connected(_)));
        assert_eq!(state, SessionState::Connected);
        assert_eq!(rig.network.scans_started(), 2);
        assert_eq!(rig.network.connect_attempts(), ["A".to_string()]);
        assert_eq!(rig.stored().ssid, "A");
    }

    #[test]
    fn test_failed_save_still_connects() {
        let network = SimulatedNetwork::new().with_scan(neighbourhood());
        let store = MemoryStore::new().with_failing_writes(1);
        let mut rig = Rig::new(store, network, choose_first("pass1234"));

        let (outcome, state) = rig.run();

        assert!(matches!(outcome.unwrap(), Outcome::Connected(Some(ref info)) if info.ssid == "A"));
        assert_eq!(state, SessionState::Connected);
        assert_eq!(rig.network.connect_attempts(), ["A".to_string()]);
        assert_eq!(rig.store.writes(), 0);
        // Nothing persisted, so the next boot reconfigures
        assert_eq!(
            store::load_credentials(&rig.store).unwrap(),
            LoadedCredentials::Missing
        );
    }

    #[test]
    fn test_scan_drops_weak_networks() {
        let far = NetworkRecord::new("Far", -95, SecurityKind::Open);
        let network = SimulatedNetwork::new().with_scan(vec![far]);
        let mut rig = Rig::new(MemoryStore::new(), network, vec![]);
        let mut provisioner = Provisioner::new(
            rig.settings.clone(),
            &mut rig.store,
            &mut rig.network,
            &mut rig.screen,
            &mut rig.input,
            &rig.clock,
            &mut rig.system,
        );

        assert!(provisioner.scan().unwrap().is_empty());
        drop(provisioner);
        assert!(rig.screen.contains("Scanning for networks..."));
    }

    #[test]
    fn test_short_passphrase_reprompts() {
        let network = SimulatedNetwork::new().with_scan(neighbourhood());
        let mut steps = choose_first("short");
        steps.extend(typed("longenough"));
        steps.push(enter());
        let mut rig = Rig::new(MemoryStore::new(), network, steps);

        let (outcome, _) = rig.run();

        assert!(outcome.is_ok());
        assert_eq!(rig.stored().password, "longenough");
        assert_eq!(rig.store.writes(), 1);
    }

    #[test]
    fn test_masked_entry_never_shows_secret() {
        let mut steps = typed("pass1234");
        steps.push(enter());
        let mut rig = Rig::new(MemoryStore::new(), SimulatedNetwork::new(), steps);
        rig.settings.mask_secret = true;
        let mut provisioner = Provisioner::new(
            rig.settings.clone(),
            &mut rig.store,
            &mut rig.network,
            &mut rig.screen,
            &mut rig.input,
            &rig.clock,
            &mut rig.system,
        );

        let network = NetworkRecord::new("A", -40, SecurityKind::Protected);
        let config = provisioner.enter_credentials(&network);
        assert_eq!(provisioner.state(), SessionState::EnteringSecret);
        drop(provisioner);

        assert_eq!(config.password, "pass1234");
        assert!(rig.screen.contains("SSID: A"));
        assert!(rig.screen.contains("> ********"));
        assert!(!rig.screen.contains("pass1234"));
    }

    #[test]
    fn test_wrong_passphrase_loops_until_correct() {
        let network = SimulatedNetwork::new()
            .with_scan(neighbourhood())
            .with_passphrase("A", "correct-horse");
        let mut steps = choose_first("wrong-pass");
        steps.extend(choose_first("correct-horse"));
        let mut rig = Rig::new(MemoryStore::new(), network, steps);
        rig.settings.connect_timeout = Duration::from_secs(1);

        let (outcome, _) = rig.run();

        assert!(matches!(outcome.unwrap(), Outcome::Connected(_)));
        assert_eq!(rig.network.scans_started(), 2);
        assert_eq!(rig.store.writes(), 2);
        assert_eq!(rig.stored().password, "correct-horse");
    }

    #[test]
    fn test_rejected_connection_reconfigures() {
        let network = SimulatedNetwork::new()
            .with_scan(neighbourhood())
            .with_attempts([ConnectBehavior::Reject]);
        let mut rig = Rig::new(home_store(), network, choose_first("pass1234"));

        let (outcome, _) = rig.run();

        assert!(outcome.is_ok());
        assert_eq!(rig.network.connect_attempts().len(), 2);
    }

    #[test]
    fn test_info_screen_is_cleared_after_hold() {
        let network = SimulatedNetwork::new();
        let mut rig = Rig::new(home_store(), network, vec![]);

        let (outcome, _) = rig.run();

        assert!(outcome.is_ok());
        assert!(rig.screen.is_blank());
        assert_eq!(rig.clock.now(), Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let mut rig = Rig::new(MemoryStore::new(), SimulatedNetwork::new(), vec![]);
        rig.settings.max_networks = 0;

        let (outcome, state) = rig.run();

        assert!(matches!(outcome, Err(ProvisionError::Config(_))));
        assert_eq!(state, SessionState::Idle);
    }

    #[test]
    fn test_partial_save_is_caught_on_next_boot() {
        let network = SimulatedNetwork::new().with_scan(neighbourhood());
        let mut rig = Rig::new(MemoryStore::new().persist_only(2), network, choose_first("pass1234"));

        let (outcome, _) = rig.run();
        assert!(outcome.is_ok());

        // Next boot: only SSID and passphrase landed, so the tags are missing
        let loaded = store::load_credentials(&rig.store).unwrap();
        assert_eq!(loaded, LoadedCredentials::Corrupted);
    }
}
