//! Simulated collaborators.
//!
//! Used by the unit tests and by the `host-setup` binary to run the whole
//! provisioning flow without a radio, keyboard or flash.

use crate::config::WifiConfig;
use crate::controller::System;
use crate::network::{
    ConnectionInfo, ConnectionStatus, NetworkError, NetworkRecord, NetworkService, ScanStatus,
};
use crate::ui::{Input, KeysState};
use log::debug;
use std::collections::{HashMap, VecDeque};

pub use crate::ui::InputStep;

/// How one connection attempt behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectBehavior {
    /// Reports connected after this many status polls.
    After(usize),
    /// Never connects.
    Never,
    /// `begin_connection` fails.
    Reject,
}

/// Scripted WiFi station.
///
/// Scans return the configured result sets in order; the last one repeats.
/// Connection attempts follow the queued [`ConnectBehavior`]s, then the
/// default behaviour. Access points registered with a passphrase only accept
/// that passphrase.
pub struct SimulatedNetwork {
    scans: VecDeque<Vec<NetworkRecord>>,
    scan_polls: usize,
    scan_polls_left: usize,
    scan_running: bool,
    results: Vec<NetworkRecord>,
    scans_started: usize,
    scan_failures: usize,
    passphrases: HashMap<String, String>,
    attempts: VecDeque<ConnectBehavior>,
    default_behavior: ConnectBehavior,
    connect_polls_left: Option<usize>,
    connected: Option<String>,
    connect_attempts: Vec<String>,
}

impl SimulatedNetwork {
    /// Station with no networks in range that connects on the first poll.
    pub fn new() -> Self {
        Self {
            scans: VecDeque::new(),
            scan_polls: 0,
            scan_polls_left: 0,
            scan_running: false,
            results: Vec::new(),
            scans_started: 0,
            scan_failures: 0,
            passphrases: HashMap::new(),
            attempts: VecDeque::new(),
            default_behavior: ConnectBehavior::After(0),
            connect_polls_left: None,
            connected: None,
            connect_attempts: Vec::new(),
        }
    }

    /// Queue the raw results of one scan.
    pub fn with_scan(mut self, records: Vec<NetworkRecord>) -> Self {
        self.scans.push_back(records);
        self
    }

    /// Scans report running for `polls` status checks before completing.
    pub fn with_scan_polls(mut self, polls: usize) -> Self {
        self.scan_polls = polls;
        self
    }

    /// The next `count` calls to `start_scan` fail.
    pub fn with_scan_failures(mut self, count: usize) -> Self {
        self.scan_failures = count;
        self
    }

    /// Require `passphrase` when connecting to `ssid`.
    pub fn with_passphrase(mut self, ssid: impl Into<String>, passphrase: impl Into<String>) -> Self {
        self.passphrases.insert(ssid.into(), passphrase.into());
        self
    }

    /// Behaviour for attempts not covered by [`SimulatedNetwork::with_attempts`].
    pub fn with_connect_behavior(mut self, behavior: ConnectBehavior) -> Self {
        self.default_behavior = behavior;
        self
    }

    /// Behaviour of the next attempts, in order.
    pub fn with_attempts<I>(mut self, attempts: I) -> Self
    where
        I: IntoIterator<Item = ConnectBehavior>,
    {
        self.attempts.extend(attempts);
        self
    }

    /// Number of scans started.
    pub fn scans_started(&self) -> usize {
        self.scans_started
    }

    /// SSIDs of every connection attempt, in order.
    pub fn connect_attempts(&self) -> &[String] {
        &self.connect_attempts
    }

    fn accepts(&self, config: &WifiConfig) -> bool {
        self.passphrases
            .get(&config.ssid)
            .map_or(true, |want| *want == config.password)
    }
}

impl Default for SimulatedNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkService for SimulatedNetwork {
    fn begin_connection(&mut self, config: &WifiConfig) -> Result<(), NetworkError> {
        self.connect_attempts.push(config.ssid.clone());
        self.connected = None;
        self.connect_polls_left = None;

        let behavior = self.attempts.pop_front().unwrap_or(self.default_behavior);
        debug!("Simulated connect to '{}': {:?}", config.ssid, behavior);
        self.connect_polls_left = match behavior {
            ConnectBehavior::Reject => {
                return Err(NetworkError::Driver("association rejected".into()));
            }
            ConnectBehavior::After(polls) if self.accepts(config) => Some(polls),
            ConnectBehavior::After(_) | ConnectBehavior::Never => None,
        };
        if self.connect_polls_left.is_some() {
            self.connected = Some(config.ssid.clone());
        }
        Ok(())
    }

    fn connection_status(&mut self) -> ConnectionStatus {
        match (&self.connected, self.connect_polls_left) {
            (Some(_), Some(0)) => ConnectionStatus::Connected,
            (Some(_), Some(n)) => {
                self.connect_polls_left = Some(n - 1);
                ConnectionStatus::Connecting
            }
            _ if !self.connect_attempts.is_empty() => ConnectionStatus::Connecting,
            _ => ConnectionStatus::Disconnected,
        }
    }

    fn connection_info(&mut self) -> Option<ConnectionInfo> {
        if self.connection_status() != ConnectionStatus::Connected {
            return None;
        }
        let ssid = self.connected.clone()?;
        let rssi_dbm = self
            .scans
            .iter()
            .flatten()
            .find(|n| n.ssid == ssid)
            .map(|n| n.signal_dbm);
        Some(ConnectionInfo {
            ssid,
            ip: Some("192.168.4.2".to_string()),
            rssi_dbm,
        })
    }

    fn start_scan(&mut self) -> Result<(), NetworkError> {
        self.scans_started += 1;
        if self.scan_failures > 0 {
            self.scan_failures -= 1;
            self.scan_running = false;
            return Err(NetworkError::Driver("ESP_ERR_WIFI_STATE".into()));
        }
        self.results = if self.scans.len() > 1 {
            self.scans.pop_front().unwrap_or_default()
        } else {
            self.scans.front().cloned().unwrap_or_default()
        };
        self.scan_polls_left = self.scan_polls;
        self.scan_running = true;
        Ok(())
    }

    fn scan_status(&mut self) -> Result<ScanStatus, NetworkError> {
        if !self.scan_running {
            return Ok(ScanStatus::Complete(0));
        }
        if self.scan_polls_left > 0 {
            self.scan_polls_left -= 1;
            return Ok(ScanStatus::Running);
        }
        Ok(ScanStatus::Complete(self.results.len()))
    }

    fn network_at(&self, index: usize) -> Option<NetworkRecord> {
        self.results.get(index).cloned()
    }

    fn clear_scan_results(&mut self) {
        self.results.clear();
        self.scan_running = false;
    }
}

/// Idle updates tolerated after the script runs out.
const MAX_IDLE_AFTER_END: usize = 1_000_000;

/// [`Input`] that replays a fixed list of steps, one per update.
///
/// A [`InputStep::Reset`] at the front of the script is consumed by the next
/// [`Input::reset_pressed`] call.
pub struct ScriptedInput {
    steps: VecDeque<InputStep>,
    changed: bool,
    keys: KeysState,
    reset_held: bool,
    idle_after_end: usize,
}

impl ScriptedInput {
    pub fn new<I>(steps: I) -> Self
    where
        I: IntoIterator<Item = InputStep>,
    {
        Self {
            steps: steps.into_iter().collect(),
            changed: false,
            keys: KeysState::default(),
            reset_held: false,
            idle_after_end: 0,
        }
    }

    /// The reset button reads as held on every sample.
    pub fn with_reset_held(mut self) -> Self {
        self.reset_held = true;
        self
    }

    /// Steps not yet replayed.
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl Input for ScriptedInput {
    /// # Panics
    ///
    /// Panics once the script has been exhausted for a very long time, which
    /// means the flow is waiting for input the test never provides.
    fn update(&mut self) {
        match self.steps.pop_front() {
            Some(InputStep::Keys(keys)) => {
                self.changed = true;
                self.keys = keys;
            }
            step => {
                if step.is_none() {
                    self.idle_after_end += 1;
                    assert!(
                        self.idle_after_end < MAX_IDLE_AFTER_END,
                        "ScriptedInput exhausted while the flow is still waiting for keys"
                    );
                }
                self.changed = self.keys != KeysState::default();
                self.keys = KeysState::default();
            }
        }
    }

    fn has_change_event(&self) -> bool {
        self.changed
    }

    fn is_key_down(&self) -> bool {
        self.keys != KeysState::default()
    }

    fn current_keys(&self) -> KeysState {
        self.keys.clone()
    }

    fn reset_pressed(&mut self) -> bool {
        if self.reset_held {
            return true;
        }
        if self.steps.front() == Some(&InputStep::Reset) {
            self.steps.pop_front();
            return true;
        }
        false
    }
}

/// [`System`] that counts restarts instead of performing them.
#[derive(Debug, Default)]
pub struct RecordingSystem {
    restarts: usize,
}

impl RecordingSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restarts(&self) -> usize {
        self.restarts
    }
}

impl System for RecordingSystem {
    fn restart(&mut self) {
        self.restarts += 1;
        debug!("Simulated restart #{}", self.restarts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::SecurityKind;

    fn home() -> WifiConfig {
        WifiConfig::new("HomeNet", "pass1234").unwrap()
    }

    #[test]
    fn test_connects_after_polls() {
        let mut network = SimulatedNetwork::new().with_connect_behavior(ConnectBehavior::After(2));
        network.begin_connection(&home()).unwrap();
        assert_eq!(network.connection_status(), ConnectionStatus::Connecting);
        assert_eq!(network.connection_status(), ConnectionStatus::Connecting);
        assert_eq!(network.connection_status(), ConnectionStatus::Connected);
        assert_eq!(network.connection_info().unwrap().ssid, "HomeNet");
    }

    #[test]
    fn test_wrong_passphrase_never_connects() {
        let mut network = SimulatedNetwork::new().with_passphrase("HomeNet", "other-pass");
        network.begin_connection(&home()).unwrap();
        for _ in 0..10 {
            assert_eq!(network.connection_status(), ConnectionStatus::Connecting);
        }
        assert!(network.connection_info().is_none());
    }

    #[test]
    fn test_attempt_script_then_default() {
        let mut network = SimulatedNetwork::new()
            .with_attempts([ConnectBehavior::Reject, ConnectBehavior::Never]);
        assert!(network.begin_connection(&home()).is_err());
        network.begin_connection(&home()).unwrap();
        assert_eq!(network.connection_status(), ConnectionStatus::Connecting);
        network.begin_connection(&home()).unwrap();
        assert_eq!(network.connection_status(), ConnectionStatus::Connected);
        assert_eq!(network.connect_attempts().len(), 3);
    }

    #[test]
    fn test_last_scan_repeats() {
        let mut network = SimulatedNetwork::new()
            .with_scan(vec![])
            .with_scan(vec![NetworkRecord::new("A", -40, SecurityKind::Open)]);
        network.start_scan().unwrap();
        assert_eq!(network.scan_status().unwrap(), ScanStatus::Complete(0));
        network.start_scan().unwrap();
        assert_eq!(network.scan_status().unwrap(), ScanStatus::Complete(1));
        network.start_scan().unwrap();
        assert_eq!(network.scan_status().unwrap(), ScanStatus::Complete(1));
        assert_eq!(network.scans_started(), 3);
    }

    #[test]
    fn test_scan_failure_does_not_consume_results() {
        let mut network = SimulatedNetwork::new()
            .with_scan_failures(1)
            .with_scan(vec![NetworkRecord::new("A", -40, SecurityKind::Open)]);
        assert!(matches!(network.start_scan(), Err(NetworkError::Driver(_))));
        network.start_scan().unwrap();
        assert_eq!(network.scan_status().unwrap(), ScanStatus::Complete(1));
        assert_eq!(network.scans_started(), 2);
    }

    #[test]
    fn test_scripted_reset_is_not_consumed_by_update() {
        let mut input = ScriptedInput::new([
            InputStep::Keys(KeysState::char('a')),
            InputStep::Reset,
        ]);
        assert!(!input.reset_pressed());
        input.update();
        assert!(input.is_key_down());
        assert!(input.reset_pressed());
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn test_release_is_a_change_without_key_down() {
        let mut input = ScriptedInput::new([InputStep::Keys(KeysState::enter()), InputStep::Idle]);
        input.update();
        input.update();
        assert!(input.has_change_event());
        assert!(!input.is_key_down());
        input.update();
        assert!(!input.has_change_event());
    }

    #[test]
    fn test_recording_system_counts() {
        let mut system = RecordingSystem::new();
        system.restart();
        system.restart();
        assert_eq!(system.restarts(), 2);
    }
}
