//! Access point scanning.

use super::{NetworkError, NetworkRecord, NetworkService, ScanStatus};
use crate::clock::Clock;
use log::{debug, info};
use std::time::Duration;

/// Reduce raw scan results to the list offered to the user.
///
/// Drops hidden networks and anything weaker than `min_signal_dbm`, keeps the
/// first `max_results` in scan order, then sorts strongest first. The sort is
/// stable, so equal signals stay in scan order.
pub fn filter_and_rank<I>(raw: I, max_results: usize, min_signal_dbm: i8) -> Vec<NetworkRecord>
where
    I: IntoIterator<Item = NetworkRecord>,
{
    let mut networks: Vec<NetworkRecord> = raw
        .into_iter()
        .filter(|n| !n.ssid.is_empty() && n.signal_dbm >= min_signal_dbm)
        .take(max_results)
        .collect();
    networks.sort_by(|a, b| b.signal_dbm.cmp(&a.signal_dbm));
    networks
}

/// Run a scan and return the usable networks, strongest first.
///
/// Clears old results, starts an asynchronous scan and polls every
/// `poll_interval` until it completes. The wait cannot be cancelled.
/// An empty result is returned as-is; the caller decides what to do.
pub fn scan_networks(
    network: &mut dyn NetworkService,
    clock: &dyn Clock,
    poll_interval: Duration,
    max_results: usize,
    min_signal_dbm: i8,
) -> Result<Vec<NetworkRecord>, NetworkError> {
    network.clear_scan_results();
    network.start_scan()?;

    let started = clock.now();
    let found = loop {
        match network.scan_status()? {
            ScanStatus::Running => clock.sleep(poll_interval),
            ScanStatus::Complete(count) => break count,
        }
    };
    debug!(
        "Scan finished in {:?} with {} raw results",
        clock.elapsed_since(started),
        found
    );

    let networks = filter_and_rank(
        (0..found).filter_map(|i| network.network_at(i)),
        max_results,
        min_signal_dbm,
    );
    info!(
        "Scan: {} of {} networks usable (>= {} dBm, max {})",
        networks.len(),
        found,
        min_signal_dbm,
        max_results
    );
    Ok(networks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::network::SecurityKind;
    use crate::sim::SimulatedNetwork;
    use proptest::prelude::*;

    fn rec(ssid: &str, dbm: i8) -> NetworkRecord {
        NetworkRecord::new(ssid, dbm, SecurityKind::Protected)
    }

    fn ssids(networks: &[NetworkRecord]) -> Vec<&str> {
        networks.iter().map(|n| n.ssid.as_str()).collect()
    }

    #[test]
    fn test_filters_weak_networks() {
        let raw = vec![rec("A", -40), rec("B", -70), rec("C", -90)];
        let networks = filter_and_rank(raw, 10, -80);
        assert_eq!(networks, vec![rec("A", -40), rec("B", -70)]);
    }

    #[test]
    fn test_sorts_strongest_first() {
        let raw = vec![rec("weak", -75), rec("strong", -30), rec("mid", -55)];
        assert_eq!(
            ssids(&filter_and_rank(raw, 10, -80)),
            vec!["strong", "mid", "weak"]
        );
    }

    #[test]
    fn test_ties_keep_scan_order() {
        let raw = vec![rec("first", -60), rec("top", -20), rec("second", -60)];
        assert_eq!(
            ssids(&filter_and_rank(raw, 10, -80)),
            vec!["top", "first", "second"]
        );
    }

    #[test]
    fn test_cap_applies_before_sort() {
        let raw = vec![rec("A", -70), rec("B", -60), rec("C", -10)];
        assert_eq!(ssids(&filter_and_rank(raw, 2, -80)), vec!["B", "A"]);
    }

    #[test]
    fn test_signal_at_floor_is_kept() {
        let networks = filter_and_rank(vec![rec("edge", -80)], 10, -80);
        assert_eq!(networks.len(), 1);
    }

    #[test]
    fn test_hidden_networks_dropped() {
        let networks = filter_and_rank(vec![rec("", -20), rec("Visible", -50)], 10, -80);
        assert_eq!(ssids(&networks), vec!["Visible"]);
    }

    #[test]
    fn test_scan_polls_until_complete() {
        let clock = ManualClock::new();
        let mut network = SimulatedNetwork::new()
            .with_scan(vec![rec("A", -40), rec("B", -70), rec("C", -90)])
            .with_scan_polls(3);

        let networks = scan_networks(
            &mut network,
            &clock,
            Duration::from_millis(100),
            10,
            -80,
        )
        .unwrap();

        assert_eq!(networks, vec![rec("A", -40), rec("B", -70)]);
        assert_eq!(network.scans_started(), 1);
        // Three running polls, each followed by a sleep
        assert_eq!(clock.now(), Duration::from_millis(300));
    }

    #[test]
    fn test_scan_with_no_results_is_empty() {
        let clock = ManualClock::new();
        let mut network = SimulatedNetwork::new().with_scan(vec![]);
        let networks =
            scan_networks(&mut network, &clock, Duration::from_millis(100), 10, -80).unwrap();
        assert!(networks.is_empty());
    }

    fn arb_record() -> impl Strategy<Value = NetworkRecord> {
        ("[a-z]{1,6}", -100i8..=-20).prop_map(|(ssid, dbm)| rec(&ssid, dbm))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Output is capped, above the floor, and sorted strongest first.
        #[test]
        fn output_respects_limits_and_order(
            raw in prop::collection::vec(arb_record(), 0..30),
            max in 1usize..15,
            floor in -100i8..=-20,
        ) {
            let networks = filter_and_rank(raw, max, floor);
            prop_assert!(networks.len() <= max);
            prop_assert!(networks.iter().all(|n| n.signal_dbm >= floor));
            prop_assert!(networks.windows(2).all(|w| w[0].signal_dbm >= w[1].signal_dbm));
        }

        /// Equal signals appear in the order the scan reported them.
        #[test]
        fn sort_is_stable(dbms in prop::collection::vec(-90i8..=-30, 0..20)) {
            let raw: Vec<NetworkRecord> = dbms
                .iter()
                .enumerate()
                .map(|(i, dbm)| rec(&format!("n{}", i), *dbm))
                .collect();
            let networks = filter_and_rank(raw, 20, -100);
            for pair in networks.windows(2) {
                if pair[0].signal_dbm == pair[1].signal_dbm {
                    let a: usize = pair[0].ssid[1..].parse().unwrap();
                    let b: usize = pair[1].ssid[1..].parse().unwrap();
                    prop_assert!(a < b);
                }
            }
        }
    }
}

#[cfg(feature = "tap-tests")]
mod tap_tests {
    use super::*;
    use crate::network::SecurityKind;
    use cardputer_wifi_setup_macros::tap_test;

    #[tap_test]
    fn ranking_filters_and_sorts() {
        let raw = vec![
            NetworkRecord::new("A", -40, SecurityKind::Open),
            NetworkRecord::new("B", -70, SecurityKind::Protected),
            NetworkRecord::new("C", -90, SecurityKind::Protected),
        ];
        let networks = filter_and_rank(raw, 10, -80);
        assert_eq!(networks.len(), 2);
        assert_eq!(networks[0].ssid, "A");
        assert_eq!(networks[1].ssid, "B");
    }
}
