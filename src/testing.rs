//! TAP (Test Anything Protocol) harness for running tests on the device.
//!
//! Only compiled with the `tap-tests` feature. Tests are written next to the
//! code they cover, in a `tap_tests` module, with `#[tap_test]`:
//!
//! ```ignore
//! #[cfg(feature = "tap-tests")]
//! mod tap_tests {
//!     use super::*;
//!     use cardputer_wifi_setup_macros::tap_test;
//!
//!     #[tap_test]
//!     fn empty_string_tag_is_seed() {
//!         assert_eq!(integrity_tag(""), 5381);
//!     }
//!
//!     #[tap_test(should_panic = "boom")]
//!     fn panics() {
//!         panic!("boom");
//!     }
//! }
//! ```
//!
//! The `device-tests` binary collects every registered test and prints TAP 14
//! on the console, which the serial monitor or a TAP consumer can read.

use std::panic::{catch_unwind, AssertUnwindSafe};

pub use inventory;

/// Result type for fallible test bodies.
pub type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Registration hook generated by `#[tap_test]`.
pub type TestRegisterFn = fn(&mut TestRunner);

/// One registered test.
pub struct TapTestEntry {
    pub name: &'static str,
    pub register: TestRegisterFn,
}

impl TapTestEntry {
    pub const fn new(name: &'static str, register: TestRegisterFn) -> Self {
        Self { name, register }
    }
}

inventory::collect!(TapTestEntry);

/// Number of registered tests whose name contains `filter`.
pub fn test_count(filter: Option<&str>) -> usize {
    inventory::iter::<TapTestEntry>
        .into_iter()
        .filter(|entry| matches(entry.name, filter))
        .count()
}

fn matches(name: &str, filter: Option<&str>) -> bool {
    filter.map_or(true, |f| name.contains(f))
}

/// Run every registered test. Returns true if all passed.
pub fn run_all_tests() -> bool {
    run_matching(None)
}

/// Run the registered tests whose name contains `filter`.
pub fn run_matching(filter: Option<&str>) -> bool {
    let mut runner = TestRunner::new();
    runner.print_header(test_count(filter));
    if let Some(f) = filter {
        TestRunner::comment(&format!("filter: {}", f));
    }

    for entry in inventory::iter::<TapTestEntry> {
        if matches(entry.name, filter) {
            (entry.register)(&mut runner);
        }
    }

    runner.finish()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs tests and prints one TAP line per result.
#[derive(Default)]
pub struct TestRunner {
    tests_run: usize,
    failed: Vec<String>,
}

impl TestRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, name: &str, failure: Option<String>) {
        self.tests_run += 1;
        match failure {
            None => println!("ok {} - {}", self.tests_run, name),
            Some(reason) => {
                println!("not ok {} - {}", self.tests_run, name);
                println!("# {}", reason);
                self.failed.push(name.to_string());
            }
        }
    }

    /// Run a test returning [`TestResult`]. Panics count as failures.
    pub fn run<F>(&mut self, name: &str, test_fn: F)
    where
        F: FnOnce() -> TestResult + std::panic::UnwindSafe,
    {
        let failure = match catch_unwind(AssertUnwindSafe(test_fn)) {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("Error: {}", e)),
            Err(payload) => Some(format!("Panic: {}", panic_message(payload.as_ref()))),
        };
        self.record(name, failure);
    }

    /// Run a test that reports failure by panicking.
    pub fn run_assert<F>(&mut self, name: &str, test_fn: F)
    where
        F: FnOnce() + std::panic::UnwindSafe,
    {
        self.run(name, || {
            test_fn();
            Ok(())
        });
    }

    /// Run a test that must panic, optionally with a message containing
    /// `expected`.
    pub fn run_should_panic<F>(&mut self, name: &str, test_fn: F, expected: Option<&str>)
    where
        F: FnOnce() + std::panic::UnwindSafe,
    {
        let failure = match catch_unwind(AssertUnwindSafe(test_fn)) {
            Ok(()) => Some("Expected panic but test completed normally".to_string()),
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                match expected {
                    Some(want) if !msg.contains(want) => {
                        Some(format!("Expected panic containing '{}', got '{}'", want, msg))
                    }
                    _ => None,
                }
            }
        };
        self.record(name, failure);
    }

    pub fn print_header(&self, planned_tests: usize) {
        println!("TAP version 14");
        println!("1..{}", planned_tests);
    }

    /// Print a TAP diagnostic line.
    pub fn comment(msg: &str) {
        println!("# {}", msg);
    }

    /// Print the summary. Returns true if nothing failed.
    pub fn finish(&self) -> bool {
        println!("# -----------------------");
        println!("# Tests run: {}", self.tests_run);
        println!("# Passed: {}", self.tests_passed());
        println!("# Failed: {}", self.tests_failed());
        for name in &self.failed {
            println!("#   {}", name);
        }

        let pass = self.failed.is_empty();
        println!("# Result: {}", if pass { "PASS" } else { "FAIL" });
        pass
    }

    pub fn tests_run(&self) -> usize {
        self.tests_run
    }

    pub fn tests_passed(&self) -> usize {
        self.tests_run - self.failed.len()
    }

    pub fn tests_failed(&self) -> usize {
        self.failed.len()
    }

    /// Names of the failed tests, in run order.
    pub fn failures(&self) -> &[String] {
        &self.failed
    }
}

mod tap_tests {
    use super::*;
    use cardputer_wifi_setup_macros::tap_test;

    #[tap_test]
    fn runner_counts_pass_and_fail() {
        let mut runner = TestRunner::new();
        runner.run("pass1", || Ok(()));
        runner.run("fail1", || Err("error".into()));
        runner.run("pass2", || Ok(()));
        assert_eq!(runner.tests_run(), 3);
        assert_eq!(runner.tests_passed(), 2);
        assert_eq!(runner.failures(), ["fail1".to_string()]);
    }

    #[tap_test]
    fn runner_catches_panic() {
        let mut runner = TestRunner::new();
        runner.run_assert("panicking_test", || panic!("intentional panic"));
        assert_eq!(runner.tests_failed(), 1);
    }

    #[tap_test]
    fn should_panic_checks_message() {
        let mut runner = TestRunner::new();
        runner.run_should_panic("right", || panic!("boom"), Some("boom"));
        runner.run_should_panic("wrong", || panic!("bang"), Some("boom"));
        runner.run_should_panic("none", || {}, None);
        assert_eq!(runner.tests_passed(), 1);
        assert_eq!(runner.tests_failed(), 2);
    }

    #[tap_test]
    fn filter_matches_substring() {
        assert!(matches("integrity_tag_seed", Some("tag")));
        assert!(!matches("cursor_never_leaves_list", Some("tag")));
        assert!(matches("anything", None));
    }
}
