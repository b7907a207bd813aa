//! Global subscriber installation.

use tether_log::{Config, LogError};

#[test]
fn init_test_is_idempotent() {
    let _first = tether_log::init_test().unwrap();
    let _second = tether_log::init_test().unwrap();
    tracing::info!(attempt = 2, "still logging");
}

#[test]
fn second_global_install_is_refused() {
    let _guard = tether_log::init_test().unwrap();
    let err = tether_log::init_with(Config::production().with_service("host")).unwrap_err();
    assert!(matches!(err, LogError::Init(_)));
}

#[test]
fn filter_errors_win_over_install_errors() {
    let _guard = tether_log::init_test().unwrap();
    let err = tether_log::init_with(Config::default().with_level("tether=loudest")).unwrap_err();
    assert!(matches!(err, LogError::Filter(_)));
}
