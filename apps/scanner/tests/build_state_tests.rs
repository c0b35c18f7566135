//! Wiring tests for the scanner service: chain assembly and scan passes.

mod common;

use std::time::Duration;

use common::*;
use daytrader_core::scanner::{ScanCriteria, ScanDelay};
use daytrader_market_data::ConnectionState;
use daytrader_scanner::build_state;
use daytrader_scanner::scheduler::run_scan_pass;

// =============================================================================
// Chain assembly
// =============================================================================

#[test]
fn test_keyless_providers_stay_out_of_chain() {
    let state = build_state(&config(&[]), None).unwrap();

    assert!(state.fetcher.provider_ids().is_empty());
    assert!(state.supervisor.is_none());
    assert!(state.order_desk.is_none());
    assert_eq!(state.active_symbols().len(), 10);
}

#[test]
fn test_rest_tiers_follow_configured_order() {
    let config = config(&[
        ("DT_SERPAPI_KEY", "serp"),
        ("DT_MASSIVE_KEY", "massive"),
        ("DT_PROVIDER_ORDER", "massive,alphavantage,serpapi"),
    ]);
    let state = build_state(&config, None).unwrap();

    assert_eq!(state.fetcher.provider_ids(), vec!["MASSIVE", "SERPAPI"]);

    let status = state.fetcher.status();
    assert_eq!(status[0].limit, 5);
    assert_eq!(status[1].limit, 250);
    assert!(status.iter().all(|s| s.used == 0 && s.locked_until.is_none()));
}

#[test]
fn test_broker_host_without_gateway_runs_rest_only() {
    let config = config(&[("DT_BROKER_HOST", "127.0.0.1"), ("DT_SERPAPI_KEY", "serp")]);
    let state = build_state(&config, None).unwrap();

    assert_eq!(state.fetcher.provider_ids(), vec!["SERPAPI"]);
    assert!(state.supervisor.is_none());
}

#[test]
fn test_supplied_gateway_becomes_primary() {
    let config = config(&[
        ("DT_BROKER_HOST", "127.0.0.1"),
        ("DT_BROKER_CLIENT_ID", "7"),
        ("DT_ALPHAVANTAGE_KEY", "av"),
    ]);
    let state = build_state(&config, Some(Box::new(RefusingGateway))).unwrap();

    assert_eq!(state.fetcher.provider_ids(), vec!["BROKERAGE", "ALPHA_VANTAGE"]);
    let supervisor = state.supervisor.as_ref().unwrap();
    assert_eq!(supervisor.client_id(), 7);
    assert_eq!(supervisor.state(), ConnectionState::Disconnected);
    assert!(state.order_desk.is_some());
}

#[test]
fn test_gateway_without_broker_host_is_rejected() {
    assert!(build_state(&config(&[]), Some(Box::new(RefusingGateway))).is_err());
}

// =============================================================================
// Scan passes
// =============================================================================

#[test]
fn test_empty_chain_widens_delay_per_symbol() {
    let config = config(&[("DT_SEED_SYMBOLS", "GME,AMC,NIO")]);
    let state = build_state(&config, None).unwrap();
    let mut delay = ScanDelay::new(config.scan_interval);

    let report = run_scan_pass(&state, &ScanCriteria::default(), &mut delay);

    assert_eq!(report.scanned, 3);
    assert_eq!(report.unavailable, vec!["GME", "AMC", "NIO"]);
    assert!(report.hits.is_empty());
    assert_eq!(delay.current(), Duration::from_secs(15));

    run_scan_pass(&state, &ScanCriteria::default(), &mut delay);
    assert_eq!(delay.current(), Duration::from_secs(18));
}

#[test]
fn test_refused_brokerage_marks_symbols_unavailable() {
    let config = config(&[("DT_BROKER_HOST", "127.0.0.1"), ("DT_SEED_SYMBOLS", "GME")]);
    let state = build_state(&config, Some(Box::new(RefusingGateway))).unwrap();
    let mut delay = ScanDelay::new(Duration::from_secs(58));

    let report = run_scan_pass(&state, &ScanCriteria::default(), &mut delay);

    assert_eq!(report.unavailable, vec!["GME"]);
    assert_eq!(delay.current(), Duration::from_secs(59));
    let status = state.fetcher.status();
    assert_eq!(status[0].provider_id, "BROKERAGE");
    assert!(status[0].locked_until.is_none());
}
