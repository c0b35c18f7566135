//! Integration tests for the failover chain.
//!
//! Every test drives a [`FailoverFetcher`] over fake providers with a manual
//! clock, so lockouts and budget windows are checked without sleeping.

mod common;

use std::sync::Arc;

use chrono::Duration;
use common::*;
use daytrader_market_data::{
    BrokerageProvider, Clock, ConnectionSupervisor, FailoverFetcher, FailureKind, FetchOutcome,
    ManualClock, MarketDataProvider, ProviderPolicy, SkipReason, Timeframe,
};
use rust_decimal_macros::dec;

fn chain(providers: &[Arc<FakeProvider>], clock: &Arc<ManualClock>) -> FailoverFetcher {
    let providers: Vec<Arc<dyn MarketDataProvider>> = providers
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn MarketDataProvider>)
        .collect();
    FailoverFetcher::with_clock(providers, Arc::clone(clock) as Arc<dyn Clock>)
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(market_open()))
}

// =============================================================================
// Priority and fallback
// =============================================================================

#[test]
fn test_healthy_chain_always_answers_from_primary() {
    let clock = clock();
    let providers = [
        FakeProvider::healthy("PRIMARY"),
        FakeProvider::healthy("SECONDARY"),
        FakeProvider::healthy("TERTIARY"),
        FakeProvider::healthy("QUATERNARY"),
    ];
    let fetcher = chain(&providers, &clock);

    for (i, tf) in Timeframe::ALL.iter().enumerate() {
        let quote = fetcher.fetch("gme", *tf).quote().unwrap();
        assert_eq!(quote.source, "PRIMARY");
        assert_eq!(providers[0].calls(), i + 1);
    }
    assert!(providers[1..].iter().all(|p| p.calls() == 0));
}

#[test]
fn test_unreachable_primary_falls_back_without_lockout() {
    let clock = clock();
    let providers = [
        FakeProvider::failing("PRIMARY", unreachable),
        FakeProvider::healthy("SECONDARY"),
    ];
    let fetcher = chain(&providers, &clock);

    let quote = fetcher.fetch("AMC", Timeframe::FiveMinutes).quote().unwrap();
    assert_eq!(quote.source, "SECONDARY");

    let status = fetcher.status();
    assert_eq!(status[0].used, 1);
    assert_eq!(status[0].locked_until, None);
    assert_eq!(status[1].used, 1);
    assert_eq!(status[1].locked_until, None);

    // Not locked: the next fetch tries Primary again
    fetcher.fetch("AMC", Timeframe::FiveMinutes);
    assert_eq!(providers[0].calls(), 2);
}

#[test]
fn test_locked_provider_is_not_called_until_unlock() {
    let clock = clock();
    let providers = [
        FakeProvider::failing("PRIMARY", rate_limited),
        FakeProvider::healthy("SECONDARY"),
    ];
    let fetcher = chain(&providers, &clock);

    fetcher.fetch("NIO", Timeframe::OneMinute);
    assert_eq!(providers[0].calls(), 1);
    let unlock_at = fetcher.status()[0].locked_until.unwrap();
    assert_eq!(unlock_at, market_open() + Duration::hours(2));

    for _ in 0..10 {
        clock.advance(Duration::minutes(10));
        let quote = fetcher.fetch("NIO", Timeframe::OneMinute).quote().unwrap();
        assert_eq!(quote.source, "SECONDARY");
    }
    assert_eq!(providers[0].calls(), 1);

    providers[0].set_behavior(Behavior::Healthy {
        price: dec!(4.20),
        synthetic: false,
    });
    clock.set(unlock_at);
    let quote = fetcher.fetch("NIO", Timeframe::OneMinute).quote().unwrap();
    assert_eq!(quote.source, "PRIMARY");
    assert_eq!(providers[0].calls(), 2);
}

#[test]
fn test_skip_reasons_in_diagnostics() {
    let clock = clock();
    let providers = [
        FakeProvider::failing("PRIMARY", quota_exhausted),
        FakeProvider::build("SECONDARY", ProviderPolicy::daily(0), Behavior::Fail(unreachable)),
    ];
    let fetcher = chain(&providers, &clock);

    fetcher.fetch("SOFI", Timeframe::FifteenMinutes);
    let FetchOutcome::Unavailable(diagnostics) = fetcher.fetch("SOFI", Timeframe::FifteenMinutes)
    else {
        panic!("expected unavailable");
    };

    assert!(matches!(
        diagnostics.attempts[0].skipped,
        Some(SkipReason::LockedOut { .. })
    ));
    assert_eq!(
        diagnostics.attempts[1].skipped,
        Some(SkipReason::BudgetExhausted { used: 0, limit: 0 })
    );
    assert_eq!(providers[1].calls(), 0);
}

// =============================================================================
// Exhaustion
// =============================================================================

#[test]
fn test_all_failing_is_unavailable_not_error() {
    let clock = clock();
    let providers = [
        FakeProvider::failing("PRIMARY", unreachable),
        FakeProvider::failing("SECONDARY", rate_limited),
        FakeProvider::failing("TERTIARY", quota_exhausted),
        FakeProvider::failing("QUATERNARY", unreachable),
    ];
    let fetcher = chain(&providers, &clock);

    match fetcher.fetch("XYZ", Timeframe::FiveMinutes) {
        FetchOutcome::Unavailable(diagnostics) => {
            assert!(!diagnostics.has_success());
            assert_eq!(diagnostics.attempts.len(), 4);
            assert_eq!(diagnostics.attempts[0].failure, Some(FailureKind::Unreachable));
            assert_eq!(diagnostics.attempts[1].failure, Some(FailureKind::RateLimited));
            assert_eq!(diagnostics.attempts[2].failure, Some(FailureKind::QuotaExhausted));
        }
        FetchOutcome::Available(quote) => panic!("unexpected quote from {}", quote.source),
    }
    assert!(providers.iter().all(|p| p.calls() == 1));
}

#[test]
fn test_per_minute_budget_recovers_after_window() {
    let clock = clock();
    let providers = [FakeProvider::build(
        "MASSIVE",
        ProviderPolicy::per_minute(5),
        Behavior::Healthy {
            price: dec!(3.02),
            synthetic: true,
        },
    )];
    let fetcher = chain(&providers, &clock);

    for _ in 0..5 {
        assert!(fetcher.fetch("LCID", Timeframe::OneDay).is_available());
    }
    assert!(!fetcher.fetch("LCID", Timeframe::OneDay).is_available());
    assert_eq!(providers[0].calls(), 5);

    clock.advance(Duration::seconds(61));
    assert!(fetcher.fetch("LCID", Timeframe::OneDay).is_available());
    assert_eq!(providers[0].calls(), 6);
}

// =============================================================================
// End to end
// =============================================================================

#[test]
fn test_unreachable_brokerage_and_exhausted_secondary_fall_to_tertiary() {
    let clock = clock();
    let (gateway, script) = FakeGateway::new();
    {
        let mut script = script.lock().unwrap();
        for _ in 0..3 {
            script.connect_results.push_back(refused());
        }
    }
    let supervisor = Arc::new(ConnectionSupervisor::new(fast_settings(), gateway));
    let primary = Arc::new(BrokerageProvider::with_clock(
        supervisor,
        Arc::clone(&clock) as Arc<dyn Clock>,
    ));

    let secondary = FakeProvider::build(
        "SERPAPI",
        ProviderPolicy::monthly(2),
        Behavior::Healthy {
            price: dec!(3.40),
            synthetic: true,
        },
    );
    let tertiary = FakeProvider::synthetic("ALPHA_VANTAGE", dec!(3.42));
    let quaternary = FakeProvider::healthy("MASSIVE");

    let fetcher = FailoverFetcher::with_clock(
        vec![
            primary as Arc<dyn MarketDataProvider>,
            Arc::clone(&secondary) as Arc<dyn MarketDataProvider>,
            Arc::clone(&tertiary) as Arc<dyn MarketDataProvider>,
            Arc::clone(&quaternary) as Arc<dyn MarketDataProvider>,
        ],
        Arc::clone(&clock) as Arc<dyn Clock>,
    );

    // Earlier fetches use up the secondary's monthly allowance
    for symbol in ["GME", "AMC"] {
        let quote = fetcher.fetch(symbol, Timeframe::FiveMinutes).quote().unwrap();
        assert_eq!(quote.source, "SERPAPI");
    }
    let status = fetcher.status();
    assert_eq!((status[1].used, status[1].limit), (2, 2));
    assert_eq!(secondary.calls(), 2);
    let primary_before = status[0].used;

    let quote = fetcher.fetch("XYZ", Timeframe::FiveMinutes).quote().unwrap();
    assert_eq!(quote.price, dec!(3.42));
    assert_eq!(quote.source, "ALPHA_VANTAGE");
    assert!(!quote.is_real_data);
    assert_eq!(quote.candles.len(), 60);
    assert_eq!(quote.candles.last().unwrap().close, dec!(3.42));

    let status = fetcher.status();
    assert_eq!(status[0].used, primary_before + 1);
    assert_eq!(status[0].locked_until, None);
    assert_eq!((status[1].used, status[1].limit), (2, 2));
    assert_eq!(secondary.calls(), 2);
    assert_eq!(tertiary.calls(), 1);
    assert_eq!(quaternary.calls(), 0);
    assert_eq!(status[3].used, 0);
}
