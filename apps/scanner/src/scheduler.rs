//! Background loops: the re-scan loop and the trailing-stop monitor.
//!
//! Each scan pass scans the active symbol set, widens the delay for every
//! symbol no provider could answer for, and closes positions once the
//! end-of-day liquidation window opens. The monitor feeds fresh prices to
//! every registered trailing stop.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use daytrader_core::scanner::{QuoteSource, ScanCriteria, ScanDelay, ScanReport};
use daytrader_core::trading::{OrderDesk, StopUpdate};
use daytrader_market_data::{FetchOutcome, Timeframe};
use tracing::{debug, info, warn};

use crate::main_lib::AppState;

/// Granularity of the shutdown check while sleeping between passes.
const SHUTDOWN_POLL: Duration = Duration::from_millis(250);

/// Interval between trailing-stop passes.
pub const TRAILING_INTERVAL: Duration = Duration::from_secs(10);

/// Runs one scan pass and the liquidation check.
pub fn run_scan_pass(state: &AppState, criteria: &ScanCriteria, delay: &mut ScanDelay) -> ScanReport {
    let report = state.scanner.scan(criteria, &[]);

    for symbol in &report.newly_added {
        info!("{} qualified and joined the active set", symbol);
    }
    for hit in &report.hits {
        debug!(
            "{} {}% rvol={:?} signal={:?} hot={} via {}",
            hit.symbol(),
            hit.change_percent.round_dp(2),
            hit.relative_volume,
            hit.signal,
            hit.is_hot,
            hit.quote.source
        );
    }

    if !report.unavailable.is_empty() {
        let next = delay.record_failures(report.unavailable.len());
        warn!(
            "{} of {} symbols unavailable ({}); next scan in {:?}",
            report.unavailable.len(),
            report.scanned,
            report.unavailable.join(","),
            next
        );
    }

    if let Some(desk) = &state.order_desk {
        match desk.liquidate_if_due() {
            Ok(report) if !report.is_empty() => {
                for (symbol, e) in &report.failures {
                    warn!("End-of-day close for {} failed: {}", symbol, e);
                }
                info!(
                    "End-of-day liquidation sent {} orders, {} failed",
                    report.acks.len(),
                    report.failures.len()
                );
            }
            Ok(_) => {}
            Err(e) => warn!("End-of-day liquidation failed: {}", e),
        }
    }

    info!(
        "Scan pass: {} scanned, {} hits, {} unavailable",
        report.scanned,
        report.hits.len(),
        report.unavailable.len()
    );
    report
}

/// Starts the re-scan loop on its own thread. It exits once `shutdown` is set.
pub fn start_scan_loop(
    state: Arc<AppState>,
    criteria: ScanCriteria,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("scan-loop".to_string())
        .spawn(move || {
            let mut delay = ScanDelay::new(state.config.scan_interval);
            info!("Scan loop started ({:?} base interval)", delay.base());

            while !shutdown.load(Ordering::SeqCst) {
                run_scan_pass(&state, &criteria, &mut delay);
                sleep_unless_shutdown(delay.current(), &shutdown);
            }
            info!("Scan loop stopped");
        })
}

/// Fetch each symbol with a registered trailing stop once and feed the price
/// to its trackers. Returns the stops that moved.
pub fn run_trailing_pass(desk: &OrderDesk, source: &dyn QuoteSource) -> Vec<StopUpdate> {
    let mut by_symbol: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for (order_id, symbol) in desk.trailing_orders() {
        by_symbol.entry(symbol).or_default().push(order_id);
    }

    let mut updates = Vec::new();
    for (symbol, order_ids) in by_symbol {
        let price = match source.fetch(&symbol, Timeframe::OneMinute) {
            FetchOutcome::Available(quote) => quote.price,
            FetchOutcome::Unavailable(diagnostics) => {
                debug!("No price for trailing {}: {}", symbol, diagnostics.summary());
                continue;
            }
        };

        for order_id in order_ids {
            match desk.update_trailing(order_id, price) {
                Ok(Some(update)) => updates.push(update),
                Ok(None) => {}
                Err(e) => warn!("Trailing stop update for order {} failed: {}", order_id, e),
            }
        }
    }
    updates
}

/// Starts the trailing-stop monitor. Does nothing useful without an order
/// desk, so callers only start it when one exists.
pub fn start_trailing_monitor(
    state: Arc<AppState>,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("trailing-stops".to_string())
        .spawn(move || {
            let Some(desk) = state.order_desk.as_ref() else {
                return;
            };
            info!("Trailing-stop monitor started ({:?} interval)", TRAILING_INTERVAL);

            while !shutdown.load(Ordering::SeqCst) {
                let updates = run_trailing_pass(desk, state.fetcher.as_ref());
                if !updates.is_empty() {
                    info!("{} trailing stops moved", updates.len());
                }
                sleep_unless_shutdown(TRAILING_INTERVAL, &shutdown);
            }
            info!("Trailing-stop monitor stopped");
        })
}

fn sleep_unless_shutdown(total: Duration, shutdown: &AtomicBool) {
    let deadline = Instant::now() + total;
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep(SHUTDOWN_POLL.min(deadline - now));
    }
}
