use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Context;
use daytrader_core::scanner::ScanCriteria;
use daytrader_market_data::{FetchOutcome, Timeframe};
use daytrader_scanner::config::Config;
use daytrader_scanner::scheduler::{start_scan_loop, start_trailing_monitor};
use daytrader_scanner::{build_state, init_tracing, AppState};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);
    let state = build_state(&config, None)?;

    if let Some(supervisor) = &state.supervisor {
        supervisor
            .spawn_liveness_monitor()
            .context("failed to start the brokerage liveness monitor")?;
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        let shutdown = Arc::new(AtomicBool::new(false));
        if state.order_desk.is_some() {
            start_trailing_monitor(Arc::clone(&state), Arc::clone(&shutdown))?;
        }
        let handle = start_scan_loop(Arc::clone(&state), ScanCriteria::default(), shutdown)?;
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("scan loop panicked"))?;
        return Ok(());
    }

    let (timeframe, symbols) = parse_args(&args)?;
    fetch_once(&state, timeframe, &symbols)
}

/// `[--timeframe <label>] SYMBOL...`
fn parse_args(args: &[String]) -> anyhow::Result<(Timeframe, Vec<String>)> {
    let mut timeframe = Timeframe::FiveMinutes;
    let mut symbols = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--timeframe" || arg == "-t" {
            let label = iter.next().context("--timeframe needs a value")?;
            timeframe = label.parse()?;
        } else {
            symbols.push(arg.clone());
        }
    }
    anyhow::ensure!(!symbols.is_empty(), "no symbols given");
    Ok((timeframe, symbols))
}

fn fetch_once(state: &AppState, timeframe: Timeframe, symbols: &[String]) -> anyhow::Result<()> {
    let results: Vec<serde_json::Value> = symbols
        .iter()
        .map(|symbol| match state.fetcher.fetch(symbol, timeframe) {
            FetchOutcome::Available(quote) => json!({
                "symbol": quote.symbol.clone(),
                "available": true,
                "quote": quote,
            }),
            FetchOutcome::Unavailable(diagnostics) => {
                tracing::warn!("{} unavailable: {}", symbol, diagnostics.summary());
                json!({
                    "symbol": symbol,
                    "available": false,
                    "diagnostics": diagnostics,
                })
            }
        })
        .collect();

    let output = json!({
        "timeframe": timeframe.to_string(),
        "results": results,
        "providers": state.fetcher.status(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
