use std::sync::{Arc, Mutex};

use daytrader_market_data::models::normalize_symbol;
use daytrader_market_data::FetchOutcome;
use log::{debug, info, warn};

use super::active_symbols::ActiveSymbolSet;
use super::scanner_model::{ScanCriteria, ScanHit, ScanReport};
use super::scanner_traits::QuoteSource;

pub struct StockScanner {
    source: Arc<dyn QuoteSource>,
    active: Arc<ActiveSymbolSet>,
    /// Where the next pass starts in the active set once it outgrows a pass
    cursor: Mutex<usize>,
}

impl StockScanner {
    pub fn new(source: Arc<dyn QuoteSource>, active: Arc<ActiveSymbolSet>) -> Self {
        StockScanner {
            source,
            active,
            cursor: Mutex::new(0),
        }
    }

    pub fn active_symbols(&self) -> &Arc<ActiveSymbolSet> {
        &self.active
    }

    /// Run one pass over the active set plus `candidates`.
    ///
    /// Candidates that qualify join the active set and are reported in
    /// `newly_added`. Symbols no provider answered for are listed in
    /// `unavailable` and otherwise ignored.
    ///
    /// A pass covers at most `max_symbols`. New candidates get up to half of
    /// that (at least one slot), and when the active set does not fit in the
    /// rest, successive passes rotate through it.
    pub fn scan(&self, criteria: &ScanCriteria, candidates: &[String]) -> ScanReport {
        let symbols = self.select_symbols(criteria.max_symbols, candidates);

        info!(
            "Scanning {} symbols (price {}-{}, gain >= {}%, volume >= {}x, {})",
            symbols.len(),
            criteria.min_price,
            criteria.max_price,
            criteria.min_gain_percent,
            criteria.volume_multiplier,
            criteria.timeframe
        );

        let mut report = ScanReport {
            scanned: symbols.len(),
            ..ScanReport::default()
        };

        for symbol in symbols {
            let quote = match self.source.fetch(&symbol, criteria.timeframe) {
                FetchOutcome::Available(quote) => quote,
                FetchOutcome::Unavailable(diagnostics) => {
                    debug!("{} unavailable: {}", symbol, diagnostics.summary());
                    report.unavailable.push(symbol);
                    continue;
                }
            };

            if !criteria.matches(&quote) {
                debug!(
                    "{} did not qualify: ${} {}%",
                    symbol,
                    quote.price,
                    quote.change_percent()
                );
                continue;
            }

            if self.active.insert(&symbol) {
                info!("New mover {}: +{}%", symbol, quote.change_percent());
                report.newly_added.push(symbol);
            }
            report.hits.push(ScanHit::from_quote(quote));
        }

        report
            .hits
            .sort_by(|a, b| b.change_percent.cmp(&a.change_percent));
        report.hits.truncate(criteria.display_count);

        info!(
            "Scan complete: {} qualifying, {} new, {} unavailable, {} active",
            report.hits.len(),
            report.newly_added.len(),
            report.unavailable.len(),
            self.active.len()
        );
        report
    }

    fn select_symbols(&self, max_symbols: usize, candidates: &[String]) -> Vec<String> {
        let active = self.active.snapshot();
        let mut fresh: Vec<String> = Vec::new();
        for candidate in candidates {
            let candidate = normalize_symbol(candidate);
            if !candidate.is_empty() && !active.contains(&candidate) && !fresh.contains(&candidate) {
                fresh.push(candidate);
            }
        }

        let reserved = if fresh.is_empty() {
            0
        } else {
            (max_symbols / 2).max(1).min(fresh.len()).min(max_symbols)
        };
        let active_take = active.len().min(max_symbols - reserved);

        let mut symbols = self.rotate(&active, active_take);
        symbols.extend(fresh.into_iter().take(max_symbols - active_take));
        symbols
    }

    /// `take` symbols of `active`, continuing where the previous pass stopped.
    fn rotate(&self, active: &[String], take: usize) -> Vec<String> {
        if take >= active.len() {
            return active.to_vec();
        }
        let mut cursor = self.cursor.lock().unwrap_or_else(|poisoned| {
            warn!("Scanner cursor mutex was poisoned, recovering");
            poisoned.into_inner()
        });
        let start = *cursor % active.len();
        *cursor = (start + take) % active.len();
        active.iter().cycle().skip(start).take(take).cloned().collect()
    }
}
