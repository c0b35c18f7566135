//! Brokerage provider.
//!
//! Primary tier. Pulls historical bars and a snapshot tick over the shared
//! brokerage session. The supervisor serializes every request, so a slow
//! gateway delays all brokerage traffic but never the REST tiers.

use std::sync::Arc;

use log::debug;
use num_traits::FromPrimitive;
use rust_decimal::Decimal;

use super::{MarketDataProvider, ProviderPolicy};
use crate::broker::{BrokerBar, BrokerTick, ConnectionSupervisor, Contract, HistoryRequest};
use crate::clock::{Clock, SystemClock};
use crate::errors::MarketDataError;
use crate::models::{eastern_date, Candle, MarketSession, ProviderId, Quote, Timeframe};

const PROVIDER_ID: &str = "BROKERAGE";

pub struct BrokerageProvider {
    supervisor: Arc<ConnectionSupervisor>,
    clock: Arc<dyn Clock>,
}

impl BrokerageProvider {
    pub fn new(supervisor: Arc<ConnectionSupervisor>) -> Self {
        Self::with_clock(supervisor, Arc::new(SystemClock))
    }

    pub fn with_clock(supervisor: Arc<ConnectionSupervisor>, clock: Arc<dyn Clock>) -> Self {
        Self { supervisor, clock }
    }
}

impl MarketDataProvider for BrokerageProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn policy(&self) -> ProviderPolicy {
        ProviderPolicy::unlimited()
    }

    fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<Quote, MarketDataError> {
        let contract = Contract::stock(symbol);
        let now = self.clock.now();
        let request = HistoryRequest {
            spec: timeframe.bar_spec(),
            // Extended hours only while premarket is running
            use_rth: MarketSession::at(now) != MarketSession::Premarket,
        };

        let (bars, tick) = self
            .supervisor
            .with_session(|gateway| {
                let bars = gateway.request_history(&contract, &request)?;
                if bars.is_empty() {
                    return Ok((bars, None));
                }
                let tick = gateway.request_quote(&contract)?;
                Ok((bars, tick))
            })
            .map_err(|e| match e {
                MarketDataError::ClientIdsExhausted { .. } | MarketDataError::Gateway(_) => {
                    MarketDataError::Unreachable {
                        provider: PROVIDER_ID.to_string(),
                        message: e.to_string(),
                    }
                }
                other => other,
            })?;

        debug!(
            "Brokerage returned {} bars for {} ({})",
            bars.len(),
            symbol,
            timeframe
        );
        build_quote(symbol, &bars, tick.as_ref())
    }
}

fn price(value: f64) -> Option<Decimal> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    Decimal::from_f64(value).map(|d| d.round_dp(4))
}

fn count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}

fn to_candle(bar: &BrokerBar) -> Option<Candle> {
    Some(Candle::new(
        bar.time,
        price(bar.open)?,
        price(bar.high)?,
        price(bar.low)?,
        price(bar.close)?,
        count(bar.volume),
    ))
}

pub(crate) fn build_quote(
    symbol: &str,
    bars: &[BrokerBar],
    tick: Option<&BrokerTick>,
) -> Result<Quote, MarketDataError> {
    let mut candles: Vec<Candle> = bars.iter().filter_map(to_candle).collect();
    candles.sort_by_key(|c| c.time);

    let Some(last) = candles.last() else {
        return Err(MarketDataError::NoData {
            provider: PROVIDER_ID.to_string(),
            symbol: symbol.to_string(),
        });
    };

    let session_start = session_start(&candles);
    let session: &[Candle] = &candles[session_start..];

    let from_tick = |f: fn(&BrokerTick) -> f64| tick.and_then(|t| price(f(t)));

    let current = from_tick(|t| t.last)
        .or_else(|| from_tick(|t| t.close))
        .unwrap_or(last.close);
    let previous_close = from_tick(|t| t.close)
        .or_else(|| session_start.checked_sub(1).map(|i| candles[i].close))
        .unwrap_or(candles[0].open);
    let open = from_tick(|t| t.open).unwrap_or(session[0].open);
    let bar_high = session.iter().map(|c| c.high).fold(current, Decimal::max);
    let bar_low = session.iter().map(|c| c.low).fold(current, Decimal::min);
    let day_high = from_tick(|t| t.high).unwrap_or(bar_high).max(current);
    let day_low = from_tick(|t| t.low).unwrap_or(bar_low).min(current);
    let volume = tick
        .map(|t| count(t.volume))
        .filter(|v| *v > 0)
        .unwrap_or_else(|| session.iter().map(|c| c.volume).sum());
    let average_volume = tick.map(|t| count(t.average_volume)).unwrap_or(0);

    Ok(Quote {
        symbol: symbol.to_string(),
        price: current,
        previous_close,
        open,
        day_high,
        day_low,
        volume,
        average_volume,
        bid: tick.and_then(|t| price(t.bid)),
        ask: tick.and_then(|t| price(t.ask)),
        float_shares: None,
        candles,
        source: ProviderId::Borrowed(PROVIDER_ID),
        is_real_data: true,
    })
}

/// Index of the first candle on the same exchange date as the last one.
fn session_start(candles: &[Candle]) -> usize {
    let Some(last) = candles.last() else {
        return 0;
    };
    let last_date = eastern_date(last.time);
    candles
        .iter()
        .position(|c| eastern_date(c.time) == last_date)
        .unwrap_or(0)
}
