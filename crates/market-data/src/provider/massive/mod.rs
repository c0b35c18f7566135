//! Massive (Polygon-compatible aggregates API) provider.
//!
//! Quaternary tier. The free plan allows 5 calls per trailing minute, so one
//! previous-day aggregate is fetched per symbol and the candles are
//! synthesized around it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::info;
use num_traits::FromPrimitive;
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::http::{build_client, get_text, parse_json, DEFAULT_REQUEST_TIMEOUT};
use super::synthetic::synthesize_candles;
use super::{MarketDataProvider, ProviderPolicy};
use crate::errors::MarketDataError;
use crate::models::{ProviderId, Quote, Timeframe};

pub const DEFAULT_BASE_URL: &str = "https://api.massive.com";
const PROVIDER_ID: &str = "MASSIVE";

/// Free plan calls per trailing minute.
pub const DEFAULT_PER_MINUTE_LIMIT: u32 = 5;

#[derive(Debug, Deserialize)]
pub(crate) struct AggregatesResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub results: Vec<AggregateBar>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AggregateBar {
    #[serde(rename = "o")]
    pub open: Option<f64>,
    #[serde(rename = "h")]
    pub high: Option<f64>,
    #[serde(rename = "l")]
    pub low: Option<f64>,
    #[serde(rename = "c")]
    pub close: Option<f64>,
    #[serde(rename = "v")]
    pub volume: Option<f64>,
}

pub struct MassiveProvider {
    client: Client,
    api_key: String,
    base_url: String,
    policy: ProviderPolicy,
}

impl MassiveProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_options(
            api_key,
            DEFAULT_BASE_URL.to_string(),
            ProviderPolicy::per_minute(DEFAULT_PER_MINUTE_LIMIT),
            DEFAULT_REQUEST_TIMEOUT,
        )
    }

    pub fn with_options(
        api_key: String,
        base_url: String,
        policy: ProviderPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            client: build_client(timeout),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
        }
    }
}

impl MarketDataProvider for MassiveProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn policy(&self) -> ProviderPolicy {
        self.policy.clone()
    }

    fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<Quote, MarketDataError> {
        if self.api_key.is_empty() {
            return Err(MarketDataError::NotConfigured {
                provider: PROVIDER_ID.to_string(),
            });
        }

        let url = format!("{}/v2/aggs/ticker/{}/prev", self.base_url, symbol);
        let params = [("apiKey", self.api_key.as_str())];
        let body = get_text(&self.client, PROVIDER_ID, &url, &params)?;
        let response: AggregatesResponse = parse_json(PROVIDER_ID, &body)?;
        let quote = build_quote(symbol, timeframe, response, Utc::now(), &mut rand::thread_rng())?;
        info!("Fetched {} from Massive: ${}", symbol, quote.price);
        Ok(quote)
    }
}

fn price(value: Option<f64>) -> Option<Decimal> {
    value
        .filter(|v| v.is_finite())
        .and_then(Decimal::from_f64)
        .map(|d| d.round_dp(2))
}

pub(crate) fn build_quote<R: rand::Rng + ?Sized>(
    symbol: &str,
    timeframe: Timeframe,
    response: AggregatesResponse,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Quote, MarketDataError> {
    let status = response.status.as_deref().unwrap_or_default();
    if !matches!(status, "OK" | "DELAYED") {
        let message = response.error.unwrap_or_else(|| format!("status {:?}", status));
        if message.to_ascii_lowercase().contains("exceeded the maximum requests") {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }
        return Err(MarketDataError::MalformedResponse {
            provider: PROVIDER_ID.to_string(),
            message,
        });
    }

    let bar = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| MarketDataError::NoData {
            provider: PROVIDER_ID.to_string(),
            symbol: symbol.to_string(),
        })?;

    let current = price(bar.close)
        .filter(|p| *p > Decimal::ZERO)
        .ok_or_else(|| MarketDataError::MalformedResponse {
            provider: PROVIDER_ID.to_string(),
            message: format!("No usable close for {}", symbol),
        })?;
    // The previous-day aggregate is the latest settled bar: its close is both
    // the current price and the reference close.
    let previous_close = current;
    let open = price(bar.open).unwrap_or(current);
    let day_high = price(bar.high).unwrap_or(current);
    let day_low = price(bar.low).unwrap_or(current);
    let volume = bar
        .volume
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
        .unwrap_or(0);

    let candles = synthesize_candles(previous_close, current, timeframe, now, rng);

    Ok(Quote {
        symbol: symbol.to_string(),
        price: current,
        previous_close,
        open,
        day_high,
        day_low,
        volume,
        average_volume: 0,
        bid: None,
        ask: None,
        float_shares: None,
        candles,
        source: ProviderId::Borrowed(PROVIDER_ID),
        is_real_data: false,
    })
}
