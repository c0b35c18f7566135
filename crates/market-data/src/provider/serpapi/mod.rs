//! SerpAPI Google Finance provider.
//!
//! Secondary tier. One call returns a price summary and, sometimes, an
//! intraday price graph. Graph points become candles with an estimated ±1%
//! range; without a graph the candles are synthesized. Either way the OHLC
//! detail is estimated, so quotes are tagged `is_real_data = false`.
//!
//! The free plan allows 250 searches a month.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, info};
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use super::http::{build_client, get_text, parse_json, DEFAULT_REQUEST_TIMEOUT};
use super::synthetic::synthesize_candles;
use super::{MarketDataProvider, ProviderPolicy};
use crate::errors::MarketDataError;
use crate::models::{Candle, ProviderId, Quote, Timeframe};

const BASE_URL: &str = "https://serpapi.com/search";
const PROVIDER_ID: &str = "SERPAPI";

/// Free plan monthly allowance.
pub const DEFAULT_MONTHLY_LIMIT: u32 = 250;

/// Graph points kept as candles.
const MAX_GRAPH_CANDLES: usize = 60;

/// Previous close estimate when the summary has none.
const PREVIOUS_CLOSE_ESTIMATE: Decimal = Decimal::from_parts(98, 0, 0, false, 2);

#[derive(Debug, Deserialize, Default)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub summary: Option<Summary>,
    #[serde(default)]
    pub graph: Vec<GraphPoint>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct Summary {
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub previous_close: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphPoint {
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub volume: Option<u64>,
    #[serde(default)]
    pub date: Option<String>,
}

pub struct SerpApiProvider {
    client: Client,
    api_key: String,
    policy: ProviderPolicy,
}

impl SerpApiProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_options(
            api_key,
            ProviderPolicy::monthly(DEFAULT_MONTHLY_LIMIT),
            DEFAULT_REQUEST_TIMEOUT,
        )
    }

    pub fn with_options(api_key: String, policy: ProviderPolicy, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            api_key,
            policy,
        }
    }
}

impl MarketDataProvider for SerpApiProvider {
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

        let query = format!("{}:NASDAQ", symbol);
        let params = [
            ("engine", "google_finance"),
            ("q", query.as_str()),
            ("api_key", self.api_key.as_str()),
            ("hl", "en"),
        ];
        let body = get_text(&self.client, PROVIDER_ID, BASE_URL, &params)?;
        let response: SearchResponse = parse_json(PROVIDER_ID, &body)?;
        let quote = build_quote(symbol, timeframe, response, Utc::now(), &mut rand::thread_rng())?;
        info!("Fetched {} from SerpAPI: ${}", symbol, quote.price);
        Ok(quote)
    }
}

/// Normalize a search response into a quote.
pub(crate) fn build_quote<R: rand::Rng + ?Sized>(
    symbol: &str,
    timeframe: Timeframe,
    response: SearchResponse,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Quote, MarketDataError> {
    if let Some(error) = response.error {
        return Err(classify_error(symbol, &error));
    }

    let summary = response.summary.unwrap_or_default();
    let price = summary
        .price
        .as_ref()
        .and_then(parse_money)
        .filter(|p| *p > Decimal::ZERO)
        .ok_or_else(|| MarketDataError::NoData {
            provider: PROVIDER_ID.to_string(),
            symbol: symbol.to_string(),
        })?;
    let previous_close = summary
        .previous_close
        .as_ref()
        .and_then(parse_money)
        .filter(|p| *p > Decimal::ZERO)
        .unwrap_or_else(|| (price * PREVIOUS_CLOSE_ESTIMATE).round_dp(2));

    let candles = graph_candles(&response.graph, timeframe, now);
    let candles = if candles.is_empty() {
        debug!("No graph for {}, synthesizing {} candles", symbol, timeframe);
        synthesize_candles(previous_close, price, timeframe, now, rng)
    } else {
        candles
    };

    let day_high = candles.iter().map(|c| c.high).fold(price.max(previous_close), Decimal::max);
    let day_low = candles.iter().map(|c| c.low).fold(price.min(previous_close), Decimal::min);
    let volume = response.graph.iter().filter_map(|p| p.volume).sum();

    Ok(Quote {
        symbol: symbol.to_string(),
        price,
        previous_close,
        open: previous_close,
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

fn classify_error(symbol: &str, error: &str) -> MarketDataError {
    let lowered = error.to_ascii_lowercase();
    if lowered.contains("run out of searches") || lowered.contains("plan limit") {
        MarketDataError::QuotaExhausted {
            provider: PROVIDER_ID.to_string(),
        }
    } else if lowered.contains("invalid api key") {
        MarketDataError::NotConfigured {
            provider: PROVIDER_ID.to_string(),
        }
    } else if lowered.contains("hasn't returned any results") || lowered.contains("no results") {
        MarketDataError::NoData {
            provider: PROVIDER_ID.to_string(),
            symbol: symbol.to_string(),
        }
    } else {
        MarketDataError::MalformedResponse {
            provider: PROVIDER_ID.to_string(),
            message: error.to_string(),
        }
    }
}

/// Last graph points as flat candles with an estimated ±1% range.
fn graph_candles(points: &[GraphPoint], timeframe: Timeframe, now: DateTime<Utc>) -> Vec<Candle> {
    let one_pct = Decimal::new(1, 2);
    let tail = &points[points.len().saturating_sub(MAX_GRAPH_CANDLES)..];
    let interval = chrono::Duration::minutes(timeframe.synthetic_profile().interval_minutes);
    let n = tail.len();

    let mut candles: Vec<Candle> = tail
        .iter()
        .enumerate()
        .filter_map(|(i, point)| {
            let price = point.price.as_ref().and_then(parse_money)?;
            if price <= Decimal::ZERO {
                return None;
            }
            let time = point
                .date
                .as_deref()
                .and_then(parse_graph_date)
                .unwrap_or_else(|| now - interval * (n - 1 - i) as i32);
            Some(Candle::new(
                time,
                price,
                (price * (Decimal::ONE + one_pct)).round_dp(2),
                (price * (Decimal::ONE - one_pct)).round_dp(2),
                price,
                point.volume.unwrap_or(0),
            ))
        })
        .collect();
    candles.sort_by_key(|c| c.time);
    candles
}

/// Graph dates look like `"Jul 09 2024, 09:30 AM UTC-04:00"`.
fn parse_graph_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some((local, offset)) = raw.rsplit_once(" UTC") {
        let with_offset = format!("{} {}", local, offset);
        if let Ok(dt) = DateTime::parse_from_str(&with_offset, "%b %d %Y, %I:%M %p %:z") {
            return Some(dt.with_timezone(&Utc));
        }
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Accept `"$1,234.56"`, `"3.42"` or a bare JSON number.
fn parse_money(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => {
            let cleaned: String = s.chars().filter(|c| !matches!(c, '$' | ',' | ' ')).collect();
            Decimal::from_str(&cleaned).ok()
        }
        _ => None,
    }
}
