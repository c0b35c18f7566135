//! Alpha Vantage provider.
//!
//! Tertiary tier. Uses the `GLOBAL_QUOTE` endpoint only; intraday series would
//! burn the free allowance (25 requests a day), so candles are synthesized
//! around the real quote.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, warn};
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::http::{build_client, get_text, parse_json, DEFAULT_REQUEST_TIMEOUT};
use super::synthetic::synthesize_candles;
use super::{MarketDataProvider, ProviderPolicy};
use crate::errors::MarketDataError;
use crate::models::{ProviderId, Quote, Timeframe};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_ID: &str = "ALPHA_VANTAGE";

/// Free plan daily allowance.
pub const DEFAULT_DAILY_LIMIT: u32 = 25;

#[derive(Debug, Deserialize)]
pub(crate) struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote", default)]
    pub global_quote: Option<HashMap<String, String>>,
    #[serde(rename = "Error Message", default)]
    pub error_message: Option<String>,
    #[serde(rename = "Note", default)]
    pub note: Option<String>,
    #[serde(rename = "Information", default)]
    pub information: Option<String>,
}

pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
    policy: ProviderPolicy,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_options(
            api_key,
            ProviderPolicy::daily(DEFAULT_DAILY_LIMIT),
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

impl MarketDataProvider for AlphaVantageProvider {
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

        let params = [
            ("function", "GLOBAL_QUOTE"),
            ("symbol", symbol),
            ("apikey", self.api_key.as_str()),
        ];
        let body = get_text(&self.client, PROVIDER_ID, BASE_URL, &params)?;
        let response: GlobalQuoteResponse = parse_json(PROVIDER_ID, &body)?;
        let quote = build_quote(symbol, timeframe, response, Utc::now(), &mut rand::thread_rng())?;
        info!("Fetched {} from Alpha Vantage: ${}", symbol, quote.price);
        Ok(quote)
    }
}

/// Alpha Vantage reports throttling inside a 200 response.
fn check_api_error(response: &GlobalQuoteResponse) -> Result<(), MarketDataError> {
    if let Some(msg) = &response.error_message {
        return Err(MarketDataError::MalformedResponse {
            provider: PROVIDER_ID.to_string(),
            message: msg.clone(),
        });
    }

    for msg in [&response.note, &response.information].into_iter().flatten() {
        let lowered = msg.to_ascii_lowercase();
        if lowered.contains("requests per day") || lowered.contains("premium") {
            return Err(MarketDataError::QuotaExhausted {
                provider: PROVIDER_ID.to_string(),
            });
        }
        if lowered.contains("api call frequency") || lowered.contains("rate limit") {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }
        warn!("Alpha Vantage note: {}", msg);
    }

    Ok(())
}

pub(crate) fn build_quote<R: rand::Rng + ?Sized>(
    symbol: &str,
    timeframe: Timeframe,
    response: GlobalQuoteResponse,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Quote, MarketDataError> {
    check_api_error(&response)?;

    let fields = match response.global_quote {
        Some(fields) if !fields.is_empty() => fields,
        _ => {
            return Err(MarketDataError::NoData {
                provider: PROVIDER_ID.to_string(),
                symbol: symbol.to_string(),
            })
        }
    };

    let field = |key: &str| fields.get(key).and_then(|v| Decimal::from_str(v.trim()).ok());

    let price = field("05. price")
        .filter(|p| *p > Decimal::ZERO)
        .ok_or_else(|| MarketDataError::MalformedResponse {
            provider: PROVIDER_ID.to_string(),
            message: format!("No usable price for {}", symbol),
        })?
        .round_dp(2);
    let previous_close = field("08. previous close").unwrap_or(price).round_dp(2);
    let open = field("02. open").unwrap_or(price).round_dp(2);
    let day_high = field("03. high").unwrap_or(price).round_dp(2);
    let day_low = field("04. low").unwrap_or(price).round_dp(2);
    let volume = fields
        .get("06. volume")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);

    let candles = synthesize_candles(previous_close, price, timeframe, now, rng);

    Ok(Quote {
        symbol: symbol.to_string(),
        price,
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 9, 15, 0, 0).unwrap()
    }

    fn build(json: &str) -> Result<Quote, MarketDataError> {
        let response: GlobalQuoteResponse = serde_json::from_str(json).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        build_quote("PLTR", Timeframe::FifteenMinutes, response, now(), &mut rng)
    }

    #[test]
    fn test_global_quote_parsing() {
        let quote = build(
            r#"{
                "Global Quote": {
                    "01. symbol": "PLTR",
                    "02. open": "3.3000",
                    "03. high": "3.5000",
                    "04. low": "3.2500",
                    "05. price": "3.4200",
                    "06. volume": "18250000",
                    "07. latest trading day": "2024-07-09",
                    "08. previous close": "3.1000",
                    "09. change": "0.3200",
                    "10. change percent": "10.3226%"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(quote.price, dec!(3.42));
        assert_eq!(quote.previous_close, dec!(3.10));
        assert_eq!(quote.open, dec!(3.30));
        assert_eq!(quote.day_high, dec!(3.50));
        assert_eq!(quote.day_low, dec!(3.25));
        assert_eq!(quote.volume, 18_250_000);
        assert_eq!(quote.source, "ALPHA_VANTAGE");
        assert!(!quote.is_real_data);
        assert_eq!(quote.candles.len(), 60);
        assert_eq!(quote.candles.last().unwrap().close, dec!(3.42));
    }

    #[test]
    fn test_empty_global_quote_is_no_data() {
        let err = build(r#"{"Global Quote": {}}"#).unwrap_err();
        assert!(matches!(err, MarketDataError::NoData { .. }));
        let err = build(r#"{}"#).unwrap_err();
        assert!(matches!(err, MarketDataError::NoData { .. }));
    }

    #[test]
    fn test_daily_allowance_message_is_quota() {
        let err = build(
            r#"{"Information": "We have detected your API key as XYZ and our standard API rate limit is 25 requests per day."}"#,
        )
        .unwrap_err();
        assert!(matches!(err, MarketDataError::QuotaExhausted { .. }));
    }

    #[test]
    fn test_frequency_note_is_rate_limit() {
        let err = build(
            r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#,
        )
        .unwrap_err();
        assert!(matches!(err, MarketDataError::RateLimited { .. }));
    }

    #[test]
    fn test_error_message_is_malformed() {
        let err = build(r#"{"Error Message": "Invalid API call."}"#).unwrap_err();
        assert!(matches!(err, MarketDataError::MalformedResponse { .. }));
    }
}
