use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::ProviderId;

/// One OHLCV bar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

impl Candle {
    pub fn new(
        time: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: u64,
    ) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// `low <= min(open, close) <= max(open, close) <= high`, all non-negative.
    pub fn is_consistent(&self) -> bool {
        let body_low = self.open.min(self.close);
        let body_high = self.open.max(self.close);
        !self.low.is_sign_negative() && self.low <= body_low && body_high <= self.high
    }
}

/// Normalized quote returned by every provider tier.
///
/// Built fresh for each fetch and handed out by value; nothing downstream
/// mutates it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Uppercase ticker
    pub symbol: String,

    /// Last traded / current price
    pub price: Decimal,

    pub previous_close: Decimal,
    pub open: Decimal,
    pub day_high: Decimal,
    pub day_low: Decimal,

    pub volume: u64,

    /// Zero when the provider does not report it
    pub average_volume: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask: Option<Decimal>,

    /// Shares available for trading, when the provider knows it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub float_shares: Option<u64>,

    /// Oldest first
    pub candles: Vec<Candle>,

    /// Provider that produced this quote
    pub source: ProviderId,

    /// False when the candles were synthesized around a real price
    pub is_real_data: bool,
}

impl Quote {
    /// Absolute move since the previous close.
    pub fn change(&self) -> Decimal {
        self.price - self.previous_close
    }

    /// Percentage move since the previous close, zero if the close is unknown.
    pub fn change_percent(&self) -> Decimal {
        if self.previous_close.is_zero() {
            return Decimal::ZERO;
        }
        (self.change() / self.previous_close * Decimal::ONE_HUNDRED).round_dp(2)
    }

    /// RVOL: current volume over average volume.
    pub fn relative_volume(&self) -> Option<Decimal> {
        if self.average_volume == 0 {
            return None;
        }
        let ratio = Decimal::from(self.volume) / Decimal::from(self.average_volume);
        Some(ratio.round_dp(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sample_quote() -> Quote {
        Quote {
            symbol: "SOFI".to_string(),
            price: dec!(3.42),
            previous_close: dec!(3.00),
            open: dec!(3.05),
            day_high: dec!(3.50),
            day_low: dec!(2.98),
            volume: 4_000_000,
            average_volume: 1_000_000,
            bid: None,
            ask: None,
            float_shares: None,
            candles: vec![],
            source: "ALPHA_VANTAGE".into(),
            is_real_data: true,
        }
    }

    #[test]
    fn test_candle_consistency() {
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap();
        assert!(Candle::new(t, dec!(10), dec!(11), dec!(9), dec!(10.5), 100).is_consistent());
        // High below the close
        assert!(!Candle::new(t, dec!(10), dec!(10.2), dec!(9), dec!(10.5), 100).is_consistent());
        // Low above the open
        assert!(!Candle::new(t, dec!(10), dec!(11), dec!(10.1), dec!(10.5), 100).is_consistent());
        assert!(!Candle::new(t, dec!(0), dec!(1), dec!(-1), dec!(0.5), 0).is_consistent());
    }

    #[test]
    fn test_change_percent_and_rvol() {
        let quote = sample_quote();
        assert_eq!(quote.change(), dec!(0.42));
        assert_eq!(quote.change_percent(), dec!(14.00));
        assert_eq!(quote.relative_volume(), Some(dec!(4)));
    }

    #[test]
    fn test_unknown_baselines() {
        let mut quote = sample_quote();
        quote.previous_close = Decimal::ZERO;
        quote.average_volume = 0;
        assert_eq!(quote.change_percent(), Decimal::ZERO);
        assert_eq!(quote.relative_volume(), None);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(sample_quote()).unwrap();
        assert!(json.get("previousClose").is_some());
        assert!(json.get("isRealData").is_some());
        assert!(json.get("bid").is_none());
        assert_eq!(json["source"], "ALPHA_VANTAGE");
    }
}
