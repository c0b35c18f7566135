//! Scanner domain models.

use daytrader_market_data::{Quote, Timeframe};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Filter settings for one scan pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanCriteria {
    pub min_price: Decimal,
    pub max_price: Decimal,
    /// Disabled when `None`. A quote with unknown float always passes.
    pub max_float: Option<u64>,
    pub min_gain_percent: Decimal,
    /// Required multiple of average volume. Passes when the average is unknown.
    pub volume_multiplier: Decimal,
    pub timeframe: Timeframe,
    pub display_count: usize,
    pub max_symbols: usize,
}

impl Default for ScanCriteria {
    fn default() -> Self {
        Self {
            min_price: dec!(1.0),
            max_price: dec!(6.0),
            max_float: None,
            min_gain_percent: dec!(10),
            volume_multiplier: dec!(4),
            timeframe: Timeframe::FiveMinutes,
            display_count: 5,
            max_symbols: 50,
        }
    }
}

impl ScanCriteria {
    pub fn price_in_range(&self, quote: &Quote) -> bool {
        self.min_price <= quote.price && quote.price <= self.max_price
    }

    pub fn float_ok(&self, quote: &Quote) -> bool {
        match (self.max_float, quote.float_shares) {
            (Some(max), Some(float)) => float <= max,
            _ => true,
        }
    }

    pub fn gain_ok(&self, quote: &Quote) -> bool {
        quote.change_percent() >= self.min_gain_percent
    }

    pub fn volume_ok(&self, quote: &Quote) -> bool {
        if quote.average_volume == 0 {
            return true;
        }
        Decimal::from(quote.volume) >= Decimal::from(quote.average_volume) * self.volume_multiplier
    }

    pub fn matches(&self, quote: &Quote) -> bool {
        self.price_in_range(quote) && self.float_ok(quote) && self.gain_ok(quote) && self.volume_ok(quote)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// BUY on a strong gain with volume above 3x average, SELL below -5%.
    pub fn for_quote(quote: &Quote) -> Self {
        let gain = quote.change_percent();
        let heavy_volume = quote.average_volume == 0
            || Decimal::from(quote.volume) > Decimal::from(quote.average_volume) * dec!(3);
        if gain > dec!(15) && heavy_volume {
            Signal::Buy
        } else if gain < dec!(-5) {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

/// A quote that passed every filter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanHit {
    pub quote: Quote,
    pub change_percent: Decimal,
    pub relative_volume: Option<Decimal>,
    pub signal: Signal,
    /// Volume above 5x a known average
    pub is_hot: bool,
}

impl ScanHit {
    pub fn from_quote(quote: Quote) -> Self {
        let is_hot = quote.average_volume > 0
            && Decimal::from(quote.volume) > Decimal::from(quote.average_volume) * dec!(5);
        Self {
            change_percent: quote.change_percent(),
            relative_volume: quote.relative_volume(),
            signal: Signal::for_quote(&quote),
            is_hot,
            quote,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.quote.symbol
    }
}

/// Outcome of one scan pass.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// Best movers first, at most `display_count`
    pub hits: Vec<ScanHit>,
    /// Qualifying symbols that were not in the active set before
    pub newly_added: Vec<String>,
    /// Symbols no provider could answer for
    pub unavailable: Vec<String>,
    pub scanned: usize,
}
