//! Quote data validation.
//!
//! Runs on every quote an adapter returns, before the fetcher hands it out:
//! - Hard checks reject the quote and the chain moves to the next provider
//!   (no usable price, negative fields, day high below day low).
//! - Soft checks repair and warn: crossed bid/ask is dropped, candles that
//!   break the OHLC invariant are removed, candles are put in time order.

use log::warn;
use rust_decimal::Decimal;

use crate::errors::MarketDataError;
use crate::models::{Candle, Quote};

/// Validation severity levels.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationSeverity {
    /// Hard failure - reject quote, try next provider.
    Hard,
    /// Soft warning - repair the quote and log a warning.
    Soft,
}

/// Validation result details.
#[derive(Clone, Debug)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    pub message: String,
}

/// Quote validator configuration.
#[derive(Clone, Debug)]
pub struct ValidatorConfig {
    /// Maximum allowed price value (sanity check).
    pub max_price: Option<Decimal>,
    /// Whether to warn on zero volume.
    pub warn_on_zero_volume: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_price: Some(Decimal::from(1_000_000_000i64)),
            warn_on_zero_volume: false,
        }
    }
}

/// Quote data validator.
#[derive(Clone, Debug, Default)]
pub struct QuoteValidator {
    config: ValidatorConfig,
}

impl QuoteValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate and normalize a quote.
    ///
    /// Returns the quote with soft issues repaired, or `ValidationFailed` with
    /// every hard issue joined by `"; "`.
    pub fn validate(&self, quote: Quote) -> Result<Quote, MarketDataError> {
        let mut issues: Vec<ValidationIssue> = Vec::new();

        self.validate_prices(&quote, &mut issues);
        self.validate_day_range(&quote, &mut issues);

        let errors: Vec<_> = issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Hard)
            .map(|i| i.message.as_str())
            .collect();
        if !errors.is_empty() {
            return Err(MarketDataError::ValidationFailed {
                message: format!("{} from {}: {}", quote.symbol, quote.source, errors.join("; ")),
            });
        }

        let quote = self.repair(quote, &mut issues);

        for issue in issues.iter().filter(|i| i.severity == ValidationSeverity::Soft) {
            warn!(
                "Quote validation warning for {} from {}: {}",
                quote.symbol, quote.source, issue.message
            );
        }

        Ok(quote)
    }

    fn validate_prices(&self, quote: &Quote, issues: &mut Vec<ValidationIssue>) {
        if quote.price <= Decimal::ZERO {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Hard,
                message: format!("No usable current price: {}", quote.price),
            });
        }

        let fields = [
            ("previousClose", quote.previous_close),
            ("open", quote.open),
            ("dayHigh", quote.day_high),
            ("dayLow", quote.day_low),
        ];
        for (name, value) in fields {
            if value.is_sign_negative() && !value.is_zero() {
                issues.push(ValidationIssue {
                    severity: ValidationSeverity::Hard,
                    message: format!("Negative {}: {}", name, value),
                });
            }
        }

        if let Some(max_price) = self.config.max_price {
            if quote.price > max_price {
                issues.push(ValidationIssue {
                    severity: ValidationSeverity::Hard,
                    message: format!("Price {} exceeds sanity limit {}", quote.price, max_price),
                });
            }
        }

        if self.config.warn_on_zero_volume && quote.volume == 0 {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Soft,
                message: "Zero volume (market may be closed)".to_string(),
            });
        }
    }

    fn validate_day_range(&self, quote: &Quote, issues: &mut Vec<ValidationIssue>) {
        if quote.day_high < quote.day_low {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Hard,
                message: format!(
                    "Day high ({}) is less than day low ({})",
                    quote.day_high, quote.day_low
                ),
            });
        }
    }

    fn repair(&self, mut quote: Quote, issues: &mut Vec<ValidationIssue>) -> Quote {
        if let (Some(bid), Some(ask)) = (quote.bid, quote.ask) {
            if ask < bid {
                issues.push(ValidationIssue {
                    severity: ValidationSeverity::Soft,
                    message: format!("Crossed market (bid {} > ask {}), dropping both", bid, ask),
                });
                quote.bid = None;
                quote.ask = None;
            }
        }

        let before = quote.candles.len();
        let mut candles: Vec<Candle> = quote
            .candles
            .into_iter()
            .filter(Candle::is_consistent)
            .collect();
        if candles.len() < before {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Soft,
                message: format!(
                    "Dropped {} candle(s) violating low <= open/close <= high",
                    before - candles.len()
                ),
            });
        }
        candles.sort_by_key(|c| c.time);
        quote.candles = candles;
        quote
    }
}
