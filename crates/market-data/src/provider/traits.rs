//! Market data provider trait definitions.
//!
//! This module defines the `MarketDataProvider` trait that every tier of the
//! failover chain implements.

use crate::errors::MarketDataError;
use crate::models::{Quote, Timeframe};

use super::policy::ProviderPolicy;

/// Trait for market data providers.
///
/// Implementations are blocking: `fetch` performs at most one round of network
/// calls bounded by the provider's own request timeout, and never retries in
/// place. The fetcher decides what happens after a failure.
///
/// # Example
///
/// ```ignore
/// use daytrader_market_data::provider::{MarketDataProvider, ProviderPolicy};
///
/// struct MyProvider {
///     api_key: String,
/// }
///
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn policy(&self) -> ProviderPolicy {
///         ProviderPolicy::daily(100)
///     }
///
///     fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<Quote, MarketDataError> {
///         // ... call the API and normalize
///     }
/// }
/// ```
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "SERPAPI", "ALPHA_VANTAGE", etc.
    /// Used for logging, budget tracking and as the quote's `source`.
    fn id(&self) -> &'static str;

    /// Call budget and cooldown.
    fn policy(&self) -> ProviderPolicy {
        ProviderPolicy::default()
    }

    /// Fetch a normalized quote with candles for `timeframe`.
    ///
    /// `symbol` is already trimmed and uppercased.
    fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<Quote, MarketDataError>;
}
