//! Error types and failover classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for provider and session failures
//! - [`FailureKind`]: The coarse taxonomy shown in logs and diagnostics
//! - [`RetryClass`]: Whether a failure also locks the provider out

mod retry;

pub use retry::{FailureKind, RetryClass};

use thiserror::Error;

use crate::broker::GatewayError;

/// Errors that can occur during market data operations.
///
/// Each variant maps to a [`FailureKind`] via [`kind`](Self::kind) and to a
/// [`RetryClass`] via [`retry_class`](Self::retry_class). The failover fetcher
/// never surfaces these to its callers; they end up in [`FetchDiagnostics`].
///
/// [`FetchDiagnostics`]: crate::registry::FetchDiagnostics
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The provider has no credentials or no session to work with.
    #[error("Provider not configured: {provider}")]
    NotConfigured {
        /// The provider missing configuration
        provider: String,
    },

    /// The provider reported its daily or monthly allowance as used up.
    #[error("Quota exhausted: {provider}")]
    QuotaExhausted {
        /// The provider whose quota ran out
        provider: String,
    },

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// Connection refused, DNS failure or any other transport problem.
    #[error("Provider unreachable: {provider} - {message}")]
    Unreachable {
        /// The provider that could not be reached
        provider: String,
        /// Transport error detail
        message: String,
    },

    /// The provider answered with a non-success status other than 429.
    #[error("HTTP {status} from {provider}")]
    HttpStatus {
        /// The provider that answered
        provider: String,
        /// Response status code
        status: u16,
    },

    /// The payload could not be parsed or lacked a usable current price.
    #[error("Malformed response from {provider}: {message}")]
    MalformedResponse {
        /// The provider that returned the payload
        provider: String,
        /// What was wrong with it
        message: String,
    },

    /// The provider answered but had nothing for this symbol.
    #[error("No data from {provider} for {symbol}")]
    NoData {
        /// The provider that returned nothing
        provider: String,
        /// The requested symbol
        symbol: String,
    },

    /// Data validation failed.
    /// The provider returned a quote that breaks a hard invariant.
    #[error("Validation failed: {message}")]
    ValidationFailed {
        /// Description of the validation failure
        message: String,
    },

    /// Every client id tried during one connect sequence was taken.
    #[error("Brokerage connect gave up after {attempts} attempts (client ids {tried:?})")]
    ClientIdsExhausted {
        /// Number of connect attempts made
        attempts: u32,
        /// Client ids tried, in ascending order
        tried: Vec<u32>,
    },

    /// The brokerage session dropped while a request was in flight.
    #[error("Brokerage connection lost")]
    ConnectionLost,

    /// Transport-level failure reported by the broker gateway.
    #[error("Brokerage gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The timeframe label is not one of the supported values.
    #[error("Invalid timeframe: {0}")]
    InvalidTimeframe(String),
}

impl MarketDataError {
    /// Returns the failure kind recorded in diagnostics.
    ///
    /// Transport variants (timeouts, HTTP errors, broker session trouble) all
    /// collapse to [`FailureKind::Unreachable`].
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotConfigured { .. } => FailureKind::NotConfigured,
            Self::QuotaExhausted { .. } => FailureKind::QuotaExhausted,
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::Timeout { .. }
            | Self::Unreachable { .. }
            | Self::HttpStatus { .. }
            | Self::ClientIdsExhausted { .. }
            | Self::ConnectionLost
            | Self::Gateway(_) => FailureKind::Unreachable,
            Self::MalformedResponse { .. }
            | Self::ValidationFailed { .. }
            | Self::InvalidTimeframe(_) => FailureKind::MalformedResponse,
            Self::NoData { .. } => FailureKind::NoData,
        }
    }

    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use daytrader_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::RateLimited { provider: "SERPAPI".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::FailoverWithLockout);
    ///
    /// let error = MarketDataError::NoData {
    ///     provider: "SERPAPI".to_string(),
    ///     symbol: "XYZ".to_string(),
    /// };
    /// assert_eq!(error.retry_class(), RetryClass::NextProvider);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self.kind() {
            FailureKind::RateLimited | FailureKind::QuotaExhausted => {
                RetryClass::FailoverWithLockout
            }
            _ => RetryClass::NextProvider,
        }
    }
}
