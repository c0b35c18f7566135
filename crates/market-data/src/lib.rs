//! Day-trading market data crate
//!
//! Fetches a normalized quote with OHLCV candles for a symbol by walking a
//! fixed-priority chain of providers, each with its own failure modes and
//! recovery timers.
//!
//! # Architecture
//!
//! ```text
//! caller
//!   |
//!   v
//! +------------------+    per provider: RateBudget + LockoutTimer (one mutex)
//! | FailoverFetcher  | ----------------------------------------------------+
//! +------------------+                                                     |
//!   |  priority order, skip locked / exhausted                             |
//!   v                                                                      |
//! +-----------+   +---------+   +---------------+   +---------+            |
//! | BROKERAGE |-->| SERPAPI |-->| ALPHA_VANTAGE |-->| MASSIVE |  <---------+
//! +-----------+   +---------+   +---------------+   +---------+
//!   |
//!   v
//! ConnectionSupervisor (single session, client-id conflict retry, liveness)
//! ```
//!
//! The first provider that returns a quote passing validation wins. When all
//! are skipped or fail, the caller gets [`FetchOutcome::Unavailable`] with
//! per-provider [`FetchDiagnostics`] instead of an error.
//!
//! # Core Types
//!
//! - [`FailoverFetcher`] - Orchestrates the chain
//! - [`MarketDataProvider`] - One tier of the chain
//! - [`RateBudget`] / [`LockoutTimer`] - Per-provider gating state
//! - [`ConnectionSupervisor`] - Owner of the brokerage session
//! - [`Quote`] / [`Candle`] - Normalized output
//! - [`Timeframe`] - Supported chart timeframes
//! - [`Clock`] - Injectable time source

pub mod broker;
pub mod clock;
pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

pub use broker::{
    BracketOrder, BrokerGateway, BrokerPosition, BrokerSettings, ConnectionState,
    ConnectionSupervisor, EntryKind, GatewayError, OrderAck, OrderSide,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{FailureKind, MarketDataError, RetryClass};
pub use models::{Candle, MarketSession, ProviderId, Quote, Timeframe};
pub use provider::{
    AlphaVantageProvider, BrokerageProvider, MarketDataProvider, MassiveProvider, ProviderPolicy,
    SerpApiProvider,
};
pub use registry::{
    BudgetWindow, FailoverFetcher, FetchDiagnostics, FetchOutcome, LockoutTimer, ProviderStatus,
    QuoteValidator, RateBudget, SkipReason,
};
