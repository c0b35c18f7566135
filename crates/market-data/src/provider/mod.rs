//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that every tier implements
//! - Per-provider budget and cooldown policy
//! - The four tiers of the failover chain, in their usual order:
//!   brokerage, SerpAPI, Alpha Vantage, Massive
//! - Synthetic candle generation for tiers that only return a quote
//!
//! Providers are blocking and stateless apart from their HTTP client; budgets
//! and lockouts live in the fetcher.

mod http;
mod policy;
mod traits;

pub mod alpha_vantage;
pub mod brokerage;
pub mod massive;
pub mod serpapi;
pub mod synthetic;

pub use http::DEFAULT_REQUEST_TIMEOUT;
pub use policy::{ProviderPolicy, DEFAULT_LOCKOUT_SECS};
pub use traits::MarketDataProvider;

pub use alpha_vantage::AlphaVantageProvider;
pub use brokerage::BrokerageProvider;
pub use massive::MassiveProvider;
pub use serpapi::SerpApiProvider;
