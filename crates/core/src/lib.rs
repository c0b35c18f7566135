//! Day-trading core - scanner and trading contracts.
//!
//! Builds on the market-data failover chain:
//! - `scanner` filters a pool of symbols into ranked hits
//! - `trading` sizes positions, enforces the daily trade limit, turns
//!   percentages into bracket orders and manages trailing stops and the
//!   end-of-day flatten

pub mod errors;
pub mod scanner;
pub mod trading;

pub use errors::{Result, TradingError};
