//! Error types for the trading side.
//!
//! Scanner operations never fail: an unavailable symbol is simply omitted.
//! Everything that reaches the broker goes through [`TradingError`].

use chrono::NaiveDate;
use daytrader_market_data::{MarketDataError, OrderSide};
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, TradingError>;

#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Daily {side} limit already used for {date}")]
    DailyLimitReached { date: NaiveDate, side: OrderSide },

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("No trailing stop registered for order {0}")]
    UnknownOrder(i64),

    #[error("Broker operation failed: {0}")]
    Broker(#[from] MarketDataError),
}
