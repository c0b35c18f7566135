//! Trading module - sizing, daily limits, brackets, trailing stops and the
//! order desk that sends them through the brokerage session.

mod daily_limits;
mod order_desk;
mod trading_model;
mod trailing_stop;

pub use daily_limits::{DailyTradeLimiter, DailyTradeStatus};
pub use order_desk::{LiquidationReport, OrderDesk};
pub use trading_model::{BracketPlan, RiskTolerance, MAX_POSITION_SHARES};
pub use trailing_stop::{StopUpdate, TrailingStop};
