//! Market data models
//!
//! - `types` - Type aliases for identifiers (ProviderId, Symbol)
//! - `quote` - Normalized quote and candle structures
//! - `timeframe` - Supported chart timeframes and their per-source parameters
//! - `session` - US/Eastern market session classification

mod quote;
mod session;
mod timeframe;
mod types;

pub use quote::{Candle, Quote};
pub use session::{eastern_date, in_liquidation_window, to_eastern, MarketSession};
pub use timeframe::{BarSpec, SyntheticProfile, Timeframe};
pub use types::{normalize_symbol, ProviderId, Symbol};
