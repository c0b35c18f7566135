//! Scanner module - filters the active symbol pool into ranked movers.

mod active_symbols;
mod scan_delay;
mod scanner_model;
mod scanner_service;
mod scanner_traits;

pub use active_symbols::ActiveSymbolSet;
pub use scan_delay::{ScanDelay, MAX_SCAN_DELAY};
pub use scanner_model::{ScanCriteria, ScanHit, ScanReport, Signal};
pub use scanner_service::StockScanner;
pub use scanner_traits::QuoteSource;
