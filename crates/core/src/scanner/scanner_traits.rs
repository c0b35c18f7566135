use daytrader_market_data::{FailoverFetcher, FetchOutcome, Timeframe};

/// Where the scanner gets its quotes.
pub trait QuoteSource: Send + Sync {
    fn fetch(&self, symbol: &str, timeframe: Timeframe) -> FetchOutcome;
}

impl QuoteSource for FailoverFetcher {
    fn fetch(&self, symbol: &str, timeframe: Timeframe) -> FetchOutcome {
        FailoverFetcher::fetch(self, symbol, timeframe)
    }
}
