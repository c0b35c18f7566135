//! Shared fakes for the core integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::America::New_York;
use daytrader_core::scanner::QuoteSource;
use daytrader_market_data::broker::{
    BrokerBar, BrokerGateway, BrokerTick, Contract, GatewayError, HistoryRequest,
};
use daytrader_market_data::{
    BracketOrder, BrokerPosition, FetchDiagnostics, FetchOutcome, OrderAck, ProviderId, Quote,
    Timeframe,
};
use rust_decimal::Decimal;

pub fn eastern(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    New_York
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn quote(symbol: &str, price: Decimal, previous_close: Decimal, volume: u64, average: u64) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        price,
        previous_close,
        open: previous_close,
        day_high: price.max(previous_close),
        day_low: price.min(previous_close),
        volume,
        average_volume: average,
        bid: None,
        ask: None,
        float_shares: None,
        candles: Vec::new(),
        source: ProviderId::Borrowed("FAKE"),
        is_real_data: true,
    }
}

// =============================================================================
// Quote source
// =============================================================================

#[derive(Default)]
pub struct FakeQuotes {
    quotes: Mutex<HashMap<String, Quote>>,
    pub requested: Mutex<Vec<String>>,
}

impl FakeQuotes {
    pub fn with(quotes: Vec<Quote>) -> Arc<Self> {
        let source = Self::default();
        {
            let mut map = source.quotes.lock().unwrap();
            for q in quotes {
                map.insert(q.symbol.clone(), q);
            }
        }
        Arc::new(source)
    }
}

impl QuoteSource for FakeQuotes {
    fn fetch(&self, symbol: &str, _timeframe: Timeframe) -> FetchOutcome {
        self.requested.lock().unwrap().push(symbol.to_string());
        match self.quotes.lock().unwrap().get(symbol) {
            Some(q) => FetchOutcome::Available(q.clone()),
            None => FetchOutcome::Unavailable(FetchDiagnostics::new()),
        }
    }
}

// =============================================================================
// Brokerage gateway
// =============================================================================

#[derive(Default)]
pub struct BrokerLog {
    pub placed: Vec<BracketOrder>,
    pub stop_moves: Vec<(i64, Decimal)>,
    pub positions: Vec<BrokerPosition>,
    pub reject_orders: bool,
    /// Orders for these symbols are rejected
    pub reject_symbols: Vec<String>,
    /// Broker round-trip time for order placement
    pub place_delay: Duration,
}

pub struct FakeBroker {
    log: Arc<Mutex<BrokerLog>>,
    connected: bool,
}

impl FakeBroker {
    pub fn new() -> (Box<dyn BrokerGateway>, Arc<Mutex<BrokerLog>>) {
        let log = Arc::new(Mutex::new(BrokerLog::default()));
        (
            Box::new(Self {
                log: Arc::clone(&log),
                connected: false,
            }),
            log,
        )
    }
}

impl BrokerGateway for FakeBroker {
    fn connect(&mut self, _host: &str, _port: u16, _client_id: u32) -> Result<(), GatewayError> {
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn request_history(
        &mut self,
        _contract: &Contract,
        _request: &HistoryRequest,
    ) -> Result<Vec<BrokerBar>, GatewayError> {
        Ok(Vec::new())
    }

    fn request_quote(&mut self, _contract: &Contract) -> Result<Option<BrokerTick>, GatewayError> {
        Ok(None)
    }

    fn place_bracket(&mut self, order: &BracketOrder) -> Result<OrderAck, GatewayError> {
        let delay = self.log.lock().unwrap().place_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let mut log = self.log.lock().unwrap();
        if log.reject_orders || log.reject_symbols.contains(&order.symbol) {
            return Err(GatewayError::Other {
                code: Some(201),
                message: "Order rejected".to_string(),
            });
        }
        log.placed.push(order.clone());
        let order_id = 100 + log.placed.len() as i64;
        Ok(OrderAck {
            order_id,
            stop_order_id: order.stop_loss.map(|_| order_id + 1000),
            status: "Submitted".to_string(),
        })
    }

    fn modify_stop(&mut self, order_id: i64, stop_price: Decimal) -> Result<(), GatewayError> {
        self.log.lock().unwrap().stop_moves.push((order_id, stop_price));
        Ok(())
    }

    fn open_positions(&mut self) -> Result<Vec<BrokerPosition>, GatewayError> {
        Ok(self.log.lock().unwrap().positions.clone())
    }
}
