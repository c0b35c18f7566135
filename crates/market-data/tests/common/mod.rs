//! Shared fakes for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use daytrader_market_data::broker::{
    BracketOrder, BrokerBar, BrokerGateway, BrokerPosition, BrokerSettings, BrokerTick, Contract,
    GatewayError, HistoryRequest, OrderAck,
};
use daytrader_market_data::provider::synthetic::synthesize_candles;
use daytrader_market_data::{
    MarketDataError, MarketDataProvider, ProviderId, ProviderPolicy, Quote, Timeframe,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Tuesday 2024-07-09 11:00 Eastern.
pub fn market_open() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 9, 15, 0, 0).unwrap()
}

// =============================================================================
// Providers
// =============================================================================

pub enum Behavior {
    Healthy { price: Decimal, synthetic: bool },
    Fail(fn(&'static str) -> MarketDataError),
}

/// Provider double that counts its calls.
pub struct FakeProvider {
    pub id: &'static str,
    pub policy: ProviderPolicy,
    pub behavior: Mutex<Behavior>,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn healthy(id: &'static str) -> Arc<Self> {
        Self::build(
            id,
            ProviderPolicy::unlimited(),
            Behavior::Healthy {
                price: dec!(5.00),
                synthetic: false,
            },
        )
    }

    pub fn synthetic(id: &'static str, price: Decimal) -> Arc<Self> {
        Self::build(
            id,
            ProviderPolicy::unlimited(),
            Behavior::Healthy {
                price,
                synthetic: true,
            },
        )
    }

    pub fn failing(id: &'static str, fail: fn(&'static str) -> MarketDataError) -> Arc<Self> {
        Self::build(id, ProviderPolicy::unlimited(), Behavior::Fail(fail))
    }

    pub fn build(id: &'static str, policy: ProviderPolicy, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            id,
            policy,
            behavior: Mutex::new(behavior),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MarketDataProvider for FakeProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    fn policy(&self) -> ProviderPolicy {
        self.policy.clone()
    }

    fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<Quote, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (price, synthetic) = match &*self.behavior.lock().unwrap() {
            Behavior::Fail(fail) => return Err(fail(self.id)),
            Behavior::Healthy { price, synthetic } => (*price, *synthetic),
        };

        let previous_close = (price * dec!(0.9)).round_dp(2);
        let candles = if synthetic {
            let mut rng = StdRng::seed_from_u64(3);
            synthesize_candles(previous_close, price, timeframe, market_open(), &mut rng)
        } else {
            Vec::new()
        };

        Ok(Quote {
            symbol: symbol.to_string(),
            price,
            previous_close,
            open: previous_close,
            day_high: price,
            day_low: previous_close,
            volume: 1_000_000,
            average_volume: 0,
            bid: None,
            ask: None,
            float_shares: None,
            candles,
            source: ProviderId::Borrowed(self.id),
            is_real_data: !synthetic,
        })
    }
}

pub fn unreachable(provider: &'static str) -> MarketDataError {
    MarketDataError::Unreachable {
        provider: provider.to_string(),
        message: "connection refused".to_string(),
    }
}

pub fn rate_limited(provider: &'static str) -> MarketDataError {
    MarketDataError::RateLimited {
        provider: provider.to_string(),
    }
}

pub fn quota_exhausted(provider: &'static str) -> MarketDataError {
    MarketDataError::QuotaExhausted {
        provider: provider.to_string(),
    }
}

// =============================================================================
// Brokerage gateway
// =============================================================================

/// What the fake gateway saw and how it answers. Shared with the test after
/// the gateway itself has been boxed into a supervisor.
#[derive(Default)]
pub struct GatewayScript {
    /// Answers for successive connect attempts; `Ok` once drained.
    pub connect_results: VecDeque<Result<(), GatewayError>>,
    pub connect_attempts: Vec<u32>,
    pub connected: bool,
    pub bars: Vec<BrokerBar>,
    pub tick: Option<BrokerTick>,
    /// Drop the session when the next request arrives.
    pub drop_on_request: bool,
    pub placed: Vec<BracketOrder>,
    pub stop_moves: Vec<(i64, Decimal)>,
    pub positions: Vec<BrokerPosition>,
    pub connect_delay: Duration,
    /// Teardowns requested by the supervisor
    pub disconnects: u32,
}

pub struct FakeGateway {
    pub script: Arc<Mutex<GatewayScript>>,
}

impl FakeGateway {
    pub fn new() -> (Box<dyn BrokerGateway>, Arc<Mutex<GatewayScript>>) {
        let script = Arc::new(Mutex::new(GatewayScript::default()));
        (
            Box::new(Self {
                script: Arc::clone(&script),
            }),
            script,
        )
    }
}

impl BrokerGateway for FakeGateway {
    fn connect(&mut self, _host: &str, _port: u16, client_id: u32) -> Result<(), GatewayError> {
        let delay = {
            let mut script = self.script.lock().unwrap();
            script.connect_attempts.push(client_id);
            script.connect_delay
        };
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let mut script = self.script.lock().unwrap();
        let result = match script.connect_results.pop_front() {
            Some(Err(GatewayError::ClientIdInUse(_))) => Err(GatewayError::ClientIdInUse(client_id)),
            Some(other) => other,
            None => Ok(()),
        };
        script.connected = result.is_ok();
        result
    }

    fn is_connected(&self) -> bool {
        self.script.lock().unwrap().connected
    }

    fn disconnect(&mut self) {
        let mut script = self.script.lock().unwrap();
        script.connected = false;
        script.disconnects += 1;
    }

    fn request_history(
        &mut self,
        _contract: &Contract,
        _request: &HistoryRequest,
    ) -> Result<Vec<BrokerBar>, GatewayError> {
        let mut script = self.script.lock().unwrap();
        if script.drop_on_request {
            script.connected = false;
            return Err(GatewayError::NotConnected);
        }
        Ok(script.bars.clone())
    }

    fn request_quote(&mut self, _contract: &Contract) -> Result<Option<BrokerTick>, GatewayError> {
        Ok(self.script.lock().unwrap().tick.clone())
    }

    fn place_bracket(&mut self, order: &BracketOrder) -> Result<OrderAck, GatewayError> {
        let mut script = self.script.lock().unwrap();
        script.placed.push(order.clone());
        let order_id = script.placed.len() as i64 * 10;
        Ok(OrderAck {
            order_id,
            stop_order_id: Some(order_id + 2),
            status: "Submitted".to_string(),
        })
    }

    fn modify_stop(&mut self, order_id: i64, stop_price: Decimal) -> Result<(), GatewayError> {
        self.script
            .lock()
            .unwrap()
            .stop_moves
            .push((order_id, stop_price));
        Ok(())
    }

    fn open_positions(&mut self) -> Result<Vec<BrokerPosition>, GatewayError> {
        Ok(self.script.lock().unwrap().positions.clone())
    }
}

/// Settings with no sleeps between connect attempts.
pub fn fast_settings() -> BrokerSettings {
    BrokerSettings {
        retry_backoff: Duration::ZERO,
        retry_backoff_step: Duration::ZERO,
        liveness_interval: Duration::from_millis(10),
        ..BrokerSettings::default()
    }
}

pub fn conflict() -> Result<(), GatewayError> {
    Err(GatewayError::ClientIdInUse(0))
}

pub fn refused() -> Result<(), GatewayError> {
    Err(GatewayError::Refused("Connection refused (os error 111)".to_string()))
}
