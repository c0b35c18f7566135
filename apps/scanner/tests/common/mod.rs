//! Shared helpers for the scanner service tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};

use daytrader_market_data::broker::{
    BrokerBar, BrokerGateway, BrokerTick, Contract, GatewayError, HistoryRequest,
};
use daytrader_market_data::{BracketOrder, BrokerPosition, OrderAck};
use daytrader_scanner::config::Config;
use rust_decimal::Decimal;

pub fn config(vars: &[(&str, &str)]) -> Config {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| map.get(key).cloned()).unwrap()
}

/// Gateway whose host never accepts a connection.
pub struct RefusingGateway;

impl BrokerGateway for RefusingGateway {
    fn connect(&mut self, _host: &str, _port: u16, _client_id: u32) -> Result<(), GatewayError> {
        Err(GatewayError::Refused("Connection refused (os error 111)".to_string()))
    }

    fn is_connected(&self) -> bool {
        false
    }

    fn disconnect(&mut self) {}

    fn request_history(
        &mut self,
        _contract: &Contract,
        _request: &HistoryRequest,
    ) -> Result<Vec<BrokerBar>, GatewayError> {
        Err(GatewayError::NotConnected)
    }

    fn request_quote(&mut self, _contract: &Contract) -> Result<Option<BrokerTick>, GatewayError> {
        Err(GatewayError::NotConnected)
    }

    fn place_bracket(&mut self, _order: &BracketOrder) -> Result<OrderAck, GatewayError> {
        Err(GatewayError::NotConnected)
    }

    fn modify_stop(&mut self, _order_id: i64, _stop_price: Decimal) -> Result<(), GatewayError> {
        Err(GatewayError::NotConnected)
    }

    fn open_positions(&mut self) -> Result<Vec<BrokerPosition>, GatewayError> {
        Err(GatewayError::NotConnected)
    }
}

/// What the scripted brokerage serves and what it was asked to do.
#[derive(Default)]
pub struct BrokerTape {
    /// Last price served as a one-bar history
    pub price: f64,
    pub placed: Vec<BracketOrder>,
    pub stop_moves: Vec<(i64, Decimal)>,
}

/// Gateway that accepts connections and orders and quotes a settable price.
pub struct ScriptedGateway {
    tape: Arc<Mutex<BrokerTape>>,
    connected: bool,
}

impl ScriptedGateway {
    pub fn new(price: f64) -> (Box<dyn BrokerGateway>, Arc<Mutex<BrokerTape>>) {
        let tape = Arc::new(Mutex::new(BrokerTape {
            price,
            ..BrokerTape::default()
        }));
        (
            Box::new(Self {
                tape: Arc::clone(&tape),
                connected: false,
            }),
            tape,
        )
    }
}

impl BrokerGateway for ScriptedGateway {
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
        let price = self.tape.lock().unwrap().price;
        Ok(vec![BrokerBar {
            time: Utc.with_ymd_and_hms(2024, 7, 9, 15, 0, 0).unwrap(),
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 10_000.0,
        }])
    }

    fn request_quote(&mut self, _contract: &Contract) -> Result<Option<BrokerTick>, GatewayError> {
        Ok(None)
    }

    fn place_bracket(&mut self, order: &BracketOrder) -> Result<OrderAck, GatewayError> {
        let mut tape = self.tape.lock().unwrap();
        tape.placed.push(order.clone());
        let order_id = tape.placed.len() as i64;
        Ok(OrderAck {
            order_id,
            stop_order_id: order.stop_loss.map(|_| order_id + 500),
            status: "Submitted".to_string(),
        })
    }

    fn modify_stop(&mut self, order_id: i64, stop_price: Decimal) -> Result<(), GatewayError> {
        self.tape.lock().unwrap().stop_moves.push((order_id, stop_price));
        Ok(())
    }

    fn open_positions(&mut self) -> Result<Vec<BrokerPosition>, GatewayError> {
        Ok(Vec::new())
    }
}
