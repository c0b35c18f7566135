//! Narrow interface to the brokerage client library.
//!
//! The supervisor and the brokerage provider only ever talk to a
//! [`BrokerGateway`]; a concrete binding to the broker's own client lives with
//! whoever embeds this crate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use super::orders::{BracketOrder, BrokerPosition, OrderAck};
use crate::models::BarSpec;

/// Error code the gateway uses for "client id already in use".
pub const CLIENT_ID_IN_USE_CODE: i32 = 326;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("client id {0} is already in use")]
    ClientIdInUse(u32),

    #[error("connection refused: {0}")]
    Refused(String),

    #[error("request timed out")]
    Timeout,

    #[error("not connected")]
    NotConnected,

    #[error("gateway error {code:?}: {message}")]
    Other { code: Option<i32>, message: String },
}

impl GatewayError {
    /// Classify a raw connect failure reported by the client library.
    pub fn from_connect_failure(client_id: u32, code: Option<i32>, message: &str) -> Self {
        let lowered = message.to_ascii_lowercase();
        if code == Some(CLIENT_ID_IN_USE_CODE)
            || lowered.contains("already in use")
            || lowered.contains("client id is in use")
        {
            GatewayError::ClientIdInUse(client_id)
        } else if lowered.contains("refused") {
            GatewayError::Refused(message.to_string())
        } else if lowered.contains("timed out") || lowered.contains("timeout") {
            GatewayError::Timeout
        } else {
            GatewayError::Other {
                code,
                message: message.to_string(),
            }
        }
    }
}

/// Instrument description sent with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    pub symbol: String,
    pub security_type: &'static str,
    pub exchange: &'static str,
    pub currency: &'static str,
}

impl Contract {
    /// US stock routed through smart routing.
    pub fn stock(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            security_type: "STK",
            exchange: "SMART",
            currency: "USD",
        }
    }
}

/// Historical data request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub spec: BarSpec,
    /// Regular trading hours only
    pub use_rth: bool,
}

/// Bar as delivered by the gateway. Prices may be NaN or zero when missing.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerBar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Snapshot tick. Fields the gateway did not fill are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerTick {
    pub last: f64,
    pub close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub average_volume: f64,
    pub bid: f64,
    pub ask: f64,
}

/// Blocking transport to the brokerage.
///
/// Every call is made while the supervisor holds the session mutex, so
/// implementations do not need their own locking.
pub trait BrokerGateway: Send {
    fn connect(&mut self, host: &str, port: u16, client_id: u32) -> Result<(), GatewayError>;

    fn is_connected(&self) -> bool;

    fn disconnect(&mut self);

    /// Empty when the gateway has no bars for the contract.
    fn request_history(
        &mut self,
        contract: &Contract,
        request: &HistoryRequest,
    ) -> Result<Vec<BrokerBar>, GatewayError>;

    /// `None` when no tick arrived.
    fn request_quote(&mut self, contract: &Contract) -> Result<Option<BrokerTick>, GatewayError>;

    fn place_bracket(&mut self, order: &BracketOrder) -> Result<OrderAck, GatewayError>;

    /// Move the stop leg of a working bracket.
    fn modify_stop(&mut self, order_id: i64, stop_price: Decimal) -> Result<(), GatewayError>;

    fn open_positions(&mut self) -> Result<Vec<BrokerPosition>, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_detected_by_code_or_message() {
        assert_eq!(
            GatewayError::from_connect_failure(7, Some(326), "Unable to connect"),
            GatewayError::ClientIdInUse(7)
        );
        assert_eq!(
            GatewayError::from_connect_failure(7, None, "client id is already in use"),
            GatewayError::ClientIdInUse(7)
        );
    }

    #[test]
    fn test_other_connect_failures() {
        assert!(matches!(
            GatewayError::from_connect_failure(1, None, "Connection refused (os error 111)"),
            GatewayError::Refused(_)
        ));
        assert_eq!(
            GatewayError::from_connect_failure(1, None, "connect timed out"),
            GatewayError::Timeout
        );
        assert!(matches!(
            GatewayError::from_connect_failure(1, Some(502), "Couldn't connect to TWS"),
            GatewayError::Other { code: Some(502), .. }
        ));
    }

    #[test]
    fn test_stock_contract() {
        let contract = Contract::stock("PLTR");
        assert_eq!(contract.symbol, "PLTR");
        assert_eq!(contract.exchange, "SMART");
    }
}
