use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => f.write_str("BUY"),
            OrderSide::Sell => f.write_str("SELL"),
        }
    }
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            other => Err(format!("unknown order side: {other}")),
        }
    }
}

/// How the parent order enters the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "price", rename_all = "UPPERCASE")]
pub enum EntryKind {
    Market,
    Limit(Decimal),
}

/// Parent order plus optional linked stop-loss and take-profit legs.
///
/// A plain market order is a bracket with neither leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketOrder {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u32,
    pub entry: EntryKind,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    /// Trailing distance for the stop leg, in percent
    pub trailing_percent: Option<Decimal>,
}

impl BracketOrder {
    pub fn market(symbol: &str, side: OrderSide, quantity: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            quantity,
            entry: EntryKind::Market,
            stop_loss: None,
            take_profit: None,
            trailing_percent: None,
        }
    }

    pub fn is_bracket(&self) -> bool {
        self.stop_loss.is_some() || self.take_profit.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAck {
    /// Parent order id
    pub order_id: i64,
    /// Stop leg id, when the bracket has one
    pub stop_order_id: Option<i64>,
    pub status: String,
}

/// Open position as reported by the gateway. Short positions are negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerPosition {
    pub symbol: String,
    pub quantity: i64,
    pub average_cost: Decimal,
}
