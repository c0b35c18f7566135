//! Trailing stop tracking.
//!
//! A long position trails its stop below the highest price seen since entry;
//! a short trails above the lowest. The stop only ever tightens.

use daytrader_market_data::OrderSide;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailingStop {
    pub order_id: i64,
    /// Broker id of the stop leg that gets modified
    pub stop_order_id: Option<i64>,
    pub symbol: String,
    pub side: OrderSide,
    pub entry_price: Decimal,
    pub stop_price: Decimal,
    pub trailing_percent: Decimal,
    /// Highest price for a long, lowest for a short
    pub best_price: Decimal,
}

/// A stop that moved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopUpdate {
    pub order_id: i64,
    pub symbol: String,
    pub new_stop: Decimal,
    pub best_price: Decimal,
    /// Percent of the entry price locked in by the new stop
    pub profit_locked_percent: Decimal,
}

impl TrailingStop {
    pub fn new(
        order_id: i64,
        symbol: &str,
        side: OrderSide,
        entry_price: Decimal,
        initial_stop: Decimal,
        trailing_percent: Decimal,
    ) -> Self {
        Self {
            order_id,
            stop_order_id: None,
            symbol: symbol.to_string(),
            side,
            entry_price,
            stop_price: initial_stop,
            trailing_percent,
            best_price: entry_price,
        }
    }

    /// Feed the latest price. Returns the update when the stop moved.
    pub fn observe(&mut self, price: Decimal) -> Option<StopUpdate> {
        if self.trailing_percent <= Decimal::ZERO || price <= Decimal::ZERO {
            return None;
        }
        let distance = self.trailing_percent / Decimal::ONE_HUNDRED;

        let candidate = match self.side {
            OrderSide::Buy if price > self.best_price => {
                self.best_price = price;
                let stop = (price * (Decimal::ONE - distance)).round_dp(2);
                (stop > self.stop_price).then_some(stop)
            }
            OrderSide::Sell if price < self.best_price => {
                self.best_price = price;
                let stop = (price * (Decimal::ONE + distance)).round_dp(2);
                (stop < self.stop_price || self.stop_price.is_zero()).then_some(stop)
            }
            _ => None,
        }?;

        self.stop_price = candidate;
        Some(StopUpdate {
            order_id: self.order_id,
            symbol: self.symbol.clone(),
            new_stop: candidate,
            best_price: self.best_price,
            profit_locked_percent: self.profit_locked_percent(),
        })
    }

    fn profit_locked_percent(&self) -> Decimal {
        if self.entry_price <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let gain = match self.side {
            OrderSide::Buy => self.stop_price - self.entry_price,
            OrderSide::Sell => self.entry_price - self.stop_price,
        };
        (gain / self.entry_price * Decimal::ONE_HUNDRED).round_dp(2)
    }
}
