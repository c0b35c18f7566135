//! Trading domain models: risk sizing and bracket plans.

use std::fmt;
use std::str::FromStr;

use daytrader_market_data::{BracketOrder, EntryKind, OrderSide};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TradingError};

/// Largest position the sizing rule will suggest.
pub const MAX_POSITION_SHARES: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTolerance {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskTolerance {
    /// Fraction of the account balance put at risk per trade.
    pub fn fraction(&self) -> Decimal {
        match self {
            RiskTolerance::Low => dec!(0.01),
            RiskTolerance::Medium => dec!(0.02),
            RiskTolerance::High => dec!(0.05),
        }
    }

    /// Shares to buy at `entry_price`: `balance * fraction / entry`, clamped
    /// to `1..=1000`. Zero when the entry price is not positive.
    pub fn position_size(&self, balance: Decimal, entry_price: Decimal) -> u32 {
        if entry_price <= Decimal::ZERO {
            return 0;
        }
        let shares = (balance * self.fraction() / entry_price).floor();
        let shares = shares.to_u32().unwrap_or(if shares.is_sign_negative() {
            0
        } else {
            MAX_POSITION_SHARES
        });
        shares.clamp(1, MAX_POSITION_SHARES)
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTolerance::Low => f.write_str("LOW"),
            RiskTolerance::Medium => f.write_str("MEDIUM"),
            RiskTolerance::High => f.write_str("HIGH"),
        }
    }
}

impl FromStr for RiskTolerance {
    type Err = TradingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(RiskTolerance::Low),
            "MEDIUM" => Ok(RiskTolerance::Medium),
            "HIGH" => Ok(RiskTolerance::High),
            other => Err(TradingError::InvalidOrder(format!(
                "unknown risk tolerance: {other}"
            ))),
        }
    }
}

/// Order intent expressed in percentages of the entry reference price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketPlan {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u32,
    /// Limit price; market entry when `None`
    pub limit_price: Option<Decimal>,
    pub stop_loss_percent: Option<Decimal>,
    pub take_profit_percent: Option<Decimal>,
    /// Only honoured together with a stop-loss
    pub trailing_percent: Option<Decimal>,
}

impl BracketPlan {
    pub fn market(symbol: &str, side: OrderSide, quantity: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            quantity,
            limit_price: None,
            stop_loss_percent: None,
            take_profit_percent: None,
            trailing_percent: None,
        }
    }

    /// Resolve the percentages against `reference` (the limit price, or the
    /// last traded price for a market entry).
    ///
    /// For a BUY the stop sits below and the target above the reference; a
    /// SELL mirrors both.
    pub fn to_order(&self, reference: Decimal) -> Result<BracketOrder> {
        if self.quantity == 0 {
            return Err(TradingError::InvalidOrder(
                "quantity must be positive".to_string(),
            ));
        }
        if self.symbol.trim().is_empty() {
            return Err(TradingError::InvalidOrder("symbol is required".to_string()));
        }
        let reference = self.limit_price.unwrap_or(reference);
        if reference <= Decimal::ZERO {
            return Err(TradingError::InvalidOrder(format!(
                "no usable reference price for {}",
                self.symbol
            )));
        }

        let below = |pct: Decimal| reference * (Decimal::ONE - pct / Decimal::ONE_HUNDRED);
        let above = |pct: Decimal| reference * (Decimal::ONE + pct / Decimal::ONE_HUNDRED);
        let positive = |pct: &Decimal| *pct > Decimal::ZERO;

        let stop_loss = self.stop_loss_percent.filter(positive).map(|pct| match self.side {
            OrderSide::Buy => below(pct),
            OrderSide::Sell => above(pct),
        });
        let take_profit = self
            .take_profit_percent
            .filter(positive)
            .map(|pct| match self.side {
                OrderSide::Buy => above(pct),
                OrderSide::Sell => below(pct),
            });
        let trailing_percent = if stop_loss.is_some() {
            self.trailing_percent.filter(positive)
        } else {
            None
        };

        Ok(BracketOrder {
            symbol: self.symbol.trim().to_ascii_uppercase(),
            side: self.side,
            quantity: self.quantity,
            entry: match self.limit_price {
                Some(price) => EntryKind::Limit(price),
                None => EntryKind::Market,
            },
            stop_loss: stop_loss.map(|p| p.round_dp(2)),
            take_profit: take_profit.map(|p| p.round_dp(2)),
            trailing_percent,
        })
    }
}
