//! Order desk: the one path from a trade decision to the broker.
//!
//! Every broker call goes through the supervisor's serialized session, so
//! order traffic queues behind (never interleaves with) market-data requests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use daytrader_market_data::models::{eastern_date, in_liquidation_window};
use daytrader_market_data::{BracketOrder, Clock, ConnectionSupervisor, OrderAck, OrderSide};
use log::{debug, info, warn};
use rust_decimal::Decimal;

use super::daily_limits::DailyTradeLimiter;
use super::trading_model::BracketPlan;
use super::trailing_stop::{StopUpdate, TrailingStop};
use crate::errors::{Result, TradingError};

/// Outcome of one end-of-day liquidation pass.
#[derive(Debug, Default)]
pub struct LiquidationReport {
    pub acks: Vec<OrderAck>,
    /// Positions that could not be closed, with the reason
    pub failures: Vec<(String, TradingError)>,
}

impl LiquidationReport {
    pub fn is_empty(&self) -> bool {
        self.acks.is_empty() && self.failures.is_empty()
    }
}

pub struct OrderDesk {
    supervisor: Arc<ConnectionSupervisor>,
    limiter: Arc<DailyTradeLimiter>,
    clock: Arc<dyn Clock>,
    trailing: Mutex<HashMap<i64, TrailingStop>>,
    /// Eastern date of the last completed liquidation pass
    last_liquidation: Mutex<Option<NaiveDate>>,
}

impl OrderDesk {
    pub fn new(
        supervisor: Arc<ConnectionSupervisor>,
        limiter: Arc<DailyTradeLimiter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        OrderDesk {
            supervisor,
            limiter,
            clock,
            trailing: Mutex::new(HashMap::new()),
            last_liquidation: Mutex::new(None),
        }
    }

    pub fn limiter(&self) -> &Arc<DailyTradeLimiter> {
        &self.limiter
    }

    /// Place `plan` with `reference_price` as the market entry reference.
    ///
    /// Fails without touching the broker when today's slot for the side is
    /// already used. The slot is claimed before the order goes out and handed
    /// back if the broker rejects it.
    pub fn submit(&self, plan: &BracketPlan, reference_price: Decimal) -> Result<OrderAck> {
        let today = eastern_date(self.clock.now());
        let order = plan.to_order(reference_price)?;
        self.limiter.reserve(today, plan.side)?;

        let ack = match self
            .supervisor
            .with_session(|gateway| gateway.place_bracket(&order))
        {
            Ok(ack) => ack,
            Err(e) => {
                self.limiter.release(today, plan.side);
                warn!("{} {} rejected: {}", order.side, order.symbol, e);
                return Err(e.into());
            }
        };

        info!(
            "Placed {} {} x{} (order {}, stop {:?}, target {:?})",
            order.side, order.symbol, order.quantity, ack.order_id, order.stop_loss, order.take_profit
        );

        if let (Some(stop), Some(pct)) = (order.stop_loss, order.trailing_percent) {
            let entry = plan.limit_price.unwrap_or(reference_price);
            let mut tracker =
                TrailingStop::new(ack.order_id, &order.symbol, order.side, entry, stop, pct);
            tracker.stop_order_id = ack.stop_order_id;
            self.lock_trailing().insert(ack.order_id, tracker);
            info!("Trailing stop {}% registered for order {}", pct, ack.order_id);
        }

        Ok(ack)
    }

    /// Feed a price to the trailing stop of `order_id` and move the broker's
    /// stop leg when it tightened.
    pub fn update_trailing(&self, order_id: i64, price: Decimal) -> Result<Option<StopUpdate>> {
        let mut tracker = self
            .lock_trailing()
            .get(&order_id)
            .cloned()
            .ok_or(TradingError::UnknownOrder(order_id))?;

        let Some(update) = tracker.observe(price) else {
            // Best price may still have moved
            self.lock_trailing().insert(order_id, tracker);
            return Ok(None);
        };

        let leg = tracker.stop_order_id.unwrap_or(order_id);
        self.supervisor
            .with_session(|gateway| gateway.modify_stop(leg, update.new_stop))?;
        self.lock_trailing().insert(order_id, tracker);

        info!(
            "Trailing stop for {} moved to {} (locks {}%)",
            update.symbol, update.new_stop, update.profit_locked_percent
        );
        Ok(Some(update))
    }

    pub fn trailing_stop(&self, order_id: i64) -> Option<TrailingStop> {
        self.lock_trailing().get(&order_id).cloned()
    }

    pub fn unregister_trailing(&self, order_id: i64) -> bool {
        self.lock_trailing().remove(&order_id).is_some()
    }

    /// `(order id, symbol)` of every registered trailing stop.
    pub fn trailing_orders(&self) -> Vec<(i64, String)> {
        let mut orders: Vec<(i64, String)> = self
            .lock_trailing()
            .values()
            .map(|t| (t.order_id, t.symbol.clone()))
            .collect();
        orders.sort_unstable_by_key(|(id, _)| *id);
        orders
    }

    /// Flatten every open position once per day when the end-of-day window
    /// is open.
    ///
    /// Empty outside the window and after a pass already completed today. A
    /// position that fails to close is recorded and the rest are still closed.
    /// When the position list itself cannot be read the pass is retried on the
    /// next call. Closing orders do not count against the daily limit.
    pub fn liquidate_if_due(&self) -> Result<LiquidationReport> {
        let now = self.clock.now();
        if !in_liquidation_window(now) {
            return Ok(LiquidationReport::default());
        }

        let today = eastern_date(now);
        let mut last = self.last_liquidation.lock().unwrap_or_else(|poisoned| {
            warn!("Liquidation date mutex was poisoned, recovering");
            poisoned.into_inner()
        });
        if *last == Some(today) {
            debug!("End-of-day liquidation already ran for {}", today);
            return Ok(LiquidationReport::default());
        }

        let positions = self
            .supervisor
            .with_session(|gateway| gateway.open_positions())?;
        let mut report = LiquidationReport::default();

        for position in positions.into_iter().filter(|p| p.quantity != 0) {
            let side = if position.quantity > 0 {
                OrderSide::Sell
            } else {
                OrderSide::Buy
            };
            let Ok(quantity) = u32::try_from(position.quantity.unsigned_abs()) else {
                let reason = format!(
                    "position size {} for {} out of range",
                    position.quantity, position.symbol
                );
                warn!("End of day close skipped: {}", reason);
                report
                    .failures
                    .push((position.symbol, TradingError::InvalidOrder(reason)));
                continue;
            };
            let order = BracketOrder::market(&position.symbol, side, quantity);

            match self
                .supervisor
                .with_session(|gateway| gateway.place_bracket(&order))
            {
                Ok(ack) => {
                    info!(
                        "End of day: {} {} x{} (order {})",
                        side, position.symbol, quantity, ack.order_id
                    );
                    self.lock_trailing()
                        .retain(|_, t| !t.symbol.eq_ignore_ascii_case(&position.symbol));
                    report.acks.push(ack);
                }
                Err(e) => {
                    warn!("End of day close for {} failed: {}", position.symbol, e);
                    report.failures.push((position.symbol, e.into()));
                }
            }
        }

        *last = Some(today);
        info!(
            "End-of-day liquidation for {}: {} closed, {} failed",
            today,
            report.acks.len(),
            report.failures.len()
        );
        Ok(report)
    }

    fn lock_trailing(&self) -> MutexGuard<'_, HashMap<i64, TrailingStop>> {
        self.trailing.lock().unwrap_or_else(|poisoned| {
            warn!("Trailing stop registry mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}
