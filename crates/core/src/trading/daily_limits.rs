//! One BUY and one SELL per exchange calendar day.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{Days, NaiveDate};
use daytrader_market_data::OrderSide;
use log::{debug, warn};
use serde::Serialize;

use crate::errors::{Result, TradingError};

/// Days of history kept before old entries are dropped.
const RETENTION_DAYS: u64 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTradeStatus {
    pub buy_used: bool,
    pub sell_used: bool,
}

impl DailyTradeStatus {
    fn used(&self, side: OrderSide) -> bool {
        match side {
            OrderSide::Buy => self.buy_used,
            OrderSide::Sell => self.sell_used,
        }
    }

    fn set(&mut self, side: OrderSide, used: bool) {
        match side {
            OrderSide::Buy => self.buy_used = used,
            OrderSide::Sell => self.sell_used = used,
        }
    }
}

#[derive(Debug, Default)]
pub struct DailyTradeLimiter {
    days: Mutex<BTreeMap<NaiveDate, DailyTradeStatus>>,
}

impl DailyTradeLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ok when `side` has not traded yet on `date`.
    pub fn check(&self, date: NaiveDate, side: OrderSide) -> Result<()> {
        let mut days = self.lock();
        prune(&mut days, date);
        let status = days.get(&date).copied().unwrap_or_default();
        if status.used(side) {
            debug!("Daily {} slot already used for {}", side, date);
            return Err(TradingError::DailyLimitReached { date, side });
        }
        Ok(())
    }

    pub fn mark_used(&self, date: NaiveDate, side: OrderSide) {
        let mut days = self.lock();
        days.entry(date).or_default().set(side, true);
    }

    /// Check and claim the `side` slot for `date` under one lock.
    ///
    /// A claimed slot stays used unless handed back with [`release`](Self::release).
    pub fn reserve(&self, date: NaiveDate, side: OrderSide) -> Result<()> {
        let mut days = self.lock();
        prune(&mut days, date);
        let status = days.entry(date).or_default();
        if status.used(side) {
            debug!("Daily {} slot already used for {}", side, date);
            return Err(TradingError::DailyLimitReached { date, side });
        }
        status.set(side, true);
        Ok(())
    }

    /// Hand back a slot claimed by [`reserve`](Self::reserve) whose order
    /// never reached the market.
    pub fn release(&self, date: NaiveDate, side: OrderSide) {
        if let Some(status) = self.lock().get_mut(&date) {
            status.set(side, false);
        }
    }

    pub fn status(&self, date: NaiveDate) -> DailyTradeStatus {
        self.lock().get(&date).copied().unwrap_or_default()
    }

    /// Number of days currently tracked.
    pub fn tracked_days(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<NaiveDate, DailyTradeStatus>> {
        self.days.lock().unwrap_or_else(|poisoned| {
            warn!("Daily trade limiter mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

fn prune(days: &mut BTreeMap<NaiveDate, DailyTradeStatus>, today: NaiveDate) {
    let Some(cutoff) = today.checked_sub_days(Days::new(RETENTION_DAYS)) else {
        return;
    };
    days.retain(|date, _| *date >= cutoff);
}
