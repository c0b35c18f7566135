//! Per-provider call budgets.
//!
//! A [`RateBudget`] answers "may I call this provider now?" for two
//! kinds of window:
//!
//! - fixed daily or monthly counters that reset lazily the first time they are
//!   read after a US/Eastern calendar boundary,
//! - a sliding window of call timestamps (N calls per trailing 60 seconds).
//!
//! Budgets are not thread-safe on their own; the fetcher keeps each one behind
//! its provider's mutex together with the provider's lockout.

use std::collections::VecDeque;

use chrono::{DateTime, Datelike, Duration, Utc};
use log::info;
use serde::Serialize;

use crate::models::to_eastern;

/// Length of the sliding window.
const SLIDING_WINDOW_SECS: i64 = 60;

/// How a provider's allowance is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetWindow {
    /// No client-side limit.
    Unlimited,
    /// `limit` calls per exchange calendar day.
    FixedDaily,
    /// `limit` calls per exchange calendar month.
    FixedMonthly,
    /// `limit` calls in any trailing 60 seconds.
    SlidingPerMinute,
}

#[derive(Debug, Clone)]
pub struct RateBudget {
    window: BudgetWindow,
    limit: u32,
    used: u32,
    window_anchor: Option<DateTime<Utc>>,
    recent_calls: VecDeque<DateTime<Utc>>,
}

impl RateBudget {
    pub fn new(window: BudgetWindow, limit: u32) -> Self {
        Self {
            window,
            limit,
            used: 0,
            window_anchor: None,
            recent_calls: VecDeque::new(),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(BudgetWindow::Unlimited, 0)
    }

    pub fn daily(limit: u32) -> Self {
        Self::new(BudgetWindow::FixedDaily, limit)
    }

    pub fn monthly(limit: u32) -> Self {
        Self::new(BudgetWindow::FixedMonthly, limit)
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(BudgetWindow::SlidingPerMinute, limit)
    }

    /// Whether a call may be made at `now`.
    ///
    /// The only side effects are the lazy window reset and pruning of
    /// timestamps that fell out of the sliding window.
    pub fn may_call(&mut self, now: DateTime<Utc>) -> bool {
        self.roll_window(now);
        match self.window {
            BudgetWindow::Unlimited => true,
            BudgetWindow::FixedDaily | BudgetWindow::FixedMonthly => self.used < self.limit,
            BudgetWindow::SlidingPerMinute => (self.recent_calls.len() as u32) < self.limit,
        }
    }

    /// Count one call made at `now`, whatever its outcome.
    pub fn record_call(&mut self, now: DateTime<Utc>) {
        self.roll_window(now);
        match self.window {
            BudgetWindow::SlidingPerMinute => self.recent_calls.push_back(now),
            _ => {
                if self.window_anchor.is_none() {
                    self.window_anchor = Some(now);
                }
                self.used = self.used.saturating_add(1);
            }
        }
    }

    pub fn window(&self) -> BudgetWindow {
        self.window
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Calls counted in the current window (as of the last read).
    pub fn used(&self) -> u32 {
        match self.window {
            BudgetWindow::SlidingPerMinute => self.recent_calls.len() as u32,
            _ => self.used,
        }
    }

    fn roll_window(&mut self, now: DateTime<Utc>) {
        match self.window {
            BudgetWindow::Unlimited => {}
            BudgetWindow::SlidingPerMinute => {
                let horizon = Duration::seconds(SLIDING_WINDOW_SECS);
                while let Some(oldest) = self.recent_calls.front() {
                    if now - *oldest >= horizon {
                        self.recent_calls.pop_front();
                    } else {
                        break;
                    }
                }
            }
            BudgetWindow::FixedDaily | BudgetWindow::FixedMonthly => {
                let Some(anchor) = self.window_anchor else {
                    return;
                };
                if self.crossed_boundary(anchor, now) {
                    if self.used > 0 {
                        info!(
                            "Budget window rolled over ({:?}), resetting usage from {}/{}",
                            self.window, self.used, self.limit
                        );
                    }
                    self.used = 0;
                    self.window_anchor = Some(now);
                }
            }
        }
    }

    fn crossed_boundary(&self, anchor: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if now <= anchor {
            return false;
        }
        let (anchor, now) = (to_eastern(anchor), to_eastern(now));
        match self.window {
            BudgetWindow::FixedDaily => anchor.date_naive() != now.date_naive(),
            BudgetWindow::FixedMonthly => {
                (anchor.year(), anchor.month()) != (now.year(), now.month())
            }
            _ => false,
        }
    }
}
