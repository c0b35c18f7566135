//! Budget and cooldown configuration for a provider.

use chrono::Duration;

use crate::registry::{BudgetWindow, RateBudget};

/// Default cooldown after a rate-limit or quota failure, in seconds.
pub const DEFAULT_LOCKOUT_SECS: i64 = 2 * 60 * 60;

/// How the fetcher should meter and punish a provider.
///
/// Read once when the provider is inserted into the chain.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderPolicy {
    /// Window the call budget is counted in.
    pub window: BudgetWindow,

    /// Calls allowed per window. Ignored for `Unlimited`.
    pub limit: u32,

    /// Lockout applied on `RateLimited` / `QuotaExhausted`.
    pub cooldown: Duration,
}

impl ProviderPolicy {
    pub fn unlimited() -> Self {
        Self {
            window: BudgetWindow::Unlimited,
            limit: 0,
            cooldown: Duration::seconds(DEFAULT_LOCKOUT_SECS),
        }
    }

    pub fn daily(limit: u32) -> Self {
        Self {
            window: BudgetWindow::FixedDaily,
            limit,
            cooldown: Duration::seconds(DEFAULT_LOCKOUT_SECS),
        }
    }

    pub fn monthly(limit: u32) -> Self {
        Self {
            window: BudgetWindow::FixedMonthly,
            limit,
            cooldown: Duration::seconds(DEFAULT_LOCKOUT_SECS),
        }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self {
            window: BudgetWindow::SlidingPerMinute,
            limit,
            cooldown: Duration::seconds(DEFAULT_LOCKOUT_SECS),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Fresh budget for this policy.
    pub fn budget(&self) -> RateBudget {
        RateBudget::new(self.window, self.limit)
    }
}

impl Default for ProviderPolicy {
    fn default() -> Self {
        Self::unlimited()
    }
}
