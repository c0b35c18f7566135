//! Failover fetcher orchestrating the provider chain.
//!
//! The fetcher owns one budget + lockout pair per provider and walks the chain
//! in its fixed priority order:
//! - Skip a provider that is locked out or whose budget is used up
//! - Call it (without holding its lock) and validate the result
//! - Count the call whatever the outcome
//! - Lock it out when it reported a rate-limit or quota failure
//! - Return the first validated quote
//!
//! Exhaustion is a value ([`FetchOutcome::Unavailable`]), never an error.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use super::{BudgetWindow, FetchDiagnostics, LockoutTimer, QuoteValidator, RateBudget, SkipReason};
use crate::clock::{Clock, SystemClock};
use crate::errors::RetryClass;
use crate::models::{normalize_symbol, ProviderId, Quote, Timeframe};
use crate::provider::MarketDataProvider;

/// Mutable per-provider state, guarded by the provider's own mutex.
#[derive(Debug)]
struct ProviderGuard {
    budget: RateBudget,
    lockout: LockoutTimer,
    cooldown: Duration,
}

struct ProviderSlot {
    provider: Arc<dyn MarketDataProvider>,
    guard: Mutex<ProviderGuard>,
}

impl ProviderSlot {
    fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        let policy = provider.policy();
        Self {
            guard: Mutex::new(ProviderGuard {
                budget: policy.budget(),
                lockout: LockoutTimer::new(),
                cooldown: policy.cooldown,
            }),
            provider,
        }
    }

    fn id(&self) -> ProviderId {
        ProviderId::Borrowed(self.provider.id())
    }

    /// Lock the provider state, recovering from poison if necessary.
    ///
    /// Worst case is a slightly wrong call count, which is better than panicking.
    fn lock(&self) -> MutexGuard<'_, ProviderGuard> {
        self.guard.lock().unwrap_or_else(|poisoned| {
            warn!(
                "Provider state mutex for {} was poisoned, recovering",
                self.provider.id()
            );
            poisoned.into_inner()
        })
    }
}

/// Result of a fetch.
#[derive(Debug)]
pub enum FetchOutcome {
    /// First validated quote from the chain.
    Available(Quote),
    /// Every provider was skipped or failed.
    Unavailable(FetchDiagnostics),
}

impl FetchOutcome {
    pub fn is_available(&self) -> bool {
        matches!(self, FetchOutcome::Available(_))
    }

    pub fn quote(self) -> Option<Quote> {
        match self {
            FetchOutcome::Available(quote) => Some(quote),
            FetchOutcome::Unavailable(_) => None,
        }
    }
}

/// Point-in-time view of one provider's budget and lockout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub provider_id: ProviderId,
    pub window: BudgetWindow,
    pub used: u32,
    pub limit: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Failover fetcher for the provider chain.
pub struct FailoverFetcher {
    slots: Vec<ProviderSlot>,
    validator: QuoteValidator,
    clock: Arc<dyn Clock>,
}

impl FailoverFetcher {
    /// Create a fetcher over `providers`, highest priority first.
    pub fn new(providers: Vec<Arc<dyn MarketDataProvider>>) -> Self {
        Self::with_clock(providers, Arc::new(SystemClock))
    }

    pub fn with_clock(providers: Vec<Arc<dyn MarketDataProvider>>, clock: Arc<dyn Clock>) -> Self {
        Self::with_config(providers, clock, QuoteValidator::new())
    }

    pub fn with_config(
        providers: Vec<Arc<dyn MarketDataProvider>>,
        clock: Arc<dyn Clock>,
        validator: QuoteValidator,
    ) -> Self {
        let slots: Vec<ProviderSlot> = providers.into_iter().map(ProviderSlot::new).collect();
        info!(
            "Failover chain: {}",
            slots
                .iter()
                .map(|s| s.provider.id())
                .collect::<Vec<_>>()
                .join(" -> ")
        );
        Self {
            slots,
            validator,
            clock,
        }
    }

    /// Provider ids in priority order.
    pub fn provider_ids(&self) -> Vec<&'static str> {
        self.slots.iter().map(|s| s.provider.id()).collect()
    }

    /// Fetch a quote for `symbol`, trying providers in priority order.
    ///
    /// Never fails because of providers: when nothing answers, the outcome is
    /// [`FetchOutcome::Unavailable`] with per-provider diagnostics.
    pub fn fetch(&self, symbol: &str, timeframe: Timeframe) -> FetchOutcome {
        let symbol = normalize_symbol(symbol);
        let mut diagnostics = FetchDiagnostics::new();

        for slot in &self.slots {
            let provider_id = slot.id();

            // Gate under the provider's lock, then release it before calling out
            let called_at = self.clock.now();
            {
                let mut guard = slot.lock();
                if guard.lockout.is_locked(called_at) {
                    let until = guard.lockout.unlock_at().unwrap_or(called_at);
                    debug!("Skipping {} for {}: locked until {}", provider_id, symbol, until);
                    diagnostics.record_skip(provider_id, SkipReason::LockedOut { until });
                    continue;
                }
                if !guard.budget.may_call(called_at) {
                    let (used, limit) = (guard.budget.used(), guard.budget.limit());
                    debug!(
                        "Skipping {} for {}: budget used {}/{}",
                        provider_id, symbol, used, limit
                    );
                    diagnostics.record_skip(provider_id, SkipReason::BudgetExhausted { used, limit });
                    continue;
                }
            }

            debug!("Fetching {} ({}) from {}", symbol, timeframe, provider_id);
            let result = slot
                .provider
                .fetch(&symbol, timeframe)
                .and_then(|quote| self.validator.validate(quote));

            {
                let mut guard = slot.lock();
                guard.budget.record_call(called_at);
                if let Err(e) = &result {
                    if e.retry_class() == RetryClass::FailoverWithLockout {
                        let now = self.clock.now();
                        let cooldown = guard.cooldown;
                        let until = guard.lockout.lock(now, cooldown);
                        info!(
                            "Provider {} locked until {} after {}",
                            provider_id,
                            until,
                            e.kind()
                        );
                    }
                }
            }

            match result {
                Ok(quote) => {
                    diagnostics.record_success(provider_id.clone());
                    debug!(
                        "Fetched {} from {} (real data: {}): {}",
                        symbol,
                        provider_id,
                        quote.is_real_data,
                        diagnostics.summary()
                    );
                    return FetchOutcome::Available(quote);
                }
                Err(e) => {
                    warn!("Provider {} failed for {} [{}]: {}", provider_id, symbol, e.kind(), e);
                    diagnostics.record_error(provider_id, e.kind(), e.to_string());
                }
            }
        }

        warn!("No provider returned data for {}: {}", symbol, diagnostics.summary());
        FetchOutcome::Unavailable(diagnostics)
    }

    /// Budget and lockout snapshot for every provider, in chain order.
    pub fn status(&self) -> Vec<ProviderStatus> {
        let now = self.clock.now();
        self.slots
            .iter()
            .map(|slot| {
                let mut guard = slot.lock();
                // Reading through the lazy accessors applies any pending reset
                guard.budget.may_call(now);
                let locked = guard.lockout.is_locked(now);
                ProviderStatus {
                    provider_id: slot.id(),
                    window: guard.budget.window(),
                    used: guard.budget.used(),
                    limit: guard.budget.limit(),
                    locked_until: if locked { guard.lockout.unlock_at() } else { None },
                }
            })
            .collect()
    }

    /// Clear a provider's lockout by id. Returns false for an unknown id.
    pub fn force_unlock(&self, provider_id: &str) -> bool {
        match self
            .slots
            .iter()
            .find(|s| s.provider.id().eq_ignore_ascii_case(provider_id))
        {
            Some(slot) => {
                slot.lock().lockout.force_unlock();
                info!("Provider {} manually unlocked", slot.provider.id());
                true
            }
            None => false,
        }
    }
}
