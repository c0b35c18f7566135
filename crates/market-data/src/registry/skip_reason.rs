//! Per-fetch record of what each provider in the chain did.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::FailureKind;
use crate::models::ProviderId;

/// Why a provider was skipped without being called.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    /// Provider is cooling down after a rate-limit or quota failure.
    LockedOut { until: DateTime<Utc> },

    /// Provider's call budget for the current window is used up.
    BudgetExhausted { used: u32, limit: u32 },
}

/// Record of a single provider attempt during a fetch.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAttempt {
    pub provider_id: ProviderId,
    pub skipped: Option<SkipReason>,
    pub failure: Option<FailureKind>,
    pub error: Option<String>,
    pub success: bool,
}

/// Detailed result of a fetch operation.
#[derive(Clone, Debug, Default, Serialize)]
pub struct FetchDiagnostics {
    pub attempts: Vec<ProviderAttempt>,
}

impl FetchDiagnostics {
    pub fn new() -> Self {
        Self {
            attempts: Vec::new(),
        }
    }

    pub fn record_skip(&mut self, provider_id: ProviderId, reason: SkipReason) {
        self.attempts.push(ProviderAttempt {
            provider_id,
            skipped: Some(reason),
            failure: None,
            error: None,
            success: false,
        });
    }

    pub fn record_error(&mut self, provider_id: ProviderId, kind: FailureKind, error: String) {
        self.attempts.push(ProviderAttempt {
            provider_id,
            skipped: None,
            failure: Some(kind),
            error: Some(error),
            success: false,
        });
    }

    pub fn record_success(&mut self, provider_id: ProviderId) {
        self.attempts.push(ProviderAttempt {
            provider_id,
            skipped: None,
            failure: None,
            error: None,
            success: true,
        });
    }

    /// Summary for logging/debugging.
    pub fn summary(&self) -> String {
        if self.attempts.is_empty() {
            return "no providers configured".to_string();
        }
        self.attempts
            .iter()
            .map(|a| {
                if a.success {
                    format!("{}: SUCCESS", a.provider_id)
                } else if let Some(skip) = &a.skipped {
                    match skip {
                        SkipReason::LockedOut { until } => {
                            format!("{}: SKIPPED (locked until {})", a.provider_id, until)
                        }
                        SkipReason::BudgetExhausted { used, limit } => {
                            format!("{}: SKIPPED (budget {}/{})", a.provider_id, used, limit)
                        }
                    }
                } else if let (Some(kind), Some(err)) = (&a.failure, &a.error) {
                    format!("{}: ERROR [{}] ({})", a.provider_id, kind, err)
                } else {
                    format!("{}: UNKNOWN", a.provider_id)
                }
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Check if any provider succeeded.
    pub fn has_success(&self) -> bool {
        self.attempts.iter().any(|a| a.success)
    }

    /// Providers that were actually called.
    pub fn called(&self) -> Vec<&ProviderId> {
        self.attempts
            .iter()
            .filter(|a| a.skipped.is_none())
            .map(|a| &a.provider_id)
            .collect()
    }

    /// Get all skip reasons.
    pub fn skip_reasons(&self) -> Vec<(&ProviderId, &SkipReason)> {
        self.attempts
            .iter()
            .filter_map(|a| a.skipped.as_ref().map(|s| (&a.provider_id, s)))
            .collect()
    }

    /// Get all failures with their kind.
    pub fn errors(&self) -> Vec<(&ProviderId, FailureKind)> {
        self.attempts
            .iter()
            .filter_map(|a| a.failure.map(|k| (&a.provider_id, k)))
            .collect()
    }
}
