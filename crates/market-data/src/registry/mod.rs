//! Provider registry module.
//!
//! This module provides orchestration for the failover chain, including:
//! - Per-provider call budgets (daily, monthly, sliding per-minute)
//! - Cooldown lockouts after rate-limit and quota failures
//! - Quote data validation
//! - Per-fetch diagnostics

mod fetcher;
mod lockout;
mod rate_budget;
mod skip_reason;
mod validator;

pub use fetcher::{FailoverFetcher, FetchOutcome, ProviderStatus};
pub use lockout::LockoutTimer;
pub use rate_budget::{BudgetWindow, RateBudget};
pub use skip_reason::{FetchDiagnostics, ProviderAttempt, SkipReason};
pub use validator::{QuoteValidator, ValidationIssue, ValidationSeverity, ValidatorConfig};
