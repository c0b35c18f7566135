/// Classification for the failover decision.
///
/// Every provider failure moves the chain to the next provider; the class only
/// decides whether the failing provider is also put on cooldown.
///
/// | Class | Try Next Provider? | Lock the provider? |
/// |-------|-------------------|--------------------|
/// | `NextProvider` | Yes | No |
/// | `FailoverWithLockout` | Yes | Yes, for the provider's cooldown |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Try the next provider; this one stays eligible for the next request.
    ///
    /// Used for outages, malformed payloads and empty results. The provider
    /// may well answer the next symbol.
    NextProvider,

    /// Try the next provider and lock this one out.
    ///
    /// Used when the provider told us to stop calling it (HTTP 429, quota
    /// message in the body). Calling again before the cooldown only burns
    /// quota or extends the ban.
    FailoverWithLockout,
}

/// Failure taxonomy reported in logs and diagnostics.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    NotConfigured,
    QuotaExhausted,
    RateLimited,
    Unreachable,
    MalformedResponse,
    NoData,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FailureKind::NotConfigured => "not configured",
            FailureKind::QuotaExhausted => "quota exhausted",
            FailureKind::RateLimited => "rate limited",
            FailureKind::Unreachable => "unreachable",
            FailureKind::MalformedResponse => "malformed response",
            FailureKind::NoData => "no data",
        };
        f.write_str(label)
    }
}
