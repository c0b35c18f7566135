use std::borrow::Cow;

/// Provider identifier - mostly static constants
pub type ProviderId = Cow<'static, str>;

/// Ticker as it appears on the wire, always uppercase once normalized.
pub type Symbol = String;

/// Trim and uppercase a user-supplied ticker.
pub fn normalize_symbol(raw: &str) -> Symbol {
    raw.trim().to_ascii_uppercase()
}
