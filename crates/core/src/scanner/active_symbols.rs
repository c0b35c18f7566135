//! Growing pool of symbols the scanner re-checks every pass.

use std::sync::{Mutex, MutexGuard};

use daytrader_market_data::models::normalize_symbol;
use log::warn;

/// Insertion-ordered set of symbols, shared between the scan loop and any
/// caller that wants to watch a symbol.
#[derive(Debug, Default)]
pub struct ActiveSymbolSet {
    symbols: Mutex<Vec<String>>,
}

impl ActiveSymbolSet {
    pub fn new<I, S>(seed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = Self::default();
        for symbol in seed {
            set.insert(symbol.as_ref());
        }
        set
    }

    /// Add `symbol`. Returns false when it was already present or blank.
    pub fn insert(&self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return false;
        }
        let mut symbols = self.lock();
        if symbols.contains(&symbol) {
            return false;
        }
        symbols.push(symbol);
        true
    }

    pub fn contains(&self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        self.lock().contains(&symbol)
    }

    /// Copy of the current symbols; the lock is released on return.
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.symbols.lock().unwrap_or_else(|poisoned| {
            warn!("Active symbol set mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}
