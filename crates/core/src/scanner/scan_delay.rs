use std::time::Duration;

/// Ceiling for the rescan delay.
pub const MAX_SCAN_DELAY: Duration = Duration::from_secs(60);

const ERROR_PENALTY: Duration = Duration::from_secs(1);

/// Delay between scan passes. Starts at the configured interval and grows by
/// one second per failed fetch, up to [`MAX_SCAN_DELAY`].
#[derive(Debug, Clone)]
pub struct ScanDelay {
    base: Duration,
    current: Duration,
}

impl ScanDelay {
    pub fn new(base: Duration) -> Self {
        let base = base.min(MAX_SCAN_DELAY);
        Self {
            base,
            current: base,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    /// Account for `failures` unavailable fetches in the last pass.
    pub fn record_failures(&mut self, failures: usize) -> Duration {
        let penalty = ERROR_PENALTY.saturating_mul(failures.min(u32::MAX as usize) as u32);
        self.current = self.current.saturating_add(penalty).min(MAX_SCAN_DELAY);
        self.current
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }
}
