//! Owner of the single brokerage session.
//!
//! All transport access goes through one mutex: connect, reconnect, history
//! and quote requests, order placement. Concurrent callers queue on it; a
//! caller that was waiting while another thread connected finds the session
//! already live and skips the handshake.
//!
//! Client-id conflicts are resolved inline: each connect sequence keeps its
//! own set of tried ids, picks a fresh random id outside that set after every
//! conflict, and gives up after a bounded number of attempts. The id is only
//! committed once a connect succeeds.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};
use rand::Rng;
use serde::Serialize;

use super::gateway::{BrokerGateway, GatewayError};
use crate::errors::MarketDataError;

/// Valid client id space on the gateway.
pub const CLIENT_ID_RANGE: RangeInclusive<u32> = 1..=999;

/// Random picks tried before falling back to a sequential scan.
const RANDOM_PICK_TRIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    /// Initial client id; replaced after a conflict
    pub client_id: u32,
    pub max_connect_attempts: u32,
    /// Sleep before retry `n` is `retry_backoff + n * retry_backoff_step`
    pub retry_backoff: Duration,
    pub retry_backoff_step: Duration,
    pub liveness_interval: Duration,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7497,
            client_id: 1,
            max_connect_attempts: 15,
            retry_backoff: Duration::from_millis(500),
            retry_backoff_step: Duration::from_millis(100),
            liveness_interval: Duration::from_secs(30),
        }
    }
}

/// Pick a client id not in `tried`.
///
/// Random picks first; once those keep colliding, scan sequentially from a
/// random starting point. `None` when every id has been tried.
pub fn pick_client_id<R: Rng + ?Sized>(tried: &BTreeSet<u32>, rng: &mut R) -> Option<u32> {
    for _ in 0..RANDOM_PICK_TRIES {
        let candidate = rng.gen_range(CLIENT_ID_RANGE);
        if !tried.contains(&candidate) {
            return Some(candidate);
        }
    }

    let (lo, hi) = (*CLIENT_ID_RANGE.start(), *CLIENT_ID_RANGE.end());
    let span = hi - lo + 1;
    let offset = rng.gen_range(0..span);
    (0..span)
        .map(|i| lo + (offset + i) % span)
        .find(|id| !tried.contains(id))
}

pub struct ConnectionSupervisor {
    settings: BrokerSettings,
    session: Mutex<Box<dyn BrokerGateway>>,
    state: Mutex<ConnectionState>,
    client_id: AtomicU32,
    /// Set after the first successful connect; the liveness check leaves a session
    /// nobody has asked for alone.
    established: AtomicBool,
}

impl ConnectionSupervisor {
    pub fn new(settings: BrokerSettings, gateway: Box<dyn BrokerGateway>) -> Self {
        let client_id = settings.client_id;
        Self {
            settings,
            session: Mutex::new(gateway),
            state: Mutex::new(ConnectionState::Disconnected),
            client_id: AtomicU32::new(client_id),
            established: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    /// Client id of the last successful connect (or the configured one).
    pub fn client_id(&self) -> u32 {
        self.client_id.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> ConnectionState {
        *self.lock_state()
    }

    /// Cheap check for whether the session was live at last contact.
    ///
    /// Callers must still be prepared for the next request to fail.
    pub fn is_usable(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Ensure the session is connected. Returns the client id in use.
    pub fn connect(&self) -> Result<u32, MarketDataError> {
        let mut gateway = self.lock_session();
        self.connect_locked(&mut **gateway)
    }

    /// Run `request` on a connected session, connecting first if needed.
    pub fn with_session<T, F>(&self, request: F) -> Result<T, MarketDataError>
    where
        F: FnOnce(&mut dyn BrokerGateway) -> Result<T, GatewayError>,
    {
        let mut gateway = self.lock_session();
        self.connect_locked(&mut **gateway)?;
        match request(&mut **gateway) {
            Ok(value) => Ok(value),
            Err(GatewayError::NotConnected) => {
                warn!("Brokerage session dropped during request");
                gateway.disconnect();
                self.set_state(ConnectionState::Disconnected);
                Err(MarketDataError::ConnectionLost)
            }
            Err(e) => Err(MarketDataError::Gateway(e)),
        }
    }

    /// One liveness check. Reconnects once if the session dropped.
    pub fn check_liveness(&self) -> ConnectionState {
        let mut gateway = self.lock_session();
        if gateway.is_connected() {
            self.set_state(ConnectionState::Connected);
            return ConnectionState::Connected;
        }

        if self.state() == ConnectionState::Connected {
            warn!("Brokerage connection lost (client id {})", self.client_id());
            gateway.disconnect();
        }
        self.set_state(ConnectionState::Disconnected);

        if !self.established.load(Ordering::SeqCst) {
            debug!("Liveness check: no session established yet");
            return ConnectionState::Disconnected;
        }

        match self.connect_locked(&mut **gateway) {
            Ok(client_id) => {
                info!("Liveness check reconnected with client id {}", client_id);
                ConnectionState::Connected
            }
            Err(e) => {
                warn!("Liveness check reconnect failed: {}", e);
                ConnectionState::Disconnected
            }
        }
    }

    /// Start the background liveness thread.
    pub fn spawn_liveness_monitor(self: &Arc<Self>) -> std::io::Result<JoinHandle<()>> {
        let supervisor = Arc::clone(self);
        let interval = self.settings.liveness_interval;
        info!("Starting brokerage liveness monitor every {:?}", interval);
        thread::Builder::new()
            .name("broker-liveness".to_string())
            .spawn(move || loop {
                thread::sleep(interval);
                let state = supervisor.check_liveness();
                debug!("Liveness check: {:?}", state);
            })
    }

    fn connect_locked(&self, gateway: &mut dyn BrokerGateway) -> Result<u32, MarketDataError> {
        if gateway.is_connected() {
            self.set_state(ConnectionState::Connected);
            return Ok(self.client_id());
        }

        self.set_state(ConnectionState::Connecting);
        let settings = &self.settings;
        let mut rng = rand::thread_rng();
        let mut tried = BTreeSet::new();
        let mut candidate = self.client_id();

        for attempt in 0..settings.max_connect_attempts {
            tried.insert(candidate);
            debug!(
                "Connecting to {}:{} with client id {} (attempt {}/{})",
                settings.host,
                settings.port,
                candidate,
                attempt + 1,
                settings.max_connect_attempts
            );

            match gateway.connect(&settings.host, settings.port, candidate) {
                Ok(()) => {
                    self.client_id.store(candidate, Ordering::SeqCst);
                    self.established.store(true, Ordering::SeqCst);
                    self.set_state(ConnectionState::Connected);
                    info!(
                        "Connected to brokerage at {}:{} with client id {}",
                        settings.host, settings.port, candidate
                    );
                    return Ok(candidate);
                }
                Err(GatewayError::ClientIdInUse(_)) => {
                    warn!("Client id {} already in use", candidate);
                    if attempt + 1 >= settings.max_connect_attempts {
                        break;
                    }
                    match pick_client_id(&tried, &mut rng) {
                        Some(next) => candidate = next,
                        None => break,
                    }
                    let backoff = settings.retry_backoff + settings.retry_backoff_step * attempt;
                    if !backoff.is_zero() {
                        thread::sleep(backoff);
                    }
                }
                Err(e) => {
                    self.set_state(ConnectionState::Disconnected);
                    error!(
                        "Brokerage connect to {}:{} failed: {}",
                        settings.host, settings.port, e
                    );
                    return Err(MarketDataError::Unreachable {
                        provider: "BROKERAGE".to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        self.set_state(ConnectionState::Disconnected);
        let attempts = tried.len() as u32;
        error!(
            "Brokerage connect gave up after {} client id conflicts",
            attempts
        );
        Err(MarketDataError::ClientIdsExhausted {
            attempts,
            tried: tried.into_iter().collect(),
        })
    }

    fn set_state(&self, next: ConnectionState) {
        let mut state = self.lock_state();
        if *state != next {
            debug!("Brokerage state {:?} -> {:?}", *state, next);
            *state = next;
        }
    }

    /// Lock the session mutex, recovering from poison if necessary.
    fn lock_session(&self) -> MutexGuard<'_, Box<dyn BrokerGateway>> {
        self.session.lock().unwrap_or_else(|poisoned| {
            warn!("Brokerage session mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Brokerage state mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_pick_skips_tried_ids() {
        let mut rng = StdRng::seed_from_u64(7);
        let tried: BTreeSet<u32> = (1..=998).collect();
        // Only 999 remains
        assert_eq!(pick_client_id(&tried, &mut rng), Some(999));
    }

    #[test]
    fn test_pick_returns_none_when_space_exhausted() {
        let mut rng = StdRng::seed_from_u64(7);
        let tried: BTreeSet<u32> = CLIENT_ID_RANGE.collect();
        assert_eq!(pick_client_id(&tried, &mut rng), None);
    }

    #[test]
    fn test_pick_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let tried = BTreeSet::new();
        for _ in 0..500 {
            let id = pick_client_id(&tried, &mut rng).unwrap();
            assert!(CLIENT_ID_RANGE.contains(&id));
        }
    }
}
