//! Replay protection for accepted request nonces.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use deploy_auth::{AuthError, Nonce};
use tracing::debug;

/// Nonces accepted within the freshness window, keyed to their request timestamp.
///
/// Check-and-insert happens under one lock, so two concurrent requests carrying
/// the same nonce can never both be accepted. Entries are pruned lazily once
/// their timestamp could no longer pass the freshness check.
pub struct NonceLedger {
    window: u64,
    state: Mutex<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    entries: HashMap<Nonce, i64>,
    last_pruned: i64,
}

impl NonceLedger {
    pub fn new(window_secs: u64) -> Self {
        Self {
            window: window_secs,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Freshness window in seconds.
    pub fn window(&self) -> u64 {
        self.window
    }

    pub fn contains(&self, nonce: &Nonce) -> bool {
        self.lock().entries.contains_key(nonce)
    }

    /// Records `nonce`, or fails with `ReplayedNonce` if it is already recorded.
    pub fn check_and_insert(&self, nonce: Nonce, timestamp: i64, now: i64) -> Result<(), AuthError> {
        let mut state = self.lock();
        if now > state.last_pruned {
            prune_expired(&mut state, self.window, now);
        }

        if state.entries.contains_key(&nonce) {
            return Err(AuthError::ReplayedNonce(nonce.to_hex()));
        }
        state.entries.insert(nonce, timestamp);
        Ok(())
    }

    /// Drops entries whose timestamp is older than `now - window`.
    /// Returns the number of entries removed.
    pub fn prune(&self, now: i64) -> usize {
        let mut state = self.lock();
        prune_expired(&mut state, self.window, now)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    // A panic while holding the lock cannot leave the map half-updated.
    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn prune_expired(state: &mut LedgerState, window: u64, now: i64) -> usize {
    let before = state.entries.len();
    state
        .entries
        .retain(|_, &mut timestamp| !is_expired(timestamp, window, now));
    state.last_pruned = now;

    let removed = before - state.entries.len();
    if removed > 0 {
        debug!(removed, remaining = state.entries.len(), "pruned expired nonces");
    }
    removed
}

fn is_expired(timestamp: i64, window: u64, now: i64) -> bool {
    i128::from(timestamp) + i128::from(window) < i128::from(now)
}
