//! Nonce manager for sequenced transactions.
//!
//! Hands out per-account nonces optimistically: a nonce is consumed the
//! moment a transaction is built, not when the sequencer confirms it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::Address;

/// Tracks the next unused nonce for each account.
///
/// Unseen accounts start at 0. Counters only move forward through
/// [`next_nonce`](Self::next_nonce) and [`observe`](Self::observe);
/// [`reset`](Self::reset) is the one way to move a counter back.
pub struct NonceManager {
    /// Next nonce to hand out, per account.
    nonces: Mutex<HashMap<Address, AtomicU64>>,
}

impl Default for NonceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceManager {
    /// Create an empty nonce manager.
    pub fn new() -> Self {
        Self {
            nonces: Mutex::new(HashMap::new()),
        }
    }

    /// Return the account's current nonce and advance the counter by one.
    ///
    /// Two calls for the same account never return the same value unless
    /// [`reset`](Self::reset) moved the counter back in between.
    pub fn next_nonce(&self, account: &Address) -> u64 {
        let mut nonces = self.nonces.lock().unwrap();
        nonces
            .entry(account.clone())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::SeqCst)
    }

    /// The nonce the next [`next_nonce`](Self::next_nonce) call would return.
    pub fn peek(&self, account: &Address) -> u64 {
        let nonces = self.nonces.lock().unwrap();
        nonces
            .get(account)
            .map(|n| n.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Fold in the sequencer's view of the next expected nonce.
    ///
    /// The counter becomes `max(local, server)`, so nonces already handed
    /// out for in-flight transactions are never reissued.
    pub fn observe(&self, account: &Address, server_nonce: u64) {
        let mut nonces = self.nonces.lock().unwrap();
        nonces
            .entry(account.clone())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_max(server_nonce, Ordering::SeqCst);
    }

    /// Force the counter to a known value.
    ///
    /// Use after a rejected transaction left the local counter ahead of
    /// the sequencer.
    pub fn reset(&self, account: &Address, next_nonce: u64) {
        let mut nonces = self.nonces.lock().unwrap();
        nonces.insert(account.clone(), AtomicU64::new(next_nonce));
    }

    /// Forget the account; its next nonce is 0 again.
    pub fn invalidate(&self, account: &Address) {
        let mut nonces = self.nonces.lock().unwrap();
        nonces.remove(account);
    }
}
