//! Local state store.
//!
//! Holds the client's copy of balances, nonces, withdrawals, batches,
//! pending games and active games. Local actions mutate it optimistically;
//! snapshots from the sequencer overwrite it. Every mutation is persisted
//! through a [`StateCache`].
//!
//! # Reconciling optimistic moves
//!
//! A move applied locally before the sequencer confirms it is recorded as a
//! [`PendingMove`] next to the game. When a snapshot arrives:
//!
//! - if the server game reached the expected turn count, or is over, the
//!   move is committed and the server copy is taken;
//! - otherwise the optimistic copy is kept while the refresh budget lasts;
//! - once the budget is spent, the server copy wins (or the last confirmed
//!   copy if the server no longer reports the game).

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::cache::{MemoryCache, StateCache};
use crate::error::CacheError;
use crate::types::{
    Address, Amount, Batch, Claim, Game, GameId, PendingGame, StateSnapshot, quantity,
};

/// Snapshots a pending move may go unconfirmed before it is reverted.
pub const DEFAULT_PENDING_MOVE_REFRESHES: u32 = 3;

/// A locally applied move awaiting confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMove {
    pub san: String,
    /// The game as last confirmed, restored on rollback.
    pub confirmed: Game,
    /// `turns` the server game must reach for the move to count as applied.
    pub expected_turns: u64,
    /// Remaining snapshots before the move is reverted.
    pub refreshes_left: u32,
}

/// Everything the store holds. This is also the persisted blob's schema.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalState {
    #[serde(default)]
    pub balances: HashMap<Address, Amount>,
    #[serde(default, with = "quantity::map")]
    pub nonces: HashMap<Address, u64>,
    #[serde(default)]
    pub withdrawals: Vec<(Address, Amount)>,
    #[serde(default)]
    pub batches: Vec<Batch>,
    #[serde(default)]
    pub pending_games: HashMap<GameId, PendingGame>,
    #[serde(default)]
    pub games: HashMap<GameId, Game>,
    #[serde(default)]
    pub pending_moves: HashMap<GameId, PendingMove>,
}

/// What a snapshot changed, for callers that react to transitions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotReport {
    /// Pending games that became active games.
    pub promoted: Vec<GameId>,
    /// Optimistic moves the server confirmed.
    pub committed: Vec<GameId>,
    /// Optimistic moves dropped in favour of server state.
    pub reverted: Vec<GameId>,
}

/// Process-wide store, shared behind an `Arc`.
pub struct StateStore {
    state: RwLock<LocalState>,
    cache: Box<dyn StateCache>,
}

impl StateStore {
    /// Open a store, loading whatever the cache holds.
    ///
    /// An unreadable or corrupt cache is logged and treated as empty.
    pub fn open(cache: impl StateCache + 'static) -> Self {
        let state = match cache.load() {
            Ok(Some(blob)) => match serde_json::from_str(&blob) {
                Ok(state) => state,
                Err(e) => {
                    warn!(error = %e, "discarding corrupt state cache");
                    LocalState::default()
                }
            },
            Ok(None) => LocalState::default(),
            Err(e) => {
                warn!(error = %e, "failed to read state cache");
                LocalState::default()
            }
        };

        Self {
            state: RwLock::new(state),
            cache: Box::new(cache),
        }
    }

    /// A store with no persistence beyond the process.
    pub fn in_memory() -> Self {
        Self::open(MemoryCache::new())
    }

    /// Write the current state to the cache.
    pub fn persist(&self) -> Result<(), CacheError> {
        let state = self.state.read().unwrap();
        self.write_cache(&state)
    }

    fn write_cache(&self, state: &LocalState) -> Result<(), CacheError> {
        let blob = serde_json::to_string(state)?;
        self.cache.save(&blob)
    }

    fn save(&self, state: &LocalState) {
        if let Err(e) = self.write_cache(state) {
            warn!(error = %e, "failed to persist state cache");
        }
    }

    /// Run `f` against the state under the write lock.
    ///
    /// The state is persisted only if `f` succeeds, and `f` must leave the
    /// state untouched when it fails.
    pub(crate) fn mutate<R, E>(
        &self,
        f: impl FnOnce(&mut LocalState) -> Result<R, E>,
    ) -> Result<R, E> {
        let mut state = self.state.write().unwrap();
        let out = f(&mut state)?;
        self.save(&state);
        Ok(out)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// A copy of the whole state.
    pub fn snapshot(&self) -> LocalState {
        self.state.read().unwrap().clone()
    }

    /// Cached balance; zero for unknown accounts.
    pub fn balance(&self, account: &Address) -> Amount {
        self.state
            .read()
            .unwrap()
            .balances
            .get(account)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether any balances have been received.
    pub fn has_balances(&self) -> bool {
        !self.state.read().unwrap().balances.is_empty()
    }

    /// The nonce the sequencer last reported for `account`.
    pub fn cached_nonce(&self, account: &Address) -> Option<u64> {
        self.state.read().unwrap().nonces.get(account).copied()
    }

    pub fn cached_nonces(&self) -> HashMap<Address, u64> {
        self.state.read().unwrap().nonces.clone()
    }

    pub fn withdrawals(&self) -> Vec<(Address, Amount)> {
        self.state.read().unwrap().withdrawals.clone()
    }

    pub fn game(&self, id: &GameId) -> Option<Game> {
        self.state.read().unwrap().games.get(id).cloned()
    }

    pub fn games(&self) -> HashMap<GameId, Game> {
        self.state.read().unwrap().games.clone()
    }

    /// Games `account` plays in, ordered by id.
    pub fn games_for(&self, account: &Address) -> Vec<(GameId, Game)> {
        let state = self.state.read().unwrap();
        let mut games: Vec<_> = state
            .games
            .iter()
            .filter(|(_, g)| g.side_of(account).is_some())
            .map(|(id, g)| (id.clone(), g.clone()))
            .collect();
        games.sort_by(|a, b| a.0.cmp(&b.0));
        games
    }

    pub fn pending_game(&self, id: &GameId) -> Option<PendingGame> {
        self.state.read().unwrap().pending_games.get(id).cloned()
    }

    pub fn pending_games(&self) -> HashMap<GameId, PendingGame> {
        self.state.read().unwrap().pending_games.clone()
    }

    pub fn pending_move(&self, id: &GameId) -> Option<PendingMove> {
        self.state.read().unwrap().pending_moves.get(id).cloned()
    }

    pub fn has_pending_move(&self, id: &GameId) -> bool {
        self.state.read().unwrap().pending_moves.contains_key(id)
    }

    /// Claims for `account` across all batches, as `(batch_index, claim)`.
    pub fn claims_for(&self, account: &Address) -> Vec<(u64, Claim)> {
        let state = self.state.read().unwrap();
        state
            .batches
            .iter()
            .enumerate()
            .filter_map(|(i, batch)| batch.claims.get(account).map(|c| (i as u64, c.clone())))
            .collect()
    }

    /// The claim for `account` in batch `batch_index`, exactly as cached.
    pub fn claim(&self, batch_index: u64, account: &Address) -> Option<Claim> {
        let state = self.state.read().unwrap();
        usize::try_from(batch_index)
            .ok()
            .and_then(|i| state.batches.get(i))
            .and_then(|batch| batch.claims.get(account))
            .cloned()
    }

    // ========================================================================
    // Snapshot merge
    // ========================================================================

    /// Merge a sequencer snapshot. Only fields present in the snapshot are
    /// replaced.
    pub fn apply_snapshot(&self, snapshot: StateSnapshot) -> SnapshotReport {
        let mut report = SnapshotReport::default();
        let mut state = self.state.write().unwrap();

        if let Some(balances) = snapshot.balances {
            state.balances = balances;
        }
        if let Some(nonces) = snapshot.nonces {
            state.nonces = nonces;
        }
        if let Some(withdrawals) = snapshot.withdrawals {
            state.withdrawals = withdrawals;
        }
        if let Some(batches) = snapshot.batches {
            state.batches = batches;
        }

        if let Some(game_state) = snapshot.state {
            if let Some(games) = game_state.games {
                for id in games.keys() {
                    if state.pending_games.contains_key(id) && !state.games.contains_key(id) {
                        info!(game_id = %id, "pending game promoted");
                        report.promoted.push(id.clone());
                    }
                }
                reconcile_games(&mut state, games, &mut report);
            }
            if let Some(pending_games) = game_state.pending_games {
                state.pending_games = pending_games;
            }
        }

        report.promoted.sort();
        report.committed.sort();
        report.reverted.sort();

        debug!(
            games = state.games.len(),
            pending_games = state.pending_games.len(),
            pending_moves = state.pending_moves.len(),
            "applied snapshot"
        );
        self.save(&state);
        report
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("state", &*self.state.read().unwrap())
            .finish()
    }
}

/// Replace the local games with the server's, keeping or reverting
/// optimistic moves.
fn reconcile_games(
    state: &mut LocalState,
    server_games: HashMap<GameId, Game>,
    report: &mut SnapshotReport,
) {
    let mut games = server_games;
    let pending = std::mem::take(&mut state.pending_moves);

    for (id, mut pending_move) in pending {
        let confirmed = games
            .get(&id)
            .is_some_and(|g| g.turns >= pending_move.expected_turns || !g.is_ongoing());

        if confirmed {
            info!(game_id = %id, san = %pending_move.san, "move committed");
            report.committed.push(id);
            continue;
        }

        if pending_move.refreshes_left > 0 {
            if let Some(local) = state.games.get(&id) {
                pending_move.refreshes_left -= 1;
                games.insert(id.clone(), local.clone());
                state.pending_moves.insert(id, pending_move);
                continue;
            }
        }

        info!(game_id = %id, san = %pending_move.san, "move not applied upstream, reverting");
        games
            .entry(id.clone())
            .or_insert_with(|| pending_move.confirmed.clone());
        report.reverted.push(id);
    }

    state.games = games;
}
