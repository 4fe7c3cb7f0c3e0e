//! The main Sequencer client.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Error, ValidationError};
use crate::types::{
    Address, Amount, Game, GameId, IntoAmount, PendingGame, SequencedTransaction, TransactionData,
    TxKind,
};

use super::cache::{FileCache, MemoryCache, StateCache};
use super::nonce_manager::NonceManager;
use super::rpc::{Receipt, RetryConfig, RpcClient};
use super::rules::{RulesEngine, StandardChess};
use super::signer::{LocalWallet, PRIVATE_KEY_ENV, Signer, sign_transaction};
use super::store::{DEFAULT_PENDING_MOVE_REFRESHES, SnapshotReport, StateStore};
use super::transaction::TransactionBuilder;

/// Base URL used when `SEQUENCER_URL` is not set.
pub const DEFAULT_SEQUENCER_URL: &str = "http://127.0.0.1:8080";

/// Environment variable holding the sequencer base URL.
pub const SEQUENCER_URL_ENV: &str = "SEQUENCER_URL";

/// Environment variable selecting a file-backed state cache.
pub const STATE_PATH_ENV: &str = "SEQUENCER_STATE_PATH";

/// The main client for a rollup sequencer.
///
/// Owns the pipeline from intent to submission (nonces, signing, `/rpc`)
/// and the local state store that snapshots and optimistic moves update.
/// Cloning is cheap; clones share the same store and nonce counters.
///
/// # Example
///
/// ```rust,no_run
/// use sequencer_kit::*;
///
/// #[tokio::main]
/// async fn main() -> Result<(), sequencer_kit::Error> {
///     // Read-only client (no signer)
///     let client = Sequencer::builder("http://127.0.0.1:8080").build()?;
///     client.refresh().await?;
///     println!("{} games", client.games().len());
///
///     // Client with a signer for transactions
///     let client = Sequencer::builder("http://127.0.0.1:8080")
///         .private_key("0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318")?
///         .build()?;
///     client.challenge("0xbbb", 4u64).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Sequencer {
    rpc: Arc<RpcClient>,
    signer: Option<Arc<dyn Signer>>,
    store: Arc<StateStore>,
    nonces: Arc<NonceManager>,
    rules: Arc<dyn RulesEngine>,
    pending_move_refreshes: u32,
}

impl Sequencer {
    /// Create a builder for the sequencer at `base_url`.
    pub fn builder(base_url: impl Into<String>) -> SequencerBuilder {
        SequencerBuilder::new(base_url)
    }

    /// Create a configured client from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `SEQUENCER_URL` (optional): base URL, defaults to `http://127.0.0.1:8080`.
    /// - `SEQUENCER_PRIVATE_KEY` (optional): hex secp256k1 key for signing.
    ///   Without it the client is read-only.
    /// - `SEQUENCER_STATE_PATH` (optional): file to persist the state cache in.
    ///   Without it state is kept in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if `SEQUENCER_PRIVATE_KEY` is not a valid key.
    pub fn from_env() -> Result<Sequencer, Error> {
        let url = std::env::var(SEQUENCER_URL_ENV).unwrap_or_else(|_| DEFAULT_SEQUENCER_URL.into());
        let private_key = std::env::var(PRIVATE_KEY_ENV).ok();
        let state_path = std::env::var(STATE_PATH_ENV).ok();

        let mut builder = Sequencer::builder(url);
        if let Some(key) = private_key {
            builder = builder.private_key(&key)?;
        }
        if let Some(path) = state_path {
            builder = builder.cache(FileCache::new(path));
        }
        builder.build()
    }

    /// Get the underlying RPC client.
    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Get the `/rpc` endpoint URL.
    pub fn url(&self) -> &str {
        self.rpc.url()
    }

    /// The signer's address, if a signer is configured.
    pub fn address(&self) -> Option<&Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    /// The shared local state store.
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn nonce_manager(&self) -> &NonceManager {
        &self.nonces
    }

    pub(crate) fn rules(&self) -> &dyn RulesEngine {
        self.rules.as_ref()
    }

    pub(crate) fn pending_move_refreshes(&self) -> u32 {
        self.pending_move_refreshes
    }

    /// The configured signer, or [`Error::NoSigner`].
    pub(crate) fn require_signer(&self) -> Result<&Arc<dyn Signer>, Error> {
        self.signer.as_ref().ok_or(Error::NoSigner)
    }

    // ========================================================================
    // Read Operations
    // ========================================================================

    /// Cached balance of `account`; zero if unknown.
    pub fn balance(&self, account: impl AsRef<str>) -> Result<Amount, Error> {
        Ok(self.store.balance(&Address::new(account)?))
    }

    pub fn game(&self, game_id: impl Into<GameId>) -> Option<Game> {
        self.store.game(&game_id.into())
    }

    pub fn games(&self) -> Vec<(GameId, Game)> {
        let mut games: Vec<_> = self.store.games().into_iter().collect();
        games.sort_by(|a, b| a.0.cmp(&b.0));
        games
    }

    /// Games the given account plays in.
    pub fn games_for(&self, account: impl AsRef<str>) -> Result<Vec<(GameId, Game)>, Error> {
        Ok(self.store.games_for(&Address::new(account)?))
    }

    pub fn pending_game(&self, game_id: impl Into<GameId>) -> Option<PendingGame> {
        self.store.pending_game(&game_id.into())
    }

    pub fn pending_games(&self) -> Vec<(GameId, PendingGame)> {
        let mut pending: Vec<_> = self.store.pending_games().into_iter().collect();
        pending.sort_by(|a, b| a.0.cmp(&b.0));
        pending
    }

    /// Withdrawals queued for the next batch.
    pub fn withdrawals(&self) -> Vec<(Address, Amount)> {
        self.store.withdrawals()
    }

    /// The nonce the sequencer last reported for `account`.
    pub fn cached_nonce(&self, account: impl AsRef<str>) -> Result<Option<u64>, Error> {
        Ok(self.store.cached_nonce(&Address::new(account)?))
    }

    /// Whether a locally applied move in `game_id` awaits confirmation.
    pub fn has_pending_move(&self, game_id: impl Into<GameId>) -> bool {
        self.store.has_pending_move(&game_id.into())
    }

    /// Fetch a snapshot and merge it into the local store.
    ///
    /// On failure the cached state is left untouched.
    pub async fn refresh(&self) -> Result<SnapshotReport, Error> {
        let snapshot = match self.rpc.fetch_state().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "state fetch failed, keeping cached state");
                return Err(e.into());
            }
        };

        if let Some(nonces) = &snapshot.nonces {
            for (account, nonce) in nonces {
                self.nonces.observe(account, *nonce);
            }
        }

        let report = self.store.apply_snapshot(snapshot);
        debug!(
            promoted = report.promoted.len(),
            committed = report.committed.len(),
            reverted = report.reverted.len(),
            "refreshed state"
        );
        Ok(report)
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Build, sign and submit a transaction.
    ///
    /// A `Transfer` without an explicit `from` is sent from the signer.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use sequencer_kit::*;
    /// # async fn example(client: Sequencer) -> Result<(), Error> {
    /// let tx = TransactionBuilder::transfer().to("0xbbb").amount("0x10");
    /// let receipt = client.send(tx).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send(&self, builder: TransactionBuilder) -> Result<Receipt, Error> {
        let signer = self.require_signer()?;
        let builder = match builder.kind() {
            TxKind::Transfer if !builder.has_from() => {
                builder.from(signer.address())
            }
            _ => builder,
        };
        let data = builder.build()?;
        self.submit_data(signer.as_ref(), data).await
    }

    /// Transfer `amount` from the signer to `receiver`.
    pub async fn transfer(
        &self,
        receiver: impl AsRef<str>,
        amount: impl IntoAmount,
    ) -> Result<Receipt, Error> {
        self.send(TransactionBuilder::transfer().to(receiver).amount(amount))
            .await
    }

    /// Move `amount` of the signer's balance into the next withdrawal batch.
    ///
    /// Rejected locally if the amount is zero or exceeds the cached balance.
    /// The balance check is skipped until a snapshot with balances arrives.
    pub async fn withdraw_tokens(&self, amount: impl IntoAmount) -> Result<Receipt, Error> {
        let signer = self.require_signer()?;
        let amount = amount.into_amount().map_err(ValidationError::from)?;

        if amount.is_zero() {
            return Err(ValidationError::ZeroAmount.into());
        }
        if self.store.has_balances() {
            let available = self.store.balance(signer.address());
            if amount > available {
                return Err(ValidationError::InsufficientBalance {
                    requested: amount.to_string(),
                    available: available.to_string(),
                }
                .into());
            }
        }

        self.submit_data(signer.as_ref(), TransactionData::WithdrawTokens(amount))
            .await
    }

    /// Reset the signer's nonce counter to the value the sequencer last
    /// reported, discarding nonces consumed by rejected transactions.
    pub fn resync_nonce(&self) -> Result<u64, Error> {
        let signer = self.require_signer()?;
        let nonce = self.store.cached_nonce(signer.address()).unwrap_or(0);
        self.nonces.reset(signer.address(), nonce);
        info!(account = %signer.address(), nonce, "nonce resynchronised");
        Ok(nonce)
    }

    /// Sequence, sign and submit a validated payload.
    pub(crate) async fn submit_data(
        &self,
        signer: &dyn Signer,
        data: TransactionData,
    ) -> Result<Receipt, Error> {
        if !data.is_sequencer_routed() {
            return Err(ValidationError::NotSequencerRouted(data.kind()).into());
        }

        let kind = data.kind();
        let nonce = self.nonces.next_nonce(signer.address());
        let tx = SequencedTransaction::new(data, nonce);
        let signed = sign_transaction(signer, tx).await?;

        match self.rpc.submit(&signed).await {
            Ok(receipt) => {
                info!(account = %signer.address(), %kind, nonce, "transaction accepted");
                Ok(receipt)
            }
            Err(e) => {
                warn!(account = %signer.address(), %kind, nonce, error = %e, "transaction failed");
                Err(e.into())
            }
        }
    }
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("rpc", &self.rpc)
            .field("address", &self.address())
            .field("pending_move_refreshes", &self.pending_move_refreshes)
            .finish()
    }
}

// ============================================================================
// SequencerBuilder
// ============================================================================

/// Builder for creating a configured [`Sequencer`] client.
///
/// # Example
///
/// ```rust,no_run
/// use sequencer_kit::*;
///
/// # fn example() -> Result<(), Error> {
/// let client = Sequencer::builder("https://sequencer.example.com")
///     .signer(LocalWallet::random())
///     .cache(FileCache::new("/tmp/sequencer-state.json"))
///     .retry_config(RetryConfig {
///         max_retries: 5,
///         initial_delay_ms: 200,
///         max_delay_ms: 2000,
///     })
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SequencerBuilder {
    base_url: String,
    signer: Option<Arc<dyn Signer>>,
    cache: Option<Box<dyn StateCache>>,
    store: Option<Arc<StateStore>>,
    rules: Arc<dyn RulesEngine>,
    retry_config: RetryConfig,
    pending_move_refreshes: u32,
}

impl SequencerBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            signer: None,
            cache: None,
            store: None,
            rules: Arc::new(StandardChess),
            retry_config: RetryConfig::default(),
            pending_move_refreshes: DEFAULT_PENDING_MOVE_REFRESHES,
        }
    }

    /// Set the signing capability.
    pub fn signer(mut self, signer: impl Signer + 'static) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    /// Sign with an in-memory key.
    pub fn private_key(mut self, private_key: impl AsRef<str>) -> Result<Self, Error> {
        self.signer = Some(Arc::new(LocalWallet::from_private_key(private_key)?));
        Ok(self)
    }

    /// Persist local state through `cache`. Defaults to memory.
    pub fn cache(mut self, cache: impl StateCache + 'static) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    /// Share an existing store. Takes precedence over [`cache`](Self::cache).
    pub fn store(mut self, store: Arc<StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the chess-rules engine.
    pub fn rules(mut self, rules: impl RulesEngine + 'static) -> Self {
        self.rules = Arc::new(rules);
        self
    }

    /// Set the retry configuration for state fetches.
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Snapshots an optimistic move may go unconfirmed before it is reverted.
    pub fn pending_move_refreshes(mut self, refreshes: u32) -> Self {
        self.pending_move_refreshes = refreshes;
        self
    }

    /// Build the client, loading the state cache.
    pub fn build(self) -> Result<Sequencer, Error> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("sequencer URL is empty".into()));
        }

        let store = match (self.store, self.cache) {
            (Some(store), _) => store,
            (None, Some(cache)) => Arc::new(StateStore::open(cache)),
            (None, None) => Arc::new(StateStore::open(MemoryCache::new())),
        };

        let nonces = NonceManager::new();
        for (account, nonce) in store.cached_nonces() {
            nonces.observe(&account, nonce);
        }

        Ok(Sequencer {
            rpc: Arc::new(RpcClient::with_retry_config(
                self.base_url,
                self.retry_config,
            )),
            signer: self.signer,
            store,
            nonces: Arc::new(nonces),
            rules: self.rules,
            pending_move_refreshes: self.pending_move_refreshes,
        })
    }
}
