//! Client module for talking to a rollup sequencer.
//!
//! This module provides the core client infrastructure:
//!
//! - [`Sequencer`] — The main client, the single entry point for all operations
//! - [`SequencerBuilder`] — Fluent builder for configuring the client
//! - [`RpcClient`] — Low-level `/rpc` client with retry logic for reads
//! - [`StateStore`] — Local copy of server state, with optimistic moves
//!
//! # Signers
//!
//! Signers produce EIP-191 personal-message signatures over the canonical
//! transaction payload:
//!
//! | Signer | Use Case |
//! |--------|----------|
//! | [`LocalWallet`] | Scripts and tests with a key in memory |
//! | [`FileWallet`] | Load from `~/.sequencer-kit/keys/<name>.json` |
//! | [`EnvWallet`] | CI/CD via the `SEQUENCER_PRIVATE_KEY` env var |
//!
//! # State caches
//!
//! | Cache | Use Case |
//! |-------|----------|
//! | [`MemoryCache`] | Default; state lives as long as the process |
//! | [`FileCache`] | Persist the store as one JSON file across runs |

mod cache;
mod game;
mod lobby;
mod nonce_manager;
mod rpc;
mod rules;
mod sequencer;
mod signer;
mod store;
mod transaction;
mod withdrawal;

pub use cache::{DEFAULT_CACHE_NAME, FileCache, MemoryCache, StateCache};
pub use game::check_turn;
pub use lobby::{check_invitee, invitations_for, proposals_by};
pub use nonce_manager::NonceManager;
pub use rpc::{Receipt, RetryConfig, RpcClient};
pub use rules::{PlayedMove, RulesEngine, StandardChess};
pub use sequencer::{
    DEFAULT_SEQUENCER_URL, SEQUENCER_URL_ENV, STATE_PATH_ENV, Sequencer, SequencerBuilder,
};
pub use signer::{
    EnvWallet, FileWallet, LocalWallet, PRIVATE_KEY_ENV, SignFuture, Signer, sign_transaction,
};
pub use store::{
    DEFAULT_PENDING_MOVE_REFRESHES, LocalState, PendingMove, SnapshotReport, StateStore,
};
pub use transaction::TransactionBuilder;
pub use withdrawal::{RedemptionCall, SettlementConfig, SettlementContract};
