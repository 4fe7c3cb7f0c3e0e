//! Core types for the rollup client.
//!
//! Addresses, amounts, transactions and the server state they act on.

mod address;
mod network;
mod signature;
mod state;
mod transaction;
mod units;

pub use address::{Address, GameId};
pub use network::Chain;
pub use signature::{PERSONAL_MESSAGE_PREFIX, Signature, hash_personal_message};
pub use state::{
    Batch, Claim, Game, GameState, INITIAL_BOARD, ONGOING, PendingGame, Side, StateSnapshot,
};
pub use transaction::{GameAction, SequencedTransaction, SignedTransaction, TransactionData, TxKind};
pub use units::{Amount, IntoAmount, quantity};
