//! Error types for sequencer-kit.
//!
//! # Error Hierarchy
//!
//! - [`Error`](enum@Error) — Main error type, returned by every client action
//!   - [`ValidationError`] — Missing or malformed intent fields
//!   - [`SignerError`] — Signing capability failures and declined requests
//!   - [`RpcError`] — Transport failures and application rejections from `/rpc`
//!   - [`GameError`] — Moves and acceptances refused by the local game view
//!   - [`CacheError`] — Local state cache read/write failures
//!   - [`ParseAddressError`] — Invalid account address
//!   - [`ParseAmountError`] — Invalid monetary amount
//!
//! # Error Handling Examples
//!
//! ## Distinguishing Sequencer Rejections
//!
//! ```rust,no_run
//! use sequencer_kit::*;
//!
//! # async fn example(client: Sequencer) -> Result<(), Error> {
//! match client.challenge("0xbbb", 4u64).await {
//!     Ok(receipt) => println!("accepted: {}", receipt.body),
//!     Err(Error::Rpc(RpcError::Conflict(message))) => {
//!         println!("already proposed, refresh and retry: {message}");
//!     }
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

use crate::types::{Address, GameId, Side, TxKind};

/// Error parsing an account address.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseAddressError {
    #[error("Address is empty")]
    Empty,

    #[error("Address '{0}' contains whitespace")]
    Whitespace(String),
}

/// Error parsing a monetary amount.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseAmountError {
    #[error("Amount is empty")]
    Empty,

    #[error("Invalid hex amount: '{0}'")]
    InvalidHex(String),

    #[error("Invalid number in amount: '{0}'")]
    InvalidNumber(String),
}

/// Validation failures raised before any nonce is consumed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{kind} transaction is missing required field '{field}'")]
    MissingField { kind: TxKind, field: &'static str },

    #[error(transparent)]
    InvalidAddress(#[from] ParseAddressError),

    #[error(transparent)]
    InvalidAmount(#[from] ParseAmountError),

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: String, available: String },

    #[error("{0} transactions are not routed through the sequencer")]
    NotSequencerRouted(TxKind),

    #[error("{0} transactions are not routed through the bridge contract")]
    NotSettlementRouted(TxKind),

    #[error("Account {0} must be one of the two players")]
    NotAPlayer(Address),
}

/// Errors from the signing capability.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("Signature request declined: {0}")]
    Declined(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Key file error: {0}")]
    KeyFile(String),
}

/// Errors from the sequencer's `/rpc` endpoint.
///
/// Transport failures (`Http`, `Network`, `Timeout`) leave the outcome of a
/// submission unknown. `Malformed`, `Conflict` and `Unavailable` are
/// application-level rejections returned by the sequencer itself.
#[derive(Debug, Error)]
pub enum RpcError {
    // ─── Network/Transport ───
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network error: {message}")]
    Network {
        message: String,
        status_code: Option<u16>,
        retryable: bool,
    },

    #[error("Timeout after {0} attempts")]
    Timeout(u32),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    // ─── Application rejections ───
    #[error("Rejected as malformed (400): {0}")]
    Malformed(String),

    #[error("Conflict (409): {0}")]
    Conflict(String),

    #[error("Target unreachable (503): {0}")]
    Unavailable(String),
}

impl RpcError {
    /// Create a network error.
    pub fn network(message: impl Into<String>, status_code: Option<u16>, retryable: bool) -> Self {
        Self::Network {
            message: message.into(),
            status_code,
            retryable,
        }
    }

    /// Whether the request may succeed if issued again later.
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Http(e) => e.is_timeout() || e.is_connect(),
            RpcError::Network { retryable, .. } => *retryable,
            RpcError::Timeout(_) | RpcError::Unavailable(_) => true,
            RpcError::Json(_)
            | RpcError::InvalidResponse(_)
            | RpcError::Malformed(_)
            | RpcError::Conflict(_) => false,
        }
    }

    /// Whether the sequencer answered and refused the request.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            RpcError::Malformed(_) | RpcError::Conflict(_) | RpcError::Unavailable(_)
        )
    }
}

/// Local game-view refusals. None of these consume a nonce or touch state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("Unknown game: {0}")]
    UnknownGame(GameId),

    #[error("Game {game_id} is over ({status})")]
    GameOver { game_id: GameId, status: String },

    #[error("Not your turn: {expected} to move")]
    NotYourTurn { expected: Side },

    #[error("Account {0} is not playing this game")]
    NotAPlayer(Address),

    #[error("Illegal move: {0}")]
    IllegalMove(String),

    #[error("Invalid square: '{0}'")]
    InvalidSquare(String),

    #[error("Invalid board position: {0}")]
    InvalidBoard(String),

    #[error("Unknown pending game: {0}")]
    UnknownPendingGame(GameId),

    #[error("Only the invited player ({invitee}) can accept game {game_id}")]
    NotInvitee { game_id: GameId, invitee: Address },
}

/// Errors reading or writing the local state cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Main error type for sequencer-kit operations.
#[derive(Debug, Error)]
pub enum Error {
    // ─── Configuration ───
    #[error("No signer configured. Call .signer() or .private_key() on SequencerBuilder.")]
    NoSigner,

    #[error("Invalid configuration: {0}")]
    Config(String),

    // ─── Parsing ───
    #[error(transparent)]
    ParseAddress(#[from] ParseAddressError),

    #[error(transparent)]
    ParseAmount(#[from] ParseAmountError),

    // ─── Intent ───
    #[error("Invalid transaction: {0}")]
    Validation(#[from] ValidationError),

    // ─── Signing ───
    #[error("Signing failed: {0}")]
    Signing(#[from] SignerError),

    // ─── RPC ───
    #[error(transparent)]
    Rpc(#[from] RpcError),

    // ─── Game ───
    #[error(transparent)]
    Game(#[from] GameError),

    // ─── Cache ───
    #[error(transparent)]
    Cache(#[from] CacheError),

    // ─── Settlement ───
    #[error("No claim for {account} in batch {batch_index}")]
    NoClaim { batch_index: u64, account: Address },

    #[error("No settlement contract known for chain id {0}")]
    UnsupportedChain(u64),

    #[error("Settlement call failed: {0}")]
    Settlement(String),
}
