//! A typed Rust client for a chess-wager rollup sequencer.
//!
//! **sequencer-kit** turns user intents into signed, nonce-sequenced
//! transactions, submits them to a sequencer's `/rpc` endpoint and keeps a
//! local copy of the server state, including moves applied before the
//! sequencer has confirmed them.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sequencer_kit::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sequencer_kit::Error> {
//!     // Configure once
//!     let client = Sequencer::builder("http://127.0.0.1:8080")
//!         .signer(EnvWallet::new()?)
//!         .build()?;
//!
//!     // Pull the latest snapshot
//!     client.refresh().await?;
//!     let me = client.address().unwrap().clone();
//!     println!("Balance: {}", client.balance(&me)?);
//!
//!     // Play
//!     client.make_move("g1", "e2", "e4").await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Design Principles
//!
//! 1. **Single entry point**: Everything hangs off the [`Sequencer`] client
//! 2. **Configure once**: Endpoint, signer and cache set at client creation
//! 3. **Canonical payloads**: The same intent always signs the same bytes
//! 4. **Local checks first**: Nothing is signed or sent for a move the
//!    local view already refuses
//! 5. **Server wins**: Optimistic moves are reconciled against snapshots
//!
//! # Core Types
//!
//! - [`Address`] - Normalized account address
//! - [`Amount`] - Token amount, hex-encoded on the wire
//! - [`TransactionData`] - Closed set of transaction payloads
//! - [`SignedTransaction`] - The envelope posted to `/rpc`
//! - [`Game`], [`PendingGame`] - Server game state
//!
//! # String Parsing
//!
//! Addresses and amounts parse from the strings users type:
//!
//! ```
//! use sequencer_kit::{Address, Amount};
//!
//! let account: Address = "0xAAA".parse().unwrap();
//! assert_eq!(account.as_str(), "0xaaa");
//!
//! let wager: Amount = "4".parse().unwrap();
//! assert_eq!(wager.to_hex(), "0x4");
//! ```

pub mod client;
pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{
    CacheError, Error, GameError, ParseAddressError, ParseAmountError, RpcError, SignerError,
    ValidationError,
};
pub use types::*;

// Re-export client types
pub use client::{
    EnvWallet, FileCache, FileWallet, LocalWallet, MemoryCache, NonceManager, PlayedMove,
    Receipt, RedemptionCall, RetryConfig, RpcClient, RulesEngine, Sequencer, SequencerBuilder,
    SettlementConfig, SettlementContract, SignFuture, Signer, SnapshotReport, StandardChess,
    StateCache, StateStore, TransactionBuilder,
};
