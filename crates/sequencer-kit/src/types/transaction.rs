//! Transaction types and their canonical JSON encoding.
//!
//! The signature covers the exact JSON text of a [`SequencedTransaction`], so
//! the encoding here is the protocol. Variants are serde externally tagged
//! and fields are emitted in declaration order with no whitespace:
//!
//! ```json
//! {"data":{"Extension":{"Move":{"game_id":"g1","san":"e2e4"}}},"nonce":"0x0"}
//! ```

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use super::{Address, Amount, GameId, Signature, quantity};
use crate::error::SignerError;

/// Discriminant of a transaction variant, for errors and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TxKind {
    Transfer,
    WithdrawTokens,
    BridgeTokens,
    ProposeGame,
    StartGame,
    Move,
    Resign,
    ClaimWin,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Transfer => "Transfer",
            TxKind::WithdrawTokens => "WithdrawTokens",
            TxKind::BridgeTokens => "BridgeTokens",
            TxKind::ProposeGame => "ProposeGame",
            TxKind::StartGame => "StartGame",
            TxKind::Move => "Move",
            TxKind::Resign => "Resign",
            TxKind::ClaimWin => "ClaimWin",
        }
    }
}

impl Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Game operations, nested under [`TransactionData::Extension`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    /// Propose a wagered game. The proposer counts as having accepted.
    ProposeGame {
        white: Address,
        black: Address,
        wager: Amount,
    },
    /// Accept a pending game as the invited player.
    StartGame(GameId),
    /// Move a piece. `san` is the source and destination squares, e.g. `"e2e4"`.
    Move { game_id: GameId, san: String },
    Resign(GameId),
    ClaimWin(GameId),
}

/// The payload of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionData {
    /// L1 deposit. Settled through the bridge contract, never the sequencer.
    BridgeTokens(Amount),
    /// Burn an L2 balance into the next withdrawal batch.
    WithdrawTokens(Amount),
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },
    Extension(GameAction),
}

impl TransactionData {
    pub fn kind(&self) -> TxKind {
        match self {
            TransactionData::BridgeTokens(_) => TxKind::BridgeTokens,
            TransactionData::WithdrawTokens(_) => TxKind::WithdrawTokens,
            TransactionData::Transfer { .. } => TxKind::Transfer,
            TransactionData::Extension(action) => match action {
                GameAction::ProposeGame { .. } => TxKind::ProposeGame,
                GameAction::StartGame(_) => TxKind::StartGame,
                GameAction::Move { .. } => TxKind::Move,
                GameAction::Resign(_) => TxKind::Resign,
                GameAction::ClaimWin(_) => TxKind::ClaimWin,
            },
        }
    }

    /// Whether this payload is submitted to the sequencer's `/rpc` endpoint.
    pub fn is_sequencer_routed(&self) -> bool {
        match self {
            TransactionData::BridgeTokens(_) => false,
            TransactionData::WithdrawTokens(_)
            | TransactionData::Transfer { .. }
            | TransactionData::Extension(_) => true,
        }
    }

    /// The game this payload refers to, if any.
    pub fn game_id(&self) -> Option<&GameId> {
        match self {
            TransactionData::Extension(
                GameAction::StartGame(id)
                | GameAction::Move { game_id: id, .. }
                | GameAction::Resign(id)
                | GameAction::ClaimWin(id),
            ) => Some(id),
            TransactionData::Extension(GameAction::ProposeGame { .. })
            | TransactionData::BridgeTokens(_)
            | TransactionData::WithdrawTokens(_)
            | TransactionData::Transfer { .. } => None,
        }
    }
}

/// A payload paired with the sender's nonce. This is what gets signed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedTransaction {
    pub data: TransactionData,
    #[serde(with = "quantity")]
    pub nonce: u64,
}

impl SequencedTransaction {
    pub fn new(data: TransactionData, nonce: u64) -> Self {
        Self { data, nonce }
    }

    /// The canonical JSON text covered by the signature.
    pub fn signing_payload(&self) -> String {
        serde_json::to_string(self).expect("transaction serialization should never fail")
    }
}

/// A signed transaction, as posted to `/rpc`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub pub_key: Address,
    pub sig: Signature,
    pub tx: SequencedTransaction,
}

impl SignedTransaction {
    /// Recover the address that signed `tx`.
    pub fn recover_signer(&self) -> Result<Address, SignerError> {
        self.sig.recover(self.tx.signing_payload().as_bytes())
    }

    /// Whether `sig` was produced by `pub_key` over the canonical payload.
    pub fn verify(&self) -> bool {
        self.recover_signer()
            .is_ok_and(|signer| signer == self.pub_key)
    }
}
