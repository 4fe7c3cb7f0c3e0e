//! Transaction builder.
//!
//! Turns a user intent into a canonical [`TransactionData`]: addresses are
//! lower-cased, amounts are canonical hex, and missing fields are reported
//! instead of defaulted.
//!
//! # Example
//!
//! ```rust
//! use sequencer_kit::*;
//!
//! let data = TransactionBuilder::transfer()
//!     .from("0xAAA")
//!     .to("0xBBB")
//!     .amount(4u64)
//!     .build()
//!     .unwrap();
//!
//! let tx = SequencedTransaction::new(data, 0);
//! assert_eq!(
//!     tx.signing_payload(),
//!     r#"{"data":{"Transfer":{"from":"0xaaa","to":"0xbbb","amount":"0x4"}},"nonce":"0x0"}"#,
//! );
//! ```

use crate::error::{ParseAmountError, ValidationError};
use crate::types::{
    Address, Amount, GameAction, GameId, IntoAmount, SequencedTransaction, TransactionData, TxKind,
};

use super::nonce_manager::NonceManager;

/// Fluent builder for a single transaction payload.
///
/// Field setters never fail; all validation happens in
/// [`build`](Self::build), so nothing is consumed for an invalid intent.
#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    kind: TxKind,
    from: Option<String>,
    to: Option<String>,
    white: Option<String>,
    black: Option<String>,
    amount: Option<Result<Amount, ParseAmountError>>,
    game_id: Option<GameId>,
    san: Option<String>,
}

impl TransactionBuilder {
    /// Start a builder for the given variant.
    pub fn new(kind: TxKind) -> Self {
        Self {
            kind,
            from: None,
            to: None,
            white: None,
            black: None,
            amount: None,
            game_id: None,
            san: None,
        }
    }

    pub fn transfer() -> Self {
        Self::new(TxKind::Transfer)
    }

    pub fn withdraw_tokens() -> Self {
        Self::new(TxKind::WithdrawTokens)
    }

    pub fn bridge_tokens() -> Self {
        Self::new(TxKind::BridgeTokens)
    }

    pub fn propose_game() -> Self {
        Self::new(TxKind::ProposeGame)
    }

    /// Accept a pending game.
    pub fn start_game(game_id: impl Into<GameId>) -> Self {
        Self::new(TxKind::StartGame).game_id(game_id)
    }

    pub fn chess_move(game_id: impl Into<GameId>) -> Self {
        Self::new(TxKind::Move).game_id(game_id)
    }

    pub fn resign(game_id: impl Into<GameId>) -> Self {
        Self::new(TxKind::Resign).game_id(game_id)
    }

    pub fn claim_win(game_id: impl Into<GameId>) -> Self {
        Self::new(TxKind::ClaimWin).game_id(game_id)
    }

    /// The variant being built.
    pub fn kind(&self) -> TxKind {
        self.kind
    }

    // ========================================================================
    // Fields
    // ========================================================================

    pub fn from(mut self, account: impl AsRef<str>) -> Self {
        self.from = Some(account.as_ref().to_string());
        self
    }

    pub fn to(mut self, account: impl AsRef<str>) -> Self {
        self.to = Some(account.as_ref().to_string());
        self
    }

    pub fn white(mut self, account: impl AsRef<str>) -> Self {
        self.white = Some(account.as_ref().to_string());
        self
    }

    pub fn black(mut self, account: impl AsRef<str>) -> Self {
        self.black = Some(account.as_ref().to_string());
        self
    }

    /// Set the amount. Also used as the wager of a `ProposeGame`.
    pub fn amount(mut self, amount: impl IntoAmount) -> Self {
        self.amount = Some(amount.into_amount());
        self
    }

    /// Alias of [`amount`](Self::amount) for game proposals.
    pub fn wager(self, wager: impl IntoAmount) -> Self {
        self.amount(wager)
    }

    pub fn game_id(mut self, game_id: impl Into<GameId>) -> Self {
        self.game_id = Some(game_id.into());
        self
    }

    /// Set the squares-only move encoding directly, e.g. `"e2e4"`.
    pub fn san(mut self, san: impl Into<String>) -> Self {
        self.san = Some(san.into());
        self
    }

    /// Set the move from its source and destination squares.
    pub fn squares(self, from: &str, to: &str) -> Self {
        self.san(format!("{}{}", from.trim(), to.trim()).to_ascii_lowercase())
    }

    /// Whether `from` was set explicitly.
    pub(crate) fn has_from(&self) -> bool {
        self.from.is_some()
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Validate the intent and produce the payload.
    pub fn build(self) -> Result<TransactionData, ValidationError> {
        let kind = self.kind;
        let data = match kind {
            TxKind::Transfer => TransactionData::Transfer {
                from: address(kind, "from", self.from)?,
                to: address(kind, "to", self.to)?,
                amount: amount(kind, "amount", self.amount)?,
            },
            TxKind::WithdrawTokens => {
                TransactionData::WithdrawTokens(amount(kind, "amount", self.amount)?)
            }
            TxKind::BridgeTokens => {
                TransactionData::BridgeTokens(amount(kind, "amount", self.amount)?)
            }
            TxKind::ProposeGame => TransactionData::Extension(GameAction::ProposeGame {
                white: address(kind, "white", self.white)?,
                black: address(kind, "black", self.black)?,
                wager: amount(kind, "wager", self.amount)?,
            }),
            TxKind::StartGame => {
                TransactionData::Extension(GameAction::StartGame(game_id(kind, self.game_id)?))
            }
            TxKind::Move => {
                let game_id = game_id(kind, self.game_id)?;
                let san = self
                    .san
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .ok_or(ValidationError::MissingField { kind, field: "san" })?;
                TransactionData::Extension(GameAction::Move { game_id, san })
            }
            TxKind::Resign => {
                TransactionData::Extension(GameAction::Resign(game_id(kind, self.game_id)?))
            }
            TxKind::ClaimWin => {
                TransactionData::Extension(GameAction::ClaimWin(game_id(kind, self.game_id)?))
            }
        };
        Ok(data)
    }

    /// Validate, then pair the payload with `account`'s next nonce.
    ///
    /// The nonce is only consumed when validation succeeds.
    pub fn build_sequenced(
        self,
        account: &Address,
        nonces: &NonceManager,
    ) -> Result<SequencedTransaction, ValidationError> {
        let data = self.build()?;
        Ok(SequencedTransaction::new(data, nonces.next_nonce(account)))
    }
}

fn address(
    kind: TxKind,
    field: &'static str,
    value: Option<String>,
) -> Result<Address, ValidationError> {
    let value = value.ok_or(ValidationError::MissingField { kind, field })?;
    Ok(Address::new(value)?)
}

fn amount(
    kind: TxKind,
    field: &'static str,
    value: Option<Result<Amount, ParseAmountError>>,
) -> Result<Amount, ValidationError> {
    Ok(value.ok_or(ValidationError::MissingField { kind, field })??)
}

fn game_id(kind: TxKind, value: Option<GameId>) -> Result<GameId, ValidationError> {
    value
        .filter(|id| !id.as_str().is_empty())
        .ok_or(ValidationError::MissingField {
            kind,
            field: "game_id",
        })
}
