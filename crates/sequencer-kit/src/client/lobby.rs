//! Pending game registry: proposals, invitations and acceptance.
//!
//! A pending game only becomes an active game when a snapshot shows it in
//! `games`. Nothing here writes to the store.

use std::collections::HashMap;

use tracing::info;

use crate::error::{Error, GameError, ValidationError};
use crate::types::{Address, GameAction, GameId, IntoAmount, PendingGame, TransactionData};

use super::rpc::Receipt;
use super::sequencer::Sequencer;
use super::transaction::TransactionBuilder;

/// Pending games where `account` is the one expected to accept, by id.
pub fn invitations_for(
    pending: &HashMap<GameId, PendingGame>,
    account: &Address,
) -> Vec<(GameId, PendingGame)> {
    select(pending, |game| game.invitee() == account)
}

/// Pending games `account` proposed and is waiting on, by id.
pub fn proposals_by(
    pending: &HashMap<GameId, PendingGame>,
    account: &Address,
) -> Vec<(GameId, PendingGame)> {
    select(pending, |game| game.proposer() == account)
}

fn select(
    pending: &HashMap<GameId, PendingGame>,
    keep: impl Fn(&PendingGame) -> bool,
) -> Vec<(GameId, PendingGame)> {
    let mut out: Vec<_> = pending
        .iter()
        .filter(|(_, game)| keep(game))
        .map(|(id, game)| (id.clone(), game.clone()))
        .collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

/// Check that `account` may accept `game_id`.
pub fn check_invitee(
    pending: &HashMap<GameId, PendingGame>,
    game_id: &GameId,
    account: &Address,
) -> Result<(), GameError> {
    let game = pending
        .get(game_id)
        .ok_or_else(|| GameError::UnknownPendingGame(game_id.clone()))?;
    if game.invitee() != account {
        return Err(GameError::NotInvitee {
            game_id: game_id.clone(),
            invitee: game.invitee().clone(),
        });
    }
    Ok(())
}

impl Sequencer {
    /// Propose a wagered game between `white` and `black`.
    ///
    /// The signer must be one of the two. The game shows up in
    /// [`pending_games`](Self::pending_games) after the next refresh.
    pub async fn propose_game(
        &self,
        white: impl AsRef<str>,
        black: impl AsRef<str>,
        wager: impl IntoAmount,
    ) -> Result<Receipt, Error> {
        let signer = self.require_signer()?;
        let data = TransactionBuilder::propose_game()
            .white(white)
            .black(black)
            .wager(wager)
            .build()?;

        if let TransactionData::Extension(GameAction::ProposeGame { white, black, .. }) = &data {
            let me = signer.address();
            if white != me && black != me {
                return Err(ValidationError::NotAPlayer(me.clone()).into());
            }
        }

        let receipt = self.submit_data(signer.as_ref(), data).await?;
        info!(receipt = %receipt.body, "game proposed");
        Ok(receipt)
    }

    /// Propose a game against `opponent`, playing white.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use sequencer_kit::*;
    /// # async fn example(client: Sequencer) -> Result<(), Error> {
    /// client.challenge("0xbbb", 4u64).await?;
    /// client.refresh().await?;
    /// for (id, game) in client.pending_games() {
    ///     println!("{id}: {} vs {}", game.white, game.black);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn challenge(
        &self,
        opponent: impl AsRef<str>,
        wager: impl IntoAmount,
    ) -> Result<Receipt, Error> {
        let me = self.require_signer()?.address().clone();
        self.propose_game(me, opponent, wager).await
    }

    /// Accept a pending game the signer was invited to.
    ///
    /// Fails locally unless the game is a known pending game and the signer
    /// is its invitee. The game stays pending until a snapshot promotes it.
    pub async fn accept_game(&self, game_id: impl Into<GameId>) -> Result<Receipt, Error> {
        let signer = self.require_signer()?;
        let game_id = game_id.into();
        check_invitee(&self.store().pending_games(), &game_id, signer.address())?;

        let data = TransactionBuilder::start_game(&game_id).build()?;
        let receipt = self.submit_data(signer.as_ref(), data).await?;
        info!(%game_id, "game accepted");
        Ok(receipt)
    }

    /// Pending games waiting on `account` to accept.
    pub fn invitations_for(
        &self,
        account: impl AsRef<str>,
    ) -> Result<Vec<(GameId, PendingGame)>, Error> {
        Ok(invitations_for(
            &self.store().pending_games(),
            &Address::new(account)?,
        ))
    }

    /// Pending games `account` proposed.
    pub fn proposals_by(
        &self,
        account: impl AsRef<str>,
    ) -> Result<Vec<(GameId, PendingGame)>, Error> {
        Ok(proposals_by(
            &self.store().pending_games(),
            &Address::new(account)?,
        ))
    }
}
