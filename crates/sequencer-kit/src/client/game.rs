//! Game state machine: turn checks, optimistic moves and rollback.
//!
//! A move goes through [`check_turn`], then the [`RulesEngine`], and is
//! written into the store before the sequencer has seen it. The pending
//! record left next to the game lets a later snapshot commit or revert it.
//! A move that fails to sign or submit is rolled back immediately.

use tracing::{debug, info, warn};

use crate::error::{Error, GameError};
use crate::types::{Address, Game, GameId, Side};

use super::rpc::Receipt;
use super::rules::{PlayedMove, RulesEngine};
use super::sequencer::Sequencer;
use super::store::{LocalState, PendingMove};
use super::transaction::TransactionBuilder;

/// Check that `player` may move in `game` now, returning their side.
///
/// Checks run in order: the game must be ongoing, `player` must be one of
/// the two players, and `player` must own the side to move. An account
/// playing both sides moves for whichever side is to move.
pub fn check_turn(game_id: &GameId, game: &Game, player: &Address) -> Result<Side, GameError> {
    check_participant(game_id, game, player)?;
    let expected = game.side_to_move();
    if !game.is_turn_of(player) {
        return Err(GameError::NotYourTurn { expected });
    }
    Ok(expected)
}

/// Check that `game` is ongoing and `player` is in it, regardless of turn.
fn check_participant(game_id: &GameId, game: &Game, player: &Address) -> Result<(), GameError> {
    if !game.is_ongoing() {
        return Err(GameError::GameOver {
            game_id: game_id.clone(),
            status: game.status.clone(),
        });
    }
    if game.side_of(player).is_none() {
        return Err(GameError::NotAPlayer(player.clone()));
    }
    Ok(())
}

/// Validate and apply a move to `state`, recording it as pending.
///
/// Leaves `state` untouched on error.
pub(crate) fn apply_move(
    state: &mut LocalState,
    rules: &dyn RulesEngine,
    game_id: &GameId,
    player: &Address,
    from: &str,
    to: &str,
    refreshes: u32,
) -> Result<PlayedMove, GameError> {
    let game = state
        .games
        .get(game_id)
        .ok_or_else(|| GameError::UnknownGame(game_id.clone()))?;
    check_turn(game_id, game, player)?;
    let played = rules.play(&game.board, from, to)?;

    let confirmed = game.clone();
    let mut next = confirmed.clone();
    next.board = played.board.clone();
    next.turns += 1;

    state.pending_moves.insert(
        game_id.clone(),
        PendingMove {
            san: played.san.clone(),
            expected_turns: next.turns,
            confirmed,
            refreshes_left: refreshes,
        },
    );
    state.games.insert(game_id.clone(), next);
    Ok(played)
}

/// Undo the pending move `san` in `game_id`, if it is still pending.
///
/// Returns whether anything was restored.
pub(crate) fn rollback_move(state: &mut LocalState, game_id: &GameId, san: &str) -> bool {
    let Some(pending) = state.pending_moves.get(game_id) else {
        return false;
    };
    if pending.san != san {
        return false;
    }
    let Some(pending) = state.pending_moves.remove(game_id) else {
        return false;
    };
    state.games.insert(game_id.clone(), pending.confirmed);
    true
}

impl Sequencer {
    /// Move a piece in `game_id` from one square to another.
    ///
    /// The new position is visible in the store before the sequencer
    /// answers. If signing or submission fails the game is restored to its
    /// last confirmed state and the error is returned. Local refusals
    /// ([`GameError`]) never build a transaction.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use sequencer_kit::*;
    /// # async fn example(client: Sequencer) -> Result<(), Error> {
    /// client.make_move("g1", "e2", "e4").await?;
    /// assert_eq!(client.game("g1").unwrap().turns, 1);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn make_move(
        &self,
        game_id: impl Into<GameId>,
        from: &str,
        to: &str,
    ) -> Result<Receipt, Error> {
        let signer = self.require_signer()?;
        let game_id = game_id.into();
        let player = signer.address().clone();

        let played = self.store().mutate(|state| {
            apply_move(
                state,
                self.rules(),
                &game_id,
                &player,
                from,
                to,
                self.pending_move_refreshes(),
            )
        })?;
        debug!(%game_id, san = %played.san, finished = played.finished, "move applied locally");

        let result = match TransactionBuilder::chess_move(&game_id)
            .san(&played.san)
            .build()
        {
            Ok(data) => self.submit_data(signer.as_ref(), data).await,
            Err(e) => Err(e.into()),
        };

        if let Err(e) = &result {
            let restored = self
                .store()
                .mutate(|state| Ok::<_, GameError>(rollback_move(state, &game_id, &played.san)))
                .unwrap_or(false);
            if restored {
                warn!(%game_id, san = %played.san, error = %e, "move rolled back");
            }
        }
        result
    }

    /// Resign an ongoing game the signer plays in.
    pub async fn resign(&self, game_id: impl Into<GameId>) -> Result<Receipt, Error> {
        let signer = self.require_signer()?;
        let game_id = game_id.into();
        self.check_participant(&game_id, signer.address())?;

        let data = TransactionBuilder::resign(&game_id).build()?;
        let receipt = self.submit_data(signer.as_ref(), data).await?;
        info!(%game_id, "resigned");
        Ok(receipt)
    }

    /// Claim the win in an ongoing game the signer plays in.
    pub async fn claim_win(&self, game_id: impl Into<GameId>) -> Result<Receipt, Error> {
        let signer = self.require_signer()?;
        let game_id = game_id.into();
        self.check_participant(&game_id, signer.address())?;

        let data = TransactionBuilder::claim_win(&game_id).build()?;
        self.submit_data(signer.as_ref(), data).await
    }

    fn check_participant(&self, game_id: &GameId, player: &Address) -> Result<(), GameError> {
        let game = self
            .store()
            .game(game_id)
            .ok_or_else(|| GameError::UnknownGame(game_id.clone()))?;
        check_participant(game_id, &game, player)
    }
}
