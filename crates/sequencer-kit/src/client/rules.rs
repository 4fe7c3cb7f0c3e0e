//! Chess-rules collaborator used to validate optimistic moves.
//!
//! The client only enforces game status and turn order itself. Whether a
//! move is legal (piece paths, check, promotion) is delegated to a
//! [`RulesEngine`], with [`StandardChess`] as the default.

use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove, Piece, Square};

use crate::error::GameError;

/// Result of applying a legal move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayedMove {
    /// Board position after the move.
    pub board: String,
    /// Squares-only move encoding sent to the sequencer, e.g. `"e2e4"` or
    /// `"e7e8q"` for a promotion.
    pub san: String,
    /// Whether the position is checkmate or stalemate.
    pub finished: bool,
}

/// Decides move legality and computes the resulting position.
pub trait RulesEngine: Send + Sync {
    /// Play `from` → `to` on `board`.
    ///
    /// Returns [`GameError::IllegalMove`] if the move is not legal,
    /// [`GameError::InvalidSquare`] for unparseable squares and
    /// [`GameError::InvalidBoard`] if `board` cannot be read.
    fn play(&self, board: &str, from: &str, to: &str) -> Result<PlayedMove, GameError>;
}

/// Standard chess over FEN positions, backed by the `chess` crate.
///
/// A pawn reaching the last rank is promoted to a queen.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardChess;

impl RulesEngine for StandardChess {
    fn play(&self, board: &str, from: &str, to: &str) -> Result<PlayedMove, GameError> {
        let position =
            Board::from_str(board).map_err(|e| GameError::InvalidBoard(format!("{e:?}")))?;
        let source = parse_square(from)?;
        let dest = parse_square(to)?;

        let plain = ChessMove::new(source, dest, None);
        let (mv, promotion) = if position.legal(plain) {
            (plain, None)
        } else {
            let promoted = ChessMove::new(source, dest, Some(Piece::Queen));
            if !position.legal(promoted) {
                return Err(GameError::IllegalMove(format!("{from}{to}")));
            }
            (promoted, Some('q'))
        };

        let next = position.make_move_new(mv);
        let mut san = format!("{source}{dest}");
        if let Some(p) = promotion {
            san.push(p);
        }

        Ok(PlayedMove {
            board: next.to_string(),
            san,
            finished: next.status() != BoardStatus::Ongoing,
        })
    }
}

fn parse_square(s: &str) -> Result<Square, GameError> {
    let normalized = s.trim().to_ascii_lowercase();
    Square::from_str(&normalized).map_err(|_| GameError::InvalidSquare(s.to_string()))
}
