//! Server state as seen by the client: games, proposals, balances, claims.

use std::collections::HashMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use super::{Address, Amount, GameId, quantity};

/// Starting position of every game, in FEN.
pub const INITIAL_BOARD: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Status of a game that still accepts moves.
pub const ONGOING: &str = "ongoing";

/// A side of the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// The side to move after `turns` half-moves: even is white, odd is black.
    pub fn to_move(turns: u64) -> Side {
        if turns % 2 == 0 { Side::White } else { Side::Black }
    }

    pub fn opponent(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proposed game waiting for the second player.
///
/// `accepted` is `(white, black)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingGame {
    pub white: Address,
    pub black: Address,
    #[serde(default)]
    pub accepted: (bool, bool),
    pub wager: Amount,
}

impl PendingGame {
    /// The side that has not accepted yet. Black when the flags are unset.
    pub fn invitee_side(&self) -> Side {
        match self.accepted {
            (true, false) => Side::Black,
            (false, true) => Side::White,
            _ => Side::Black,
        }
    }

    /// The account expected to submit `StartGame`.
    pub fn invitee(&self) -> &Address {
        self.player(self.invitee_side())
    }

    /// The account that proposed the game.
    pub fn proposer(&self) -> &Address {
        self.player(self.invitee_side().opponent())
    }

    pub fn player(&self, side: Side) -> &Address {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }
}

/// An active or finished game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    #[serde(with = "quantity")]
    pub turns: u64,
    pub board: String,
    pub white: Address,
    pub black: Address,
    pub wager: Amount,
    #[serde(default = "ongoing")]
    pub status: String,
}

fn ongoing() -> String {
    ONGOING.to_string()
}

impl Game {
    /// A freshly started game at the initial position.
    pub fn new(white: Address, black: Address, wager: Amount) -> Self {
        Self {
            turns: 0,
            board: INITIAL_BOARD.to_string(),
            white,
            black,
            wager,
            status: ongoing(),
        }
    }

    pub fn is_ongoing(&self) -> bool {
        self.status == ONGOING
    }

    pub fn side_to_move(&self) -> Side {
        Side::to_move(self.turns)
    }

    pub fn player(&self, side: Side) -> &Address {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }

    /// The side `account` plays, if any.
    pub fn side_of(&self, account: &Address) -> Option<Side> {
        if &self.white == account {
            Some(Side::White)
        } else if &self.black == account {
            Some(Side::Black)
        } else {
            None
        }
    }

    pub fn is_turn_of(&self, account: &Address) -> bool {
        self.player(self.side_to_move()) == account
    }
}

/// A Merkle inclusion proof for one withdrawal leaf in a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    #[serde(with = "quantity")]
    pub index: u64,
    pub amount: Amount,
    pub proof: Vec<String>,
}

/// A settled withdrawal batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    #[serde(default)]
    pub claims: HashMap<Address, Claim>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

/// The game section of a snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_games: Option<HashMap<GameId, PendingGame>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub games: Option<HashMap<GameId, Game>>,
}

/// A full or partial state snapshot from `GET /rpc`.
///
/// Every field is optional because protocol revisions differ in what they
/// return. Fields the client does not use are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balances: Option<HashMap<Address, Amount>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "optional_nonces"
    )]
    pub nonces: Option<HashMap<Address, u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals: Option<Vec<(Address, Amount)>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batches: Option<Vec<Batch>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<GameState>,
}

mod optional_nonces {
    use std::collections::HashMap;

    use serde::{Deserialize, Deserializer, Serializer};

    use crate::types::{Address, quantity};

    #[derive(Deserialize)]
    struct Nonces(#[serde(deserialize_with = "quantity::map::deserialize")] HashMap<Address, u64>);

    pub fn serialize<S: Serializer>(
        v: &Option<HashMap<Address, u64>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match v {
            Some(map) => quantity::map::serialize(map, s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<HashMap<Address, u64>>, D::Error> {
        Ok(Option::<Nonces>::deserialize(d)?.map(|n| n.0))
    }
}
