//! In-process sequencer serving `GET/POST /rpc` for integration tests.
//!
//! Applies transactions the way the real sequencer does as far as the
//! client can observe: signature and nonce checks, proposals, acceptance,
//! moves and resignation. Responses can be forced to exercise rejections.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chess::{Board, BoardStatus, ChessMove};
use sequencer_kit::*;

type Shared = Arc<Mutex<Ledger>>;

/// Server-side state.
#[derive(Default)]
pub struct Ledger {
    pub balances: HashMap<Address, Amount>,
    pub nonces: HashMap<Address, u64>,
    pub withdrawals: Vec<(Address, Amount)>,
    pub batches: Vec<Batch>,
    pub pending_games: HashMap<GameId, PendingGame>,
    pub games: HashMap<GameId, Game>,
    /// Every well-formed transaction posted, accepted or not.
    pub received: Vec<SignedTransaction>,
    /// Answer the next POST with this instead of applying it.
    pub forced: Option<(StatusCode, String)>,
    /// Accept moves with 200 but never apply them.
    pub drop_moves: bool,
    next_game: u64,
}

impl Ledger {
    fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            balances: Some(self.balances.clone()),
            nonces: Some(self.nonces.clone()),
            withdrawals: Some(self.withdrawals.clone()),
            batches: Some(self.batches.clone()),
            state: Some(GameState {
                pending_games: Some(self.pending_games.clone()),
                games: Some(self.games.clone()),
            }),
        }
    }

    fn apply(&mut self, stx: &SignedTransaction) -> Result<String, (StatusCode, String)> {
        let sender = &stx.pub_key;
        match &stx.tx.data {
            TransactionData::BridgeTokens(_) => Err(bad_request("bridge deposits come from L1")),
            TransactionData::WithdrawTokens(amount) => {
                self.debit(sender, amount)?;
                self.withdrawals.push((sender.clone(), amount.clone()));
                Ok("ok".into())
            }
            TransactionData::Transfer { from, to, amount } => {
                if from != sender {
                    return Err(bad_request("not the sender"));
                }
                self.debit(from, amount)?;
                let credited = self.balances.get(to).cloned().unwrap_or_default() + amount.clone();
                self.balances.insert(to.clone(), credited);
                Ok("ok".into())
            }
            TransactionData::Extension(action) => self.apply_game(sender, action),
        }
    }

    fn apply_game(
        &mut self,
        sender: &Address,
        action: &GameAction,
    ) -> Result<String, (StatusCode, String)> {
        match action {
            GameAction::ProposeGame {
                white,
                black,
                wager,
            } => {
                let duplicate = self
                    .pending_games
                    .values()
                    .any(|g| &g.white == white && &g.black == black);
                if duplicate {
                    return Err((StatusCode::CONFLICT, "duplicate game".into()));
                }
                self.next_game += 1;
                let id = GameId::new(format!("g{}", self.next_game));
                self.pending_games.insert(
                    id.clone(),
                    PendingGame {
                        white: white.clone(),
                        black: black.clone(),
                        accepted: (sender == white, sender == black),
                        wager: wager.clone(),
                    },
                );
                Ok(id.to_string())
            }
            GameAction::StartGame(id) => {
                let pending = self
                    .pending_games
                    .get(id)
                    .ok_or_else(|| bad_request("unknown game"))?;
                if pending.invitee() != sender {
                    return Err(bad_request("not the invitee"));
                }
                let pending = self
                    .pending_games
                    .remove(id)
                    .ok_or_else(|| bad_request("unknown game"))?;
                let wager = pending.wager.clone() + pending.wager;
                self.games
                    .insert(id.clone(), Game::new(pending.white, pending.black, wager));
                Ok("ok".into())
            }
            GameAction::Move { game_id, san } => {
                let game = self
                    .games
                    .get_mut(game_id)
                    .ok_or_else(|| bad_request("unknown game"))?;
                if !game.is_turn_of(sender) {
                    return Err(bad_request("not your turn"));
                }
                let board = Board::from_str(&game.board).map_err(|_| bad_request("bad board"))?;
                let mv = ChessMove::from_str(san).map_err(|_| bad_request("invalid san move"))?;
                if !board.legal(mv) {
                    return Err(bad_request("illegal move"));
                }
                if self.drop_moves {
                    return Ok("ok".into());
                }
                let next = board.make_move_new(mv);
                game.board = next.to_string();
                game.turns += 1;
                match next.status() {
                    BoardStatus::Checkmate => game.status = format!("{sender} won"),
                    BoardStatus::Stalemate => game.status = "stalemate".into(),
                    BoardStatus::Ongoing => {}
                }
                Ok("ok".into())
            }
            GameAction::Resign(game_id) => {
                let game = self
                    .games
                    .get_mut(game_id)
                    .ok_or_else(|| bad_request("unknown game"))?;
                game.status = format!("{sender} resigned");
                Ok("ok".into())
            }
            GameAction::ClaimWin(_) => Err(bad_request("nothing to claim")),
        }
    }

    fn debit(&mut self, account: &Address, amount: &Amount) -> Result<(), (StatusCode, String)> {
        let balance = self.balances.get(account).cloned().unwrap_or_default();
        let left = balance
            .checked_sub(amount)
            .ok_or_else(|| bad_request("insufficient funds"))?;
        self.balances.insert(account.clone(), left);
        Ok(())
    }
}

fn bad_request(message: &str) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, message.to_string())
}

async fn get_state(State(ledger): State<Shared>) -> Json<StateSnapshot> {
    Json(ledger.lock().unwrap().snapshot())
}

async fn post_tx(State(ledger): State<Shared>, body: String) -> (StatusCode, String) {
    let Ok(stx) = serde_json::from_str::<SignedTransaction>(&body) else {
        return bad_request("malformed transaction");
    };

    let mut ledger = ledger.lock().unwrap();
    ledger.received.push(stx.clone());

    if let Some(forced) = ledger.forced.take() {
        return forced;
    }
    if !stx.verify() {
        return bad_request("bad signature");
    }
    let expected = ledger.nonces.get(&stx.pub_key).copied().unwrap_or(0);
    if stx.tx.nonce != expected {
        return bad_request("bad nonce");
    }

    match ledger.apply(&stx) {
        Ok(body) => {
            ledger.nonces.insert(stx.pub_key.clone(), expected + 1);
            (StatusCode::OK, body)
        }
        Err(rejection) => rejection,
    }
}

/// A running mock sequencer.
pub struct MockSequencer {
    pub url: String,
    ledger: Shared,
}

impl MockSequencer {
    /// Bind to an ephemeral port and start serving.
    pub async fn start() -> Self {
        let ledger: Shared = Arc::default();
        let router = Router::new()
            .route("/rpc", get(get_state).post(post_tx))
            .with_state(Arc::clone(&ledger));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            ledger,
        }
    }

    /// Inspect or change server state.
    pub fn with<R>(&self, f: impl FnOnce(&mut Ledger) -> R) -> R {
        f(&mut self.ledger.lock().unwrap())
    }

    pub fn fund(&self, account: &Address, amount: u64) {
        self.with(|l| l.balances.insert(account.clone(), Amount::from(amount)));
    }

    /// Answer the next POST with `status` and `body`.
    pub fn fail_next(&self, status: u16, body: &str) {
        let status = StatusCode::from_u16(status).unwrap();
        self.with(|l| l.forced = Some((status, body.to_string())));
    }

    pub fn received(&self) -> Vec<SignedTransaction> {
        self.with(|l| l.received.clone())
    }

    /// A client for `wallet` against this server.
    pub fn client(&self, wallet: LocalWallet) -> Sequencer {
        Sequencer::builder(&self.url)
            .signer(wallet)
            .retry_config(RetryConfig::none())
            .build()
            .unwrap()
    }
}
