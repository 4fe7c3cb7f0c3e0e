//! Proposal, acceptance and play against the mock sequencer.

use std::sync::{Arc, Mutex};

use sequencer_kit::*;

use crate::init_tracing;
use crate::mock_sequencer::MockSequencer;

/// Propose `alice` (white) vs `bob` (black) and have bob accept.
async fn start_game(server: &MockSequencer, alice: &Sequencer, bob: &Sequencer) -> GameId {
    let bob_addr = bob.address().unwrap().clone();
    let receipt = alice.challenge(&bob_addr, 4u64).await.unwrap();
    let game_id = GameId::new(receipt.body);

    bob.refresh().await.unwrap();
    bob.accept_game(&game_id).await.unwrap();

    alice.refresh().await.unwrap();
    bob.refresh().await.unwrap();
    assert!(server.with(|l| l.games.contains_key(&game_id)));
    game_id
}

// =============================================================================
// Proposal and acceptance
// =============================================================================

#[tokio::test]
async fn test_propose_accept_promotes_on_snapshot() {
    init_tracing();
    let server = MockSequencer::start().await;
    let alice = server.client(LocalWallet::random());
    let bob = server.client(LocalWallet::random());
    let alice_addr = alice.address().unwrap().clone();
    let bob_addr = bob.address().unwrap().clone();

    alice.challenge(&bob_addr, 4u64).await.unwrap();
    // Nothing is added locally until a snapshot shows it
    assert!(alice.pending_games().is_empty());

    alice.refresh().await.unwrap();
    let pending = alice.pending_game("g1").unwrap();
    assert_eq!(pending.white, alice_addr);
    assert_eq!(pending.black, bob_addr);
    assert_eq!(pending.wager.to_hex(), "0x4");
    assert_eq!(pending.invitee(), &bob_addr);

    bob.refresh().await.unwrap();
    assert_eq!(bob.invitations_for(&bob_addr).unwrap().len(), 1);
    assert!(alice.invitations_for(&alice_addr).unwrap().is_empty());
    assert_eq!(alice.proposals_by(&alice_addr).unwrap().len(), 1);

    // Only the invitee may accept
    let err = alice.accept_game("g1").await.unwrap_err();
    assert!(matches!(err, Error::Game(GameError::NotInvitee { .. })));

    bob.accept_game("g1").await.unwrap();
    // Still pending locally until the next snapshot
    assert!(bob.pending_game("g1").is_some());
    assert!(bob.game("g1").is_none());

    let report = bob.refresh().await.unwrap();
    assert_eq!(report.promoted, vec![GameId::from("g1")]);
    assert!(bob.pending_game("g1").is_none());
    let game = bob.game("g1").unwrap();
    assert_eq!(game.turns, 0);
    assert_eq!(game.board, INITIAL_BOARD);
    assert!(game.is_ongoing());
}

// =============================================================================
// Moves
// =============================================================================

/// Wraps a wallet and records the local game as seen at signing time.
struct ObservingSigner {
    inner: LocalWallet,
    store: Arc<StateStore>,
    seen: Arc<Mutex<Vec<Option<Game>>>>,
}

impl Signer for ObservingSigner {
    fn address(&self) -> &Address {
        self.inner.address()
    }

    fn sign_message<'a>(&'a self, message: &'a [u8]) -> SignFuture<'a> {
        self.seen.lock().unwrap().push(self.store.game(&"g1".into()));
        self.inner.sign_message(message)
    }
}

#[tokio::test]
async fn test_move_is_visible_before_server_responds() {
    init_tracing();
    let server = MockSequencer::start().await;

    let store = Arc::new(StateStore::in_memory());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let alice = Sequencer::builder(&server.url)
        .signer(ObservingSigner {
            inner: LocalWallet::random(),
            store: Arc::clone(&store),
            seen: Arc::clone(&seen),
        })
        .store(Arc::clone(&store))
        .retry_config(RetryConfig::none())
        .build()
        .unwrap();
    let bob = server.client(LocalWallet::random());

    let game_id = start_game(&server, &alice, &bob).await;
    seen.lock().unwrap().clear();

    alice.make_move(&game_id, "e2", "e4").await.unwrap();

    // The signer ran before the POST and already saw the new position
    let at_signing = seen.lock().unwrap()[0].clone().unwrap();
    assert_eq!(at_signing.turns, 1);
    assert!(at_signing.board.starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b"));
    assert!(alice.has_pending_move(&game_id));

    let submitted = server.received().pop().unwrap();
    assert_eq!(
        submitted.tx.data,
        TransactionData::Extension(GameAction::Move {
            game_id: game_id.clone(),
            san: "e2e4".into(),
        })
    );

    let report = alice.refresh().await.unwrap();
    assert_eq!(report.committed, vec![game_id.clone()]);
    assert!(!alice.has_pending_move(&game_id));
    assert_eq!(alice.game(&game_id).unwrap().turns, 1);
}

#[tokio::test]
async fn test_out_of_turn_move_rejected_locally() {
    init_tracing();
    let server = MockSequencer::start().await;
    let alice = server.client(LocalWallet::random());
    let bob = server.client(LocalWallet::random());
    let bob_addr = bob.address().unwrap().clone();
    let game_id = start_game(&server, &alice, &bob).await;

    let posted = server.received().len();
    let nonce = bob.nonce_manager().peek(&bob_addr);

    let err = bob.make_move(&game_id, "e7", "e5").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Game(GameError::NotYourTurn {
            expected: Side::White
        })
    ));

    assert_eq!(server.received().len(), posted);
    assert_eq!(bob.nonce_manager().peek(&bob_addr), nonce);
    let game = bob.game(&game_id).unwrap();
    assert_eq!(game.turns, 0);
    assert_eq!(game.board, INITIAL_BOARD);
    assert!(!bob.has_pending_move(&game_id));
}

#[tokio::test]
async fn test_alternating_moves_and_resignation() {
    init_tracing();
    let server = MockSequencer::start().await;
    let alice = server.client(LocalWallet::random());
    let bob = server.client(LocalWallet::random());
    let bob_addr = bob.address().unwrap().clone();
    let game_id = start_game(&server, &alice, &bob).await;

    alice.make_move(&game_id, "e2", "e4").await.unwrap();
    bob.refresh().await.unwrap();
    bob.make_move(&game_id, "E7", "E5").await.unwrap();
    alice.refresh().await.unwrap();
    assert_eq!(alice.game(&game_id).unwrap().turns, 2);

    // Illegal per the rules engine; nothing is sent
    let posted = server.received().len();
    let err = alice.make_move(&game_id, "e4", "e6").await.unwrap_err();
    assert!(matches!(err, Error::Game(GameError::IllegalMove(_))));
    assert_eq!(server.received().len(), posted);

    bob.resign(&game_id).await.unwrap();
    alice.refresh().await.unwrap();
    let game = alice.game(&game_id).unwrap();
    assert_eq!(game.status, format!("{bob_addr} resigned"));

    let err = alice.make_move(&game_id, "d2", "d4").await.unwrap_err();
    assert!(matches!(err, Error::Game(GameError::GameOver { .. })));
    let err = alice.claim_win(&game_id).await.unwrap_err();
    assert!(matches!(err, Error::Game(GameError::GameOver { .. })));
}

#[tokio::test]
async fn test_submitted_transactions_verify() {
    let server = MockSequencer::start().await;
    let alice = server.client(LocalWallet::random());
    let bob = server.client(LocalWallet::random());
    start_game(&server, &alice, &bob).await;

    let received = server.received();
    assert_eq!(received.len(), 2);
    for stx in &received {
        assert!(stx.verify());
        assert_eq!(stx.tx.nonce, 0);
    }
    assert_eq!(&received[0].pub_key, alice.address().unwrap());
    assert_eq!(&received[1].pub_key, bob.address().unwrap());
}
