//! Optimistic moves that the sequencer rejects or never applies.

use sequencer_kit::*;

use crate::init_tracing;
use crate::mock_sequencer::MockSequencer;

async fn started(server: &MockSequencer, alice: &Sequencer, bob: &Sequencer) -> GameId {
    let bob_addr = bob.address().unwrap().clone();
    alice.challenge(&bob_addr, 1u64).await.unwrap();
    bob.refresh().await.unwrap();
    bob.accept_game("g1").await.unwrap();
    alice.refresh().await.unwrap();
    assert!(server.with(|l| l.games.contains_key(&GameId::from("g1"))));
    GameId::from("g1")
}

fn assert_initial(client: &Sequencer, game_id: &GameId) {
    let game = client.game(game_id).unwrap();
    assert_eq!(game.turns, 0);
    assert_eq!(game.board, INITIAL_BOARD);
    assert!(!client.has_pending_move(game_id));
}

#[tokio::test]
async fn test_rejected_move_rolls_back() {
    init_tracing();
    let server = MockSequencer::start().await;
    let alice = server.client(LocalWallet::random());
    let bob = server.client(LocalWallet::random());
    let game_id = started(&server, &alice, &bob).await;

    server.fail_next(400, "invalid target account");
    let err = alice.make_move(&game_id, "e2", "e4").await.unwrap_err();
    assert!(matches!(err, Error::Rpc(RpcError::Malformed(ref m)) if m == "invalid target account"));

    assert_initial(&alice, &game_id);
    // The same move can be retried once the nonce is resynchronised
    alice.refresh().await.unwrap();
    alice.resync_nonce().unwrap();
    alice.make_move(&game_id, "e2", "e4").await.unwrap();
    alice.refresh().await.unwrap();
    assert_eq!(alice.game(&game_id).unwrap().turns, 1);
}

#[tokio::test]
async fn test_transport_failure_rolls_back() {
    init_tracing();
    let server = MockSequencer::start().await;
    let wallet = LocalWallet::random();
    let alice = server.client(wallet.clone());
    let bob = server.client(LocalWallet::random());
    let game_id = started(&server, &alice, &bob).await;

    // Same store, dead endpoint
    let offline = Sequencer::builder("http://127.0.0.1:9")
        .signer(wallet)
        .store(alice.store().clone())
        .retry_config(RetryConfig::none())
        .build()
        .unwrap();

    let err = offline.make_move(&game_id, "e2", "e4").await.unwrap_err();
    assert!(matches!(err, Error::Rpc(RpcError::Http(_))));
    assert_initial(&alice, &game_id);
}

struct DecliningWallet(Address);

impl Signer for DecliningWallet {
    fn address(&self) -> &Address {
        &self.0
    }

    fn sign_message<'a>(&'a self, _message: &'a [u8]) -> SignFuture<'a> {
        Box::pin(async { Err(SignerError::Declined("user rejected the request".into())) })
    }
}

#[tokio::test]
async fn test_declined_signature_rolls_back() {
    init_tracing();
    let server = MockSequencer::start().await;
    let alice = server.client(LocalWallet::random());
    let bob = server.client(LocalWallet::random());
    let game_id = started(&server, &alice, &bob).await;
    let alice_addr = alice.address().unwrap().clone();
    let posted = server.received().len();

    let declining = Sequencer::builder(&server.url)
        .signer(DecliningWallet(alice_addr.clone()))
        .store(alice.store().clone())
        .build()
        .unwrap();

    let err = declining.make_move(&game_id, "e2", "e4").await.unwrap_err();
    assert!(matches!(err, Error::Signing(SignerError::Declined(_))));
    assert_initial(&alice, &game_id);
    assert_eq!(server.received().len(), posted);
    // The nonce was consumed before signing
    assert_eq!(declining.nonce_manager().peek(&alice_addr), 2);
}

#[tokio::test]
async fn test_unapplied_move_reverts_after_refresh_budget() {
    init_tracing();
    let server = MockSequencer::start().await;
    let wallet = LocalWallet::random();
    let alice = Sequencer::builder(&server.url)
        .signer(wallet)
        .pending_move_refreshes(2)
        .retry_config(RetryConfig::none())
        .build()
        .unwrap();
    let bob = server.client(LocalWallet::random());
    let game_id = started(&server, &alice, &bob).await;

    server.with(|l| l.drop_moves = true);
    alice.make_move(&game_id, "d2", "d4").await.unwrap();

    for _ in 0..2 {
        let report = alice.refresh().await.unwrap();
        assert!(report.reverted.is_empty());
        assert_eq!(alice.game(&game_id).unwrap().turns, 1);
        assert!(alice.has_pending_move(&game_id));
    }

    let report = alice.refresh().await.unwrap();
    assert_eq!(report.reverted, vec![game_id.clone()]);
    assert_initial(&alice, &game_id);
}

#[tokio::test]
async fn test_refresh_failure_keeps_persisted_state() {
    init_tracing();
    let server = MockSequencer::start().await;
    let wallet = LocalWallet::random();
    let me = wallet.address().clone();
    server.fund(&me, 25);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let client = Sequencer::builder(&server.url)
        .signer(wallet.clone())
        .cache(FileCache::new(&path))
        .build()
        .unwrap();
    client.transfer("0xbbb", 5u64).await.unwrap();
    client.refresh().await.unwrap();
    assert_eq!(client.balance(&me).unwrap(), Amount::from(20u64));
    drop(client);

    // Restart against an unreachable sequencer
    let restarted = Sequencer::builder("http://127.0.0.1:9")
        .signer(wallet)
        .cache(FileCache::new(&path))
        .retry_config(RetryConfig::none())
        .build()
        .unwrap();
    assert!(restarted.refresh().await.is_err());
    assert_eq!(restarted.balance(&me).unwrap(), Amount::from(20u64));
    assert_eq!(restarted.balance("0xBBB").unwrap(), Amount::from(5u64));
    // Seeded from the cached nonce
    assert_eq!(restarted.nonce_manager().peek(&me), 1);
}
