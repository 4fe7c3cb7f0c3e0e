//! Withdrawals through the sequencer and claim redemption on L1.

use std::sync::Mutex;

use futures::future::BoxFuture;
use sequencer_kit::*;

use crate::init_tracing;
use crate::mock_sequencer::MockSequencer;

#[tokio::test]
async fn test_withdraw_tokens() {
    init_tracing();
    let server = MockSequencer::start().await;
    let wallet = LocalWallet::random();
    let me = wallet.address().clone();
    server.fund(&me, 10);
    let client = server.client(wallet);

    // No balances cached yet: the server decides
    client.withdraw_tokens(4u64).await.unwrap();
    client.refresh().await.unwrap();
    assert_eq!(client.balance(&me).unwrap(), Amount::from(6u64));
    assert_eq!(client.withdrawals(), vec![(me.clone(), Amount::from(4u64))]);

    let posted = server.received().len();
    let err = client.withdraw_tokens(7u64).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::InsufficientBalance { ref requested, ref available })
            if requested == "7" && available == "6"
    ));
    let err = client.withdraw_tokens("0x0").await.unwrap_err();
    assert!(matches!(err, Error::Validation(ValidationError::ZeroAmount)));
    assert_eq!(server.received().len(), posted);
    assert_eq!(client.nonce_manager().peek(&me), 1);
}

struct RecordingBridge {
    config: SettlementConfig,
    calls: Mutex<Vec<RedemptionCall>>,
    deposits: Mutex<Vec<Amount>>,
}

impl RecordingBridge {
    fn on_chain(chain_id: u64) -> Self {
        Self {
            config: SettlementConfig::for_chain(chain_id).unwrap(),
            calls: Mutex::new(Vec::new()),
            deposits: Mutex::new(Vec::new()),
        }
    }
}

impl SettlementContract for RecordingBridge {
    fn config(&self) -> &SettlementConfig {
        &self.config
    }

    fn withdraw<'a>(&'a self, call: &'a RedemptionCall) -> BoxFuture<'a, Result<String, Error>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(call.clone());
            Ok(format!("{}:{}", self.config.chain, call.leaf_index))
        })
    }

    fn deposit<'a>(&'a self, amount: &'a Amount) -> BoxFuture<'a, Result<String, Error>> {
        Box::pin(async move {
            self.deposits.lock().unwrap().push(amount.clone());
            Ok(format!("{}:deposit:{amount}", self.config.chain))
        })
    }
}

#[tokio::test]
async fn test_redeem_cached_claim_unaltered() {
    init_tracing();
    let server = MockSequencer::start().await;
    let wallet = LocalWallet::random();
    let me = wallet.address().clone();
    let client = server.client(wallet);

    let claim = Claim {
        index: 2,
        amount: "100".parse().unwrap(),
        proof: vec![
            "0x1f2e3d4c5b6a79881f2e3d4c5b6a79881f2e3d4c5b6a79881f2e3d4c5b6a7988".into(),
            "0xa0b1c2d3e4f5a6b7a0b1c2d3e4f5a6b7a0b1c2d3e4f5a6b7a0b1c2d3e4f5a6b7".into(),
        ],
    };
    server.with(|l| {
        l.batches = vec![Batch::default(); 4];
        l.batches[3].claims.insert(me.clone(), claim.clone());
        l.batches[1]
            .claims
            .insert("0xeee".parse().unwrap(), claim.clone());
    });

    client.refresh().await.unwrap();
    assert_eq!(client.claims().unwrap(), vec![(3, claim.clone())]);

    let bridge = RecordingBridge::on_chain(10);
    let receipt = client.redeem(3, &bridge).await.unwrap();
    assert_eq!(receipt, "optimism:2");

    let calls = bridge.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.batch_index, 3);
    assert_eq!(call.leaf_index, claim.index);
    assert_eq!(call.account, me);
    assert_eq!(call.amount, claim.amount);
    assert_eq!(call.proof, claim.proof);
    drop(calls);

    // Someone else's claim is never redeemed on our behalf
    assert!(matches!(
        client.redeem(1, &bridge).await,
        Err(Error::NoClaim { batch_index: 1, .. })
    ));
    // Redemption bypasses the sequencer
    assert!(server.received().is_empty());
}

#[tokio::test]
async fn test_bridge_deposit_bypasses_sequencer() {
    init_tracing();
    let server = MockSequencer::start().await;
    let wallet = LocalWallet::random();
    let me = wallet.address().clone();
    let client = server.client(wallet);
    let bridge = RecordingBridge::on_chain(10);

    let receipt = client.bridge(5u64, &bridge).await.unwrap();
    assert_eq!(receipt, "optimism:deposit:5");
    assert_eq!(bridge.deposits.lock().unwrap()[..], [Amount::from(5u64)]);
    assert!(server.received().is_empty());
    assert_eq!(client.nonce_manager().peek(&me), 0);

    // The sequencer credits the deposit once it observes it on L1
    server.fund(&me, 5);
    client.refresh().await.unwrap();
    assert_eq!(client.balance(&me).unwrap(), Amount::from(5u64));

    // The same payload sent to the sequencer is refused locally
    let err = client
        .send(TransactionBuilder::bridge_tokens().amount(5u64))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::NotSequencerRouted(TxKind::BridgeTokens))
    ));
    assert!(server.received().is_empty());
}
