//! Withdrawal claims, L1 deposits and the settlement-contract boundary.
//!
//! Neither redemption nor deposits go through the sequencer. The client
//! looks up its claim in the cached batch data and hands it, unmodified, to
//! a [`SettlementContract`] that performs the L1 write. `BridgeTokens`
//! payloads are routed to the same contract's deposit entry point.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, ValidationError};
use crate::types::{Address, Amount, Chain, Claim, IntoAmount, TransactionData};

use super::sequencer::Sequencer;
use super::transaction::TransactionBuilder;

/// Arguments of a redemption call against the bridge contract.
///
/// `amount` is the claimed value as an [`Amount`]. It serializes as
/// canonical hex (`"0x64"`), even when the batch data spelled it as a
/// decimal string (`"100"`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionCall {
    pub batch_index: u64,
    /// Index of the leaf in the batch's Merkle tree.
    pub leaf_index: u64,
    pub account: Address,
    pub amount: Amount,
    pub proof: Vec<String>,
}

impl RedemptionCall {
    /// Build a call from a cached claim, copying it as-is.
    pub fn from_claim(batch_index: u64, account: Address, claim: Claim) -> Self {
        Self {
            batch_index,
            leaf_index: claim.index,
            account,
            amount: claim.amount,
            proof: claim.proof,
        }
    }
}

/// An external bridge contract that accepts deposits and redeems
/// withdrawal claims.
///
/// Implementations own the L1 connection and ABI encoding. The returned
/// string is an implementation-defined receipt, typically a tx hash.
/// Failures of the L1 write should be reported as [`Error::Settlement`].
pub trait SettlementContract: Send + Sync {
    /// Where this contract is deployed.
    fn config(&self) -> &SettlementConfig;

    /// Redeem a withdrawal claim.
    fn withdraw<'a>(&'a self, call: &'a RedemptionCall) -> BoxFuture<'a, Result<String, Error>>;

    /// Deposit `amount` from the L1 wallet into the rollup.
    fn deposit<'a>(&'a self, amount: &'a Amount) -> BoxFuture<'a, Result<String, Error>>;
}

/// Where claims are redeemed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementConfig {
    pub chain: Chain,
    /// Bridge contract address.
    pub contract: String,
}

impl SettlementConfig {
    pub fn new(chain: Chain, contract: impl Into<String>) -> Self {
        Self {
            chain,
            contract: contract.into(),
        }
    }

    /// The known bridge deployment for `chain_id`.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedChain`] if no bridge is known on that chain.
    pub fn for_chain(chain_id: u64) -> Result<Self, Error> {
        let chain = Chain::from_chain_id(chain_id).ok_or(Error::UnsupportedChain(chain_id))?;
        let contract = chain
            .bridge_address()
            .ok_or(Error::UnsupportedChain(chain_id))?;
        Ok(Self::new(chain, contract))
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        let chain = Chain::default();
        Self::new(chain, chain.bridge_address().unwrap_or_default())
    }
}

/// Refuse contracts with no deployment address.
fn check_target(config: &SettlementConfig) -> Result<(), Error> {
    if config.contract.trim().is_empty() {
        return Err(Error::UnsupportedChain(config.chain.chain_id()));
    }
    Ok(())
}

fn settled(config: &SettlementConfig, receipt: String) -> Result<String, Error> {
    if receipt.trim().is_empty() {
        return Err(Error::Settlement(format!(
            "bridge {} on {} returned an empty receipt",
            config.contract, config.chain
        )));
    }
    Ok(receipt)
}

impl Sequencer {
    /// The signer's claims across all cached batches, as `(batch_index, claim)`.
    pub fn claims(&self) -> Result<Vec<(u64, Claim)>, Error> {
        let signer = self.require_signer()?;
        Ok(self.store().claims_for(signer.address()))
    }

    /// Claims for `account` across all cached batches.
    pub fn claims_for(&self, account: impl AsRef<str>) -> Result<Vec<(u64, Claim)>, Error> {
        Ok(self.store().claims_for(&Address::new(account)?))
    }

    /// The redemption call for the signer's claim in `batch_index`.
    pub fn redemption(&self, batch_index: u64) -> Result<RedemptionCall, Error> {
        let account = self.require_signer()?.address().clone();
        let claim = self
            .store()
            .claim(batch_index, &account)
            .ok_or_else(|| Error::NoClaim {
                batch_index,
                account: account.clone(),
            })?;
        Ok(RedemptionCall::from_claim(batch_index, account, claim))
    }

    /// Redeem the signer's claim in `batch_index` through `contract`.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use sequencer_kit::*;
    /// # async fn example(client: Sequencer, bridge: impl SettlementContract) -> Result<(), Error> {
    /// client.refresh().await?;
    /// for (batch_index, claim) in client.claims()? {
    ///     println!("batch {batch_index}: {}", claim.amount);
    ///     client.redeem(batch_index, &bridge).await?;
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn redeem(
        &self,
        batch_index: u64,
        contract: &impl SettlementContract,
    ) -> Result<String, Error> {
        let config = contract.config();
        check_target(config)?;
        let call = self.redemption(batch_index)?;
        let receipt = settled(config, contract.withdraw(&call).await?)?;
        info!(
            batch_index,
            leaf_index = call.leaf_index,
            chain = %config.chain,
            %receipt,
            "claim redeemed"
        );
        Ok(receipt)
    }

    /// Deposit `amount` into the rollup through `contract`.
    ///
    /// Builds a `BridgeTokens` payload and routes it to the contract's
    /// deposit entry point. The sequencer is not contacted and no nonce is
    /// consumed; the deposit is credited once the sequencer observes it.
    pub async fn bridge(
        &self,
        amount: impl IntoAmount,
        contract: &impl SettlementContract,
    ) -> Result<String, Error> {
        let config = contract.config();
        check_target(config)?;

        let data = TransactionBuilder::bridge_tokens().amount(amount).build()?;
        let amount = match &data {
            TransactionData::BridgeTokens(amount) => amount,
            TransactionData::WithdrawTokens(_)
            | TransactionData::Transfer { .. }
            | TransactionData::Extension(_) => {
                return Err(ValidationError::NotSettlementRouted(data.kind()).into());
            }
        };
        if amount.is_zero() {
            return Err(ValidationError::ZeroAmount.into());
        }

        let receipt = settled(config, contract.deposit(amount).await?)?;
        info!(%amount, chain = %config.chain, %receipt, "deposit bridged");
        Ok(receipt)
    }
}
