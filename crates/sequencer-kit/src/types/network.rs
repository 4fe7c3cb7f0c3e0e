//! Settlement chains the rollup bridges to.

use std::fmt;

/// An L1 chain with a deployed rollup bridge contract.
///
/// Claims from settled withdrawal batches are redeemed on this chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Chain {
    /// Ethereum mainnet.
    Mainnet,
    /// OP mainnet, where the production bridge lives.
    #[default]
    Optimism,
    /// Sepolia testnet.
    Sepolia,
}

impl Chain {
    /// EIP-155 chain id.
    pub fn chain_id(&self) -> u64 {
        match self {
            Chain::Mainnet => 1,
            Chain::Optimism => 10,
            Chain::Sepolia => 11_155_111,
        }
    }

    /// Look up a chain by its EIP-155 id.
    pub fn from_chain_id(id: u64) -> Option<Chain> {
        match id {
            1 => Some(Chain::Mainnet),
            10 => Some(Chain::Optimism),
            11_155_111 => Some(Chain::Sepolia),
            _ => None,
        }
    }

    /// Address of the bridge contract that accepts withdrawal claims, if
    /// one is deployed on this chain.
    pub fn bridge_address(&self) -> Option<&'static str> {
        match self {
            Chain::Optimism => Some("0x24E063a827CB134315aC57A380446c8bF5418555"),
            Chain::Mainnet | Chain::Sepolia => None,
        }
    }

    /// Returns the chain identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Mainnet => "mainnet",
            Chain::Optimism => "optimism",
            Chain::Sepolia => "sepolia",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
