//! EIP-191 personal-message signatures.

use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use super::Address;
use crate::error::SignerError;

/// Prefix mixed into every personal-message hash.
pub const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Hash a message the way `personal_sign` does:
/// `keccak256("\x19Ethereum Signed Message:\n" ++ len(message) ++ message)`.
pub fn hash_personal_message(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// A recoverable secp256k1 signature decomposed into `(r, s, v)`.
///
/// `r` and `s` are `0x`-prefixed 32-byte hex strings; `v` is 27 or 28.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub r: String,
    pub s: String,
    pub v: u64,
}

impl Signature {
    /// Build from a 64-byte compact signature and its recovery id.
    pub fn from_parts(signature: &EcdsaSignature, recovery_id: RecoveryId) -> Self {
        let bytes = signature.to_bytes();
        Self {
            r: format!("0x{}", hex::encode(&bytes[..32])),
            s: format!("0x{}", hex::encode(&bytes[32..])),
            v: 27 + u64::from(recovery_id.to_byte()),
        }
    }

    /// Parse a 65-byte `r ‖ s ‖ v` signature as returned by wallets.
    pub fn from_rsv_bytes(bytes: &[u8]) -> Result<Self, SignerError> {
        if bytes.len() != 65 {
            return Err(SignerError::InvalidSignature(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }
        let v = match bytes[64] {
            v @ (0 | 1) => u64::from(v) + 27,
            v @ (27 | 28) => u64::from(v),
            other => {
                return Err(SignerError::InvalidSignature(format!(
                    "invalid recovery byte {other}"
                )));
            }
        };
        Ok(Self {
            r: format!("0x{}", hex::encode(&bytes[..32])),
            s: format!("0x{}", hex::encode(&bytes[32..64])),
            v,
        })
    }

    /// Recover the address that produced this signature over `message`.
    pub fn recover(&self, message: &[u8]) -> Result<Address, SignerError> {
        let r = decode_word(&self.r)?;
        let s = decode_word(&self.s)?;
        let mut compact = [0u8; 64];
        compact[..32].copy_from_slice(&r);
        compact[32..].copy_from_slice(&s);

        let signature = EcdsaSignature::from_slice(&compact)
            .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;
        let recovery_byte = self
            .v
            .checked_sub(27)
            .and_then(|b| u8::try_from(b).ok())
            .ok_or_else(|| SignerError::InvalidSignature(format!("invalid v {}", self.v)))?;
        let recovery_id = RecoveryId::from_byte(recovery_byte)
            .ok_or_else(|| SignerError::InvalidSignature(format!("invalid v {}", self.v)))?;

        let hash = hash_personal_message(message);
        let key = VerifyingKey::recover_from_prehash(&hash, &signature, recovery_id)
            .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;
        Ok(Address::from_verifying_key(&key))
    }
}

fn decode_word(s: &str) -> Result<[u8; 32], SignerError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(digits).map_err(|e| SignerError::InvalidSignature(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| SignerError::InvalidSignature(format!("'{s}' is not 32 bytes")))
}
