//! Account addresses and game identifiers.

use std::fmt::{self, Display};
use std::str::FromStr;

use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize};
use sha3::{Digest, Keccak256};

use crate::error::ParseAddressError;

/// An account address.
///
/// Addresses are opaque identifiers compared case-insensitively, so every
/// `Address` is stored lower-cased. Parsing only rejects empty input and
/// embedded whitespace; use [`Address::is_evm`] to check for the strict
/// 20-byte hex form.
///
/// # Example
///
/// ```
/// use sequencer_kit::Address;
///
/// let a: Address = "0xAbC".parse().unwrap();
/// assert_eq!(a.as_str(), "0xabc");
/// assert_eq!(a, "0xABC".parse::<Address>().unwrap());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Parse and normalize an address.
    pub fn new(s: impl AsRef<str>) -> Result<Self, ParseAddressError> {
        let s = s.as_ref().trim();
        if s.is_empty() {
            return Err(ParseAddressError::Empty);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(ParseAddressError::Whitespace(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Derive the Ethereum-style address of a secp256k1 public key.
    ///
    /// The address is the last 20 bytes of the Keccak-256 hash of the
    /// uncompressed point, without its `0x04` prefix.
    pub fn from_verifying_key(key: &k256::ecdsa::VerifyingKey) -> Self {
        let point = k256::PublicKey::from(key).to_encoded_point(false);
        let hash = Keccak256::digest(&point.as_bytes()[1..]);
        Self(format!("0x{}", hex::encode(&hash[12..])))
    }

    /// The normalized (lower-case) address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a `0x`-prefixed, 40 hex digit address.
    pub fn is_evm(&self) -> bool {
        self.0
            .strip_prefix("0x")
            .is_some_and(|h| h.len() == 40 && h.chars().all(|c| c.is_ascii_hexdigit()))
    }
}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Address {
    type Error = ParseAddressError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Address {
    fn eq(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl PartialEq<&str> for Address {
    fn eq(&self, other: &&str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s: String = Deserialize::deserialize(d)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

/// Identifier of a pending or active game, as assigned by the sequencer.
///
/// Compared verbatim; the sequencer chooses the format (`"0x0"`, `"g1"`, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GameId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GameId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&GameId> for GameId {
    fn from(id: &GameId) -> Self {
        id.clone()
    }
}

impl Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
