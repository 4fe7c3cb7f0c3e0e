//! Monetary amounts and hex quantities.
//!
//! The sequencer signs over the JSON text of a transaction, so every numeric
//! field has exactly one encoding on the wire: a lower-case `0x` hex string
//! with no leading zeros, where zero is `"0x0"`.

use std::fmt::{self, Display};
use std::ops::Add;
use std::str::FromStr;

use num_bigint::BigUint;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseAmountError;

// ============================================================================
// Amount
// ============================================================================

/// An arbitrary-precision, non-negative token amount.
///
/// Parses `0x`-prefixed hex (any case, leading zeros allowed) or plain
/// decimal digits. Always serializes to canonical hex.
///
/// # Example
///
/// ```
/// use sequencer_kit::Amount;
///
/// let a: Amount = "0x0004".parse().unwrap();
/// assert_eq!(a.to_hex(), "0x4");
/// assert_eq!(a, Amount::from(4u64));
/// assert_eq!(Amount::zero().to_hex(), "0x0");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigUint);

impl Amount {
    /// The zero amount.
    pub fn zero() -> Self {
        Self(BigUint::default())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == BigUint::default()
    }

    /// Canonical wire encoding.
    pub fn to_hex(&self) -> String {
        format!("0x{:x}", self.0)
    }

    /// Checked subtraction. Returns `None` if `other > self`.
    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        if other.0 > self.0 {
            None
        } else {
            Some(Amount(&self.0 - &other.0))
        }
    }

    /// Saturating subtraction.
    pub fn saturating_sub(&self, other: &Amount) -> Amount {
        self.checked_sub(other).unwrap_or_default()
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

impl From<BigUint> for Amount {
    fn from(v: BigUint) -> Self {
        Self(v)
    }
}

impl From<u64> for Amount {
    fn from(v: u64) -> Self {
        Self(BigUint::from(v))
    }
}

impl From<u128> for Amount {
    fn from(v: u128) -> Self {
        Self(BigUint::from(v))
    }
}

impl From<u32> for Amount {
    fn from(v: u32) -> Self {
        Self(BigUint::from(v))
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseAmountError::Empty);
        }

        if let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ParseAmountError::InvalidHex(s.to_string()));
            }
            return BigUint::parse_bytes(digits.as_bytes(), 16)
                .map(Self)
                .ok_or_else(|| ParseAmountError::InvalidHex(s.to_string()));
        }

        if !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(ParseAmountError::InvalidNumber(s.to_string()));
        }
        BigUint::parse_bytes(s.as_bytes(), 10)
            .map(Self)
            .ok_or_else(|| ParseAmountError::InvalidNumber(s.to_string()))
    }
}

/// Displays the decimal value.
impl Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl Visitor<'_> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a hex string, a decimal string, or a non-negative integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
                Ok(Amount::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
                u64::try_from(v)
                    .map(Amount::from)
                    .map_err(|_| E::custom(format!("negative amount: {v}")))
            }
        }

        d.deserialize_any(AmountVisitor)
    }
}

// ============================================================================
// IntoAmount trait
// ============================================================================

/// Trait for types that can be converted into an [`Amount`].
///
/// Lets methods accept typed amounts, plain integers, and strings from
/// runtime input.
///
/// # Example
///
/// ```
/// use sequencer_kit::{Amount, IntoAmount};
///
/// fn example(amount: impl IntoAmount) -> Amount {
///     amount.into_amount().unwrap()
/// }
///
/// assert_eq!(example(4u64), example("0x4"));
/// ```
pub trait IntoAmount {
    fn into_amount(self) -> Result<Amount, ParseAmountError>;
}

impl IntoAmount for Amount {
    fn into_amount(self) -> Result<Amount, ParseAmountError> {
        Ok(self)
    }
}

impl IntoAmount for &Amount {
    fn into_amount(self) -> Result<Amount, ParseAmountError> {
        Ok(self.clone())
    }
}

impl IntoAmount for u64 {
    fn into_amount(self) -> Result<Amount, ParseAmountError> {
        Ok(Amount::from(self))
    }
}

impl IntoAmount for u128 {
    fn into_amount(self) -> Result<Amount, ParseAmountError> {
        Ok(Amount::from(self))
    }
}

impl IntoAmount for &str {
    fn into_amount(self) -> Result<Amount, ParseAmountError> {
        self.parse()
    }
}

impl IntoAmount for String {
    fn into_amount(self) -> Result<Amount, ParseAmountError> {
        self.parse()
    }
}

impl IntoAmount for &String {
    fn into_amount(self) -> Result<Amount, ParseAmountError> {
        self.parse()
    }
}

// ============================================================================
// Hex quantities
// ============================================================================

/// Serde adapter for `u64` fields carried as hex quantity strings (nonces).
///
/// Accepts hex strings, decimal strings and plain JSON integers on input.
pub mod quantity {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{v:x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        d.deserialize_any(QuantityVisitor)
    }

    pub(crate) fn parse(v: &str) -> Option<u64> {
        match v.strip_prefix("0x").or_else(|| v.strip_prefix("0X")) {
            Some(digits) => u64::from_str_radix(digits, 16).ok(),
            None => v.parse().ok(),
        }
    }

    struct QuantityVisitor;

    impl Visitor<'_> for QuantityVisitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a hex quantity string or a non-negative integer")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
            parse(v).ok_or_else(|| E::custom(format!("invalid quantity: '{v}'")))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }
    }

    /// Same encoding for maps of quantities keyed by address.
    pub mod map {
        use std::collections::HashMap;
        use std::fmt;

        use serde::de::{MapAccess, Visitor};
        use serde::ser::SerializeMap;
        use serde::{Deserializer, Serializer};

        use crate::types::Address;

        pub fn serialize<S: Serializer>(
            v: &HashMap<Address, u64>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            let mut map = s.serialize_map(Some(v.len()))?;
            for (k, n) in v {
                map.serialize_entry(k, &format!("0x{n:x}"))?;
            }
            map.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<HashMap<Address, u64>, D::Error> {
            struct MapVisitor;

            impl<'de> Visitor<'de> for MapVisitor {
                type Value = HashMap<Address, u64>;

                fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str("a map of address to quantity")
                }

                fn visit_map<A: MapAccess<'de>>(
                    self,
                    mut access: A,
                ) -> Result<Self::Value, A::Error> {
                    let mut out = HashMap::new();
                    while let Some((k, v)) = access.next_entry::<Address, Quantity>()? {
                        out.insert(k, v.0);
                    }
                    Ok(out)
                }
            }

            d.deserialize_map(MapVisitor)
        }

        struct Quantity(u64);

        impl<'de> serde::Deserialize<'de> for Quantity {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                super::deserialize(d).map(Quantity)
            }
        }
    }
}
