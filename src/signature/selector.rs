//! This module contains the function selector type and its computation from
//! canonical signatures.

use std::{fmt::Formatter, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::constant::SELECTOR_WIDTH_BYTES;

/// The 4-byte identifier of an externally callable function.
///
/// A selector is the first four bytes of the keccak256 hash of the function's
/// canonical signature. It is rendered as a lower-case, `0x`-prefixed hex
/// string, which is also the representation used for serialization.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Selector([u8; SELECTOR_WIDTH_BYTES]);

impl Selector {
    /// Computes the selector of the provided canonical `signature`.
    ///
    /// The signature must already be canonical (types only, custom types
    /// resolved); this function is a pure hash of its input and performs no
    /// normalization of its own.
    #[must_use]
    pub fn of_canonical(signature: &str) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(signature.as_bytes());
        let hash = hasher.finalize();

        let mut bytes = [0u8; SELECTOR_WIDTH_BYTES];
        bytes.copy_from_slice(&hash[..SELECTOR_WIDTH_BYTES]);
        Self(bytes)
    }

    /// Constructs a selector directly from its four bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; SELECTOR_WIDTH_BYTES]) -> Self {
        Self(bytes)
    }

    /// Gets the selector's bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SELECTOR_WIDTH_BYTES] {
        &self.0
    }
}

/// Displays the selector as it appears in ABIs and descriptor files:
/// lower-case hex with a `0x` prefix.
impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// The debug representation is the display representation; the wrapper has no
/// structure of its own worth printing.
impl std::fmt::Debug for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

/// The error produced when parsing a selector from a string fails.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("`{input}` is not a valid 4-byte selector")]
pub struct InvalidSelector {
    /// The input that failed to parse.
    pub input: String,
}

/// Parses a selector from hex, with or without the `0x` prefix, in either
/// letter case.
impl FromStr for Selector {
    type Err = InvalidSelector;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let decoded = hex::decode(digits).map_err(|_| InvalidSelector {
            input: s.to_string(),
        })?;

        let bytes: [u8; SELECTOR_WIDTH_BYTES] =
            decoded.try_into().map_err(|_| InvalidSelector {
                input: s.to_string(),
            })?;

        Ok(Self(bytes))
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text: String = Deserialize::deserialize(deserializer)?;
        Self::from_str(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::Selector;

    #[test]
    fn computes_known_selectors() {
        // Taken from the ERC-20 ABI.
        assert_eq!(
            Selector::of_canonical("transfer(address,uint256)").to_string(),
            "0xa9059cbb"
        );
        assert_eq!(
            Selector::of_canonical("balanceOf(address)").to_string(),
            "0x70a08231"
        );
    }

    #[test]
    fn parses_with_and_without_prefix() -> anyhow::Result<()> {
        let expected = Selector::of_canonical("transfer(address,uint256)");
        assert_eq!(Selector::from_str("0xa9059cbb")?, expected);
        assert_eq!(Selector::from_str("a9059cbb")?, expected);
        assert_eq!(Selector::from_str("0xA9059CBB")?, expected);

        Ok(())
    }

    #[test]
    fn rejects_malformed_selectors() {
        assert!(Selector::from_str("0xa9059c").is_err());
        assert!(Selector::from_str("not-hex!").is_err());
        assert!(Selector::from_str("0xa9059cbb00").is_err());
    }

    #[test]
    fn serde_round_trips_as_a_string() -> anyhow::Result<()> {
        let selector = Selector::of_canonical("transfer(address,uint256)");
        let encoded = serde_json::to_string(&selector)?;
        assert_eq!(encoded, "\"0xa9059cbb\"");

        let decoded: Selector = serde_json::from_str(&encoded)?;
        assert_eq!(decoded, selector);

        Ok(())
    }
}
