//! Fixed-size byte identifiers (validator addresses, block and account hashes)

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Error parsing a hex-encoded identifier
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseBytesError {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Length in bytes
            pub const LEN: usize = $len;

            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            /// Build from a slice, `None` if the length is wrong
            pub fn from_slice(bytes: &[u8]) -> Option<Self> {
                <[u8; $len]>::try_from(bytes).ok().map(Self)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(self, f)
            }
        }

        impl FromStr for $name {
            type Err = ParseBytesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(raw)?;
                Self::from_slice(&bytes).ok_or(ParseBytesError::InvalidLength {
                    expected: $len,
                    actual: bytes.len(),
                })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as Deserialize>::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

fixed_bytes!(
    /// 20-byte validator signer address
    Address,
    20
);

fixed_bytes!(
    /// 32-byte content hash
    Hash,
    32
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let hash = Hash::new([0xab; 32]);
        let text = hash.to_string();
        assert!(text.starts_with("0xabab"));
        assert_eq!(text.parse::<Hash>().unwrap(), hash);

        // prefix is optional
        let addr: Address = "0102030405060708090a0b0c0d0e0f1011121314".parse().unwrap();
        assert_eq!(addr.0[0], 1);
        assert_eq!(addr.0[19], 0x14);
    }

    #[test]
    fn test_parse_wrong_length() {
        let err = "0x0102".parse::<Address>().unwrap_err();
        assert_eq!(
            err,
            ParseBytesError::InvalidLength {
                expected: 20,
                actual: 2
            }
        );
        assert!(matches!("0xzz".parse::<Hash>(), Err(ParseBytesError::InvalidHex(_))));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let addr = Address::new([7u8; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_is_zero() {
        assert!(Hash::default().is_zero());
        assert!(!Address::new([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]).is_zero());
    }
}
