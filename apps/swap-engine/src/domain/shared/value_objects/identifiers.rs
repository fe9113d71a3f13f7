//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up IDs from different contexts.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(OrderId, "Unique identifier for a swap order.");
define_id!(
    TxHash,
    "Settlement receipt identifier (64 lowercase hex characters)."
);

impl OrderId {
    /// Generate a new unique order identifier using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl TxHash {
    /// Length of a settlement receipt in hex characters.
    pub const HEX_LEN: usize = 64;

    /// Encode 32 raw bytes as a receipt.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Returns true if this receipt is 64 lowercase hex characters.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == Self::HEX_LEN
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_new_and_display() {
        let id = OrderId::new("ord-123");
        assert_eq!(id.as_str(), "ord-123");
        assert_eq!(format!("{id}"), "ord-123");
    }

    #[test]
    fn order_id_generate_is_unique() {
        let id1 = OrderId::generate();
        let id2 = OrderId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn order_id_from_string() {
        let id: OrderId = "ord-123".into();
        assert_eq!(id.as_str(), "ord-123");

        let id: OrderId = String::from("ord-456").into();
        assert_eq!(id.into_inner(), "ord-456");
    }

    #[test]
    fn tx_hash_from_bytes_is_hex() {
        let hash = TxHash::from_bytes(&[0xab; 32]);
        assert_eq!(hash.as_str().len(), 64);
        assert!(hash.as_str().starts_with("abab"));
        assert!(hash.is_well_formed());
    }

    #[test]
    fn tx_hash_rejects_malformed() {
        assert!(!TxHash::new("xyz").is_well_formed());
        assert!(!TxHash::new("A".repeat(64)).is_well_formed());
    }

    #[test]
    fn serde_roundtrip() {
        let id = OrderId::new("ord-123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ord-123\"");

        let parsed: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
