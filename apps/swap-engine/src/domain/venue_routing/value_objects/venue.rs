//! Liquidity venues.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A liquidity source capable of quoting and settling a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    /// Raydium AMM.
    Raydium,
    /// Meteora dynamic pools.
    Meteora,
}

impl Venue {
    /// Every known venue.
    pub const ALL: [Self; 2] = [Self::Raydium, Self::Meteora];

    /// Wire name of the venue.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Raydium => "raydium",
            Self::Meteora => "meteora",
        }
    }

    /// Parse a wire name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_lowercase() {
        assert_eq!(serde_json::to_string(&Venue::Meteora).unwrap(), "\"meteora\"");
        let parsed: Venue = serde_json::from_str("\"raydium\"").unwrap();
        assert_eq!(parsed, Venue::Raydium);
    }

    #[test]
    fn parse_known_and_unknown() {
        assert_eq!(Venue::parse("Meteora"), Some(Venue::Meteora));
        assert_eq!(Venue::parse("orca"), None);
    }
}
