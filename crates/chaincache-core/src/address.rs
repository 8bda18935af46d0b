//! Node address validation.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::InvalidAddress;

/// Trailing marker every address carries.
pub const ADDRESS_SUFFIX: char = 'R';
/// Fewest digits an address may have before the suffix.
pub const MIN_ADDRESS_DIGITS: usize = 15;
/// Most digits an address may have before the suffix.
pub const MAX_ADDRESS_DIGITS: usize = 30;

/// A validated account address: 15 to 30 ASCII digits followed by `R`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if `s` matches the address format.
    pub fn is_valid(s: &str) -> bool {
        match s.strip_suffix(ADDRESS_SUFFIX) {
            Some(digits) => {
                (MIN_ADDRESS_DIGITS..=MAX_ADDRESS_DIGITS).contains(&digits.len())
                    && digits.bytes().all(|b| b.is_ascii_digit())
            }
            None => false,
        }
    }

    /// Parse an optional request slot. Missing or invalid slots become `None`.
    pub fn from_slot(slot: Option<&str>) -> Option<Self> {
        slot.and_then(|s| s.parse().ok())
    }
}

impl FromStr for Address {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::is_valid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidAddress(s.to_string()))
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_fifteen_digits() {
        let addr: Address = "123456789012345R".parse().unwrap();
        assert_eq!(addr.as_str(), "123456789012345R");
    }

    #[test]
    fn accepts_thirty_digits() {
        let s = format!("{}R", "9".repeat(30));
        assert!(Address::is_valid(&s));
    }

    #[test]
    fn rejects_short_and_long() {
        assert!("12R".parse::<Address>().is_err());
        assert!(!Address::is_valid(&format!("{}R", "1".repeat(14))));
        assert!(!Address::is_valid(&format!("{}R", "1".repeat(31))));
    }

    #[test]
    fn rejects_wrong_marker_and_non_digits() {
        assert!(!Address::is_valid("123456789012345"));
        assert!(!Address::is_valid("123456789012345r"));
        assert!(!Address::is_valid("12345678901234aR"));
        assert!(!Address::is_valid(""));
        assert!(!Address::is_valid("R"));
    }

    #[test]
    fn slot_parsing_drops_invalid() {
        assert!(Address::from_slot(None).is_none());
        assert!(Address::from_slot(Some("")).is_none());
        assert!(Address::from_slot(Some("12R")).is_none());
        assert_eq!(
            Address::from_slot(Some("7889374079483640385R")).map(|a| a.to_string()),
            Some("7889374079483640385R".to_string())
        );
    }
}
