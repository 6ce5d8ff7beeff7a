//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Stock-keeping unit: the product's natural key.
///
/// Only uppercase ASCII letters, digits and hyphens are accepted, and the value
/// must be non-empty. The SKU is embedded verbatim in ledger keys, so the
/// character set is part of the storage contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_valid_char(c: char) -> bool {
        c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-'
    }
}

impl core::fmt::Display for Sku {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Sku {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DomainError::invalid_id("sku is required"));
        }
        if !s.chars().all(Self::is_valid_char) {
            return Err(DomainError::invalid_id(
                "sku must be uppercase letters, numbers, or hyphens",
            ));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Sku {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Sku> for String {
    fn from(value: Sku) -> Self {
        value.0
    }
}

impl AsRef<str> for Sku {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of a recorded stock movement (UUIDv4).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Create a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<TransactionId> for Uuid {
    fn from(value: TransactionId) -> Self {
        value.0
    }
}

impl FromStr for TransactionId {
    type Err = DomainError;

    /// Parses a UUID and requires it to be version 4.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s.trim())
            .map_err(|e| DomainError::invalid_id(format!("TransactionId: {e}")))?;
        if uuid.get_version_num() != 4 {
            return Err(DomainError::invalid_id(
                "transaction_id must be a valid UUID v4",
            ));
        }
        Ok(Self(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sku_accepts_uppercase_digits_and_hyphens() {
        let sku: Sku = "ABC-123".parse().unwrap();
        assert_eq!(sku.as_str(), "ABC-123");
    }

    #[test]
    fn sku_rejects_lowercase_and_empty() {
        assert!("abc-1".parse::<Sku>().is_err());
        assert!("".parse::<Sku>().is_err());
        assert!("SKU 1".parse::<Sku>().is_err());
        assert!("SKU:1".parse::<Sku>().is_err());
    }

    #[test]
    fn sku_deserialization_validates() {
        let ok: Sku = serde_json::from_str("\"SKU-9\"").unwrap();
        assert_eq!(ok.to_string(), "SKU-9");
        assert!(serde_json::from_str::<Sku>("\"sku-9\"").is_err());
    }

    #[test]
    fn transaction_id_requires_v4() {
        let id = TransactionId::new();
        let parsed: TransactionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);

        // Nil UUID is well-formed but not v4.
        assert!("00000000-0000-0000-0000-000000000000".parse::<TransactionId>().is_err());
        assert!("not-a-uuid".parse::<TransactionId>().is_err());
    }

    proptest! {
        #[test]
        fn any_sku_from_the_allowed_alphabet_parses(s in "[A-Z0-9-]{1,24}") {
            let sku: Sku = s.parse().unwrap();
            prop_assert_eq!(sku.as_str(), s.as_str());
        }
    }
}
