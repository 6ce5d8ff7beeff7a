use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, Sku, TransactionId};

/// Kind of stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    In,
    Out,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::In => "IN",
            TransactionType::Out => "OUT",
            TransactionType::Adjustment => "ADJUSTMENT",
        }
    }

    /// Signed delta for a requested quantity.
    ///
    /// `IN` is always positive and `OUT` always negative regardless of the sign
    /// the caller sent; `ADJUSTMENT` keeps the caller's sign.
    pub fn quantity_change(&self, quantity: i64) -> i64 {
        match self {
            TransactionType::In => quantity.saturating_abs(),
            TransactionType::Out => -quantity.saturating_abs(),
            TransactionType::Adjustment => quantity,
        }
    }

    /// Reject `OUT` movements that would take the balance below zero.
    ///
    /// `IN` and `ADJUSTMENT` are never blocked, even when an adjustment leaves
    /// the balance negative.
    pub fn ensure_covered(&self, balance: i64, quantity_change: i64) -> DomainResult<()> {
        if *self == TransactionType::Out && balance.saturating_add(quantity_change) < 0 {
            return Err(DomainError::InsufficientStock {
                available: balance,
                requested: quantity_change.saturating_abs(),
            });
        }
        Ok(())
    }
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(TransactionType::In),
            "OUT" => Ok(TransactionType::Out),
            "ADJUSTMENT" => Ok(TransactionType::Adjustment),
            _ => Err(DomainError::validation(
                "type must be one of IN, OUT, ADJUSTMENT",
            )),
        }
    }
}

/// An immutable, recorded stock movement.
///
/// Stored as JSON under both `transaction:<sku>` and `transaction:id:<id>`.
/// `timestamp` is kept as the exact ISO-8601 text that was written so a
/// record read back compares equal to the one recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: TransactionId,
    pub sku: Sku,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub quantity_change: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub performed_by: String,
    pub timestamp: String,
}

impl Transaction {
    /// Build a new record with a fresh id and a normalized delta.
    pub fn record(
        sku: Sku,
        kind: TransactionType,
        quantity: i64,
        reason: Option<String>,
        performed_by: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        let performed_by = performed_by.into();
        Self {
            transaction_id: TransactionId::new(),
            sku,
            kind,
            quantity_change: kind.quantity_change(quantity),
            reason: reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            performed_by: if performed_by.trim().is_empty() {
                "unknown".to_string()
            } else {
                performed_by
            },
            timestamp: format_timestamp(at),
        }
    }

    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    pub fn from_slice(bytes: &[u8]) -> DomainResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| DomainError::corrupt(format!("transaction record: {e}")))
    }

    pub fn to_vec(&self) -> DomainResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| DomainError::corrupt(format!("transaction serialization failed: {e}")))
    }
}

/// ISO-8601 in UTC with millisecond precision (`2024-05-01T12:00:00.000Z`).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn sku() -> Sku {
        "SKU-1".parse().unwrap()
    }

    #[test]
    fn type_round_trips_as_uppercase() {
        assert_eq!(serde_json::to_string(&TransactionType::Adjustment).unwrap(), "\"ADJUSTMENT\"");
        assert_eq!("OUT".parse::<TransactionType>().unwrap(), TransactionType::Out);
        assert!("out".parse::<TransactionType>().is_err());
    }

    #[test]
    fn out_is_blocked_only_when_it_overdraws() {
        let out = TransactionType::Out;
        assert!(out.ensure_covered(6, -6).is_ok());
        assert_eq!(
            out.ensure_covered(6, -10),
            Err(DomainError::InsufficientStock { available: 6, requested: 10 })
        );
        assert!(TransactionType::Adjustment.ensure_covered(0, -50).is_ok());
        assert!(TransactionType::In.ensure_covered(-3, 1).is_ok());
    }

    #[test]
    fn record_serializes_with_wire_field_names() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let tx = Transaction::record(sku(), TransactionType::Out, 4, Some(" sale ".into()), "", at);

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "OUT");
        assert_eq!(json["quantity_change"], -4);
        assert_eq!(json["reason"], "sale");
        assert_eq!(json["performed_by"], "unknown");
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00.000Z");
        assert_eq!(tx.occurred_at(), Some(at));
    }

    proptest! {
        #[test]
        fn sign_is_normalized(q in -1_000_000i64..1_000_000i64) {
            prop_assert!(TransactionType::In.quantity_change(q) >= 0);
            prop_assert!(TransactionType::Out.quantity_change(q) <= 0);
            prop_assert_eq!(TransactionType::Adjustment.quantity_change(q), q);
            prop_assert_eq!(TransactionType::In.quantity_change(q).abs(), q.abs());
        }
    }
}
