use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use stockledger_core::{Sku, TransactionId};
use stockledger_infra::services::RecordTransaction;
use stockledger_inventory::{NewProduct, TransactionType};

// -------------------------
// Validation errors
// -------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub type Validated<T> = Result<T, Vec<FieldError>>;

// -------------------------
// Request DTOs
// -------------------------
//
// Fields are held as raw JSON so a wrong type becomes a field error rather
// than a body rejection.

#[derive(Debug, Default, Deserialize)]
pub struct CreateProductRequest {
    pub sku: Option<Value>,
    pub name: Option<Value>,
    pub description: Option<Value>,
    pub price: Option<Value>,
    pub quantity: Option<Value>,
    pub category: Option<Value>,
    pub supplier: Option<Value>,
}

impl CreateProductRequest {
    pub fn validate(self) -> Validated<NewProduct> {
        let mut errors = Vec::new();

        let sku = required_sku(&mut errors, self.sku);
        let name = match required_string(&mut errors, "name", "Name", self.name) {
            Some(name) if name.trim().chars().count() >= 2 => Some(name),
            Some(_) => {
                errors.push(FieldError::new("name", "Name must be at least 2 characters"));
                None
            }
            None => None,
        };
        let description = optional_string(&mut errors, "description", "Description", self.description);
        let price = match self.price {
            None => {
                errors.push(FieldError::new("price", "Price is required"));
                None
            }
            Some(v) => match as_number(&v).filter(|p| p.is_finite() && *p > 0.0) {
                Some(p) => Some(p),
                None => {
                    errors.push(FieldError::new("price", "Price must be a positive number"));
                    None
                }
            },
        };
        let quantity = match self.quantity {
            None => {
                errors.push(FieldError::new("quantity", "Quantity is required"));
                None
            }
            Some(v) => match as_integer(&v).filter(|q| *q >= 0) {
                Some(q) => Some(q),
                None => {
                    errors.push(FieldError::new(
                        "quantity",
                        "Quantity must be a non-negative integer",
                    ));
                    None
                }
            },
        };
        let category = optional_string(&mut errors, "category", "Category", self.category);
        let supplier = optional_string(&mut errors, "supplier", "Supplier", self.supplier);

        match (sku, name, price, quantity) {
            (Some(sku), Some(name), Some(price), Some(quantity)) if errors.is_empty() => {
                Ok(NewProduct {
                    sku,
                    name,
                    description,
                    price,
                    quantity,
                    category,
                    supplier,
                })
            }
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordTransactionRequest {
    pub sku: Option<Value>,
    #[serde(rename = "type")]
    pub kind: Option<Value>,
    pub quantity: Option<Value>,
    pub reason: Option<Value>,
}

impl RecordTransactionRequest {
    pub fn validate(self) -> Validated<RecordTransaction> {
        let mut errors = Vec::new();

        let sku = required_sku(&mut errors, self.sku);
        let kind = match self.kind {
            Some(Value::String(s)) => match s.parse::<TransactionType>() {
                Ok(kind) => Some(kind),
                Err(_) => {
                    errors.push(FieldError::new("type", "Type must be one of IN, OUT, ADJUSTMENT"));
                    None
                }
            },
            _ => {
                errors.push(FieldError::new("type", "Type must be one of IN, OUT, ADJUSTMENT"));
                None
            }
        };
        let quantity = match self.quantity.as_ref().and_then(as_integer) {
            Some(q) => Some(q),
            None => {
                errors.push(FieldError::new("quantity", "Quantity must be an integer"));
                None
            }
        };
        let reason = optional_string(&mut errors, "reason", "Reason", self.reason);

        match (sku, kind, quantity) {
            (Some(sku), Some(kind), Some(quantity)) if errors.is_empty() => Ok(RecordTransaction {
                sku,
                kind,
                quantity,
                reason,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub size: Option<String>,
}

impl HistoryQuery {
    pub fn validate(&self) -> Validated<Option<usize>> {
        match self.size.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => match raw.parse::<usize>() {
                Ok(size) if size >= 1 => Ok(Some(size)),
                _ => Err(vec![FieldError::new("size", "Size must be a positive integer")]),
            },
        }
    }
}

// -------------------------
// Path parameters
// -------------------------

pub fn parse_sku(raw: &str) -> Validated<Sku> {
    raw.parse::<Sku>().map_err(|_| vec![sku_error()])
}

pub fn parse_transaction_id(raw: &str) -> Validated<TransactionId> {
    raw.parse::<TransactionId>().map_err(|_| {
        vec![FieldError::new(
            "transaction_id",
            "Transaction id must be a valid UUID v4",
        )]
    })
}

/// RFC 3339 instant, a bare `YYYY-MM-DD` date (UTC midnight), or a naive
/// `YYYY-MM-DDTHH:MM:SS[.fff]` read as UTC.
pub fn parse_timestamp(raw: &str) -> Validated<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(at.and_utc());
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    Err(vec![FieldError::new("timestamp", "Invalid timestamp")])
}

// -------------------------
// Field helpers
// -------------------------

fn sku_error() -> FieldError {
    FieldError::new("sku", "SKU must be uppercase letters, numbers, or hyphens")
}

fn required_sku(errors: &mut Vec<FieldError>, value: Option<Value>) -> Option<Sku> {
    match value {
        None => {
            errors.push(FieldError::new("sku", "SKU is required"));
            None
        }
        Some(Value::String(s)) => match s.parse::<Sku>() {
            Ok(sku) => Some(sku),
            Err(_) => {
                errors.push(sku_error());
                None
            }
        },
        Some(_) => {
            errors.push(FieldError::new("sku", "SKU must be a string"));
            None
        }
    }
}

fn required_string(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    label: &str,
    value: Option<Value>,
) -> Option<String> {
    match value {
        None => {
            errors.push(FieldError::new(field, format!("{label} is required")));
            None
        }
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            errors.push(FieldError::new(field, format!("{label} must be a string")));
            None
        }
    }
}

fn optional_string(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    label: &str,
    value: Option<Value>,
) -> Option<String> {
    match value {
        None => None,
        Some(Value::String(s)) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Some(_) => {
            errors.push(FieldError::new(field, format!("{label} must be a string")));
            None
        }
    }
}

/// Integers arrive as JSON integers, integral floats, or numeric strings.
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(body: Value) -> Validated<NewProduct> {
        serde_json::from_value::<CreateProductRequest>(body)
            .unwrap()
            .validate()
    }

    fn fields(errors: &[FieldError]) -> Vec<&'static str> {
        errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn valid_product_is_normalized() {
        let p = product(json!({
            "sku": "SKU-1",
            "name": "Widget",
            "price": "9.50",
            "quantity": 10,
            "category": "   ",
            "supplier": " Acme ",
        }))
        .unwrap();
        assert_eq!(p.sku.as_str(), "SKU-1");
        assert_eq!(p.price, 9.5);
        assert_eq!(p.category, None);
        assert_eq!(p.supplier.as_deref(), Some("Acme"));
    }

    #[test]
    fn every_invalid_product_field_is_reported() {
        let errors = product(json!({
            "sku": "sku-1",
            "name": "W",
            "price": 0,
            "quantity": -1,
            "description": 7,
        }))
        .unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["sku", "name", "description", "price", "quantity"]
        );

        let errors = product(json!({})).unwrap_err();
        assert_eq!(fields(&errors), vec!["sku", "name", "price", "quantity"]);
    }

    #[test]
    fn transaction_request_is_validated() {
        let ok = serde_json::from_value::<RecordTransactionRequest>(json!({
            "sku": "SKU-1", "type": "OUT", "quantity": 4, "reason": "sale"
        }))
        .unwrap()
        .validate()
        .unwrap();
        assert_eq!(ok.kind, TransactionType::Out);
        assert_eq!(ok.reason.as_deref(), Some("sale"));

        let errors = serde_json::from_value::<RecordTransactionRequest>(json!({
            "sku": "SKU-1", "type": "MOVE", "quantity": 1.5
        }))
        .unwrap()
        .validate()
        .unwrap_err();
        assert_eq!(fields(&errors), vec!["type", "quantity"]);
    }

    #[test]
    fn size_must_be_positive() {
        assert_eq!(HistoryQuery { size: None }.validate(), Ok(None));
        assert_eq!(HistoryQuery { size: Some("5".into()) }.validate(), Ok(Some(5)));
        assert!(HistoryQuery { size: Some("0".into()) }.validate().is_err());
        assert!(HistoryQuery { size: Some("abc".into()) }.validate().is_err());
    }

    #[test]
    fn timestamps_accept_dates_and_instants() {
        let day = parse_timestamp("2024-05-01").unwrap();
        assert_eq!(day.to_rfc3339(), "2024-05-01T00:00:00+00:00");

        let instant = parse_timestamp("2024-05-01T10:30:00+02:00").unwrap();
        assert_eq!(instant.to_rfc3339(), "2024-05-01T08:30:00+00:00");

        assert!(parse_timestamp("2024-05-01T10:30:00").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn path_ids_are_validated() {
        assert!(parse_sku("SKU-1").is_ok());
        assert!(parse_sku("sku-1").is_err());
        assert!(parse_transaction_id("not-a-uuid").is_err());
        assert!(parse_transaction_id(&TransactionId::new().to_string()).is_ok());
    }
}
