use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, Sku};

/// Product record as persisted under `product:<sku>`.
///
/// `quantity` is the stock the product was created with. It is only used as a
/// fallback when the SKU has no transaction history yet; see
/// [`crate::balance::stock_level`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub sku: Sku,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
}

impl Product {
    /// Build a product, enforcing the record invariants.
    pub fn new(
        sku: Sku,
        name: impl Into<String>,
        price: f64,
        quantity: i64,
    ) -> DomainResult<Self> {
        let product = Self {
            sku,
            name: name.into().trim().to_string(),
            description: None,
            price,
            quantity,
            category: None,
            supplier: None,
        };
        product.validate()?;
        Ok(product)
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = normalize_optional(description);
        self
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = normalize_optional(category);
        self
    }

    pub fn with_supplier(mut self, supplier: Option<String>) -> Self {
        self.supplier = normalize_optional(supplier);
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.chars().count() < 2 {
            return Err(DomainError::validation("name must be at least 2 characters"));
        }
        if !(self.price.is_finite() && self.price > 0.0) {
            return Err(DomainError::validation("price must be a positive number"));
        }
        if self.quantity < 0 {
            return Err(DomainError::validation("quantity must be a non-negative integer"));
        }
        Ok(())
    }

    /// Decode a stored product record.
    pub fn from_slice(bytes: &[u8]) -> DomainResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| DomainError::corrupt(format!("product record: {e}")))
    }

    pub fn to_vec(&self) -> DomainResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| DomainError::corrupt(format!("product serialization failed: {e}")))
    }

    /// Attach a derived stock level for presentation.
    pub fn with_stock(self, current_stock: i64) -> ProductView {
        ProductView {
            product: self,
            current_stock,
        }
    }
}

/// Validated input for creating a product.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub sku: Sku,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub quantity: i64,
    pub category: Option<String>,
    pub supplier: Option<String>,
}

impl NewProduct {
    pub fn into_product(self) -> DomainResult<Product> {
        Ok(Product::new(self.sku, self.name, self.price, self.quantity)?
            .with_description(self.description)
            .with_category(self.category)
            .with_supplier(self.supplier))
    }
}

/// A product as returned to callers: the stored record plus the stock level
/// recomputed from transaction history at read time. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub current_stock: i64,
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sku() -> Sku {
        "SKU-1".parse().unwrap()
    }

    #[test]
    fn new_product_enforces_invariants() {
        assert!(Product::new(sku(), "Widget", 9.5, 10).is_ok());
        assert!(matches!(
            Product::new(sku(), "W", 9.5, 10),
            Err(DomainError::Validation(_))
        ));
        assert!(Product::new(sku(), "Widget", 0.0, 10).is_err());
        assert!(Product::new(sku(), "Widget", f64::NAN, 10).is_err());
        assert!(Product::new(sku(), "Widget", 1.0, -1).is_err());
    }

    #[test]
    fn empty_optional_fields_are_dropped() {
        let p = Product::new(sku(), "Widget", 1.0, 0)
            .unwrap()
            .with_category(Some("   ".to_string()))
            .with_supplier(Some(" Acme ".to_string()));
        assert_eq!(p.category, None);
        assert_eq!(p.supplier.as_deref(), Some("Acme"));

        let json = serde_json::to_value(&p).unwrap();
        assert!(json.get("category").is_none());
        assert!(json.get("current_stock").is_none());
    }

    #[test]
    fn view_flattens_the_record() {
        let p = Product::new(sku(), "Widget", 2.0, 4).unwrap();
        let json = serde_json::to_value(p.with_stock(7)).unwrap();
        assert_eq!(json["sku"], "SKU-1");
        assert_eq!(json["quantity"], 4);
        assert_eq!(json["current_stock"], 7);
    }

    #[test]
    fn new_product_builds_a_normalized_record() {
        let input = NewProduct {
            sku: sku(),
            name: "  Widget ".to_string(),
            description: Some("".to_string()),
            price: 3.25,
            quantity: 5,
            category: Some("tools".to_string()),
            supplier: None,
        };
        let p = input.clone().into_product().unwrap();
        assert_eq!(p.name, "Widget");
        assert_eq!(p.description, None);
        assert_eq!(p.category.as_deref(), Some("tools"));

        let bad = NewProduct { price: -1.0, ..input };
        assert!(bad.into_product().is_err());
    }

    #[test]
    fn garbage_bytes_are_corrupt_data() {
        assert!(matches!(
            Product::from_slice(b"{not json"),
            Err(DomainError::CorruptData(_))
        ));
    }
}
