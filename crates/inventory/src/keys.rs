//! Ledger key namespace.
//!
//! These layouts are shared with data already written to the ledger and must
//! stay bit-for-bit stable. SKUs are restricted to `[A-Z0-9-]`, so a SKU can
//! never produce a key under the lowercase `transaction:id:` index.

use stockledger_core::{Sku, TransactionId};

pub const PRODUCT_PREFIX: &str = "product:";
pub const TRANSACTION_PREFIX: &str = "transaction:";
pub const TRANSACTION_ID_PREFIX: &str = "transaction:id:";
pub const HEALTH_KEY: &str = "health:status";

/// `product:<sku>`: the product record.
pub fn product_key(sku: &Sku) -> String {
    format!("{PRODUCT_PREFIX}{sku}")
}

/// `transaction:<sku>`: one version per recorded movement.
pub fn transaction_key(sku: &Sku) -> String {
    format!("{TRANSACTION_PREFIX}{sku}")
}

/// `transaction:id:<uuid>`: single-version index for lookup by id.
pub fn transaction_id_key(id: &TransactionId) -> String {
    format!("{TRANSACTION_ID_PREFIX}{id}")
}

/// Recover the raw SKU text from a `product:` key, if the key is one.
pub fn sku_from_product_key(key: &[u8]) -> Option<&str> {
    let key = std::str::from_utf8(key).ok()?;
    key.strip_prefix(PRODUCT_PREFIX)
}
