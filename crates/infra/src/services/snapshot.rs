use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use stockledger_core::Sku;
use stockledger_inventory::Product;
use stockledger_inventory::balance::{last_transaction_timestamp, stock_level};
use stockledger_inventory::keys::{product_key, sku_from_product_key};

use crate::ledger::{LedgerError, VerifiedStore};

use super::error::StockResult;
use super::history::HistoryReader;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRow {
    pub sku: String,
    pub product: Option<Product>,
    pub current_quantity: i64,
    pub last_transaction_timestamp: Option<String>,
}

/// Full-inventory report over every `product:` key in the ledger.
#[derive(Clone)]
pub struct SnapshotBuilder {
    store: Arc<dyn VerifiedStore>,
    history: HistoryReader,
}

impl SnapshotBuilder {
    pub fn new(store: Arc<dyn VerifiedStore>, history: HistoryReader) -> Self {
        Self { store, history }
    }

    /// One row per product key, in the order the keys were first written.
    ///
    /// SKUs are processed one at a time. A missing product record or an
    /// unreadable history degrades that row; only a failed scan or a failed
    /// proof aborts the report.
    #[tracing::instrument(skip_all)]
    pub async fn build(&self) -> StockResult<Vec<SnapshotRow>> {
        let entries = self.store.scan_entries(1).await?;

        let mut seen = HashSet::new();
        let skus: Vec<String> = entries
            .iter()
            .filter_map(|e| sku_from_product_key(&e.key))
            .filter(|sku| seen.insert(sku.to_string()))
            .map(str::to_string)
            .collect();
        tracing::info!(products = skus.len(), "building inventory snapshot");

        let mut rows = Vec::with_capacity(skus.len());
        for raw in skus {
            let Ok(sku) = raw.parse::<Sku>() else {
                tracing::warn!(sku = %raw, "skipping product key with malformed sku");
                continue;
            };
            rows.push(self.row(sku).await?);
        }
        Ok(rows)
    }

    async fn row(&self, sku: Sku) -> StockResult<SnapshotRow> {
        let product = match self.store.verified_get(product_key(&sku).as_bytes()).await {
            Ok(verified) => match Product::from_slice(&verified.entry.value) {
                Ok(product) => Some(product),
                Err(e) => {
                    tracing::warn!(sku = %sku, error = %e, "unreadable product record in snapshot");
                    None
                }
            },
            Err(LedgerError::KeyNotFound) => None,
            Err(e) => return Err(e.into()),
        };

        let fallback = product.as_ref().map(|p| p.quantity).unwrap_or(0);
        let (current_quantity, last_transaction_timestamp) =
            match self.history.load_versions(&sku, self.history.config().history_limit).await {
                Ok(versions) => (
                    stock_level(versions.iter().map(Vec::as_slice), fallback),
                    last_transaction_timestamp(versions.iter().map(Vec::as_slice)),
                ),
                Err(e) => {
                    tracing::warn!(sku = %sku, error = %e, "history unavailable in snapshot");
                    (0, None)
                }
            };

        Ok(SnapshotRow {
            sku: sku.to_string(),
            product,
            current_quantity,
            last_transaction_timestamp,
        })
    }
}
