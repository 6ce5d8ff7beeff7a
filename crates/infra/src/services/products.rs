use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use stockledger_core::{DomainError, Sku};
use stockledger_inventory::balance::stock_level;
use stockledger_inventory::keys::product_key;
use stockledger_inventory::{NewProduct, Product, ProductView, Transaction, TransactionType};

use crate::ledger::{LedgerError, VerifiedStore};

use super::error::{StockError, StockResult};
use super::history::HistoryReader;
use super::recorder::TransactionRecorder;

pub const OPENING_STOCK_REASON: &str = "initial stock";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedProduct {
    pub product: Product,
    /// Hex chain digest of the transaction that stored the record.
    pub verification: String,
}

/// Create-once product records with stock derived at read time.
#[derive(Clone)]
pub struct ProductCatalog {
    store: Arc<dyn VerifiedStore>,
    history: HistoryReader,
    recorder: TransactionRecorder,
}

impl ProductCatalog {
    pub fn new(
        store: Arc<dyn VerifiedStore>,
        history: HistoryReader,
        recorder: TransactionRecorder,
    ) -> Self {
        Self {
            store,
            history,
            recorder,
        }
    }

    /// Store a new product. Non-zero initial stock is also recorded as an
    /// opening `IN` movement so replayed balances include it.
    ///
    /// If that movement fails the product record is already written; the
    /// error is returned so the caller knows the create did not complete.
    #[tracing::instrument(skip_all, fields(sku = %input.sku))]
    pub async fn create(&self, input: NewProduct, performed_by: &str) -> StockResult<CreatedProduct> {
        let product = input.into_product()?;
        let key = product_key(&product.sku);

        match self.store.verified_get(key.as_bytes()).await {
            Ok(_) => {
                return Err(DomainError::conflict(format!(
                    "Product with SKU {} already exists",
                    product.sku
                ))
                .into());
            }
            Err(LedgerError::KeyNotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let write = self.store.verified_set(key.as_bytes(), product.to_vec()?).await?;
        tracing::info!(tx_id = write.header.tx_id, "product created");

        if product.quantity > 0 {
            let opening = Transaction::record(
                product.sku.clone(),
                TransactionType::In,
                product.quantity,
                Some(OPENING_STOCK_REASON.to_string()),
                performed_by,
                Utc::now(),
            );
            if let Err(e) = self.recorder.persist(&opening).await {
                tracing::error!(
                    transaction_id = %opening.transaction_id,
                    error = %e,
                    "product stored but its opening stock movement failed"
                );
                return Err(e);
            }
        }

        Ok(CreatedProduct {
            product,
            verification: write.header.digest.to_hex(),
        })
    }

    #[tracing::instrument(skip_all, fields(sku = %sku))]
    pub async fn get(&self, sku: &Sku) -> StockResult<ProductView> {
        let entry = match self.store.verified_get(product_key(sku).as_bytes()).await {
            Ok(entry) => entry.entry,
            Err(LedgerError::KeyNotFound) => return Err(StockError::not_found("Product not found")),
            Err(e) => return Err(e.into()),
        };

        let product = Product::from_slice(&entry.value).map_err(|e| {
            tracing::error!(error = %e, "corrupt product record");
            DomainError::corrupt("Corrupt product data")
        })?;

        let versions = self.history.versions_or_empty(sku).await;
        let current_stock = stock_level(versions.iter().map(Vec::as_slice), product.quantity);
        Ok(product.with_stock(current_stock))
    }
}
