use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use stockledger_core::Sku;
use stockledger_inventory::keys::{product_key, transaction_id_key, transaction_key};
use stockledger_inventory::{Product, Transaction, TransactionType};

use crate::ledger::{LedgerError, VerifiedStore, VerifiedWrite};

use super::error::{StockError, StockResult};
use super::history::HistoryReader;

/// A requested stock movement, already shape-validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTransaction {
    pub sku: Sku,
    pub kind: TransactionType,
    /// Unsigned for IN/OUT (the sign is normalized), signed for ADJUSTMENT.
    pub quantity: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedTransaction {
    pub transaction: Transaction,
    pub verified: bool,
}

/// Validates movements against the replayed balance and writes them.
///
/// Nothing serializes concurrent writers: two movements for the same SKU may
/// both pass the stock check against the same balance.
#[derive(Clone)]
pub struct TransactionRecorder {
    store: Arc<dyn VerifiedStore>,
    history: HistoryReader,
}

impl TransactionRecorder {
    pub fn new(store: Arc<dyn VerifiedStore>, history: HistoryReader) -> Self {
        Self { store, history }
    }

    #[tracing::instrument(skip_all, fields(sku = %request.sku, kind = %request.kind))]
    pub async fn record(
        &self,
        request: RecordTransaction,
        performed_by: &str,
    ) -> StockResult<RecordedTransaction> {
        let product = match self.store.verified_get(product_key(&request.sku).as_bytes()).await {
            Ok(entry) => entry.entry.value,
            Err(LedgerError::KeyNotFound) => return Err(StockError::not_found("Product not found")),
            Err(e) => return Err(e.into()),
        };

        let balance = self.history.current_balance(&request.sku).await;
        let quantity_change = request.kind.quantity_change(request.quantity);
        request.kind.ensure_covered(balance, quantity_change)?;
        let balance_after = balance.saturating_add(quantity_change);

        let transaction = Transaction::record(
            request.sku,
            request.kind,
            request.quantity,
            request.reason,
            performed_by,
            Utc::now(),
        );
        self.persist(&transaction).await?;

        tracing::info!(
            transaction_id = %transaction.transaction_id,
            quantity_change,
            balance_after,
            "transaction recorded"
        );

        if self.history.config().mirror_product_balance {
            self.mirror_balance(&product, balance_after).await;
        }

        Ok(RecordedTransaction {
            transaction,
            verified: true,
        })
    }

    /// Write `transaction` under its SKU key, then under its id key.
    ///
    /// The two writes are independent: if the second fails the record exists
    /// in the SKU history but cannot be looked up by id. That state is logged
    /// and surfaced, never rolled back.
    pub async fn persist(&self, transaction: &Transaction) -> StockResult<VerifiedWrite> {
        let payload = transaction.to_vec()?;

        let by_sku = self
            .store
            .verified_set(transaction_key(&transaction.sku).as_bytes(), payload.clone())
            .await?;

        if let Err(e) = self
            .store
            .verified_set(transaction_id_key(&transaction.transaction_id).as_bytes(), payload)
            .await
        {
            tracing::error!(
                transaction_id = %transaction.transaction_id,
                sku = %transaction.sku,
                error = %e,
                "id index write failed after history write; transaction is not auditable by id"
            );
            return Err(e.into());
        }

        Ok(by_sku)
    }

    /// Best-effort overwrite of the product record's `quantity`.
    async fn mirror_balance(&self, product: &[u8], balance: i64) {
        let result = async {
            let mut product = Product::from_slice(product)?;
            product.quantity = balance;
            self.store
                .verified_set(product_key(&product.sku).as_bytes(), product.to_vec()?)
                .await?;
            Ok::<_, StockError>(())
        }
        .await;
        if let Err(e) = result {
            tracing::warn!(balance, error = %e, "failed to mirror balance onto product record");
        }
    }
}
