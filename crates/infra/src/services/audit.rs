use std::sync::Arc;

use serde::Serialize;

use stockledger_core::{DomainError, TransactionId};
use stockledger_inventory::Transaction;
use stockledger_inventory::keys::transaction_id_key;

use crate::ledger::{LedgerError, VerifiedStore};

use super::error::{StockError, StockResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditedTransaction {
    pub transaction: Transaction,
    pub verified: bool,
}

/// Resolves a transaction by id through the `transaction:id:` index.
#[derive(Clone)]
pub struct AuditLookup {
    store: Arc<dyn VerifiedStore>,
}

impl AuditLookup {
    pub fn new(store: Arc<dyn VerifiedStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip_all, fields(transaction_id = %id))]
    pub async fn lookup(&self, id: &TransactionId) -> StockResult<AuditedTransaction> {
        let entry = match self.store.verified_get(transaction_id_key(id).as_bytes()).await {
            Ok(verified) => verified.entry,
            Err(LedgerError::KeyNotFound) => {
                return Err(StockError::not_found("Transaction not found"));
            }
            Err(e) => return Err(e.into()),
        };

        let transaction = Transaction::from_slice(&entry.value).map_err(|e| {
            tracing::error!(error = %e, "corrupt transaction record");
            DomainError::corrupt("Corrupt transaction data")
        })?;

        Ok(AuditedTransaction {
            transaction,
            verified: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::PlainStore;
    use crate::services::test_support::{client, product, record, services};

    #[tokio::test]
    async fn audit_returns_the_recorded_transaction() {
        let (_ledger, services) = services().await;
        let sku = product(&services, "AUD-1", 3).await;
        let recorded = record(&services, &sku, "OUT", 2).await;

        let audited = services
            .audit
            .lookup(&recorded.transaction.transaction_id)
            .await
            .unwrap();
        assert_eq!(audited.transaction, recorded.transaction);
        assert!(audited.verified);

        let again = services
            .audit
            .lookup(&recorded.transaction.transaction_id)
            .await
            .unwrap();
        assert_eq!(again, audited);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let (_ledger, services) = services().await;
        assert_eq!(
            services.audit.lookup(&TransactionId::new()).await,
            Err(StockError::NotFound("Transaction not found".into()))
        );
    }

    #[tokio::test]
    async fn corrupt_record_is_reported_distinctly() {
        let (ledger, services) = services().await;
        let id = TransactionId::new();
        client(&ledger)
            .await
            .set(transaction_id_key(&id).as_bytes(), b"[1,2,3]".to_vec())
            .await
            .unwrap();

        assert_eq!(
            services.audit.lookup(&id).await,
            Err(StockError::Domain(DomainError::CorruptData(
                "Corrupt transaction data".into()
            )))
        );
    }

    #[tokio::test]
    async fn tampered_proof_is_never_reported_as_found() {
        let (ledger, services) = services().await;
        let sku = product(&services, "AUD-2", 3).await;
        let recorded = record(&services, &sku, "IN", 1).await;

        ledger.tamper_proofs(true);
        assert!(matches!(
            services.audit.lookup(&recorded.transaction.transaction_id).await,
            Err(StockError::Verification(_))
        ));
    }
}
