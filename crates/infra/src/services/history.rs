use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use stockledger_core::Sku;
use stockledger_inventory::balance::{self, RunningEntry};
use stockledger_inventory::keys::transaction_key;
use stockledger_inventory::transaction::format_timestamp;

use crate::config::StockConfig;
use crate::ledger::{LedgerError, VerifiedStore};

use super::error::{StockError, StockResult};

/// One history record as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub entry: RunningEntry,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockHistory {
    pub sku: Sku,
    pub transactions: Vec<HistoryEntry>,
    pub running_balance: i64,
}

/// Stock of a SKU restricted to one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryAt {
    pub sku: Sku,
    pub timestamp: String,
    pub inventory: i64,
    pub transactions: Vec<Value>,
}

/// Reads the version history of `transaction:<sku>`.
#[derive(Clone)]
pub struct HistoryReader {
    store: Arc<dyn VerifiedStore>,
    config: StockConfig,
}

impl HistoryReader {
    pub fn new(store: Arc<dyn VerifiedStore>, config: StockConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> StockConfig {
        self.config
    }

    /// Raw version payloads, most recent first. A SKU that was never
    /// transacted has an empty history.
    pub async fn load_versions(&self, sku: &Sku, limit: usize) -> StockResult<Vec<Vec<u8>>> {
        match self
            .store
            .history(transaction_key(sku).as_bytes(), limit)
            .await
        {
            Ok(entries) => Ok(entries.into_iter().map(|e| e.value).collect()),
            Err(LedgerError::KeyNotFound) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Like [`Self::load_versions`] with the default limit, but a failed read
    /// is logged and treated as no history.
    pub async fn versions_or_empty(&self, sku: &Sku) -> Vec<Vec<u8>> {
        match self.load_versions(sku, self.config.history_limit).await {
            Ok(versions) => versions,
            Err(e) => {
                tracing::warn!(sku = %sku, error = %e, "history read failed; treating as empty");
                Vec::new()
            }
        }
    }

    /// Sum of every recorded delta (0 when the history cannot be read).
    pub async fn current_balance(&self, sku: &Sku) -> i64 {
        let versions = self.versions_or_empty(sku).await;
        balance::current_balance(versions.iter().map(Vec::as_slice))
    }

    /// Transactions with running balances, most recent first.
    #[tracing::instrument(skip_all, fields(sku = %sku))]
    pub async fn history(&self, sku: &Sku, size: Option<usize>) -> StockResult<StockHistory> {
        let limit = size.unwrap_or(self.config.history_limit);
        let versions = self.load_versions(sku, limit).await?;
        if versions.is_empty() {
            return Err(StockError::not_found(format!(
                "No transactions found for SKU: {sku}"
            )));
        }

        let running = balance::running_balance(versions.iter().map(Vec::as_slice));
        Ok(StockHistory {
            sku: sku.clone(),
            transactions: running
                .transactions
                .into_iter()
                .map(|entry| HistoryEntry {
                    entry,
                    verified: true,
                })
                .collect(),
            running_balance: running.total,
        })
    }

    /// Stock moved on the UTC calendar day of `at`.
    #[tracing::instrument(skip_all, fields(sku = %sku, at = %at))]
    pub async fn inventory_at(&self, sku: &Sku, at: DateTime<Utc>) -> StockResult<InventoryAt> {
        let versions = self
            .load_versions(sku, self.config.time_travel_limit)
            .await?;
        let dated = balance::balance_as_of(versions.iter().map(Vec::as_slice), at);
        Ok(InventoryAt {
            sku: sku.clone(),
            timestamp: format_timestamp(at),
            inventory: dated.inventory,
            transactions: dated.transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{product, record, services};
    use chrono::TimeZone;

    #[tokio::test]
    async fn untransacted_sku_has_no_history() {
        let (_ledger, services) = services().await;
        let sku: Sku = "NOPE".parse().unwrap();

        assert_eq!(
            services.history.history(&sku, None).await,
            Err(StockError::NotFound("No transactions found for SKU: NOPE".into()))
        );
        assert_eq!(services.history.current_balance(&sku).await, 0);
    }

    #[tokio::test]
    async fn history_is_most_recent_first_with_running_sums() {
        let (_ledger, services) = services().await;
        let sku = product(&services, "SKU-H", 10).await;
        record(&services, &sku, "OUT", 4).await;
        record(&services, &sku, "IN", 1).await;

        let history = services.history.history(&sku, None).await.unwrap();
        let deltas: Vec<i64> = history
            .transactions
            .iter()
            .map(|t| t.entry.transaction["quantity_change"].as_i64().unwrap())
            .collect();
        assert_eq!(deltas, vec![1, -4, 10]);
        assert_eq!(history.transactions[2].entry.running_balance, 7);
        assert_eq!(history.running_balance, 7);
        assert!(history.transactions.iter().all(|t| t.verified));

        let capped = services.history.history(&sku, Some(2)).await.unwrap();
        assert_eq!(capped.transactions.len(), 2);
        assert_eq!(capped.running_balance, -3);
    }

    #[tokio::test]
    async fn history_failures_are_absorbed_for_balances_only() {
        let (ledger, services) = services().await;
        let sku = product(&services, "SKU-F", 5).await;

        ledger.fail_history(true);
        assert_eq!(services.history.current_balance(&sku).await, 0);
        assert!(matches!(
            services.history.history(&sku, None).await,
            Err(StockError::Ledger(LedgerError::Backend(_)))
        ));
    }

    #[tokio::test]
    async fn inventory_at_only_counts_that_day() {
        let (_ledger, services) = services().await;
        let sku = product(&services, "SKU-T", 3).await;

        let today = services.history.inventory_at(&sku, Utc::now()).await.unwrap();
        assert_eq!(today.inventory, 3);
        assert_eq!(today.transactions.len(), 1);

        let long_ago = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        let quiet = services.history.inventory_at(&sku, long_ago).await.unwrap();
        assert_eq!(quiet.inventory, 0);
        assert!(quiet.transactions.is_empty());
        assert_eq!(quiet.timestamp, "2001-01-01T00:00:00.000Z");
    }
}
