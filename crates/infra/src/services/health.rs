use std::sync::Arc;

use serde::Serialize;

use stockledger_inventory::keys::HEALTH_KEY;

use crate::ledger::{LedgerError, VerifiedStore};

use super::error::StockResult;

pub const HEALTHY_VALUE: &str = "Service is healthy";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub connected: bool,
    pub value: Option<String>,
}

/// Liveness probe: a plain read of `health:status`, seeded on first use.
#[derive(Clone)]
pub struct HealthProbe {
    store: Arc<dyn VerifiedStore>,
}

impl HealthProbe {
    pub fn new(store: Arc<dyn VerifiedStore>) -> Self {
        Self { store }
    }

    pub async fn check(&self) -> StockResult<HealthStatus> {
        let key = HEALTH_KEY.as_bytes();
        match self.store.get(key).await {
            Ok(entry) => Ok(connected(&entry.value)),
            Err(LedgerError::KeyNotFound) => {
                match self.store.set(key, HEALTHY_VALUE.as_bytes().to_vec()).await {
                    Ok(_) => Ok(HealthStatus {
                        connected: true,
                        value: Some(HEALTHY_VALUE.to_string()),
                    }),
                    Err(set_err) => {
                        // Possibly lost a race with another writer.
                        tracing::warn!(error = %set_err, "failed to seed health key; re-reading");
                        let entry = self.store.get(key).await.map_err(|e| {
                            tracing::error!(set_error = %set_err, error = %e, "health key unreadable");
                            set_err
                        })?;
                        Ok(connected(&entry.value))
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "health read failed");
                Err(e.into())
            }
        }
    }
}

fn connected(value: &[u8]) -> HealthStatus {
    HealthStatus {
        connected: true,
        value: Some(String::from_utf8_lossy(value).into_owned()),
    }
}
