use std::sync::Arc;

use stockledger_infra::config::{AppConfig, LedgerBackend, LedgerConfig};
use stockledger_infra::ledger::{InMemoryLedger, LedgerClient, LedgerConnector, LedgerError};
use stockledger_infra::services::InventoryServices;

/// Everything handlers need, shared behind an `Arc`.
pub struct AppServices {
    pub inventory: InventoryServices,
}

/// Log in to the ledger and wire the services. Runs before the server binds.
pub async fn build_services(
    config: &AppConfig,
    connector: Arc<dyn LedgerConnector>,
) -> Result<AppServices, LedgerError> {
    let ledger = Arc::new(LedgerClient::connect(connector, config.ledger.clone()).await?);
    let inventory = InventoryServices::new(ledger, config.stock);
    Ok(AppServices { inventory })
}

/// Connector for the configured backend.
///
/// Only the in-memory ledger is bundled, and it must be asked for by name:
/// an `immudb` configuration fails here instead of silently serving volatile
/// storage.
pub fn connector_for(config: &LedgerConfig) -> Result<Arc<dyn LedgerConnector>, LedgerError> {
    match config.backend {
        LedgerBackend::Memory => {
            tracing::warn!("LEDGER_BACKEND=memory: ledger contents are lost on restart");
            Ok(Arc::new(InMemoryLedger::with_credentials(
                config.user.clone(),
                config.password.clone(),
                config.database.clone(),
            )))
        }
        LedgerBackend::Immudb => Err(LedgerError::Connection(format!(
            "no immudb client is bundled in this build, cannot reach {}:{}; \
             set LEDGER_BACKEND=memory to run on a volatile in-memory ledger",
            config.host, config.port
        ))),
    }
}
