//! Request-scoped inventory operations over a verified ledger store.
//!
//! Every operation is a fresh read/aggregate/write cycle: nothing here holds
//! state across requests beyond the shared store handle.

pub mod audit;
pub mod error;
pub mod health;
pub mod history;
pub mod products;
pub mod recorder;
pub mod snapshot;

use std::sync::Arc;

use crate::config::StockConfig;
use crate::ledger::VerifiedStore;

pub use audit::{AuditLookup, AuditedTransaction};
pub use error::{StockError, StockResult};
pub use health::{HealthProbe, HealthStatus};
pub use history::{HistoryEntry, HistoryReader, InventoryAt, StockHistory};
pub use products::{CreatedProduct, ProductCatalog};
pub use recorder::{RecordTransaction, RecordedTransaction, TransactionRecorder};
pub use snapshot::{SnapshotBuilder, SnapshotRow};

/// All services wired against one store.
#[derive(Clone)]
pub struct InventoryServices {
    pub catalog: ProductCatalog,
    pub recorder: TransactionRecorder,
    pub history: HistoryReader,
    pub audit: AuditLookup,
    pub snapshot: SnapshotBuilder,
    pub health: HealthProbe,
}

impl InventoryServices {
    pub fn new(store: Arc<dyn VerifiedStore>, config: StockConfig) -> Self {
        let history = HistoryReader::new(store.clone(), config);
        let recorder = TransactionRecorder::new(store.clone(), history.clone());
        Self {
            catalog: ProductCatalog::new(store.clone(), history.clone(), recorder.clone()),
            snapshot: SnapshotBuilder::new(store.clone(), history.clone()),
            audit: AuditLookup::new(store.clone()),
            health: HealthProbe::new(store),
            recorder,
            history,
        }
    }
}
