//! Capability traits consumed by the services.
//!
//! [`PlainStore`] carries no integrity guarantee; [`VerifiedStore`] adds reads
//! and writes whose proofs have already been checked client-side. Services
//! take `Arc<dyn VerifiedStore>` so tests can substitute a store directly.

use super::proof::{LedgerState, Verification};
use super::r#trait::{Entry, LedgerError, TxHeader, VerifiedEntry};

#[async_trait::async_trait]
pub trait PlainStore: Send + Sync {
    /// Latest version of `key`, unverified.
    async fn get(&self, key: &[u8]) -> Result<Entry, LedgerError>;

    /// Append a new version of `key`, unverified.
    async fn set(&self, key: &[u8], value: Vec<u8>) -> Result<TxHeader, LedgerError>;

    /// Up to `limit` versions of `key`, most recent first.
    ///
    /// `limit` is a ceiling, not a page size: older versions past it are
    /// silently left out.
    async fn history(&self, key: &[u8], limit: usize) -> Result<Vec<Entry>, LedgerError>;

    /// Every entry written in transactions `>= start_tx_id`.
    async fn scan_entries(&self, start_tx_id: u64) -> Result<Vec<Entry>, LedgerError>;
}

/// Outcome of a verified write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedWrite {
    pub header: TxHeader,
    /// State the write was bound to before it was sent.
    pub reference: LedgerState,
    pub verification: Verification,
}

#[async_trait::async_trait]
pub trait VerifiedStore: PlainStore {
    /// Latest version of `key`, proven against the ledger's current state.
    async fn verified_get(&self, key: &[u8]) -> Result<VerifiedEntry, LedgerError>;

    /// Append a new version of `key` and prove it landed.
    ///
    /// On [`LedgerError::VerificationFailed`] the write may still have been
    /// stored; it must be treated as failed.
    async fn verified_set(&self, key: &[u8], value: Vec<u8>) -> Result<VerifiedWrite, LedgerError>;
}
