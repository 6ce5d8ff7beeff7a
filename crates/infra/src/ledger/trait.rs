use std::sync::Arc;

use thiserror::Error;

use crate::config::LedgerConfig;

use super::proof::{Digest, LedgerState, Verification};

/// A key/value pair to be written in one ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl KeyValue {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One historical version of a key.
///
/// Keys are never deleted; every write appends a version tagged with the
/// transaction that wrote it and the key's revision (1-based) at that point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub tx_id: u64,
    pub revision: u64,
}

/// Header of a committed transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TxHeader {
    pub tx_id: u64,
    pub digest: Digest,
    pub entries: usize,
}

/// Latest version of a key plus the proof covering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedEntry {
    pub entry: Entry,
    pub verification: Verification,
}

/// Committed transaction plus the proof covering the written entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenTx {
    pub header: TxHeader,
    pub verification: Verification,
}

/// Ledger operation error.
///
/// Stores report failures as status messages; [`LedgerError::from_status`]
/// classifies them by the store's sentinel substrings so callers can match on
/// variants instead of text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The key has never been written.
    #[error("tbtree: key not found")]
    KeyNotFound,

    /// The server no longer recognises the session.
    #[error("session not found")]
    SessionExpired,

    /// A proof did not check out. Never retried.
    #[error("{0}")]
    VerificationFailed(String),

    #[error("invalid user name or password")]
    Unauthenticated,

    #[error("database does not exist: {0}")]
    DatabaseNotFound(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("ledger error: {0}")]
    Backend(String),
}

impl LedgerError {
    pub const KEY_NOT_FOUND: &'static str = "tbtree: key not found";
    pub const SESSION_NOT_FOUND: &'static str = "session not found";

    /// Classify a raw status message returned by a store.
    pub fn from_status(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains(Self::KEY_NOT_FOUND) {
            Self::KeyNotFound
        } else if message.contains(Self::SESSION_NOT_FOUND) {
            Self::SessionExpired
        } else {
            Self::Backend(message)
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound)
    }
}

/// One authenticated session against a tamper-evident key/value store.
///
/// Verified operations are bound to a caller-supplied reference state and
/// return a [`Verification`] that the caller checks itself.
#[async_trait::async_trait]
pub trait LedgerSession: Send + Sync {
    /// Last committed transaction id and digest.
    async fn current_state(&self) -> Result<LedgerState, LedgerError>;

    /// Append one transaction containing `entries`.
    async fn set(&self, entries: Vec<KeyValue>) -> Result<TxHeader, LedgerError>;

    /// Latest version of `key`.
    async fn get(&self, key: &[u8]) -> Result<Entry, LedgerError>;

    /// Append `entry` and prove it against `reference`.
    async fn verified_set(
        &self,
        entry: KeyValue,
        reference: &LedgerState,
    ) -> Result<ProvenTx, LedgerError>;

    /// Latest version of `key`, proven against `reference`.
    async fn verified_get(
        &self,
        key: &[u8],
        reference: &LedgerState,
    ) -> Result<VerifiedEntry, LedgerError>;

    /// Up to `limit` versions of `key`.
    async fn history(
        &self,
        key: &[u8],
        descending: bool,
        limit: usize,
    ) -> Result<Vec<Entry>, LedgerError>;

    /// Every entry of every transaction with id `>= start_tx_id`, in
    /// transaction order.
    async fn scan_entries(&self, start_tx_id: u64) -> Result<Vec<Entry>, LedgerError>;
}

/// Opens sessions (login + database selection).
#[async_trait::async_trait]
pub trait LedgerConnector: Send + Sync {
    async fn open_session(
        &self,
        config: &LedgerConfig,
    ) -> Result<Arc<dyn LedgerSession>, LedgerError>;
}

#[async_trait::async_trait]
impl<C> LedgerConnector for Arc<C>
where
    C: LedgerConnector + ?Sized,
{
    async fn open_session(
        &self,
        config: &LedgerConfig,
    ) -> Result<Arc<dyn LedgerSession>, LedgerError> {
        (**self).open_session(config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_messages_are_classified_by_sentinel() {
        assert_eq!(
            LedgerError::from_status("2 UNKNOWN: tbtree: key not found"),
            LedgerError::KeyNotFound
        );
        assert_eq!(
            LedgerError::from_status("7 PERMISSION_DENIED: session not found"),
            LedgerError::SessionExpired
        );
        assert_eq!(
            LedgerError::from_status("14 UNAVAILABLE: connection refused"),
            LedgerError::Backend("14 UNAVAILABLE: connection refused".to_string())
        );
    }
}
