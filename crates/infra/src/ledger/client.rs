use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::LedgerConfig;

use super::proof::{self, LedgerState};
use super::r#trait::{
    Entry, KeyValue, LedgerConnector, LedgerError, LedgerSession, TxHeader, VerifiedEntry,
};
use super::store::{PlainStore, VerifiedStore, VerifiedWrite};

/// Session-holding ledger client.
///
/// One instance is built at startup and shared by every request. When the
/// store reports the session as gone, the operation is retried once on a
/// fresh session; every other error propagates unchanged.
pub struct LedgerClient {
    connector: Arc<dyn LedgerConnector>,
    config: LedgerConfig,
    session: RwLock<Arc<dyn LedgerSession>>,
}

impl core::fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LedgerClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LedgerClient {
    /// Log in and open the first session. Fails fast if the store is unreachable.
    pub async fn connect(
        connector: Arc<dyn LedgerConnector>,
        config: LedgerConfig,
    ) -> Result<Self, LedgerError> {
        let session = connector.open_session(&config).await?;
        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "ledger session established"
        );
        Ok(Self {
            connector,
            config,
            session: RwLock::new(session),
        })
    }

    async fn current_session(&self) -> Arc<dyn LedgerSession> {
        self.session.read().await.clone()
    }

    /// Replace `stale` with a fresh session.
    ///
    /// Concurrent callers that saw the same stale session share one reconnect.
    async fn reconnect(
        &self,
        stale: &Arc<dyn LedgerSession>,
    ) -> Result<Arc<dyn LedgerSession>, LedgerError> {
        let mut guard = self.session.write().await;
        if !Arc::ptr_eq(&*guard, stale) {
            return Ok(guard.clone());
        }
        let fresh = self.connector.open_session(&self.config).await?;
        *guard = fresh.clone();
        Ok(fresh)
    }

    /// Run `op` against the current session, re-establishing it once if the
    /// store no longer recognises it.
    pub async fn run_with_session_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        op: F,
    ) -> Result<T, LedgerError>
    where
        F: Fn(Arc<dyn LedgerSession>) -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let session = self.current_session().await;
        match op(session.clone()).await {
            Err(LedgerError::SessionExpired) => {
                tracing::info!(operation, "ledger session expired; re-establishing");
                let fresh = self.reconnect(&session).await?;
                op(fresh).await
            }
            other => other,
        }
    }

    fn verification_failed(operation: &str) -> LedgerError {
        LedgerError::VerificationFailed(format!(
            "ledger verification failed during {operation} operation"
        ))
    }
}

#[async_trait::async_trait]
impl PlainStore for LedgerClient {
    async fn get(&self, key: &[u8]) -> Result<Entry, LedgerError> {
        self.run_with_session_retry("get", |s| async move { s.get(key).await })
            .await
    }

    async fn set(&self, key: &[u8], value: Vec<u8>) -> Result<TxHeader, LedgerError> {
        self.run_with_session_retry("set", |s| {
            let kv = KeyValue::new(key, value.clone());
            async move { s.set(vec![kv]).await }
        })
        .await
    }

    async fn history(&self, key: &[u8], limit: usize) -> Result<Vec<Entry>, LedgerError> {
        self.run_with_session_retry("history", |s| async move {
            s.history(key, true, limit).await
        })
        .await
    }

    async fn scan_entries(&self, start_tx_id: u64) -> Result<Vec<Entry>, LedgerError> {
        self.run_with_session_retry("scan", |s| async move {
            s.scan_entries(start_tx_id).await
        })
        .await
    }
}

#[async_trait::async_trait]
impl VerifiedStore for LedgerClient {
    async fn verified_get(&self, key: &[u8]) -> Result<VerifiedEntry, LedgerError> {
        let (reference, verified): (LedgerState, VerifiedEntry) = self
            .run_with_session_retry("verified_get", |s| async move {
                let reference = s.current_state().await?;
                let verified = s.verified_get(key, &reference).await?;
                Ok((reference, verified))
            })
            .await?;

        let proof = &verified.verification;
        let trusted = proof.source == reference
            && verified.entry.key == key
            && proof.entry_tx_id == verified.entry.tx_id
            && proof::verify(key, &verified.entry.value, proof);
        if !trusted {
            tracing::error!(
                key = %String::from_utf8_lossy(key),
                tx_id = verified.entry.tx_id,
                "proof rejected on verified read"
            );
            return Err(Self::verification_failed("get"));
        }

        Ok(verified)
    }

    async fn verified_set(&self, key: &[u8], value: Vec<u8>) -> Result<VerifiedWrite, LedgerError> {
        let (reference, proven) = self
            .run_with_session_retry("verified_set", |s| {
                let kv = KeyValue::new(key, value.clone());
                async move {
                    let reference = s.current_state().await?;
                    let proven = s.verified_set(kv, &reference).await?;
                    Ok((reference, proven))
                }
            })
            .await?;

        let proof = &proven.verification;
        let committed = LedgerState {
            tx_id: proven.header.tx_id,
            digest: proven.header.digest,
        };
        let trusted = proof.source == reference
            && proof.entry_tx_id == proven.header.tx_id
            && proof.target == committed
            && proof::verify(key, &value, proof);
        if !trusted {
            tracing::error!(
                key = %String::from_utf8_lossy(key),
                tx_id = proven.header.tx_id,
                "proof rejected on verified write"
            );
            return Err(Self::verification_failed("set"));
        }

        Ok(VerifiedWrite {
            header: proven.header,
            reference,
            verification: proven.verification,
        })
    }
}
