use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::config::LedgerConfig;

use super::proof::{self, Digest, LedgerState, TxLink, Verification};
use super::r#trait::{
    Entry, KeyValue, LedgerConnector, LedgerError, LedgerSession, ProvenTx, TxHeader,
    VerifiedEntry,
};

#[derive(Debug, Clone)]
struct TxRecord {
    tx_id: u64,
    entries: Vec<KeyValue>,
    leaves: Vec<Digest>,
    entries_digest: Digest,
    digest: Digest,
}

/// Location of one key version: (tx id, entry index within that tx, revision).
#[derive(Debug, Copy, Clone)]
struct VersionRef {
    tx_id: u64,
    slot: usize,
    revision: u64,
}

#[derive(Debug, Default)]
struct Log {
    /// `txs[n - 1]` is transaction `n`.
    txs: Vec<TxRecord>,
    versions: HashMap<Vec<u8>, Vec<VersionRef>>,
}

impl Log {
    fn head(&self) -> LedgerState {
        self.txs
            .last()
            .map(|tx| LedgerState {
                tx_id: tx.tx_id,
                digest: tx.digest,
            })
            .unwrap_or(LedgerState::GENESIS)
    }

    fn state_at(&self, tx_id: u64) -> LedgerState {
        if tx_id == 0 {
            return LedgerState::GENESIS;
        }
        let tx = &self.txs[(tx_id - 1) as usize];
        LedgerState {
            tx_id,
            digest: tx.digest,
        }
    }

    fn commit(&mut self, entries: Vec<KeyValue>) -> Result<TxHeader, LedgerError> {
        if entries.is_empty() {
            return Err(LedgerError::Backend("no entries to commit".to_string()));
        }
        if entries.iter().any(|kv| kv.key.is_empty()) {
            return Err(LedgerError::Backend("illegal arguments: empty key".to_string()));
        }

        let prev = self.head();
        let tx_id = prev.tx_id + 1;
        let leaves: Vec<Digest> = entries
            .iter()
            .map(|kv| proof::leaf_digest(&kv.key, &kv.value))
            .collect();
        let entries_digest = proof::entries_digest(&leaves);
        let digest = proof::chain(&prev.digest, tx_id, &entries_digest);

        for (slot, kv) in entries.iter().enumerate() {
            let versions = self.versions.entry(kv.key.clone()).or_default();
            let revision = versions.len() as u64 + 1;
            versions.push(VersionRef {
                tx_id,
                slot,
                revision,
            });
        }

        let header = TxHeader {
            tx_id,
            digest,
            entries: entries.len(),
        };
        self.txs.push(TxRecord {
            tx_id,
            entries,
            leaves,
            entries_digest,
            digest,
        });
        Ok(header)
    }

    fn entry(&self, key: &[u8], at: VersionRef) -> Entry {
        let tx = &self.txs[(at.tx_id - 1) as usize];
        Entry {
            key: key.to_vec(),
            value: tx.entries[at.slot].value.clone(),
            tx_id: at.tx_id,
            revision: at.revision,
        }
    }

    fn latest(&self, key: &[u8]) -> Result<Entry, LedgerError> {
        self.versions
            .get(key)
            .and_then(|v| v.last())
            .map(|at| self.entry(key, *at))
            .ok_or(LedgerError::KeyNotFound)
    }

    /// Prove `entry_tx` against the caller's `reference`.
    ///
    /// Links run from just before the entry's transaction (or the reference,
    /// whichever is older) up to whichever of the two is newer.
    fn prove(&self, entry_tx: u64, reference: &LedgerState) -> Result<Verification, LedgerError> {
        let head = self.head();
        if reference.tx_id > head.tx_id {
            return Err(LedgerError::Backend(format!(
                "reference state {} is ahead of the ledger head {}",
                reference.tx_id, head.tx_id
            )));
        }

        let anchor_tx = (entry_tx - 1).min(reference.tx_id);
        let end_tx = entry_tx.max(reference.tx_id);
        let links = (anchor_tx + 1..=end_tx)
            .map(|tx_id| TxLink {
                tx_id,
                entries_digest: self.txs[(tx_id - 1) as usize].entries_digest,
            })
            .collect();

        Ok(Verification {
            entry_tx_id: entry_tx,
            tx_leaves: self.txs[(entry_tx - 1) as usize].leaves.clone(),
            anchor: self.state_at(anchor_tx),
            links,
            source: *reference,
            target: self.state_at(end_tx),
        })
    }
}

#[derive(Debug)]
struct Inner {
    log: RwLock<Log>,
    user: String,
    password: String,
    database: String,
    epoch: AtomicU64,
    sessions_opened: AtomicUsize,
    tamper_proofs: AtomicBool,
    fail_history: AtomicBool,
}

/// In-memory tamper-evident ledger.
///
/// Append-only transaction log with a BLAKE3 hash chain and a per-key version
/// index. Intended for tests/dev. Clones share the same log.
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    inner: Arc<Inner>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        let defaults = LedgerConfig::default();
        Self::with_credentials(defaults.user, defaults.password, defaults.database)
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                log: RwLock::new(Log::default()),
                user: user.into(),
                password: password.into(),
                database: database.into(),
                epoch: AtomicU64::new(0),
                sessions_opened: AtomicUsize::new(0),
                tamper_proofs: AtomicBool::new(false),
                fail_history: AtomicBool::new(false),
            }),
        }
    }

    /// Invalidate every open session, as a server restart would.
    pub fn expire_sessions(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Corrupt every proof handed out while enabled.
    pub fn tamper_proofs(&self, enabled: bool) {
        self.inner.tamper_proofs.store(enabled, Ordering::SeqCst);
    }

    /// Make every history read fail while enabled.
    pub fn fail_history(&self, enabled: bool) {
        self.inner.fail_history.store(enabled, Ordering::SeqCst);
    }

    pub fn sessions_opened(&self) -> usize {
        self.inner.sessions_opened.load(Ordering::SeqCst)
    }

    /// Head of the chain.
    pub fn state(&self) -> Result<LedgerState, LedgerError> {
        Ok(self.inner.read_log()?.head())
    }
}

impl Inner {
    fn read_log(&self) -> Result<std::sync::RwLockReadGuard<'_, Log>, LedgerError> {
        self.log
            .read()
            .map_err(|_| LedgerError::Backend("lock poisoned".to_string()))
    }

    fn write_log(&self) -> Result<std::sync::RwLockWriteGuard<'_, Log>, LedgerError> {
        self.log
            .write()
            .map_err(|_| LedgerError::Backend("lock poisoned".to_string()))
    }

    fn seal(&self, mut verification: Verification) -> Verification {
        if self.tamper_proofs.load(Ordering::SeqCst) {
            if let Some(link) = verification.links.last_mut() {
                link.entries_digest = proof::leaf_digest(b"tampered", &link.tx_id.to_le_bytes());
            }
        }
        verification
    }
}

#[async_trait::async_trait]
impl LedgerConnector for InMemoryLedger {
    async fn open_session(
        &self,
        config: &LedgerConfig,
    ) -> Result<Arc<dyn LedgerSession>, LedgerError> {
        if config.user != self.inner.user || config.password != self.inner.password {
            return Err(LedgerError::Unauthenticated);
        }
        if config.database != self.inner.database {
            return Err(LedgerError::DatabaseNotFound(config.database.clone()));
        }

        self.inner.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(InMemorySession {
            inner: self.inner.clone(),
            epoch: self.inner.epoch.load(Ordering::SeqCst),
        }))
    }
}

struct InMemorySession {
    inner: Arc<Inner>,
    epoch: u64,
}

impl InMemorySession {
    fn ensure_live(&self) -> Result<&Inner, LedgerError> {
        if self.inner.epoch.load(Ordering::SeqCst) != self.epoch {
            return Err(LedgerError::from_status(
                "7 PERMISSION_DENIED: session not found",
            ));
        }
        Ok(&self.inner)
    }
}

#[async_trait::async_trait]
impl LedgerSession for InMemorySession {
    async fn current_state(&self) -> Result<LedgerState, LedgerError> {
        Ok(self.ensure_live()?.read_log()?.head())
    }

    async fn set(&self, entries: Vec<KeyValue>) -> Result<TxHeader, LedgerError> {
        self.ensure_live()?.write_log()?.commit(entries)
    }

    async fn get(&self, key: &[u8]) -> Result<Entry, LedgerError> {
        self.ensure_live()?.read_log()?.latest(key)
    }

    async fn verified_set(
        &self,
        entry: KeyValue,
        reference: &LedgerState,
    ) -> Result<ProvenTx, LedgerError> {
        let inner = self.ensure_live()?;
        let mut log = inner.write_log()?;
        if reference.tx_id > log.head().tx_id {
            return Err(LedgerError::Backend(
                "reference state is ahead of the ledger head".to_string(),
            ));
        }
        let header = log.commit(vec![entry])?;
        let verification = log.prove(header.tx_id, reference)?;
        Ok(ProvenTx {
            header,
            verification: inner.seal(verification),
        })
    }

    async fn verified_get(
        &self,
        key: &[u8],
        reference: &LedgerState,
    ) -> Result<VerifiedEntry, LedgerError> {
        let inner = self.ensure_live()?;
        let log = inner.read_log()?;
        let entry = log.latest(key)?;
        let verification = log.prove(entry.tx_id, reference)?;
        Ok(VerifiedEntry {
            entry,
            verification: inner.seal(verification),
        })
    }

    async fn history(
        &self,
        key: &[u8],
        descending: bool,
        limit: usize,
    ) -> Result<Vec<Entry>, LedgerError> {
        let inner = self.ensure_live()?;
        if inner.fail_history.load(Ordering::SeqCst) {
            return Err(LedgerError::Backend("history unavailable".to_string()));
        }

        let log = inner.read_log()?;
        let versions = log.versions.get(key).ok_or(LedgerError::KeyNotFound)?;
        let picked: Vec<Entry> = if descending {
            versions
                .iter()
                .rev()
                .take(limit)
                .map(|at| log.entry(key, *at))
                .collect()
        } else {
            versions
                .iter()
                .take(limit)
                .map(|at| log.entry(key, *at))
                .collect()
        };
        Ok(picked)
    }

    async fn scan_entries(&self, start_tx_id: u64) -> Result<Vec<Entry>, LedgerError> {
        let log = self.ensure_live()?.read_log()?;
        let start = start_tx_id.max(1);

        let mut out = Vec::new();
        for tx in log.txs.iter().filter(|tx| tx.tx_id >= start) {
            for (slot, kv) in tx.entries.iter().enumerate() {
                let revision = log
                    .versions
                    .get(&kv.key)
                    .and_then(|v| v.iter().find(|at| at.tx_id == tx.tx_id && at.slot == slot))
                    .map(|at| at.revision)
                    .unwrap_or_default();
                out.push(Entry {
                    key: kv.key.clone(),
                    value: kv.value.clone(),
                    tx_id: tx.tx_id,
                    revision,
                });
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn session(ledger: &InMemoryLedger) -> Arc<dyn LedgerSession> {
        ledger.open_session(&LedgerConfig::default()).await.unwrap()
    }

    #[tokio::test]
    async fn versions_accumulate_and_history_is_most_recent_first() {
        let ledger = InMemoryLedger::new();
        let s = session(&ledger).await;

        for v in ["1", "2", "3"] {
            s.set(vec![KeyValue::new("k", v)]).await.unwrap();
        }

        let latest = s.get(b"k").await.unwrap();
        assert_eq!(latest.value, b"3");
        assert_eq!(latest.revision, 3);

        let desc: Vec<_> = s
            .history(b"k", true, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.value)
            .collect();
        assert_eq!(desc, vec![b"3".to_vec(), b"2".to_vec()]);

        let asc = s.history(b"k", false, 10).await.unwrap();
        assert_eq!(asc[0].value, b"1");
        assert_eq!(asc.len(), 3);
    }

    #[tokio::test]
    async fn unknown_keys_report_the_not_found_sentinel() {
        let ledger = InMemoryLedger::new();
        let s = session(&ledger).await;

        assert_eq!(s.get(b"missing").await, Err(LedgerError::KeyNotFound));
        assert_eq!(
            s.history(b"missing", true, 10).await,
            Err(LedgerError::KeyNotFound)
        );
        let reference = s.current_state().await.unwrap();
        assert!(s.verified_get(b"missing", &reference).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn proofs_verify_until_tampered() {
        let ledger = InMemoryLedger::new();
        let s = session(&ledger).await;
        s.set(vec![KeyValue::new("a", "1")]).await.unwrap();

        let reference = s.current_state().await.unwrap();
        let written = s
            .verified_set(KeyValue::new("b", "2"), &reference)
            .await
            .unwrap();
        assert_eq!(written.verification.source, reference);
        assert!(proof::verify(b"b", b"2", &written.verification));

        let reference = s.current_state().await.unwrap();
        let read = s.verified_get(b"a", &reference).await.unwrap();
        assert!(proof::verify(b"a", b"1", &read.verification));

        ledger.tamper_proofs(true);
        let read = s.verified_get(b"a", &reference).await.unwrap();
        assert!(!proof::verify(b"a", b"1", &read.verification));
    }

    #[tokio::test]
    async fn scan_returns_every_entry_in_transaction_order() {
        let ledger = InMemoryLedger::new();
        let s = session(&ledger).await;
        s.set(vec![KeyValue::new("product:A", "a"), KeyValue::new("x", "1")])
            .await
            .unwrap();
        s.set(vec![KeyValue::new("product:B", "b")]).await.unwrap();

        let keys: Vec<_> = s
            .scan_entries(1)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(
            keys,
            vec![b"product:A".to_vec(), b"x".to_vec(), b"product:B".to_vec()]
        );
        assert_eq!(s.scan_entries(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn login_checks_credentials_and_database() {
        let ledger = InMemoryLedger::new();
        let mut cfg = LedgerConfig::default();
        cfg.password = "wrong".to_string();
        assert_eq!(
            ledger.open_session(&cfg).await.err(),
            Some(LedgerError::Unauthenticated)
        );

        let mut cfg = LedgerConfig::default();
        cfg.database = "otherdb".to_string();
        assert!(matches!(
            ledger.open_session(&cfg).await.err(),
            Some(LedgerError::DatabaseNotFound(db)) if db == "otherdb"
        ));
        assert_eq!(ledger.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn expired_sessions_fail_until_reopened() {
        let ledger = InMemoryLedger::new();
        let old = session(&ledger).await;
        ledger.expire_sessions();

        assert_eq!(old.get(b"k").await, Err(LedgerError::SessionExpired));

        let fresh = session(&ledger).await;
        assert_eq!(fresh.get(b"k").await, Err(LedgerError::KeyNotFound));
        assert_eq!(ledger.sessions_opened(), 2);
    }
}
