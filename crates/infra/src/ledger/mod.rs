//! Tamper-evident ledger access.
//!
//! - [`r#trait`]: the backend boundary (one session against the store).
//! - [`store`]: plain and verified capability traits used by the services.
//! - [`client`]: the session-holding client with single-shot session recovery.
//! - [`proof`]: client-side proof verification.
//! - [`in_memory`]: the bundled hash-chained backend.

pub mod client;
pub mod in_memory;
pub mod proof;
pub mod store;
pub mod r#trait;

pub use client::LedgerClient;
pub use in_memory::InMemoryLedger;
pub use proof::{Digest, LedgerState, Verification};
pub use r#trait::{
    Entry, KeyValue, LedgerConnector, LedgerError, LedgerSession, ProvenTx, TxHeader,
    VerifiedEntry,
};
pub use store::{PlainStore, VerifiedStore, VerifiedWrite};
