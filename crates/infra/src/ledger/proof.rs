//! Client-side verification of ledger proofs.
//!
//! The ledger links transactions into a hash chain:
//!
//! ```text
//! digest(0) = [0; 32]
//! digest(n) = BLAKE3(digest(n-1) || n (u64 LE) || entries_digest(n))
//! ```
//!
//! where `entries_digest(n)` commits to the leaf digests of every key/value
//! written in transaction `n`. A [`Verification`] carries enough of the chain
//! to prove that (a) a given key/value was written in a given transaction and
//! (b) the state the caller trusted beforehand is a prefix of the state the
//! proof ends at. Both halves are recomputed here; nothing the store says about
//! digests is taken on faith.

use serde::{Serialize, Serializer};

/// 32-byte BLAKE3 digest.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    pub const GENESIS: Digest = Digest([0u8; 32]);

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl core::fmt::Debug for Digest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl core::fmt::Display for Digest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl From<blake3::Hash> for Digest {
    fn from(value: blake3::Hash) -> Self {
        Self(*value.as_bytes())
    }
}

/// Global ledger state: the last committed transaction and its chain digest.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerState {
    pub tx_id: u64,
    pub digest: Digest,
}

impl LedgerState {
    pub const GENESIS: LedgerState = LedgerState {
        tx_id: 0,
        digest: Digest::GENESIS,
    };
}

/// One step of the chain.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TxLink {
    pub tx_id: u64,
    pub entries_digest: Digest,
}

/// Inclusion + consistency proof returned with verified reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Transaction the verified entry was written in.
    pub entry_tx_id: u64,
    /// Leaf digests of every entry in that transaction.
    pub tx_leaves: Vec<Digest>,
    /// Chain position the links start from.
    pub anchor: LedgerState,
    /// Consecutive links `anchor.tx_id + 1 ..= target.tx_id`.
    pub links: Vec<TxLink>,
    /// State the caller bound the operation to.
    pub source: LedgerState,
    /// State the proof ends at.
    pub target: LedgerState,
}

pub fn leaf_digest(key: &[u8], value: &[u8]) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(key.len() as u64).to_le_bytes());
    hasher.update(key);
    hasher.update(&(value.len() as u64).to_le_bytes());
    hasher.update(value);
    hasher.finalize().into()
}

pub fn entries_digest(leaves: &[Digest]) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(leaves.len() as u64).to_le_bytes());
    for leaf in leaves {
        hasher.update(&leaf.0);
    }
    hasher.finalize().into()
}

pub fn chain(prev: &Digest, tx_id: u64, entries: &Digest) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&prev.0);
    hasher.update(&tx_id.to_le_bytes());
    hasher.update(&entries.0);
    hasher.finalize().into()
}

/// Check that `key`/`value` is proven by `proof`.
pub fn verify(key: &[u8], value: &[u8], proof: &Verification) -> bool {
    // Inclusion: the entry is a leaf of its transaction.
    let leaf = leaf_digest(key, value);
    if !proof.tx_leaves.contains(&leaf) {
        return false;
    }
    let tx_entries = entries_digest(&proof.tx_leaves);
    let Some(link) = proof.links.iter().find(|l| l.tx_id == proof.entry_tx_id) else {
        return false;
    };
    if link.entries_digest != tx_entries {
        return false;
    }

    // Consistency: replay the chain from the anchor through source to target.
    if !(proof.anchor.tx_id <= proof.source.tx_id && proof.source.tx_id <= proof.target.tx_id) {
        return false;
    }

    let mut digest = proof.anchor.digest;
    let mut tx_id = proof.anchor.tx_id;
    let mut source_reached = false;

    if proof.source.tx_id == tx_id {
        if proof.source.digest != digest {
            return false;
        }
        source_reached = true;
    }

    for link in &proof.links {
        if link.tx_id != tx_id + 1 {
            return false;
        }
        digest = chain(&digest, link.tx_id, &link.entries_digest);
        tx_id = link.tx_id;

        if tx_id == proof.source.tx_id {
            if digest != proof.source.digest {
                return false;
            }
            source_reached = true;
        }
    }

    source_reached && tx_id == proof.target.tx_id && digest == proof.target.digest
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a small chain of single-entry transactions and return
    /// (states by tx id, leaves by tx id, entries digests by tx id).
    fn build(entries: &[(&[u8], &[u8])]) -> (Vec<LedgerState>, Vec<Vec<Digest>>, Vec<Digest>) {
        let mut states = vec![LedgerState::GENESIS];
        let mut leaves = vec![vec![]];
        let mut digests = vec![Digest::GENESIS];
        for (i, (k, v)) in entries.iter().enumerate() {
            let tx_id = i as u64 + 1;
            let tx_leaves = vec![leaf_digest(k, v)];
            let ed = entries_digest(&tx_leaves);
            let prev = states.last().unwrap().digest;
            states.push(LedgerState { tx_id, digest: chain(&prev, tx_id, &ed) });
            leaves.push(tx_leaves);
            digests.push(ed);
        }
        (states, leaves, digests)
    }

    fn proof_for(
        entry_tx: u64,
        source: u64,
        states: &[LedgerState],
        leaves: &[Vec<Digest>],
        digests: &[Digest],
    ) -> Verification {
        let anchor_tx = (entry_tx - 1).min(source);
        let end_tx = entry_tx.max(source);
        Verification {
            entry_tx_id: entry_tx,
            tx_leaves: leaves[entry_tx as usize].clone(),
            anchor: states[anchor_tx as usize],
            links: (anchor_tx + 1..=end_tx)
                .map(|t| TxLink { tx_id: t, entries_digest: digests[t as usize] })
                .collect(),
            source: states[source as usize],
            target: states[end_tx as usize],
        }
    }

    #[test]
    fn write_after_reference_verifies() {
        let (states, leaves, digests) = build(&[(b"a", b"1"), (b"b", b"2"), (b"c", b"3")]);
        let proof = proof_for(3, 1, &states, &leaves, &digests);
        assert!(verify(b"c", b"3", &proof));
    }

    #[test]
    fn read_before_reference_verifies() {
        let (states, leaves, digests) = build(&[(b"a", b"1"), (b"b", b"2"), (b"c", b"3")]);
        let proof = proof_for(1, 3, &states, &leaves, &digests);
        assert!(verify(b"a", b"1", &proof));
    }

    #[test]
    fn altered_value_is_rejected() {
        let (states, leaves, digests) = build(&[(b"a", b"1"), (b"b", b"2")]);
        let proof = proof_for(2, 2, &states, &leaves, &digests);
        assert!(verify(b"b", b"2", &proof));
        assert!(!verify(b"b", b"20", &proof));
        assert!(!verify(b"a", b"2", &proof));
    }

    #[test]
    fn forged_history_is_rejected() {
        let (states, leaves, digests) = build(&[(b"a", b"1"), (b"b", b"2"), (b"c", b"3")]);

        let mut forged = proof_for(3, 1, &states, &leaves, &digests);
        forged.links[0].entries_digest = leaf_digest(b"x", b"y");
        assert!(!verify(b"c", b"3", &forged));

        // Caller's trusted state does not match the chain.
        let mut stale = proof_for(3, 1, &states, &leaves, &digests);
        stale.source.digest = Digest([7u8; 32]);
        assert!(!verify(b"c", b"3", &stale));

        // Gap in the links.
        let mut gapped = proof_for(3, 1, &states, &leaves, &digests);
        gapped.links.remove(0);
        assert!(!verify(b"c", b"3", &gapped));
    }
}
