//! Note scanning
//!
//! Walks the commitment stream, trial-decrypts every record, recomputes the
//! commitment from the decrypted fields (the only defence against ciphertext
//! malleability), derives spending nullifiers and tags spent notes via the
//! nullifier oracle.
//!
//! Decryption failures are expected, since most ciphertexts belong to other
//! wallets, so the scanner never raises for them; it logs at debug and
//! skips. The scanner is restartable through the slot cursor and may return
//! results out of order across runs.
//!
//! The note cache is the only long-lived mutable state in the engine. It is
//! keyed by the viewing-key fingerprint and cleared explicitly on wallet
//! switch; failing to clear mis-attributes notes across identities.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::boundary::{address, CommitmentRecord, CommitmentSource, NullifierOracle};
use crate::cancel::CancelToken;
use crate::crypto::ecies;
use crate::crypto::keys::Wallet;
use crate::errors::Result;
use crate::note::commitment::commitment_of;
use crate::note::encrypted::from_chain_layout;
use crate::note::{nullifier, NotePlaintext};

/// Key material the scanner needs: the ECDH viewing scalar, the nullifier
/// key, and the viewing-key fingerprint source.
#[derive(Clone)]
pub struct ScanKeys {
    pub viewing_sk: [u8; 32],
    pub nullifier_key: [u8; 32],
    pub incoming_viewing_key: [u8; 32],
}

impl ScanKeys {
    /// Extract scan keys from a full wallet. Watch-only wallets hold no
    /// viewing scalar and cannot trial-decrypt.
    pub fn from_wallet(wallet: &Wallet) -> Result<Self> {
        Ok(Self {
            viewing_sk: *wallet.spending_key()?,
            nullifier_key: wallet.viewing_key().nullifier_key,
            incoming_viewing_key: wallet.viewing_key().incoming_viewing_key,
        })
    }
}

/// A decrypted note the wallet owns, with its on-chain coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedNote {
    pub plaintext: NotePlaintext,
    pub commitment: [u8; 32],
    pub leaf_index: u64,
    pub pool_id: [u8; 32],
    pub account_hash: String,
    pub slot: u64,
    pub nullifier: [u8; 32],
    /// Ephemeral key from the on-chain record; spending this note requires
    /// the stealth secret derived from it
    pub stealth_ephemeral: crate::crypto::babyjubjub::Point,
    pub spent: bool,
}

impl OwnedNote {
    pub fn amount(&self) -> u64 {
        self.plaintext.amount()
    }
}

/// Outcome of one scan pass.
#[derive(Clone, Debug, Default)]
pub struct ScanResult {
    /// Snapshot of all cached owned notes after the pass
    pub notes: Vec<OwnedNote>,
    pub scanned: usize,
    pub skipped: usize,
    /// Highest slot seen; feed back as the next `since_slot` cursor
    pub latest_slot: u64,
}

/// Per-wallet note scanner. Single-writer: one instance per wallet, callers
/// that parallelise shard by wallet.
pub struct NoteScanner {
    keys: ScanKeys,
    source: Arc<dyn CommitmentSource>,
    oracle: Arc<dyn NullifierOracle>,
    cache: HashMap<String, OwnedNote>,
    fingerprint: String,
}

impl NoteScanner {
    pub fn new(
        keys: ScanKeys,
        source: Arc<dyn CommitmentSource>,
        oracle: Arc<dyn NullifierOracle>,
    ) -> Self {
        let fingerprint = viewing_fingerprint(&keys.incoming_viewing_key);
        Self {
            keys,
            source,
            oracle,
            cache: HashMap::new(),
            fingerprint,
        }
    }

    /// Identifies the wallet whose notes populate the cache.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Scan records from the cursor onward, then refresh spent state for
    /// every cached note.
    pub async fn scan(
        &mut self,
        since_slot: Option<u64>,
        cancel: &CancelToken,
    ) -> Result<ScanResult> {
        cancel.check()?;

        let mut result = ScanResult {
            latest_slot: since_slot.unwrap_or(0),
            ..Default::default()
        };

        let mut stream = self.source.stream(since_slot).await?;
        while let Some(record) = stream.next().await {
            cancel.check()?;
            let record = record?;
            result.scanned += 1;
            result.latest_slot = result.latest_slot.max(record.slot);

            match self.try_decode_record(&record) {
                Some(note) => {
                    self.cache.insert(hex::encode(note.commitment), note);
                }
                None => {
                    debug!(
                        leaf_index = record.leaf_index,
                        "ciphertext not ours, skipping"
                    );
                    result.skipped += 1;
                }
            }
        }

        self.refresh_spent_state(cancel).await?;

        let mut notes: Vec<OwnedNote> = self.cache.values().cloned().collect();
        notes.sort_by_key(|note| note.leaf_index);
        info!(
            owned = notes.len(),
            scanned = result.scanned,
            "scan pass complete"
        );
        result.notes = notes;
        Ok(result)
    }

    /// Unspent notes currently in the cache.
    pub fn unspent_notes(&self) -> Vec<OwnedNote> {
        let mut notes: Vec<OwnedNote> = self
            .cache
            .values()
            .filter(|note| !note.spent)
            .cloned()
            .collect();
        notes.sort_by_key(|note| note.leaf_index);
        notes
    }

    /// Drop all cached notes. Required when switching wallets.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Trial-decrypt one record. Never errors: anything malformed or not
    /// ours yields `None`.
    fn try_decode_record(&self, record: &CommitmentRecord) -> Option<OwnedNote> {
        let ciphertext = from_chain_layout(&record.encrypted_note).ok()?;
        let plaintext_bytes = ecies::try_decrypt(&ciphertext, &self.keys.viewing_sk)?;
        let plaintext = NotePlaintext::parse(&plaintext_bytes).ok()?;

        // the decrypted fields must reproduce the on-chain commitment exactly
        let recomputed = commitment_of(&plaintext).ok()?;
        if recomputed != record.commitment {
            debug!(
                leaf_index = record.leaf_index,
                "commitment mismatch after decrypt, skipping"
            );
            return None;
        }

        let nullifier = nullifier::spending(
            &self.keys.nullifier_key,
            &record.commitment,
            record.leaf_index,
        )
        .ok()?;

        Some(OwnedNote {
            plaintext,
            commitment: record.commitment,
            leaf_index: record.leaf_index,
            pool_id: record.pool_id,
            account_hash: record.account_hash.clone(),
            slot: record.slot,
            nullifier,
            stealth_ephemeral: ciphertext.ephemeral,
            spent: false,
        })
    }

    /// Batch-query the oracle for every unspent cached note's nullifier
    /// address and tag hits as spent.
    async fn refresh_spent_state(&mut self, cancel: &CancelToken) -> Result<()> {
        cancel.check()?;

        let mut pending: Vec<(String, [u8; 32])> = Vec::new();
        for (key, note) in self.cache.iter().filter(|(_, note)| !note.spent) {
            let addr = address::spend_nullifier_address(&note.pool_id, &note.nullifier)?;
            pending.push((key.clone(), addr));
        }
        if pending.is_empty() {
            return Ok(());
        }

        let addresses: Vec<[u8; 32]> = pending.iter().map(|(_, addr)| *addr).collect();
        let existing = self.oracle.batch_exists(&addresses).await?;

        for (key, addr) in pending {
            if existing.contains(&addr) {
                if let Some(note) = self.cache.get_mut(&key) {
                    note.spent = true;
                }
            }
        }
        Ok(())
    }
}

/// Short stable identifier for a viewing key; safe to log.
fn viewing_fingerprint(incoming_viewing_key: &[u8; 32]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(incoming_viewing_key);
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}
