//! Boundary interfaces
//!
//! Everything the engine needs from the outside world (the commitment
//! stream, Merkle and validity proofs, nullifier existence, and the Groth16
//! prover) is modelled as a capability trait so the core can be driven by
//! a blocking pool or an event-driven executor. No transport lives here.

use std::collections::HashSet;

use async_trait::async_trait;
use borsh::{BorshDeserialize, BorshSerialize};
use futures::stream::BoxStream;
use light_hasher::{Hasher, Keccak};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::proof::prover::CircuitArtifact;
use crate::proof::ProverProof;
use crate::witness::WitnessMap;

/// One encrypted-note record from the commitment stream.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct CommitmentRecord {
    pub commitment: [u8; 32],
    pub leaf_index: u64,
    pub pool_id: [u8; 32],
    /// Fixed on-chain encrypted-note layout (see `note::encrypted`)
    pub encrypted_note: Vec<u8>,
    /// Host-side compressed-account hash, opaque to the engine
    pub account_hash: String,
    pub slot: u64,
}

/// A Merkle inclusion proof for one commitment.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct MerkleProofResult {
    pub root: [u8; 32],
    pub path: Vec<[u8; 32]>,
    pub path_indices: Vec<u8>,
    pub leaf_index: u64,
}

/// A compressed-account validity proof as returned by the host indexer.
/// Same 256-byte point layout as the Groth16 buffer, without the A-negation
/// (that is a prover-to-verifier transform, not a storage one).
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ValidityProofResult {
    pub a: [u8; 64],
    pub b: [u8; 128],
    pub c: [u8; 64],
    pub root_indices: Vec<u16>,
    pub tree_refs: Vec<[u8; 32]>,
}

/// Streams encrypted-note records in ascending leaf-index order where
/// available. Restartable via the slot cursor.
#[async_trait]
pub trait CommitmentSource: Send + Sync {
    async fn stream(
        &self,
        since_slot: Option<u64>,
    ) -> Result<BoxStream<'static, Result<CommitmentRecord>>>;
}

/// Returns Merkle proofs for commitment accounts.
#[async_trait]
pub trait MerkleProvider: Send + Sync {
    async fn merkle_proof(&self, account_hash: &str) -> Result<MerkleProofResult>;
}

/// Returns validity proofs for compressed-account creation.
#[async_trait]
pub trait ValidityProvider: Send + Sync {
    async fn validity_proof(
        &self,
        new_addresses: &[[u8; 32]],
        existing_hashes: &[[u8; 32]],
    ) -> Result<ValidityProofResult>;
}

/// Batch nullifier-existence queries; returns the subset of addresses that
/// exist on chain.
#[async_trait]
pub trait NullifierOracle: Send + Sync {
    async fn batch_exists(&self, addresses: &[[u8; 32]]) -> Result<HashSet<[u8; 32]>>;
}

/// The external Groth16 prover: given a circuit's resolved artifact and its
/// witness mapping, produce the three proof points. A black box to the
/// engine.
#[async_trait]
pub trait ProverBackend: Send + Sync {
    async fn prove(
        &self,
        artifact: &CircuitArtifact,
        inputs: &WitnessMap,
    ) -> Result<ProverProof>;
}

/// Compressed-account address derivation. Must match the host program's
/// address-tree rules: the seed hash is reduced into the BN254 field by
/// zeroing the leading byte.
pub mod address {
    use super::*;
    use crate::errors::SdkError;

    pub const SPEND_NULLIFIER_SEED: &[u8] = b"spend_nullifier";
    pub const COMMITMENT_SEED: &[u8] = b"commitment";

    /// Address of a spending-nullifier record:
    /// seeds ("spend_nullifier", pool, nullifier).
    pub fn spend_nullifier_address(
        pool: &[u8; 32],
        nullifier: &[u8; 32],
    ) -> Result<[u8; 32]> {
        derive(&[SPEND_NULLIFIER_SEED, pool, nullifier])
    }

    /// Address of a commitment record: seeds ("commitment", pool, hash).
    pub fn commitment_address(pool: &[u8; 32], commitment: &[u8; 32]) -> Result<[u8; 32]> {
        derive(&[COMMITMENT_SEED, pool, commitment])
    }

    fn derive(seeds: &[&[u8]]) -> Result<[u8; 32]> {
        let mut out = Keccak::hashv(seeds)
            .map_err(|e| SdkError::Boundary(format!("address hash failed: {e}")))?;
        out[0] = 0;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::u64_to_field;

    #[test]
    fn test_addresses_are_field_sized_and_distinct() {
        let pool = u64_to_field(1);
        let value = u64_to_field(2);

        let nullifier_addr = address::spend_nullifier_address(&pool, &value).unwrap();
        let commitment_addr = address::commitment_address(&pool, &value).unwrap();

        assert_eq!(nullifier_addr[0], 0);
        assert_eq!(commitment_addr[0], 0);
        assert_ne!(nullifier_addr, commitment_addr);
    }

    #[test]
    fn test_address_is_deterministic() {
        let pool = u64_to_field(3);
        let nullifier = u64_to_field(4);
        assert_eq!(
            address::spend_nullifier_address(&pool, &nullifier).unwrap(),
            address::spend_nullifier_address(&pool, &nullifier).unwrap()
        );

        let other = u64_to_field(5);
        assert_ne!(
            address::spend_nullifier_address(&pool, &nullifier).unwrap(),
            address::spend_nullifier_address(&pool, &other).unwrap()
        );
    }

    #[test]
    fn test_validity_proof_borsh_round_trip() {
        let proof = ValidityProofResult {
            a: [1u8; 64],
            b: [2u8; 128],
            c: [3u8; 64],
            root_indices: vec![4, 5],
            tree_refs: vec![u64_to_field(6)],
        };
        let bytes = borsh::to_vec(&proof).unwrap();
        // 64 + 128 + 64 points, two u16 indices, one tree ref
        assert_eq!(bytes.len(), 256 + 4 + 4 + 4 + 32);
        let parsed = ValidityProofResult::try_from_slice(&bytes).unwrap();
        assert_eq!(parsed, proof);
    }

    #[test]
    fn test_record_borsh_round_trip() {
        let record = CommitmentRecord {
            commitment: u64_to_field(1),
            leaf_index: 9,
            pool_id: u64_to_field(2),
            encrypted_note: vec![1, 2, 3],
            account_hash: "abc".to_string(),
            slot: 1234,
        };
        let bytes = borsh::to_vec(&record).unwrap();
        let parsed = CommitmentRecord::try_from_slice(&bytes).unwrap();
        assert_eq!(parsed, record);
    }
}
