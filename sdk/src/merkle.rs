//! Merkle proof verification
//!
//! The commitment tree lives with the host; the engine only checks that a
//! proof returned by the Merkle provider actually opens the claimed leaf
//! under the claimed root before feeding it to a circuit. Node hashing is
//! domain-separated Poseidon, empty subtrees grow from the fixed empty
//! leaf, and every path verifies at the fixed 32 depth.

use crate::boundary::MerkleProofResult;
use crate::constants::{domains, MERKLE_TREE_DEPTH};
use crate::errors::Result;
use crate::poseidon;

/// Hash of two child nodes.
pub fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> Result<[u8; 32]> {
    poseidon::hash_domain(domains::MERKLE, &[*left, *right])
}

/// The empty leaf value.
pub fn empty_leaf() -> Result<[u8; 32]> {
    poseidon::hash_domain(domains::EMPTY_LEAF, &[[0u8; 32]])
}

/// Empty-subtree hash at a given level (level 0 is the leaf layer).
pub fn empty_hash_at_level(level: usize) -> Result<[u8; 32]> {
    let mut hash = empty_leaf()?;
    for _ in 0..level {
        hash = hash_pair(&hash, &hash)?;
    }
    Ok(hash)
}

/// Walk a path from leaf to root. Paths shorter than the fixed depth are
/// extended with empty-subtree siblings, mirroring the circuits' padding.
pub fn compute_root(
    leaf: &[u8; 32],
    path: &[[u8; 32]],
    path_indices: &[u8],
) -> Result<[u8; 32]> {
    let mut current = *leaf;
    let mut empty = empty_leaf()?;

    for level in 0..MERKLE_TREE_DEPTH {
        let sibling = path.get(level).copied().unwrap_or(empty);
        let bit = path_indices.get(level).copied().unwrap_or(0) & 1;
        current = if bit == 0 {
            hash_pair(&current, &sibling)?
        } else {
            hash_pair(&sibling, &current)?
        };
        empty = hash_pair(&empty, &empty)?;
    }

    Ok(current)
}

/// Check a provider-returned proof against the leaf it claims to open.
pub fn verify_proof(proof: &MerkleProofResult, leaf: &[u8; 32]) -> Result<bool> {
    Ok(compute_root(leaf, &proof.path, &proof.path_indices)? == proof.root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::u64_to_field;

    /// Build a minimal two-leaf tree by hand and open leaf 0.
    fn two_leaf_proof() -> (MerkleProofResult, [u8; 32]) {
        let leaf_a = u64_to_field(10);
        let leaf_b = u64_to_field(20);

        let mut path = vec![leaf_b];
        let mut indices = vec![0u8];
        let mut node = hash_pair(&leaf_a, &leaf_b).unwrap();
        let mut empty = empty_leaf().unwrap();
        empty = hash_pair(&empty, &empty).unwrap();
        for _ in 1..MERKLE_TREE_DEPTH {
            path.push(empty);
            indices.push(0);
            node = hash_pair(&node, &empty).unwrap();
            empty = hash_pair(&empty, &empty).unwrap();
        }

        (
            MerkleProofResult {
                root: node,
                path,
                path_indices: indices,
                leaf_index: 0,
            },
            leaf_a,
        )
    }

    #[test]
    fn test_valid_proof_verifies() {
        let (proof, leaf) = two_leaf_proof();
        assert!(verify_proof(&proof, &leaf).unwrap());
    }

    #[test]
    fn test_wrong_leaf_rejected() {
        let (proof, _) = two_leaf_proof();
        assert!(!verify_proof(&proof, &u64_to_field(11)).unwrap());
    }

    #[test]
    fn test_corrupted_sibling_rejected() {
        let (mut proof, leaf) = two_leaf_proof();
        proof.path[3] = u64_to_field(999);
        assert!(!verify_proof(&proof, &leaf).unwrap());
    }

    #[test]
    fn test_ordering_bit_matters() {
        let left = u64_to_field(1);
        let right = u64_to_field(2);
        assert_ne!(
            hash_pair(&left, &right).unwrap(),
            hash_pair(&right, &left).unwrap()
        );
    }

    #[test]
    fn test_empty_levels_chain() {
        let level_two = empty_hash_at_level(2).unwrap();
        let level_one = empty_hash_at_level(1).unwrap();
        assert_eq!(hash_pair(&level_one, &level_one).unwrap(), level_two);
    }
}
