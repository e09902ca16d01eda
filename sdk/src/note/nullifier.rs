//! Nullifier derivation
//!
//! A spending nullifier marks a note as consumed without revealing which
//! note. The leaf index participates so that re-inserted identical note
//! bytes can never collide. Action nullifiers gate at-most-once actions
//! (voting) that do not consume the note.

use crate::constants::domains;
use crate::errors::Result;
use crate::field::u64_to_field;
use crate::poseidon;

/// n = Poseidon(SPENDING_NULLIFIER, nk, commitment, leaf_index)
pub fn spending(
    nullifier_key: &[u8; 32],
    commitment: &[u8; 32],
    leaf_index: u64,
) -> Result<[u8; 32]> {
    poseidon::hash_domain(
        domains::SPENDING_NULLIFIER,
        &[*nullifier_key, *commitment, u64_to_field(leaf_index)],
    )
}

/// n_a = Poseidon(ACTION_NULLIFIER, nk, commitment, action_domain)
pub fn action(
    nullifier_key: &[u8; 32],
    commitment: &[u8; 32],
    action_domain: &[u8; 32],
) -> Result<[u8; 32]> {
    poseidon::hash_domain(
        domains::ACTION_NULLIFIER,
        &[*nullifier_key, *commitment, *action_domain],
    )
}
