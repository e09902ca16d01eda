//! Note commitments
//!
//! A commitment is a hiding, binding Poseidon hash of the note's fields,
//! stored on-chain. Verification is a straight recomputation; the scanner
//! relies on it as the only defence against ciphertext malleability.

use rand::{CryptoRng, RngCore};

use crate::constants::domains;
use crate::errors::Result;
use crate::field::{reduce_to_field, u64_to_field};
use crate::note::{LpNote, Note, NotePlaintext, PositionNote};
use crate::poseidon;

/// c = Poseidon(COMMITMENT, stealth_pub_x, token_mint, amount, randomness)
pub fn commit_standard(
    stealth_pub_x: &[u8; 32],
    token_mint: &[u8; 32],
    amount: u64,
    randomness: &[u8; 32],
) -> Result<[u8; 32]> {
    poseidon::hash_domain(
        domains::COMMITMENT,
        &[*stealth_pub_x, *token_mint, u64_to_field(amount), *randomness],
    )
}

/// Two-stage position commitment:
/// s1 = Poseidon(POSITION, stealth_pub_x, market_id, is_long, margin)
/// c  = Poseidon(s1, size, leverage, entry_price, randomness)
pub fn commit_position(note: &PositionNote) -> Result<[u8; 32]> {
    let stage_one = poseidon::hash_domain(
        domains::POSITION,
        &[
            note.stealth_pub_x,
            note.market_id,
            u64_to_field(note.is_long as u64),
            u64_to_field(note.margin),
        ],
    )?;
    poseidon::hash(&[
        stage_one,
        u64_to_field(note.size),
        u64_to_field(note.leverage as u64),
        u64_to_field(note.entry_price),
        note.randomness,
    ])
}

/// c = Poseidon(LP, stealth_pub_x, pool_id, lp_amount, randomness)
pub fn commit_lp(note: &LpNote) -> Result<[u8; 32]> {
    poseidon::hash_domain(
        domains::LP,
        &[
            note.stealth_pub_x,
            note.pool_id,
            u64_to_field(note.lp_amount),
            note.randomness,
        ],
    )
}

/// Commitment of any note kind.
pub fn commitment_of(plaintext: &NotePlaintext) -> Result<[u8; 32]> {
    match plaintext {
        NotePlaintext::Standard(n) => {
            commit_standard(&n.stealth_pub_x, &n.token_mint, n.amount, &n.randomness)
        }
        NotePlaintext::Position(n) => commit_position(n),
        NotePlaintext::Lp(n) => commit_lp(n),
    }
}

/// Recompute and compare.
pub fn verify_commitment(commitment: &[u8; 32], plaintext: &NotePlaintext) -> Result<bool> {
    Ok(commitment_of(plaintext)? == *commitment)
}

/// Draw 32 bytes from the CSPRNG and reduce to a field element.
pub fn random_fr<R: RngCore + CryptoRng>(rng: &mut R) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    reduce_to_field(&bytes)
}
