//! On-chain encrypted-note layout
//!
//! Two layouts exist: the self-contained ECIES wire form (in-memory, §ecies)
//! and the fixed on-chain record, which is authoritative:
//!
//! ```text
//! stealth_ephemeral_pubkey: 64 bytes (X || Y)
//! encrypted_note_len:        2 bytes little-endian u16
//! encrypted_note:            len_ct u32 || ct_including_nonce || tag
//! ```
//!
//! The ephemeral key is stored once; the variable body is the ECIES wire
//! form with the ephemeral stripped. The whole record is hard-capped at 250
//! bytes (64 + 2 + 184).

use rand::{CryptoRng, RngCore};

use crate::constants::{
    ECIES_NONCE_SIZE, ECIES_TAG_SIZE, ENCRYPTED_NOTE_RECORD_SIZE, ENCRYPTED_NOTE_SIZE,
};
use crate::crypto::babyjubjub::Point;
use crate::crypto::ecies::{self, EciesCiphertext};
use crate::errors::{Result, SdkError};
use crate::note::NotePlaintext;

/// Encrypt a note under the stealth exchange's ephemeral scalar so that the
/// single on-chain key serves both stealth derivation and decryption.
pub fn seal_note<R: RngCore + CryptoRng>(
    plaintext: &NotePlaintext,
    recipient: &Point,
    ephemeral_scalar: &[u8; 32],
    rng: &mut R,
) -> Result<EciesCiphertext> {
    let bytes = plaintext.serialize();
    ecies::encrypt_with_ephemeral(&bytes, ephemeral_scalar, recipient, rng)
}

/// Map the in-memory ciphertext into the fixed on-chain record.
pub fn to_chain_layout(ct: &EciesCiphertext) -> Result<Vec<u8>> {
    let body_len = 4 + ct.ciphertext.len() + ECIES_TAG_SIZE;
    if body_len > ENCRYPTED_NOTE_SIZE {
        return Err(SdkError::DecryptFailure);
    }

    let mut out = Vec::with_capacity(64 + 2 + body_len);
    out.extend_from_slice(&ct.ephemeral.x);
    out.extend_from_slice(&ct.ephemeral.y);
    out.extend_from_slice(&(body_len as u16).to_le_bytes());
    out.extend_from_slice(&(ct.ciphertext.len() as u32).to_le_bytes());
    out.extend_from_slice(&ct.ciphertext);
    out.extend_from_slice(&ct.tag);

    debug_assert!(out.len() <= ENCRYPTED_NOTE_RECORD_SIZE);
    Ok(out)
}

/// Parse the on-chain record back into the in-memory ciphertext.
///
/// The embedded ephemeral key is subgroup-checked at this ingress.
pub fn from_chain_layout(bytes: &[u8]) -> Result<EciesCiphertext> {
    if bytes.len() < 64 + 2 || bytes.len() > ENCRYPTED_NOTE_RECORD_SIZE {
        return Err(SdkError::DecryptFailure);
    }

    let mut x = [0u8; 32];
    let mut y = [0u8; 32];
    x.copy_from_slice(&bytes[0..32]);
    y.copy_from_slice(&bytes[32..64]);
    let ephemeral = Point::from_affine(x, y)?;

    let body_len = u16::from_le_bytes(bytes[64..66].try_into().unwrap()) as usize;
    let body = &bytes[66..];
    if body.len() != body_len || body_len < 4 + ECIES_NONCE_SIZE + ECIES_TAG_SIZE {
        return Err(SdkError::DecryptFailure);
    }

    let ct_len = u32::from_le_bytes(body[0..4].try_into().unwrap()) as usize;
    if body_len != 4 + ct_len + ECIES_TAG_SIZE {
        return Err(SdkError::DecryptFailure);
    }

    let ciphertext = body[4..4 + ct_len].to_vec();
    let mut tag = [0u8; ECIES_TAG_SIZE];
    tag.copy_from_slice(&body[4 + ct_len..]);

    Ok(EciesCiphertext {
        ephemeral,
        ciphertext,
        tag,
    })
}
