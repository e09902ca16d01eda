//! ECIES note encryption
//!
//! Ephemeral ECDH on BabyJubJub, key derivation from the shared point's
//! x-coordinate (SHA-256 truncated to the ChaCha20-Poly1305 key size), then
//! AEAD with a random 12-byte nonce embedded at the front of the ciphertext
//! field and a 16-byte Poly1305 tag.
//!
//! Wire format (lengths little-endian):
//!
//! ```text
//! E.x (32) || E.y (32) || len_ct u32 (4) || ct_including_nonce (len) || tag (16)
//! ```
//!
//! `try_decrypt` never raises; scanning tries every ciphertext and most are
//! not ours.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use crate::constants::{ECIES_NONCE_SIZE, ECIES_TAG_SIZE};
use crate::crypto::babyjubjub::{self, Point};
use crate::crypto::stealth;
use crate::errors::{Result, SdkError};

/// An ECIES ciphertext: ephemeral public key, nonce-prefixed ciphertext,
/// and the AEAD tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EciesCiphertext {
    pub ephemeral: Point,
    /// nonce (12 bytes) || AEAD ciphertext
    pub ciphertext: Vec<u8>,
    pub tag: [u8; ECIES_TAG_SIZE],
}

/// Encrypt to a recipient public key with a fresh ephemeral scalar.
pub fn encrypt<R: RngCore + CryptoRng>(
    plaintext: &[u8],
    recipient: &Point,
    rng: &mut R,
) -> Result<EciesCiphertext> {
    let ephemeral_scalar = stealth::sample_scalar(rng);
    encrypt_with_ephemeral(plaintext, &ephemeral_scalar, recipient, rng)
}

/// Encrypt reusing a caller-held ephemeral scalar.
///
/// The note pipeline reuses the stealth exchange's ephemeral so one on-chain
/// key serves both stealth derivation and decryption.
pub fn encrypt_with_ephemeral<R: RngCore + CryptoRng>(
    plaintext: &[u8],
    ephemeral_scalar: &[u8; 32],
    recipient: &Point,
    rng: &mut R,
) -> Result<EciesCiphertext> {
    let recipient = Point::from_affine(recipient.x, recipient.y)?;
    if !babyjubjub::scalar_is_valid(ephemeral_scalar) {
        return Err(SdkError::InvalidScalar);
    }

    let ephemeral = babyjubjub::mul_base(ephemeral_scalar)?;
    let shared = babyjubjub::mul(&recipient, ephemeral_scalar)?;
    let key = derive_key(&shared.x);

    let mut nonce = [0u8; ECIES_NONCE_SIZE];
    rng.fill_bytes(&mut nonce);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
    let mut sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| SdkError::DecryptFailure)?;

    // AEAD output is ciphertext || tag; split the tag off and prefix the nonce
    let tag_start = sealed.len() - ECIES_TAG_SIZE;
    let mut tag = [0u8; ECIES_TAG_SIZE];
    tag.copy_from_slice(&sealed[tag_start..]);
    sealed.truncate(tag_start);

    let mut ciphertext = Vec::with_capacity(ECIES_NONCE_SIZE + sealed.len());
    ciphertext.extend_from_slice(&nonce);
    ciphertext.extend_from_slice(&sealed);

    Ok(EciesCiphertext {
        ephemeral,
        ciphertext,
        tag,
    })
}

/// Decrypt with the recipient's scalar. Raises `DecryptFailure` on a bad
/// tag or malformed ciphertext.
pub fn decrypt(ct: &EciesCiphertext, sk: &[u8; 32]) -> Result<Vec<u8>> {
    if ct.ciphertext.len() < ECIES_NONCE_SIZE {
        return Err(SdkError::DecryptFailure);
    }

    let ephemeral = Point::from_affine(ct.ephemeral.x, ct.ephemeral.y)?;
    let shared = babyjubjub::mul(&ephemeral, sk)?;
    let key = derive_key(&shared.x);

    let nonce = &ct.ciphertext[..ECIES_NONCE_SIZE];
    let body = &ct.ciphertext[ECIES_NONCE_SIZE..];

    let mut sealed = Vec::with_capacity(body.len() + ECIES_TAG_SIZE);
    sealed.extend_from_slice(body);
    sealed.extend_from_slice(&ct.tag);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
    cipher
        .decrypt(Nonce::from_slice(nonce), sealed.as_slice())
        .map_err(|_| SdkError::DecryptFailure)
}

/// Non-raising decrypt for scanning.
pub fn try_decrypt(ct: &EciesCiphertext, sk: &[u8; 32]) -> Option<Vec<u8>> {
    decrypt(ct, sk).ok()
}

/// Serialize to the wire format.
pub fn to_wire(ct: &EciesCiphertext) -> Vec<u8> {
    let mut out = Vec::with_capacity(64 + 4 + ct.ciphertext.len() + ECIES_TAG_SIZE);
    out.extend_from_slice(&ct.ephemeral.x);
    out.extend_from_slice(&ct.ephemeral.y);
    out.extend_from_slice(&(ct.ciphertext.len() as u32).to_le_bytes());
    out.extend_from_slice(&ct.ciphertext);
    out.extend_from_slice(&ct.tag);
    out
}

/// Parse the wire format. The embedded ephemeral key is subgroup-checked.
pub fn from_wire(bytes: &[u8]) -> Result<EciesCiphertext> {
    if bytes.len() < 64 + 4 + ECIES_NONCE_SIZE + ECIES_TAG_SIZE {
        return Err(SdkError::DecryptFailure);
    }

    let mut x = [0u8; 32];
    let mut y = [0u8; 32];
    x.copy_from_slice(&bytes[0..32]);
    y.copy_from_slice(&bytes[32..64]);
    let ephemeral = Point::from_affine(x, y)?;

    let len = u32::from_le_bytes(bytes[64..68].try_into().unwrap()) as usize;
    if bytes.len() != 68 + len + ECIES_TAG_SIZE || len < ECIES_NONCE_SIZE {
        return Err(SdkError::DecryptFailure);
    }

    let ciphertext = bytes[68..68 + len].to_vec();
    let mut tag = [0u8; ECIES_TAG_SIZE];
    tag.copy_from_slice(&bytes[68 + len..]);

    Ok(EciesCiphertext {
        ephemeral,
        ciphertext,
        tag,
    })
}

/// AEAD key = SHA-256 of the shared x-coordinate.
fn derive_key(shared_x: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(shared_x);
    hasher.finalize().into()
}
