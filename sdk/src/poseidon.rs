//! Domain-separated Poseidon hash family over the BN254 scalar field
//!
//! Parameters are the circom-compatible BN254 set fixed by the circuits;
//! `light-hasher` carries them. Inputs and outputs are canonical 32-byte
//! big-endian field elements.

use light_hasher::{Hasher, Poseidon};

use crate::errors::{Result, SdkError};
use crate::field;

/// Maximum number of inputs to a single permutation call
pub const MAX_INPUTS: usize = 5;

/// Hash 1..=5 field elements.
pub fn hash(inputs: &[[u8; 32]]) -> Result<[u8; 32]> {
    if inputs.is_empty() || inputs.len() > MAX_INPUTS {
        return Err(SdkError::InvalidScalar);
    }
    for input in inputs {
        if !field::is_canonical(input) {
            return Err(SdkError::InvalidScalar);
        }
    }

    let refs: Vec<&[u8]> = inputs.iter().map(|i| i.as_slice()).collect();
    Poseidon::hashv(&refs).map_err(|_| SdkError::InvalidScalar)
}

/// Hash with a domain separator prepended as the first field element.
///
/// The domain byte values are bound to each use-site and must match the
/// circuits byte-for-byte.
pub fn hash_domain(domain: u8, inputs: &[[u8; 32]]) -> Result<[u8; 32]> {
    if inputs.is_empty() || inputs.len() > MAX_INPUTS - 1 {
        return Err(SdkError::InvalidScalar);
    }

    let mut all = Vec::with_capacity(inputs.len() + 1);
    all.push(field::u64_to_field(domain as u64));
    all.extend_from_slice(inputs);
    hash(&all)
}
