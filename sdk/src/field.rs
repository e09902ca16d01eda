//! Field element conversion helpers for BN254
//!
//! Converts externally-sourced 32-byte identifiers and u64 amounts into
//! canonical scalar-field elements used as circuit inputs. The reduction
//! routine is shared with the on-chain program and must produce identical
//! output byte-for-byte.
//!
//! Everything here reduces by the scalar field r, never the base field q.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};

use crate::constants::FR_MODULUS;
use crate::errors::{Result, SdkError};

/// Reduce a 32-byte external identifier (token mint, pool id, proposal id)
/// to a field element.
///
/// The input is 256 bits and the modulus ~254 bits, so at most four
/// subtractions are needed.
pub fn id_to_field(id: &[u8; 32]) -> [u8; 32] {
    let mut value = *id;

    for _ in 0..4 {
        if ge_modulus(&value) {
            value = subtract_modulus(&value);
        } else {
            break;
        }
    }

    value
}

/// Convert a u64 to a field element (32-byte big-endian)
///
/// u64 values are always below the modulus, so no reduction is needed.
pub fn u64_to_field(value: u64) -> [u8; 32] {
    let mut result = [0u8; 32];
    result[24..32].copy_from_slice(&value.to_be_bytes());
    result
}

/// Fully reduce arbitrary 32 bytes into the field.
///
/// Unlike [`id_to_field`] this is not the bounded host-shared routine; use
/// it for locally-sampled values (randomness, hash-derived scalars) where
/// the input can sit anywhere in the 256-bit range.
pub fn reduce_to_field(bytes: &[u8; 32]) -> [u8; 32] {
    fr_to_bytes(&Fr::from_be_bytes_mod_order(bytes))
}

/// Strict conversion: fails with `NotCanonical` on any value >= r.
///
/// Callers holding possibly-out-of-range identifiers use [`id_to_field`]
/// instead.
pub fn to_field_strict(bytes: &[u8; 32]) -> Result<[u8; 32]> {
    if ge_modulus(bytes) {
        return Err(SdkError::NotCanonical);
    }
    Ok(*bytes)
}

/// True if the 32-byte big-endian value is a canonical field element.
pub fn is_canonical(bytes: &[u8; 32]) -> bool {
    !ge_modulus(bytes)
}

/// Parse canonical big-endian bytes into an arkworks field element.
pub fn fr_from_bytes(bytes: &[u8; 32]) -> Result<Fr> {
    if ge_modulus(bytes) {
        return Err(SdkError::NotCanonical);
    }
    Ok(Fr::from_be_bytes_mod_order(bytes))
}

/// Serialize a field element to 32 big-endian bytes.
pub fn fr_to_bytes(value: &Fr) -> [u8; 32] {
    let repr = value.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - repr.len()..].copy_from_slice(&repr);
    out
}

/// Subtract the modulus from a value (assumes the borrow resolves)
fn subtract_modulus(value: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: i16 = 0;

    for i in (0..32).rev() {
        let diff = value[i] as i16 - FR_MODULUS[i] as i16 - borrow;
        if diff < 0 {
            result[i] = (diff + 256) as u8;
            borrow = 1;
        } else {
            result[i] = diff as u8;
            borrow = 0;
        }
    }
    result
}

/// Compare a 32-byte big-endian value with the modulus.
///
/// Returns true if value >= r.
fn ge_modulus(value: &[u8; 32]) -> bool {
    for i in 0..32 {
        if value[i] > FR_MODULUS[i] {
            return true;
        } else if value[i] < FR_MODULUS[i] {
            return false;
        }
    }
    true // equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u64_to_field() {
        let field_elem = u64_to_field(12345);
        assert_eq!(&field_elem[0..24], &[0u8; 24]);
        assert_eq!(&field_elem[24..32], &12345u64.to_be_bytes());
    }

    #[test]
    fn test_small_values_unchanged() {
        let small = u64_to_field(42);
        assert_eq!(id_to_field(&small), small);
        assert!(is_canonical(&small));
    }

    #[test]
    fn test_large_id_reduces_below_modulus() {
        // host identifiers sit below 4x the modulus, the routine's bound
        let large = [0x90u8; 32];
        let reduced = id_to_field(&large);
        assert!(is_canonical(&reduced));
        assert_ne!(reduced, large);
    }

    #[test]
    fn test_modulus_reduces_to_zero() {
        assert_eq!(id_to_field(&FR_MODULUS), [0u8; 32]);
    }

    #[test]
    fn test_strict_rejects_modulus() {
        assert_eq!(to_field_strict(&FR_MODULUS), Err(SdkError::NotCanonical));

        let mut below = FR_MODULUS;
        below[31] -= 1;
        assert_eq!(to_field_strict(&below), Ok(below));
    }

    #[test]
    fn test_fr_round_trip() {
        let bytes = u64_to_field(0xdead_beef);
        let fr = fr_from_bytes(&bytes).unwrap();
        assert_eq!(fr_to_bytes(&fr), bytes);
    }

    #[test]
    fn test_reduction_matches_bigint() {
        // Cross-check the byte-level loop against arkworks reduction
        let large = [0xabu8; 32];
        let reduced = id_to_field(&large);
        let expected = fr_to_bytes(&Fr::from_be_bytes_mod_order(&large));
        assert_eq!(reduced, expected);
    }
}
