//! Groth16 proof formatting for the on-chain pairing verifier
//!
//! The external prover returns (pi_a in G1, pi_b in G2, pi_c in G1) with
//! coordinates in natural (real, imaginary) order. The verifier consumes a
//! 256-byte buffer with A's y-coordinate negated (the pairing check is
//! e(-A, B) * e(alpha, beta) * ... = 1) and G2 coordinates swapped to
//! imaginary-before-real. Failure to negate yields a proof the prover
//! accepts and the chain rejects.
//!
//! ```text
//! 0    32  A.x
//! 32   32  -A.y mod q
//! 64   32  B.x_imag
//! 96   32  B.x_real
//! 128  32  B.y_imag
//! 160  32  B.y_real
//! 192  32  C.x
//! 224  32  C.y
//! ```

pub mod prover;

use crate::constants::{FQ_MODULUS, GROTH16_PROOF_SIZE};
use crate::errors::{Result, SdkError};

/// A G1 point in affine big-endian coordinates (base field).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct G1Point {
    pub x: [u8; 32],
    pub y: [u8; 32],
}

/// A G2 point; coordinates are degree-2 extension elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct G2Point {
    pub x_real: [u8; 32],
    pub x_imag: [u8; 32],
    pub y_real: [u8; 32],
    pub y_imag: [u8; 32],
}

/// Raw prover output before verifier formatting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProverProof {
    pub a: G1Point,
    pub b: G2Point,
    pub c: G1Point,
}

/// Groth16 proof in the on-chain byte layout (A: 64, B: 128, C: 64).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Groth16Proof {
    pub a: [u8; 64],
    pub b: [u8; 128],
    pub c: [u8; 64],
}

impl std::fmt::Debug for Groth16Proof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Groth16Proof")
            .field("a", &hex::encode(&self.a[..8]))
            .field("b", &hex::encode(&self.b[..8]))
            .field("c", &hex::encode(&self.c[..8]))
            .finish()
    }
}

impl Groth16Proof {
    pub const SIZE: usize = GROTH16_PROOF_SIZE;

    /// Parse a 256-byte verifier buffer.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(SdkError::ProverFailure(format!(
                "proof must be {} bytes, got {}",
                Self::SIZE,
                bytes.len()
            )));
        }

        let mut a = [0u8; 64];
        let mut b = [0u8; 128];
        let mut c = [0u8; 64];
        a.copy_from_slice(&bytes[0..64]);
        b.copy_from_slice(&bytes[64..192]);
        c.copy_from_slice(&bytes[192..256]);

        Ok(Self { a, b, c })
    }

    /// Serialize back to the 256-byte buffer. Inverse of [`from_bytes`].
    pub fn to_bytes(&self) -> [u8; GROTH16_PROOF_SIZE] {
        let mut out = [0u8; GROTH16_PROOF_SIZE];
        out[0..64].copy_from_slice(&self.a);
        out[64..192].copy_from_slice(&self.b);
        out[192..256].copy_from_slice(&self.c);
        out
    }

    /// Re-serialize prover output into the verifier layout: negate A.y and
    /// swap G2 coordinates to imaginary-before-real.
    pub fn from_prover(proof: &ProverProof) -> Self {
        let mut a = [0u8; 64];
        a[0..32].copy_from_slice(&proof.a.x);
        a[32..64].copy_from_slice(&negate_base_field(&proof.a.y));

        let mut b = [0u8; 128];
        b[0..32].copy_from_slice(&proof.b.x_imag);
        b[32..64].copy_from_slice(&proof.b.x_real);
        b[64..96].copy_from_slice(&proof.b.y_imag);
        b[96..128].copy_from_slice(&proof.b.y_real);

        let mut c = [0u8; 64];
        c[0..32].copy_from_slice(&proof.c.x);
        c[32..64].copy_from_slice(&proof.c.y);

        Self { a, b, c }
    }
}

/// -y mod q over the base field (big-endian byte subtraction).
fn negate_base_field(y: &[u8; 32]) -> [u8; 32] {
    if *y == [0u8; 32] {
        return [0u8; 32];
    }

    let mut negated = [0u8; 32];
    let mut borrow: i16 = 0;
    for i in (0..32).rev() {
        let diff = FQ_MODULUS[i] as i16 - y[i] as i16 - borrow;
        if diff < 0 {
            negated[i] = (diff + 256) as u8;
            borrow = 1;
        } else {
            negated[i] = diff as u8;
            borrow = 0;
        }
    }
    negated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serialize_round_trip() {
        let mut bytes = [0u8; GROTH16_PROOF_SIZE];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }
        let proof = Groth16Proof::from_bytes(&bytes).unwrap();
        assert_eq!(proof.to_bytes(), bytes);
    }

    #[test]
    fn test_invalid_length_rejected() {
        assert!(Groth16Proof::from_bytes(&[0u8; 100]).is_err());
        assert!(Groth16Proof::from_bytes(&[0u8; 257]).is_err());
    }

    #[test]
    fn test_g2_swap_and_negation() {
        let proof = ProverProof {
            a: G1Point {
                x: [1u8; 32],
                y: [2u8; 32],
            },
            b: G2Point {
                x_real: [3u8; 32],
                x_imag: [4u8; 32],
                y_real: [5u8; 32],
                y_imag: [6u8; 32],
            },
            c: G1Point {
                x: [7u8; 32],
                y: [8u8; 32],
            },
        };

        let formatted = Groth16Proof::from_prover(&proof);
        assert_eq!(&formatted.a[0..32], &[1u8; 32]);
        // imag comes before real
        assert_eq!(&formatted.b[0..32], &[4u8; 32]);
        assert_eq!(&formatted.b[32..64], &[3u8; 32]);
        assert_eq!(&formatted.b[64..96], &[6u8; 32]);
        assert_eq!(&formatted.b[96..128], &[5u8; 32]);
        assert_eq!(&formatted.c[0..32], &[7u8; 32]);
        assert_eq!(&formatted.c[32..64], &[8u8; 32]);
    }

    #[test]
    fn test_negation_is_involutive() {
        let y = [2u8; 32];
        let neg = negate_base_field(&y);
        assert_ne!(neg, y);
        assert_eq!(negate_base_field(&neg), y);
        assert_eq!(negate_base_field(&[0u8; 32]), [0u8; 32]);
    }

    #[test]
    fn test_negation_sums_to_modulus() {
        // y + (-y) == q for nonzero y
        let y = [9u8; 32];
        let neg = negate_base_field(&y);

        let mut sum = [0u8; 32];
        let mut carry = 0u16;
        for i in (0..32).rev() {
            let s = y[i] as u16 + neg[i] as u16 + carry;
            sum[i] = s as u8;
            carry = s >> 8;
        }
        assert_eq!(carry, 0);
        assert_eq!(sum, crate::constants::FQ_MODULUS);
    }
}
