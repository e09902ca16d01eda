//! Threshold ElGamal over BabyJubJub
//!
//! Exponential ElGamal: a ballot encrypts the voter's power in the exponent,
//! ciphertexts add homomorphically, and a t-of-n committee produces
//! decryption shares that combine through Lagrange coefficients at zero.
//! Chaum-Pedersen DLEQ proofs bind each share to the member's public key
//! without revealing the key share.
//!
//! Recovering m from m*G uses baby-step/giant-step over a bounded range;
//! the bound is a deployment parameter (total voting power).

use std::collections::HashMap;

use num_bigint::{BigInt, Sign};
use rand::{CryptoRng, RngCore};

use crate::crypto::babyjubjub::{self, Point};
use crate::crypto::stealth;
use crate::errors::{Result, SdkError};
use crate::field;
use crate::poseidon;

/// ElGamal ciphertext: (c1, c2) = (r*G, m*G + r*P). Additively homomorphic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ciphertext {
    pub c1: Point,
    pub c2: Point,
}

/// Compact Chaum-Pedersen proof that log_G(P) = log_c1(D).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DleqProof {
    pub challenge: [u8; 32],
    pub response: [u8; 32],
}

/// The three ballot options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteChoice {
    Yes,
    No,
    Abstain,
}

impl VoteChoice {
    pub fn index(&self) -> usize {
        match self {
            VoteChoice::Yes => 0,
            VoteChoice::No => 1,
            VoteChoice::Abstain => 2,
        }
    }
}

/// Encrypt a u64 under an election public key with explicit randomness.
pub fn encrypt(message: u64, public_key: &Point, randomness: &[u8; 32]) -> Result<Ciphertext> {
    let public_key = Point::from_affine(public_key.x, public_key.y)?;
    if !babyjubjub::scalar_is_valid(randomness) {
        return Err(SdkError::InvalidScalar);
    }

    let c1 = babyjubjub::mul_base(randomness)?;
    let m_point = babyjubjub::mul_base(&field::u64_to_field(message))?;
    let blind = babyjubjub::mul(&public_key, randomness)?;
    let c2 = babyjubjub::add(&m_point, &blind)?;

    Ok(Ciphertext { c1, c2 })
}

/// Homomorphic addition of two ciphertexts.
pub fn add(a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
    Ok(Ciphertext {
        c1: babyjubjub::add(&a.c1, &b.c1)?,
        c2: babyjubjub::add(&a.c2, &b.c2)?,
    })
}

/// Encrypt a ballot: the chosen option encrypts the voting power, every
/// other option encrypts zero, each under its own randomness.
pub fn encrypt_ballot(
    power: u64,
    choice: usize,
    election_key: &Point,
    randomness: &[[u8; 32]],
) -> Result<Vec<Ciphertext>> {
    if choice >= randomness.len() {
        return Err(SdkError::InvalidScalar);
    }

    randomness
        .iter()
        .enumerate()
        .map(|(option, r)| {
            let message = if option == choice { power } else { 0 };
            encrypt(message, election_key, r)
        })
        .collect()
}

/// Three-option convenience wrapper matching the governance ballots.
pub fn encrypt_vote(
    power: u64,
    choice: VoteChoice,
    election_key: &Point,
    randomness: &[[u8; 32]; 3],
) -> Result<Vec<Ciphertext>> {
    encrypt_ballot(power, choice.index(), election_key, randomness.as_slice())
}

/// A committee member's decryption share: D_i = sk_i * c1.
pub fn decryption_share(ct: &Ciphertext, secret_share: &[u8; 32]) -> Result<Point> {
    babyjubjub::mul(&ct.c1, secret_share)
}

/// Lagrange coefficient at zero for member i over the given index set,
/// mod the subgroup order. The modular inverse is extended-Euclidean.
pub fn lagrange_coefficient(indices: &[u64], i: u64) -> Result<[u8; 32]> {
    let order = BigInt::from_biguint(Sign::Plus, babyjubjub::subgroup_order());
    let mut numerator = BigInt::from(1);
    let mut denominator = BigInt::from(1);

    for &j in indices {
        if j == i {
            continue;
        }
        numerator = (numerator * BigInt::from(j)).mod_floor_pos(&order);
        denominator =
            (denominator * (BigInt::from(j) - BigInt::from(i))).mod_floor_pos(&order);
    }

    let inv = mod_inverse(&denominator, &order).ok_or(SdkError::InvalidScalar)?;
    let lambda = (numerator * inv).mod_floor_pos(&order);
    let lambda = lambda.to_biguint().ok_or(SdkError::InvalidScalar)?;
    Ok(babyjubjub::scalar_to_bytes(&lambda))
}

/// Combine t decryption shares into the plaintext point m*G:
/// M = c2 - sum(lambda_i * D_i).
pub fn combine(ct: &Ciphertext, shares: &[Point], indices: &[u64]) -> Result<Point> {
    if shares.len() != indices.len() || shares.is_empty() {
        return Err(SdkError::InvalidScalar);
    }

    let mut acc = Point::identity();
    for (share, &index) in shares.iter().zip(indices) {
        let lambda = lagrange_coefficient(indices, index)?;
        acc = babyjubjub::add(&acc, &babyjubjub::mul(share, &lambda)?)?;
    }

    babyjubjub::add(&ct.c2, &babyjubjub::negate(&acc)?)
}

/// Recover m from m*G by baby-step/giant-step over [0, max].
///
/// Returns `None` when the point is outside the bounded range.
pub fn discrete_log(point: &Point, max: u64) -> Result<Option<u64>> {
    if point.is_identity() {
        return Ok(Some(0));
    }

    let baby = (max as f64).sqrt().ceil() as u64 + 1;

    let mut table = HashMap::with_capacity(baby as usize);
    let mut step = Point::identity();
    let g = Point::generator();
    for j in 0..baby {
        table.insert(step, j);
        step = babyjubjub::add(&step, &g)?;
    }

    // step now holds baby*G
    let giant = babyjubjub::negate(&step)?;
    let mut current = *point;
    for i in 0..=(max / baby) {
        if let Some(&j) = table.get(&current) {
            let m = i * baby + j;
            if m <= max {
                return Ok(Some(m));
            }
        }
        current = babyjubjub::add(&current, &giant)?;
    }

    Ok(None)
}

/// Produce a DLEQ proof that the share D = sk_i * c1 was formed with the
/// same scalar as the member's public key P = sk_i * G.
pub fn dleq_prove<R: RngCore + CryptoRng>(
    secret_share: &[u8; 32],
    c1: &Point,
    rng: &mut R,
) -> Result<DleqProof> {
    if !babyjubjub::scalar_is_valid(secret_share) {
        return Err(SdkError::InvalidScalar);
    }

    let public_key = babyjubjub::mul_base(secret_share)?;
    let share = babyjubjub::mul(c1, secret_share)?;

    let k = stealth::sample_scalar(rng);
    let commit_g = babyjubjub::mul_base(&k)?;
    let commit_c1 = babyjubjub::mul(c1, &k)?;

    let challenge = dleq_challenge(&public_key, c1, &share, &commit_g, &commit_c1)?;
    let challenge_scalar = babyjubjub::reduce_scalar(&challenge);
    let response = babyjubjub::scalar_add(
        &k,
        &babyjubjub::scalar_mul(&challenge_scalar, secret_share),
    );

    Ok(DleqProof {
        challenge,
        response,
    })
}

/// Verify a DLEQ proof for (P, c1, D).
pub fn dleq_verify(
    public_key: &Point,
    c1: &Point,
    share: &Point,
    proof: &DleqProof,
) -> Result<bool> {
    let public_key = Point::from_affine(public_key.x, public_key.y)?;
    let share = Point::from_affine(share.x, share.y)?;
    let challenge_scalar = babyjubjub::reduce_scalar(&proof.challenge);

    // A' = s*G - c*P, B' = s*c1 - c*D
    let commit_g = babyjubjub::add(
        &babyjubjub::mul_base(&proof.response)?,
        &babyjubjub::negate(&babyjubjub::mul(&public_key, &challenge_scalar)?)?,
    )?;
    let commit_c1 = babyjubjub::add(
        &babyjubjub::mul(c1, &proof.response)?,
        &babyjubjub::negate(&babyjubjub::mul(&share, &challenge_scalar)?)?,
    )?;

    let expected = dleq_challenge(&public_key, c1, &share, &commit_g, &commit_c1)?;
    Ok(expected == proof.challenge)
}

/// Challenge over the transcript x-coordinates, staying within the 5-input
/// hash arity: H(H(G.x, P.x, c1.x, D.x), A.x, B.x).
fn dleq_challenge(
    public_key: &Point,
    c1: &Point,
    share: &Point,
    commit_g: &Point,
    commit_c1: &Point,
) -> Result<[u8; 32]> {
    let inner = poseidon::hash(&[
        Point::generator().x,
        public_key.x,
        c1.x,
        share.x,
    ])?;
    poseidon::hash(&[inner, commit_g.x, commit_c1.x])
}

/// Extended-Euclidean modular inverse; `None` when gcd != 1.
fn mod_inverse(value: &BigInt, modulus: &BigInt) -> Option<BigInt> {
    let mut r0 = modulus.clone();
    let mut r1 = value.mod_floor_pos(modulus);
    let mut t0 = BigInt::from(0);
    let mut t1 = BigInt::from(1);

    while r1 != BigInt::from(0) {
        let q = &r0 / &r1;
        let r2 = &r0 - &q * &r1;
        let t2 = &t0 - &q * &t1;
        r0 = r1;
        r1 = r2;
        t0 = t1;
        t1 = t2;
    }

    if r0 != BigInt::from(1) {
        return None;
    }
    Some(t0.mod_floor_pos(modulus))
}

trait ModFloorPos {
    fn mod_floor_pos(&self, modulus: &BigInt) -> BigInt;
}

impl ModFloorPos for BigInt {
    fn mod_floor_pos(&self, modulus: &BigInt) -> BigInt {
        let r = self % modulus;
        if r < BigInt::from(0) {
            r + modulus
        } else {
            r
        }
    }
}

/// Sample per-option ballot randomness.
pub fn sample_ballot_randomness<R: RngCore + CryptoRng>(
    options: usize,
    rng: &mut R,
) -> Vec<[u8; 32]> {
    (0..options).map(|_| stealth::sample_scalar(rng)).collect()
}
