//! Stealth addresses
//!
//! The sender derives a one-time address for the recipient from an
//! ephemeral ECDH exchange; only the recipient can recognise and spend it.
//!
//! ```text
//! sender:    e random, E = e*G, S = e*P, f = Poseidon(STEALTH, S.x)
//!            stealth_pubkey = P + f*G
//! recipient: S = sk*E, f = Poseidon(STEALTH, S.x)
//!            stealth_sk = sk + f mod l
//! ```
//!
//! The tweak hashes only the x-coordinate of the shared point, matching the
//! circuits. Every incoming public key must already be subgroup-checked;
//! the functions here re-validate at ingress.

use rand::{CryptoRng, RngCore};

use crate::constants::domains;
use crate::crypto::babyjubjub::{self, Point};
use crate::errors::Result;
use crate::poseidon;

/// A sender-generated stealth address; the ephemeral key appears in the
/// on-chain encrypted-note record so the recipient can derive the stealth
/// private key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StealthAddress {
    pub stealth_pubkey: Point,
    pub ephemeral_pubkey: Point,
}

/// Output of [`generate`]: the address plus the ephemeral scalar the sender
/// needs to encrypt the note under the same shared secret.
#[derive(Clone, Debug)]
pub struct GeneratedStealth {
    pub address: StealthAddress,
    pub ephemeral_scalar: [u8; 32],
    pub shared_x: [u8; 32],
}

/// Generate a stealth address for a recipient public key.
pub fn generate<R: RngCore + CryptoRng>(
    recipient: &Point,
    rng: &mut R,
) -> Result<GeneratedStealth> {
    let recipient = Point::from_affine(recipient.x, recipient.y)?;

    let ephemeral_scalar = sample_scalar(rng);
    let ephemeral_pubkey = babyjubjub::mul_base(&ephemeral_scalar)?;
    let shared = babyjubjub::mul(&recipient, &ephemeral_scalar)?;

    let tweak = stealth_tweak(&shared.x)?;
    let stealth_pubkey = babyjubjub::add(&recipient, &babyjubjub::mul_base(&tweak)?)?;

    Ok(GeneratedStealth {
        address: StealthAddress {
            stealth_pubkey,
            ephemeral_pubkey,
        },
        ephemeral_scalar,
        shared_x: shared.x,
    })
}

/// Recipient side: derive the stealth spending scalar from the wallet
/// spending key and the ephemeral key found on chain.
pub fn derive_stealth_secret(sk: &[u8; 32], ephemeral: &Point) -> Result<[u8; 32]> {
    let ephemeral = Point::from_affine(ephemeral.x, ephemeral.y)?;
    let shared = babyjubjub::mul(&ephemeral, sk)?;
    let tweak = stealth_tweak(&shared.x)?;
    Ok(babyjubjub::scalar_add(sk, &tweak))
}

/// Check that (stealth_pubkey, ephemeral) belongs to the holder of sk.
pub fn check_ownership(
    stealth_pubkey: &Point,
    ephemeral: &Point,
    sk: &[u8; 32],
) -> Result<bool> {
    let stealth_sk = derive_stealth_secret(sk, ephemeral)?;
    Ok(babyjubjub::mul_base(&stealth_sk)? == *stealth_pubkey)
}

/// f = Poseidon(STEALTH, S.x)
fn stealth_tweak(shared_x: &[u8; 32]) -> Result<[u8; 32]> {
    poseidon::hash_domain(domains::STEALTH, &[*shared_x])
}

/// Sample a scalar in [1, l).
pub fn sample_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> [u8; 32] {
    loop {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        let scalar = babyjubjub::reduce_scalar(&bytes);
        if babyjubjub::scalar_is_valid(&scalar) {
            return scalar;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::Wallet;
    use crate::field::u64_to_field;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_recipient_can_always_spend() {
        let mut rng = StdRng::seed_from_u64(11);
        let wallet = Wallet::create(&mut rng).unwrap();

        let generated = generate(wallet.public_key(), &mut rng).unwrap();
        let stealth_sk = derive_stealth_secret(
            wallet.spending_key().unwrap(),
            &generated.address.ephemeral_pubkey,
        )
        .unwrap();

        assert_eq!(
            babyjubjub::mul_base(&stealth_sk).unwrap(),
            generated.address.stealth_pubkey
        );
    }

    #[test]
    fn test_check_ownership() {
        let mut rng = StdRng::seed_from_u64(13);
        let bob = Wallet::create(&mut rng).unwrap();
        let eve = Wallet::create(&mut rng).unwrap();

        let generated = generate(bob.public_key(), &mut rng).unwrap();
        assert!(check_ownership(
            &generated.address.stealth_pubkey,
            &generated.address.ephemeral_pubkey,
            bob.spending_key().unwrap(),
        )
        .unwrap());

        assert!(!check_ownership(
            &generated.address.stealth_pubkey,
            &generated.address.ephemeral_pubkey,
            eve.spending_key().unwrap(),
        )
        .unwrap());
    }

    #[test]
    fn test_addresses_are_one_time() {
        let mut rng = StdRng::seed_from_u64(17);
        let wallet = Wallet::create(&mut rng).unwrap();

        let first = generate(wallet.public_key(), &mut rng).unwrap();
        let second = generate(wallet.public_key(), &mut rng).unwrap();
        assert_ne!(
            first.address.stealth_pubkey,
            second.address.stealth_pubkey
        );
    }

    #[test]
    fn test_shared_secret_agreement() {
        let mut rng = StdRng::seed_from_u64(19);
        let wallet = Wallet::create(&mut rng).unwrap();

        let generated = generate(wallet.public_key(), &mut rng).unwrap();
        let shared = babyjubjub::mul(
            &generated.address.ephemeral_pubkey,
            wallet.spending_key().unwrap(),
        )
        .unwrap();
        assert_eq!(shared.x, generated.shared_x);
    }

    #[test]
    fn test_invalid_recipient_rejected() {
        let mut rng = StdRng::seed_from_u64(23);
        let bogus = Point {
            x: u64_to_field(1),
            y: u64_to_field(2),
        };
        assert!(generate(&bogus, &mut rng).is_err());
    }
}
