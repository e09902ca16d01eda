//! Wallet keys and lifecycle
//!
//! A spending key is a scalar in [1, l) and owns everything. From it the
//! wallet derives the nullifier key, the incoming viewing key and the
//! public key:
//!
//! ```text
//! nk  = Poseidon(NULLIFIER_KEY, sk, 0)
//! ivk = Poseidon(IVK, sk)
//! P   = sk * G
//! ```
//!
//! Wallets come in four flavours: freshly sampled, loaded from raw bytes,
//! deterministically derived from a host-chain wallet signature over
//! [`crate::constants::WALLET_SIGN_MESSAGE`], or derived from a seed phrase
//! via PBKDF2. Watch-only wallets carry authentic (nk, ivk, P) with no
//! spending scalar.

use rand::{CryptoRng, RngCore};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{domains, SEED_KDF_ITERATIONS, SEED_KDF_SALT_PREFIX};
use crate::crypto::babyjubjub::{self, Point};
use crate::errors::{Result, SdkError};
use crate::field;
use crate::poseidon;

/// Spending key bytes (big-endian scalar), zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SpendingKey([u8; 32]);

impl SpendingKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SpendingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SpendingKey(..)")
    }
}

/// Viewing material: enough to derive nullifiers and recognise owned state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewingKey {
    /// nk, suffices to derive spending and action nullifiers
    pub nullifier_key: [u8; 32],
    /// ivk, identifies the wallet for caches and watch-only tracking
    pub incoming_viewing_key: [u8; 32],
}

/// A wallet: spending scalar (unless watch-only), viewing keys, public key.
#[derive(Clone, Debug)]
pub struct Wallet {
    spending_key: Option<SpendingKey>,
    viewing: ViewingKey,
    public_key: Point,
}

impl Wallet {
    /// Sample a fresh spending key from the given CSPRNG.
    pub fn create<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        loop {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            let sk = babyjubjub::reduce_scalar(&bytes);
            bytes.zeroize();
            if babyjubjub::scalar_is_valid(&sk) {
                return Self::from_scalar(sk);
            }
            // reduction landed on zero, resample
        }
    }

    /// Load an existing spending key. Fails with `InvalidSpendingKey` if the
    /// scalar is zero or not below the subgroup order.
    pub fn load(sk_bytes: [u8; 32]) -> Result<Self> {
        if !babyjubjub::scalar_is_valid(&sk_bytes) {
            return Err(SdkError::InvalidSpendingKey);
        }
        Self::from_scalar(sk_bytes)
    }

    /// Construct a no-spend wallet from authentic viewing keys and public key.
    ///
    /// The public key is validated at ingress like every external point.
    pub fn watch_only(viewing: ViewingKey, public_key: Point) -> Result<Self> {
        let public_key = Point::from_affine(public_key.x, public_key.y)?;
        Ok(Self {
            spending_key: None,
            viewing,
            public_key,
        })
    }

    /// Derive deterministically from a host-chain wallet signature (>= 64
    /// bytes) over the fixed sign message.
    ///
    /// sk = Poseidon(WALLET_DERIVE, sig[0..32], sig[32..64]) mod l. The
    /// signature halves are reduced to canonical field elements first so the
    /// hash input is always valid.
    pub fn from_signature(signature: &[u8]) -> Result<Self> {
        if signature.len() < 64 {
            return Err(SdkError::InvalidSpendingKey);
        }

        let mut half_a = [0u8; 32];
        let mut half_b = [0u8; 32];
        half_a.copy_from_slice(&signature[0..32]);
        half_b.copy_from_slice(&signature[32..64]);

        let digest = poseidon::hash_domain(
            domains::WALLET_DERIVE,
            &[field::reduce_to_field(&half_a), field::reduce_to_field(&half_b)],
        )?;
        half_a.zeroize();
        half_b.zeroize();

        let sk = babyjubjub::reduce_scalar(&digest);
        if !babyjubjub::scalar_is_valid(&sk) {
            return Err(SdkError::InvalidSpendingKey);
        }
        Self::from_scalar(sk)
    }

    /// Derive from a seed phrase and derivation path.
    ///
    /// PBKDF2-HMAC-SHA256, 100 000 iterations, salt = "cloakcraft" || path,
    /// 256-bit output reduced mod l.
    pub fn from_seed(phrase: &str, path: &str) -> Result<Self> {
        let mut salt = Vec::with_capacity(SEED_KDF_SALT_PREFIX.len() + path.len());
        salt.extend_from_slice(SEED_KDF_SALT_PREFIX);
        salt.extend_from_slice(path.as_bytes());

        let mut derived = [0u8; 32];
        pbkdf2::pbkdf2_hmac::<Sha256>(
            phrase.as_bytes(),
            &salt,
            SEED_KDF_ITERATIONS,
            &mut derived,
        );

        let sk = babyjubjub::reduce_scalar(&derived);
        derived.zeroize();
        if !babyjubjub::scalar_is_valid(&sk) {
            return Err(SdkError::InvalidSpendingKey);
        }
        Self::from_scalar(sk)
    }

    fn from_scalar(sk: [u8; 32]) -> Result<Self> {
        let viewing = derive_viewing_key(&sk)?;
        let public_key = babyjubjub::mul_base(&sk)?;
        Ok(Self {
            spending_key: Some(SpendingKey(sk)),
            viewing,
            public_key,
        })
    }

    pub fn is_watch_only(&self) -> bool {
        self.spending_key.is_none()
    }

    /// The spending scalar; `InvalidSpendingKey` for watch-only wallets.
    pub fn spending_key(&self) -> Result<&[u8; 32]> {
        self.spending_key
            .as_ref()
            .map(|sk| sk.as_bytes())
            .ok_or(SdkError::InvalidSpendingKey)
    }

    pub fn viewing_key(&self) -> &ViewingKey {
        &self.viewing
    }

    pub fn public_key(&self) -> &Point {
        &self.public_key
    }
}

/// nk = Poseidon(NULLIFIER_KEY, sk, 0); ivk = Poseidon(IVK, sk)
pub fn derive_viewing_key(sk: &[u8; 32]) -> Result<ViewingKey> {
    let nullifier_key =
        poseidon::hash_domain(domains::NULLIFIER_KEY, &[*sk, [0u8; 32]])?;
    let incoming_viewing_key = poseidon::hash_domain(domains::IVK, &[*sk])?;
    Ok(ViewingKey {
        nullifier_key,
        incoming_viewing_key,
    })
}
