//! Protocol constants and domain separators

/// Merkle tree depth expected by every circuit
pub const MERKLE_TREE_DEPTH: usize = 32;

/// Groth16 proof size in bytes (A: 64, B: 128, C: 64)
pub const GROTH16_PROOF_SIZE: usize = 256;

/// Maximum size of the variable encrypted-note body stored on chain
pub const ENCRYPTED_NOTE_SIZE: usize = 184;

/// Hard cap for the full on-chain encrypted payload
/// (64-byte ephemeral pubkey + 2-byte length + body)
pub const ENCRYPTED_NOTE_RECORD_SIZE: usize = 250;

/// Maximum plaintext sizes per note kind
pub const MAX_STANDARD_PLAINTEXT: usize = 170;
pub const MAX_POSITION_PLAINTEXT: usize = 123;
pub const MAX_LP_PLAINTEXT: usize = 105;

/// ECIES nonce and tag sizes (ChaCha20-Poly1305)
pub const ECIES_NONCE_SIZE: usize = 12;
pub const ECIES_TAG_SIZE: usize = 16;

/// Message a host-chain wallet signs to derive a deterministic spending key
pub const WALLET_SIGN_MESSAGE: &str = "CloakCraft Stealth Wallet v1";

/// PBKDF2 parameters for seed-phrase derivation
pub const SEED_KDF_ITERATIONS: u32 = 100_000;
pub const SEED_KDF_SALT_PREFIX: &[u8] = b"cloakcraft";

/// Default bounded-table range for ElGamal discrete-log recovery.
/// Deployment-dependent; callers override per election.
pub const DEFAULT_DISCRETE_LOG_BOUND: u64 = 1 << 32;

/// BN254 scalar field modulus (big-endian)
/// r = 21888242871839275222246405745257275088548364400416034343698204186575808495617
///
/// All hash outputs, commitments and circuit inputs live in this field. The
/// base field (below) is used only for proof-point coordinates; the two must
/// never be confused.
pub const FR_MODULUS: [u8; 32] = [
    0x30, 0x64, 0x4e, 0x72, 0xe1, 0x31, 0xa0, 0x29,
    0xb8, 0x50, 0x45, 0xb6, 0x81, 0x81, 0x58, 0x5d,
    0x28, 0x33, 0xe8, 0x48, 0x79, 0xb9, 0x70, 0x91,
    0x43, 0xe1, 0xf5, 0x93, 0xf0, 0x00, 0x00, 0x01,
];

/// BN254 base field modulus (big-endian)
/// q = 21888242871839275222246405745257275088696311157297823662689037894645226208583
///
/// Used exclusively to negate G1 y-coordinates for the pairing check.
pub const FQ_MODULUS: [u8; 32] = [
    0x30, 0x64, 0x4e, 0x72, 0xe1, 0x31, 0xa0, 0x29,
    0xb8, 0x50, 0x45, 0xb6, 0x81, 0x81, 0x58, 0x5d,
    0x97, 0x81, 0x6a, 0x91, 0x68, 0x71, 0xca, 0x8d,
    0x3c, 0x20, 0x8c, 0x16, 0xd8, 0x7c, 0xfd, 0x47,
];

/// BabyJubJub prime-order subgroup order (big-endian)
/// l = 2736030358979909402780800718157159386076813972158567259200215660948447373041
pub const SUBGROUP_ORDER: [u8; 32] = [
    0x06, 0x0c, 0x89, 0xce, 0x5c, 0x26, 0x34, 0x05,
    0x37, 0x0a, 0x08, 0xb6, 0xd0, 0x30, 0x2b, 0x0b,
    0xab, 0x3e, 0xed, 0xb8, 0x39, 0x20, 0xee, 0x0a,
    0x67, 0x72, 0x97, 0xdc, 0x39, 0x21, 0x26, 0xf1,
];

/// Bit length of the subgroup order; the fixed width of every scalar ladder
pub const SUBGROUP_ORDER_BITS: usize = 251;

/// Domain separators for Poseidon hashes.
///
/// These are cross-system constants shared with the arithmetic circuits and
/// the on-chain program; they are never renumbered.
pub mod domains {
    pub const COMMITMENT: u8 = 0x01;
    pub const SPENDING_NULLIFIER: u8 = 0x02;
    pub const ACTION_NULLIFIER: u8 = 0x03;
    pub const NULLIFIER_KEY: u8 = 0x04;
    pub const STEALTH: u8 = 0x05;
    pub const MERKLE: u8 = 0x06;
    pub const EMPTY_LEAF: u8 = 0x07;
    pub const POSITION: u8 = 0x08;
    pub const LP: u8 = 0x09;

    /// Spending-key derivation from a host-chain wallet signature
    pub const WALLET_DERIVE: u8 = 0x01;
    /// Incoming viewing key
    pub const IVK: u8 = 0x10;
}
