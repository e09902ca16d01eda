//! Witness construction for the circuit catalogue
//!
//! Every privacy-preserving operation is expressed as a named circuit. Each
//! builder translates a typed request into the prover's input mapping plus
//! the ordered public-input byte array the on-chain verifier consumes; the
//! two must agree field-for-field with the circuit.
//!
//! Builder rules enforced throughout:
//! - randomness sampled for an output commitment is returned to the caller
//!   and used verbatim in the AEAD plaintext
//! - if the input note carries an ephemeral pubkey, the circuit's private
//!   scalar is the derived stealth spending key, never the base key
//! - balances are checked over u64 before any witness is produced
//! - Merkle paths are zero-padded to the fixed 32 depth with index 0
//! - host identifiers (pool ids, mints) are reduced to field elements

pub mod market;
pub mod perps;
pub mod swap;
pub mod transfer;
pub mod vote;

use std::collections::BTreeMap;

use num_bigint::BigUint;

use crate::boundary::MerkleProofResult;
use crate::constants::MERKLE_TREE_DEPTH;
use crate::crypto::babyjubjub::Point;
use crate::crypto::keys::Wallet;
use crate::crypto::stealth;
use crate::errors::{Result, SdkError};
use crate::field::u64_to_field;
use crate::note::{LpNote, Note, PositionNote};

/// One circuit input: a scalar or a fixed-length scalar vector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldInput {
    Scalar([u8; 32]),
    Vector(Vec<[u8; 32]>),
}

/// The canonical input mapping handed to the prover backend.
pub type WitnessMap = BTreeMap<String, FieldInput>;

/// Render the mapping as the decimal-string JSON object snarkjs-style
/// witness generators consume.
pub fn witness_to_json(map: &WitnessMap) -> serde_json::Value {
    let mut object = serde_json::Map::new();
    for (key, value) in map {
        let rendered = match value {
            FieldInput::Scalar(bytes) => {
                serde_json::Value::String(BigUint::from_bytes_be(bytes).to_string())
            }
            FieldInput::Vector(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|bytes| {
                        serde_json::Value::String(BigUint::from_bytes_be(bytes).to_string())
                    })
                    .collect(),
            ),
        };
        object.insert(key.clone(), rendered);
    }
    serde_json::Value::Object(object)
}

/// The circuit catalogue. Names are namespace-delimited with `/`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Circuit {
    Transfer1x2,
    Consolidate3x1,
    Swap,
    SwapAddLiquidity,
    SwapRemoveLiquidity,
    OrderCreate,
    OrderFill,
    OrderCancel,
    PerpsOpenPosition,
    PerpsClosePosition,
    PerpsAddLiquidity,
    PerpsRemoveLiquidity,
    GovernanceVote,
}

impl Circuit {
    pub fn name(&self) -> &'static str {
        match self {
            Circuit::Transfer1x2 => "transfer/1x2",
            Circuit::Consolidate3x1 => "consolidate/3x1",
            Circuit::Swap => "swap/swap",
            Circuit::SwapAddLiquidity => "swap/add_liquidity",
            Circuit::SwapRemoveLiquidity => "swap/remove_liquidity",
            Circuit::OrderCreate => "market/order_create",
            Circuit::OrderFill => "market/order_fill",
            Circuit::OrderCancel => "market/order_cancel",
            Circuit::PerpsOpenPosition => "perps/open_position",
            Circuit::PerpsClosePosition => "perps/close_position",
            Circuit::PerpsAddLiquidity => "perps/add_liquidity",
            Circuit::PerpsRemoveLiquidity => "perps/remove_liquidity",
            Circuit::GovernanceVote => "governance/vote",
        }
    }

    /// Resolve a circuit by name; unknown names fail with `CircuitUnknown`.
    pub fn parse(name: &str) -> Result<Self> {
        Self::all()
            .iter()
            .find(|circuit| circuit.name() == name)
            .copied()
            .ok_or_else(|| SdkError::CircuitUnknown(name.to_string()))
    }

    pub fn all() -> &'static [Circuit] {
        &[
            Circuit::Transfer1x2,
            Circuit::Consolidate3x1,
            Circuit::Swap,
            Circuit::SwapAddLiquidity,
            Circuit::SwapRemoveLiquidity,
            Circuit::OrderCreate,
            Circuit::OrderFill,
            Circuit::OrderCancel,
            Circuit::PerpsOpenPosition,
            Circuit::PerpsClosePosition,
            Circuit::PerpsAddLiquidity,
            Circuit::PerpsRemoveLiquidity,
            Circuit::GovernanceVote,
        ]
    }
}

/// A fully-built witness ready for the prover.
pub trait CircuitWitness {
    fn circuit(&self) -> Circuit;
    fn input_map(&self) -> WitnessMap;
    /// Ordered public inputs, byte-identical to what the verifier rebuilds.
    fn public_inputs(&self) -> Vec<[u8; 32]>;
}

/// A spendable standard note opened for the circuit: plaintext, on-chain
/// commitment, Merkle proof, and (for stealth outputs) the ephemeral key
/// needed to derive the effective spending scalar.
#[derive(Clone, Debug)]
pub struct StandardInput {
    pub note: Note,
    pub commitment: [u8; 32],
    pub merkle: MerkleProofResult,
    pub stealth_ephemeral: Option<Point>,
}

/// An LP note opened for spending.
#[derive(Clone, Debug)]
pub struct LpInput {
    pub note: LpNote,
    pub commitment: [u8; 32],
    pub merkle: MerkleProofResult,
    pub stealth_ephemeral: Option<Point>,
}

/// A position note opened for closing.
#[derive(Clone, Debug)]
pub struct PositionInput {
    pub note: PositionNote,
    pub commitment: [u8; 32],
    pub merkle: MerkleProofResult,
    pub stealth_ephemeral: Option<Point>,
}

/// The circuit's private scalar: the stealth spending key when the note was
/// delivered to a stealth address, the base key otherwise.
pub fn effective_spending_key(
    wallet: &Wallet,
    stealth_ephemeral: Option<&Point>,
) -> Result<[u8; 32]> {
    let sk = wallet.spending_key()?;
    match stealth_ephemeral {
        Some(ephemeral) => stealth::derive_stealth_secret(sk, ephemeral),
        None => Ok(*sk),
    }
}

/// Zero-pad a Merkle path to the fixed depth; padding entries use index 0.
pub fn pad_merkle_path(merkle: &MerkleProofResult) -> (Vec<[u8; 32]>, Vec<[u8; 32]>) {
    let mut path = Vec::with_capacity(MERKLE_TREE_DEPTH);
    let mut indices = Vec::with_capacity(MERKLE_TREE_DEPTH);

    for level in 0..MERKLE_TREE_DEPTH {
        path.push(merkle.path.get(level).copied().unwrap_or([0u8; 32]));
        let bit = merkle.path_indices.get(level).copied().unwrap_or(0);
        indices.push(u64_to_field((bit & 1) as u64));
    }

    (path, indices)
}

/// Mask an external keccak state hash into the field: the first byte is
/// cleared to 5 bits, matching the on-chain program.
pub fn mask_state_hash(hash: &[u8; 32]) -> [u8; 32] {
    let mut masked = *hash;
    masked[0] &= 0x1f;
    masked
}

pub(crate) fn insert_scalar(map: &mut WitnessMap, key: &str, value: [u8; 32]) {
    map.insert(key.to_string(), FieldInput::Scalar(value));
}

pub(crate) fn insert_u64(map: &mut WitnessMap, key: &str, value: u64) {
    insert_scalar(map, key, u64_to_field(value));
}

pub(crate) fn insert_vector(map: &mut WitnessMap, key: &str, value: Vec<[u8; 32]>) {
    map.insert(key.to_string(), FieldInput::Vector(value));
}

/// Write one opened standard note under a key prefix: note fields, the
/// effective spending scalar, and the padded Merkle path.
pub(crate) fn insert_standard_input(
    map: &mut WitnessMap,
    prefix: &str,
    input: &StandardInput,
    spending_key: [u8; 32],
) {
    insert_scalar(map, &format!("{prefix}stealth_pub_x"), input.note.stealth_pub_x);
    insert_u64(map, &format!("{prefix}amount"), input.note.amount);
    insert_scalar(map, &format!("{prefix}randomness"), input.note.randomness);
    insert_scalar(map, &format!("{prefix}spending_key"), spending_key);
    insert_u64(map, &format!("{prefix}leaf_index"), input.merkle.leaf_index);

    let (path, indices) = pad_merkle_path(&input.merkle);
    insert_vector(map, &format!("{prefix}merkle_path"), path);
    insert_vector(map, &format!("{prefix}merkle_path_indices"), indices);
}
