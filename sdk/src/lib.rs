//! CloakCraft client SDK
//!
//! The client-side cryptographic engine for the CloakCraft shielded pool:
//! everything an on-chain verifier consumes is assembled here off-chain.
//!
//! - field arithmetic over the BN254 scalar field with shared reduction of
//!   host identifiers
//! - domain-separated Poseidon hashing
//! - BabyJubJub curve arithmetic, key derivation and stealth addresses
//! - note commitments, nullifiers, and ECIES note encryption
//! - threshold ElGamal voting with DLEQ-proved decryption shares
//! - witness construction for the Groth16 circuit catalogue and proof
//!   formatting for the on-chain pairing verifier
//! - note scanning, smart note selection and consolidation planning
//!
//! The chain, the indexer and the Groth16 prover stay outside; the engine
//! reaches them only through the traits in [`boundary`].

pub mod boundary;
pub mod cancel;
pub mod constants;
pub mod crypto;
pub mod errors;
pub mod field;
pub mod merkle;
pub mod note;
pub mod ops;
pub mod poseidon;
pub mod proof;
pub mod scanner;
pub mod selector;
pub mod tally;
pub mod witness;

pub use cancel::CancelToken;
pub use crypto::babyjubjub::Point;
pub use crypto::keys::{ViewingKey, Wallet};
pub use crypto::stealth::StealthAddress;
pub use errors::{Result, SdkError};
pub use note::{LpNote, Note, NotePlaintext, PositionNote};
pub use ops::{build_shield, ShieldOperation, SpendBundle, SpendPipeline};
pub use proof::prover::{CachePolicy, ProofGenerator, ProvenOperation, ProverConfig};
pub use proof::Groth16Proof;
pub use scanner::{NoteScanner, OwnedNote, ScanKeys, ScanResult};
pub use selector::{
    analyze_fragmentation, plan_consolidation, select_notes, SelectionParams,
    SelectionResult, SelectionStrategy, SpendableNote,
};
