//! CloakCraft SDK error codes

use thiserror::Error;

/// Errors surfaced by the client-side cryptographic engine.
///
/// The scanner never raises `DecryptFailure` while walking the commitment
/// stream; ciphertexts that are not ours are expected and skipped. Direct
/// decryption raises.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    /// Point fails the on-curve or prime-order subgroup check.
    #[error("point is not on the curve or not in the prime-order subgroup")]
    InvalidPoint,

    /// Scalar not below the subgroup order where required, or zero where forbidden.
    #[error("scalar out of range")]
    InvalidScalar,

    /// Strict conversion of a value that is not a canonical field element.
    #[error("value is not a canonical field element")]
    NotCanonical,

    /// Loaded spending key is zero or not below the subgroup order.
    #[error("invalid spending key")]
    InvalidSpendingKey,

    /// Input amount does not equal outputs + unshield + fee over u64.
    #[error("input and output amounts do not balance")]
    Unbalanced,

    /// No note subset covers the target under the given constraints.
    #[error("insufficient funds for target amount")]
    InsufficientFunds,

    /// A covering subset exists only above the input limit.
    #[error("covering subset exceeds input limit, consolidate first")]
    NeedsConsolidation,

    /// AEAD tag invalid, ciphertext malformed, or commitment mismatch after decrypt.
    #[error("note decryption failed")]
    DecryptFailure,

    /// Circuit name is not in the catalogue.
    #[error("unknown circuit: {0}")]
    CircuitUnknown(String),

    /// Consolidation input count outside the supported 2..=3 range.
    #[error("invalid input count for consolidation: {0}")]
    InvalidInputCount(usize),

    /// A note of the wrong kind was fed to an operation (e.g. a position
    /// note into a token transfer).
    #[error("note kind not valid for this operation")]
    InvalidNoteKind,

    /// The external prover backend errored.
    #[error("prover backend failed: {0}")]
    ProverFailure(String),

    /// DLEQ verification failed for one committee member's share.
    #[error("invalid decryption share from member {0}")]
    BadShare(u64),

    /// Cancellation signal fired mid-operation.
    #[error("operation cancelled")]
    Cancelled,

    /// A boundary collaborator (indexer, oracle, merkle provider) failed.
    #[error("boundary call failed: {0}")]
    Boundary(String),
}

pub type Result<T> = std::result::Result<T, SdkError>;
