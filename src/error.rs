//! Error types for the proof system

use thiserror::Error;

/// Result type alias for proof system operations
pub type Result<T> = std::result::Result<T, ProofSystemError>;

/// Errors that can occur during setup, proving, and on-chain verification.
///
/// A proof that is well-formed but fails the pairing check is *not* an
/// error: `verify` returns `Ok(false)` so the verify contract stays a pure
/// predicate.
#[derive(Error, Debug)]
pub enum ProofSystemError {
    /// Private inputs do not satisfy the predicate
    #[error("Witness does not satisfy predicate: {reason}")]
    WitnessError { reason: String },

    /// Score outside the valid fixed-point domain
    #[error("Score {score} out of valid range [0, 10000]")]
    ScoreOutOfRange { score: u64 },

    /// Threshold not met by the private score
    #[error("Score {score} does not meet threshold {threshold}")]
    ThresholdNotMet { score: u64, threshold: u64 },

    /// Tier outside {1..5}
    #[error("Invalid tier {tier}, must be 1-5")]
    InvalidTier { tier: u8 },

    /// Invalid input value
    #[error("Invalid input: {field} = {value} (expected {expected})")]
    InvalidInput {
        field: String,
        value: String,
        expected: String,
    },

    /// Proving key / constraint system / parameter set mismatch.
    /// Fatal: must block deployment, never be discovered at proof time.
    #[error("Key setup error: {reason}")]
    KeySetupError { reason: String },

    /// Structurally malformed proof or public signal data
    #[error("Malformed proof data: {reason}")]
    ProofParseError { reason: String },

    /// Proof digest already consumed by the on-chain registry
    #[error("Proof already consumed: {digest}")]
    ReplayError { digest: String },

    /// Registry-context rejection of a proof submission (contract revert)
    #[error("Proof submission rejected: {reason}")]
    VerificationRejected { reason: String },

    /// Proof generation failed inside the proving backend
    #[error("Proof generation failed: {reason}")]
    ProofGenerationFailed { reason: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arkworks error
    #[error("Cryptographic error: {0}")]
    Ark(String),
}

impl ProofSystemError {
    /// True for failures caused by the private witness itself (predicate
    /// false or inputs out of domain). These are fatal for the request:
    /// retrying an unchanged witness cannot succeed.
    pub fn is_witness_error(&self) -> bool {
        matches!(
            self,
            Self::WitnessError { .. }
                | Self::ScoreOutOfRange { .. }
                | Self::ThresholdNotMet { .. }
                | Self::InvalidTier { .. }
                | Self::InvalidInput { .. }
        )
    }
}

impl From<ark_serialize::SerializationError> for ProofSystemError {
    fn from(e: ark_serialize::SerializationError) -> Self {
        Self::Ark(e.to_string())
    }
}

impl From<ark_relations::r1cs::SynthesisError> for ProofSystemError {
    fn from(e: ark_relations::r1cs::SynthesisError) -> Self {
        Self::Ark(e.to_string())
    }
}
