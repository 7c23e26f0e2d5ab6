//! # Attest ZK Proof System
//!
//! Groth16 proof generation and verification for privacy-preserving
//! compliance attestations. An entity proves facts about its compliance
//! score (threshold met, in range, tier membership) without revealing the
//! score itself.
//!
//! ## Predicates
//!
//! - **Threshold**: score >= threshold
//! - **Range**: min <= score <= max
//! - **Tier**: score falls in one of five fixed compliance tiers
//!
//! Every proof binds the private score to a Poseidon commitment over
//! (score, salt, entity hash), exposed as the last public signal.
//!
//! ## Example
//!
//! ```rust,ignore
//! use attest_zk::{ComplianceProver, ComplianceVerifier, ThresholdInput};
//!
//! let prover = ComplianceProver::from_key_dir("./keys")?;
//! let verifier = ComplianceVerifier::from_key_material(
//!     prover.key_material(attest_zk::PredicateType::Threshold),
//!     prover.key_material(attest_zk::PredicateType::Range),
//!     prover.key_material(attest_zk::PredicateType::Tier),
//! )?;
//!
//! let input = ThresholdInput {
//!     threshold: 8000,
//!     entity_hash: attest_zk::commitment::hash_entity_id("entity-42").to_string(),
//!     score: 8500,
//!     salt: attest_zk::commitment::generate_salt(),
//! };
//!
//! let artifact = prover.prove_threshold(&input)?;
//! assert!(verifier.verify(&artifact)?);
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod circuits;
pub mod commitment;
pub mod error;
pub mod harness;
pub mod proof;
pub mod prover;
pub mod registry;
pub mod setup;
pub mod types;
pub mod verifier;

// Re-exports
pub use error::{ProofSystemError, Result};
pub use proof::{Proof, ProofArtifact, SolidityCalldata};
pub use prover::ComplianceProver;
pub use registry::{SystemTimeSource, TimeSource, VerificationRegistry};
pub use setup::{KeyMaterial, SetupCeremony, CIRCUIT_REVISION};
pub use types::{PredicateType, RangeInput, ThresholdInput, TierInput, MAX_SCORE};
pub use verifier::ComplianceVerifier;
