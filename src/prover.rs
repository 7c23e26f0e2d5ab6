//! ZK-SNARK proof generation
//!
//! Proving is CPU-bound and request-independent: concurrent invocations
//! share only the immutable proving keys, which are never mutated after
//! load. There is no mid-proof cancellation; a caller-side timeout simply
//! discards the result.

use std::path::Path;
use std::time::Instant;

use ark_bn254::{Bn254, Fr};
use ark_groth16::Groth16;
use ark_snark::SNARK;
use rand::thread_rng;
use tracing::{debug, info, instrument};

use crate::circuits::{RangeCircuit, ThresholdCircuit, TierCircuit};
use crate::commitment::string_to_fr;
use crate::error::{ProofSystemError, Result};
use crate::proof::{Proof, ProofArtifact};
use crate::setup::{self, KeyMaterial, SetupCeremony};
use crate::types::{PredicateType, RangeInput, ThresholdInput, TierInput};

/// Prover for compliance predicate proofs.
///
/// Holds one immutable key pair per predicate. `Send + Sync`: safe to
/// share across threads, proofs in flight share only read-only keys.
pub struct ComplianceProver {
    threshold_keys: KeyMaterial,
    range_keys: KeyMaterial,
    tier_keys: KeyMaterial,
}

impl ComplianceProver {
    /// Create a prover from pre-generated key material.
    ///
    /// Each key pair must match its predicate; mixed-up material is a
    /// deployment error caught here rather than at proof time.
    pub fn new(
        threshold_keys: KeyMaterial,
        range_keys: KeyMaterial,
        tier_keys: KeyMaterial,
    ) -> Result<Self> {
        for (material, expected) in [
            (&threshold_keys, PredicateType::Threshold),
            (&range_keys, PredicateType::Range),
            (&tier_keys, PredicateType::Tier),
        ] {
            if material.predicate != expected {
                return Err(ProofSystemError::KeySetupError {
                    reason: format!(
                        "key material for {} supplied where {} was expected",
                        material.predicate.circuit_name(),
                        expected.circuit_name()
                    ),
                });
            }
        }
        Ok(Self {
            threshold_keys,
            range_keys,
            tier_keys,
        })
    }

    /// Load all key material from a setup artifact directory
    pub fn from_key_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Self::new(
            KeyMaterial::load_from_dir(dir, PredicateType::Threshold)?,
            KeyMaterial::load_from_dir(dir, PredicateType::Range)?,
            KeyMaterial::load_from_dir(dir, PredicateType::Tier)?,
        )
    }

    /// Derive all key material directly from a finalized ceremony seed.
    ///
    /// Intended for tests and benchmarks; production provers load
    /// versioned artifacts produced by the offline setup pipeline.
    pub fn from_ceremony_seed(seed: &[u8; 32]) -> Result<Self> {
        Self::new(
            setup::generate_key_material(PredicateType::Threshold, seed)?,
            setup::generate_key_material(PredicateType::Range, seed)?,
            setup::generate_key_material(PredicateType::Tier, seed)?,
        )
    }

    /// Single-contributor ceremony convenience for tests
    pub fn from_entropy(entropy: &[u8]) -> Result<Self> {
        let mut ceremony = SetupCeremony::new("prover");
        let mut buf = entropy.to_vec();
        ceremony.contribute(&mut buf);
        Self::from_ceremony_seed(&ceremony.finalize()?)
    }

    /// Key material for one predicate (verification keys are public)
    pub fn key_material(&self, predicate: PredicateType) -> &KeyMaterial {
        match predicate {
            PredicateType::Threshold => &self.threshold_keys,
            PredicateType::Range => &self.range_keys,
            PredicateType::Tier => &self.tier_keys,
        }
    }

    /// Generate a threshold compliance proof.
    ///
    /// Proves `score >= threshold` without revealing the score. Fails with
    /// a witness error when the predicate is false or inputs are out of
    /// domain; never emits an invalid proof.
    #[instrument(skip(self, input), fields(threshold = input.threshold))]
    pub fn prove_threshold(&self, input: &ThresholdInput) -> Result<ProofArtifact> {
        input.validate()?;
        let entity_hash = string_to_fr(&input.entity_hash)?;
        let salt = string_to_fr(&input.salt)?;

        let circuit = ThresholdCircuit::new(input.threshold, entity_hash, input.score, salt);
        let public_signals = circuit.public_inputs();
        self.prove(PredicateType::Threshold, circuit, public_signals)
    }

    /// Generate a range compliance proof.
    ///
    /// Proves `min_score <= score <= max_score` without revealing the
    /// score.
    #[instrument(skip(self, input), fields(min = input.min_score, max = input.max_score))]
    pub fn prove_range(&self, input: &RangeInput) -> Result<ProofArtifact> {
        input.validate()?;
        let entity_hash = string_to_fr(&input.entity_hash)?;
        let salt = string_to_fr(&input.salt)?;

        let circuit = RangeCircuit::new(
            input.min_score,
            input.max_score,
            entity_hash,
            input.score,
            salt,
        );
        let public_signals = circuit.public_inputs();
        self.prove(PredicateType::Range, circuit, public_signals)
    }

    /// Generate a tier membership proof
    #[instrument(skip(self, input), fields(tier = input.target_tier))]
    pub fn prove_tier(&self, input: &TierInput) -> Result<ProofArtifact> {
        input.validate()?;
        let entity_hash = string_to_fr(&input.entity_hash)?;
        let salt = string_to_fr(&input.salt)?;

        let circuit = TierCircuit::new(input.target_tier, entity_hash, input.score, salt);
        let public_signals = circuit.public_inputs();
        self.prove(PredicateType::Tier, circuit, public_signals)
    }

    /// Prove a synthesized circuit with the matching key material.
    ///
    /// `Groth16::prove` draws fresh blinding randomness per proof; it is
    /// independent of the witness and never exposed.
    fn prove<C>(
        &self,
        predicate: PredicateType,
        circuit: C,
        public_signals: Vec<Fr>,
    ) -> Result<ProofArtifact>
    where
        C: ark_relations::r1cs::ConstraintSynthesizer<Fr>,
    {
        let keys = self.key_material(predicate);
        let start = Instant::now();
        let mut rng = thread_rng();

        let proof = Groth16::<Bn254>::prove(&keys.proving_key, circuit, &mut rng).map_err(|e| {
            ProofSystemError::ProofGenerationFailed {
                reason: e.to_string(),
            }
        })?;

        let proving_time_ms = start.elapsed().as_millis() as u64;
        info!(
            circuit = predicate.circuit_name(),
            proving_time_ms, "proof generated"
        );
        debug!(signals = public_signals.len(), "public signals attached");

        Ok(ProofArtifact::new(
            Proof::new(proof),
            public_signals,
            predicate,
            proving_time_ms,
        ))
    }
}
