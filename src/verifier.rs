//! Offline proof verification
//!
//! Verification is cheap and stateless. The on-chain execution context
//! (see [`crate::registry`]) routes through the same pairing check, so
//! both contexts return identical accept/reject decisions for identical
//! inputs.

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, VerifyingKey};
use ark_snark::SNARK;
use tracing::{debug, instrument};

use crate::error::{ProofSystemError, Result};
use crate::proof::{Proof, ProofArtifact};
use crate::setup::KeyMaterial;
use crate::types::PredicateType;

/// Verifier holding prepared verification keys per predicate.
///
/// A well-formed proof that fails the pairing equation yields `Ok(false)`;
/// only structurally malformed inputs produce errors.
pub struct ComplianceVerifier {
    threshold_vk: PreparedVerifyingKey<Bn254>,
    range_vk: PreparedVerifyingKey<Bn254>,
    tier_vk: PreparedVerifyingKey<Bn254>,
}

impl ComplianceVerifier {
    /// Build from the public verification keys
    pub fn new(
        threshold_vk: &VerifyingKey<Bn254>,
        range_vk: &VerifyingKey<Bn254>,
        tier_vk: &VerifyingKey<Bn254>,
    ) -> Result<Self> {
        Ok(Self {
            threshold_vk: Groth16::<Bn254>::process_vk(threshold_vk)
                .map_err(|e| ProofSystemError::Ark(e.to_string()))?,
            range_vk: Groth16::<Bn254>::process_vk(range_vk)
                .map_err(|e| ProofSystemError::Ark(e.to_string()))?,
            tier_vk: Groth16::<Bn254>::process_vk(tier_vk)
                .map_err(|e| ProofSystemError::Ark(e.to_string()))?,
        })
    }

    /// Build from the key material produced by the setup pipeline
    pub fn from_key_material(
        threshold: &KeyMaterial,
        range: &KeyMaterial,
        tier: &KeyMaterial,
    ) -> Result<Self> {
        Self::new(
            &threshold.verifying_key,
            &range.verifying_key,
            &tier.verifying_key,
        )
    }

    fn prepared_vk(&self, predicate: PredicateType) -> &PreparedVerifyingKey<Bn254> {
        match predicate {
            PredicateType::Threshold => &self.threshold_vk,
            PredicateType::Range => &self.range_vk,
            PredicateType::Tier => &self.tier_vk,
        }
    }

    /// Verify a proof artifact against its embedded public signals
    #[instrument(skip(self, artifact), fields(circuit = artifact.predicate.circuit_name()))]
    pub fn verify(&self, artifact: &ProofArtifact) -> Result<bool> {
        self.verify_signals(artifact.predicate, &artifact.proof, &artifact.public_signals)
    }

    /// Verify a proof against an explicit ordered signal vector.
    ///
    /// Signal order is part of the contract: parameters..., entityHash,
    /// commitment.
    pub fn verify_signals(
        &self,
        predicate: PredicateType,
        proof: &Proof,
        public_signals: &[Fr],
    ) -> Result<bool> {
        if public_signals.len() != predicate.public_signal_count() {
            return Err(ProofSystemError::ProofParseError {
                reason: format!(
                    "{} expects {} public signals, got {}",
                    predicate.circuit_name(),
                    predicate.public_signal_count(),
                    public_signals.len()
                ),
            });
        }

        let accepted = Groth16::<Bn254>::verify_with_processed_vk(
            self.prepared_vk(predicate),
            public_signals,
            &proof.inner,
        )
        .map_err(|e| ProofSystemError::Ark(e.to_string()))?;

        debug!(
            circuit = predicate.circuit_name(),
            accepted, "proof verified"
        );
        Ok(accepted)
    }
}
