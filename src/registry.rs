//! On-chain verification registry
//!
//! Models the ledger contract surface: verify-and-record per predicate, a
//! replay ledger keyed by proof digest, and per-entity commitment and
//! freshness state. The "check unconsumed, then mark consumed" sequence
//! executes under a single lock, so two concurrent submissions of the
//! same proof can never both be accepted.
//!
//! Accepting a submission returns the score commitment; a rejected
//! submission is a contract-style revert (error), unlike the offline
//! verifier's pure boolean.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use ark_bn254::Fr;
use tracing::{info, instrument, warn};

use crate::error::{ProofSystemError, Result};
use crate::proof::ProofArtifact;
use crate::types::PredicateType;
use crate::verifier::ComplianceVerifier;

/// Clock abstraction so freshness queries are testable
pub trait TimeSource: Send + Sync {
    /// Seconds since the Unix epoch
    fn now_secs(&self) -> u64;
}

/// Wall-clock time source
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

#[derive(Default)]
struct RegistryState {
    consumed: HashSet<[u8; 32]>,
    latest_commitments: HashMap<Fr, Fr>,
    last_verification: HashMap<Fr, u64>,
}

/// On-chain verification registry.
///
/// Re-proving the same fact with a fresh salt yields a new digest and a
/// new commitment and is accepted; replay protection is per proof, not
/// per fact.
pub struct VerificationRegistry<T: TimeSource = SystemTimeSource> {
    verifier: ComplianceVerifier,
    state: Mutex<RegistryState>,
    time: T,
}

impl VerificationRegistry<SystemTimeSource> {
    pub fn new(verifier: ComplianceVerifier) -> Self {
        Self::with_time_source(verifier, SystemTimeSource)
    }
}

impl<T: TimeSource> VerificationRegistry<T> {
    pub fn with_time_source(verifier: ComplianceVerifier, time: T) -> Self {
        Self {
            verifier,
            state: Mutex::new(RegistryState::default()),
            time,
        }
    }

    /// Submit a threshold proof; returns the score commitment on accept
    #[instrument(skip(self, artifact))]
    pub fn verify_threshold(
        &self,
        artifact: &ProofArtifact,
        threshold: u64,
        entity_hash: Fr,
    ) -> Result<Fr> {
        self.submit(
            artifact,
            PredicateType::Threshold,
            &[Fr::from(threshold)],
            entity_hash,
        )
    }

    /// Submit a range proof; returns the score commitment on accept
    #[instrument(skip(self, artifact))]
    pub fn verify_range(
        &self,
        artifact: &ProofArtifact,
        min_score: u64,
        max_score: u64,
        entity_hash: Fr,
    ) -> Result<Fr> {
        self.submit(
            artifact,
            PredicateType::Range,
            &[Fr::from(min_score), Fr::from(max_score)],
            entity_hash,
        )
    }

    /// Submit a tier membership proof; returns the score commitment on
    /// accept
    #[instrument(skip(self, artifact))]
    pub fn verify_tier(&self, artifact: &ProofArtifact, tier: u8, entity_hash: Fr) -> Result<Fr> {
        self.submit(
            artifact,
            PredicateType::Tier,
            &[Fr::from(u64::from(tier))],
            entity_hash,
        )
    }

    /// Latest accepted commitment for an entity
    pub fn latest_commitment(&self, entity_hash: Fr) -> Option<Fr> {
        self.lock().latest_commitments.get(&entity_hash).copied()
    }

    /// Timestamp of the entity's most recent accepted verification
    pub fn last_verification_time(&self, entity_hash: Fr) -> Option<u64> {
        self.lock().last_verification.get(&entity_hash).copied()
    }

    /// Whether the entity has an accepted verification no older than
    /// `max_age_secs`
    pub fn has_valid_verification(&self, entity_hash: Fr, max_age_secs: u64) -> bool {
        let Some(verified_at) = self.last_verification_time(entity_hash) else {
            return false;
        };
        self.time.now_secs().saturating_sub(verified_at) <= max_age_secs
    }

    fn submit(
        &self,
        artifact: &ProofArtifact,
        predicate: PredicateType,
        parameters: &[Fr],
        entity_hash: Fr,
    ) -> Result<Fr> {
        if artifact.predicate != predicate {
            return Err(ProofSystemError::ProofParseError {
                reason: format!(
                    "expected a {} proof, got {}",
                    predicate.circuit_name(),
                    artifact.predicate.circuit_name()
                ),
            });
        }
        if artifact.public_signals.len() != predicate.public_signal_count() {
            return Err(ProofSystemError::ProofParseError {
                reason: format!(
                    "{} expects {} public signals, got {}",
                    predicate.circuit_name(),
                    predicate.public_signal_count(),
                    artifact.public_signals.len()
                ),
            });
        }

        // The claimed parameters and entity must be the ones the proof
        // was produced for
        let params_in_proof = &artifact.public_signals[..parameters.len()];
        if params_in_proof != parameters {
            return Err(ProofSystemError::VerificationRejected {
                reason: "claimed parameters do not match proof public signals".into(),
            });
        }
        if artifact.entity_hash() != Some(&entity_hash) {
            return Err(ProofSystemError::VerificationRejected {
                reason: "claimed entity hash does not match proof public signals".into(),
            });
        }

        // Same pairing check as the offline context
        let accepted = self.verifier.verify(artifact)?;
        if !accepted {
            warn!(
                circuit = predicate.circuit_name(),
                "proof rejected by verification equation"
            );
            return Err(ProofSystemError::VerificationRejected {
                reason: format!("{} proof failed verification", predicate.circuit_name()),
            });
        }

        let commitment = *artifact
            .commitment()
            .ok_or_else(|| ProofSystemError::ProofParseError {
                reason: "artifact carries no commitment signal".into(),
            })?;
        let digest = artifact.proof.digest()?;
        let now = self.time.now_secs();

        // Single atomic unit: replay check and state recording
        let mut state = self.lock();
        if !state.consumed.insert(digest) {
            return Err(ProofSystemError::ReplayError {
                digest: hex::encode(digest),
            });
        }
        state.latest_commitments.insert(entity_hash, commitment);
        state.last_verification.insert(entity_hash, now);
        drop(state);

        info!(
            circuit = predicate.circuit_name(),
            "proof accepted and recorded"
        );
        Ok(commitment)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        // A poisoned lock means a panic mid-update; the registry state is
        // append-only per submission, so the data is still consistent
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
