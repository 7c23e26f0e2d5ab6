//! Setup pipeline
//!
//! Two stages, both offline and human-supervised, run to completion before
//! any online key material is published:
//!
//! 1. A multi-party contribution ceremony folds sequential entropy
//!    contributions into a transcript and yields a universal parameter
//!    seed. Contributor entropy is destroyed after mixing.
//! 2. Per-predicate specialization compiles the predicate circuit and
//!    derives (proving key, verification key) from the ceremony seed.
//!
//! `verify_setup` cross-checks the final keys against the constraint
//! system before deployment; a mismatch is a fatal [`KeySetupError`] and
//! must never be discovered at proof time.
//!
//! [`KeySetupError`]: crate::ProofSystemError::KeySetupError

use std::fs;
use std::path::Path;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ark_std::rand::rngs::StdRng;
use ark_std::rand::SeedableRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::circuits::{RangeCircuit, ThresholdCircuit, TierCircuit};
use crate::error::{ProofSystemError, Result};
use crate::types::PredicateType;

/// Circuit revision versioning all key artifacts. Keys rotate only when
/// the constraint definitions change.
pub const CIRCUIT_REVISION: u32 = 1;

const PROVING_KEY_FILE: &str = "proving_key.bin";
const VERIFICATION_KEY_FILE: &str = "verification_key.bin";
const MANIFEST_FILE: &str = "manifest.json";

/// Sequential multi-party randomness ceremony.
///
/// Each contributor mixes local entropy into a running SHA-256 transcript;
/// the finalized transcript seeds key derivation for every predicate.
/// Soundness holds as long as at least one contributor was honest and
/// destroyed their entropy.
pub struct SetupCeremony {
    transcript: Sha256,
    contributions: usize,
}

impl SetupCeremony {
    /// Start a ceremony transcript, domain-separated by purpose and
    /// circuit revision
    pub fn new(domain: &str) -> Self {
        let mut transcript = Sha256::new();
        transcript.update(b"attest-zk-ceremony-v1");
        transcript.update(domain.as_bytes());
        transcript.update(CIRCUIT_REVISION.to_be_bytes());
        Self {
            transcript,
            contributions: 0,
        }
    }

    /// Mix one contributor's entropy into the transcript.
    ///
    /// The buffer is overwritten with zeroes after mixing: contributor
    /// entropy is toxic waste and must not outlive the contribution.
    pub fn contribute(&mut self, entropy: &mut [u8]) {
        self.transcript.update(&*entropy);
        for byte in entropy.iter_mut() {
            *byte = 0;
        }
        self.contributions += 1;
        debug!(contributions = self.contributions, "ceremony contribution mixed");
    }

    /// Number of contributions mixed so far
    pub fn contributions(&self) -> usize {
        self.contributions
    }

    /// Finalize the transcript into the universal parameter seed
    pub fn finalize(self) -> Result<[u8; 32]> {
        if self.contributions == 0 {
            return Err(ProofSystemError::KeySetupError {
                reason: "ceremony finalized without any contributions".into(),
            });
        }
        info!(contributions = self.contributions, "ceremony finalized");
        Ok(self.transcript.finalize().into())
    }
}

/// Manifest stored alongside serialized keys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyManifest {
    pub circuit: String,
    pub revision: u32,
    pub protocol: String,
    pub curve: String,
    pub n_public: usize,
}

/// Per-predicate key pair, versioned by circuit revision.
///
/// The verification key is public; the proving key is sensitive and is
/// distributed only to trusted provers. Both are immutable after
/// generation and safe for concurrent reads.
#[derive(Clone)]
pub struct KeyMaterial {
    pub predicate: PredicateType,
    pub revision: u32,
    pub proving_key: ProvingKey<Bn254>,
    pub verifying_key: VerifyingKey<Bn254>,
}

impl KeyMaterial {
    /// Persist key material under `dir/<circuit_name>/`.
    ///
    /// The proving key file must be distributed only to trusted provers.
    pub fn save_to_dir(&self, dir: impl AsRef<Path>) -> Result<()> {
        let circuit_dir = dir.as_ref().join(self.predicate.circuit_name());
        fs::create_dir_all(&circuit_dir)?;

        let mut pk_bytes = Vec::new();
        self.proving_key.serialize_compressed(&mut pk_bytes)?;
        fs::write(circuit_dir.join(PROVING_KEY_FILE), pk_bytes)?;

        let mut vk_bytes = Vec::new();
        self.verifying_key.serialize_compressed(&mut vk_bytes)?;
        fs::write(circuit_dir.join(VERIFICATION_KEY_FILE), vk_bytes)?;

        let manifest = KeyManifest {
            circuit: self.predicate.circuit_name().to_string(),
            revision: self.revision,
            protocol: "groth16".into(),
            curve: "bn128".into(),
            n_public: self.predicate.public_signal_count(),
        };
        fs::write(
            circuit_dir.join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&manifest)?,
        )?;

        info!(circuit = self.predicate.circuit_name(), "key material saved");
        Ok(())
    }

    /// Load key material for one predicate from `dir/<circuit_name>/`
    pub fn load_from_dir(dir: impl AsRef<Path>, predicate: PredicateType) -> Result<Self> {
        let circuit_dir = dir.as_ref().join(predicate.circuit_name());

        let manifest: KeyManifest =
            serde_json::from_slice(&fs::read(circuit_dir.join(MANIFEST_FILE))?)?;
        if manifest.revision != CIRCUIT_REVISION {
            return Err(ProofSystemError::KeySetupError {
                reason: format!(
                    "key revision {} does not match circuit revision {CIRCUIT_REVISION}",
                    manifest.revision
                ),
            });
        }
        if manifest.circuit != predicate.circuit_name() {
            return Err(ProofSystemError::KeySetupError {
                reason: format!(
                    "manifest circuit {} does not match {}",
                    manifest.circuit,
                    predicate.circuit_name()
                ),
            });
        }

        let pk_bytes = fs::read(circuit_dir.join(PROVING_KEY_FILE))?;
        let proving_key = ProvingKey::deserialize_compressed(pk_bytes.as_slice())?;
        let vk_bytes = fs::read(circuit_dir.join(VERIFICATION_KEY_FILE))?;
        let verifying_key = VerifyingKey::deserialize_compressed(vk_bytes.as_slice())?;

        let material = Self {
            predicate,
            revision: manifest.revision,
            proving_key,
            verifying_key,
        };
        verify_setup(&material)?;
        Ok(material)
    }
}

/// Smoke-test circuit with an in-domain assignment. Setup only reads the
/// constraint structure, which is identical for every assignment.
fn sample_circuit(predicate: PredicateType) -> SampleCircuit {
    let entity_hash = Fr::from(1u64);
    let salt = Fr::from(2u64);
    match predicate {
        PredicateType::Threshold => {
            SampleCircuit::Threshold(ThresholdCircuit::new(8000, entity_hash, 9000, salt))
        }
        PredicateType::Range => {
            SampleCircuit::Range(RangeCircuit::new(7000, 9000, entity_hash, 8000, salt))
        }
        PredicateType::Tier => SampleCircuit::Tier(TierCircuit::new(2, entity_hash, 9000, salt)),
    }
}

enum SampleCircuit {
    Threshold(ThresholdCircuit),
    Range(RangeCircuit),
    Tier(TierCircuit),
}

impl SampleCircuit {
    fn public_inputs(&self) -> Vec<Fr> {
        match self {
            Self::Threshold(c) => c.public_inputs(),
            Self::Range(c) => c.public_inputs(),
            Self::Tier(c) => c.public_inputs(),
        }
    }
}

/// Derive the per-predicate setup RNG from the ceremony seed.
///
/// Domain separation keeps the three specializations independent even
/// though they share one universal parameter seed.
fn specialization_rng(seed: &[u8; 32], predicate: PredicateType) -> StdRng {
    let mut hasher = Sha256::new();
    hasher.update(seed);
    hasher.update(predicate.circuit_name().as_bytes());
    StdRng::from_seed(hasher.finalize().into())
}

/// Stage 2: specialize the universal parameter seed into a per-predicate
/// key pair
pub fn generate_key_material(predicate: PredicateType, seed: &[u8; 32]) -> Result<KeyMaterial> {
    info!(circuit = predicate.circuit_name(), "specializing key material");
    let mut rng = specialization_rng(seed, predicate);

    let (proving_key, verifying_key) = match sample_circuit(predicate) {
        SampleCircuit::Threshold(c) => Groth16::<Bn254>::circuit_specific_setup(c, &mut rng),
        SampleCircuit::Range(c) => Groth16::<Bn254>::circuit_specific_setup(c, &mut rng),
        SampleCircuit::Tier(c) => Groth16::<Bn254>::circuit_specific_setup(c, &mut rng),
    }
    .map_err(|e| ProofSystemError::KeySetupError {
        reason: e.to_string(),
    })?;

    let material = KeyMaterial {
        predicate,
        revision: CIRCUIT_REVISION,
        proving_key,
        verifying_key,
    };
    verify_setup(&material)?;
    Ok(material)
}

/// Cross-check that the proving key matches both the constraint system and
/// the distributed verification key.
///
/// Checks, in order: the verification key embedded in the proving key
/// equals the distributed one; the IC length matches the circuit's public
/// input count; and a smoke witness proves and verifies end to end.
pub fn verify_setup(material: &KeyMaterial) -> Result<()> {
    let mut embedded = Vec::new();
    material.proving_key.vk.serialize_compressed(&mut embedded)?;
    let mut distributed = Vec::new();
    material.verifying_key.serialize_compressed(&mut distributed)?;
    if embedded != distributed {
        return Err(ProofSystemError::KeySetupError {
            reason: format!(
                "proving key embeds a different verification key for {}",
                material.predicate.circuit_name()
            ),
        });
    }

    let expected_ic = material.predicate.public_signal_count() + 1;
    if material.verifying_key.gamma_abc_g1.len() != expected_ic {
        return Err(ProofSystemError::KeySetupError {
            reason: format!(
                "verification key IC length {} does not match constraint system (expected {expected_ic})",
                material.verifying_key.gamma_abc_g1.len()
            ),
        });
    }

    // Smoke proof: catches key/parameter-set mismatches before deployment
    let circuit = sample_circuit(material.predicate);
    let public_inputs = circuit.public_inputs();
    let mut rng = rand::thread_rng();
    let proof = match circuit {
        SampleCircuit::Threshold(c) => Groth16::<Bn254>::prove(&material.proving_key, c, &mut rng),
        SampleCircuit::Range(c) => Groth16::<Bn254>::prove(&material.proving_key, c, &mut rng),
        SampleCircuit::Tier(c) => Groth16::<Bn254>::prove(&material.proving_key, c, &mut rng),
    }
    .map_err(|e| ProofSystemError::KeySetupError {
        reason: format!("smoke proof generation failed: {e}"),
    })?;

    let accepted = Groth16::<Bn254>::verify(&material.verifying_key, &public_inputs, &proof)
        .map_err(|e| ProofSystemError::KeySetupError {
            reason: format!("smoke proof verification errored: {e}"),
        })?;
    if !accepted {
        return Err(ProofSystemError::KeySetupError {
            reason: format!(
                "smoke proof rejected for {}: proving key does not match parameter set",
                material.predicate.circuit_name()
            ),
        });
    }

    debug!(circuit = material.predicate.circuit_name(), "setup verified");
    Ok(())
}

/// Report constraint counts per predicate, useful when sizing the
/// universal parameter set
pub fn constraint_count(predicate: PredicateType) -> Result<usize> {
    let cs = ConstraintSystem::<Fr>::new_ref();
    match sample_circuit(predicate) {
        SampleCircuit::Threshold(c) => c.generate_constraints(cs.clone())?,
        SampleCircuit::Range(c) => c.generate_constraints(cs.clone())?,
        SampleCircuit::Tier(c) => c.generate_constraints(cs.clone())?,
    }
    Ok(cs.num_constraints())
}
