//! End-to-end lifecycle tests: ceremony, key material, proving,
//! verification, registry submission, and wire round-trips.
//!
//! Key generation dominates the runtime here, so one prover/verifier pair
//! is shared across the whole file.

use std::sync::OnceLock;

use attest_zk::commitment::{fr_to_string, generate_salt, hash_entity_id, string_to_fr};
use attest_zk::harness::{run_conformance, valid_vectors};
use attest_zk::proof::ProofArtifact;
use attest_zk::setup::SetupCeremony;
use attest_zk::{
    ComplianceProver, ComplianceVerifier, PredicateType, ProofSystemError, RangeInput,
    ThresholdInput, TierInput, VerificationRegistry,
};

struct Fixture {
    prover: ComplianceProver,
    verifier: ComplianceVerifier,
}

fn fixture() -> &'static Fixture {
    static FIXTURE: OnceLock<Fixture> = OnceLock::new();
    FIXTURE.get_or_init(|| {
        let mut ceremony = SetupCeremony::new("attest-zk-integration-test");
        let mut alpha = *b"first contributor entropy bytes!";
        let mut beta = *b"second contributor entropy bytes";
        ceremony.contribute(&mut alpha);
        ceremony.contribute(&mut beta);
        let seed = ceremony.finalize().expect("ceremony with contributions");

        let prover = ComplianceProver::from_ceremony_seed(&seed).expect("key generation");
        let verifier = ComplianceVerifier::from_key_material(
            prover.key_material(PredicateType::Threshold),
            prover.key_material(PredicateType::Range),
            prover.key_material(PredicateType::Tier),
        )
        .expect("verifier construction");
        Fixture { prover, verifier }
    })
}

fn threshold_input(entity_id: &str, threshold: u64, score: u64) -> ThresholdInput {
    ThresholdInput {
        threshold,
        entity_hash: fr_to_string(&hash_entity_id(entity_id)),
        score,
        salt: generate_salt(),
    }
}

#[test]
fn threshold_proof_verifies_without_revealing_score() {
    let f = fixture();
    let input = threshold_input("entity-acme", 8000, 8734);

    let artifact = f.prover.prove_threshold(&input).unwrap();
    assert!(f.verifier.verify(&artifact).unwrap());

    // Public signals carry only threshold, entity hash, and commitment
    assert_eq!(artifact.public_signals.len(), 3);
    assert_eq!(
        artifact.public_signals[0],
        string_to_fr("8000").unwrap()
    );
    assert_eq!(
        artifact.entity_hash().copied().unwrap(),
        hash_entity_id("entity-acme")
    );
    for signal in &artifact.public_signals {
        assert_ne!(*signal, string_to_fr("8734").unwrap());
    }
}

#[test]
fn range_proof_verifies_at_both_edges() {
    let f = fixture();
    for score in [7000, 9000] {
        let input = RangeInput {
            min_score: 7000,
            max_score: 9000,
            entity_hash: fr_to_string(&hash_entity_id("entity-range")),
            score,
            salt: generate_salt(),
        };
        let artifact = f.prover.prove_range(&input).unwrap();
        assert!(f.verifier.verify(&artifact).unwrap());
        assert_eq!(artifact.public_signals.len(), 4);
    }
}

#[test]
fn tier_proof_verifies_and_wrong_tier_fails_at_proving() {
    let f = fixture();
    let entity_hash = fr_to_string(&hash_entity_id("entity-tier"));

    let input = TierInput {
        target_tier: 2,
        entity_hash: entity_hash.clone(),
        score: 8700,
        salt: generate_salt(),
    };
    let artifact = f.prover.prove_tier(&input).unwrap();
    assert!(f.verifier.verify(&artifact).unwrap());

    // Same score claimed for tier 1 never produces a proof
    let wrong = TierInput {
        target_tier: 1,
        entity_hash,
        score: 8700,
        salt: generate_salt(),
    };
    let err = f.prover.prove_tier(&wrong).unwrap_err();
    assert!(err.is_witness_error());
}

#[test]
fn tampered_public_signal_is_rejected_not_errored() {
    let f = fixture();
    let artifact = f
        .prover
        .prove_threshold(&threshold_input("entity-tamper", 8000, 9100))
        .unwrap();

    let mut forged = artifact.clone();
    // Claim a higher threshold than was proven
    forged.public_signals[0] = string_to_fr("9500").unwrap();

    assert!(!f.verifier.verify(&forged).unwrap());
}

#[test]
fn registry_accepts_once_and_rejects_replay() {
    let f = fixture();
    let entity = hash_entity_id("entity-replay");
    let input = ThresholdInput {
        threshold: 8000,
        entity_hash: fr_to_string(&entity),
        score: 8500,
        salt: generate_salt(),
    };
    let artifact = f.prover.prove_threshold(&input).unwrap();

    let verifier = ComplianceVerifier::from_key_material(
        f.prover.key_material(PredicateType::Threshold),
        f.prover.key_material(PredicateType::Range),
        f.prover.key_material(PredicateType::Tier),
    )
    .unwrap();
    let registry = VerificationRegistry::new(verifier);

    let commitment = registry.verify_threshold(&artifact, 8000, entity).unwrap();
    assert_eq!(registry.latest_commitment(entity), Some(commitment));
    assert!(registry.has_valid_verification(entity, 86_400));

    // Byte-identical resubmission is a replay
    let err = registry.verify_threshold(&artifact, 8000, entity).unwrap_err();
    assert!(matches!(err, ProofSystemError::ReplayError { .. }));

    // A fresh salt yields a distinct proof and a distinct commitment
    let fresh = ThresholdInput {
        salt: generate_salt(),
        ..input
    };
    let second = f.prover.prove_threshold(&fresh).unwrap();
    let new_commitment = registry.verify_threshold(&second, 8000, entity).unwrap();
    assert_ne!(new_commitment, commitment);
    assert_eq!(registry.latest_commitment(entity), Some(new_commitment));
}

#[test]
fn registry_and_offline_verifier_agree() {
    let f = fixture();
    let entity = hash_entity_id("entity-agree");
    let artifact = f
        .prover
        .prove_threshold(&ThresholdInput {
            threshold: 7000,
            entity_hash: fr_to_string(&entity),
            score: 7500,
            salt: generate_salt(),
        })
        .unwrap();

    let offline = f.verifier.verify(&artifact).unwrap();

    let verifier = ComplianceVerifier::from_key_material(
        f.prover.key_material(PredicateType::Threshold),
        f.prover.key_material(PredicateType::Range),
        f.prover.key_material(PredicateType::Tier),
    )
    .unwrap();
    let registry = VerificationRegistry::new(verifier);
    let onchain = registry.verify_threshold(&artifact, 7000, entity);

    assert!(offline);
    assert!(onchain.is_ok());
}

#[test]
fn artifact_survives_json_round_trip() {
    let f = fixture();
    let artifact = f
        .prover
        .prove_threshold(&threshold_input("entity-json", 8000, 8200))
        .unwrap();

    let json = serde_json::to_string(&artifact.to_json()).unwrap();
    let parsed = serde_json::from_str(&json).unwrap();
    let restored = ProofArtifact::from_json(&parsed).unwrap();

    assert_eq!(restored.public_signals, artifact.public_signals);
    assert_eq!(restored.predicate, artifact.predicate);
    assert!(f.verifier.verify(&restored).unwrap());

    // Proof digests match, so the registry treats both as the same proof
    assert_eq!(
        restored.proof.digest().unwrap(),
        artifact.proof.digest().unwrap()
    );
}

#[test]
fn solidity_calldata_has_swapped_g2_limbs() {
    let f = fixture();
    let artifact = f
        .prover
        .prove_threshold(&threshold_input("entity-solidity", 8000, 8200))
        .unwrap();

    let calldata = artifact
        .proof
        .to_solidity_calldata(&artifact.public_signals);
    let json = artifact.proof.to_json();

    // pi_b limbs are emitted c1-first for the EVM pairing precompile
    assert_eq!(calldata.b[0][0], json.pi_b[0][1]);
    assert_eq!(calldata.b[0][1], json.pi_b[0][0]);
    assert_eq!(calldata.inputs.len(), 3);
}

#[test]
fn key_mixup_is_caught_at_construction() {
    let f = fixture();
    let result = ComplianceProver::new(
        f.prover.key_material(PredicateType::Range).clone(),
        f.prover.key_material(PredicateType::Threshold).clone(),
        f.prover.key_material(PredicateType::Tier).clone(),
    );
    assert!(matches!(
        result,
        Err(ProofSystemError::KeySetupError { .. })
    ));
}

#[test]
fn conformance_corpus_passes() {
    let f = fixture();
    let report = run_conformance(&f.prover, &f.verifier);
    for failure in report.failures() {
        eprintln!("{}: {}", failure.name, failure.detail);
    }
    assert!(report.passed);
    assert_eq!(
        report.outcomes.len(),
        valid_vectors().len() + attest_zk::harness::invalid_vectors().len()
    );
}
