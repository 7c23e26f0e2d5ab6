//! Benchmark and conformance harness
//!
//! Certifies soundness and latency. The conformance corpus pins every
//! inclusive boundary of every predicate: each valid vector must prove and
//! verify true, and each invalid vector must fail at proving time, never
//! reach verification. The benchmark mode measures prove/verify latency
//! distributions over randomized in-domain trials and gates them against
//! the CI latency targets.

use std::time::Instant;

use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::commitment::generate_salt;
use crate::error::Result;
use crate::prover::ComplianceProver;
use crate::types::{tier_bounds, PredicateType, RangeInput, ThresholdInput, TierInput};
use crate::verifier::ComplianceVerifier;

/// Proving latency targets on reference hardware, milliseconds. A breach
/// is a performance regression surfaced by the gate, not a correctness
/// failure.
pub const TARGET_P95_MS: u64 = 5_000;
pub const TARGET_P99_MS: u64 = 10_000;

const VECTOR_ENTITY_HASH: &str = "123456789012345678";
const VECTOR_SALT: &str = "987654321098765432";

/// One predicate instantiation in the conformance corpus
#[derive(Debug, Clone)]
pub enum VectorInput {
    Threshold(ThresholdInput),
    Range(RangeInput),
    Tier(TierInput),
}

impl VectorInput {
    pub fn predicate(&self) -> PredicateType {
        match self {
            Self::Threshold(_) => PredicateType::Threshold,
            Self::Range(_) => PredicateType::Range,
            Self::Tier(_) => PredicateType::Tier,
        }
    }
}

/// A curated conformance vector
#[derive(Debug, Clone)]
pub struct TestVector {
    pub name: &'static str,
    pub input: VectorInput,
    /// True: must prove and verify. False: must fail at proving time.
    pub expect_valid: bool,
}

fn threshold(name: &'static str, threshold: u64, score: u64, expect_valid: bool) -> TestVector {
    TestVector {
        name,
        input: VectorInput::Threshold(ThresholdInput {
            threshold,
            entity_hash: VECTOR_ENTITY_HASH.into(),
            score,
            salt: VECTOR_SALT.into(),
        }),
        expect_valid,
    }
}

fn range(name: &'static str, min: u64, max: u64, score: u64, expect_valid: bool) -> TestVector {
    TestVector {
        name,
        input: VectorInput::Range(RangeInput {
            min_score: min,
            max_score: max,
            entity_hash: VECTOR_ENTITY_HASH.into(),
            score,
            salt: VECTOR_SALT.into(),
        }),
        expect_valid,
    }
}

fn tier(name: &'static str, target_tier: u8, score: u64, expect_valid: bool) -> TestVector {
    TestVector {
        name,
        input: VectorInput::Tier(TierInput {
            target_tier,
            entity_hash: VECTOR_ENTITY_HASH.into(),
            score,
            salt: VECTOR_SALT.into(),
        }),
        expect_valid,
    }
}

/// Vectors where the predicate holds, covering every inclusive boundary
pub fn valid_vectors() -> Vec<TestVector> {
    vec![
        threshold("threshold_exact", 8000, 8000, true),
        threshold("threshold_above", 8000, 8500, true),
        threshold("threshold_zero", 0, 0, true),
        threshold("threshold_full_score", 10000, 10000, true),
        range("range_exact_min", 7000, 9000, 7000, true),
        range("range_exact_max", 7000, 9000, 9000, true),
        range("range_score_zero", 0, 10000, 0, true),
        range("range_score_full", 0, 10000, 10000, true),
        range("range_single_point", 8000, 8000, 8000, true),
        tier("tier1_lower_edge", 1, 9500, true),
        tier("tier1_upper_edge", 1, 10000, true),
        tier("tier2_lower_edge", 2, 8500, true),
        tier("tier2_upper_edge", 2, 9499, true),
        tier("tier3_lower_edge", 3, 7000, true),
        tier("tier3_upper_edge", 3, 8499, true),
        tier("tier4_lower_edge", 4, 5000, true),
        tier("tier4_upper_edge", 4, 6999, true),
        tier("tier5_lower_edge", 5, 0, true),
        tier("tier5_upper_edge", 5, 4999, true),
    ]
}

/// Vectors that must fail at proving time: predicate false by one unit at
/// every boundary, plus domain violations
pub fn invalid_vectors() -> Vec<TestVector> {
    vec![
        threshold("threshold_one_below", 8000, 7999, false),
        threshold("threshold_score_10001", 8000, 10001, false),
        threshold("threshold_score_16384", 8000, 16384, false),
        threshold("threshold_param_10001", 10001, 10000, false),
        range("range_one_below_min", 7000, 9000, 6999, false),
        range("range_one_above_max", 7000, 9000, 9001, false),
        range("range_inverted", 9000, 7000, 8000, false),
        range("range_max_10001", 7000, 10001, 8000, false),
        range("range_score_10001", 0, 10000, 10001, false),
        range("range_score_16384", 0, 10000, 16384, false),
        tier("tier1_one_below", 1, 9499, false),
        tier("tier2_one_above", 2, 9500, false),
        tier("tier2_one_below", 2, 8499, false),
        tier("tier3_one_above", 3, 8500, false),
        tier("tier5_one_above", 5, 5000, false),
        tier("tier_zero", 0, 5000, false),
        tier("tier_six", 6, 5000, false),
        tier("tier_score_10001", 1, 10001, false),
        tier("tier_score_16384", 1, 16384, false),
    ]
}

/// Outcome of one conformance vector
#[derive(Debug, Clone, Serialize)]
pub struct VectorOutcome {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

/// Result of a full conformance run
#[derive(Debug, Clone, Serialize)]
pub struct ConformanceReport {
    pub outcomes: Vec<VectorOutcome>,
    pub passed: bool,
}

impl ConformanceReport {
    pub fn failures(&self) -> impl Iterator<Item = &VectorOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }
}

fn prove_vector(
    prover: &ComplianceProver,
    input: &VectorInput,
) -> Result<crate::proof::ProofArtifact> {
    match input {
        VectorInput::Threshold(i) => prover.prove_threshold(i),
        VectorInput::Range(i) => prover.prove_range(i),
        VectorInput::Tier(i) => prover.prove_tier(i),
    }
}

/// Run the full conformance corpus.
///
/// Contract: every valid vector proves and verifies true; every invalid
/// vector fails at proving time with a witness-class error and never
/// produces an accepting proof.
pub fn run_conformance(
    prover: &ComplianceProver,
    verifier: &ComplianceVerifier,
) -> ConformanceReport {
    let mut outcomes = Vec::new();

    for vector in valid_vectors() {
        let outcome = match prove_vector(prover, &vector.input) {
            Ok(artifact) => match verifier.verify(&artifact) {
                Ok(true) => VectorOutcome {
                    name: vector.name,
                    passed: true,
                    detail: format!("proved in {} ms, verified", artifact.proving_time_ms),
                },
                Ok(false) => VectorOutcome {
                    name: vector.name,
                    passed: false,
                    detail: "proof generated but rejected by verifier".into(),
                },
                Err(e) => VectorOutcome {
                    name: vector.name,
                    passed: false,
                    detail: format!("verification errored: {e}"),
                },
            },
            Err(e) => VectorOutcome {
                name: vector.name,
                passed: false,
                detail: format!("proving failed on valid vector: {e}"),
            },
        };
        outcomes.push(outcome);
    }

    for vector in invalid_vectors() {
        let outcome = match prove_vector(prover, &vector.input) {
            Err(e) if e.is_witness_error() => VectorOutcome {
                name: vector.name,
                passed: true,
                detail: format!("rejected at proving time: {e}"),
            },
            Err(e) => VectorOutcome {
                name: vector.name,
                passed: false,
                detail: format!("rejected with non-witness error: {e}"),
            },
            Ok(_) => VectorOutcome {
                name: vector.name,
                passed: false,
                detail: "invalid vector produced a proof".into(),
            },
        };
        outcomes.push(outcome);
    }

    let passed = outcomes.iter().all(|o| o.passed);
    if passed {
        info!(vectors = outcomes.len(), "conformance corpus passed");
    } else {
        for failure in outcomes.iter().filter(|o| !o.passed) {
            warn!(vector = failure.name, detail = %failure.detail, "conformance failure");
        }
    }
    ConformanceReport { outcomes, passed }
}

/// Latency distribution over one operation, milliseconds
#[derive(Debug, Clone, Serialize)]
pub struct LatencyStats {
    pub samples: usize,
    pub min_ms: u64,
    pub max_ms: u64,
    pub mean_ms: f64,
    pub median_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
}

impl LatencyStats {
    /// Compute distribution statistics from raw samples
    pub fn from_samples(mut samples: Vec<u64>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_unstable();
        let n = samples.len();
        let sum: u64 = samples.iter().sum();
        Some(Self {
            samples: n,
            min_ms: samples[0],
            max_ms: samples[n - 1],
            mean_ms: sum as f64 / n as f64,
            median_ms: samples[n / 2],
            p95_ms: percentile(&samples, 95),
            p99_ms: percentile(&samples, 99),
        })
    }
}

fn percentile(sorted: &[u64], p: usize) -> u64 {
    let index = sorted.len() * p / 100;
    sorted[index.min(sorted.len() - 1)]
}

/// Benchmark results for one predicate circuit
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBenchmark {
    pub circuit: &'static str,
    pub prove: LatencyStats,
    pub verify: LatencyStats,
    /// Pass iff prove p95 < 5000 ms and p99 < 10000 ms
    pub pass_target: bool,
}

/// Full benchmark report with the CI gate verdict
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub iterations: usize,
    pub circuits: Vec<CircuitBenchmark>,
    pub passed: bool,
}

fn random_input(predicate: PredicateType, rng: &mut impl Rng) -> VectorInput {
    let entity_hash = format!("{}", rng.gen_range(1u64..u64::MAX));
    let salt = generate_salt();
    match predicate {
        PredicateType::Threshold => {
            let score = rng.gen_range(7000..=10000u64);
            let threshold = rng.gen_range(5000..=score);
            VectorInput::Threshold(ThresholdInput {
                threshold,
                entity_hash,
                score,
                salt,
            })
        }
        PredicateType::Range => {
            let min = rng.gen_range(0..=9000u64);
            let max = rng.gen_range(min..=10000u64);
            let score = rng.gen_range(min..=max);
            VectorInput::Range(RangeInput {
                min_score: min,
                max_score: max,
                entity_hash,
                score,
                salt,
            })
        }
        PredicateType::Tier => {
            let target_tier = rng.gen_range(1..=5u8);
            let (min, max) = tier_bounds(target_tier).unwrap_or((0, 0));
            let score = rng.gen_range(min..=max);
            VectorInput::Tier(TierInput {
                target_tier,
                entity_hash,
                score,
                salt,
            })
        }
    }
}

/// Run randomized in-domain latency trials for every predicate.
///
/// Returns `Err` only on infrastructure failure (a trial that cannot
/// prove); latency target breaches are reported through the gate flag.
pub fn run_benchmark(
    prover: &ComplianceProver,
    verifier: &ComplianceVerifier,
    iterations: usize,
) -> Result<BenchmarkReport> {
    let mut rng = rand::thread_rng();
    let mut circuits = Vec::new();

    for predicate in PredicateType::ALL {
        let mut prove_ms = Vec::with_capacity(iterations);
        let mut verify_ms = Vec::with_capacity(iterations);

        for _ in 0..iterations {
            let input = random_input(predicate, &mut rng);
            let artifact = prove_vector(prover, &input)?;
            prove_ms.push(artifact.proving_time_ms);

            let start = Instant::now();
            verifier.verify(&artifact)?;
            verify_ms.push(start.elapsed().as_millis() as u64);
        }

        // iterations >= 1 is enforced by construction of the loops above
        let prove = LatencyStats::from_samples(prove_ms).ok_or_else(|| {
            crate::error::ProofSystemError::ProofGenerationFailed {
                reason: "benchmark ran zero iterations".into(),
            }
        })?;
        let verify = LatencyStats::from_samples(verify_ms).ok_or_else(|| {
            crate::error::ProofSystemError::ProofGenerationFailed {
                reason: "benchmark ran zero iterations".into(),
            }
        })?;

        let pass_target = prove.p95_ms < TARGET_P95_MS && prove.p99_ms < TARGET_P99_MS;
        if !pass_target {
            warn!(
                circuit = predicate.circuit_name(),
                p95 = prove.p95_ms,
                p99 = prove.p99_ms,
                "proving latency target breached"
            );
        }
        info!(
            circuit = predicate.circuit_name(),
            prove_p95 = prove.p95_ms,
            verify_p95 = verify.p95_ms,
            "benchmark complete"
        );

        circuits.push(CircuitBenchmark {
            circuit: predicate.circuit_name(),
            prove,
            verify,
            pass_target,
        });
    }

    let passed = circuits.iter().all(|c| c.pass_target);
    Ok(BenchmarkReport {
        iterations,
        circuits,
        passed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_covers_every_boundary() {
        let valid = valid_vectors();
        let invalid = invalid_vectors();

        // Every tier appears at both edges in the valid corpus
        for tier_n in 1..=5u8 {
            let edge_count = valid
                .iter()
                .filter(|v| matches!(&v.input, VectorInput::Tier(t) if t.target_tier == tier_n))
                .count();
            assert_eq!(edge_count, 2, "tier {tier_n} must pin both edges");
        }

        assert!(valid.iter().all(|v| v.expect_valid));
        assert!(invalid.iter().all(|v| !v.expect_valid));

        // Every predicate carries both domain violations: score > 10000
        // and score >= 2^14
        for predicate in PredicateType::ALL {
            for bad_score in [10001u64, 16384] {
                let covered = invalid.iter().any(|v| {
                    v.input.predicate() == predicate
                        && match &v.input {
                            VectorInput::Threshold(i) => i.score == bad_score,
                            VectorInput::Range(i) => i.score == bad_score,
                            VectorInput::Tier(i) => i.score == bad_score,
                        }
                });
                assert!(
                    covered,
                    "{} lacks a score {bad_score} vector",
                    predicate.circuit_name()
                );
            }
        }
    }

    #[test]
    fn test_invalid_vectors_rejected_by_validation() {
        // Every invalid vector must already fail input validation, which
        // is what guarantees failure at proving time
        for vector in invalid_vectors() {
            let result = match &vector.input {
                VectorInput::Threshold(i) => i.validate(),
                VectorInput::Range(i) => i.validate(),
                VectorInput::Tier(i) => i.validate(),
            };
            let err = result.expect_err(vector.name);
            assert!(err.is_witness_error(), "{}: {err}", vector.name);
        }
    }

    #[test]
    fn test_valid_vectors_pass_validation() {
        for vector in valid_vectors() {
            let result = match &vector.input {
                VectorInput::Threshold(i) => i.validate(),
                VectorInput::Range(i) => i.validate(),
                VectorInput::Tier(i) => i.validate(),
            };
            assert!(result.is_ok(), "{}", vector.name);
        }
    }

    #[test]
    fn test_latency_stats() {
        let stats = LatencyStats::from_samples((1..=100u64).collect()).unwrap();
        assert_eq!(stats.min_ms, 1);
        assert_eq!(stats.max_ms, 100);
        assert_eq!(stats.median_ms, 51);
        assert_eq!(stats.p95_ms, 96);
        assert_eq!(stats.p99_ms, 100);
        assert!((stats.mean_ms - 50.5).abs() < f64::EPSILON);

        assert!(LatencyStats::from_samples(Vec::new()).is_none());
    }

    #[test]
    fn test_random_inputs_are_in_domain() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            for predicate in PredicateType::ALL {
                let result = match random_input(predicate, &mut rng) {
                    VectorInput::Threshold(i) => i.validate(),
                    VectorInput::Range(i) => i.validate(),
                    VectorInput::Tier(i) => i.validate(),
                };
                assert!(result.is_ok());
            }
        }
    }
}
