//! Predicate constraint systems
//!
//! Each circuit is a pure constraint system over (public inputs, private
//! witness). A witness that fails the predicate or the score domain makes
//! the system unsatisfiable: a false predicate is structurally impossible
//! to prove, not merely rejected by surrounding validation.
//!
//! Public inputs are allocated in publicSignals order (parameters...,
//! entityHash, commitment); that order is part of the verification
//! contract.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::constraints::CryptographicSpongeVar;
use ark_crypto_primitives::sponge::poseidon::constraints::PoseidonSpongeVar;
use ark_ff::Field;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::commitment::{self, poseidon_config};
use crate::types::{tier_bounds, MAX_SCORE, SCORE_BITS};

/// Enforce that `var` equals a 14-bit value.
///
/// Allocates one boolean witness per bit of `value` and enforces that the
/// weighted sum recomposes to `var`. If the assigned value does not fit in
/// 14 bits the recomposition cannot hold and the system is unsatisfiable.
fn enforce_bit_length(
    cs: ConstraintSystemRef<Fr>,
    var: &FpVar<Fr>,
    value: u64,
) -> Result<(), SynthesisError> {
    let mut recomposed = FpVar::<Fr>::zero();
    let mut coeff = Fr::ONE;
    for i in 0..SCORE_BITS {
        let bit = Boolean::new_witness(cs.clone(), || Ok((value >> i) & 1 == 1))?;
        recomposed += FpVar::from(bit) * FpVar::constant(coeff);
        coeff.double_in_place();
    }
    recomposed.enforce_equal(var)
}

/// Enforce `a <= b` for values already range-checked to 14 bits, by
/// showing `b - a` itself fits in 14 bits. `a_val`/`b_val` are the native
/// assignments used to allocate the difference bits.
fn enforce_leq(
    cs: ConstraintSystemRef<Fr>,
    a: &FpVar<Fr>,
    b: &FpVar<Fr>,
    a_val: u64,
    b_val: u64,
) -> Result<(), SynthesisError> {
    let diff = b - a;
    // Only the low 14 bits of the wrapped difference are read; when
    // a_val > b_val they cannot recompose to the field difference.
    enforce_bit_length(cs, &diff, b_val.wrapping_sub(a_val))
}

/// Enforce that the public commitment input equals
/// `Poseidon(score, salt, entityHash)` computed in-circuit with the same
/// parameters as the native hasher.
fn enforce_commitment(
    cs: ConstraintSystemRef<Fr>,
    score: &FpVar<Fr>,
    salt: &FpVar<Fr>,
    entity_hash: &FpVar<Fr>,
    commitment: &FpVar<Fr>,
) -> Result<(), SynthesisError> {
    let mut sponge = PoseidonSpongeVar::new(cs, poseidon_config());
    sponge.absorb(score)?;
    sponge.absorb(salt)?;
    sponge.absorb(entity_hash)?;
    let out = sponge.squeeze_field_elements(1)?;
    out[0].enforce_equal(commitment)
}

/// Threshold circuit
///
/// Valid iff score in [0, 10000], threshold in [0, 10000], and
/// score >= threshold. Bounds are inclusive: score == threshold passes.
#[derive(Clone)]
pub struct ThresholdCircuit {
    /// Public: minimum required score
    pub threshold: u64,
    /// Public: hash of entity identifier
    pub entity_hash: Fr,
    /// Public: Poseidon(score, salt, entityHash)
    pub commitment: Fr,
    /// Private: actual compliance score
    pub score: u64,
    /// Private: single-use salt
    pub salt: Fr,
}

impl ThresholdCircuit {
    pub fn new(threshold: u64, entity_hash: Fr, score: u64, salt: Fr) -> Self {
        Self {
            threshold,
            entity_hash,
            commitment: commitment::commit_score(score, &salt, &entity_hash),
            score,
            salt,
        }
    }

    /// Public signals in verification order
    pub fn public_inputs(&self) -> Vec<Fr> {
        vec![Fr::from(self.threshold), self.entity_hash, self.commitment]
    }
}

impl ConstraintSynthesizer<Fr> for ThresholdCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let threshold_var = FpVar::new_input(cs.clone(), || Ok(Fr::from(self.threshold)))?;
        let entity_hash_var = FpVar::new_input(cs.clone(), || Ok(self.entity_hash))?;
        let commitment_var = FpVar::new_input(cs.clone(), || Ok(self.commitment))?;

        let score_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(self.score)))?;
        let salt_var = FpVar::new_witness(cs.clone(), || Ok(self.salt))?;

        let max_var = FpVar::constant(Fr::from(MAX_SCORE));

        // Domain checks before the predicate comparison
        enforce_bit_length(cs.clone(), &score_var, self.score)?;
        enforce_bit_length(cs.clone(), &threshold_var, self.threshold)?;
        enforce_leq(cs.clone(), &score_var, &max_var, self.score, MAX_SCORE)?;
        enforce_leq(cs.clone(), &threshold_var, &max_var, self.threshold, MAX_SCORE)?;

        // score >= threshold
        enforce_leq(
            cs.clone(),
            &threshold_var,
            &score_var,
            self.threshold,
            self.score,
        )?;

        enforce_commitment(cs, &score_var, &salt_var, &entity_hash_var, &commitment_var)
    }
}

/// Range circuit
///
/// Valid iff score in [0, 10000], max in [0, 10000], min <= max, and
/// min <= score <= max (inclusive).
#[derive(Clone)]
pub struct RangeCircuit {
    /// Public: minimum of range
    pub min_score: u64,
    /// Public: maximum of range
    pub max_score: u64,
    /// Public: entity hash
    pub entity_hash: Fr,
    /// Public: score commitment
    pub commitment: Fr,
    /// Private: actual score
    pub score: u64,
    /// Private: salt
    pub salt: Fr,
}

impl RangeCircuit {
    pub fn new(min_score: u64, max_score: u64, entity_hash: Fr, score: u64, salt: Fr) -> Self {
        Self {
            min_score,
            max_score,
            entity_hash,
            commitment: commitment::commit_score(score, &salt, &entity_hash),
            score,
            salt,
        }
    }

    /// Public signals in verification order
    pub fn public_inputs(&self) -> Vec<Fr> {
        vec![
            Fr::from(self.min_score),
            Fr::from(self.max_score),
            self.entity_hash,
            self.commitment,
        ]
    }
}

impl ConstraintSynthesizer<Fr> for RangeCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let min_var = FpVar::new_input(cs.clone(), || Ok(Fr::from(self.min_score)))?;
        let max_var = FpVar::new_input(cs.clone(), || Ok(Fr::from(self.max_score)))?;
        let entity_hash_var = FpVar::new_input(cs.clone(), || Ok(self.entity_hash))?;
        let commitment_var = FpVar::new_input(cs.clone(), || Ok(self.commitment))?;

        let score_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(self.score)))?;
        let salt_var = FpVar::new_witness(cs.clone(), || Ok(self.salt))?;

        let limit_var = FpVar::constant(Fr::from(MAX_SCORE));

        enforce_bit_length(cs.clone(), &score_var, self.score)?;
        enforce_bit_length(cs.clone(), &min_var, self.min_score)?;
        enforce_bit_length(cs.clone(), &max_var, self.max_score)?;
        enforce_leq(cs.clone(), &score_var, &limit_var, self.score, MAX_SCORE)?;
        enforce_leq(cs.clone(), &max_var, &limit_var, self.max_score, MAX_SCORE)?;

        // min <= max, then min <= score <= max
        enforce_leq(cs.clone(), &min_var, &max_var, self.min_score, self.max_score)?;
        enforce_leq(cs.clone(), &min_var, &score_var, self.min_score, self.score)?;
        enforce_leq(cs.clone(), &score_var, &max_var, self.score, self.max_score)?;

        enforce_commitment(cs, &score_var, &salt_var, &entity_hash_var, &commitment_var)
    }
}

/// Tier membership circuit
///
/// Valid iff tier in {1..5} and the score lies within that tier's
/// inclusive bounds. The bound lookup has no data-dependent branching: it
/// is a weighted sum over mutually exclusive one-hot indicators, each
/// boolean by construction, whose sum is constrained to exactly one.
#[derive(Clone)]
pub struct TierCircuit {
    /// Public: target tier (1-5)
    pub target_tier: u8,
    /// Public: entity hash
    pub entity_hash: Fr,
    /// Public: score commitment
    pub commitment: Fr,
    /// Private: actual score
    pub score: u64,
    /// Private: salt
    pub salt: Fr,
}

impl TierCircuit {
    pub fn new(target_tier: u8, entity_hash: Fr, score: u64, salt: Fr) -> Self {
        Self {
            target_tier,
            entity_hash,
            commitment: commitment::commit_score(score, &salt, &entity_hash),
            score,
            salt,
        }
    }

    /// Public signals in verification order
    pub fn public_inputs(&self) -> Vec<Fr> {
        vec![
            Fr::from(u64::from(self.target_tier)),
            self.entity_hash,
            self.commitment,
        ]
    }
}

impl ConstraintSynthesizer<Fr> for TierCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let tier_var = FpVar::new_input(cs.clone(), || Ok(Fr::from(u64::from(self.target_tier))))?;
        let entity_hash_var = FpVar::new_input(cs.clone(), || Ok(self.entity_hash))?;
        let commitment_var = FpVar::new_input(cs.clone(), || Ok(self.commitment))?;

        let score_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(self.score)))?;
        let salt_var = FpVar::new_witness(cs.clone(), || Ok(self.salt))?;

        // One-hot tier indicators. Their sum is forced to exactly one,
        // which simultaneously rejects any tier outside {1..5}.
        let mut indicator_sum = FpVar::<Fr>::zero();
        let mut min_var = FpVar::<Fr>::zero();
        let mut max_var = FpVar::<Fr>::zero();
        for tier in 1..=5u8 {
            let (tier_min, tier_max) = tier_bounds(tier).unwrap_or((0, 0));
            let is_tier = tier_var.is_eq(&FpVar::constant(Fr::from(u64::from(tier))))?;
            let indicator = FpVar::from(is_tier);
            indicator_sum += &indicator;
            min_var += &indicator * FpVar::constant(Fr::from(tier_min));
            max_var += &indicator * FpVar::constant(Fr::from(tier_max));
        }
        indicator_sum.enforce_equal(&FpVar::one())?;

        // Selected bounds for the native assignment
        let (min_val, max_val) = tier_bounds(self.target_tier).unwrap_or((0, 0));

        let limit_var = FpVar::constant(Fr::from(MAX_SCORE));
        enforce_bit_length(cs.clone(), &score_var, self.score)?;
        enforce_leq(cs.clone(), &score_var, &limit_var, self.score, MAX_SCORE)?;

        // boundary(tier).min <= score <= boundary(tier).max
        enforce_leq(cs.clone(), &min_var, &score_var, min_val, self.score)?;
        enforce_leq(cs.clone(), &score_var, &max_var, self.score, max_val)?;

        enforce_commitment(cs, &score_var, &salt_var, &entity_hash_var, &commitment_var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_relations::r1cs::ConstraintSystem;

    fn entity() -> Fr {
        Fr::from(123456789u64)
    }

    fn salt() -> Fr {
        Fr::from(987654321u64)
    }

    fn satisfied(circuit: impl ConstraintSynthesizer<Fr>) -> bool {
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        cs.is_satisfied().unwrap()
    }

    #[test]
    fn test_threshold_satisfiable_at_boundary() {
        assert!(satisfied(ThresholdCircuit::new(8000, entity(), 8500, salt())));
        // score == threshold passes: bounds are inclusive
        assert!(satisfied(ThresholdCircuit::new(8000, entity(), 8000, salt())));
        assert!(satisfied(ThresholdCircuit::new(0, entity(), 0, salt())));
        assert!(satisfied(ThresholdCircuit::new(10000, entity(), 10000, salt())));
    }

    #[test]
    fn test_threshold_unsatisfiable_below() {
        // One unit below threshold: structurally unprovable
        assert!(!satisfied(ThresholdCircuit::new(8000, entity(), 7999, salt())));
    }

    #[test]
    fn test_threshold_unsatisfiable_out_of_domain() {
        // 10001 passes bit decomposition but fails the explicit <= 10000 check
        assert!(!satisfied(ThresholdCircuit::new(5000, entity(), 10001, salt())));
        // 16384 needs a 15th bit
        assert!(!satisfied(ThresholdCircuit::new(5000, entity(), 16384, salt())));
        // Out-of-domain threshold is also rejected
        assert!(!satisfied(ThresholdCircuit::new(10001, entity(), 10000, salt())));
    }

    #[test]
    fn test_range_satisfiable_at_boundaries() {
        assert!(satisfied(RangeCircuit::new(7000, 9000, entity(), 7000, salt())));
        assert!(satisfied(RangeCircuit::new(7000, 9000, entity(), 9000, salt())));
        assert!(satisfied(RangeCircuit::new(0, 10000, entity(), 0, salt())));
        assert!(satisfied(RangeCircuit::new(0, 10000, entity(), 10000, salt())));
        // Degenerate single-point range
        assert!(satisfied(RangeCircuit::new(8000, 8000, entity(), 8000, salt())));
    }

    #[test]
    fn test_range_unsatisfiable_outside() {
        assert!(!satisfied(RangeCircuit::new(7000, 9000, entity(), 6999, salt())));
        assert!(!satisfied(RangeCircuit::new(7000, 9000, entity(), 9001, salt())));
        // Inverted range is unsatisfiable for any score
        assert!(!satisfied(RangeCircuit::new(9000, 7000, entity(), 8000, salt())));
    }

    #[test]
    fn test_tier_boundaries() {
        let edges = [
            (1u8, 9500u64),
            (1, 10000),
            (2, 8500),
            (2, 9499),
            (3, 7000),
            (3, 8499),
            (4, 5000),
            (4, 6999),
            (5, 0),
            (5, 4999),
        ];
        for (tier, score) in edges {
            assert!(
                satisfied(TierCircuit::new(tier, entity(), score, salt())),
                "tier {tier} score {score} should satisfy"
            );
        }
    }

    #[test]
    fn test_tier_rejects_adjacent_scores() {
        // One unit past each edge lands in a different tier
        let misses = [(1u8, 9499u64), (2, 9500), (2, 8499), (3, 8500), (5, 5000)];
        for (tier, score) in misses {
            assert!(
                !satisfied(TierCircuit::new(tier, entity(), score, salt())),
                "tier {tier} score {score} should not satisfy"
            );
        }
    }

    #[test]
    fn test_tier_rejects_invalid_tier_number() {
        // No indicator fires, so the one-hot sum cannot reach one
        assert!(!satisfied(TierCircuit::new(0, entity(), 5000, salt())));
        assert!(!satisfied(TierCircuit::new(6, entity(), 5000, salt())));
    }

    #[test]
    fn test_commitment_binding() {
        // Tampering with the public commitment breaks satisfiability even
        // though the predicate itself holds
        let mut circuit = ThresholdCircuit::new(8000, entity(), 8500, salt());
        circuit.commitment += Fr::from(1u64);
        assert!(!satisfied(circuit));
    }

    #[test]
    fn test_in_circuit_commitment_matches_native() {
        // new() computes the commitment natively; satisfiability means the
        // in-circuit Poseidon agrees with the reference implementation
        let circuit = TierCircuit::new(2, entity(), 8700, salt());
        assert_eq!(
            circuit.commitment,
            crate::commitment::commit_score(8700, &salt(), &entity())
        );
        assert!(satisfied(circuit));
    }
}
