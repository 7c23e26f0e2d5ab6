//! Score commitment model
//!
//! A commitment binds a private score to an entity: `Poseidon(score, salt,
//! entityHash)`. The hash is field-native so the exact same function is
//! evaluated inside the constraint system (see [`crate::circuits`]) and by
//! any external verifier recomputing a stored commitment.

use std::sync::OnceLock;

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{
    find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge,
};
use ark_crypto_primitives::sponge::{CryptographicSponge, FieldBasedCryptographicSponge};
use ark_ff::PrimeField;
use ark_std::UniformRand;
use num_bigint::BigUint;
use num_traits::Num;
use sha2::{Digest, Sha256};

use crate::error::{ProofSystemError, Result};

// Width-3 sponge (rate 2, capacity 1) with standard round counts for
// alpha = 5 on a ~254-bit field.
const POSEIDON_RATE: usize = 2;
const POSEIDON_CAPACITY: usize = 1;
const POSEIDON_FULL_ROUNDS: usize = 8;
const POSEIDON_PARTIAL_ROUNDS: usize = 57;
const POSEIDON_ALPHA: u64 = 5;

/// Poseidon parameters shared by the native hasher and the in-circuit
/// gadget. Both sides must derive constants identically or commitments
/// computed during proving would not match reference recomputation.
pub fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    static CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();
    CONFIG.get_or_init(|| {
        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
            Fr::MODULUS_BIT_SIZE as u64,
            POSEIDON_RATE,
            POSEIDON_FULL_ROUNDS as u64,
            POSEIDON_PARTIAL_ROUNDS as u64,
            0,
        );
        PoseidonConfig::new(
            POSEIDON_FULL_ROUNDS,
            POSEIDON_PARTIAL_ROUNDS,
            POSEIDON_ALPHA,
            mds,
            ark,
            POSEIDON_RATE,
            POSEIDON_CAPACITY,
        )
    })
}

/// Compute the score commitment `Poseidon(score, salt, entityHash)`.
///
/// Pure and deterministic: identical inputs always produce the identical
/// commitment.
pub fn commit(score: Fr, salt: Fr, entity_hash: Fr) -> Fr {
    let mut sponge = PoseidonSponge::new(poseidon_config());
    sponge.absorb(&score);
    sponge.absorb(&salt);
    sponge.absorb(&entity_hash);
    sponge.squeeze_native_field_elements(1)[0]
}

/// Commitment over an integer score
pub fn commit_score(score: u64, salt: &Fr, entity_hash: &Fr) -> Fr {
    commit(Fr::from(score), *salt, *entity_hash)
}

/// Hash an opaque entity identifier to a field element.
///
/// SHA-256 of the identifier bytes, reduced mod the BN254 scalar field.
/// Only this hash ever enters a proof; the identifier itself stays
/// off-circuit.
pub fn hash_entity_id(entity_id: &str) -> Fr {
    let digest = Sha256::digest(entity_id.as_bytes());
    Fr::from_be_bytes_mod_order(&digest)
}

/// Generate a fresh random salt as a decimal field-element string.
///
/// Salts are single-use: reusing one across two proofs of the same fact
/// makes the commitments linkable.
pub fn generate_salt() -> String {
    let mut rng = rand::thread_rng();
    fr_to_string(&Fr::rand(&mut rng))
}

/// Parse a decimal string into a field element
pub fn string_to_fr(s: &str) -> Result<Fr> {
    let biguint = BigUint::from_str_radix(s, 10).map_err(|e| ProofSystemError::ProofParseError {
        reason: format!("invalid field element {s:?}: {e}"),
    })?;
    Ok(Fr::from_be_bytes_mod_order(&biguint.to_bytes_be()))
}

/// Render a field element as a decimal string
pub fn fr_to_string(f: &Fr) -> String {
    f.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commitment_deterministic() {
        let salt = Fr::from(123456789u64);
        let entity_hash = Fr::from(987654321u64);

        let c1 = commit_score(8500, &salt, &entity_hash);
        let c2 = commit_score(8500, &salt, &entity_hash);
        assert_eq!(c1, c2);

        // Any input change moves the commitment
        assert_ne!(c1, commit_score(8501, &salt, &entity_hash));
        assert_ne!(c1, commit_score(8500, &Fr::from(2u64), &entity_hash));
        assert_ne!(c1, commit_score(8500, &salt, &Fr::from(2u64)));
    }

    #[test]
    fn test_entity_hash_stable() {
        let h1 = hash_entity_id("LEI-123456789");
        let h2 = hash_entity_id("LEI-123456789");
        assert_eq!(h1, h2);
        assert_ne!(h1, hash_entity_id("LEI-123456780"));
    }

    #[test]
    fn test_salt_uniqueness() {
        let s1 = generate_salt();
        let s2 = generate_salt();
        assert_ne!(s1, s2);
        // Round-trips through the decimal wire format
        let fr = string_to_fr(&s1).unwrap();
        assert_eq!(fr_to_string(&fr), s1);
    }

    #[test]
    fn test_string_to_fr_rejects_garbage() {
        assert!(string_to_fr("not-a-number").is_err());
        assert!(string_to_fr("").is_err());
        assert_eq!(string_to_fr("42").unwrap(), Fr::from(42u64));
    }
}
