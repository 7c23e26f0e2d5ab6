//! Proof artifact types and serialization
//!
//! The wire shape is snarkjs-compatible: `{pi_a, pi_b, pi_c, protocol,
//! curve}` plus an ordered publicSignals array (parameters..., entityHash,
//! commitment). Signal order is part of the verification contract.

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_ff::PrimeField;
use ark_groth16::Proof as Groth16Proof;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use num_bigint::BigUint;
use num_traits::Num;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::commitment::{fr_to_string, string_to_fr};
use crate::error::{ProofSystemError, Result};
use crate::types::PredicateType;

/// A Groth16 proof on the BN254 curve
#[derive(Clone, Debug, PartialEq)]
pub struct Proof {
    /// The underlying arkworks proof
    pub inner: Groth16Proof<Bn254>,
}

impl Proof {
    pub fn new(inner: Groth16Proof<Bn254>) -> Self {
        Self { inner }
    }

    /// Serialize to compressed bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.inner.serialize_compressed(&mut bytes)?;
        Ok(bytes)
    }

    /// Deserialize from compressed bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let inner = Groth16Proof::deserialize_compressed(bytes).map_err(|e| {
            ProofSystemError::ProofParseError {
                reason: e.to_string(),
            }
        })?;
        Ok(Self { inner })
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> Result<String> {
        Ok(hex::encode(self.to_bytes()?))
    }

    /// Convert from hex string
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str).map_err(|e| ProofSystemError::ProofParseError {
            reason: e.to_string(),
        })?;
        Self::from_bytes(&bytes)
    }

    /// SHA-256 digest of the compressed proof, consumed by the on-chain
    /// replay ledger
    pub fn digest(&self) -> Result<[u8; 32]> {
        Ok(Sha256::digest(self.to_bytes()?).into())
    }

    /// Convert to JSON wire format (compatible with snarkjs)
    pub fn to_json(&self) -> ProofJson {
        ProofJson {
            pi_a: Self::g1_to_strings(&self.inner.a),
            pi_b: Self::g2_to_strings(&self.inner.b),
            pi_c: Self::g1_to_strings(&self.inner.c),
            protocol: "groth16".into(),
            curve: "bn128".into(),
        }
    }

    /// Parse from JSON wire format, validating every group element
    pub fn from_json(json: &ProofJson) -> Result<Self> {
        if json.protocol != "groth16" {
            return Err(ProofSystemError::ProofParseError {
                reason: format!("unsupported protocol {:?}", json.protocol),
            });
        }
        if json.curve != "bn128" {
            return Err(ProofSystemError::ProofParseError {
                reason: format!("unsupported curve {:?}", json.curve),
            });
        }
        Ok(Self {
            inner: Groth16Proof {
                a: parse_g1(&json.pi_a)?,
                b: parse_g2(&json.pi_b)?,
                c: parse_g1(&json.pi_c)?,
            },
        })
    }

    /// Convert G1 point to projective string triple
    fn g1_to_strings(point: &G1Affine) -> Vec<String> {
        vec![point.x.to_string(), point.y.to_string(), "1".into()]
    }

    /// Convert G2 point to projective string triples
    fn g2_to_strings(point: &G2Affine) -> Vec<Vec<String>> {
        vec![
            vec![point.x.c0.to_string(), point.x.c1.to_string()],
            vec![point.y.c0.to_string(), point.y.c1.to_string()],
            vec!["1".into(), "0".into()],
        ]
    }

    /// Generate calldata for the on-chain verifier contract
    pub fn to_solidity_calldata(&self, public_signals: &[Fr]) -> SolidityCalldata {
        SolidityCalldata {
            a: [self.inner.a.x.to_string(), self.inner.a.y.to_string()],
            b: [
                [self.inner.b.x.c1.to_string(), self.inner.b.x.c0.to_string()],
                [self.inner.b.y.c1.to_string(), self.inner.b.y.c0.to_string()],
            ],
            c: [self.inner.c.x.to_string(), self.inner.c.y.to_string()],
            inputs: public_signals.iter().map(Fr::to_string).collect(),
        }
    }
}

fn parse_fq(s: &str) -> Result<Fq> {
    let biguint = BigUint::from_str_radix(s, 10).map_err(|e| ProofSystemError::ProofParseError {
        reason: format!("invalid coordinate {s:?}: {e}"),
    })?;
    Ok(Fq::from_be_bytes_mod_order(&biguint.to_bytes_be()))
}

fn parse_g1(coords: &[String]) -> Result<G1Affine> {
    let [x, y, z] = coords else {
        return Err(ProofSystemError::ProofParseError {
            reason: format!("G1 point needs 3 coordinates, got {}", coords.len()),
        });
    };
    if z != "1" {
        return Err(ProofSystemError::ProofParseError {
            reason: "G1 point not in affine form".into(),
        });
    }
    let point = G1Affine::new_unchecked(parse_fq(x)?, parse_fq(y)?);
    if point.is_zero() || !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve()
    {
        return Err(ProofSystemError::ProofParseError {
            reason: "G1 point not on curve".into(),
        });
    }
    Ok(point)
}

fn parse_g2(coords: &[Vec<String>]) -> Result<G2Affine> {
    let [x, y, z] = coords else {
        return Err(ProofSystemError::ProofParseError {
            reason: format!("G2 point needs 3 coordinate pairs, got {}", coords.len()),
        });
    };
    if x.len() != 2 || y.len() != 2 || z.len() != 2 || z[0] != "1" || z[1] != "0" {
        return Err(ProofSystemError::ProofParseError {
            reason: "G2 point not in affine form".into(),
        });
    }
    let point = G2Affine::new_unchecked(
        Fq2::new(parse_fq(&x[0])?, parse_fq(&x[1])?),
        Fq2::new(parse_fq(&y[0])?, parse_fq(&y[1])?),
    );
    if point.is_zero() || !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve()
    {
        return Err(ProofSystemError::ProofParseError {
            reason: "G2 point not on curve".into(),
        });
    }
    Ok(point)
}

/// Succinct proof plus its ordered public signals
#[derive(Clone, Debug)]
pub struct ProofArtifact {
    /// The ZK proof
    pub proof: Proof,
    /// Public signals in contract order: parameters..., entityHash,
    /// commitment
    pub public_signals: Vec<Fr>,
    /// Predicate this proof attests to
    pub predicate: PredicateType,
    /// Wall-clock proving time, milliseconds
    pub proving_time_ms: u64,
}

impl ProofArtifact {
    pub fn new(
        proof: Proof,
        public_signals: Vec<Fr>,
        predicate: PredicateType,
        proving_time_ms: u64,
    ) -> Self {
        Self {
            proof,
            public_signals,
            predicate,
            proving_time_ms,
        }
    }

    /// The score commitment (last public signal)
    pub fn commitment(&self) -> Option<&Fr> {
        self.public_signals.last()
    }

    /// The entity hash (second-to-last public signal)
    pub fn entity_hash(&self) -> Option<&Fr> {
        let n = self.public_signals.len();
        n.checked_sub(2).map(|i| &self.public_signals[i])
    }

    /// Convert to JSON wire format
    pub fn to_json(&self) -> ProofArtifactJson {
        ProofArtifactJson {
            proof: self.proof.to_json(),
            public_signals: self.public_signals.iter().map(fr_to_string).collect(),
            circuit: self.predicate.circuit_name().to_string(),
        }
    }

    /// Parse from JSON wire format.
    ///
    /// Validates signal count against the predicate; a malformed payload
    /// is a [`ProofParseError`], distinct from a false-but-well-formed
    /// proof.
    ///
    /// [`ProofParseError`]: ProofSystemError::ProofParseError
    pub fn from_json(json: &ProofArtifactJson) -> Result<Self> {
        let predicate = PredicateType::ALL
            .into_iter()
            .find(|p| p.circuit_name() == json.circuit)
            .ok_or_else(|| ProofSystemError::ProofParseError {
                reason: format!("unknown circuit {:?}", json.circuit),
            })?;
        if json.public_signals.len() != predicate.public_signal_count() {
            return Err(ProofSystemError::ProofParseError {
                reason: format!(
                    "{} expects {} public signals, got {}",
                    json.circuit,
                    predicate.public_signal_count(),
                    json.public_signals.len()
                ),
            });
        }
        let public_signals = json
            .public_signals
            .iter()
            .map(|s| string_to_fr(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            proof: Proof::from_json(&json.proof)?,
            public_signals,
            predicate,
            proving_time_ms: 0,
        })
    }
}

/// JSON-serializable proof format (compatible with snarkjs)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofJson {
    /// Proof point A (G1)
    pub pi_a: Vec<String>,
    /// Proof point B (G2)
    pub pi_b: Vec<Vec<String>>,
    /// Proof point C (G1)
    pub pi_c: Vec<String>,
    /// Protocol identifier
    pub protocol: String,
    /// Curve identifier
    pub curve: String,
}

/// Artifact wire format with public signals as decimal strings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofArtifactJson {
    /// The proof
    pub proof: ProofJson,
    /// Public signals in contract order
    pub public_signals: Vec<String>,
    /// Circuit name
    pub circuit: String,
}

/// Solidity-compatible calldata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolidityCalldata {
    /// Proof point A
    pub a: [String; 2],
    /// Proof point B
    pub b: [[String; 2]; 2],
    /// Proof point C
    pub c: [String; 2],
    /// Public inputs
    pub inputs: Vec<String>,
}

impl SolidityCalldata {
    /// Format as a Solidity function call
    pub fn to_solidity_call(&self) -> String {
        format!(
            "verifyProof(\n  [{}, {}],\n  [[{}, {}], [{}, {}]],\n  [{}, {}],\n  [{}]\n)",
            self.a[0],
            self.a[1],
            self.b[0][0],
            self.b[0][1],
            self.b[1][0],
            self.b[1][1],
            self.c[0],
            self.c[1],
            self.inputs.join(", ")
        )
    }
}
