//! Input types and score domain constants

use serde::{Deserialize, Serialize};

use crate::error::{ProofSystemError, Result};

/// Maximum valid score (100.00% in fixed-point with 4 implied decimals)
pub const MAX_SCORE: u64 = 10000;

/// Bit width of every scalar compared in-circuit.
///
/// 2^14 = 16384 covers the score domain; values in (10000, 16383] are
/// bit-representable but semantically invalid and rejected by the explicit
/// `<= 10000` check.
pub const SCORE_BITS: usize = 14;

/// Tier boundaries for compliance levels
pub mod tiers {
    /// Critical compliance tier (>= 95%)
    pub const TIER_1_MIN: u64 = 9500;
    /// High compliance tier (>= 85%)
    pub const TIER_2_MIN: u64 = 8500;
    /// Standard compliance tier (>= 70%)
    pub const TIER_3_MIN: u64 = 7000;
    /// Basic compliance tier (>= 50%)
    pub const TIER_4_MIN: u64 = 5000;
    /// Minimal compliance tier (< 50%)
    pub const TIER_5_MIN: u64 = 0;
}

/// Inclusive `(min, max)` bounds for a tier, `None` outside {1..5}
pub fn tier_bounds(tier: u8) -> Option<(u64, u64)> {
    match tier {
        1 => Some((tiers::TIER_1_MIN, MAX_SCORE)),
        2 => Some((tiers::TIER_2_MIN, tiers::TIER_1_MIN - 1)),
        3 => Some((tiers::TIER_3_MIN, tiers::TIER_2_MIN - 1)),
        4 => Some((tiers::TIER_4_MIN, tiers::TIER_3_MIN - 1)),
        5 => Some((tiers::TIER_5_MIN, tiers::TIER_4_MIN - 1)),
        _ => None,
    }
}

/// The compliance predicate a proof attests to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateType {
    /// score >= threshold
    Threshold,
    /// min <= score <= max
    Range,
    /// score within the requested tier's bounds
    Tier,
}

impl PredicateType {
    /// Stable circuit name, used in key artifacts and proof payloads
    pub fn circuit_name(&self) -> &'static str {
        match self {
            Self::Threshold => "compliance_threshold",
            Self::Range => "range_proof",
            Self::Tier => "tier_membership",
        }
    }

    /// Number of public signals the circuit exposes (parameters,
    /// entityHash, commitment)
    pub fn public_signal_count(&self) -> usize {
        match self {
            Self::Threshold | Self::Tier => 3,
            Self::Range => 4,
        }
    }

    pub const ALL: [PredicateType; 3] = [Self::Threshold, Self::Range, Self::Tier];
}

/// Input for compliance threshold proof
///
/// Proves: score >= threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdInput {
    /// Minimum required score (0-10000, public)
    pub threshold: u64,
    /// Hash of entity identifier as a decimal field element (public)
    pub entity_hash: String,
    /// Actual compliance score (private)
    pub score: u64,
    /// Single-use random salt as a decimal field element (private)
    pub salt: String,
}

impl ThresholdInput {
    /// Validate domain constraints first, then the predicate itself
    pub fn validate(&self) -> Result<()> {
        if self.score > MAX_SCORE {
            return Err(ProofSystemError::ScoreOutOfRange { score: self.score });
        }
        if self.threshold > MAX_SCORE {
            return Err(ProofSystemError::InvalidInput {
                field: "threshold".into(),
                value: self.threshold.to_string(),
                expected: format!("0-{MAX_SCORE}"),
            });
        }
        if self.score < self.threshold {
            return Err(ProofSystemError::ThresholdNotMet {
                score: self.score,
                threshold: self.threshold,
            });
        }
        Ok(())
    }
}

/// Input for compliance range proof
///
/// Proves: min_score <= score <= max_score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeInput {
    /// Minimum of range (inclusive, public)
    pub min_score: u64,
    /// Maximum of range (inclusive, public)
    pub max_score: u64,
    /// Hash of entity identifier (public)
    pub entity_hash: String,
    /// Actual compliance score (private)
    pub score: u64,
    /// Single-use random salt (private)
    pub salt: String,
}

impl RangeInput {
    /// Validate domain constraints first, then the predicate itself
    pub fn validate(&self) -> Result<()> {
        if self.score > MAX_SCORE {
            return Err(ProofSystemError::ScoreOutOfRange { score: self.score });
        }
        if self.max_score > MAX_SCORE {
            return Err(ProofSystemError::InvalidInput {
                field: "max_score".into(),
                value: self.max_score.to_string(),
                expected: format!("0-{MAX_SCORE}"),
            });
        }
        if self.min_score > self.max_score {
            return Err(ProofSystemError::InvalidInput {
                field: "min_score".into(),
                value: self.min_score.to_string(),
                expected: format!("<= max_score ({})", self.max_score),
            });
        }
        if self.score < self.min_score || self.score > self.max_score {
            return Err(ProofSystemError::WitnessError {
                reason: format!(
                    "score {} not in range [{}, {}]",
                    self.score, self.min_score, self.max_score
                ),
            });
        }
        Ok(())
    }
}

/// Input for tier membership proof
///
/// Proves: entity belongs to the requested compliance tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierInput {
    /// Target tier (1-5, public)
    pub target_tier: u8,
    /// Hash of entity identifier (public)
    pub entity_hash: String,
    /// Actual compliance score (private)
    pub score: u64,
    /// Single-use random salt (private)
    pub salt: String,
}

impl TierInput {
    /// Validate domain constraints first, then the predicate itself
    pub fn validate(&self) -> Result<()> {
        let Some((min, max)) = tier_bounds(self.target_tier) else {
            return Err(ProofSystemError::InvalidTier {
                tier: self.target_tier,
            });
        };
        if self.score > MAX_SCORE {
            return Err(ProofSystemError::ScoreOutOfRange { score: self.score });
        }
        if self.score < min || self.score > max {
            return Err(ProofSystemError::WitnessError {
                reason: format!(
                    "score {} not in tier {} range [{}, {}]",
                    self.score, self.target_tier, min, max
                ),
            });
        }
        Ok(())
    }
}
