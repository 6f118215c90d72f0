//! Decision-plane configuration.
//!
//! A `GovernanceConfig` is passed explicitly into every engine constructor.
//! Nothing in this crate reads process-wide state; the same process can run
//! two engines with different thresholds side by side.

use serde::{Deserialize, Serialize};

/// Upper bound for hour-valued settings: one hundred years.
pub const MAX_HOURS: i64 = 100 * 365 * 24;

/// Weights applied to the four impact dimensions when scoring priority.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorecardWeights {
    pub security: f64,
    pub reliability: f64,
    pub devex: f64,
    pub performance: f64,
}

impl Default for ScorecardWeights {
    fn default() -> Self {
        Self {
            security: 0.30,
            reliability: 0.25,
            devex: 0.20,
            performance: 0.15,
        }
    }
}

/// Thresholds and defaults for consensus, hysteresis and triage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Non-blocked proposals allowed per triage pass when the target has no override.
    pub change_budget: u32,
    /// Cooldown applied to newly recorded decisions.
    pub cooldown_hours: i64,
    /// Confidence gap a reversal must clear, for newly recorded decisions.
    pub min_confidence_margin: f64,
    /// Contiguous confirmations a reversal needs, for newly recorded decisions.
    pub min_consecutive_cycles: u32,
    /// Rolling window used by the stability score.
    pub stability_window_hours: i64,
    /// Similarity a finding must exceed to join a consensus cluster.
    pub consensus_similarity_threshold: f64,
    /// Similarity a proposal must exceed to be matched to an unreferenced ADR.
    pub adr_match_threshold: f64,
    /// Similarity a prior decision must exceed to count as a confirmation.
    pub confirmation_threshold: f64,
    /// How many prior decisions are inspected when counting confirmations.
    pub confirmation_window: usize,
    /// Similarity a prior decision must exceed to flag a reversion.
    pub reversion_threshold: f64,
    /// How many prior decisions are inspected when detecting reversions.
    pub reversion_window: usize,
    /// Agreement below which (together with low confidence) a finding is escalated.
    pub escalation_agreement_floor: f64,
    /// Confidence below which (together with low agreement) a finding is escalated.
    pub escalation_confidence_floor: f64,
    /// Scoring weights used when the target server configures none.
    pub default_weights: ScorecardWeights,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            change_budget: 5,
            cooldown_hours: 24,
            min_confidence_margin: 0.15,
            min_consecutive_cycles: 2,
            stability_window_hours: 24,
            consensus_similarity_threshold: 0.3,
            adr_match_threshold: 0.75,
            confirmation_threshold: 0.6,
            confirmation_window: 10,
            reversion_threshold: 0.7,
            reversion_window: 3,
            escalation_agreement_floor: 0.33,
            escalation_confidence_floor: 0.5,
            default_weights: ScorecardWeights::default(),
        }
    }
}

impl GovernanceConfig {
    /// Check that every threshold is in range. Returns one message per problem.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let unit_fields = [
            ("min_confidence_margin", self.min_confidence_margin),
            (
                "consensus_similarity_threshold",
                self.consensus_similarity_threshold,
            ),
            ("adr_match_threshold", self.adr_match_threshold),
            ("confirmation_threshold", self.confirmation_threshold),
            ("reversion_threshold", self.reversion_threshold),
            ("escalation_agreement_floor", self.escalation_agreement_floor),
            (
                "escalation_confidence_floor",
                self.escalation_confidence_floor,
            ),
        ];
        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                problems.push(format!("{} must be within [0, 1], got {}", name, value));
            }
        }

        if !(0..=MAX_HOURS).contains(&self.cooldown_hours) {
            problems.push(format!(
                "cooldown_hours must be within [0, {}], got {}",
                MAX_HOURS, self.cooldown_hours
            ));
        }
        if !(1..=MAX_HOURS).contains(&self.stability_window_hours) {
            problems.push(format!(
                "stability_window_hours must be within [1, {}], got {}",
                MAX_HOURS, self.stability_window_hours
            ));
        }
        if self.confirmation_window == 0 {
            problems.push("confirmation_window must be at least 1".to_string());
        }
        if self.reversion_window == 0 {
            problems.push("reversion_window must be at least 1".to_string());
        }

        problems
    }
}
