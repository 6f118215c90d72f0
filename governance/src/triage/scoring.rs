//! Priority and risk-adjusted impact.

use serde::{Deserialize, Serialize};

use crate::config::ScorecardWeights;
use crate::consensus::ConsensusFinding;

const AGREEMENT_WEIGHT: f64 = 0.2;
const CONFIDENCE_WEIGHT: f64 = 0.15;

/// Every term of the priority score, kept for the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub weighted_impact: f64,
    pub agreement_bonus: f64,
    pub confidence_bonus: f64,
    pub risk_penalty: f64,
    /// Sum of the terms above, clamped to [0, 1].
    pub priority_score: f64,
    pub risk_adjusted_impact: f64,
}

pub fn score_finding(finding: &ConsensusFinding, weights: &ScorecardWeights) -> ScoreBreakdown {
    let impact = &finding.merged_impact;
    let weighted_impact = impact.security * weights.security
        + impact.reliability * weights.reliability
        + impact.devex * weights.devex
        + impact.performance * weights.performance;
    let agreement_bonus = finding.agreement_score * AGREEMENT_WEIGHT;
    let confidence_bonus = finding.combined_confidence * CONFIDENCE_WEIGHT;
    let risk_penalty = finding.risk_level.priority_penalty();

    let priority_score =
        (weighted_impact + agreement_bonus + confidence_bonus + risk_penalty).clamp(0.0, 1.0);
    let risk_adjusted_impact =
        impact.magnitude() * finding.risk_level.impact_discount() * finding.combined_confidence;

    ScoreBreakdown {
        weighted_impact,
        agreement_bonus,
        confidence_bonus,
        risk_penalty,
        priority_score,
        risk_adjusted_impact,
    }
}
