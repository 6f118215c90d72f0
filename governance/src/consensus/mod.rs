//! Cross-perspective consensus.
//!
//! Findings produced independently under several perspectives are
//! clustered into consensus findings. A cluster holds at most one finding
//! per perspective; its agreement score is the share of consulted
//! perspectives that support it.
//!
//! ```text
//! [security: f1, f2] ─┐
//! [reliability: f3]  ─┼─▶ greedy single-link clustering ─▶ [CF(f1,f3), CF(f2), …]
//! [devex: f4]        ─┘
//! ```

pub mod cluster;

pub use cluster::{compute_consensus, ConsensusEngine};

use serde::{Deserialize, Serialize};

use crate::model::{Evidence, ImpactVector, RiskLevel};

/// One claim merged from findings under one or more distinct perspectives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusFinding {
    pub claim: String,
    pub recommendation: String,
    /// Distinct perspectives supporting this claim, in first-seen order.
    pub supporting_perspectives: Vec<String>,
    /// |supporting| / |consulted|.
    pub agreement_score: f64,
    /// Mean of member confidences.
    pub combined_confidence: f64,
    /// Per-dimension mean of member impacts.
    pub merged_impact: ImpactVector,
    /// Member evidence, deduplicated by (type, value), first occurrence kept.
    pub merged_evidence: Vec<Evidence>,
    /// Maximum member risk level.
    pub risk_level: RiskLevel,
}

/// Output of one consensus pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub target_id: String,
    pub findings: Vec<ConsensusFinding>,
    /// Mean of individual agreement scores; 0 when there are no findings.
    pub overall_agreement: f64,
    /// Distinct perspectives consulted, in input order.
    pub perspectives: Vec<String>,
}

impl ConsensusResult {
    pub fn empty(target_id: &str) -> Self {
        Self {
            target_id: target_id.to_string(),
            findings: Vec::new(),
            overall_agreement: 0.0,
            perspectives: Vec::new(),
        }
    }
}
