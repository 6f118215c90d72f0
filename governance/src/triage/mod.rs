//! Triage: consensus findings to prioritized, budget-constrained proposals.
//!
//! ```text
//! ConsensusFinding
//!   ├─ low agreement AND low confidence ─▶ escalation (no proposal)
//!   └─ otherwise ─▶ synthesize ─▶ policy ─▶ anti-oscillation ─▶ no-op ─▶ score ─▶ persist + audit
//! ```

pub mod engine;
pub mod locks;
pub mod scoring;
pub mod synthesis;

pub use engine::TriageEngine;
pub use locks::TargetLocks;
pub use scoring::{score_finding, ScoreBreakdown};
pub use synthesis::{acceptance_criteria, estimate_loc_change, infer_category, synthesize_proposal};

use serde::{Deserialize, Serialize};

use crate::hysteresis::OscillationCheck;
use crate::model::ImprovementProposal;
use crate::policy::PolicyVerdict;

/// A finding routed to human review instead of becoming a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escalation {
    pub claim: String,
    pub agreement_score: f64,
    pub combined_confidence: f64,
    pub message: String,
}

/// One proposal produced by a triage pass, with everything that shaped it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriagedProposal {
    pub proposal: ImprovementProposal,
    pub scores: ScoreBreakdown,
    pub policy: PolicyVerdict,
    pub oscillation: OscillationCheck,
    pub is_noop: bool,
    /// True when the oscillation check blocked or the change is a no-op.
    pub blocked_by_oscillation: bool,
    /// Why the proposal is blocked, if it is.
    pub block_reason: Option<String>,
}

impl TriagedProposal {
    pub fn priority_score(&self) -> f64 {
        self.scores.priority_score
    }

    /// Blocked by anti-oscillation, no-op detection or policy denial.
    pub fn is_blocked(&self) -> bool {
        self.blocked_by_oscillation || !self.policy.allowed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    pub target_id: String,
    /// Tags every audit event written by this pass.
    pub correlation_id: String,
    /// Sorted by priority score, highest first.
    pub proposals: Vec<TriagedProposal>,
    pub escalations: Vec<Escalation>,
    pub change_budget: u32,
    /// Change budget minus non-blocked proposals, floored at 0.
    pub budget_remaining: u32,
}
