//! Anti-oscillation: hysteresis for binding decisions.
//!
//! A decision (ADR) resists reversal until three gates pass, in order,
//! each short-circuiting on failure:
//!
//! ```text
//! cooldown elapsed ─▶ confidence gap ≥ margin ─▶ contiguous confirmations ≥ cycles ─▶ flip
//!       │ no                 │ no                         │ no
//!       ▼                    ▼                            ▼
//!    blocked              blocked                      blocked
//! ```
//!
//! Independently, a proposal whose target scorecard would lower any primary
//! dimension is blocked outright.

pub mod engine;
pub mod flip;
pub mod registry;

pub use engine::AntiOscillationEngine;
pub use flip::should_flip;
pub use registry::{DecisionRegistry, SupersedeOutcome};

use serde::{Deserialize, Serialize};

/// The gate that stopped a flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlipGate {
    Cooldown,
    ConfidenceMargin,
    Confirmations,
}

impl std::fmt::Display for FlipGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cooldown => write!(f, "cooldown"),
            Self::ConfidenceMargin => write!(f, "confidence_margin"),
            Self::Confirmations => write!(f, "confirmations"),
        }
    }
}

/// Whether reversing a decision is currently permitted.
///
/// Fields for gates that were never reached stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlipDecision {
    pub should_flip: bool,
    pub reason: String,
    pub blocked_by: Option<FlipGate>,
    /// Milliseconds until the cooldown ends; 0 once elapsed.
    pub cooldown_remaining_ms: i64,
    pub confidence_gap: Option<f64>,
    pub confirmations: Option<u32>,
    pub required_confirmations: u32,
}

/// Result of checking a proposal against existing decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscillationCheck {
    pub blocked: bool,
    /// Semicolon-joined when more than one cause applies.
    pub reason: String,
    /// False when no conflicting decision was found.
    pub flip_applicable: bool,
    pub conflicting_adr_id: Option<String>,
    /// 1.0 for an explicit reference, otherwise the text similarity.
    pub match_similarity: Option<f64>,
    pub flip: Option<FlipDecision>,
    /// Primary scorecard dimensions that would score lower than baseline.
    pub primary_regressions: Vec<String>,
}

impl OscillationCheck {
    pub fn not_applicable() -> Self {
        Self {
            blocked: false,
            reason: "no conflicting decision".to_string(),
            flip_applicable: false,
            conflicting_adr_id: None,
            match_similarity: None,
            flip: None,
            primary_regressions: Vec::new(),
        }
    }
}

/// Whether a proposal re-litigates a prior decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversionCheck {
    pub is_reversion: bool,
    pub matching_decision_ids: Vec<String>,
    pub max_similarity: f64,
}

/// Share of a server's decisions that held through the rolling window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityScore {
    pub server_id: String,
    pub total_decisions: usize,
    pub flipped: usize,
    pub window_hours: i64,
    /// 1 − flipped/total, floored at 0; 1.0 with no decisions.
    pub stability: f64,
}
