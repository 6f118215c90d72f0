//! Policy evaluation for triaged proposals.

use serde::{Deserialize, Serialize};

use crate::model::{ImprovementProposal, ProposalCategory, RiskLevel};

/// Verdict of a policy engine on one proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub allowed: bool,
    pub requires_approval: bool,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl PolicyVerdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            requires_approval: false,
            reasons: Vec::new(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait PolicyEngine: Send + Sync {
    fn evaluate(&self, proposal: &ImprovementProposal) -> PolicyVerdict;
}

/// Threshold rules with no external state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticPolicy {
    /// Proposals estimated above this many changed lines are denied.
    pub max_loc_change: u32,
    pub approval_categories: Vec<ProposalCategory>,
    /// Proposals at or above this risk need a human sign-off.
    pub approval_risk: RiskLevel,
}

impl Default for StaticPolicy {
    fn default() -> Self {
        Self {
            max_loc_change: 2000,
            approval_categories: vec![ProposalCategory::Security, ProposalCategory::Behavioral],
            approval_risk: RiskLevel::High,
        }
    }
}

impl PolicyEngine for StaticPolicy {
    fn evaluate(&self, proposal: &ImprovementProposal) -> PolicyVerdict {
        let mut verdict = PolicyVerdict::allow();

        if proposal.estimated_loc_change > self.max_loc_change {
            verdict.allowed = false;
            verdict.reasons.push(format!(
                "estimated change of {} lines exceeds limit of {}",
                proposal.estimated_loc_change, self.max_loc_change
            ));
        }
        if self.approval_categories.contains(&proposal.category) {
            verdict.requires_approval = true;
            verdict
                .reasons
                .push(format!("{} changes require approval", proposal.category));
        }
        if proposal.risk_level >= self.approval_risk {
            verdict.requires_approval = true;
            verdict
                .reasons
                .push(format!("{} risk requires approval", proposal.risk_level));
        }

        verdict
    }
}
