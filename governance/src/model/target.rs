//! Target servers and delivery plans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{GovernanceConfig, ScorecardWeights};

/// Per-target overrides. Missing values fall back to `GovernanceConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetServerConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub scorecard_weights: Option<ScorecardWeights>,
    #[serde(default)]
    pub change_budget: Option<u32>,
}

impl TargetServerConfig {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            scorecard_weights: None,
            change_budget: None,
        }
    }

    pub fn weights(&self, config: &GovernanceConfig) -> ScorecardWeights {
        self.scorecard_weights.unwrap_or(config.default_weights)
    }

    pub fn budget(&self, config: &GovernanceConfig) -> u32 {
        self.change_budget.unwrap_or(config.change_budget)
    }
}

/// An approved bundle of proposals headed for one release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPlan {
    pub id: String,
    pub target_id: String,
    #[serde(default)]
    pub title: String,
    pub proposal_ids: Vec<String>,
    #[serde(default)]
    pub pr_refs: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl DeliveryPlan {
    pub fn new(target_id: &str, proposal_ids: Vec<String>) -> Self {
        Self {
            id: format!("plan-{}", uuid::Uuid::new_v4()),
            target_id: target_id.to_string(),
            title: String::new(),
            proposal_ids,
            pr_refs: Vec::new(),
            created_at: Utc::now(),
        }
    }
}
