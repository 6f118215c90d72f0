//! Improvement proposals, the units of change against a target server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::finding::RiskLevel;
use super::scorecard::ScorecardSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalCategory {
    Security,
    Behavioral,
    Refactor,
    Dependency,
    Docs,
    PromptOnly,
}

impl ProposalCategory {
    /// Stable order used when grouping a changelog.
    pub fn ordered() -> &'static [Self] {
        &[
            Self::Security,
            Self::Behavioral,
            Self::Refactor,
            Self::Dependency,
            Self::Docs,
            Self::PromptOnly,
        ]
    }
}

impl std::fmt::Display for ProposalCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Security => write!(f, "security"),
            Self::Behavioral => write!(f, "behavioral"),
            Self::Refactor => write!(f, "refactor"),
            Self::Dependency => write!(f, "dependency"),
            Self::Docs => write!(f, "docs"),
            Self::PromptOnly => write!(f, "prompt_only"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Triaged and waiting for a decision.
    Proposed,
    /// Held back by hysteresis, a no-op check or policy.
    Blocked,
    Approved,
    Rejected,
    InProgress,
    Merged,
    Reverted,
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proposed => write!(f, "proposed"),
            Self::Blocked => write!(f, "blocked"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Merged => write!(f, "merged"),
            Self::Reverted => write!(f, "reverted"),
        }
    }
}

/// A proposed change to a target server.
///
/// Created by triage from one consensus finding. After creation only
/// `status`, `priority` and `updated_at` change; proposals are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementProposal {
    pub id: String,
    pub target_id: String,
    pub title: String,
    pub description: String,
    pub category: ProposalCategory,
    pub status: ProposalStatus,
    pub priority: f64,
    pub risk_level: RiskLevel,
    pub estimated_loc_change: u32,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub baseline_scorecard: Option<ScorecardSnapshot>,
    #[serde(default)]
    pub target_scorecard: Option<ScorecardSnapshot>,
    #[serde(default)]
    pub adr_refs: Vec<String>,
    #[serde(default)]
    pub source_perspectives: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImprovementProposal {
    /// Minimal proposal; triage fills in the rest.
    pub fn new(target_id: &str, title: &str, category: ProposalCategory) -> Self {
        let now = Utc::now();
        Self {
            id: format!("prop-{}", uuid::Uuid::new_v4()),
            target_id: target_id.to_string(),
            title: title.to_string(),
            description: String::new(),
            category,
            status: ProposalStatus::Proposed,
            priority: 0.0,
            risk_level: RiskLevel::Low,
            estimated_loc_change: 0,
            acceptance_criteria: Vec::new(),
            baseline_scorecard: None,
            target_scorecard: None,
            adr_refs: Vec::new(),
            source_perspectives: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Text used for similarity lookups against prior decisions.
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }

    /// First line of the description, trimmed.
    pub fn summary_line(&self) -> &str {
        self.description.lines().next().unwrap_or("").trim()
    }
}
