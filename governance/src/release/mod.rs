//! Release lifecycle.
//!
//! # States
//!
//! ```text
//! planning → candidate → staging → canary → released
//!                │           │        │         │
//!                └───────────┴────────┴─────────┴──▶ rolled_back (terminal)
//! ```
//!
//! Rollback from `planning` is not a transition. Illegal transitions return
//! an unsuccessful [`TransitionOutcome`] and leave the record untouched.

pub mod changelog;
pub mod manager;
pub mod version;

pub use changelog::{render_changelog, section_label};
pub use manager::ReleaseManager;
pub use version::{bump_kind, BumpKind, SemVer};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ScorecardSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    Planning,
    Candidate,
    Staging,
    Canary,
    Released,
    RolledBack,
}

impl ReleaseStatus {
    pub fn valid_transitions(self) -> &'static [ReleaseStatus] {
        match self {
            Self::Planning => &[Self::Candidate],
            Self::Candidate => &[Self::Staging, Self::RolledBack],
            Self::Staging => &[Self::Canary, Self::RolledBack],
            Self::Canary => &[Self::Released, Self::RolledBack],
            Self::Released => &[Self::RolledBack],
            Self::RolledBack => &[],
        }
    }

    pub fn can_transition_to(self, to: ReleaseStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    pub fn is_terminal(self) -> bool {
        self.valid_transitions().is_empty()
    }
}

impl std::fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Planning => write!(f, "planning"),
            Self::Candidate => write!(f, "candidate"),
            Self::Staging => write!(f, "staging"),
            Self::Canary => write!(f, "canary"),
            Self::Released => write!(f, "released"),
            Self::RolledBack => write!(f, "rolled_back"),
        }
    }
}

impl std::str::FromStr for ReleaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planning" => Ok(Self::Planning),
            "candidate" => Ok(Self::Candidate),
            "staging" => Ok(Self::Staging),
            "canary" => Ok(Self::Canary),
            "released" => Ok(Self::Released),
            "rolled_back" => Ok(Self::RolledBack),
            other => Err(format!("unknown release status: {}", other)),
        }
    }
}

/// Record of a status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: ReleaseStatus,
    pub to: ReleaseStatus,
    pub actor: String,
    #[serde(default)]
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub id: String,
    pub target_id: String,
    pub plan_id: String,
    pub version: String,
    #[serde(default)]
    pub previous_version: Option<String>,
    pub bump: BumpKind,
    pub proposal_ids: Vec<String>,
    #[serde(default)]
    pub pr_refs: Vec<String>,
    pub changelog: String,
    pub status: ReleaseStatus,
    /// Latest scorecard for the target when the release was created.
    #[serde(default)]
    pub scorecard: Option<ScorecardSnapshot>,
    #[serde(default)]
    pub transitions: Vec<StatusTransition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a transition request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub success: bool,
    pub release_id: String,
    pub from: ReleaseStatus,
    pub to: ReleaseStatus,
    /// Legal next states from `from`.
    pub allowed: Vec<ReleaseStatus>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path() {
        let mut status = ReleaseStatus::Planning;
        for next in [
            ReleaseStatus::Candidate,
            ReleaseStatus::Staging,
            ReleaseStatus::Canary,
            ReleaseStatus::Released,
        ] {
            assert!(status.can_transition_to(next));
            status = next;
        }
    }

    #[test]
    fn test_candidate_transitions() {
        assert_eq!(
            ReleaseStatus::Candidate.valid_transitions(),
            &[ReleaseStatus::Staging, ReleaseStatus::RolledBack]
        );
        assert!(!ReleaseStatus::Candidate.can_transition_to(ReleaseStatus::Released));
    }

    #[test]
    fn test_released_only_rolls_back() {
        assert_eq!(
            ReleaseStatus::Released.valid_transitions(),
            &[ReleaseStatus::RolledBack]
        );
    }

    #[test]
    fn test_no_rollback_from_planning() {
        assert!(!ReleaseStatus::Planning.can_transition_to(ReleaseStatus::RolledBack));
    }

    #[test]
    fn test_rolled_back_is_terminal() {
        assert!(ReleaseStatus::RolledBack.is_terminal());
        for to in [
            ReleaseStatus::Planning,
            ReleaseStatus::Candidate,
            ReleaseStatus::Staging,
            ReleaseStatus::Canary,
            ReleaseStatus::Released,
            ReleaseStatus::RolledBack,
        ] {
            assert!(!ReleaseStatus::RolledBack.can_transition_to(to));
        }
    }

    #[test]
    fn test_status_parse_roundtrips_display() {
        for status in [ReleaseStatus::Canary, ReleaseStatus::RolledBack] {
            assert_eq!(status.to_string().parse::<ReleaseStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<ReleaseStatus>().is_err());
    }
}
