//! Research case record and its typed overlay artifacts.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Overlay names, in pipeline order.
pub const OVERLAYS: [&str; 8] = [
    "intake",
    "synthesis",
    "review",
    "decision",
    "proposal",
    "implement",
    "evaluate",
    "release",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStatus {
    Intake,
    Synthesis,
    Review,
    Decision,
    Proposal,
    Implement,
    Evaluate,
    Release,
    Completed,
    Rejected,
    Deferred,
}

impl ResearchStatus {
    /// Pipeline position implied by this status.
    ///
    /// `Completed` sits on the final overlay. `Rejected` and `Deferred`
    /// imply no position: the case keeps the one it stopped at.
    pub fn overlay_index(self) -> Option<usize> {
        match self {
            Self::Intake => Some(0),
            Self::Synthesis => Some(1),
            Self::Review => Some(2),
            Self::Decision => Some(3),
            Self::Proposal => Some(4),
            Self::Implement => Some(5),
            Self::Evaluate => Some(6),
            Self::Release | Self::Completed => Some(7),
            Self::Rejected | Self::Deferred => None,
        }
    }

    pub fn from_overlay_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Intake),
            1 => Some(Self::Synthesis),
            2 => Some(Self::Review),
            3 => Some(Self::Decision),
            4 => Some(Self::Proposal),
            5 => Some(Self::Implement),
            6 => Some(Self::Evaluate),
            7 => Some(Self::Release),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Deferred)
    }
}

impl std::fmt::Display for ResearchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Intake => write!(f, "intake"),
            Self::Synthesis => write!(f, "synthesis"),
            Self::Review => write!(f, "review"),
            Self::Decision => write!(f, "decision"),
            Self::Proposal => write!(f, "proposal"),
            Self::Implement => write!(f, "implement"),
            Self::Evaluate => write!(f, "evaluate"),
            Self::Release => write!(f, "release"),
            Self::Completed => write!(f, "completed"),
            Self::Rejected => write!(f, "rejected"),
            Self::Deferred => write!(f, "deferred"),
        }
    }
}

/// The five fixed review perspectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewPerspective {
    Security,
    Reliability,
    Devex,
    Performance,
    Compliance,
}

impl ReviewPerspective {
    pub const ALL: [ReviewPerspective; 5] = [
        Self::Security,
        Self::Reliability,
        Self::Devex,
        Self::Performance,
        Self::Compliance,
    ];
}

impl std::fmt::Display for ReviewPerspective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Security => write!(f, "security"),
            Self::Reliability => write!(f, "reliability"),
            Self::Devex => write!(f, "devex"),
            Self::Performance => write!(f, "performance"),
            Self::Compliance => write!(f, "compliance"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeArtifact {
    pub problem_statement: String,
    pub goals: Vec<String>,
    /// One of `low`, `medium`, `high`.
    pub risk_lane: String,
    /// `none` unless regulated data is in scope (e.g. `phi`). Empty is treated
    /// as regulated.
    pub data_classification: String,
    /// Source key → locator (URL, path, dataset name).
    pub sources: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisArtifact {
    pub summary: String,
    pub key_findings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewArtifact {
    pub perspective: ReviewPerspective,
    pub verdict: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionArtifact {
    /// e.g. `proceed`, `revise`, `stop`.
    pub outcome: String,
    pub rationale: String,
    pub adr_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalArtifact {
    pub summary: String,
    pub proposal_ids: Vec<String>,
    /// Once frozen, scope changes require a new case.
    pub frozen: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImplementationBrief {
    pub acceptance_criteria: Vec<String>,
    pub test_requirements: Vec<String>,
    pub rollback_plan: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationReport {
    pub overall_pass: bool,
    pub metrics: BTreeMap<String, f64>,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeBudget {
    pub max_prs: u32,
    pub prs_used: u32,
    pub max_iterations: u32,
    pub iterations_used: u32,
}

impl Default for ChangeBudget {
    fn default() -> Self {
        Self {
            max_prs: 3,
            prs_used: 0,
            max_iterations: 3,
            iterations_used: 0,
        }
    }
}

/// Identifiers of records produced downstream of the case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseReferences {
    pub proposal_ids: Vec<String>,
    pub release_ids: Vec<String>,
    pub deliberation_ids: Vec<String>,
}

/// One improvement initiative moving through the overlay pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchCase {
    /// `RC-YYYYMMDD-slug`.
    pub case_id: String,
    pub title: String,
    pub status: ResearchStatus,
    pub current_overlay: String,
    pub overlay_index: usize,
    #[serde(default)]
    pub intake: Option<IntakeArtifact>,
    #[serde(default)]
    pub synthesis: Option<SynthesisArtifact>,
    #[serde(default)]
    pub reviews: BTreeMap<ReviewPerspective, ReviewArtifact>,
    #[serde(default)]
    pub decision: Option<DecisionArtifact>,
    #[serde(default)]
    pub proposal: Option<ProposalArtifact>,
    #[serde(default)]
    pub implementation_brief: Option<ImplementationBrief>,
    #[serde(default)]
    pub evaluation: Option<EvaluationReport>,
    #[serde(default)]
    pub change_budget: ChangeBudget,
    #[serde(default)]
    pub references: CaseReferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResearchCase {
    /// New case at `intake`, with id `RC-<date>-<slug>`.
    pub fn open(slug: &str, title: &str, date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            case_id: format!("RC-{}-{}", date.format("%Y%m%d"), slug),
            title: title.to_string(),
            status: ResearchStatus::Intake,
            current_overlay: OVERLAYS[0].to_string(),
            overlay_index: 0,
            intake: None,
            synthesis: None,
            reviews: BTreeMap::new(),
            decision: None,
            proposal: None,
            implementation_brief: None,
            evaluation: None,
            change_budget: ChangeBudget::default(),
            references: CaseReferences::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set `status` and move the overlay position to match it.
    pub fn set_status(&mut self, status: ResearchStatus) {
        self.status = status;
        if let Some(index) = status.overlay_index() {
            self.overlay_index = index;
            self.current_overlay = OVERLAYS[index].to_string();
        }
        self.updated_at = Utc::now();
    }

    pub fn add_review(&mut self, review: ReviewArtifact) {
        self.reviews.insert(review.perspective, review);
    }

    /// Review perspectives with no review yet.
    pub fn missing_reviews(&self) -> Vec<ReviewPerspective> {
        ReviewPerspective::ALL
            .into_iter()
            .filter(|p| !self.reviews.contains_key(p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_builds_case_id() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let case = ResearchCase::open("retry-budget", "Retry budget", date);
        assert_eq!(case.case_id, "RC-20240309-retry-budget");
        assert_eq!(case.status, ResearchStatus::Intake);
        assert_eq!(case.current_overlay, "intake");
        assert_eq!(case.overlay_index, 0);
    }

    #[test]
    fn test_set_status_moves_position() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let mut case = ResearchCase::open("x", "x", date);
        case.set_status(ResearchStatus::Evaluate);
        assert_eq!(case.overlay_index, 6);
        assert_eq!(case.current_overlay, "evaluate");

        case.set_status(ResearchStatus::Deferred);
        assert_eq!(case.overlay_index, 6);
        assert_eq!(case.current_overlay, "evaluate");
    }

    #[test]
    fn test_index_roundtrip() {
        for index in 0..OVERLAYS.len() {
            let status = ResearchStatus::from_overlay_index(index).unwrap();
            assert_eq!(status.overlay_index(), Some(index));
            assert_eq!(status.to_string(), OVERLAYS[index]);
        }
        assert!(ResearchStatus::from_overlay_index(8).is_none());
    }

    #[test]
    fn test_missing_reviews() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let mut case = ResearchCase::open("x", "x", date);
        assert_eq!(case.missing_reviews().len(), 5);
        case.add_review(ReviewArtifact {
            perspective: ReviewPerspective::Security,
            verdict: "approve".to_string(),
            notes: String::new(),
        });
        assert_eq!(case.missing_reviews().len(), 4);
        assert!(!case.missing_reviews().contains(&ReviewPerspective::Security));
    }

    #[test]
    fn test_reviews_serialize_with_perspective_keys() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let mut case = ResearchCase::open("x", "x", date);
        case.add_review(ReviewArtifact {
            perspective: ReviewPerspective::Devex,
            verdict: "approve".to_string(),
            notes: String::new(),
        });
        let json = serde_json::to_value(&case).unwrap();
        assert_eq!(json["reviews"]["devex"]["verdict"], "approve");
        let back: ResearchCase = serde_json::from_value(json).unwrap();
        assert_eq!(back, case);
    }
}
