//! Research case validator.
//!
//! Pure and total: every call returns the full list of checks that apply to
//! the case's current position. Checks for overlay step *k* appear only once
//! `overlay_index >= k`; the structural, PHI and budget checks always appear.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::case::{ResearchCase, OVERLAYS};

static CASE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^RC-(\d{8})-[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid regex")
});

/// Source-key fragments naming third-party model providers.
const EXTERNAL_PROVIDERS: &[&str] = &[
    "openai",
    "anthropic",
    "claude",
    "gemini",
    "vertex",
    "bedrock",
    "cohere",
    "mistral",
    "perplexity",
    "huggingface",
    "together",
    "groq",
];

const RISK_LANES: &[&str] = &["low", "medium", "high"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub name: String,
    pub severity: Severity,
    pub passed: bool,
    pub message: String,
}

impl ValidationCheck {
    fn new(name: &str, severity: Severity, passed: bool, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            severity,
            passed,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub case_id: String,
    pub checks: Vec<ValidationCheck>,
    /// True iff no error-severity check failed.
    pub passed: bool,
    pub validated_at: DateTime<Utc>,
}

impl ValidationReport {
    pub fn failures(&self) -> impl Iterator<Item = &ValidationCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }

    pub fn check(&self, name: &str) -> Option<&ValidationCheck> {
        self.checks.iter().find(|c| c.name == name)
    }
}

pub fn validate_case(case: &ResearchCase) -> ValidationReport {
    let mut checks = Vec::new();

    structural_checks(case, &mut checks);
    phi_check(case, &mut checks);
    step_checks(case, &mut checks);
    budget_checks(case, &mut checks);

    let passed = !checks
        .iter()
        .any(|c| c.severity == Severity::Error && !c.passed);

    ValidationReport {
        case_id: case.case_id.clone(),
        checks,
        passed,
        validated_at: Utc::now(),
    }
}

fn case_id_valid(case_id: &str) -> bool {
    CASE_ID_RE
        .captures(case_id)
        .and_then(|caps| caps.get(1))
        .is_some_and(|date| NaiveDate::parse_from_str(date.as_str(), "%Y%m%d").is_ok())
}

fn structural_checks(case: &ResearchCase, checks: &mut Vec<ValidationCheck>) {
    checks.push(ValidationCheck::new(
        "case_id_format",
        Severity::Error,
        case_id_valid(&case.case_id),
        format!("case id '{}' must match RC-YYYYMMDD-slug", case.case_id),
    ));

    let position_ok = match case.status.overlay_index() {
        Some(index) => case.overlay_index == index,
        None => case.overlay_index < OVERLAYS.len(),
    } && OVERLAYS.get(case.overlay_index) == Some(&case.current_overlay.as_str());
    checks.push(ValidationCheck::new(
        "overlay_position",
        Severity::Error,
        position_ok,
        format!(
            "status {} at overlay {} ({})",
            case.status, case.overlay_index, case.current_overlay
        ),
    ));

    let intake = case.intake.as_ref();
    checks.push(ValidationCheck::new(
        "intake_present",
        Severity::Error,
        intake.is_some(),
        "intake artifact is required",
    ));
    checks.push(ValidationCheck::new(
        "goals_defined",
        Severity::Error,
        intake.is_some_and(|i| i.goals.iter().any(|g| !g.trim().is_empty())),
        "intake must list at least one goal",
    ));
    checks.push(ValidationCheck::new(
        "risk_lane_valid",
        Severity::Error,
        intake.is_some_and(|i| RISK_LANES.contains(&i.risk_lane.as_str())),
        "risk lane must be low, medium or high",
    ));
}

/// External ingestion is forbidden unless the intake declares no regulated
/// data. A missing classification counts as regulated.
fn phi_check(case: &ResearchCase, checks: &mut Vec<ValidationCheck>) {
    let Some(intake) = &case.intake else {
        return;
    };
    let classification = intake.data_classification.trim().to_lowercase();
    let in_scope = classification != "none";

    let offending: Vec<&str> = if in_scope {
        intake
            .sources
            .keys()
            .filter(|key| {
                let key = key.to_lowercase();
                EXTERNAL_PROVIDERS.iter().any(|p| key.contains(p))
            })
            .map(String::as_str)
            .collect()
    } else {
        Vec::new()
    };

    let message = if offending.is_empty() {
        format!("data classification '{}': no external providers", classification)
    } else {
        format!(
            "data classification '{}' forbids external providers: {}",
            classification,
            offending.join(", ")
        )
    };
    checks.push(ValidationCheck::new(
        "phi_external_ingestion",
        Severity::Error,
        offending.is_empty(),
        message,
    ));
}

fn step_checks(case: &ResearchCase, checks: &mut Vec<ValidationCheck>) {
    let reached = |step: usize| case.overlay_index >= step;

    if reached(0) {
        checks.push(ValidationCheck::new(
            "sources_present",
            Severity::Error,
            case.intake.as_ref().is_some_and(|i| !i.sources.is_empty()),
            "intake must name at least one source",
        ));
    }
    if reached(1) {
        checks.push(ValidationCheck::new(
            "synthesis_present",
            Severity::Error,
            case.synthesis.is_some(),
            "synthesis artifact is required",
        ));
    }
    if reached(2) {
        let missing = case.missing_reviews();
        let message = if missing.is_empty() {
            "all five reviews present".to_string()
        } else {
            let names: Vec<String> = missing.iter().map(|p| p.to_string()).collect();
            format!("missing reviews: {}", names.join(", "))
        };
        checks.push(ValidationCheck::new(
            "reviews_complete",
            Severity::Error,
            missing.is_empty(),
            message,
        ));
    }
    if reached(3) {
        checks.push(ValidationCheck::new(
            "decision_present",
            Severity::Error,
            case.decision.is_some(),
            "decision artifact is required",
        ));
    }
    if reached(4) {
        checks.push(ValidationCheck::new(
            "proposal_frozen",
            Severity::Error,
            case.proposal.as_ref().is_some_and(|p| p.frozen),
            "proposal must be frozen before implementation",
        ));
    }
    if reached(5) {
        let complete = case.implementation_brief.as_ref().is_some_and(|b| {
            !b.acceptance_criteria.is_empty()
                && !b.test_requirements.is_empty()
                && !b.rollback_plan.trim().is_empty()
        });
        checks.push(ValidationCheck::new(
            "implementation_brief_complete",
            Severity::Error,
            complete,
            "brief needs acceptance criteria, test requirements and a rollback plan",
        ));
    }
    if reached(6) {
        checks.push(ValidationCheck::new(
            "evaluation_passed",
            Severity::Error,
            case.evaluation.as_ref().is_some_and(|e| e.overall_pass),
            "evaluation report must pass overall",
        ));
    }
    if reached(7) {
        checks.push(ValidationCheck::new(
            "release_linked",
            Severity::Warning,
            !case.references.release_ids.is_empty(),
            "no release recorded for this case",
        ));
    }
}

fn budget_checks(case: &ResearchCase, checks: &mut Vec<ValidationCheck>) {
    let budget = &case.change_budget;
    checks.push(ValidationCheck::new(
        "iteration_budget",
        Severity::Error,
        budget.iterations_used <= budget.max_iterations,
        format!(
            "{} of {} iterations used",
            budget.iterations_used, budget.max_iterations
        ),
    ));
    checks.push(ValidationCheck::new(
        "pr_budget",
        Severity::Info,
        budget.prs_used <= budget.max_prs,
        format!("{} of {} PRs used", budget.prs_used, budget.max_prs),
    ));
}
