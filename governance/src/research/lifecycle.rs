//! Validator-gated research case transitions.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::case::{ResearchCase, ResearchStatus};
use super::validator::{validate_case, Severity, ValidationReport};
use crate::audit::{AuditEvent, AuditLog};
use crate::error::{GovernanceError, GovernanceResult};
use crate::store::Ledger;

/// Result of a case transition request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseAdvance {
    pub success: bool,
    pub case_id: String,
    pub from: ResearchStatus,
    /// Requested status; equals `from` when no target could be determined.
    pub to: ResearchStatus,
    pub message: String,
    /// Validation of the candidate state, when one was built.
    pub report: Option<ValidationReport>,
}

impl CaseAdvance {
    fn rejected(case: &ResearchCase, to: ResearchStatus, message: String) -> Self {
        Self {
            success: false,
            case_id: case.case_id.clone(),
            from: case.status,
            to,
            message,
            report: None,
        }
    }
}

pub struct ResearchLifecycle {
    ledger: Ledger,
    audit: Arc<dyn AuditLog>,
}

impl ResearchLifecycle {
    pub fn new(ledger: Ledger, audit: Arc<dyn AuditLog>) -> Self {
        Self { ledger, audit }
    }

    pub fn open_case(&self, case: &ResearchCase, actor: &str) -> GovernanceResult<()> {
        self.ledger.put_case(case)?;
        info!(case_id = %case.case_id, "Research case opened");
        self.audit.record(
            AuditEvent::new("case_opened", actor, "research_case", &case.case_id)
                .with_details(serde_json::json!({ "title": case.title })),
        );
        Ok(())
    }

    /// Persist artifact edits without changing status.
    pub fn save_case(&self, case: &ResearchCase) -> GovernanceResult<()> {
        self.ledger.put_case(case)?;
        Ok(())
    }

    pub fn load(&self, case_id: &str) -> GovernanceResult<ResearchCase> {
        self.ledger
            .get_case(case_id)?
            .ok_or_else(|| GovernanceError::CaseNotFound(case_id.to_string()))
    }

    /// Move to the next overlay if the case validates there.
    pub fn advance(&self, case_id: &str, actor: &str) -> GovernanceResult<CaseAdvance> {
        let case = self.load(case_id)?;
        let next = case
            .status
            .overlay_index()
            .filter(|_| !case.status.is_terminal())
            .and_then(|index| ResearchStatus::from_overlay_index(index + 1));
        let Some(next) = next else {
            return Ok(self.refuse(
                &case,
                case.status,
                format!("no next overlay from {}", case.status),
            ));
        };
        self.gated(case, next, actor, |_| {})
    }

    /// Send an evaluated case back to implementation for another iteration.
    pub fn reiterate(&self, case_id: &str, actor: &str) -> GovernanceResult<CaseAdvance> {
        let case = self.load(case_id)?;
        if case.status != ResearchStatus::Evaluate {
            return Ok(self.refuse(
                &case,
                ResearchStatus::Implement,
                format!("re-iteration only from evaluate, case is {}", case.status),
            ));
        }
        self.gated(case, ResearchStatus::Implement, actor, |c| {
            c.change_budget.iterations_used += 1;
        })
    }

    pub fn complete(&self, case_id: &str, actor: &str) -> GovernanceResult<CaseAdvance> {
        let case = self.load(case_id)?;
        if case.status != ResearchStatus::Release {
            return Ok(self.refuse(
                &case,
                ResearchStatus::Completed,
                format!("completion only from release, case is {}", case.status),
            ));
        }
        self.gated(case, ResearchStatus::Completed, actor, |_| {})
    }

    pub fn reject(&self, case_id: &str, reason: &str, actor: &str) -> GovernanceResult<CaseAdvance> {
        self.close(case_id, ResearchStatus::Rejected, reason, actor)
    }

    pub fn defer(&self, case_id: &str, reason: &str, actor: &str) -> GovernanceResult<CaseAdvance> {
        self.close(case_id, ResearchStatus::Deferred, reason, actor)
    }

    /// Reject or defer; allowed from any non-terminal state without validation.
    fn close(
        &self,
        case_id: &str,
        to: ResearchStatus,
        reason: &str,
        actor: &str,
    ) -> GovernanceResult<CaseAdvance> {
        let mut case = self.load(case_id)?;
        if case.status.is_terminal() {
            return Ok(self.refuse(&case, to, format!("case already {}", case.status)));
        }
        let from = case.status;
        case.set_status(to);
        self.ledger.put_case(&case)?;
        self.audit_transition(&case, from, actor, reason);
        Ok(CaseAdvance {
            success: true,
            case_id: case.case_id.clone(),
            from,
            to,
            message: format!("case {} {}: {}", case.case_id, to, reason),
            report: None,
        })
    }

    /// Build the candidate state, validate it, and commit only if it passes.
    fn gated(
        &self,
        case: ResearchCase,
        to: ResearchStatus,
        actor: &str,
        mutate: impl FnOnce(&mut ResearchCase),
    ) -> GovernanceResult<CaseAdvance> {
        let from = case.status;
        let mut candidate = case;
        mutate(&mut candidate);
        candidate.set_status(to);

        let report = validate_case(&candidate);
        if !report.passed {
            let failed: Vec<&str> = report
                .failures()
                .filter(|c| c.severity == Severity::Error)
                .map(|c| c.name.as_str())
                .collect();
            let message = format!(
                "case {} cannot move from {} to {}: failed {}",
                candidate.case_id,
                from,
                to,
                failed.join(", ")
            );
            warn!(case_id = %candidate.case_id, %from, %to, "Research case transition refused");
            return Ok(CaseAdvance {
                success: false,
                case_id: candidate.case_id.clone(),
                from,
                to,
                message,
                report: Some(report),
            });
        }

        self.ledger.put_case(&candidate)?;
        self.audit_transition(&candidate, from, actor, "");
        Ok(CaseAdvance {
            success: true,
            case_id: candidate.case_id.clone(),
            from,
            to,
            message: format!("case {} moved from {} to {}", candidate.case_id, from, to),
            report: Some(report),
        })
    }

    fn refuse(&self, case: &ResearchCase, to: ResearchStatus, message: String) -> CaseAdvance {
        warn!(case_id = %case.case_id, from = %case.status, %to, "Research case transition refused");
        CaseAdvance::rejected(case, to, message)
    }

    fn audit_transition(&self, case: &ResearchCase, from: ResearchStatus, actor: &str, reason: &str) {
        info!(case_id = %case.case_id, %from, to = %case.status, "Research case transitioned");
        self.audit.record(
            AuditEvent::new("case_transitioned", actor, "research_case", &case.case_id).with_details(
                serde_json::json!({
                    "from": from,
                    "to": case.status,
                    "overlay_index": case.overlay_index,
                    "iterations_used": case.change_budget.iterations_used,
                    "reason": reason,
                }),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::HashChainLog;
    use crate::research::case::{
        DecisionArtifact, EvaluationReport, ImplementationBrief, IntakeArtifact, ProposalArtifact,
        ReviewArtifact, ReviewPerspective, SynthesisArtifact,
    };
    use chrono::NaiveDate;

    fn lifecycle() -> (ResearchLifecycle, Arc<HashChainLog>) {
        let audit = Arc::new(HashChainLog::new());
        (ResearchLifecycle::new(Ledger::in_memory(), audit.clone()), audit)
    }

    fn new_case() -> ResearchCase {
        let mut case = ResearchCase::open(
            "retry-budget",
            "Retry budget",
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        );
        case.intake = Some(IntakeArtifact {
            problem_statement: "Retries amplify outages".to_string(),
            goals: vec!["Bound retries".to_string()],
            risk_lane: "low".to_string(),
            data_classification: "none".to_string(),
            sources: [("incident-42".to_string(), "postmortem".to_string())].into(),
        });
        case
    }

    fn fill_all(case: &mut ResearchCase) {
        case.synthesis = Some(SynthesisArtifact::default());
        for perspective in ReviewPerspective::ALL {
            case.add_review(ReviewArtifact {
                perspective,
                verdict: "approve".to_string(),
                notes: String::new(),
            });
        }
        case.decision = Some(DecisionArtifact::default());
        case.proposal = Some(ProposalArtifact {
            frozen: true,
            ..Default::default()
        });
        case.implementation_brief = Some(ImplementationBrief {
            acceptance_criteria: vec!["a".to_string()],
            test_requirements: vec!["t".to_string()],
            rollback_plan: "revert".to_string(),
        });
        case.evaluation = Some(EvaluationReport {
            overall_pass: true,
            ..Default::default()
        });
        case.references.release_ids.push("rel-1".to_string());
    }

    #[test]
    fn test_advance_blocked_until_artifact_present() {
        let (lc, audit) = lifecycle();
        let mut case = new_case();
        lc.open_case(&case, "alice").unwrap();

        let outcome = lc.advance(&case.case_id, "alice").unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("synthesis_present"));
        assert_eq!(lc.load(&case.case_id).unwrap().status, ResearchStatus::Intake);

        case.synthesis = Some(SynthesisArtifact::default());
        lc.save_case(&case).unwrap();
        let outcome = lc.advance(&case.case_id, "alice").unwrap();
        assert!(outcome.success);
        let stored = lc.load(&case.case_id).unwrap();
        assert_eq!(stored.status, ResearchStatus::Synthesis);
        assert_eq!(stored.overlay_index, 1);
        assert_eq!(audit.len(), 2);
    }

    #[test]
    fn test_full_pipeline_and_completion() {
        let (lc, _) = lifecycle();
        let mut case = new_case();
        fill_all(&mut case);
        lc.open_case(&case, "alice").unwrap();

        for _ in 0..7 {
            assert!(lc.advance(&case.case_id, "alice").unwrap().success);
        }
        assert_eq!(lc.load(&case.case_id).unwrap().status, ResearchStatus::Release);
        assert!(!lc.advance(&case.case_id, "alice").unwrap().success);

        let done = lc.complete(&case.case_id, "alice").unwrap();
        assert!(done.success);
        assert_eq!(lc.load(&case.case_id).unwrap().status, ResearchStatus::Completed);
        assert!(!lc.reject(&case.case_id, "late", "alice").unwrap().success);
    }

    #[test]
    fn test_reiteration_consumes_budget() {
        let (lc, _) = lifecycle();
        let mut case = new_case();
        fill_all(&mut case);
        case.change_budget.max_iterations = 1;
        case.set_status(ResearchStatus::Evaluate);
        lc.open_case(&case, "alice").unwrap();

        let first = lc.reiterate(&case.case_id, "alice").unwrap();
        assert!(first.success);
        let stored = lc.load(&case.case_id).unwrap();
        assert_eq!(stored.status, ResearchStatus::Implement);
        assert_eq!(stored.change_budget.iterations_used, 1);

        assert!(lc.advance(&case.case_id, "alice").unwrap().success);
        let second = lc.reiterate(&case.case_id, "alice").unwrap();
        assert!(!second.success);
        assert!(second.message.contains("iteration_budget"));
        assert_eq!(lc.load(&case.case_id).unwrap().change_budget.iterations_used, 1);
    }

    #[test]
    fn test_reiterate_only_from_evaluate() {
        let (lc, _) = lifecycle();
        let case = new_case();
        lc.open_case(&case, "alice").unwrap();
        assert!(!lc.reiterate(&case.case_id, "alice").unwrap().success);
    }

    #[test]
    fn test_complete_only_from_release() {
        let (lc, _) = lifecycle();
        let case = new_case();
        lc.open_case(&case, "alice").unwrap();
        assert!(!lc.complete(&case.case_id, "alice").unwrap().success);
    }

    #[test]
    fn test_defer_keeps_position_and_is_terminal() {
        let (lc, _) = lifecycle();
        let mut case = new_case();
        fill_all(&mut case);
        case.set_status(ResearchStatus::Decision);
        lc.open_case(&case, "alice").unwrap();

        let outcome = lc.defer(&case.case_id, "waiting on vendor", "bob").unwrap();
        assert!(outcome.success);
        let stored = lc.load(&case.case_id).unwrap();
        assert_eq!(stored.status, ResearchStatus::Deferred);
        assert_eq!(stored.overlay_index, 3);
        assert!(!lc.advance(&case.case_id, "bob").unwrap().success);
        assert!(!lc.defer(&case.case_id, "again", "bob").unwrap().success);
    }

    #[test]
    fn test_missing_case_is_error() {
        let (lc, _) = lifecycle();
        assert!(matches!(
            lc.advance("RC-20240101-none", "alice"),
            Err(GovernanceError::CaseNotFound(_))
        ));
    }
}
