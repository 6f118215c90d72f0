//! Research case lifecycle against a file-backed ledger.

use std::sync::Arc;

use chrono::NaiveDate;
use governance::research::{
    DecisionArtifact, EvaluationReport, ImplementationBrief, IntakeArtifact, ProposalArtifact,
    ReviewArtifact, ReviewPerspective, SynthesisArtifact,
};
use governance::{
    validate_case, AuditQuery, HashChainLog, JsonDirStore, Ledger, ResearchCase,
    ResearchLifecycle, ResearchStatus,
};

fn intake(classification: &str) -> IntakeArtifact {
    IntakeArtifact {
        problem_statement: "Cold starts exceed the latency objective".to_string(),
        goals: vec!["p99 cold start under 800ms".to_string()],
        risk_lane: "medium".to_string(),
        data_classification: classification.to_string(),
        sources: [("trace-export".to_string(), "s3://traces/cold".to_string())].into(),
    }
}

#[test]
fn research_case_walks_every_overlay() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::new(Arc::new(JsonDirStore::open(dir.path()).unwrap()));
    let audit = Arc::new(HashChainLog::new());
    let lifecycle = ResearchLifecycle::new(ledger, audit.clone());

    let mut case = ResearchCase::open(
        "cold-start",
        "Cold start latency",
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
    );
    case.intake = Some(intake("none"));
    lifecycle.open_case(&case, "researcher").unwrap();
    let id = case.case_id.clone();

    // Each overlay's artifact is attached just before the move that needs it.
    let attach = |status: ResearchStatus, case: &mut ResearchCase| match status {
        ResearchStatus::Synthesis => case.synthesis = Some(SynthesisArtifact::default()),
        ResearchStatus::Review => {
            for perspective in ReviewPerspective::ALL {
                case.add_review(ReviewArtifact {
                    perspective,
                    verdict: "approve".to_string(),
                    notes: String::new(),
                });
            }
        }
        ResearchStatus::Decision => {
            case.decision = Some(DecisionArtifact {
                outcome: "proceed".to_string(),
                ..Default::default()
            })
        }
        ResearchStatus::Proposal => {
            case.proposal = Some(ProposalArtifact {
                frozen: true,
                ..Default::default()
            })
        }
        ResearchStatus::Implement => {
            case.implementation_brief = Some(ImplementationBrief {
                acceptance_criteria: vec!["p99 under 800ms".to_string()],
                test_requirements: vec!["load test".to_string()],
                rollback_plan: "disable snapshot flag".to_string(),
            })
        }
        ResearchStatus::Evaluate => {
            case.evaluation = Some(EvaluationReport {
                overall_pass: true,
                ..Default::default()
            })
        }
        ResearchStatus::Release => case.references.release_ids.push("rel-1".to_string()),
        _ => {}
    };

    for index in 1..8 {
        let next = ResearchStatus::from_overlay_index(index).unwrap();
        let blocked = lifecycle.advance(&id, "researcher").unwrap();
        if next != ResearchStatus::Release {
            assert!(!blocked.success, "{} advanced without its artifact", next);
        }

        let mut stored = lifecycle.load(&id).unwrap();
        attach(next, &mut stored);
        lifecycle.save_case(&stored).unwrap();
        if blocked.success {
            continue;
        }
        let moved = lifecycle.advance(&id, "researcher").unwrap();
        assert!(moved.success, "{}", moved.message);
        assert_eq!(moved.to, next);
    }

    assert!(lifecycle.complete(&id, "researcher").unwrap().success);
    let done = lifecycle.load(&id).unwrap();
    assert_eq!(done.status, ResearchStatus::Completed);
    assert!(validate_case(&done).passed);

    let transitions = audit.query(&AuditQuery {
        action: Some("case_transitioned".to_string()),
        target_id: Some(id.clone()),
        ..Default::default()
    });
    assert_eq!(transitions.len(), 8);
    assert_eq!(audit.verify_chain().unwrap(), 9);
}

#[test]
fn phi_case_with_external_source_cannot_advance() {
    let audit = Arc::new(HashChainLog::new());
    let lifecycle = ResearchLifecycle::new(Ledger::in_memory(), audit);

    let mut case = ResearchCase::open(
        "triage-notes",
        "Summarize triage notes",
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
    );
    let mut phi = intake("phi");
    phi.sources
        .insert("openai-summaries".to_string(), "api".to_string());
    case.intake = Some(phi);
    case.synthesis = Some(SynthesisArtifact::default());
    lifecycle.open_case(&case, "researcher").unwrap();

    let outcome = lifecycle.advance(&case.case_id, "researcher").unwrap();
    assert!(!outcome.success);
    let report = outcome.report.unwrap();
    assert!(!report.check("phi_external_ingestion").unwrap().passed);

    let rejected = lifecycle
        .reject(&case.case_id, "regulated data cannot leave the boundary", "researcher")
        .unwrap();
    assert!(rejected.success);
    assert_eq!(
        lifecycle.load(&case.case_id).unwrap().status,
        ResearchStatus::Rejected
    );
}
