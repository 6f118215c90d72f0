//! Subcommand handlers. Each returns the JSON document printed on stdout.

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use fs2::FileExt;
use governance::hysteresis::DecisionRegistry;
use governance::model::DeliveryPlan;
use governance::{
    validate_case, Adr, AntiOscillationEngine, AuditQuery, ConsensusEngine, ConsensusResult,
    DecisionIndex, FindingBatch, GovernanceConfig, HashChainLog, ImprovementProposal,
    JsonDirStore, Ledger, ReleaseManager, ReleaseStatus, ResearchCase, ResearchLifecycle,
    StaticPolicy, TriageEngine,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::Settings;

/// Read a JSON document from `path`, or stdin when `path` is `-` or absent.
pub fn read_input<T: serde::de::DeserializeOwned>(path: Option<&Path>) -> Result<T> {
    let raw = match path {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p)
            .with_context(|| format!("reading input {}", p.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading input from stdin")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("parsing input JSON")
}

/// Name of the lock file that serializes `steward` runs on one data directory.
pub const LOCK_FILE: &str = "steward.lock";

/// File-backed decision plane rooted at the configured data directory.
///
/// Holds an exclusive lock on the data directory for its whole lifetime, so
/// overlapping runs (two triage passes on one target, say) execute one after
/// the other.
pub struct Plane {
    pub config: GovernanceConfig,
    pub ledger: Ledger,
    pub audit: Arc<HashChainLog>,
    pub index: Arc<DecisionIndex>,
    _lock: File,
}

fn lock_data_dir(data_dir: &Path) -> Result<File> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let path = data_dir.join(LOCK_FILE);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .with_context(|| format!("opening lock file {}", path.display()))?;
    if file.try_lock_exclusive().is_err() {
        info!(path = %path.display(), "Waiting for another steward run to finish");
        file.lock_exclusive()
            .with_context(|| format!("locking {}", path.display()))?;
    }
    Ok(file)
}

impl Plane {
    pub fn open(settings: &Settings) -> Result<Self> {
        let lock = lock_data_dir(&settings.data_dir)?;
        let records = settings.data_dir.join("records");
        let store = JsonDirStore::open(&records)
            .with_context(|| format!("opening record store {}", records.display()))?;
        let audit_path = settings.data_dir.join("audit.jsonl");
        let audit = HashChainLog::open(&audit_path)
            .with_context(|| format!("opening audit log {}", audit_path.display()))?;

        let plane = Self {
            config: settings.governance.clone(),
            ledger: Ledger::new(Arc::new(store)),
            audit: Arc::new(audit),
            index: Arc::new(DecisionIndex::new()),
            _lock: lock,
        };
        let indexed = plane.registry().rebuild_index()?;
        debug!(indexed, data_dir = %settings.data_dir.display(), "Decision plane opened");
        Ok(plane)
    }

    fn registry(&self) -> DecisionRegistry {
        DecisionRegistry::new(self.ledger.clone(), self.index.clone(), self.audit.clone())
    }

    fn oscillation(&self) -> Arc<AntiOscillationEngine> {
        Arc::new(AntiOscillationEngine::new(
            self.config.clone(),
            self.ledger.clone(),
            self.index.clone(),
            self.audit.clone(),
        ))
    }

    fn releases(&self) -> ReleaseManager {
        ReleaseManager::new(self.ledger.clone(), self.audit.clone())
    }

    fn research(&self) -> ResearchLifecycle {
        ResearchLifecycle::new(self.ledger.clone(), self.audit.clone())
    }
}

// ============================================================================
// Consensus and triage
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ConsensusInput {
    pub target_id: String,
    pub batches: Vec<FindingBatch>,
}

pub fn consensus(plane: &Plane, input: ConsensusInput) -> Result<Value> {
    let result = ConsensusEngine::new(&plane.config).compute(&input.batches, &input.target_id);
    info!(
        target_id = %result.target_id,
        findings = result.findings.len(),
        "Consensus computed"
    );
    Ok(serde_json::to_value(result)?)
}

pub fn triage(plane: &Plane, consensus: ConsensusResult) -> Result<Value> {
    let engine = TriageEngine::new(
        plane.config.clone(),
        plane.ledger.clone(),
        Arc::new(StaticPolicy::default()),
        plane.oscillation(),
        plane.audit.clone(),
    );
    Ok(serde_json::to_value(engine.triage_findings(&consensus)?)?)
}

// ============================================================================
// Anti-oscillation
// ============================================================================

pub fn check_oscillation(
    plane: &Plane,
    proposal: ImprovementProposal,
    confidence: f64,
) -> Result<Value> {
    let check = plane.oscillation().check_oscillation(&proposal, confidence, None)?;
    Ok(serde_json::to_value(check)?)
}

pub fn should_flip(plane: &Plane, adr_id: &str, confidence: f64) -> Result<Value> {
    let adr = plane
        .ledger
        .get_adr(adr_id)?
        .with_context(|| format!("decision {} not found", adr_id))?;
    let flip = plane.oscillation().should_flip(&adr, confidence, Utc::now());
    Ok(serde_json::to_value(flip)?)
}

pub fn detect_reversion(plane: &Plane, proposal: ImprovementProposal) -> Result<Value> {
    Ok(serde_json::to_value(
        plane.oscillation().detect_reversion(&proposal),
    )?)
}

pub fn stability(plane: &Plane, server_id: &str) -> Result<Value> {
    Ok(serde_json::to_value(
        plane.oscillation().compute_stability_score(server_id)?,
    )?)
}

#[derive(Debug, Deserialize)]
pub struct DecisionInput {
    pub title: String,
    pub decision: String,
    pub confidence: f64,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub related_proposals: Vec<String>,
}

pub fn record_decision(
    plane: &Plane,
    input: DecisionInput,
    supersedes: Option<&str>,
    actor: &str,
) -> Result<Value> {
    let mut adr = Adr::new(&input.title, &input.decision, input.confidence, &plane.config);
    adr.context = input.context;
    adr.related_proposals = input.related_proposals;

    let registry = plane.registry();
    match supersedes {
        Some(old_id) => {
            let outcome = registry.supersede_decision(old_id, &adr, actor)?;
            Ok(json!({ "adr": adr, "supersede": outcome }))
        }
        None => {
            registry.record_decision(&adr, actor)?;
            Ok(json!({ "adr": adr }))
        }
    }
}

// ============================================================================
// Releases
// ============================================================================

pub fn create_plan(plane: &Plane, target_id: &str, proposal_ids: Vec<String>) -> Result<Value> {
    let plan = DeliveryPlan::new(target_id, proposal_ids);
    plane.ledger.put_delivery_plan(&plan)?;
    info!(plan_id = %plan.id, target_id, "Delivery plan stored");
    Ok(serde_json::to_value(plan)?)
}

pub fn create_release(plane: &Plane, plan_id: &str, actor: &str) -> Result<Value> {
    Ok(serde_json::to_value(
        plane.releases().create_release(plan_id, actor)?,
    )?)
}

pub fn advance_release(
    plane: &Plane,
    release_id: &str,
    to: ReleaseStatus,
    actor: &str,
) -> Result<Value> {
    Ok(serde_json::to_value(
        plane.releases().advance_release(release_id, to, actor)?,
    )?)
}

pub fn rollback_release(plane: &Plane, release_id: &str, reason: &str, actor: &str) -> Result<Value> {
    Ok(serde_json::to_value(
        plane.releases().rollback_release(release_id, reason, actor)?,
    )?)
}

// ============================================================================
// Research cases
// ============================================================================

/// Validate a stored case, or a case document given directly.
pub fn validate(plane: &Plane, case_id: Option<&str>, input: Option<&Path>) -> Result<Value> {
    let case: ResearchCase = match case_id {
        Some(id) => plane.research().load(id)?,
        None => read_input(input)?,
    };
    Ok(serde_json::to_value(validate_case(&case))?)
}

pub fn open_case(plane: &Plane, case: ResearchCase, actor: &str) -> Result<Value> {
    plane.research().open_case(&case, actor)?;
    Ok(serde_json::to_value(case)?)
}

pub fn save_case(plane: &Plane, case: ResearchCase) -> Result<Value> {
    plane.research().save_case(&case)?;
    Ok(serde_json::to_value(case)?)
}

#[derive(Debug, Clone, Copy)]
pub enum CaseMove {
    Advance,
    Reiterate,
    Complete,
    Reject,
    Defer,
}

pub fn move_case(
    plane: &Plane,
    case_id: &str,
    action: CaseMove,
    reason: &str,
    actor: &str,
) -> Result<Value> {
    let research = plane.research();
    let outcome = match action {
        CaseMove::Advance => research.advance(case_id, actor)?,
        CaseMove::Reiterate => research.reiterate(case_id, actor)?,
        CaseMove::Complete => research.complete(case_id, actor)?,
        CaseMove::Reject => research.reject(case_id, reason, actor)?,
        CaseMove::Defer => research.defer(case_id, reason, actor)?,
    };
    Ok(serde_json::to_value(outcome)?)
}

// ============================================================================
// Audit
// ============================================================================

pub fn audit_verify(plane: &Plane) -> Result<Value> {
    Ok(match plane.audit.verify_chain() {
        Ok(verified) => json!({ "intact": true, "entries": verified }),
        Err(e) => json!({ "intact": false, "entries": plane.audit.len(), "error": e.to_string() }),
    })
}

pub fn audit_query(plane: &Plane, query: &AuditQuery) -> Result<Value> {
    Ok(serde_json::to_value(plane.audit.query(query))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use governance::{Finding, ImpactVector, ProposalCategory, RiskLevel};
    use std::path::PathBuf;

    fn plane_in(dir: &Path) -> Plane {
        let settings = Settings {
            governance: GovernanceConfig::default(),
            data_dir: PathBuf::from(dir),
        };
        Plane::open(&settings).unwrap()
    }

    fn batches() -> Vec<FindingBatch> {
        let fix = "Wrap external calls in a request timeout";
        let finding = |claim: &str| {
            Finding::new(claim, fix)
                .with_impact(ImpactVector::new(0.6, 0.0, 0.2, 0.0))
                .with_risk(RiskLevel::Medium)
        };
        vec![
            FindingBatch::new(
                "security",
                0.8,
                vec![finding("External calls to the billing API lack a timeout")],
            ),
            FindingBatch::new(
                "reliability",
                0.6,
                vec![finding(
                    "External calls to the billing API lack a timeout and can hang",
                )],
            ),
        ]
    }

    #[test]
    fn test_consensus_then_triage_then_release() {
        let dir = tempfile::tempdir().unwrap();
        let plane = plane_in(dir.path());

        let consensus_json = consensus(
            &plane,
            ConsensusInput {
                target_id: "billing".to_string(),
                batches: batches(),
            },
        )
        .unwrap();
        assert_eq!(consensus_json["findings"].as_array().unwrap().len(), 1);

        let result: ConsensusResult = serde_json::from_value(consensus_json).unwrap();
        let triaged = triage(&plane, result).unwrap();
        let proposal_id = triaged["proposals"][0]["proposal"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let plan = create_plan(&plane, "billing", vec![proposal_id]).unwrap();
        let release = create_release(&plane, plan["id"].as_str().unwrap(), "cli").unwrap();
        assert_eq!(release["status"], "planning");

        let release_id = release["id"].as_str().unwrap();
        let moved = advance_release(&plane, release_id, ReleaseStatus::Candidate, "cli").unwrap();
        assert_eq!(moved["success"], true);
        let rolled = rollback_release(&plane, release_id, "flaky", "cli").unwrap();
        assert_eq!(rolled["success"], true);

        let verified = audit_verify(&plane).unwrap();
        assert_eq!(verified["intact"], true);
    }

    #[test]
    fn test_decisions_survive_reopen_and_block() {
        let dir = tempfile::tempdir().unwrap();
        let adr_id = {
            let plane = plane_in(dir.path());
            let recorded = record_decision(
                &plane,
                DecisionInput {
                    title: "Keep sticky sessions".to_string(),
                    decision: "Route by session cookie".to_string(),
                    confidence: 0.5,
                    context: String::new(),
                    related_proposals: vec!["gateway".to_string()],
                },
                None,
                "architect",
            )
            .unwrap();
            recorded["adr"]["id"].as_str().unwrap().to_string()
        };

        let plane = plane_in(dir.path());
        assert_eq!(plane.index.len(), 1);

        let flip = should_flip(&plane, &adr_id, 0.95).unwrap();
        assert_eq!(flip["should_flip"], false);

        let mut proposal =
            ImprovementProposal::new("gateway", "Drop sticky sessions", ProposalCategory::Behavioral);
        proposal.adr_refs.push(adr_id.clone());
        let check = check_oscillation(&plane, proposal, 0.95).unwrap();
        assert_eq!(check["blocked"], true);

        let stability_json = stability(&plane, "gateway").unwrap();
        assert_eq!(stability_json["total_decisions"], 1);

        let entries = audit_query(
            &plane,
            &AuditQuery {
                action: Some("adr_recorded".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(entries.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_supersede_twice_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let plane = plane_in(dir.path());
        let input = |title: &str| DecisionInput {
            title: title.to_string(),
            decision: "d".to_string(),
            confidence: 0.6,
            context: String::new(),
            related_proposals: vec![],
        };
        let first = record_decision(&plane, input("one"), None, "a").unwrap();
        let old_id = first["adr"]["id"].as_str().unwrap().to_string();

        let second = record_decision(&plane, input("two"), Some(&old_id), "a").unwrap();
        assert_eq!(second["supersede"]["success"], true);
        let third = record_decision(&plane, input("three"), Some(&old_id), "a").unwrap();
        assert_eq!(third["supersede"]["success"], false);
    }

    #[test]
    fn test_open_plane_holds_data_dir_lock() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join(LOCK_FILE);
        {
            let _plane = plane_in(dir.path());
            let other = File::open(&lock_path).unwrap();
            assert!(other.try_lock_exclusive().is_err());
        }
        let other = File::open(&lock_path).unwrap();
        assert!(other.try_lock_exclusive().is_ok());
    }

    #[test]
    fn test_missing_decision_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let plane = plane_in(dir.path());
        assert!(should_flip(&plane, "adr-missing", 0.9).is_err());
    }

    #[test]
    fn test_case_commands() {
        let dir = tempfile::tempdir().unwrap();
        let plane = plane_in(dir.path());
        let date = chrono::NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let case = ResearchCase::open("cold-start", "Cold start", date);
        let case_id = case.case_id.clone();
        open_case(&plane, case, "researcher").unwrap();

        let report = validate(&plane, Some(&case_id), None).unwrap();
        assert_eq!(report["passed"], false);

        let refused = move_case(&plane, &case_id, CaseMove::Advance, "", "researcher").unwrap();
        assert_eq!(refused["success"], false);

        let deferred =
            move_case(&plane, &case_id, CaseMove::Defer, "no owner", "researcher").unwrap();
        assert_eq!(deferred["success"], true);
        assert_eq!(deferred["to"], "deferred");
    }
}
