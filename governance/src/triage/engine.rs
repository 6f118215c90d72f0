//! Triage engine.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::scoring::score_finding;
use super::synthesis::synthesize_proposal;
use super::{Escalation, TargetLocks, TriageResult, TriagedProposal};
use crate::audit::{AuditEvent, AuditLog};
use crate::config::GovernanceConfig;
use crate::consensus::{ConsensusFinding, ConsensusResult};
use crate::error::GovernanceResult;
use crate::hysteresis::AntiOscillationEngine;
use crate::model::{ProposalStatus, TargetServerConfig};
use crate::policy::PolicyEngine;
use crate::store::Ledger;

const ACTOR: &str = "triage";

const NOOP_REASON: &str = "no-op change: no measurable effect expected";

pub struct TriageEngine {
    config: GovernanceConfig,
    ledger: Ledger,
    policy: Arc<dyn PolicyEngine>,
    oscillation: Arc<AntiOscillationEngine>,
    audit: Arc<dyn AuditLog>,
    locks: Arc<TargetLocks>,
}

impl TriageEngine {
    pub fn new(
        config: GovernanceConfig,
        ledger: Ledger,
        policy: Arc<dyn PolicyEngine>,
        oscillation: Arc<AntiOscillationEngine>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            config,
            ledger,
            policy,
            oscillation,
            audit,
            locks: Arc::new(TargetLocks::new()),
        }
    }

    /// Share a lock table with other engines writing to the same targets.
    pub fn with_locks(mut self, locks: Arc<TargetLocks>) -> Self {
        self.locks = locks;
        self
    }

    fn should_escalate(&self, finding: &ConsensusFinding) -> bool {
        finding.agreement_score < self.config.escalation_agreement_floor
            && finding.combined_confidence < self.config.escalation_confidence_floor
    }

    /// Run one triage pass over `consensus`.
    ///
    /// Holds the target's lock for the whole pass.
    pub fn triage_findings(&self, consensus: &ConsensusResult) -> GovernanceResult<TriageResult> {
        let target_id = consensus.target_id.as_str();
        let lock = self.locks.lock_for(target_id);
        let _guard = match lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let correlation_id = format!("triage-{}", uuid::Uuid::new_v4());
        let target = self
            .ledger
            .get_target_server(target_id)?
            .unwrap_or_else(|| TargetServerConfig::new(target_id));
        let weights = target.weights(&self.config);
        let change_budget = target.budget(&self.config);
        let baseline = self.ledger.get_latest_scorecard(target_id)?;

        let mut proposals = Vec::new();
        let mut escalations = Vec::new();

        for finding in &consensus.findings {
            if self.should_escalate(finding) {
                let escalation = Escalation {
                    claim: finding.claim.clone(),
                    agreement_score: finding.agreement_score,
                    combined_confidence: finding.combined_confidence,
                    message: format!(
                        "escalated for human review: agreement {:.2} and confidence {:.2} both below floor: {}",
                        finding.agreement_score, finding.combined_confidence, finding.claim
                    ),
                };
                warn!(target_id, claim = %finding.claim, "Finding escalated");
                self.audit.record(
                    AuditEvent::new("finding_escalated", ACTOR, "target", target_id)
                        .with_correlation(Some(&correlation_id))
                        .with_details(serde_json::json!({ "escalation": escalation })),
                );
                escalations.push(escalation);
                continue;
            }

            let mut proposal = synthesize_proposal(finding, target_id);
            proposal.baseline_scorecard = baseline.clone();

            let policy = self.policy.evaluate(&proposal);
            let oscillation = self.oscillation.check_oscillation(
                &proposal,
                finding.combined_confidence,
                Some(&correlation_id),
            )?;
            let is_noop = AntiOscillationEngine::is_noop_change(&proposal);
            let scores = score_finding(finding, &weights);

            let blocked_by_oscillation = is_noop || oscillation.blocked;
            let block_reason = if is_noop {
                Some(NOOP_REASON.to_string())
            } else if oscillation.blocked {
                Some(oscillation.reason.clone())
            } else if !policy.allowed {
                Some(policy.reasons.join("; "))
            } else {
                None
            };

            proposal.priority = scores.priority_score;
            proposal.status = if blocked_by_oscillation || !policy.allowed {
                ProposalStatus::Blocked
            } else {
                ProposalStatus::Proposed
            };

            self.ledger.insert_proposal(&proposal)?;
            self.audit.record(
                AuditEvent::new("proposal_triaged", ACTOR, "proposal", &proposal.id)
                    .with_correlation(Some(&correlation_id))
                    .with_details(serde_json::json!({
                        "target_id": target_id,
                        "category": proposal.category,
                        "status": proposal.status,
                        "scores": scores,
                        "policy": policy,
                        "blocked_by_oscillation": blocked_by_oscillation,
                        "is_noop": is_noop,
                        "block_reason": block_reason,
                    })),
            );
            debug!(
                proposal_id = %proposal.id,
                priority = scores.priority_score,
                blocked = blocked_by_oscillation,
                "Proposal triaged"
            );

            proposals.push(TriagedProposal {
                proposal,
                scores,
                policy,
                oscillation,
                is_noop,
                blocked_by_oscillation,
                block_reason,
            });
        }

        proposals.sort_by(|a, b| b.priority_score().total_cmp(&a.priority_score()));

        let active = proposals.iter().filter(|p| !p.is_blocked()).count() as u32;
        let budget_remaining = change_budget.saturating_sub(active);

        info!(
            target_id,
            correlation_id = %correlation_id,
            proposals = proposals.len(),
            escalations = escalations.len(),
            budget_remaining,
            "Triage pass complete"
        );

        Ok(TriageResult {
            target_id: target_id.to_string(),
            correlation_id,
            proposals,
            escalations,
            change_budget,
            budget_remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditQuery, HashChainLog};
    use crate::config::ScorecardWeights;
    use crate::model::{Adr, ImpactVector, ProposalCategory, RiskLevel};
    use crate::policy::{MockPolicyEngine, PolicyVerdict, StaticPolicy};
    use crate::similarity::DecisionIndex;

    struct Harness {
        engine: TriageEngine,
        ledger: Ledger,
        audit: Arc<HashChainLog>,
    }

    fn harness_with(policy: Arc<dyn PolicyEngine>) -> Harness {
        let config = GovernanceConfig::default();
        let ledger = Ledger::in_memory();
        let audit = Arc::new(HashChainLog::new());
        let oscillation = Arc::new(AntiOscillationEngine::new(
            config.clone(),
            ledger.clone(),
            Arc::new(DecisionIndex::new()),
            audit.clone(),
        ));
        let engine = TriageEngine::new(config, ledger.clone(), policy, oscillation, audit.clone());
        Harness {
            engine,
            ledger,
            audit,
        }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(StaticPolicy::default()))
    }

    fn finding(claim: &str, recommendation: &str, agreement: f64, confidence: f64) -> ConsensusFinding {
        ConsensusFinding {
            claim: claim.to_string(),
            recommendation: recommendation.to_string(),
            supporting_perspectives: vec!["reliability".to_string()],
            agreement_score: agreement,
            combined_confidence: confidence,
            merged_impact: ImpactVector::new(0.6, 0.0, 0.2, 0.0),
            merged_evidence: vec![],
            risk_level: RiskLevel::Medium,
        }
    }

    fn consensus(findings: Vec<ConsensusFinding>) -> ConsensusResult {
        ConsensusResult {
            target_id: "srv".to_string(),
            overall_agreement: 0.5,
            perspectives: vec!["reliability".to_string(), "security".to_string()],
            findings,
        }
    }

    #[test]
    fn test_escalation_requires_both_conditions() {
        let h = harness();
        let result = h
            .engine
            .triage_findings(&consensus(vec![
                finding("Retries are unbounded", "Cap retries", 0.2, 0.3),
                finding("Caches never evict", "Bound the cache", 0.2, 0.9),
                finding("Logs are noisy", "Lower log levels", 0.9, 0.1),
            ]))
            .unwrap();

        assert_eq!(result.escalations.len(), 1);
        assert_eq!(result.escalations[0].claim, "Retries are unbounded");
        assert_eq!(result.proposals.len(), 2);
        assert_eq!(h.ledger.list_proposals().unwrap().records.len(), 2);
    }

    #[test]
    fn test_proposals_sorted_and_audited_with_run_id() {
        let h = harness();
        let result = h
            .engine
            .triage_findings(&consensus(vec![
                finding("Caches never evict", "Bound the cache", 0.5, 0.6),
                finding("Retries are unbounded", "Cap retries", 1.0, 0.9),
            ]))
            .unwrap();

        assert_eq!(result.proposals[0].proposal.title, "Cap retries");
        assert!(result.proposals[0].priority_score() >= result.proposals[1].priority_score());

        let triaged = h.audit.query(&AuditQuery {
            action: Some("proposal_triaged".to_string()),
            correlation_id: Some(result.correlation_id.clone()),
            ..Default::default()
        });
        assert_eq!(triaged.len(), 2);
        assert!(triaged[0].event.details["scores"]["priority_score"].is_number());
    }

    #[test]
    fn test_noop_forces_oscillation_block() {
        let h = harness();
        let mut f = finding("Tool prompt is vague", "Reword the prompt", 1.0, 0.9);
        f.merged_impact = ImpactVector::new(0.02, 0.0, 0.0, 0.0);
        f.risk_level = RiskLevel::Low;

        let result = h.engine.triage_findings(&consensus(vec![f])).unwrap();
        let triaged = &result.proposals[0];
        assert_eq!(triaged.proposal.category, ProposalCategory::PromptOnly);
        assert!(triaged.is_noop);
        assert!(!triaged.oscillation.blocked);
        assert!(triaged.blocked_by_oscillation);
        assert_eq!(triaged.block_reason.as_deref(), Some(NOOP_REASON));
        assert_eq!(triaged.proposal.status, ProposalStatus::Blocked);
        assert_eq!(result.budget_remaining, result.change_budget);
    }

    #[test]
    fn test_budget_counts_only_unblocked() {
        let h = harness();
        let mut target = TargetServerConfig::new("srv");
        target.change_budget = Some(1);
        h.ledger.put_target_server(&target).unwrap();

        let result = h
            .engine
            .triage_findings(&consensus(vec![
                finding("Caches never evict", "Bound the cache", 0.5, 0.6),
                finding("Retries are unbounded", "Cap retries", 1.0, 0.9),
            ]))
            .unwrap();
        assert_eq!(result.change_budget, 1);
        assert_eq!(result.budget_remaining, 0);
    }

    #[test]
    fn test_target_weights_reorder_proposals() {
        let findings = || {
            let mut exposure = finding("Signing keys never rotate", "Rotate signing keys", 0.8, 0.8);
            exposure.merged_impact = ImpactVector::new(0.9, 0.0, 0.0, 0.0);
            let mut latency = finding("Hot queries miss the cache", "Cache hot queries", 0.8, 0.8);
            latency.merged_impact = ImpactVector::new(0.0, 0.0, 0.0, 0.9);
            consensus(vec![exposure, latency])
        };
        let order = |result: &TriageResult| -> Vec<String> {
            result
                .proposals
                .iter()
                .map(|p| p.proposal.title.clone())
                .collect()
        };

        let defaults = harness().engine.triage_findings(&findings()).unwrap();
        assert_eq!(order(&defaults), vec!["Rotate signing keys", "Cache hot queries"]);

        let h = harness();
        let mut target = TargetServerConfig::new("srv");
        target.scorecard_weights = Some(ScorecardWeights {
            security: 0.05,
            reliability: 0.25,
            devex: 0.20,
            performance: 0.60,
        });
        h.ledger.put_target_server(&target).unwrap();

        let weighted = h.engine.triage_findings(&findings()).unwrap();
        assert_eq!(order(&weighted), vec!["Cache hot queries", "Rotate signing keys"]);
        assert!(
            weighted.proposals[0].scores.weighted_impact
                > weighted.proposals[1].scores.weighted_impact
        );
    }

    #[test]
    fn test_oscillation_block_surfaces() {
        let h = harness();
        let adr = Adr::new(
            "Bound the cache",
            "Caches never evict",
            0.5,
            &GovernanceConfig::default(),
        );
        h.ledger.put_adr(&adr).unwrap();

        let result = h
            .engine
            .triage_findings(&consensus(vec![finding(
                "Caches never evict",
                "Bound the cache",
                1.0,
                0.9,
            )]))
            .unwrap();
        let triaged = &result.proposals[0];
        assert!(triaged.oscillation.blocked);
        assert!(triaged.blocked_by_oscillation);
        assert!(triaged.block_reason.as_deref().unwrap().contains("cooldown active"));

        let blocked = h.audit.query(&AuditQuery {
            action: Some("oscillation_blocked".to_string()),
            correlation_id: Some(result.correlation_id.clone()),
            ..Default::default()
        });
        assert_eq!(blocked.len(), 1);
    }

    #[test]
    fn test_policy_denial_blocks_without_oscillation_flag() {
        let mut mock = MockPolicyEngine::new();
        mock.expect_evaluate().returning(|_| PolicyVerdict {
            allowed: false,
            requires_approval: false,
            reasons: vec!["change freeze".to_string()],
        });
        let h = harness_with(Arc::new(mock));
        let result = h
            .engine
            .triage_findings(&consensus(vec![finding("Retries are unbounded", "Cap retries", 1.0, 0.9)]))
            .unwrap();

        let triaged = &result.proposals[0];
        assert!(!triaged.blocked_by_oscillation);
        assert!(triaged.is_blocked());
        assert_eq!(triaged.block_reason.as_deref(), Some("change freeze"));
        assert_eq!(result.budget_remaining, 5);
    }

    #[test]
    fn test_empty_consensus() {
        let h = harness();
        let result = h.engine.triage_findings(&ConsensusResult::empty("srv")).unwrap();
        assert!(result.proposals.is_empty());
        assert_eq!(result.budget_remaining, 5);
        assert!(h.audit.is_empty());
    }
}
