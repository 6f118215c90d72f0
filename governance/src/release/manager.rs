//! Release creation and transitions.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::changelog::render_changelog;
use super::version::{bump_kind, SemVer};
use super::{ReleaseRecord, ReleaseStatus, StatusTransition, TransitionOutcome};
use crate::audit::{AuditEvent, AuditLog};
use crate::error::{GovernanceError, GovernanceResult};
use crate::model::ImprovementProposal;
use crate::store::Ledger;

pub struct ReleaseManager {
    ledger: Ledger,
    audit: Arc<dyn AuditLog>,
}

impl ReleaseManager {
    pub fn new(ledger: Ledger, audit: Arc<dyn AuditLog>) -> Self {
        Self { ledger, audit }
    }

    /// Create a release in `planning` from a delivery plan.
    ///
    /// The plan and every proposal it names must exist. The version bumps
    /// the target's latest release, or `0.0.0` if there is none.
    pub fn create_release(&self, plan_id: &str, actor: &str) -> GovernanceResult<ReleaseRecord> {
        let plan = self
            .ledger
            .get_delivery_plan(plan_id)?
            .ok_or_else(|| GovernanceError::PlanNotFound(plan_id.to_string()))?;

        let proposals = plan
            .proposal_ids
            .iter()
            .map(|id| {
                self.ledger
                    .get_proposal(id)?
                    .ok_or_else(|| GovernanceError::ProposalNotFound(id.clone()))
            })
            .collect::<GovernanceResult<Vec<ImprovementProposal>>>()?;

        let previous_version = self
            .ledger
            .get_latest_release(&plan.target_id)?
            .map(|r| r.version);
        let base = match &previous_version {
            Some(v) => SemVer::parse(v)?,
            None => SemVer::default(),
        };
        let bump = bump_kind(&proposals);
        let version = base.bump(bump).to_string();
        let changelog = render_changelog(&version, &proposals);
        let scorecard = self.ledger.get_latest_scorecard(&plan.target_id)?;

        let now = Utc::now();
        let release = ReleaseRecord {
            id: format!("rel-{}", uuid::Uuid::new_v4()),
            target_id: plan.target_id.clone(),
            plan_id: plan.id.clone(),
            version,
            previous_version,
            bump,
            proposal_ids: plan.proposal_ids.clone(),
            pr_refs: plan.pr_refs.clone(),
            changelog,
            status: ReleaseStatus::Planning,
            scorecard,
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.ledger.insert_release(&release)?;

        info!(
            release_id = %release.id,
            version = %release.version,
            bump = %release.bump,
            "Release created"
        );
        self.audit.record(
            AuditEvent::new("release_created", actor, "release", &release.id).with_details(
                serde_json::json!({
                    "plan_id": release.plan_id,
                    "target_id": release.target_id,
                    "version": release.version,
                    "previous_version": release.previous_version,
                    "bump": release.bump,
                    "proposal_ids": release.proposal_ids,
                }),
            ),
        );

        Ok(release)
    }

    pub fn advance_release(
        &self,
        release_id: &str,
        to: ReleaseStatus,
        actor: &str,
    ) -> GovernanceResult<TransitionOutcome> {
        self.transition(release_id, to, actor, "")
    }

    pub fn rollback_release(
        &self,
        release_id: &str,
        reason: &str,
        actor: &str,
    ) -> GovernanceResult<TransitionOutcome> {
        self.transition(release_id, ReleaseStatus::RolledBack, actor, reason)
    }

    fn transition(
        &self,
        release_id: &str,
        to: ReleaseStatus,
        actor: &str,
        reason: &str,
    ) -> GovernanceResult<TransitionOutcome> {
        let mut release = self
            .ledger
            .get_release(release_id)?
            .ok_or_else(|| GovernanceError::ReleaseNotFound(release_id.to_string()))?;

        let from = release.status;
        let allowed = from.valid_transitions().to_vec();

        if !from.can_transition_to(to) {
            let allowed_list = if allowed.is_empty() {
                "none".to_string()
            } else {
                allowed
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let message = format!(
                "cannot move release {} from {} to {}; allowed: {}",
                release_id, from, to, allowed_list
            );
            warn!(release_id, %from, %to, "Rejected release transition");
            return Ok(TransitionOutcome {
                success: false,
                release_id: release_id.to_string(),
                from,
                to,
                allowed,
                message,
            });
        }

        let now = Utc::now();
        release.status = to;
        release.updated_at = now;
        release.transitions.push(StatusTransition {
            from,
            to,
            actor: actor.to_string(),
            reason: reason.to_string(),
            timestamp: now,
        });
        self.ledger.update_release_status(&release)?;

        let action = if to == ReleaseStatus::RolledBack {
            "release_rolled_back"
        } else {
            "release_transitioned"
        };
        info!(release_id, %from, %to, "Release transitioned");
        self.audit.record(
            AuditEvent::new(action, actor, "release", release_id).with_details(serde_json::json!({
                "from": from,
                "to": to,
                "reason": reason,
                "version": release.version,
            })),
        );

        Ok(TransitionOutcome {
            success: true,
            release_id: release_id.to_string(),
            from,
            to,
            allowed,
            message: format!("release {} moved from {} to {}", release_id, from, to),
        })
    }
}
