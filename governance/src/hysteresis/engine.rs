//! Anti-oscillation engine. Checks proposals against recorded decisions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::flip::should_flip;
use super::{FlipDecision, OscillationCheck, ReversionCheck, StabilityScore};
use crate::audit::{AuditEvent, AuditLog};
use crate::config::GovernanceConfig;
use crate::error::GovernanceResult;
use crate::model::decision::shift_hours;
use crate::model::{Adr, ImprovementProposal, ProposalCategory};
use crate::similarity::{text_similarity, SimilaritySearch};
use crate::store::Ledger;

const ACTOR: &str = "anti_oscillation";

/// Prompt-only changes below this many lines do nothing measurable.
const NOOP_LOC_LIMIT: u32 = 5;

/// Overall scores closer than this are considered unchanged.
const NOOP_SCORE_DELTA: f64 = 0.001;

pub struct AntiOscillationEngine {
    config: GovernanceConfig,
    ledger: Ledger,
    search: Arc<dyn SimilaritySearch>,
    audit: Arc<dyn AuditLog>,
}

impl AntiOscillationEngine {
    pub fn new(
        config: GovernanceConfig,
        ledger: Ledger,
        search: Arc<dyn SimilaritySearch>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            config,
            ledger,
            search,
            audit,
        }
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    /// Check whether `proposal` would reverse a decision it may not reverse.
    ///
    /// Only blocked outcomes are audited.
    pub fn check_oscillation(
        &self,
        proposal: &ImprovementProposal,
        proposal_confidence: f64,
        correlation_id: Option<&str>,
    ) -> GovernanceResult<OscillationCheck> {
        self.check_oscillation_at(proposal, proposal_confidence, Utc::now(), correlation_id)
    }

    pub fn check_oscillation_at(
        &self,
        proposal: &ImprovementProposal,
        proposal_confidence: f64,
        now: DateTime<Utc>,
        correlation_id: Option<&str>,
    ) -> GovernanceResult<OscillationCheck> {
        let Some((adr, match_similarity)) = self.find_conflicting_adr(proposal)? else {
            debug!(proposal_id = %proposal.id, "No conflicting decision");
            return Ok(OscillationCheck::not_applicable());
        };

        let flip = self.should_flip(&adr, proposal_confidence, now);
        let primary_regressions = self.primary_regressions(proposal)?;

        let mut reasons = Vec::new();
        if !flip.should_flip {
            reasons.push(flip.reason.clone());
        }
        if !primary_regressions.is_empty() {
            reasons.push(format!(
                "primary metrics would regress: {}",
                primary_regressions.join(", ")
            ));
        }
        let blocked = !reasons.is_empty();
        let reason = if blocked {
            reasons.join("; ")
        } else {
            flip.reason.clone()
        };

        let check = OscillationCheck {
            blocked,
            reason,
            flip_applicable: true,
            conflicting_adr_id: Some(adr.id.clone()),
            match_similarity: Some(match_similarity),
            flip: Some(flip),
            primary_regressions,
        };

        if check.blocked {
            warn!(
                proposal_id = %proposal.id,
                adr_id = %adr.id,
                reason = %check.reason,
                "Proposal blocked by anti-oscillation"
            );
            self.audit.record(
                AuditEvent::new("oscillation_blocked", ACTOR, "proposal", &proposal.id)
                    .with_correlation(correlation_id)
                    .with_details(serde_json::json!({
                        "proposal_confidence": proposal_confidence,
                        "check": check,
                    })),
            );
        } else {
            info!(proposal_id = %proposal.id, adr_id = %adr.id, "Flip permitted");
        }

        Ok(check)
    }

    /// Explicit references win; otherwise the most similar active decision
    /// above the match threshold.
    fn find_conflicting_adr(
        &self,
        proposal: &ImprovementProposal,
    ) -> GovernanceResult<Option<(Adr, f64)>> {
        for reference in &proposal.adr_refs {
            match self.ledger.get_adr(reference)? {
                Some(adr) if adr.is_active() => return Ok(Some((adr, 1.0))),
                Some(_) => debug!(adr_id = %reference, "Referenced decision already superseded"),
                None => debug!(adr_id = %reference, "Referenced decision not found"),
            }
        }

        let active = self.ledger.list_active_adrs()?;
        let text = proposal.search_text();
        let best = active
            .records
            .into_iter()
            .map(|adr| {
                let similarity = text_similarity(&text, &adr.search_text());
                (adr, similarity)
            })
            .filter(|(_, similarity)| *similarity > self.config.adr_match_threshold)
            .fold(None::<(Adr, f64)>, |best, candidate| match best {
                Some(current) if current.1 >= candidate.1 => Some(current),
                _ => Some(candidate),
            });
        Ok(best)
    }

    fn primary_regressions(&self, proposal: &ImprovementProposal) -> GovernanceResult<Vec<String>> {
        let Some(target) = &proposal.target_scorecard else {
            return Ok(Vec::new());
        };
        let baseline = match self.ledger.get_latest_scorecard(&proposal.target_id)? {
            Some(latest) => Some(latest),
            None => proposal.baseline_scorecard.clone(),
        };
        Ok(baseline
            .map(|baseline| target.regressed_primary(&baseline))
            .unwrap_or_default())
    }

    /// Gate a reversal of `decision`; see [`should_flip`].
    pub fn should_flip(&self, decision: &Adr, new_confidence: f64, now: DateTime<Utc>) -> FlipDecision {
        should_flip(decision, new_confidence, now, self.search.as_ref(), &self.config)
    }

    /// Whether the proposal changes nothing measurable.
    pub fn is_noop_change(proposal: &ImprovementProposal) -> bool {
        if proposal.category == ProposalCategory::PromptOnly
            && proposal.estimated_loc_change < NOOP_LOC_LIMIT
        {
            return true;
        }
        match (&proposal.baseline_scorecard, &proposal.target_scorecard) {
            (Some(baseline), Some(target)) => {
                (baseline.overall_score - target.overall_score).abs() < NOOP_SCORE_DELTA
            }
            _ => false,
        }
    }

    pub fn detect_reversion(&self, proposal: &ImprovementProposal) -> ReversionCheck {
        let mut matches = self
            .search
            .query(&proposal.search_text(), self.config.reversion_window);
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches.truncate(self.config.reversion_window);

        let max_similarity = matches.first().map(|m| m.similarity).unwrap_or(0.0);
        let matching_decision_ids: Vec<String> = matches
            .into_iter()
            .filter(|m| m.similarity > self.config.reversion_threshold)
            .map(|m| m.entry.id)
            .collect();

        ReversionCheck {
            is_reversion: !matching_decision_ids.is_empty(),
            matching_decision_ids,
            max_similarity,
        }
    }

    pub fn compute_stability_score(&self, server_id: &str) -> GovernanceResult<StabilityScore> {
        self.compute_stability_score_at(server_id, Utc::now())
    }

    /// Share of decisions governing `server_id` not superseded within the
    /// rolling window ending at `now`.
    ///
    /// A decision governs the server when one of its related-proposal
    /// references names the server or resolves to a proposal targeting it.
    pub fn compute_stability_score_at(
        &self,
        server_id: &str,
        now: DateTime<Utc>,
    ) -> GovernanceResult<StabilityScore> {
        let window_start = shift_hours(now, self.config.stability_window_hours.saturating_neg());
        let decisions: Vec<Adr> = self
            .ledger
            .list_adrs()?
            .records
            .into_iter()
            .filter(|adr| self.governs(adr, server_id))
            .collect();

        let total = decisions.len();
        let flipped = decisions
            .iter()
            .filter(|adr| {
                adr.superseded_at
                    .is_some_and(|at| at >= window_start && at <= now)
            })
            .count();

        let stability = if total == 0 {
            1.0
        } else {
            (1.0 - flipped as f64 / total as f64).max(0.0)
        };

        debug!(server_id, total, flipped, stability, "Stability computed");
        Ok(StabilityScore {
            server_id: server_id.to_string(),
            total_decisions: total,
            flipped,
            window_hours: self.config.stability_window_hours,
            stability,
        })
    }

    fn governs(&self, adr: &Adr, server_id: &str) -> bool {
        adr.mentions_server(server_id)
            || adr.related_proposals.iter().any(|reference| {
                matches!(
                    self.ledger.get_proposal(reference),
                    Ok(Some(proposal)) if proposal.target_id == server_id
                )
            })
    }
}
