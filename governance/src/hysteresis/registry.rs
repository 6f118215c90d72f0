//! Recording and superseding decisions.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::{AuditEvent, AuditLog};
use crate::error::{GovernanceError, GovernanceResult};
use crate::model::Adr;
use crate::similarity::{DecisionEntry, DecisionIndex};
use crate::store::Ledger;

/// Outcome of a supersede request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupersedeOutcome {
    pub success: bool,
    pub reason: String,
    pub old_id: String,
    /// Set only when the supersede took effect.
    pub new_id: Option<String>,
}

/// Owns the write path for decisions: store, similarity index, audit.
pub struct DecisionRegistry {
    ledger: Ledger,
    index: Arc<DecisionIndex>,
    audit: Arc<dyn AuditLog>,
}

impl DecisionRegistry {
    pub fn new(ledger: Ledger, index: Arc<DecisionIndex>, audit: Arc<dyn AuditLog>) -> Self {
        Self {
            ledger,
            index,
            audit,
        }
    }

    /// Load every stored decision into the similarity index.
    pub fn rebuild_index(&self) -> GovernanceResult<usize> {
        let listing = self.ledger.list_adrs()?;
        if listing.skipped > 0 {
            warn!(skipped = listing.skipped, "Unreadable decisions left out of the index");
        }
        let count = listing.records.len();
        for adr in &listing.records {
            self.index.insert(Self::entry_for(adr));
        }
        info!(count, "Decision index rebuilt");
        Ok(count)
    }

    fn entry_for(adr: &Adr) -> DecisionEntry {
        DecisionEntry::new(&adr.id, &adr.search_text())
            .with_tag("kind", "adr")
            .with_tag("active", if adr.is_active() { "true" } else { "false" })
    }

    pub fn record_decision(&self, adr: &Adr, actor: &str) -> GovernanceResult<()> {
        self.ledger.put_adr(adr)?;
        self.index.insert(Self::entry_for(adr));
        info!(adr_id = %adr.id, title = %adr.title, "Decision recorded");
        self.audit.record(
            AuditEvent::new("adr_recorded", actor, "adr", &adr.id).with_details(
                serde_json::json!({
                    "title": adr.title,
                    "confidence": adr.confidence,
                    "cooldown_until": adr.cooldown_until,
                    "min_confidence_margin": adr.min_confidence_margin,
                    "min_consecutive_cycles": adr.min_consecutive_cycles,
                }),
            ),
        );
        Ok(())
    }

    /// Replace `old_id` with `replacement`.
    ///
    /// A missing decision is an error; one that is already superseded
    /// yields an unsuccessful outcome and changes nothing.
    pub fn supersede_decision(
        &self,
        old_id: &str,
        replacement: &Adr,
        actor: &str,
    ) -> GovernanceResult<SupersedeOutcome> {
        let mut old = self
            .ledger
            .get_adr(old_id)?
            .ok_or_else(|| GovernanceError::DecisionNotFound(old_id.to_string()))?;

        if let Some(existing) = &old.superseded_by {
            warn!(adr_id = %old_id, superseded_by = %existing, "Decision already superseded");
            return Ok(SupersedeOutcome {
                success: false,
                reason: format!("decision {} already superseded by {}", old_id, existing),
                old_id: old_id.to_string(),
                new_id: None,
            });
        }

        self.ledger.put_adr(replacement)?;
        self.index.insert(Self::entry_for(replacement));

        old.superseded_by = Some(replacement.id.clone());
        old.superseded_at = Some(Utc::now());
        self.ledger.put_adr(&old)?;
        self.index.insert(Self::entry_for(&old));

        info!(old_id, new_id = %replacement.id, "Decision superseded");
        self.audit.record(
            AuditEvent::new("adr_superseded", actor, "adr", old_id).with_details(
                serde_json::json!({
                    "superseded_by": replacement.id,
                    "old_confidence": old.confidence,
                    "new_confidence": replacement.confidence,
                }),
            ),
        );

        Ok(SupersedeOutcome {
            success: true,
            reason: format!("decision {} superseded by {}", old_id, replacement.id),
            old_id: old_id.to_string(),
            new_id: Some(replacement.id.clone()),
        })
    }
}
