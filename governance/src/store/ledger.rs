//! Typed access to decision-plane records.

use std::sync::Arc;

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use super::{Listing, RecordStore, StoreError, StoreResult};
use crate::error::{GovernanceError, GovernanceResult};
use crate::model::{
    Adr, DeliveryPlan, ImprovementProposal, ProposalStatus, ScorecardSnapshot, TargetServerConfig,
};
use crate::release::ReleaseRecord;
use crate::research::ResearchCase;

const ADRS: &str = "adrs";
const PROPOSALS: &str = "proposals";
const RELEASES: &str = "releases";
const SCORECARDS: &str = "scorecards";
const TARGETS: &str = "targets";
const PLANS: &str = "plans";
const CASES: &str = "research_cases";
const ARTIFACTS: &str = "artifacts";

/// Typed facade over a [`RecordStore`].
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn RecordStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Ledger over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(super::MemoryStore::new()))
    }

    // =========================================================================
    // Generic operations
    // =========================================================================

    fn put<T: Serialize>(&self, collection: &str, id: &str, value: &T) -> StoreResult<()> {
        let json =
            serde_json::to_value(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.put(collection, id, &json)
    }

    fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> StoreResult<Option<T>> {
        match self.store.get(collection, id)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::Deserialization {
                    collection: collection.to_string(),
                    id: id.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// List and decode, counting records of unexpected shape as skipped.
    fn list<T: DeserializeOwned>(&self, collection: &str) -> StoreResult<Listing<T>> {
        let raw = self.store.list(collection)?;
        let mut listing = Listing {
            records: Vec::with_capacity(raw.records.len()),
            skipped: raw.skipped,
        };
        for value in raw.records {
            match serde_json::from_value::<T>(value) {
                Ok(record) => listing.records.push(record),
                Err(e) => {
                    warn!(collection, error = %e, "Skipping record with unexpected shape");
                    listing.skipped += 1;
                }
            }
        }
        Ok(listing)
    }

    // =========================================================================
    // Decisions
    // =========================================================================

    pub fn put_adr(&self, adr: &Adr) -> StoreResult<()> {
        self.put(ADRS, &adr.id, adr)
    }

    pub fn get_adr(&self, id: &str) -> StoreResult<Option<Adr>> {
        self.get(ADRS, id)
    }

    pub fn list_adrs(&self) -> StoreResult<Listing<Adr>> {
        self.list(ADRS)
    }

    pub fn list_active_adrs(&self) -> StoreResult<Listing<Adr>> {
        let mut listing = self.list_adrs()?;
        listing.records.retain(Adr::is_active);
        Ok(listing)
    }

    // =========================================================================
    // Scorecards and targets
    // =========================================================================

    pub fn put_scorecard(&self, snapshot: &ScorecardSnapshot) -> StoreResult<()> {
        self.put(SCORECARDS, &snapshot.id, snapshot)
    }

    pub fn get_latest_scorecard(&self, target_id: &str) -> StoreResult<Option<ScorecardSnapshot>> {
        Ok(self
            .list::<ScorecardSnapshot>(SCORECARDS)?
            .records
            .into_iter()
            .filter(|s| s.target_id == target_id)
            .max_by_key(|s| s.captured_at))
    }

    pub fn put_target_server(&self, target: &TargetServerConfig) -> StoreResult<()> {
        self.put(TARGETS, &target.id, target)
    }

    pub fn get_target_server(&self, id: &str) -> StoreResult<Option<TargetServerConfig>> {
        self.get(TARGETS, id)
    }

    // =========================================================================
    // Proposals
    // =========================================================================

    pub fn insert_proposal(&self, proposal: &ImprovementProposal) -> StoreResult<()> {
        self.put(PROPOSALS, &proposal.id, proposal)
    }

    pub fn get_proposal(&self, id: &str) -> StoreResult<Option<ImprovementProposal>> {
        self.get(PROPOSALS, id)
    }

    pub fn list_proposals(&self) -> StoreResult<Listing<ImprovementProposal>> {
        self.list(PROPOSALS)
    }

    /// The only mutation a stored proposal accepts.
    pub fn update_proposal_status(
        &self,
        id: &str,
        status: ProposalStatus,
    ) -> GovernanceResult<ImprovementProposal> {
        let mut proposal = self
            .get_proposal(id)?
            .ok_or_else(|| GovernanceError::ProposalNotFound(id.to_string()))?;
        proposal.status = status;
        proposal.updated_at = Utc::now();
        self.insert_proposal(&proposal)?;
        Ok(proposal)
    }

    // =========================================================================
    // Releases and plans
    // =========================================================================

    pub fn insert_release(&self, release: &ReleaseRecord) -> StoreResult<()> {
        self.put(RELEASES, &release.id, release)
    }

    pub fn get_release(&self, id: &str) -> StoreResult<Option<ReleaseRecord>> {
        self.get(RELEASES, id)
    }

    /// Persist a release whose status (and transition history) changed.
    pub fn update_release_status(&self, release: &ReleaseRecord) -> StoreResult<()> {
        self.put(RELEASES, &release.id, release)
    }

    pub fn get_latest_release(&self, target_id: &str) -> StoreResult<Option<ReleaseRecord>> {
        Ok(self
            .list::<ReleaseRecord>(RELEASES)?
            .records
            .into_iter()
            .filter(|r| r.target_id == target_id)
            .max_by_key(|r| r.created_at))
    }

    pub fn put_delivery_plan(&self, plan: &DeliveryPlan) -> StoreResult<()> {
        self.put(PLANS, &plan.id, plan)
    }

    pub fn get_delivery_plan(&self, id: &str) -> StoreResult<Option<DeliveryPlan>> {
        self.get(PLANS, id)
    }

    // =========================================================================
    // Research cases and artifacts
    // =========================================================================

    pub fn put_case(&self, case: &ResearchCase) -> StoreResult<()> {
        self.put(CASES, &case.case_id, case)
    }

    pub fn get_case(&self, case_id: &str) -> StoreResult<Option<ResearchCase>> {
        self.get(CASES, case_id)
    }

    /// Store an opaque artifact under `<kind>__<id>`.
    pub fn store_artifact(&self, kind: &str, id: &str, value: &serde_json::Value) -> StoreResult<()> {
        self.store.put(ARTIFACTS, &format!("{}__{}", kind, id), value)
    }

    pub fn get_artifact(&self, kind: &str, id: &str) -> StoreResult<Option<serde_json::Value>> {
        self.store.get(ARTIFACTS, &format!("{}__{}", kind, id))
    }
}
