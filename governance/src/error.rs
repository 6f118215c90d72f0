//! Error types for conditions the caller was expected to rule out.
//!
//! Policy outcomes (a blocked proposal, an illegal transition, a failed
//! validation check) are ordinary return values and never appear here.

use crate::store::StoreError;

/// Result alias for decision-plane operations that can fail.
pub type GovernanceResult<T> = Result<T, GovernanceError>;

#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    #[error("proposal not found: {0}")]
    ProposalNotFound(String),

    #[error("release not found: {0}")]
    ReleaseNotFound(String),

    #[error("delivery plan not found: {0}")]
    PlanNotFound(String),

    #[error("decision not found: {0}")]
    DecisionNotFound(String),

    #[error("research case not found: {0}")]
    CaseNotFound(String),

    #[error("invalid semantic version: {0}")]
    InvalidVersion(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
