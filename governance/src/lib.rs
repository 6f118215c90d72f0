//! Decision Plane Library
//!
//! Governance for incremental improvement of target servers:
//! - Consensus clustering of findings gathered under independent perspectives
//! - Anti-oscillation (hysteresis) gates on binding decisions (ADRs)
//! - Triage of consensus findings into budget-limited improvement proposals
//! - Release lifecycle with semantic versioning and changelogs
//! - Research cases walked through validator-gated overlays
//!
//! Every state change is written to a hash-chained audit log.
//!
//! # Flow
//!
//! ```text
//! FindingBatch[] ─▶ consensus ─▶ triage ─┬─ policy
//!                                        ├─ anti-oscillation ─▶ ADR store
//!                                        └─▶ proposals ─▶ delivery plan ─▶ release
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod audit;
pub mod config;
pub mod consensus;
pub mod error;
pub mod hysteresis;
pub mod model;
pub mod policy;
pub mod release;
pub mod research;
pub mod similarity;
pub mod store;
pub mod triage;

// Re-export configuration and errors
pub use config::{GovernanceConfig, ScorecardWeights};
pub use error::{GovernanceError, GovernanceResult};

// Re-export record types
pub use model::{
    Adr, DeliveryPlan, Finding, FindingBatch, ImpactVector, ImprovementProposal, ProposalCategory,
    ProposalStatus, RiskLevel, ScorecardDimension, ScorecardSnapshot, TargetServerConfig,
};

// Re-export engines
pub use consensus::{compute_consensus, ConsensusEngine, ConsensusFinding, ConsensusResult};
pub use hysteresis::{
    AntiOscillationEngine, DecisionRegistry, FlipDecision, OscillationCheck, ReversionCheck,
    StabilityScore,
};
pub use policy::{PolicyEngine, PolicyVerdict, StaticPolicy};
pub use triage::{TriageEngine, TriageResult, TriagedProposal};

// Re-export lifecycles
pub use release::{ReleaseManager, ReleaseRecord, ReleaseStatus, TransitionOutcome};
pub use research::{validate_case, CaseAdvance, ResearchCase, ResearchLifecycle, ResearchStatus};

// Re-export infrastructure
pub use audit::{AuditEvent, AuditLog, AuditQuery, HashChainLog};
pub use similarity::{DecisionIndex, SimilaritySearch};
pub use store::{JsonDirStore, Ledger, MemoryStore, RecordStore};
