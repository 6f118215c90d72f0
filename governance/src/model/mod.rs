//! Record types shared by every decision-plane component.

pub mod decision;
pub mod finding;
pub mod proposal;
pub mod scorecard;
pub mod target;

pub use decision::Adr;
pub use finding::{
    Evidence, EvidenceQuality, EvidenceType, Finding, FindingBatch, ImpactVector, Risk, RiskLevel,
};
pub use proposal::{ImprovementProposal, ProposalCategory, ProposalStatus};
pub use scorecard::{ScorecardDimension, ScorecardSnapshot};
pub use target::{DeliveryPlan, TargetServerConfig};
