//! Research cases: improvement initiatives walked through eight overlays.
//!
//! ```text
//! intake → synthesis → review → decision → proposal → implement → evaluate → release → completed
//!                                                           ▲            │
//!                                                           └────────────┘ re-iteration (budgeted)
//! any non-terminal ──▶ rejected | deferred
//! ```
//!
//! Every forward move is gated by [`validate_case`] on the candidate state.

pub mod case;
pub mod lifecycle;
pub mod validator;

pub use case::{
    CaseReferences, ChangeBudget, DecisionArtifact, EvaluationReport, ImplementationBrief,
    IntakeArtifact, ProposalArtifact, ResearchCase, ResearchStatus, ReviewArtifact,
    ReviewPerspective, SynthesisArtifact, OVERLAYS,
};
pub use lifecycle::{CaseAdvance, ResearchLifecycle};
pub use validator::{validate_case, Severity, ValidationCheck, ValidationReport};
