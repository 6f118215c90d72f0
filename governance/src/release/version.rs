//! Semantic version bumps.

use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, GovernanceResult};
use crate::model::{ImprovementProposal, ProposalCategory, RiskLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BumpKind {
    Patch,
    Minor,
    Major,
}

impl std::fmt::Display for BumpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Patch => write!(f, "patch"),
            Self::Minor => write!(f, "minor"),
            Self::Major => write!(f, "major"),
        }
    }
}

/// Major if any proposal is critical-risk or behavioral; minor if any is
/// security; patch otherwise.
pub fn bump_kind(proposals: &[ImprovementProposal]) -> BumpKind {
    if proposals.iter().any(|p| {
        p.risk_level == RiskLevel::Critical || p.category == ProposalCategory::Behavioral
    }) {
        BumpKind::Major
    } else if proposals.iter().any(|p| {
        matches!(
            p.category,
            ProposalCategory::Behavioral | ProposalCategory::Security
        )
    }) {
        BumpKind::Minor
    } else {
        BumpKind::Patch
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemVer {
    /// Parse `x.y.z`, with an optional leading `v`.
    pub fn parse(version: &str) -> GovernanceResult<Self> {
        let invalid = || GovernanceError::InvalidVersion(version.to_string());
        let trimmed = version.trim().trim_start_matches('v');
        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }
        let number = |s: &str| s.parse::<u64>().map_err(|_| invalid());
        Ok(Self {
            major: number(parts[0])?,
            minor: number(parts[1])?,
            patch: number(parts[2])?,
        })
    }

    pub fn bump(self, kind: BumpKind) -> Self {
        match kind {
            BumpKind::Major => Self {
                major: self.major + 1,
                minor: 0,
                patch: 0,
            },
            BumpKind::Minor => Self {
                minor: self.minor + 1,
                patch: 0,
                ..self
            },
            BumpKind::Patch => Self {
                patch: self.patch + 1,
                ..self
            },
        }
    }
}

impl std::fmt::Display for SemVer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(category: ProposalCategory, risk: RiskLevel) -> ImprovementProposal {
        let mut p = ImprovementProposal::new("srv", "p", category);
        p.risk_level = risk;
        p
    }

    #[test]
    fn test_critical_risk_forces_major() {
        let proposals = [
            proposal(ProposalCategory::Docs, RiskLevel::Critical),
            proposal(ProposalCategory::Docs, RiskLevel::Low),
        ];
        assert_eq!(bump_kind(&proposals), BumpKind::Major);
    }

    #[test]
    fn test_behavioral_is_major() {
        assert_eq!(
            bump_kind(&[proposal(ProposalCategory::Behavioral, RiskLevel::Low)]),
            BumpKind::Major
        );
    }

    #[test]
    fn test_security_is_minor() {
        assert_eq!(
            bump_kind(&[
                proposal(ProposalCategory::Security, RiskLevel::High),
                proposal(ProposalCategory::Refactor, RiskLevel::Low),
            ]),
            BumpKind::Minor
        );
    }

    #[test]
    fn test_everything_else_is_patch() {
        assert_eq!(
            bump_kind(&[
                proposal(ProposalCategory::Refactor, RiskLevel::High),
                proposal(ProposalCategory::PromptOnly, RiskLevel::Medium),
            ]),
            BumpKind::Patch
        );
        assert_eq!(bump_kind(&[]), BumpKind::Patch);
    }

    #[test]
    fn test_semver_bumps() {
        let v = SemVer::parse("v1.4.2").unwrap();
        assert_eq!(v.bump(BumpKind::Major).to_string(), "2.0.0");
        assert_eq!(v.bump(BumpKind::Minor).to_string(), "1.5.0");
        assert_eq!(v.bump(BumpKind::Patch).to_string(), "1.4.3");
    }

    #[test]
    fn test_semver_rejects_garbage() {
        for bad in ["1.2", "1.2.x", "", "1.2.3.4"] {
            assert!(matches!(
                SemVer::parse(bad),
                Err(GovernanceError::InvalidVersion(_))
            ));
        }
    }
}
