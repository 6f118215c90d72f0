//! Turning a consensus finding into a proposal draft.

use crate::consensus::ConsensusFinding;
use crate::model::{ImpactVector, ImprovementProposal, ProposalCategory, RiskLevel};

/// Keyword signals per category, checked in this order; first match wins.
const CATEGORY_SIGNALS: &[(ProposalCategory, &[&str])] = &[
    (
        ProposalCategory::Security,
        &[
            "security", "vulnerab", "auth", "injection", "secret", "credential", "token",
            "permission", "encrypt", "sanitiz", "xss", "csrf", "cve",
        ],
    ),
    (
        ProposalCategory::Dependency,
        &[
            "dependency", "dependencies", "upgrade", "outdated", "package", "library", "crate",
            "bump",
        ],
    ),
    (
        ProposalCategory::Refactor,
        &[
            "refactor", "clean up", "cleanup", "duplicat", "simplif", "restructur", "dead code",
            "extract",
        ],
    ),
    (
        ProposalCategory::Docs,
        &["documentation", "docs", "readme", "docstring", "changelog", "usage example"],
    ),
    (
        ProposalCategory::PromptOnly,
        &["prompt", "wording", "tool description", "instruction text", "phrasing"],
    ),
];

/// Impact above this on a dimension adds that dimension's criterion.
const CRITERION_THRESHOLD: f64 = 0.3;

pub fn infer_category(text: &str) -> ProposalCategory {
    let lower = text.to_lowercase();
    CATEGORY_SIGNALS
        .iter()
        .find(|(_, signals)| signals.iter().any(|s| lower.contains(s)))
        .map(|(category, _)| *category)
        .unwrap_or(ProposalCategory::Behavioral)
}

pub fn acceptance_criteria(impact: &ImpactVector) -> Vec<String> {
    let templates = [
        (
            impact.reliability,
            "Failure paths covered by tests; error rate does not increase",
        ),
        (
            impact.security,
            "Security review passes with no new medium-or-higher findings",
        ),
        (
            impact.devex,
            "Interface change documented with a before/after example",
        ),
        (
            impact.performance,
            "p95 latency does not regress against the baseline benchmark",
        ),
    ];

    let mut criteria: Vec<String> = templates
        .iter()
        .filter(|(value, _)| *value > CRITERION_THRESHOLD)
        .map(|(_, text)| text.to_string())
        .collect();
    if criteria.is_empty() {
        criteria.push("Originating finding no longer reproduces".to_string());
    }
    criteria
}

pub fn estimate_loc_change(impact: &ImpactVector, risk: RiskLevel) -> u32 {
    (impact.magnitude() * risk.loc_multiplier()).round() as u32
}

/// Draft a proposal from `finding`. Status, priority and scorecards are
/// left to the caller.
pub fn synthesize_proposal(finding: &ConsensusFinding, target_id: &str) -> ImprovementProposal {
    let text = format!("{} {}", finding.claim, finding.recommendation);
    let mut proposal =
        ImprovementProposal::new(target_id, &finding.recommendation, infer_category(&text));
    proposal.description = format!("{}\n\n{}", finding.recommendation, finding.claim);
    proposal.risk_level = finding.risk_level;
    proposal.estimated_loc_change = estimate_loc_change(&finding.merged_impact, finding.risk_level);
    proposal.acceptance_criteria = acceptance_criteria(&finding.merged_impact);
    proposal.source_perspectives = finding.supporting_perspectives.clone();
    proposal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_order_first_match_wins() {
        // Mentions both a dependency and a credential: security is checked first.
        assert_eq!(
            infer_category("Upgrade the package that leaks credentials"),
            ProposalCategory::Security
        );
        assert_eq!(infer_category("Bump outdated crate"), ProposalCategory::Dependency);
        assert_eq!(infer_category("Refactor the handler"), ProposalCategory::Refactor);
        assert_eq!(infer_category("Expand the README"), ProposalCategory::Docs);
        assert_eq!(infer_category("Tighten the prompt"), ProposalCategory::PromptOnly);
        assert_eq!(
            infer_category("External calls lack a timeout"),
            ProposalCategory::Behavioral
        );
    }

    #[test]
    fn test_criteria_gated_above_threshold() {
        let criteria = acceptance_criteria(&ImpactVector::new(0.31, 0.3, 0.9, -0.8));
        assert_eq!(criteria.len(), 2);
        assert!(criteria[0].starts_with("Failure paths"));
        assert!(criteria[1].starts_with("Interface change"));

        let fallback = acceptance_criteria(&ImpactVector::default());
        assert_eq!(fallback.len(), 1);
    }

    #[test]
    fn test_loc_estimate() {
        let impact = ImpactVector::new(0.5, -0.25, 0.0, 0.25);
        assert_eq!(estimate_loc_change(&impact, RiskLevel::Critical), 200);
        assert_eq!(estimate_loc_change(&impact, RiskLevel::Low), 50);
        assert_eq!(estimate_loc_change(&ImpactVector::default(), RiskLevel::High), 0);
    }

    #[test]
    fn test_synthesize() {
        let finding = ConsensusFinding {
            claim: "Login tokens never expire".to_string(),
            recommendation: "Expire tokens after one hour".to_string(),
            supporting_perspectives: vec!["security".to_string(), "reliability".to_string()],
            agreement_score: 1.0,
            combined_confidence: 0.8,
            merged_impact: ImpactVector::new(0.1, 0.8, 0.0, 0.0),
            merged_evidence: vec![],
            risk_level: RiskLevel::High,
        };
        let proposal = synthesize_proposal(&finding, "srv");
        assert_eq!(proposal.category, ProposalCategory::Security);
        assert_eq!(proposal.title, "Expire tokens after one hour");
        assert_eq!(proposal.summary_line(), "Expire tokens after one hour");
        assert_eq!(proposal.estimated_loc_change, 135);
        assert_eq!(proposal.risk_level, RiskLevel::High);
        assert_eq!(proposal.source_perspectives.len(), 2);
    }
}
