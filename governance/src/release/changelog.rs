//! Changelog rendering, grouped by proposal category.

use std::fmt::Write;

use crate::model::{ImprovementProposal, ProposalCategory};

pub fn section_label(category: ProposalCategory) -> &'static str {
    match category {
        ProposalCategory::Security => "Security",
        ProposalCategory::Behavioral => "Behavior Changes",
        ProposalCategory::Refactor => "Refactoring",
        ProposalCategory::Dependency => "Dependencies",
        ProposalCategory::Docs => "Documentation",
        ProposalCategory::PromptOnly => "Prompt Updates",
    }
}

/// Markdown changelog; sections follow [`ProposalCategory::ordered`] and
/// empty sections are omitted.
pub fn render_changelog(version: &str, proposals: &[ImprovementProposal]) -> String {
    let mut out = format!("## {}\n", version);

    for &category in ProposalCategory::ordered() {
        let entries: Vec<&ImprovementProposal> =
            proposals.iter().filter(|p| p.category == category).collect();
        if entries.is_empty() {
            continue;
        }
        let _ = write!(out, "\n### {}\n\n", section_label(category));
        for p in entries {
            let _ = write!(out, "- {} (risk: {})", p.title, p.risk_level);
            let summary = p.summary_line();
            if !summary.is_empty() {
                let _ = write!(out, ": {}", summary);
            }
            out.push('\n');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RiskLevel;

    #[test]
    fn test_grouped_in_fixed_order() {
        let mut docs = ImprovementProposal::new("srv", "Document retries", ProposalCategory::Docs);
        docs.description = "Explain backoff\nmore detail".to_string();
        let mut sec = ImprovementProposal::new("srv", "Expire tokens", ProposalCategory::Security);
        sec.risk_level = RiskLevel::High;

        let log = render_changelog("1.2.0", &[docs, sec]);
        let security_at = log.find("### Security").unwrap();
        let docs_at = log.find("### Documentation").unwrap();
        assert!(security_at < docs_at);
        assert!(log.starts_with("## 1.2.0\n"));
        assert!(log.contains("- Expire tokens (risk: high)\n"));
        assert!(log.contains("- Document retries (risk: low): Explain backoff\n"));
        assert!(!log.contains("more detail"));
        assert!(!log.contains("### Refactoring"));
    }
}
