//! Architecture decision records: binding decisions with reversal conditions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::GovernanceConfig;

/// A binding decision. Active until `superseded_by` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adr {
    pub id: String,
    pub title: String,
    /// The decision itself, in prose.
    pub decision: String,
    #[serde(default)]
    pub context: String,
    pub confidence: f64,
    pub min_confidence_margin: f64,
    pub min_consecutive_cycles: u32,
    pub cooldown_until: DateTime<Utc>,
    #[serde(default)]
    pub superseded_by: Option<String>,
    #[serde(default)]
    pub superseded_at: Option<DateTime<Utc>>,
    /// Proposal identifiers (or target-qualified references) this decision governs.
    #[serde(default)]
    pub related_proposals: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Adr {
    /// New decision with reversal conditions taken from `config`.
    pub fn new(title: &str, decision: &str, confidence: f64, config: &GovernanceConfig) -> Self {
        let now = Utc::now();
        Self {
            id: format!("adr-{}", uuid::Uuid::new_v4()),
            title: title.to_string(),
            decision: decision.to_string(),
            context: String::new(),
            confidence,
            min_confidence_margin: config.min_confidence_margin,
            min_consecutive_cycles: config.min_consecutive_cycles,
            cooldown_until: shift_hours(now, config.cooldown_hours),
            superseded_by: None,
            superseded_at: None,
            related_proposals: Vec::new(),
            created_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.superseded_by.is_none()
    }

    /// Text used for similarity lookups.
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.decision)
    }

    /// Whether a related reference names `server_id`: the bare id, or a
    /// target-qualified reference such as `srv/prop-1` or `srv:prop-1`.
    pub fn mentions_server(&self, server_id: &str) -> bool {
        self.related_proposals.iter().any(|reference| {
            reference
                .strip_prefix(server_id)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', ':']))
        })
    }
}

/// `at` moved by `hours`, clamped to the representable range.
pub(crate) fn shift_hours(at: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    let shifted = Duration::try_hours(hours).and_then(|delta| at.checked_add_signed(delta));
    match shifted {
        Some(at) => at,
        None if hours < 0 => DateTime::<Utc>::MIN_UTC,
        None => DateTime::<Utc>::MAX_UTC,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_adr_uses_config_defaults() {
        let config = GovernanceConfig {
            cooldown_hours: 12,
            min_confidence_margin: 0.2,
            min_consecutive_cycles: 3,
            ..Default::default()
        };
        let adr = Adr::new("Use retries", "Retry idempotent calls", 0.8, &config);
        assert!(adr.is_active());
        assert_eq!(adr.min_consecutive_cycles, 3);
        assert!((adr.min_confidence_margin - 0.2).abs() < 1e-9);
        let cooldown = adr.cooldown_until - adr.created_at;
        assert_eq!(cooldown.num_hours(), 12);
    }

    #[test]
    fn test_huge_cooldown_saturates() {
        let config = GovernanceConfig {
            cooldown_hours: i64::MAX,
            ..Default::default()
        };
        let adr = Adr::new("Pin runtime", "Stay on the current runtime", 0.9, &config);
        assert_eq!(adr.cooldown_until, DateTime::<Utc>::MAX_UTC);

        let now = Utc::now();
        assert_eq!(shift_hours(now, -3_000_000_000), DateTime::<Utc>::MIN_UTC);
        assert_eq!(shift_hours(now, 2) - now, Duration::hours(2));
    }

    #[test]
    fn test_mentions_server() {
        let mut adr = Adr::new("t", "d", 0.5, &GovernanceConfig::default());
        adr.related_proposals = vec!["srv-alpha/prop-1".to_string()];
        assert!(adr.mentions_server("srv-alpha"));
        assert!(!adr.mentions_server("srv-beta"));

        adr.related_proposals = vec!["srv-2:prop-1".to_string(), "srv-2".to_string()];
        assert!(!adr.mentions_server("srv"));
        assert!(adr.mentions_server("srv-2"));

        adr.related_proposals = vec!["srv".to_string()];
        assert!(adr.mentions_server("srv"));
        assert!(!adr.mentions_server("sr"));
    }
}
