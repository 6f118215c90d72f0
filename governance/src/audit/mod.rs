//! Governance audit trail.
//!
//! Every triage outcome, blocked oscillation check, decision change and
//! release transition is appended here. Appends are fire-and-forget from
//! the engines' point of view: a failed append is logged, never surfaced.
//!
//! # Chain
//!
//! ```text
//! genesis(0…0) ─▶ entry 0 ─▶ entry 1 ─▶ …
//!                 hash = blake3(seq, ts, actor, action, target, corr, details, prev_hash)
//! ```

pub mod chain;

pub use chain::HashChainLog;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error type for audit log operations
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Chain broken at entry {index}")]
    IntegrityViolation { index: usize },

    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Result type for audit log operations
pub type AuditResult<T> = Result<T, AuditError>;

/// An event to be appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: String,
    pub actor: String,
    pub target_type: String,
    pub target_id: String,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl AuditEvent {
    pub fn new(action: &str, actor: &str, target_type: &str, target_id: &str) -> Self {
        Self {
            action: action.to_string(),
            actor: actor.to_string(),
            target_type: target_type.to_string(),
            target_id: target_id.to_string(),
            correlation_id: None,
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_correlation(mut self, correlation_id: Option<&str>) -> Self {
        self.correlation_id = correlation_id.map(str::to_string);
        self
    }
}

/// An appended, hash-linked entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: AuditEvent,
    pub prev_hash: String,
    pub hash: String,
}

/// Filter for [`HashChainLog::query`]. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditQuery {
    pub actor: Option<String>,
    pub action: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub correlation_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl AuditQuery {
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        fn field_ok(filter: &Option<String>, value: &str) -> bool {
            filter.as_deref().map_or(true, |f| f == value)
        }

        field_ok(&self.actor, &entry.event.actor)
            && field_ok(&self.action, &entry.event.action)
            && field_ok(&self.target_type, &entry.event.target_type)
            && field_ok(&self.target_id, &entry.event.target_id)
            && self
                .correlation_id
                .as_deref()
                .map_or(true, |c| entry.event.correlation_id.as_deref() == Some(c))
            && self.since.map_or(true, |since| entry.timestamp >= since)
            && self.until.map_or(true, |until| entry.timestamp <= until)
    }
}

/// Append-only sink for governance events.
pub trait AuditLog: Send + Sync {
    /// Append an event. Failures are logged by the implementation.
    fn record(&self, event: AuditEvent);
}
