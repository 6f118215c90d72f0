//! Per-target serialization of triage passes.
//!
//! Two passes against the same target would both read the same decision
//! snapshot and could emit duplicate proposals. A pass holds its target's
//! lock across "read decisions → decide → write proposal and audit".
//!
//! These locks are in-process only. Separate processes sharing one data
//! directory must serialize at a coarser level; the `steward` binary holds an
//! exclusive lock on its data directory for each run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct TargetLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TargetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `target_id`, created on first use.
    ///
    /// Entries nobody else holds are dropped here, so the table only keeps
    /// targets with a pass in flight.
    pub fn lock_for(&self, target_id: &str) -> Arc<Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.retain(|id, lock| id == target_id || Arc::strong_count(lock) > 1);
        locks
            .entry(target_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
