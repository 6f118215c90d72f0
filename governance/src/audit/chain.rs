//! Hash-chained audit log with an optional JSONL file sink.

use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use fs2::FileExt;
use tracing::{debug, warn};

use super::{AuditEntry, AuditError, AuditEvent, AuditLog, AuditQuery, AuditResult};

/// Hash used as `prev_hash` of the first entry.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

fn entry_hash(entry: &AuditEntry) -> String {
    let sequence = entry.sequence.to_string();
    let timestamp = entry.timestamp.to_rfc3339();
    let details = serde_json::to_string(&entry.event.details).unwrap_or_default();
    let mut hasher = blake3::Hasher::new();
    for part in [
        sequence.as_str(),
        timestamp.as_str(),
        entry.event.actor.as_str(),
        entry.event.action.as_str(),
        entry.event.target_type.as_str(),
        entry.event.target_id.as_str(),
        entry.event.correlation_id.as_deref().unwrap_or(""),
        details.as_str(),
        entry.prev_hash.as_str(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().to_string()
}

/// Append-only log where each entry commits to its predecessor.
///
/// Appends hold a mutex across "read last hash → hash → push → write",
/// so concurrent writers in one process are serialized. A file-backed log
/// also takes an exclusive lock on the file and reloads it before hashing,
/// so handles in other processes always chain off the current tail.
#[derive(Debug, Default)]
pub struct HashChainLog {
    entries: Mutex<Vec<AuditEntry>>,
    sink: Option<PathBuf>,
}

/// Parse JSON lines, skipping unreadable ones with a warning.
fn parse_entries(content: &str) -> Vec<AuditEntry> {
    let mut entries = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<AuditEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(line = line_no + 1, error = %e, "Skipping unreadable audit line"),
        }
    }
    entries
}

impl HashChainLog {
    /// In-memory log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log persisted as JSON lines at `path`; existing entries are loaded.
    ///
    /// Lines that fail to parse are skipped with a warning; `verify_chain`
    /// will then report the gap.
    pub fn open(path: impl Into<PathBuf>) -> AuditResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            parse_entries(&fs::read_to_string(&path)?)
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            Vec::new()
        };

        debug!(count = entries.len(), path = %path.display(), "Audit log opened");
        Ok(Self {
            entries: Mutex::new(entries),
            sink: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.sink.as_deref()
    }

    /// Append and return the new entry.
    pub fn append(&self, event: AuditEvent) -> AuditResult<AuditEntry> {
        let mut entries = self.entries.lock().map_err(|_| AuditError::LockPoisoned)?;

        // Held until the end of the call; released on drop.
        let mut file = match &self.sink {
            Some(path) => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .read(true)
                    .append(true)
                    .open(path)?;
                file.lock_exclusive()?;
                let mut content = String::new();
                file.seek(SeekFrom::Start(0))?;
                file.read_to_string(&mut content)?;
                let on_disk = parse_entries(&content);
                if on_disk.len() != entries.len() {
                    debug!(
                        cached = entries.len(),
                        on_disk = on_disk.len(),
                        "Audit log changed on disk, reloaded"
                    );
                }
                *entries = on_disk;
                Some(file)
            }
            None => None,
        };

        let prev_hash = entries
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        let mut entry = AuditEntry {
            sequence: entries.len() as u64,
            timestamp: Utc::now(),
            event,
            prev_hash,
            hash: String::new(),
        };
        entry.hash = entry_hash(&entry);

        if let Some(file) = file.as_mut() {
            let line = serde_json::to_string(&entry)
                .map_err(|e| AuditError::Serialization(e.to_string()))?;
            writeln!(file, "{}", line)?;
            file.flush()?;
        }

        entries.push(entry.clone());
        Ok(entry)
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn query(&self, query: &AuditQuery) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.iter().filter(|e| query.matches(e)).cloned().collect())
            .unwrap_or_default()
    }

    /// Recompute every link. Returns the number of verified entries.
    pub fn verify_chain(&self) -> AuditResult<usize> {
        let entries = self.entries.lock().map_err(|_| AuditError::LockPoisoned)?;
        let mut prev = GENESIS_HASH.to_string();
        for (index, entry) in entries.iter().enumerate() {
            if entry.sequence != index as u64
                || entry.prev_hash != prev
                || entry.hash != entry_hash(entry)
            {
                return Err(AuditError::IntegrityViolation { index });
            }
            prev = entry.hash.clone();
        }
        Ok(entries.len())
    }
}

impl AuditLog for HashChainLog {
    fn record(&self, event: AuditEvent) {
        let action = event.action.clone();
        match self.append(event) {
            Ok(entry) => debug!(action = %action, sequence = entry.sequence, "Audit event recorded"),
            Err(e) => warn!(action = %action, error = %e, "Failed to record audit event"),
        }
    }
}
