//! Similarity search over prior decisions.
//!
//! Decision logic only sees the `SimilaritySearch` trait, so the backing
//! index (naive text overlap here, an embedding index elsewhere) can change
//! without touching the engines.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use super::text_similarity;

/// A searchable decision with free-form metadata tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionEntry {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl DecisionEntry {
    pub fn new(id: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarMatch {
    pub entry: DecisionEntry,
    /// Similarity in [0, 1].
    pub similarity: f64,
}

/// Ranked similarity lookup.
pub trait SimilaritySearch: Send + Sync {
    /// Up to `k` matches, highest similarity first.
    fn query(&self, text: &str, k: usize) -> Vec<SimilarMatch>;
}

/// In-memory index scored with [`text_similarity`].
#[derive(Debug, Default)]
pub struct DecisionIndex {
    entries: RwLock<Vec<DecisionEntry>>,
}

impl DecisionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry with the same id.
    pub fn insert(&self, entry: DecisionEntry) {
        let Ok(mut entries) = self.entries.write() else {
            tracing::warn!(id = %entry.id, "Decision index lock poisoned, entry dropped");
            return;
        };
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SimilaritySearch for DecisionIndex {
    fn query(&self, text: &str, k: usize) -> Vec<SimilarMatch> {
        let Ok(entries) = self.entries.read() else {
            return Vec::new();
        };

        let mut matches: Vec<SimilarMatch> = entries
            .iter()
            .map(|entry| SimilarMatch {
                similarity: text_similarity(text, &entry.text),
                entry: entry.clone(),
            })
            .filter(|m| m.similarity > 0.0)
            .collect();

        // Stable sort keeps insertion order among equal scores.
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches.truncate(k);
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_ranks_and_truncates() {
        let index = DecisionIndex::new();
        index.insert(DecisionEntry::new("d1", "cache tool responses"));
        index.insert(DecisionEntry::new("d2", "cache tool responses aggressively"));
        index.insert(DecisionEntry::new("d3", "rotate signing keys"));

        let matches = index.query("cache tool responses", 5);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].entry.id, "d1");
        assert!(matches[0].similarity >= matches[1].similarity);

        let top = index.query("cache tool responses", 1);
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn test_insert_replaces_same_id() {
        let index = DecisionIndex::new();
        index.insert(DecisionEntry::new("d1", "old text"));
        index.insert(DecisionEntry::new("d1", "new text").with_tag("kind", "adr"));
        assert_eq!(index.len(), 1);
        let matches = index.query("new text", 3);
        assert_eq!(matches[0].entry.metadata.get("kind").unwrap(), "adr");
    }

    #[test]
    fn test_empty_index() {
        let index = DecisionIndex::new();
        assert!(index.is_empty());
        assert!(index.query("anything", 10).is_empty());
    }
}
