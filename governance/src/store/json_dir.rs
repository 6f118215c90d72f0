//! File-backed record store: `<root>/<collection>/<id>.json`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{Listing, RecordStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

/// Map an id onto a safe file stem.
fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl JsonDirStore {
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(file_stem(collection))
    }

    fn record_path(&self, collection: &str, id: &str) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{}.json", file_stem(id)))
    }
}

impl RecordStore for JsonDirStore {
    fn put(&self, collection: &str, id: &str, value: &serde_json::Value) -> StoreResult<()> {
        let dir = self.collection_dir(collection);
        fs::create_dir_all(&dir)?;

        let json = serde_json::to_string_pretty(value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        // Write-then-rename so readers never observe a half-written record.
        let path = self.record_path(collection, id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;

        debug!(collection, id, path = %path.display(), "Record written");
        Ok(())
    }

    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<serde_json::Value>> {
        let path = self.record_path(collection, id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Deserialization {
                collection: collection.to_string(),
                id: id.to_string(),
                reason: e.to_string(),
            })
    }

    fn list(&self, collection: &str) -> StoreResult<Listing<serde_json::Value>> {
        let dir = self.collection_dir(collection);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Listing::empty()),
            Err(e) => return Err(e.into()),
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut listing = Listing::empty();
        for path in paths {
            let parsed = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|content| {
                    serde_json::from_str::<serde_json::Value>(&content).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(value) => listing.records.push(value),
                Err(reason) => {
                    warn!(collection, path = %path.display(), %reason, "Skipping unreadable record");
                    listing.skipped += 1;
                }
            }
        }

        Ok(listing)
    }
}
