//! Per-category evidence metadata index.
//!
//! Each category keeps a flat JSON object at
//! `external/<category>/index.json`, keyed by evidence file name.
//! Re-planting a name overwrites its entry: last plant wins, no history
//! merge.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PlantResult;
use crate::fsutil::atomic_write;

/// Metadata recorded for one planted evidence file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexEntry {
    /// Session commit timestamp of the most recent plant.
    pub last_update: String,
    /// Retention duration in seconds.
    pub ttl: u64,
    /// Committer email of the planter.
    pub planted_by: String,
    /// Free-form description supplied with the evidence.
    pub description: String,
}

/// The full metadata mapping for one category.
///
/// Serializes as a flat JSON object keyed by evidence file name,
/// pretty-printed so the on-disk file diffs cleanly between plants.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryIndex {
    entries: BTreeMap<String, IndexEntry>,
}

impl CategoryIndex {
    /// Load the index from a JSON file, or return an empty index if the
    /// file does not exist.
    ///
    /// A file that exists but holds invalid JSON is an error, never an
    /// empty index: silently dropping recorded entries is not allowed.
    pub fn load(path: &Path) -> PlantResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        let index: CategoryIndex = serde_json::from_str(&data)?;
        Ok(index)
    }

    /// Save the index to a JSON file (atomic: temp + fsync + rename).
    pub fn save(&self, path: &Path) -> PlantResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        atomic_write(path, json.as_bytes())?;
        Ok(())
    }

    /// Insert or overwrite the entry for an evidence file name.
    pub fn upsert(&mut self, name: &str, entry: IndexEntry) {
        self.entries.insert(name.to_string(), entry);
    }

    /// Get the entry for an evidence file name.
    pub fn get(&self, name: &str) -> Option<&IndexEntry> {
        self.entries.get(name)
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(description: &str) -> IndexEntry {
        IndexEntry {
            last_update: "2020-01-01T00:00:00Z".to_string(),
            ttl: 86_400,
            planted_by: "planter@example.com".to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_missing_file_is_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let idx = CategoryIndex::load(&dir.path().join("index.json")).unwrap();
        assert!(idx.is_empty());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        fs::write(&path, "{not json").unwrap();
        assert!(CategoryIndex::load(&path).is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut idx = CategoryIndex::default();
        idx.upsert("bar.json", entry("meh"));
        idx.save(&path).unwrap();

        let loaded = CategoryIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get("bar.json").unwrap().description, "meh");
    }

    #[test]
    fn test_upsert_overwrites_existing_entry() {
        let mut idx = CategoryIndex::default();
        idx.upsert("bar.json", entry("first"));
        idx.upsert("other.json", entry("kept"));
        idx.upsert("bar.json", entry("second"));

        assert_eq!(idx.len(), 2);
        assert_eq!(idx.get("bar.json").unwrap().description, "second");
        assert_eq!(idx.get("other.json").unwrap().description, "kept");
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let mut idx = CategoryIndex::default();
        idx.upsert("bar.json", entry("meh"));

        let json = serde_json::to_string_pretty(&idx).unwrap();
        assert!(json.starts_with("{\n  \"bar.json\""));
        assert!(!json.contains("entries"));
    }
}
