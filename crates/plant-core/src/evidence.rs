//! External evidence records.
//!
//! One evidence record couples an external file's content with the
//! compliance metadata recorded alongside it in the locker. Records are
//! immutable once constructed and live for the duration of a single
//! planting operation.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PlantError, PlantResult};

/// Default evidence retention: one year, in seconds.
pub const DEFAULT_TTL: u64 = 31_536_000;

/// Root directory for externally planted evidence inside the locker.
pub const EXTERNAL_ROOT: &str = "external";

/// Name of the per-category metadata index file.
pub const INDEX_FILE: &str = "index.json";

/// One external evidence file plus its compliance metadata.
#[derive(Debug, Clone)]
pub struct Evidence {
    name: String,
    category: String,
    ttl: u64,
    description: String,
    content: Vec<u8>,
}

impl Evidence {
    /// Build an evidence record from in-memory content.
    ///
    /// `ttl` falls back to [`DEFAULT_TTL`] when not supplied. Names and
    /// categories become path components under `external/`, so neither
    /// may be empty or contain a separator.
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        ttl: Option<u64>,
        description: impl Into<String>,
        content: Vec<u8>,
    ) -> PlantResult<Self> {
        let name = name.into();
        let category = category.into();
        if name.is_empty() || name.contains('/') {
            return Err(PlantError::Evidence(format!("invalid evidence name {name:?}")));
        }
        if category.is_empty() || category.contains('/') {
            return Err(PlantError::Evidence(format!("invalid category {category:?}")));
        }
        Ok(Self {
            name,
            category,
            ttl: ttl.unwrap_or(DEFAULT_TTL),
            description: description.into(),
            content,
        })
    }

    /// Build an evidence record from a file on disk.
    ///
    /// The evidence name is the file's basename; content is read eagerly.
    pub fn from_file(
        path: &Path,
        category: &str,
        ttl: Option<u64>,
        description: &str,
    ) -> PlantResult<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                PlantError::Evidence(format!("path {} has no file name", path.display()))
            })?
            .to_string();
        let content = fs::read(path)?;
        Self::new(name, category, ttl, description, content)
    }

    /// The evidence file's basename, also its key in the category index.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Category label grouping this evidence under `external/<category>/`.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Retention duration in seconds.
    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    /// Free-form description recorded in the metadata entry.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Raw file content, written verbatim into the locker.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Locker-relative path of the evidence file itself.
    pub fn rel_path(&self) -> PathBuf {
        Path::new(EXTERNAL_ROOT).join(&self.category).join(&self.name)
    }

    /// Locker-relative path of this category's metadata index.
    pub fn index_rel_path(&self) -> PathBuf {
        Path::new(EXTERNAL_ROOT).join(&self.category).join(INDEX_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttl_applied() {
        let ev = Evidence::new("bar.json", "foo", None, "meh", vec![]).unwrap();
        assert_eq!(ev.ttl(), DEFAULT_TTL);

        let ev = Evidence::new("bar.json", "foo", Some(86_400), "meh", vec![]).unwrap();
        assert_eq!(ev.ttl(), 86_400);
    }

    #[test]
    fn test_locker_relative_paths() {
        let ev = Evidence::new("bar.json", "foo", None, "", vec![]).unwrap();
        assert_eq!(ev.rel_path(), Path::new("external/foo/bar.json"));
        assert_eq!(ev.index_rel_path(), Path::new("external/foo/index.json"));
    }

    #[test]
    fn test_rejects_bad_name_and_category() {
        assert!(Evidence::new("", "foo", None, "", vec![]).is_err());
        assert!(Evidence::new("a/b.json", "foo", None, "", vec![]).is_err());
        assert!(Evidence::new("bar.json", "", None, "", vec![]).is_err());
        assert!(Evidence::new("bar.json", "f/o", None, "", vec![]).is_err());
    }

    #[test]
    fn test_from_file_uses_basename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bar.json");
        fs::write(&path, b"{\"ok\": true}").unwrap();

        let ev = Evidence::from_file(&path, "foo", None, "meh").unwrap();
        assert_eq!(ev.name(), "bar.json");
        assert_eq!(ev.content(), b"{\"ok\": true}");
    }
}
