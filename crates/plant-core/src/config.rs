//! Planting and git configuration mappings.
//!
//! A planting run is driven by a JSON mapping of absolute evidence file
//! paths to their details, supplied inline or from a file. An optional
//! second mapping carries git configuration (commit signing settings)
//! applied to the local clone.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{PlantError, PlantResult};

/// Details for one evidence file in the planting configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvidenceDetail {
    /// Category the evidence is filed under. Required.
    pub category: String,
    /// Retention in seconds. Defaults to one year when absent.
    #[serde(default)]
    pub ttl: Option<u64>,
    /// Free-form description recorded in the metadata entry.
    #[serde(default)]
    pub description: Option<String>,
}

/// The full planting configuration: absolute evidence path to detail.
///
/// Entries are planted in sorted path order, which keeps the planted
/// list and commit message deterministic for a given configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct PlantConfig {
    files: BTreeMap<String, EvidenceDetail>,
}

impl PlantConfig {
    /// Parse the configuration from an inline JSON string.
    pub fn from_json_str(json: &str) -> PlantResult<Self> {
        let config: PlantConfig = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Parse the configuration from a JSON file.
    pub fn from_file(path: &Path) -> PlantResult<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Iterate over `(evidence path, detail)` pairs in planting order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EvidenceDetail)> {
        self.files.iter().map(|(path, detail)| (path.as_str(), detail))
    }

    /// Number of evidence files to plant.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the configuration names no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Nested git configuration applied to the local clone, for example
/// `{"commit":{"gpgsign":true},"user":{"signingKey":"...","email":"..."}}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct GitSettings {
    sections: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
}

impl GitSettings {
    /// Parse the settings from an inline JSON string.
    pub fn from_json_str(json: &str) -> PlantResult<Self> {
        let settings: GitSettings = serde_json::from_str(json)?;
        Ok(settings)
    }

    /// Parse the settings from a JSON file.
    pub fn from_file(path: &Path) -> PlantResult<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Flatten to `("section.key", value)` pairs in git's string form.
    ///
    /// Only scalar values are representable in a git config; a nested
    /// object or array under a key is a configuration error.
    pub fn entries(&self) -> PlantResult<Vec<(String, String)>> {
        let mut flat = Vec::new();
        for (section, keys) in &self.sections {
            for (key, value) in keys {
                let rendered = match value {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Bool(b) => b.to_string(),
                    serde_json::Value::Number(n) => n.to_string(),
                    _ => {
                        return Err(PlantError::Config(format!(
                            "git config value for {section}.{key} must be a string, boolean, or number"
                        )));
                    }
                };
                flat.push((format!("{section}.{key}"), rendered));
            }
        }
        Ok(flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_planting_config() {
        let config = PlantConfig::from_json_str(
            r#"{"/home/foo/bar.json": {"category": "foo", "ttl": 86400, "description": "meh"}}"#,
        )
        .unwrap();

        let (path, detail) = config.iter().next().unwrap();
        assert_eq!(path, "/home/foo/bar.json");
        assert_eq!(detail.category, "foo");
        assert_eq!(detail.ttl, Some(86_400));
        assert_eq!(detail.description.as_deref(), Some("meh"));
    }

    #[test]
    fn test_only_category_is_required() {
        let config =
            PlantConfig::from_json_str(r#"{"/home/foo/bar.json": {"category": "foo"}}"#).unwrap();
        let (_, detail) = config.iter().next().unwrap();
        assert_eq!(detail.ttl, None);
        assert_eq!(detail.description, None);
    }

    #[test]
    fn test_unknown_detail_keys_rejected() {
        let result = PlantConfig::from_json_str(
            r#"{"/home/foo/bar.json": {"category": "foo", "bogus": 1}}"#,
        );
        assert!(matches!(result, Err(PlantError::Json(_))));
    }

    #[test]
    fn test_git_settings_flatten() {
        let settings = GitSettings::from_json_str(
            r#"{"commit": {"gpgsign": true}, "user": {"email": "planter@example.com"}}"#,
        )
        .unwrap();

        let entries = settings.entries().unwrap();
        assert_eq!(
            entries,
            vec![
                ("commit.gpgsign".to_string(), "true".to_string()),
                ("user.email".to_string(), "planter@example.com".to_string()),
            ]
        );
    }

    #[test]
    fn test_git_settings_reject_nested_values() {
        let settings =
            GitSettings::from_json_str(r#"{"user": {"email": {"nested": true}}}"#).unwrap();
        assert!(matches!(settings.entries(), Err(PlantError::Config(_))));
    }
}
