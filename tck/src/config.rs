//! Harness configuration.
//!
//! Defaults come from [`TckConfig::default`], a YAML file may override any
//! subset of fields, and `GRIDFS_TCK_*` environment variables override
//! both:
//!
//! ```bash
//! GRIDFS_TCK_SPEC_DIR=./specs GRIDFS_TCK_LEGACY=1 cargo test -p gridfs-tck
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gridfs_common::config::{DEFAULT_BUCKET_NAME, DEFAULT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};

/// Overrides the scenario directory.
pub const ENV_SPEC_DIR: &str = "GRIDFS_TCK_SPEC_DIR";
/// Overrides the bucket name.
pub const ENV_BUCKET: &str = "GRIDFS_TCK_BUCKET";
/// Forces the catalog-query fallback when truthy.
pub const ENV_LEGACY: &str = "GRIDFS_TCK_LEGACY";

const DEFAULT_SPEC_DIR: &str = "tests/specs";
const DEFAULT_DATABASE_NAME: &str = "gridfs_tck";

/// Settings for a conformance run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TckConfig {
    /// Directory holding scenario documents
    pub spec_dir: PathBuf,
    /// Database the backend works in
    pub database_name: String,
    /// Bucket (collection prefix) for file actions
    pub bucket_name: String,
    /// Bucket chunk size when an upload does not override it
    pub chunk_size_bytes: usize,
    /// Simulate a server without the native collection listing command
    pub legacy_server: bool,
}

impl Default for TckConfig {
    fn default() -> Self {
        Self {
            spec_dir: PathBuf::from(DEFAULT_SPEC_DIR),
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            bucket_name: DEFAULT_BUCKET_NAME.to_string(),
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            legacy_server: false,
        }
    }
}

impl TckConfig {
    /// Parse a YAML configuration; missing fields keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse TCK config YAML")
    }

    /// Read a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read TCK config: {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Defaults with process environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `GRIDFS_TCK_*` overrides read through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_SPEC_DIR) {
            self.spec_dir = PathBuf::from(dir);
        }
        if let Some(bucket) = lookup(ENV_BUCKET).filter(|b| !b.trim().is_empty()) {
            self.bucket_name = bucket;
        }
        if let Some(flag) = lookup(ENV_LEGACY) {
            self.legacy_server = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_yaml_keeps_defaults() {
        let config = TckConfig::from_yaml("bucket_name: images\n").unwrap();
        assert_eq!(config.bucket_name, "images");
        assert_eq!(config.chunk_size_bytes, DEFAULT_CHUNK_SIZE);
        assert!(!config.legacy_server);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(TckConfig::from_yaml("chunk_size_bytes: lots\n").is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_SPEC_DIR, "/tmp/specs"),
            (ENV_BUCKET, "media"),
            (ENV_LEGACY, "TRUE"),
        ]
        .into_iter()
        .collect();

        let config = TckConfig::default().with_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.spec_dir, PathBuf::from("/tmp/specs"));
        assert_eq!(config.bucket_name, "media");
        assert!(config.legacy_server);
    }

    #[test]
    fn test_blank_bucket_ignored() {
        let config = TckConfig::default()
            .with_overrides(|key| (key == ENV_BUCKET).then(|| "  ".to_string()));
        assert_eq!(config.bucket_name, DEFAULT_BUCKET_NAME);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tck.yml");
        std::fs::write(&path, "legacy_server: true\nspec_dir: specs\n").unwrap();

        let config = TckConfig::from_file(&path).unwrap();
        assert!(config.legacy_server);
        assert_eq!(config.spec_dir, PathBuf::from("specs"));
    }
}
