//! Scenario sources.
//!
//! A [`Spec`] is one loaded scenario document: its shared fixture data and
//! the ordered scenario entries, turned into [`TestCase`]s on demand.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, log_enabled, warn, Level};
use walkdir::WalkDir;

use super::parser::{parse_spec, parse_spec_file, spec_description};
use super::test_case::TestCase;
use super::types::{SharedData, SpecFile};
use crate::error::TckResult;

const SPEC_EXTENSIONS: [&str; 3] = ["yml", "yaml", "json"];

/// One loaded scenario document.
#[derive(Debug, Clone)]
pub struct Spec {
    description: String,
    file: SpecFile,
}

impl Spec {
    /// Load a scenario document; its description is the file's base name.
    pub fn load(path: &Path) -> TckResult<Self> {
        Ok(Self {
            description: spec_description(path),
            file: parse_spec_file(path)?,
        })
    }

    /// Parse a scenario document held in memory.
    pub fn parse(description: &str, text: &str) -> TckResult<Self> {
        Ok(Self {
            description: description.to_string(),
            file: parse_spec(description, text)?,
        })
    }

    /// Load every scenario document under `dir`, in path order.
    ///
    /// A document that fails to load aborts the whole directory.
    pub fn load_dir(dir: &Path) -> Result<Vec<Self>> {
        let paths = spec_paths(dir)
            .with_context(|| format!("Failed to list spec directory: {}", dir.display()))?;
        if paths.is_empty() && log_enabled!(Level::Warn) {
            warn!("No spec files found in {}", dir.display());
        }

        let specs = paths
            .iter()
            .map(|path| {
                Self::load(path).with_context(|| format!("Failed to load spec: {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?;

        if log_enabled!(Level::Info) {
            info!("Loaded {} spec files from {}", specs.len(), dir.display());
        }
        Ok(specs)
    }

    /// Spec description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Shared fixture documents.
    pub fn data(&self) -> &SharedData {
        &self.file.data
    }

    /// Number of scenario entries.
    pub fn len(&self) -> usize {
        self.file.tests.len()
    }

    /// Whether the document declares no scenarios.
    pub fn is_empty(&self) -> bool {
        self.file.tests.is_empty()
    }

    /// Fresh test cases, one per scenario entry, in declaration order.
    pub fn tests(&self) -> TckResult<Vec<TestCase>> {
        self.file
            .tests
            .iter()
            .map(|definition| TestCase::new(&self.file.data, definition))
            .collect()
    }
}

fn spec_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry?;
        let is_spec = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SPEC_EXTENSIONS.contains(&ext));
        if entry.file_type().is_file() && is_spec {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}
