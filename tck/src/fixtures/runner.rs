//! Scenario execution engine.
//!
//! Runs every test case of a spec in declaration order against one
//! backend: run, verify, record, then clear the four collections whatever
//! happened. Results are collected into a [`SpecReport`].

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{debug, info, log_enabled, warn, Level};
use serde::{Deserialize, Serialize};

use super::backend::GridFsBackend;
use super::spec::Spec;
use super::test_case::TestCase;
use crate::error::{TckError, TckResult};

/// Outcome of one test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    /// Every assertion held
    Pass,
    /// An assertion did not hold
    Fail,
    /// The harness could not run the case (setup, unexpected failure, bad data)
    Error,
}

/// Individual test result entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResultEntry {
    /// Test description
    pub name: String,
    /// Status
    pub status: TestStatus,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Error message if not passed
    pub error: Option<String>,
}

/// Results of one spec run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecReport {
    /// Spec description
    pub spec: String,
    /// Test cases run
    pub total: usize,
    /// Test cases passed
    pub passed: usize,
    /// Test cases failed or errored
    pub failed: usize,
    /// Total duration in milliseconds
    pub duration_ms: u64,
    /// Individual results, in execution order
    pub results: Vec<TestResultEntry>,
}

impl SpecReport {
    /// Create an empty report for a spec.
    pub fn new(spec: &str) -> Self {
        Self {
            spec: spec.to_string(),
            total: 0,
            passed: 0,
            failed: 0,
            duration_ms: 0,
            results: Vec::new(),
        }
    }

    /// Record one test case outcome.
    pub fn add_result(&mut self, name: &str, outcome: &TckResult<()>, duration: Duration) {
        let status = match outcome {
            Ok(()) => TestStatus::Pass,
            Err(e) if e.is_assertion_failure() => TestStatus::Fail,
            Err(_) => TestStatus::Error,
        };
        self.total += 1;
        match status {
            TestStatus::Pass => self.passed += 1,
            TestStatus::Fail | TestStatus::Error => self.failed += 1,
        }

        self.results.push(TestResultEntry {
            name: name.to_string(),
            status,
            duration_ms: duration.as_millis() as u64,
            error: outcome.as_ref().err().map(|e| e.to_string()),
        });
    }

    /// Check if all tests passed
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Entries that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &TestResultEntry> {
        self.results
            .iter()
            .filter(|entry| entry.status != TestStatus::Pass)
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Run every test case of a spec on a backend.
///
/// Fails only when the spec itself is unusable or the backend cannot be
/// reset; per-case failures are recorded in the report.
pub async fn run_spec(spec: &Spec, backend: &mut dyn GridFsBackend) -> TckResult<SpecReport> {
    let start = Instant::now();
    let mut cases = spec.tests()?;
    reset_backend(spec, backend)?;

    let mut report = SpecReport::new(spec.description());
    for case in cases.iter_mut() {
        let case_start = Instant::now();
        let outcome = run_case(case, backend).await;
        case.clear_collections(backend);

        if let Err(e) = &outcome {
            if log_enabled!(Level::Warn) {
                warn!("{} / '{}': {}", spec.description(), case.description(), e);
            }
        }
        report.add_result(case.description(), &outcome, case_start.elapsed());
    }
    report.duration_ms = start.elapsed().as_millis() as u64;

    if log_enabled!(Level::Info) {
        info!(
            "Spec '{}' on {}: {}/{} passed",
            report.spec,
            backend.backend_name(),
            report.passed,
            report.total
        );
    }
    Ok(report)
}

/// Load and run a spec file on a backend.
pub async fn run_spec_file(path: &Path, backend: &mut dyn GridFsBackend) -> TckResult<SpecReport> {
    let spec = Spec::load(path)?;
    run_spec(&spec, backend).await
}

/// Load and run every spec in a directory on one backend.
pub async fn run_spec_dir(dir: &Path, backend: &mut dyn GridFsBackend) -> Result<Vec<SpecReport>> {
    let mut reports = Vec::new();
    for spec in Spec::load_dir(dir)? {
        reports.push(run_spec(&spec, backend).await?);
    }
    Ok(reports)
}

async fn run_case(case: &mut TestCase, backend: &mut dyn GridFsBackend) -> TckResult<()> {
    case.run(backend).await?;
    case.verify(backend)
}

// Leftovers from earlier runs would leak into the first case
fn reset_backend(spec: &Spec, backend: &dyn GridFsBackend) -> TckResult<()> {
    let names = backend
        .collection_names()
        .map_err(|e| TckError::fixture_setup(spec.description(), e))?;
    for name in names {
        let removed = backend
            .collection(&name)
            .delete_many(&Default::default());
        if removed > 0 && log_enabled!(Level::Debug) {
            debug!("Reset '{}': removed {} stale documents", name, removed);
        }
    }
    Ok(())
}
