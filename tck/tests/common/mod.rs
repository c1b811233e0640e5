// Shared helpers for the conformance integration tests.

use std::path::PathBuf;

use gridfs_tck::fixtures::SpecReport;

/// Route engine logs through the test harness output.
#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Directory holding the bundled scenario documents.
#[allow(dead_code)]
pub fn specs_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("specs")
}

/// Fail the test with every non-passing entry listed.
#[allow(dead_code)]
pub fn assert_report_passed(report: &SpecReport) {
    let failures: Vec<String> = report
        .failures()
        .map(|entry| {
            format!(
                "{:?} '{}': {}",
                entry.status,
                entry.name,
                entry.error.as_deref().unwrap_or("")
            )
        })
        .collect();
    assert!(
        failures.is_empty(),
        "{}: {} of {} failed\n{}",
        report.spec,
        report.failed,
        report.total,
        failures.join("\n")
    );
}
