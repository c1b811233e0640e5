// GridFS Conformance Runner
//
// Purpose: run every scenario document in a directory against the
// in-memory backend and report the outcome.
//
// Usage:
//   cargo run -p gridfs-tck --bin gridfs_conformance -- --spec-dir tck/tests/specs
//   cargo run -p gridfs-tck --bin gridfs_conformance -- --legacy --json

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use log::{error, info};

use gridfs_tck::config::TckConfig;
use gridfs_tck::fixtures::{run_spec_dir, InMemoryBackend, SpecReport};

#[derive(Parser, Debug)]
#[command(name = "gridfs_conformance")]
#[command(about = "Run chunked file storage conformance scenarios")]
struct Args {
    /// YAML configuration file (environment overrides still apply)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding scenario documents
    #[arg(short, long)]
    spec_dir: Option<PathBuf>,

    /// Bucket name used for file actions
    #[arg(short, long)]
    bucket: Option<String>,

    /// Simulate a server without the native collection listing command
    #[arg(long)]
    legacy: bool,

    /// Print the reports as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn into_config(self) -> Result<TckConfig> {
        let base = match &self.config {
            Some(path) => TckConfig::from_file(path)?,
            None => TckConfig::default(),
        };
        let mut config = base.with_overrides(|key| std::env::var(key).ok());
        if let Some(dir) = self.spec_dir {
            config.spec_dir = dir;
        }
        if let Some(bucket) = self.bucket {
            config.bucket_name = bucket;
        }
        config.legacy_server |= self.legacy;
        Ok(config)
    }
}

fn print_summary(reports: &[SpecReport]) {
    for report in reports {
        info!(
            "{}: {}/{} passed ({} ms)",
            report.spec, report.passed, report.total, report.duration_ms
        );
        for failure in report.failures() {
            error!(
                "  {:?} '{}': {}",
                failure.status,
                failure.name,
                failure.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let json = args.json;
    let config = args.into_config()?;

    let mut backend = InMemoryBackend::from_config(&config);
    let reports = run_spec_dir(&config.spec_dir, &mut backend).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_summary(&reports);
    }

    let failed: usize = reports.iter().map(|report| report.failed).sum();
    if failed > 0 {
        bail!("{} conformance test(s) did not pass", failed);
    }
    Ok(())
}
