//! # GridFS-TCK: Chunked File Storage Compatibility Kit
//!
//! Declarative conformance testing for chunked file storage: a `files`
//! collection of metadata documents plus a `chunks` collection of ordered
//! binary segments.
//!
//! Scenarios are data, not code. Each one names a shared pre-state, an
//! operation, and either an expected result or an expected failure kind,
//! optionally with the expected post-state of both collections.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gridfs_tck::prelude::*;
//!
//! #[tokio::test]
//! async fn test_upload_specs() {
//!     let config = TckConfig::from_env();
//!     let mut backend = InMemoryBackend::from_config(&config);
//!     let reports = run_spec_dir(&config.spec_dir, &mut backend).await.unwrap();
//!     assert!(reports.iter().all(SpecReport::all_passed));
//! }
//! ```
//!
//! ## Design Principles
//!
//! 1. **Sequential**: one test case runs to completion before the next
//! 2. **Explicit state**: collections are cleared between test cases, never implicitly
//! 3. **Loud failures**: only failures a scenario expects are caught

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Engine error kinds
pub mod error;

/// Harness configuration (YAML + environment overrides)
pub mod config;

/// Scenario engine: parsing, transformation, execution and matching
pub mod fixtures;

/// Convenient re-exports for common usage
pub mod prelude;

pub use error::{TckError, TckResult};

// =============================================================================
// Version Information
// =============================================================================

/// TCK version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Framework version descriptor
pub const TCK_VERSION: &str = "GridFS-TCK V1.0";
