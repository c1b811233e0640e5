//! Chunked File Storage Conformance Engine
//!
//! Declarative scenario testing where authors specify:
//! 1. Shared pre-state (files and chunks documents)
//! 2. An operation to perform (upload, download, delete)
//! 3. The expected result or expected failure kind
//! 4. Optionally, the expected post-state of both collections
//!
//! The engine handles fixture setup, execution, verification and cleanup.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Scenario YAML ──▶ Parser ──▶ Spec ──▶ TestCase ──▶ Runner   │
//! │                                           │                  │
//! │                     ┌─────────────────────┼──────────┐       │
//! │                     ▼                     ▼          ▼       │
//! │              DataTransformer         Operation    Matchers   │
//! │                                           │                  │
//! │                                           ▼                  │
//! │                                    GridFsBackend             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gridfs_tck::fixtures::{run_spec, InMemoryBackend, Spec};
//!
//! #[tokio::test]
//! async fn test_delete_missing() {
//!     let spec = Spec::parse("delete.yml", r#"
//!     data: { files: [], chunks: [] }
//!     tests:
//!       - description: "Delete when files entry does not exist"
//!         act:
//!           operation: delete
//!           arguments: { id: { "$oid": "000000000000000000000000" } }
//!         assert:
//!           error: "FileNotFound"
//!     "#).unwrap();
//!
//!     let mut backend = InMemoryBackend::new("gridfs_tck");
//!     let report = run_spec(&spec, &mut backend).await.unwrap();
//!     assert!(report.all_passed());
//! }
//! ```

pub mod backend;
pub mod backends;
pub mod operation;
pub mod parser;
pub mod runner;
pub mod spec;
pub mod test_case;
pub mod transform;
pub mod types;
pub mod verification;

pub use backend::GridFsBackend;
pub use backends::memory::InMemoryBackend;
pub use operation::{Operation, OperationKind, OperationName, OperationState};
pub use runner::{run_spec, run_spec_dir, run_spec_file, SpecReport, TestResultEntry, TestStatus};
pub use spec::Spec;
pub use test_case::{TestCase, TestPhase};
pub use transform::{DataTransformer, DeleteLimit, ExecutionContext};
pub use types::ErrorKind;
pub use verification::{CollectionStateMatcher, ExpectedResult, NaturalKey, ResultMatcher};
