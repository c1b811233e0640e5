//! Prelude module for convenient imports
//!
//! Import everything you need with:
//! ```rust,ignore
//! use gridfs_tck::prelude::*;
//! ```

// Re-export the scenario engine
pub use crate::fixtures::{
    run_spec, run_spec_dir, run_spec_file, CollectionStateMatcher, DataTransformer, ErrorKind,
    ExecutionContext, ExpectedResult, GridFsBackend, InMemoryBackend, ResultMatcher, Spec,
    SpecReport, TestCase, TestPhase, TestStatus,
};

// Re-export configuration and errors
pub use crate::config::TckConfig;
pub use crate::error::{TckError, TckResult};

// Re-export commonly used storage types
pub use gridfs_common::{Binary, Document, GridFsError, ObjectId, Value};
