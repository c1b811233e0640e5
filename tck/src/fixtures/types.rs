//! Scenario document format.
//!
//! A scenario file holds shared pre-state (`data`) and an ordered list of
//! tests. Field values stay raw (`serde_json::Value`, order preserved) until
//! the transformer turns them into backend-native values.

use std::fmt;
use std::str::FromStr;

use gridfs_common::document::document_from_json;
use gridfs_common::{Document, FailureCategory, GridFsError};
use serde::Deserialize;

use crate::error::TckError;

/// Raw, scenario-authored document.
pub type RawDocument = serde_json::Map<String, serde_json::Value>;

/// Top-level structure of a scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct SpecFile {
    /// Shared pre-state inserted before every test
    #[serde(default)]
    pub data: SharedData,
    /// Ordered scenario entries
    pub tests: Vec<TestDefinition>,
}

/// Documents pre-populating the files and chunks collections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SharedData {
    /// Files collection documents
    #[serde(default)]
    pub files: Vec<RawDocument>,
    /// Chunks collection documents
    #[serde(default)]
    pub chunks: Vec<RawDocument>,
}

/// One scenario entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TestDefinition {
    /// Human-readable description
    pub description: String,
    /// Collection mutations applied before the operation
    pub arrange: Option<Arrange>,
    /// Operation to perform
    pub act: Act,
    /// Expected outcome
    pub assert: AssertBlock,
}

/// Pre-execution arrangement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Arrange {
    /// Ordered data steps
    #[serde(default)]
    pub data: Vec<DataStep>,
}

/// Operation to perform.
#[derive(Debug, Clone, Deserialize)]
pub struct Act {
    /// Backend action name (upload, download, delete)
    pub operation: String,
    /// Action parameters
    #[serde(default)]
    pub arguments: RawDocument,
}

/// Expected outcome of a test.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssertBlock {
    /// Expected result: literal, `&result` or `void`
    pub result: Option<serde_json::Value>,
    /// Expected error kind name
    pub error: Option<String>,
    /// Mutations building the expected post-state
    pub data: Option<Vec<DataStep>>,
}

/// A collection mutation used by `arrange` and `assert` blocks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DataStep {
    /// Insert documents into a collection
    Insert {
        /// Target collection
        insert: String,
        /// Documents to insert
        documents: Vec<RawDocument>,
    },
    /// Update single documents
    Update {
        /// Target collection
        update: String,
        /// Update statements
        updates: Vec<UpdateStatement>,
    },
    /// Delete documents
    Delete {
        /// Target collection
        delete: String,
        /// Delete statements
        deletes: Vec<DeleteStatement>,
    },
}

impl DataStep {
    /// Collection targeted by this step.
    pub fn collection(&self) -> &str {
        match self {
            DataStep::Insert { insert, .. } => insert,
            DataStep::Update { update, .. } => update,
            DataStep::Delete { delete, .. } => delete,
        }
    }
}

/// `{q: selector, u: update}` statement.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatement {
    /// Selector
    pub q: RawDocument,
    /// Update document (`{$set: {...}}`)
    pub u: RawDocument,
}

/// `{q: selector, limit: n}` statement.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteStatement {
    /// Selector
    pub q: RawDocument,
    /// 0 deletes every match, anything else deletes one
    #[serde(default)]
    pub limit: i64,
}

/// Convert raw documents into (untransformed) value documents.
pub fn raw_documents(raw: &[RawDocument]) -> Vec<Document> {
    raw.iter().map(document_from_json).collect()
}

/// Closed set of failure kinds a scenario may expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No files document for the requested id
    FileNotFound,
    /// A chunk is absent from the sequence
    ChunkIsMissing,
    /// A chunk has the wrong length
    ChunkIsWrongSize,
    /// A chunk exists past the end of the file
    ExtraChunk,
}

impl ErrorKind {
    /// Every kind, in mapping-table order.
    pub const ALL: [ErrorKind; 4] = [
        ErrorKind::FileNotFound,
        ErrorKind::ChunkIsMissing,
        ErrorKind::ChunkIsWrongSize,
        ErrorKind::ExtraChunk,
    ];

    /// Scenario spelling of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::ChunkIsMissing => "ChunkIsMissing",
            ErrorKind::ChunkIsWrongSize => "ChunkIsWrongSize",
            ErrorKind::ExtraChunk => "ExtraChunk",
        }
    }

    /// Backend failure category this kind stands for.
    pub fn category(&self) -> FailureCategory {
        match self {
            ErrorKind::FileNotFound => FailureCategory::FileNotFound,
            ErrorKind::ChunkIsMissing => FailureCategory::MissingFileChunk,
            ErrorKind::ChunkIsWrongSize => FailureCategory::UnexpectedChunkLength,
            ErrorKind::ExtraChunk => FailureCategory::ExtraFileChunk,
        }
    }

    /// Whether a captured backend failure belongs to this kind.
    pub fn matches(&self, error: &GridFsError) -> bool {
        self.category() == error.category()
    }
}

impl FromStr for ErrorKind {
    type Err = TckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TckError::UnknownErrorKind(s.to_string()))
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
