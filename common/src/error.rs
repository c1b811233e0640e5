use thiserror::Error;

use crate::collection::CollectionError;
use crate::oid::ObjectId;

/// Failure categories a chunked-file operation can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    FileNotFound,
    MissingFileChunk,
    UnexpectedChunkLength,
    ExtraFileChunk,
    Collection,
    InvalidFilesDocument,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridFsError {
    #[error("File with id {0} not found")]
    FileNotFound(ObjectId),

    #[error("Missing chunk {expected_n} for file {files_id}")]
    MissingFileChunk { files_id: ObjectId, expected_n: i64 },

    #[error("Chunk {n} of file {files_id} has length {actual}, expected {expected}")]
    UnexpectedChunkLength {
        files_id: ObjectId,
        n: i64,
        expected: usize,
        actual: usize,
    },

    #[error("Extra chunk {n} found for file {files_id}")]
    ExtraFileChunk { files_id: ObjectId, n: i64 },

    #[error("Invalid files document for {files_id}: {reason}")]
    InvalidFilesDocument { files_id: ObjectId, reason: String },

    #[error(transparent)]
    Collection(#[from] CollectionError),
}

impl GridFsError {
    pub fn category(&self) -> FailureCategory {
        match self {
            GridFsError::FileNotFound(_) => FailureCategory::FileNotFound,
            GridFsError::MissingFileChunk { .. } => FailureCategory::MissingFileChunk,
            GridFsError::UnexpectedChunkLength { .. } => FailureCategory::UnexpectedChunkLength,
            GridFsError::ExtraFileChunk { .. } => FailureCategory::ExtraFileChunk,
            GridFsError::InvalidFilesDocument { .. } => FailureCategory::InvalidFilesDocument,
            GridFsError::Collection(_) => FailureCategory::Collection,
        }
    }
}
