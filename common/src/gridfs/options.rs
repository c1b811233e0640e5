use chrono::{DateTime, Utc};

use crate::config::{DEFAULT_BUCKET_NAME, DEFAULT_CHUNK_SIZE};
use crate::document::Document;

/// Bucket-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketOptions {
    /// Collection prefix (`<bucket>.files`, `<bucket>.chunks`)
    pub bucket_name: String,
    /// Chunk size used when an upload does not override it
    pub chunk_size_bytes: usize,
}

impl Default for BucketOptions {
    fn default() -> Self {
        Self {
            bucket_name: DEFAULT_BUCKET_NAME.to_string(),
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Per-upload settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadOptions {
    /// Overrides the bucket chunk size
    pub chunk_size_bytes: Option<usize>,
    /// Pins the stored upload date (defaults to now)
    pub upload_date: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
    pub metadata: Option<Document>,
}
