//! Chunked file storage over two collections.
//!
//! A file is one metadata document in `<bucket>.files` plus an ordered run
//! of binary segments in `<bucket>.chunks`, keyed by `files_id` and `n`.
//! Downloads verify the run: every index present, every segment the
//! expected size, nothing past the end.

mod options;

pub use options::{BucketOptions, UploadOptions};

use std::io::Write;

use log::{debug, log_enabled, Level};

use crate::collection::{Collection, FindOptions, ID_FIELD};
use crate::config::{CHUNKS_SUFFIX, FILES_SUFFIX};
use crate::database::Database;
use crate::doc;
use crate::document::{Binary, Document, Value};
use crate::error::GridFsError;
use crate::oid::ObjectId;
use crate::time::now_millis;

pub const FILES_ID_FIELD: &str = "files_id";
pub const N_FIELD: &str = "n";
pub const DATA_FIELD: &str = "data";
pub const LENGTH_FIELD: &str = "length";
pub const CHUNK_SIZE_FIELD: &str = "chunkSize";
pub const UPLOAD_DATE_FIELD: &str = "uploadDate";
pub const FILENAME_FIELD: &str = "filename";
pub const CONTENT_TYPE_FIELD: &str = "contentType";
pub const METADATA_FIELD: &str = "metadata";

#[derive(Debug, Clone)]
pub struct FsBucket {
    database: Database,
    options: BucketOptions,
    files: Collection,
    chunks: Collection,
}

impl FsBucket {
    pub fn new(database: Database, options: BucketOptions) -> Self {
        let files = database.collection(&format!("{}.{}", options.bucket_name, FILES_SUFFIX));
        let chunks = database.collection(&format!("{}.{}", options.bucket_name, CHUNKS_SUFFIX));
        Self {
            database,
            options,
            files,
            chunks,
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn files_collection(&self) -> &Collection {
        &self.files
    }

    pub fn chunks_collection(&self) -> &Collection {
        &self.chunks
    }

    pub fn options(&self) -> &BucketOptions {
        &self.options
    }

    /// Store `source` as a new file and return its generated id.
    ///
    /// Chunks are written before the files document.
    pub fn upload_from_stream(
        &self,
        filename: &str,
        source: &[u8],
        options: UploadOptions,
    ) -> Result<ObjectId, GridFsError> {
        let files_id = ObjectId::new();
        let chunk_size = options
            .chunk_size_bytes
            .unwrap_or(self.options.chunk_size_bytes)
            .max(1);

        let chunks: Vec<Document> = source
            .chunks(chunk_size)
            .enumerate()
            .map(|(n, bytes)| {
                doc! {
                    ID_FIELD => ObjectId::new(),
                    FILES_ID_FIELD => files_id,
                    N_FIELD => n as i64,
                    DATA_FIELD => Binary::generic(bytes.to_vec()),
                }
            })
            .collect();
        let chunk_count = chunks.len();
        if !chunks.is_empty() {
            self.chunks.insert_many(chunks)?;
        }

        let mut file = doc! {
            ID_FIELD => files_id,
            LENGTH_FIELD => source.len() as i64,
            CHUNK_SIZE_FIELD => chunk_size as i64,
        };
        let upload_date = options.upload_date.unwrap_or_else(now_millis);
        file.insert(UPLOAD_DATE_FIELD.to_string(), Value::datetime(upload_date));
        file.insert(FILENAME_FIELD.to_string(), Value::from(filename));
        if let Some(content_type) = options.content_type {
            file.insert(CONTENT_TYPE_FIELD.to_string(), Value::String(content_type));
        }
        if let Some(metadata) = options.metadata {
            file.insert(METADATA_FIELD.to_string(), Value::Document(metadata));
        }
        self.files.insert_one(file)?;

        if log_enabled!(Level::Debug) {
            debug!(
                "Uploaded '{}' as {} ({} bytes, {} chunks)",
                filename,
                files_id,
                source.len(),
                chunk_count
            );
        }
        Ok(files_id)
    }

    /// Read a whole file into memory.
    pub fn download(&self, id: &ObjectId) -> Result<Vec<u8>, GridFsError> {
        let mut out = Vec::new();
        self.download_to_stream(id, &mut out)?;
        Ok(out)
    }

    /// Write the file's bytes to `destination`, verifying every chunk.
    ///
    /// Nothing is written unless the whole chunk run is valid.
    pub fn download_to_stream<W: Write>(
        &self,
        id: &ObjectId,
        destination: &mut W,
    ) -> Result<(), GridFsError> {
        let file = self
            .files
            .find_one(&doc! { ID_FIELD => *id })
            .ok_or(GridFsError::FileNotFound(*id))?;

        let length = read_usize(&file, LENGTH_FIELD, id)?;
        let chunk_size = read_usize(&file, CHUNK_SIZE_FIELD, id)?;
        if length > 0 && chunk_size == 0 {
            return Err(GridFsError::InvalidFilesDocument {
                files_id: *id,
                reason: "chunkSize must be positive".to_string(),
            });
        }
        let expected_count = if length == 0 {
            0
        } else {
            length.div_ceil(chunk_size)
        };

        let chunks = self.chunks.find_with(
            &doc! { FILES_ID_FIELD => *id },
            &FindOptions::sorted_by(N_FIELD),
        );

        let mut bytes = Vec::with_capacity(length);
        for (index, chunk) in chunks.iter().enumerate() {
            let n = chunk.get(N_FIELD).and_then(Value::as_i64).unwrap_or(-1);
            let data = chunk_data(chunk);
            if index >= expected_count {
                // An empty file may still carry one empty first chunk
                if length == 0 && index == 0 && n == 0 && data.is_empty() {
                    continue;
                }
                return Err(GridFsError::ExtraFileChunk { files_id: *id, n });
            }
            if n != index as i64 {
                return Err(GridFsError::MissingFileChunk {
                    files_id: *id,
                    expected_n: index as i64,
                });
            }

            let expected_len = if index + 1 == expected_count {
                length - chunk_size * (expected_count - 1)
            } else {
                chunk_size
            };
            if data.len() != expected_len {
                return Err(GridFsError::UnexpectedChunkLength {
                    files_id: *id,
                    n,
                    expected: expected_len,
                    actual: data.len(),
                });
            }
            bytes.extend_from_slice(data);
        }
        if chunks.len() < expected_count {
            return Err(GridFsError::MissingFileChunk {
                files_id: *id,
                expected_n: chunks.len() as i64,
            });
        }

        destination
            .write_all(&bytes)
            .map_err(|e| GridFsError::InvalidFilesDocument {
                files_id: *id,
                reason: format!("destination write failed: {}", e),
            })?;
        Ok(())
    }

    /// Remove the files document and all of its chunks.
    ///
    /// Orphaned chunks are removed even when the files document is missing,
    /// in which case `FileNotFound` is still reported.
    pub fn delete(&self, id: &ObjectId) -> Result<(), GridFsError> {
        let removed_file = self.files.delete_one(&doc! { ID_FIELD => *id });
        let removed_chunks = self.chunks.delete_many(&doc! { FILES_ID_FIELD => *id });

        if log_enabled!(Level::Debug) {
            debug!(
                "Deleted file {} ({} files documents, {} chunks)",
                id, removed_file, removed_chunks
            );
        }

        if removed_file == 0 {
            return Err(GridFsError::FileNotFound(*id));
        }
        Ok(())
    }
}

fn chunk_data(chunk: &Document) -> &[u8] {
    chunk
        .get(DATA_FIELD)
        .and_then(Value::as_binary)
        .map(|b| b.bytes.as_slice())
        .unwrap_or_default()
}

fn read_usize(file: &Document, field: &str, id: &ObjectId) -> Result<usize, GridFsError> {
    file.get(field)
        .and_then(Value::as_i64)
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| GridFsError::InvalidFilesDocument {
            files_id: *id,
            reason: format!("missing or negative '{}'", field),
        })
}
