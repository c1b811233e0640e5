//! In-memory backend: FsBucket-based scenario execution.
//!
//! Fast, in-process execution with no server round trips.

use async_trait::async_trait;
use gridfs_common::commands::CollectionsInfo;
use gridfs_common::commands::CommandError;
use gridfs_common::{
    BucketOptions, Collection, Database, FsBucket, GridFsError, ObjectId, UploadOptions,
};
use log::{debug, log_enabled, Level};

use crate::config::TckConfig;
use crate::fixtures::backend::GridFsBackend;

const BACKEND_NAME: &str = "in-memory";

/// Backend storing both collections in process memory.
pub struct InMemoryBackend {
    /// The bucket all file actions go through
    bucket: FsBucket,
}

impl InMemoryBackend {
    /// Create a backend over a fresh database with default bucket options.
    pub fn new(db_name: &str) -> Self {
        Self::with_options(Database::new(db_name), BucketOptions::default())
    }

    /// Create a backend over an existing database.
    pub fn with_options(database: Database, options: BucketOptions) -> Self {
        Self {
            bucket: FsBucket::new(database, options),
        }
    }

    /// Create a backend as described by the harness configuration.
    pub fn from_config(config: &TckConfig) -> Self {
        let database = if config.legacy_server {
            Database::legacy(&config.database_name)
        } else {
            Database::new(&config.database_name)
        };
        let options = BucketOptions {
            bucket_name: config.bucket_name.clone(),
            chunk_size_bytes: config.chunk_size_bytes,
        };
        if log_enabled!(Level::Debug) {
            debug!(
                "Creating in-memory backend for '{}' (bucket '{}', legacy: {})",
                config.database_name, config.bucket_name, config.legacy_server
            );
        }
        Self::with_options(database, options)
    }

    /// The underlying bucket.
    pub fn bucket(&self) -> &FsBucket {
        &self.bucket
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::from_config(&TckConfig::default())
    }
}

#[async_trait]
impl GridFsBackend for InMemoryBackend {
    async fn upload(
        &mut self,
        filename: &str,
        source: &[u8],
        options: UploadOptions,
    ) -> Result<ObjectId, GridFsError> {
        self.bucket.upload_from_stream(filename, source, options)
    }

    async fn download(&mut self, id: &ObjectId) -> Result<Vec<u8>, GridFsError> {
        self.bucket.download(id)
    }

    async fn delete(&mut self, id: &ObjectId) -> Result<(), GridFsError> {
        self.bucket.delete(id)
    }

    fn collection(&self, name: &str) -> Collection {
        self.bucket.database().collection(name)
    }

    fn files_collection(&self) -> Collection {
        self.bucket.files_collection().clone()
    }

    fn chunks_collection(&self) -> Collection {
        self.bucket.chunks_collection().clone()
    }

    fn collection_names(&self) -> Result<Vec<String>, CommandError> {
        let database = self.bucket.database();
        let info = CollectionsInfo::new(database.name()).execute(database)?;
        Ok(info.collection_names())
    }

    fn backend_name(&self) -> &str {
        BACKEND_NAME
    }
}
