//! GridFsBackend trait for scenario execution.
//!
//! Defines the interface every storage backend must expose to the engine:
//! the three named file actions plus handles on the collections the
//! scenarios read and mutate.

use async_trait::async_trait;
use gridfs_common::commands::CommandError;
use gridfs_common::{Collection, GridFsError, ObjectId, UploadOptions};

/// Backend trait for scenario execution.
///
/// Collection handles are shared: mutations through a handle are visible to
/// the backend's own file actions.
#[async_trait]
pub trait GridFsBackend: Send + Sync {
    /// Store `source` as a new file.
    async fn upload(
        &mut self,
        filename: &str,
        source: &[u8],
        options: UploadOptions,
    ) -> Result<ObjectId, GridFsError>;

    /// Read a whole file, verifying its chunk run.
    async fn download(&mut self, id: &ObjectId) -> Result<Vec<u8>, GridFsError>;

    /// Remove a file and its chunks.
    async fn delete(&mut self, id: &ObjectId) -> Result<(), GridFsError>;

    /// Handle on a named collection, created on first use.
    fn collection(&self, name: &str) -> Collection;

    /// The bucket's files collection.
    fn files_collection(&self) -> Collection;

    /// The bucket's chunks collection.
    fn chunks_collection(&self) -> Collection;

    /// Names of the user collections currently present.
    ///
    /// Goes through the collections-info command so servers without the
    /// native listing command are served by the catalog fallback.
    fn collection_names(&self) -> Result<Vec<String>, CommandError>;

    /// Get the backend identifier.
    fn backend_name(&self) -> &str;
}
