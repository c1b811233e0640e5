// Bucket defaults
pub const DEFAULT_BUCKET_NAME: &str = "fs";
pub const DEFAULT_CHUNK_SIZE: usize = 255 * 1024;

pub const FILES_SUFFIX: &str = "files";
pub const CHUNKS_SUFFIX: &str = "chunks";

// Scenario markers
// Expected result meaning "whatever the operation produced"
pub const SELF_REFERENCE_MARKER: &str = "&result";
// Expected result meaning "the operation returns nothing"
pub const VOID_MARKER: &str = "void";
// Prefix of the shadow collections holding the expected post-state
pub const EXPECTED_PREFIX: &str = "expected";

// Servers at or above this wire version answer the native listing command
pub const LIST_COLLECTIONS_MIN_WIRE_VERSION: u32 = 3;
