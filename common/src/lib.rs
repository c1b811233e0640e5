#![allow(clippy::module_inception)]
#![allow(clippy::upper_case_acronyms)]

pub mod collection;
pub mod commands;
pub mod config;
pub mod database;
pub mod document;
pub mod error;
pub mod gridfs;
pub mod oid;
pub mod time;

pub use collection::{Collection, CollectionError, FindOptions};
pub use database::Database;
pub use document::{Binary, BinarySubtype, Document, Value};
pub use error::{FailureCategory, GridFsError};
pub use gridfs::{BucketOptions, FsBucket, UploadOptions};
pub use oid::ObjectId;
