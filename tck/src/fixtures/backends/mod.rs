//! Storage backend implementations.
//!
//! Each backend adapts a storage engine to the GridFsBackend trait
//! interface.

pub mod memory;
