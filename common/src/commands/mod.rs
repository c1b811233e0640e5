//! Command dispatch against a server handle.
//!
//! Commands inspect the advertised [`ServerFeatures`] and either delegate to
//! a native command or fall back to a query against a system catalog.

mod collections_info;

pub use collections_info::{CollectionsInfo, CollectionsInfoResult};

use regex::Regex;
use thiserror::Error;

use crate::config::LIST_COLLECTIONS_MIN_WIRE_VERSION;
use crate::document::{Document, Value};

/// Catalog collection listing every namespace on legacy servers.
pub const SYSTEM_NAMESPACES: &str = "system.namespaces";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Command '{0}' is not supported by this server")]
    CommandNotFound(String),

    #[error("Operation failed: {0}")]
    OperationFailure(String),

    #[error("Invalid selector pattern: {0}")]
    InvalidSelector(#[from] regex::Error),
}

/// Capabilities advertised by a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerFeatures {
    pub max_wire_version: u32,
}

impl ServerFeatures {
    pub fn list_collections_enabled(&self) -> bool {
        self.max_wire_version >= LIST_COLLECTIONS_MIN_WIRE_VERSION
    }
}

/// Name selector: keeps names that do NOT match `exclude`.
#[derive(Debug, Clone)]
pub struct NameSelector {
    pub exclude: Regex,
}

impl NameSelector {
    pub fn not_matching(pattern: &str) -> Result<Self, CommandError> {
        Ok(Self {
            exclude: Regex::new(pattern)?,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        !self.exclude.is_match(name)
    }
}

/// A filtered query against one namespace.
#[derive(Debug, Clone)]
pub struct Query {
    pub namespace: String,
    pub selector: NameSelector,
}

/// Raw server response to a dispatched query.
#[derive(Debug, Clone)]
pub struct Reply {
    pub ok: f64,
    pub documents: Vec<Document>,
    pub error_message: Option<String>,
}

impl Reply {
    pub fn success(documents: Vec<Document>) -> Self {
        Self {
            ok: 1.0,
            documents,
            error_message: None,
        }
    }

    pub fn failure(message: &str) -> Self {
        Self {
            ok: 0.0,
            documents: Vec::new(),
            error_message: Some(message.to_string()),
        }
    }

    /// Reject replies flagged as failed, or whose first document carries `$err`.
    pub fn validate(self) -> Result<Self, CommandError> {
        if self.ok != 1.0 {
            let message = self
                .error_message
                .unwrap_or_else(|| "unknown server error".to_string());
            return Err(CommandError::OperationFailure(message));
        }
        if let Some(err) = self
            .documents
            .first()
            .and_then(|doc| doc.get("$err"))
            .and_then(Value::as_str)
        {
            return Err(CommandError::OperationFailure(err.to_string()));
        }
        Ok(self)
    }
}

/// Minimal server capability contract used by commands.
pub trait Server {
    fn features(&self) -> ServerFeatures;

    /// Native collection listing (only when advertised).
    fn list_collections(&self, db_name: &str) -> Result<Vec<Document>, CommandError>;

    fn dispatch(&self, query: &Query) -> Result<Reply, CommandError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_features_threshold() {
        assert!(!ServerFeatures { max_wire_version: 2 }.list_collections_enabled());
        assert!(ServerFeatures { max_wire_version: 3 }.list_collections_enabled());
    }

    #[test]
    fn test_reply_validate() {
        assert!(Reply::success(vec![]).validate().is_ok());
        assert!(Reply::failure("boom").validate().is_err());

        let err_doc = Reply::success(vec![doc! { "$err" => "not authorized" }]);
        match err_doc.validate() {
            Err(CommandError::OperationFailure(msg)) => assert_eq!(msg, "not authorized"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
