use crate::document::{Document, Value};

use super::{CommandError, NameSelector, Query, Server, SYSTEM_NAMESPACES};

// Names never reported to callers: system collections and special namespaces
const EXCLUDED_NAMES: &str = r"system\.|\$";

/// Enumerate the collections of a database.
///
/// Uses the native listing command when the server advertises it, otherwise
/// queries the namespaces catalog with system and special names filtered out.
#[derive(Debug, Clone)]
pub struct CollectionsInfo {
    db_name: String,
}

/// Collection descriptors in whichever shape the server produced them.
#[derive(Debug, Clone)]
pub struct CollectionsInfoResult {
    db_name: String,
    documents: Vec<Document>,
}

impl CollectionsInfo {
    pub fn new(db_name: &str) -> Self {
        Self {
            db_name: db_name.to_string(),
        }
    }

    pub fn execute(&self, server: &dyn Server) -> Result<CollectionsInfoResult, CommandError> {
        let documents = if server.features().list_collections_enabled() {
            server.list_collections(&self.db_name)?
        } else {
            let query = Query {
                namespace: format!("{}.{}", self.db_name, SYSTEM_NAMESPACES),
                selector: NameSelector::not_matching(EXCLUDED_NAMES)?,
            };
            server.dispatch(&query)?.validate()?.documents
        };

        Ok(CollectionsInfoResult {
            db_name: self.db_name.clone(),
            documents,
        })
    }
}

impl CollectionsInfoResult {
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Bare collection names; catalog entries are stripped of their db prefix.
    pub fn collection_names(&self) -> Vec<String> {
        let prefix = format!("{}.", self.db_name);
        self.documents
            .iter()
            .filter_map(|doc| doc.get("name").and_then(Value::as_str))
            .map(|name| name.strip_prefix(&prefix).unwrap_or(name).to_string())
            .collect()
    }
}
