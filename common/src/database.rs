//! Named collections living in one in-memory database.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::collection::Collection;
use crate::commands::{CommandError, Query, Reply, Server, ServerFeatures, SYSTEM_NAMESPACES};
use crate::config::LIST_COLLECTIONS_MIN_WIRE_VERSION;
use crate::doc;
use crate::document::{Document, Value};

#[derive(Debug, Clone)]
pub struct Database {
    name: String,
    collections: Arc<RwLock<BTreeMap<String, Collection>>>,
    features: ServerFeatures,
}

impl Database {
    pub fn new(name: &str) -> Self {
        Self::with_features(
            name,
            ServerFeatures {
                max_wire_version: LIST_COLLECTIONS_MIN_WIRE_VERSION,
            },
        )
    }

    // Database answering like a server without the native listing command
    pub fn legacy(name: &str) -> Self {
        Self::with_features(name, ServerFeatures { max_wire_version: 0 })
    }

    pub fn with_features(name: &str, features: ServerFeatures) -> Self {
        Self {
            name: name.to_string(),
            collections: Arc::new(RwLock::new(BTreeMap::new())),
            features,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a collection handle, creating the collection on first access.
    pub fn collection(&self, name: &str) -> Collection {
        if let Some(existing) = self.collections.read().get(name) {
            return existing.clone();
        }
        self.collections
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Collection::new(name))
            .clone()
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.collections.read().keys().cloned().collect()
    }

    fn namespace(&self, collection: &str) -> String {
        format!("{}.{}", self.name, collection)
    }

    // Catalog documents as the legacy namespaces collection would hold them
    fn namespace_entries(&self) -> Vec<Document> {
        let mut entries: Vec<Document> = self
            .collection_names()
            .iter()
            .map(|name| doc! { "name" => self.namespace(name) })
            .collect();
        entries.push(doc! { "name" => self.namespace("system.indexes") });
        entries
    }
}

impl Server for Database {
    fn features(&self) -> ServerFeatures {
        self.features
    }

    fn list_collections(&self, db_name: &str) -> Result<Vec<Document>, CommandError> {
        if !self.features.list_collections_enabled() {
            return Err(CommandError::CommandNotFound("listCollections".to_string()));
        }
        if db_name != self.name {
            return Ok(Vec::new());
        }
        Ok(self
            .collection_names()
            .into_iter()
            .map(|name| doc! { "name" => name, "type" => "collection" })
            .collect())
    }

    fn dispatch(&self, query: &Query) -> Result<Reply, CommandError> {
        let expected = self.namespace(SYSTEM_NAMESPACES);
        if query.namespace != expected {
            return Ok(Reply::failure(&format!(
                "unsupported query namespace '{}'",
                query.namespace
            )));
        }

        let documents = self
            .namespace_entries()
            .into_iter()
            .filter(|entry| match entry.get("name").and_then(Value::as_str) {
                Some(name) => query.selector.matches(name),
                None => false,
            })
            .collect();
        Ok(Reply::success(documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_handles_share_state() {
        let db = Database::new("test");
        db.collection("fs.files").insert_one(doc! { "n" => 1i64 }).unwrap();
        assert_eq!(db.collection("fs.files").count(), 1);
    }

    #[test]
    fn test_legacy_database_has_no_list_collections() {
        let db = Database::legacy("test");
        assert!(db.list_collections("test").is_err());
    }
}
