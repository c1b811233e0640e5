//! In-memory document collections.
//!
//! A [`Collection`] is a cheap, clonable handle to a shared vector of
//! documents. Filters are equality matches over every filter field; the
//! empty filter matches everything.

use std::cmp::Ordering;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::document::{DisplayDocument, Document, Value};
use crate::oid::ObjectId;

pub const ID_FIELD: &str = "_id";

const SET_OPERATOR: &str = "$set";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CollectionError {
    #[error("Duplicate key in '{collection}': _id {id}")]
    DuplicateKey { collection: String, id: String },

    #[error("Unsupported update operator '{0}'")]
    UnsupportedUpdate(String),

    #[error("Update operator '{0}' expects a document")]
    InvalidUpdate(String),
}

/// Sort options for [`Collection::find_with`].
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Ascending sort on an integer field
    pub sort_by: Option<String>,
}

impl FindOptions {
    pub fn sorted_by(field: &str) -> Self {
        Self {
            sort_by: Some(field.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    documents: Arc<RwLock<Vec<Document>>>,
}

impl Collection {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            documents: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn count(&self) -> usize {
        self.documents.read().len()
    }

    /// Insert documents, generating `_id` (as first field) where absent.
    ///
    /// The batch is rejected as a whole when any `_id` collides.
    pub fn insert_many<I>(&self, documents: I) -> Result<Vec<Value>, CollectionError>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut prepared = Vec::new();
        for doc in documents {
            prepared.push(with_id(doc));
        }

        let mut stored = self.documents.write();
        for (i, doc) in prepared.iter().enumerate() {
            let id = &doc[ID_FIELD];
            let clash = stored.iter().any(|existing| existing.get(ID_FIELD) == Some(id))
                || prepared[..i].iter().any(|other| &other[ID_FIELD] == id);
            if clash {
                return Err(CollectionError::DuplicateKey {
                    collection: self.name.clone(),
                    id: id.to_string(),
                });
            }
        }

        let ids = prepared.iter().map(|doc| doc[ID_FIELD].clone()).collect();
        stored.extend(prepared);
        Ok(ids)
    }

    pub fn insert_one(&self, document: Document) -> Result<Value, CollectionError> {
        let mut ids = self.insert_many(std::iter::once(document))?;
        Ok(ids.pop().unwrap_or(Value::Null))
    }

    pub fn find(&self, filter: &Document) -> Vec<Document> {
        self.find_with(filter, &FindOptions::default())
    }

    pub fn find_with(&self, filter: &Document, options: &FindOptions) -> Vec<Document> {
        let mut found: Vec<Document> = self
            .documents
            .read()
            .iter()
            .filter(|doc| matches_filter(doc, filter))
            .cloned()
            .collect();

        if let Some(field) = &options.sort_by {
            found.sort_by(|a, b| compare_field(a, b, field));
        }
        found
    }

    pub fn find_one(&self, filter: &Document) -> Option<Document> {
        self.documents
            .read()
            .iter()
            .find(|doc| matches_filter(doc, filter))
            .cloned()
    }

    /// Remove the first matching document. Returns the number removed.
    pub fn delete_one(&self, filter: &Document) -> usize {
        let mut stored = self.documents.write();
        match stored.iter().position(|doc| matches_filter(doc, filter)) {
            Some(index) => {
                stored.remove(index);
                1
            }
            None => 0,
        }
    }

    /// Remove every matching document. Returns the number removed.
    pub fn delete_many(&self, filter: &Document) -> usize {
        let mut stored = self.documents.write();
        let before = stored.len();
        stored.retain(|doc| !matches_filter(doc, filter));
        before - stored.len()
    }

    /// Apply a `{"$set": {...}}` update to the first matching document.
    /// Returns the number of documents modified.
    pub fn update_one(&self, filter: &Document, update: &Document) -> Result<usize, CollectionError> {
        let mut changes = Vec::new();
        for (operator, fields) in update {
            if operator != SET_OPERATOR {
                return Err(CollectionError::UnsupportedUpdate(operator.clone()));
            }
            let fields = fields
                .as_document()
                .ok_or_else(|| CollectionError::InvalidUpdate(operator.clone()))?;
            changes.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let mut stored = self.documents.write();
        match stored.iter_mut().find(|doc| matches_filter(doc, filter)) {
            Some(doc) => {
                for (key, value) in changes {
                    doc.insert(key, value);
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    pub fn snapshot(&self) -> Vec<Document> {
        self.documents.read().clone()
    }
}

/// Equality match of every filter field against the document.
pub fn matches_filter(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, value)| doc.get(key) == Some(value))
}

fn with_id(mut doc: Document) -> Document {
    if !doc.contains_key(ID_FIELD) {
        doc.shift_insert(0, ID_FIELD.to_string(), Value::ObjectId(ObjectId::new()));
    }
    doc
}

fn compare_field(a: &Document, b: &Document, field: &str) -> Ordering {
    let left = a.get(field).and_then(Value::as_i64);
    let right = b.get(field).and_then(Value::as_i64);
    left.cmp(&right)
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}:", self.name)?;
        for doc in self.documents.read().iter() {
            writeln!(f, "  {}", DisplayDocument(doc))?;
        }
        Ok(())
    }
}
