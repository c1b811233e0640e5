//! Document value model.
//!
//! A [`Document`] is an insertion-ordered map of field names to [`Value`]s.
//! Values read from scenario files are converted verbatim: wrapper objects
//! such as `{"$oid": "..."}` or `{"$hex": "..."}` stay plain sub-documents
//! until a caller decides to interpret them.

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::oid::ObjectId;
use crate::time::truncate_to_millis;

/// Insertion-ordered field map.
pub type Document = IndexMap<String, Value>;

/// Binary payload subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinarySubtype {
    /// Generic bytes
    Generic,
    /// Opaque user-defined bytes
    UserDefined,
}

/// A typed byte string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binary {
    /// Subtype tag
    pub subtype: BinarySubtype,
    /// Raw bytes
    #[serde(with = "hex::serde")]
    pub bytes: Vec<u8>,
}

impl Binary {
    /// Wrap bytes as a generic binary blob.
    pub fn generic(bytes: Vec<u8>) -> Self {
        Self {
            subtype: BinarySubtype::Generic,
            bytes,
        }
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Double(f64),
    String(String),
    ObjectId(ObjectId),
    Binary(Binary),
    DateTime(DateTime<Utc>),
    Array(Vec<Value>),
    Document(Document),
}

impl Value {
    /// Build a timestamp value at millisecond precision.
    pub fn datetime(date: DateTime<Utc>) -> Self {
        Value::DateTime(truncate_to_millis(date))
    }

    /// Convert a parsed JSON/YAML value without interpreting wrappers.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int64(i),
                None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Document(document_from_json(map)),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(i) => Some(*i),
            Value::Double(d) if d.fract() == 0.0 => Some(*d as i64),
            _ => None,
        }
    }

    pub fn as_object_id(&self) -> Option<&ObjectId> {
        match self {
            Value::ObjectId(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&Binary> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Read a single-key wrapper such as `{"$hex": "00ff"}`.
    pub fn wrapped_str(&self, key: &str) -> Option<&str> {
        self.as_document()
            .and_then(|doc| doc.get(key))
            .and_then(Value::as_str)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::ObjectId(id)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<Binary> for Value {
    fn from(b: Binary) -> Self {
        Value::Binary(b)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Document(doc)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int64(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "{:?}", s),
            Value::ObjectId(id) => write!(f, "ObjectId(\"{}\")", id),
            Value::Binary(b) => write!(f, "Binary(\"{}\")", hex::encode(&b.bytes)),
            Value::DateTime(d) => write!(f, "Date(\"{}\")", d.to_rfc3339()),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Document(doc) => write!(f, "{}", DisplayDocument(doc)),
        }
    }
}

/// `Display` adapter for documents (`{ a: 1, b: "x" }`).
pub struct DisplayDocument<'a>(pub &'a Document);

impl fmt::Display for DisplayDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}: {}", key, value)?;
        }
        write!(f, " }}")
    }
}

/// Convert a JSON object into a document, preserving field order.
pub fn document_from_json(map: &serde_json::Map<String, serde_json::Value>) -> Document {
    map.iter()
        .map(|(k, v)| (k.clone(), Value::from_json(v)))
        .collect()
}

/// Build a document from `(key, value)` pairs.
///
/// ```ignore
/// let doc = doc! { "files_id" => id, "n" => 0i64 };
/// ```
#[macro_export]
macro_rules! doc {
    () => { $crate::document::Document::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut doc = $crate::document::Document::new();
        $( doc.insert(::std::string::String::from($key), $crate::document::Value::from($value)); )+
        doc
    }};
}
