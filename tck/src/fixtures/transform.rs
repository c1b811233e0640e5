//! Scenario data transformation.
//!
//! Converts scenario-authored field values into backend-native values
//! through a registry keyed by field name. Fields without a registered
//! converter pass through unchanged, and documents are converted into new
//! documents without touching the originals.
//!
//! | field        | conversion                                              |
//! |--------------|---------------------------------------------------------|
//! | `_id`        | pinned id, native id, `{"$oid"}` wrapper, or a fresh id |
//! | `files_id`   | same order, using the files-side pin                    |
//! | `uploadDate` | always the test case's fixed timestamp                  |
//! | `data`       | native binary, or `{"$hex"}` wrapper decoded to bytes   |

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use gridfs_common::collection::ID_FIELD;
use gridfs_common::gridfs::{DATA_FIELD, FILES_ID_FIELD, UPLOAD_DATE_FIELD};
use gridfs_common::{Binary, Document, ObjectId, Value};

use crate::error::{TckError, TckResult};

const OID_WRAPPER: &str = "$oid";
const HEX_WRAPPER: &str = "$hex";

/// Values shared by every conversion within one test case.
///
/// The upload date is fixed once per test case; the pins carry identifiers
/// only known after the operation ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Timestamp injected into every `uploadDate` field
    pub upload_date: DateTime<Utc>,
    /// Overrides `_id` resolution
    pub pinned_id: Option<ObjectId>,
    /// Overrides `files_id` resolution
    pub pinned_files_id: Option<ObjectId>,
}

impl ExecutionContext {
    /// Context without pinned identifiers.
    pub fn new(upload_date: DateTime<Utc>) -> Self {
        Self {
            upload_date,
            pinned_id: None,
            pinned_files_id: None,
        }
    }

    /// Copy with `_id` pinned.
    pub fn with_pinned_id(&self, id: Option<ObjectId>) -> Self {
        Self {
            pinned_id: id,
            ..self.clone()
        }
    }

    /// Copy with `files_id` pinned.
    pub fn with_pinned_files_id(&self, id: Option<ObjectId>) -> Self {
        Self {
            pinned_files_id: id,
            ..self.clone()
        }
    }
}

/// Signature of a per-field converter.
pub type FieldConverter = fn(&Value, &ExecutionContext) -> TckResult<Value>;

/// Field-name keyed converter registry.
#[derive(Debug, Clone)]
pub struct DataTransformer {
    converters: HashMap<&'static str, FieldConverter>,
}

impl DataTransformer {
    /// Registry with the standard chunked-storage converters.
    pub fn new() -> Self {
        let mut transformer = Self::empty();
        transformer.register(ID_FIELD, convert_id);
        transformer.register(UPLOAD_DATE_FIELD, convert_upload_date);
        transformer.register(FILES_ID_FIELD, convert_files_id);
        transformer.register(DATA_FIELD, convert_data);
        transformer
    }

    /// Registry without converters (identity transformation).
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Register (or replace) the converter for a field name.
    pub fn register(&mut self, field: &'static str, converter: FieldConverter) {
        self.converters.insert(field, converter);
    }

    /// Whether a converter exists for the field.
    pub fn has_converter(&self, field: &str) -> bool {
        self.converters.contains_key(field)
    }

    /// Convert one field value; unregistered fields are returned unchanged.
    pub fn convert_field(
        &self,
        field: &str,
        value: &Value,
        ctx: &ExecutionContext,
    ) -> TckResult<Value> {
        match self.converters.get(field) {
            Some(convert) => convert(value, ctx),
            None => Ok(value.clone()),
        }
    }

    /// Convert every field of a document into a new document.
    pub fn transform_document(&self, doc: &Document, ctx: &ExecutionContext) -> TckResult<Document> {
        doc.iter()
            .map(|(field, value)| Ok((field.clone(), self.convert_field(field, value, ctx)?)))
            .collect()
    }

    /// Convert a list of documents.
    pub fn transform_documents(
        &self,
        docs: &[Document],
        ctx: &ExecutionContext,
    ) -> TckResult<Vec<Document>> {
        docs.iter()
            .map(|doc| self.transform_document(doc, ctx))
            .collect()
    }
}

impl Default for DataTransformer {
    fn default() -> Self {
        Self::new()
    }
}

/// `_id` converter.
pub fn convert_id(value: &Value, ctx: &ExecutionContext) -> TckResult<Value> {
    to_oid(value, ctx.pinned_id).map(Value::ObjectId)
}

/// `files_id` converter.
pub fn convert_files_id(value: &Value, ctx: &ExecutionContext) -> TckResult<Value> {
    to_oid(value, ctx.pinned_files_id).map(Value::ObjectId)
}

/// `uploadDate` converter: the authored value is discarded.
pub fn convert_upload_date(_value: &Value, ctx: &ExecutionContext) -> TckResult<Value> {
    Ok(Value::datetime(ctx.upload_date))
}

/// `data` converter.
pub fn convert_data(value: &Value, _ctx: &ExecutionContext) -> TckResult<Value> {
    match value {
        Value::Binary(_) => Ok(value.clone()),
        other => hex_binary(other),
    }
}

/// Resolve an identifier.
///
/// Order: pinned id, native id, `{"$oid": hex}` wrapper, fresh id.
pub fn to_oid(value: &Value, pinned: Option<ObjectId>) -> TckResult<ObjectId> {
    if let Some(id) = pinned {
        return Ok(id);
    }
    if let Some(id) = value.as_object_id() {
        return Ok(*id);
    }
    match value.wrapped_str(OID_WRAPPER) {
        Some(hex) => ObjectId::parse_str(hex).map_err(|e| TckError::Transform(e.to_string())),
        None => Ok(ObjectId::new()),
    }
}

/// Decode a `{"$hex": "..."}` wrapper into a generic binary value.
pub fn hex_binary(value: &Value) -> TckResult<Value> {
    let hex = value.wrapped_str(HEX_WRAPPER).ok_or_else(|| {
        TckError::Transform(format!("expected a {{\"$hex\": ...}} wrapper, got {}", value))
    })?;
    Ok(Value::Binary(Binary::generic(decode_hex(hex)?)))
}

/// Strict pairwise hex decoding (case-insensitive, even length, no separators).
pub fn decode_hex(hex: &str) -> TckResult<Vec<u8>> {
    hex::decode(hex).map_err(|e| TckError::Transform(format!("invalid hex '{}': {}", hex, e)))
}

/// How many documents a delete statement removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteLimit {
    /// Remove the first match
    One,
    /// Remove every match
    Many,
}

impl DeleteLimit {
    /// 0 means every match; any other value means exactly one.
    pub fn from_limit(limit: i64) -> Self {
        if limit == 0 {
            DeleteLimit::Many
        } else {
            DeleteLimit::One
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridfs_common::doc;
    use gridfs_common::time::now_millis;
    use proptest::prelude::*;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(now_millis())
    }

    fn oid_wrapper(hex: &str) -> Value {
        Value::Document(doc! { "$oid" => hex })
    }

    #[test]
    fn test_pinned_id_takes_precedence() {
        let pinned = ObjectId::new();
        let wrapped = oid_wrapper("000000000000000000000001");
        assert_eq!(to_oid(&wrapped, Some(pinned)).unwrap(), pinned);
    }

    #[test]
    fn test_native_id_passes_through() {
        let id = ObjectId::new();
        assert_eq!(to_oid(&Value::ObjectId(id), None).unwrap(), id);
    }

    #[test]
    fn test_wrapped_id_is_decoded() {
        let id = to_oid(&oid_wrapper("000000000000000000000002"), None).unwrap();
        assert_eq!(id.to_hex(), "000000000000000000000002");
    }

    #[test]
    fn test_other_values_get_fresh_ids() {
        let a = to_oid(&Value::from("*result"), None).unwrap();
        let b = to_oid(&Value::from("*result"), None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_oid_is_hard_failure() {
        assert!(matches!(
            to_oid(&oid_wrapper("xyz"), None),
            Err(TckError::Transform(_))
        ));
    }

    #[test]
    fn test_upload_date_always_replaced() {
        let ctx = ctx();
        let converted = convert_upload_date(&Value::from("*actual"), &ctx).unwrap();
        assert_eq!(converted, Value::DateTime(ctx.upload_date));
    }

    #[test]
    fn test_data_hex_and_binary() {
        let ctx = ctx();
        let wrapped = Value::Document(doc! { "$hex" => "68656C6c6f" });
        assert_eq!(
            convert_data(&wrapped, &ctx).unwrap(),
            Value::Binary(Binary::generic(b"hello".to_vec()))
        );

        let native = Value::Binary(Binary::generic(vec![1, 2, 3]));
        assert_eq!(convert_data(&native, &ctx).unwrap(), native);
    }

    #[test]
    fn test_decode_hex_rejects_malformed_input() {
        assert!(decode_hex("abc").is_err());
        assert!(decode_hex("zz").is_err());
        assert!(decode_hex("ab cd").is_err());
        assert_eq!(decode_hex("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_transform_document_leaves_original_untouched() {
        let ctx = ctx().with_pinned_files_id(Some(ObjectId::new()));
        let original = doc! {
            "_id" => Value::Document(doc! { "$oid" => "000000000000000000000001" }),
            "files_id" => "*result",
            "n" => 0i64,
            "data" => Value::Document(doc! { "$hex" => "11" }),
            "extra" => "kept",
        };
        let before = original.clone();

        let converted = DataTransformer::new().transform_document(&original, &ctx).unwrap();

        assert_eq!(original, before);
        assert_eq!(
            converted["_id"],
            Value::ObjectId(ObjectId::parse_str("000000000000000000000001").unwrap())
        );
        assert_eq!(converted["files_id"], Value::ObjectId(ctx.pinned_files_id.unwrap()));
        assert_eq!(converted["n"], Value::Int64(0));
        assert_eq!(converted["data"], Value::Binary(Binary::generic(vec![0x11])));
        assert_eq!(converted["extra"].as_str(), Some("kept"));
    }

    #[test]
    fn test_empty_registry_is_identity() {
        let doc = doc! { "_id" => "not-an-id", "data" => "raw" };
        let converted = DataTransformer::empty().transform_document(&doc, &ctx()).unwrap();
        assert_eq!(converted, doc);
    }

    #[test]
    fn test_delete_limit_mapping() {
        assert_eq!(DeleteLimit::from_limit(0), DeleteLimit::Many);
        assert_eq!(DeleteLimit::from_limit(1), DeleteLimit::One);
        assert_eq!(DeleteLimit::from_limit(-3), DeleteLimit::One);
    }

    proptest! {
        #[test]
        fn test_hex_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let encoded = hex::encode_upper(&bytes);
            let decoded = decode_hex(&encoded).unwrap();
            prop_assert_eq!(hex::encode(&decoded), encoded.to_lowercase());
        }

        #[test]
        fn test_nonzero_limit_means_one(limit in any::<i64>().prop_filter("nonzero", |l| *l != 0)) {
            prop_assert_eq!(DeleteLimit::from_limit(limit), DeleteLimit::One);
        }
    }
}
