//! Outcome verification.
//!
//! [`ResultMatcher`] judges an operation's returned value against the
//! scenario's expected result. [`CollectionStateMatcher`] judges the live
//! collection contents against the shadow expected collection, matching
//! documents by natural key and never requiring identifiers to match.

use gridfs_common::collection::{matches_filter, ID_FIELD};
use gridfs_common::document::DisplayDocument;
use gridfs_common::gridfs::{FILES_ID_FIELD, N_FIELD};
use gridfs_common::config::{SELF_REFERENCE_MARKER, VOID_MARKER};
use gridfs_common::{Document, GridFsError, Value};

use super::transform::hex_binary;
use super::types::ErrorKind;
use crate::error::{TckError, TckResult};

/// Parsed form of an `assert.result` entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedResult {
    /// No claim about the result
    Absent,
    /// The result must equal the value the operation itself returned
    SelfReference,
    /// The operation must return nothing
    Void,
    /// The result must equal this value
    Literal(Value),
}

impl ExpectedResult {
    /// Interpret a raw `assert.result` value.
    ///
    /// `{"$hex": ...}` literals are decoded to binary like fixture data.
    pub fn from_raw(raw: Option<&serde_json::Value>) -> TckResult<Self> {
        let raw = match raw {
            None | Some(serde_json::Value::Null) => return Ok(ExpectedResult::Absent),
            Some(raw) => raw,
        };
        if let Some(marker) = raw.as_str() {
            if marker == SELF_REFERENCE_MARKER {
                return Ok(ExpectedResult::SelfReference);
            }
            if marker == VOID_MARKER {
                return Ok(ExpectedResult::Void);
            }
        }

        let value = Value::from_json(raw);
        if value.wrapped_str("$hex").is_some() {
            return hex_binary(&value).map(ExpectedResult::Literal);
        }
        Ok(ExpectedResult::Literal(value))
    }
}

/// Decides whether an actual result satisfies an [`ExpectedResult`].
pub struct ResultMatcher;

impl ResultMatcher {
    /// `recorded` is the value the operation itself returned, if any.
    pub fn matches(expected: &ExpectedResult, actual: &Value, recorded: Option<&Value>) -> bool {
        match expected {
            ExpectedResult::Absent => true,
            ExpectedResult::SelfReference => recorded.is_some_and(|value| value == actual),
            ExpectedResult::Void => actual.is_null(),
            ExpectedResult::Literal(value) => value == actual,
        }
    }

    /// Like [`ResultMatcher::matches`], reporting a mismatch as an error.
    pub fn verify(
        expected: &ExpectedResult,
        actual: &Value,
        recorded: Option<&Value>,
    ) -> TckResult<()> {
        if Self::matches(expected, actual, recorded) {
            return Ok(());
        }
        let expected = match expected {
            ExpectedResult::Absent => "<anything>".to_string(),
            ExpectedResult::SelfReference => match recorded {
                Some(value) => format!("{} (self reference)", value),
                None => "<recorded result> (none recorded)".to_string(),
            },
            ExpectedResult::Void => "<void>".to_string(),
            ExpectedResult::Literal(value) => value.to_string(),
        };
        Err(TckError::AssertionMismatch {
            subject: "result".to_string(),
            expected,
            actual: actual.to_string(),
        })
    }

    /// Check a captured failure against the expected error kind.
    pub fn verify_error(expected: ErrorKind, actual: &GridFsError) -> TckResult<()> {
        if expected.matches(actual) {
            return Ok(());
        }
        Err(TckError::AssertionMismatch {
            subject: "error".to_string(),
            expected: expected.to_string(),
            actual: format!("{:?}: {}", actual.category(), actual),
        })
    }
}

/// Natural key used to pair actual documents with expected ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaturalKey {
    /// Files documents: `_id`
    Id,
    /// Chunk documents: `(files_id, n)`
    FileChunk,
}

impl NaturalKey {
    fn fields(&self) -> &'static [&'static str] {
        match self {
            NaturalKey::Id => &[ID_FIELD],
            NaturalKey::FileChunk => &[FILES_ID_FIELD, N_FIELD],
        }
    }

    fn selector(&self, doc: &Document) -> Document {
        self.fields()
            .iter()
            .map(|field| {
                let value = doc.get(*field).cloned().unwrap_or(Value::Null);
                (field.to_string(), value)
            })
            .collect()
    }
}

/// Decides whether a live collection satisfies an expected document set.
pub struct CollectionStateMatcher;

impl CollectionStateMatcher {
    /// - no expected view: trivially matches
    /// - empty expected view: the actual view must be empty too
    /// - otherwise each actual document needs an expected document with the
    ///   same natural key whose fields (except `_id`) all equal the actual ones
    pub fn matches(expected: Option<&[Document]>, actual: &[Document], key: NaturalKey) -> bool {
        Self::find_mismatch(expected, actual, key).is_none()
    }

    /// Like [`CollectionStateMatcher::matches`], reporting the first
    /// offending document with identifiers elided.
    pub fn verify(
        collection: &str,
        expected: Option<&[Document]>,
        actual: &[Document],
        key: NaturalKey,
    ) -> TckResult<()> {
        match Self::find_mismatch(expected, actual, key) {
            None => Ok(()),
            Some((expected_doc, actual_doc)) => Err(TckError::AssertionMismatch {
                subject: format!("collection '{}'", collection),
                expected: expected_doc
                    .map(|doc| DisplayDocument(&without_id(doc)).to_string())
                    .unwrap_or_else(|| format!("<no document with {:?} key>", key)),
                actual: DisplayDocument(&without_id(actual_doc)).to_string(),
            }),
        }
    }

    fn find_mismatch<'a>(
        expected: Option<&'a [Document]>,
        actual: &'a [Document],
        key: NaturalKey,
    ) -> Option<(Option<&'a Document>, &'a Document)> {
        let expected = expected?;
        for doc in actual {
            let selector = key.selector(doc);
            match expected.iter().find(|candidate| matches_filter(candidate, &selector)) {
                Some(matching) => {
                    let equal = matching
                        .iter()
                        .all(|(field, value)| field == ID_FIELD || doc.get(field) == Some(value));
                    if !equal {
                        return Some((Some(matching), doc));
                    }
                }
                None => return Some((None, doc)),
            }
        }
        None
    }
}

fn without_id(doc: &Document) -> Document {
    doc.iter()
        .filter(|(field, _)| field.as_str() != ID_FIELD)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridfs_common::{doc, Binary, ObjectId};

    fn chunk(id: ObjectId, files_id: ObjectId, n: i64, data: &[u8]) -> Document {
        doc! {
            "_id" => id,
            "files_id" => files_id,
            "n" => n,
            "data" => Binary::generic(data.to_vec()),
        }
    }

    #[test]
    fn test_expected_result_parsing() {
        let parse = |json: &str| {
            let raw: serde_json::Value = serde_json::from_str(json).unwrap();
            ExpectedResult::from_raw(Some(&raw)).unwrap()
        };
        assert_eq!(ExpectedResult::from_raw(None).unwrap(), ExpectedResult::Absent);
        assert_eq!(parse("\"&result\""), ExpectedResult::SelfReference);
        assert_eq!(parse("\"void\""), ExpectedResult::Void);
        assert_eq!(
            parse(r#"{"$hex": "1122"}"#),
            ExpectedResult::Literal(Value::Binary(Binary::generic(vec![0x11, 0x22])))
        );
        assert_eq!(parse("3"), ExpectedResult::Literal(Value::Int64(3)));
    }

    #[test]
    fn test_absent_always_matches() {
        assert!(ResultMatcher::matches(&ExpectedResult::Absent, &Value::Int64(1), None));
        assert!(ResultMatcher::matches(&ExpectedResult::Absent, &Value::Null, None));
    }

    #[test]
    fn test_void_requires_empty_result() {
        assert!(ResultMatcher::matches(&ExpectedResult::Void, &Value::Null, None));
        assert!(!ResultMatcher::matches(&ExpectedResult::Void, &Value::Int64(0), None));
    }

    #[test]
    fn test_self_reference_matches_only_recorded_id() {
        let x = Value::ObjectId(ObjectId::new());
        let other = Value::ObjectId(ObjectId::new());

        assert!(ResultMatcher::matches(&ExpectedResult::SelfReference, &x, Some(&x)));
        assert!(!ResultMatcher::matches(&ExpectedResult::SelfReference, &other, Some(&x)));
        assert!(!ResultMatcher::matches(&ExpectedResult::SelfReference, &x, None));
    }

    #[test]
    fn test_self_reference_accepts_any_returned_value() {
        let bytes = Value::Binary(Binary::generic(vec![0x11]));
        assert!(ResultMatcher::verify(&ExpectedResult::SelfReference, &bytes, Some(&bytes)).is_ok());

        let other = Value::Binary(Binary::generic(vec![0x22]));
        assert!(!ResultMatcher::matches(&ExpectedResult::SelfReference, &other, Some(&bytes)));
    }

    #[test]
    fn test_literal_result() {
        let expected = ExpectedResult::Literal(Value::Binary(Binary::generic(b"hello".to_vec())));
        let actual = Value::Binary(Binary::generic(b"hello".to_vec()));
        assert!(ResultMatcher::verify(&expected, &actual, None).is_ok());

        let wrong = Value::Binary(Binary::generic(b"world".to_vec()));
        let err = ResultMatcher::verify(&expected, &wrong, None).unwrap_err();
        assert!(err.is_assertion_failure());
    }

    #[test]
    fn test_verify_error_kind() {
        let err = GridFsError::FileNotFound(ObjectId::new());
        assert!(ResultMatcher::verify_error(ErrorKind::FileNotFound, &err).is_ok());
        assert!(matches!(
            ResultMatcher::verify_error(ErrorKind::ChunkIsMissing, &err),
            Err(TckError::AssertionMismatch { .. })
        ));
    }

    #[test]
    fn test_no_expected_view_matches() {
        let actual = vec![chunk(ObjectId::new(), ObjectId::new(), 0, b"x")];
        assert!(CollectionStateMatcher::matches(None, &actual, NaturalKey::FileChunk));
    }

    #[test]
    fn test_empty_expected_view_requires_empty_actual() {
        let actual = vec![chunk(ObjectId::new(), ObjectId::new(), 0, b"x")];
        assert!(CollectionStateMatcher::matches(Some(&[][..]), &[], NaturalKey::FileChunk));
        assert!(!CollectionStateMatcher::matches(Some(&[][..]), &actual, NaturalKey::FileChunk));
    }

    #[test]
    fn test_chunk_ids_are_elided() {
        let files_id = ObjectId::new();
        let expected = vec![chunk(ObjectId::new(), files_id, 0, b"D")];
        let actual = vec![chunk(ObjectId::new(), files_id, 0, b"D")];
        assert!(CollectionStateMatcher::matches(Some(expected.as_slice()), &actual, NaturalKey::FileChunk));

        let changed = vec![chunk(ObjectId::new(), files_id, 0, b"E")];
        assert!(!CollectionStateMatcher::matches(Some(expected.as_slice()), &changed, NaturalKey::FileChunk));
        assert!(!CollectionStateMatcher::matches(Some(changed.as_slice()), &actual, NaturalKey::FileChunk));
    }

    #[test]
    fn test_unmatched_actual_document_fails() {
        let files_id = ObjectId::new();
        let expected = vec![chunk(ObjectId::new(), files_id, 0, b"D")];
        let actual = vec![
            chunk(ObjectId::new(), files_id, 0, b"D"),
            chunk(ObjectId::new(), files_id, 1, b"D"),
        ];
        let err = CollectionStateMatcher::verify(
            "fs.chunks",
            Some(expected.as_slice()),
            &actual,
            NaturalKey::FileChunk,
        )
        .unwrap_err();
        match err {
            TckError::AssertionMismatch { expected, actual, .. } => {
                assert!(expected.starts_with("<no document"));
                assert!(!actual.contains(" _id:"));
                assert!(actual.contains("files_id:"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_files_matched_by_id() {
        let id = ObjectId::new();
        let expected = vec![doc! { "_id" => id, "length" => 5i64, "filename" => "a" }];
        let actual = vec![doc! { "_id" => id, "length" => 5i64, "filename" => "a" }];
        assert!(CollectionStateMatcher::matches(Some(expected.as_slice()), &actual, NaturalKey::Id));

        let renamed = vec![doc! { "_id" => id, "length" => 5i64, "filename" => "b" }];
        assert!(!CollectionStateMatcher::matches(Some(expected.as_slice()), &renamed, NaturalKey::Id));

        let unknown = vec![doc! { "_id" => ObjectId::new(), "length" => 5i64, "filename" => "a" }];
        assert!(!CollectionStateMatcher::matches(Some(expected.as_slice()), &unknown, NaturalKey::Id));
    }
}
