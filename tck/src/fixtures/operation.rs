//! Operation execution.
//!
//! An [`Operation`] is one scenario's `act` block together with its arrange
//! steps and assertions. Its [`OperationKind`] is fixed at construction:
//! a `Success` operation lets backend failures propagate, an
//! `ExpectedError` operation captures them and treats a returned value as
//! a failed assertion.

use std::fmt;
use std::str::FromStr;

use gridfs_common::collection::{CollectionError, ID_FIELD};
use gridfs_common::config::{CHUNKS_SUFFIX, DEFAULT_BUCKET_NAME, FILES_SUFFIX};
use gridfs_common::document::document_from_json;
use gridfs_common::gridfs::FILES_ID_FIELD;
use gridfs_common::{Binary, Collection, Document, GridFsError, ObjectId, UploadOptions, Value};
use log::{debug, log_enabled, Level};

use super::backend::GridFsBackend;
use super::transform::{hex_binary, to_oid, DataTransformer, DeleteLimit, ExecutionContext};
use super::types::{raw_documents, Act, DataStep, ErrorKind};
use super::verification::ExpectedResult;
use crate::error::{TckError, TckResult};

const ID_ARGUMENT: &str = "id";
const FILENAME_ARGUMENT: &str = "filename";
const SOURCE_ARGUMENT: &str = "source";
const OPTIONS_ARGUMENT: &str = "options";
const SET_OPERATOR: &str = "$set";

/// Backend action named by a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationName {
    /// Store a new file
    Upload,
    /// Read a file back
    Download,
    /// Remove a file
    Delete,
}

impl OperationName {
    /// Scenario spelling of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationName::Upload => "upload",
            OperationName::Download => "download",
            OperationName::Delete => "delete",
        }
    }
}

impl FromStr for OperationName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upload" => Ok(OperationName::Upload),
            "download" => Ok(OperationName::Download),
            "delete" => Ok(OperationName::Delete),
            other => Err(format!("unsupported operation '{}'", other)),
        }
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution variant, chosen once from the scenario's assert block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// The action must return a value
    Success,
    /// The action must fail with this kind
    ExpectedError(ErrorKind),
}

/// Where an operation is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationState {
    /// Not executed yet
    Constructed,
    /// The action returned a value
    ResultAvailable(Value),
    /// The action failed as the scenario expected
    ErrorCaptured(GridFsError),
}

/// What the scenario claims about the outcome.
#[derive(Debug, Clone)]
pub struct Assertion {
    /// Claim about the returned value
    pub result: ExpectedResult,
    /// Steps building the expected post-state, if any
    pub data: Option<Vec<DataStep>>,
}

/// One scenario's action, arrangement and assertions.
#[derive(Debug, Clone)]
pub struct Operation {
    name: OperationName,
    arguments: Document,
    arrange_steps: Vec<DataStep>,
    assertion: Assertion,
    kind: OperationKind,
    state: OperationState,
}

impl Operation {
    /// Build an operation from its scenario blocks.
    pub fn new(
        act: &Act,
        arrange_steps: Vec<DataStep>,
        assertion: Assertion,
        kind: OperationKind,
    ) -> Result<Self, String> {
        Ok(Self {
            name: act.operation.parse()?,
            arguments: document_from_json(&act.arguments),
            arrange_steps,
            assertion,
            kind,
            state: OperationState::Constructed,
        })
    }

    /// Action name.
    pub fn name(&self) -> OperationName {
        self.name
    }

    /// Raw scenario arguments.
    pub fn arguments(&self) -> &Document {
        &self.arguments
    }

    /// Execution variant.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Declared assertions.
    pub fn assertion(&self) -> &Assertion {
        &self.assertion
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &OperationState {
        &self.state
    }

    /// Value returned by the action, once available.
    pub fn result(&self) -> Option<&Value> {
        match &self.state {
            OperationState::ResultAvailable(value) => Some(value),
            _ => None,
        }
    }

    /// Failure captured by an expected-error operation.
    pub fn error(&self) -> Option<&GridFsError> {
        match &self.state {
            OperationState::ErrorCaptured(error) => Some(error),
            _ => None,
        }
    }

    /// Identifier the action produced, used for self references and pins.
    pub fn produced_id(&self) -> Option<ObjectId> {
        self.result().and_then(Value::as_object_id).copied()
    }

    /// Apply the arrange steps in declared order.
    pub fn arrange(
        &self,
        backend: &dyn GridFsBackend,
        transformer: &DataTransformer,
        ctx: &ExecutionContext,
    ) -> TckResult<()> {
        for step in &self.arrange_steps {
            apply_data_step(backend, transformer, ctx, step)?;
        }
        Ok(())
    }

    /// Invoke the action and move to a terminal state.
    ///
    /// Argument conversion failures are returned as errors in both
    /// variants; only backend failures are captured.
    pub async fn execute(
        &mut self,
        backend: &mut dyn GridFsBackend,
        ctx: &ExecutionContext,
    ) -> TckResult<&OperationState> {
        let invocation = self.invocation(ctx)?;
        let outcome = invocation.invoke(backend).await;

        if log_enabled!(Level::Debug) {
            debug!(
                "Operation '{}' on {} finished: {}",
                self.name,
                backend.backend_name(),
                match &outcome {
                    Ok(value) => format!("returned {}", value),
                    Err(e) => format!("failed with {}", e),
                }
            );
        }

        self.state = match (self.kind, outcome) {
            (OperationKind::Success, Ok(value)) => OperationState::ResultAvailable(value),
            (OperationKind::Success, Err(source)) => {
                return Err(TckError::UnexpectedOperationFailure {
                    operation: self.name.to_string(),
                    source,
                });
            }
            (OperationKind::ExpectedError(_), Err(error)) => OperationState::ErrorCaptured(error),
            (OperationKind::ExpectedError(expected), Ok(value)) => {
                return Err(TckError::MissingExpectedFailure {
                    operation: self.name.to_string(),
                    expected: expected.to_string(),
                    result: value.to_string(),
                });
            }
        };
        Ok(&self.state)
    }

    /// Apply the assert block's data steps to the expected collections.
    ///
    /// Inserts pin `_id` (files collections) or `files_id` (everything
    /// else) to the identifier the action produced.
    pub fn prepare_expected_collections(
        &self,
        backend: &dyn GridFsBackend,
        transformer: &DataTransformer,
        ctx: &ExecutionContext,
    ) -> TckResult<()> {
        let steps = match &self.assertion.data {
            Some(steps) => steps,
            None => return Ok(()),
        };
        let produced = self.produced_id();
        for step in steps {
            let step_ctx = match step {
                DataStep::Insert { insert, .. } if is_files_collection(insert) => {
                    ctx.with_pinned_id(produced)
                }
                DataStep::Insert { .. } => ctx.with_pinned_files_id(produced),
                _ => ctx.clone(),
            };
            apply_data_step(backend, transformer, &step_ctx, step)?;
        }
        Ok(())
    }

    fn invocation(&self, ctx: &ExecutionContext) -> TckResult<Invocation> {
        match self.name {
            OperationName::Upload => {
                let filename = self
                    .arguments
                    .get(FILENAME_ARGUMENT)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let source = self.argument(SOURCE_ARGUMENT)?;
                let bytes = match hex_binary(source)? {
                    Value::Binary(binary) => binary.bytes,
                    _ => Vec::new(),
                };
                Ok(Invocation::Upload {
                    filename,
                    source: bytes,
                    options: self.upload_options(ctx)?,
                })
            }
            OperationName::Download => Ok(Invocation::Download(self.id_argument()?)),
            OperationName::Delete => Ok(Invocation::Delete(self.id_argument()?)),
        }
    }

    fn argument(&self, name: &str) -> TckResult<&Value> {
        self.arguments.get(name).ok_or_else(|| {
            TckError::Transform(format!("'{}' requires argument '{}'", self.name, name))
        })
    }

    fn id_argument(&self) -> TckResult<ObjectId> {
        to_oid(self.argument(ID_ARGUMENT)?, None)
    }

    // The upload date always comes from the test case, whatever the scenario says
    fn upload_options(&self, ctx: &ExecutionContext) -> TckResult<UploadOptions> {
        let mut options = UploadOptions {
            upload_date: Some(ctx.upload_date),
            ..UploadOptions::default()
        };
        let declared = match self.arguments.get(OPTIONS_ARGUMENT) {
            Some(Value::Document(declared)) => declared,
            Some(other) => {
                return Err(TckError::Transform(format!(
                    "upload options must be a document, got {}",
                    other
                )))
            }
            None => return Ok(options),
        };
        for (key, value) in declared {
            match key.as_str() {
                "chunkSizeBytes" => {
                    let size = value
                        .as_i64()
                        .and_then(|size| usize::try_from(size).ok())
                        .filter(|size| *size > 0)
                        .ok_or_else(|| {
                            TckError::Transform(format!("invalid chunkSizeBytes {}", value))
                        })?;
                    options.chunk_size_bytes = Some(size);
                }
                "contentType" => options.content_type = value.as_str().map(str::to_string),
                "metadata" => options.metadata = value.as_document().cloned(),
                _ => {}
            }
        }
        Ok(options)
    }
}

// Fully converted arguments, ready for the backend
enum Invocation {
    Upload {
        filename: String,
        source: Vec<u8>,
        options: UploadOptions,
    },
    Download(ObjectId),
    Delete(ObjectId),
}

impl Invocation {
    async fn invoke(self, backend: &mut dyn GridFsBackend) -> Result<Value, GridFsError> {
        match self {
            Invocation::Upload {
                filename,
                source,
                options,
            } => backend
                .upload(&filename, &source, options)
                .await
                .map(Value::ObjectId),
            Invocation::Download(id) => backend
                .download(&id)
                .await
                .map(|bytes| Value::Binary(Binary::generic(bytes))),
            Invocation::Delete(id) => backend.delete(&id).await.map(|_| Value::Null),
        }
    }
}

fn is_files_collection(name: &str) -> bool {
    name.ends_with(&format!(".{}", FILES_SUFFIX))
}

/// Apply one insert, update or delete step to a named collection.
pub fn apply_data_step(
    backend: &dyn GridFsBackend,
    transformer: &DataTransformer,
    ctx: &ExecutionContext,
    step: &DataStep,
) -> TckResult<()> {
    let collection = step_collection(backend, step.collection());
    let to_setup_error = |e: CollectionError| TckError::fixture_setup(step.collection(), e);

    match step {
        DataStep::Insert { documents, .. } => {
            let documents = transformer.transform_documents(&raw_documents(documents), ctx)?;
            if !documents.is_empty() {
                collection.insert_many(documents).map_err(to_setup_error)?;
            }
        }
        DataStep::Update { updates, .. } => {
            for statement in updates {
                let filter = resolve_selector(&document_from_json(&statement.q))?;
                let update = transform_update(transformer, &document_from_json(&statement.u), ctx)?;
                collection.update_one(&filter, &update).map_err(to_setup_error)?;
            }
        }
        DataStep::Delete { deletes, .. } => {
            for statement in deletes {
                let filter = resolve_selector(&document_from_json(&statement.q))?;
                match DeleteLimit::from_limit(statement.limit) {
                    DeleteLimit::One => collection.delete_one(&filter),
                    DeleteLimit::Many => collection.delete_many(&filter),
                };
            }
        }
    }

    if log_enabled!(Level::Debug) {
        debug!(
            "Applied data step on '{}' ({} documents now)",
            step.collection(),
            collection.count()
        );
    }
    Ok(())
}

/// Collection a data step writes to.
///
/// Scenarios address the live bucket by its default name, so `fs.files` and
/// `fs.chunks` follow the backend's configured bucket.
pub fn step_collection(backend: &dyn GridFsBackend, name: &str) -> Collection {
    let suffix = name
        .strip_prefix(DEFAULT_BUCKET_NAME)
        .and_then(|rest| rest.strip_prefix('.'));
    match suffix {
        Some(FILES_SUFFIX) => backend.files_collection(),
        Some(CHUNKS_SUFFIX) => backend.chunks_collection(),
        _ => backend.collection(name),
    }
}

// Selector identifiers are decoded but never pinned
fn resolve_selector(selector: &Document) -> TckResult<Document> {
    selector
        .iter()
        .map(|(field, value)| {
            let value = match field.as_str() {
                ID_FIELD | FILES_ID_FIELD if !value.is_null() => Value::ObjectId(to_oid(value, None)?),
                _ => value.clone(),
            };
            Ok((field.clone(), value))
        })
        .collect()
}

// `$set` bodies go through the field converters like inserted documents
fn transform_update(
    transformer: &DataTransformer,
    update: &Document,
    ctx: &ExecutionContext,
) -> TckResult<Document> {
    update
        .iter()
        .map(|(operator, body)| {
            let body = match (operator.as_str(), body) {
                (SET_OPERATOR, Value::Document(fields)) => {
                    Value::Document(transformer.transform_document(fields, ctx)?)
                }
                _ => body.clone(),
            };
            Ok((operator.clone(), body))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TckConfig;
    use crate::fixtures::backends::memory::InMemoryBackend;
    use gridfs_common::time::now_millis;

    fn act(yaml: &str) -> Act {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn operation(yaml: &str, kind: OperationKind) -> Operation {
        let assertion = Assertion {
            result: ExpectedResult::Absent,
            data: None,
        };
        Operation::new(&act(yaml), Vec::new(), assertion, kind).unwrap()
    }

    #[test]
    fn test_unknown_operation_is_rejected() {
        let assertion = Assertion {
            result: ExpectedResult::Absent,
            data: None,
        };
        let err = Operation::new(
            &act("operation: rename"),
            Vec::new(),
            assertion,
            OperationKind::Success,
        )
        .unwrap_err();
        assert!(err.contains("rename"));
    }

    #[tokio::test]
    async fn test_successful_upload_records_result() {
        let mut backend = InMemoryBackend::new("operation_tests");
        let ctx = ExecutionContext::new(now_millis());
        let mut op = operation(
            r#"{ operation: upload, arguments: { filename: "f", source: { "$hex": "68656c6c6f" }, options: { chunkSizeBytes: 2 } } }"#,
            OperationKind::Success,
        );

        op.execute(&mut backend, &ctx).await.unwrap();

        let id = op.produced_id().unwrap();
        assert_eq!(backend.download(&id).await.unwrap(), b"hello".to_vec());
        assert_eq!(backend.chunks_collection().count(), 3);
        let file = backend.files_collection().snapshot().remove(0);
        assert_eq!(file["uploadDate"], Value::datetime(ctx.upload_date));
    }

    #[tokio::test]
    async fn test_success_variant_propagates_failures() {
        let mut backend = InMemoryBackend::new("operation_tests");
        let ctx = ExecutionContext::new(now_millis());
        let mut op = operation(
            r#"{ operation: download, arguments: { id: { "$oid": "000000000000000000000001" } } }"#,
            OperationKind::Success,
        );

        let err = op.execute(&mut backend, &ctx).await.unwrap_err();
        assert!(matches!(err, TckError::UnexpectedOperationFailure { .. }));
        assert_eq!(op.state(), &OperationState::Constructed);
    }

    #[tokio::test]
    async fn test_error_variant_captures_failure() {
        let mut backend = InMemoryBackend::new("operation_tests");
        let ctx = ExecutionContext::new(now_millis());
        let mut op = operation(
            r#"{ operation: delete, arguments: { id: { "$oid": "000000000000000000000001" } } }"#,
            OperationKind::ExpectedError(ErrorKind::FileNotFound),
        );

        op.execute(&mut backend, &ctx).await.unwrap();
        assert!(matches!(op.error(), Some(GridFsError::FileNotFound(_))));
        assert!(op.result().is_none());
    }

    #[tokio::test]
    async fn test_error_variant_reports_missing_failure() {
        let mut backend = InMemoryBackend::new("operation_tests");
        let ctx = ExecutionContext::new(now_millis());
        let mut op = operation(
            r#"{ operation: upload, arguments: { filename: "f", source: { "$hex": "" } } }"#,
            OperationKind::ExpectedError(ErrorKind::ExtraChunk),
        );

        let err = op.execute(&mut backend, &ctx).await.unwrap_err();
        assert!(err.is_assertion_failure());
    }

    #[tokio::test]
    async fn test_bad_hex_argument_is_not_captured() {
        let mut backend = InMemoryBackend::new("operation_tests");
        let ctx = ExecutionContext::new(now_millis());
        let mut op = operation(
            r#"{ operation: upload, arguments: { filename: "f", source: { "$hex": "abc" } } }"#,
            OperationKind::ExpectedError(ErrorKind::FileNotFound),
        );

        let err = op.execute(&mut backend, &ctx).await.unwrap_err();
        assert!(matches!(err, TckError::Transform(_)));
    }

    #[test]
    fn test_data_steps_update_and_delete() {
        let backend = InMemoryBackend::new("operation_tests");
        let transformer = DataTransformer::new();
        let ctx = ExecutionContext::new(now_millis());
        let steps: Vec<DataStep> = serde_yaml::from_str(
            r#"
- insert: fs.chunks
  documents:
    - { _id: { "$oid": "000000000000000000000001" }, files_id: { "$oid": "000000000000000000000005" }, n: 0, data: { "$hex": "11" } }
    - { _id: { "$oid": "000000000000000000000002" }, files_id: { "$oid": "000000000000000000000005" }, n: 1, data: { "$hex": "22" } }
- update: fs.chunks
  updates:
    - { q: { files_id: { "$oid": "000000000000000000000005" }, n: 0 }, u: { "$set": { data: { "$hex": "33" } } } }
- delete: fs.chunks
  deletes:
    - { q: { files_id: { "$oid": "000000000000000000000005" } }, limit: 1 }
"#,
        )
        .unwrap();

        for step in &steps[..2] {
            apply_data_step(&backend, &transformer, &ctx, step).unwrap();
        }
        let chunks = backend.chunks_collection().snapshot();
        assert_eq!(chunks[0]["data"], Value::Binary(Binary::generic(vec![0x33])));

        apply_data_step(&backend, &transformer, &ctx, &steps[2]).unwrap();
        assert_eq!(backend.chunks_collection().count(), 1);
    }

    #[test]
    fn test_duplicate_insert_is_setup_failure() {
        let backend = InMemoryBackend::new("operation_tests");
        let step: DataStep = serde_yaml::from_str(
            r#"{ insert: fs.files, documents: [ { _id: { "$oid": "000000000000000000000001" } }, { _id: { "$oid": "000000000000000000000001" } } ] }"#,
        )
        .unwrap();
        let err = apply_data_step(
            &backend,
            &DataTransformer::new(),
            &ExecutionContext::new(now_millis()),
            &step,
        )
        .unwrap_err();
        assert!(matches!(err, TckError::FixtureSetup { target, .. } if target == "fs.files"));
    }

    #[test]
    fn test_default_bucket_steps_follow_configured_bucket() {
        let config = TckConfig {
            bucket_name: "photos".to_string(),
            ..TckConfig::default()
        };
        let backend = InMemoryBackend::from_config(&config);
        let step: DataStep = serde_yaml::from_str(
            r#"{ insert: fs.chunks, documents: [ { files_id: { "$oid": "000000000000000000000001" }, n: 0, data: { "$hex": "11" } } ] }"#,
        )
        .unwrap();

        apply_data_step(
            &backend,
            &DataTransformer::new(),
            &ExecutionContext::new(now_millis()),
            &step,
        )
        .unwrap();

        assert_eq!(backend.chunks_collection().name(), "photos.chunks");
        assert_eq!(backend.chunks_collection().count(), 1);
        assert_eq!(backend.collection("fs.chunks").count(), 0);
        assert_eq!(
            step_collection(&backend, "expected.chunks").name(),
            "expected.chunks"
        );
    }
}
