//! Single-scenario orchestration.
//!
//! A [`TestCase`] walks one scenario through its phases:
//!
//! ```text
//! Initialized ─▶ PreDataInserted ─▶ Arranged ─▶ Executed ─▶ PostStateMaterialized ─▶ Asserted
//! ```
//!
//! Collections are left as the scenario left them; clearing them is the
//! caller's job (see [`TestCase::clear_collections`]).

use chrono::{DateTime, Utc};
use gridfs_common::config::{CHUNKS_SUFFIX, EXPECTED_PREFIX, FILES_SUFFIX};
use gridfs_common::time::now_millis;
use gridfs_common::{Collection, Document, GridFsError, Value};
use log::{debug, log_enabled, Level};

use super::backend::GridFsBackend;
use super::operation::{Assertion, Operation, OperationKind};
use super::transform::{DataTransformer, ExecutionContext};
use super::types::{raw_documents, SharedData, TestDefinition};
use super::verification::{CollectionStateMatcher, ExpectedResult, NaturalKey, ResultMatcher};
use crate::error::{TckError, TckResult};

/// Lifecycle phase of a test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TestPhase {
    /// Built, nothing touched yet
    Initialized,
    /// Shared fixture documents inserted
    PreDataInserted,
    /// Arrange steps applied
    Arranged,
    /// Operation executed
    Executed,
    /// Expected collections built
    PostStateMaterialized,
    /// Result and collections checked
    Asserted,
}

/// One scenario, ready to run against a backend.
#[derive(Debug, Clone)]
pub struct TestCase {
    description: String,
    upload_date: DateTime<Utc>,
    files_data: Vec<Document>,
    chunks_data: Vec<Document>,
    operation: Operation,
    transformer: DataTransformer,
    phase: TestPhase,
}

impl TestCase {
    /// Build a test case from shared data and one scenario entry.
    ///
    /// The upload date is fixed here, and the shared documents are
    /// converted once with it.
    pub fn new(data: &SharedData, definition: &TestDefinition) -> TckResult<Self> {
        let description = definition.description.clone();
        let upload_date = now_millis();
        let transformer = DataTransformer::new();
        let ctx = ExecutionContext::new(upload_date);

        let kind = match &definition.assert.error {
            Some(name) => OperationKind::ExpectedError(name.parse()?),
            None => OperationKind::Success,
        };
        let assertion = Assertion {
            result: ExpectedResult::from_raw(definition.assert.result.as_ref())?,
            data: definition.assert.data.clone(),
        };
        let arrange_steps = definition
            .arrange
            .as_ref()
            .map(|arrange| arrange.data.clone())
            .unwrap_or_default();
        let operation = Operation::new(&definition.act, arrange_steps, assertion, kind)
            .map_err(|reason| TckError::spec_load(&description, reason))?;

        Ok(Self {
            files_data: transformer.transform_documents(&raw_documents(&data.files), &ctx)?,
            chunks_data: transformer.transform_documents(&raw_documents(&data.chunks), &ctx)?,
            description,
            upload_date,
            operation,
            transformer,
            phase: TestPhase::Initialized,
        })
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Timestamp shared by every conversion in this test case.
    pub fn upload_date(&self) -> DateTime<Utc> {
        self.upload_date
    }

    /// The scenario's operation.
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Whether the scenario expects the operation to fail.
    pub fn is_error(&self) -> bool {
        matches!(self.operation.kind(), OperationKind::ExpectedError(_))
    }

    /// Whether the scenario declares an expected post-state.
    pub fn asserts_data(&self) -> bool {
        self.operation.assertion().data.is_some()
    }

    /// Value returned by the operation, once executed.
    pub fn result(&self) -> Option<&Value> {
        self.operation.result()
    }

    /// Failure captured by an expected-error operation.
    pub fn error(&self) -> Option<&GridFsError> {
        self.operation.error()
    }

    /// Current phase.
    pub fn phase(&self) -> TestPhase {
        self.phase
    }

    fn context(&self) -> ExecutionContext {
        ExecutionContext::new(self.upload_date)
    }

    /// Insert fixtures, arrange, execute and materialize the expected
    /// post-state.
    pub async fn run(&mut self, backend: &mut dyn GridFsBackend) -> TckResult<()> {
        let ctx = self.context();

        self.insert_pre_data(backend)?;
        self.phase = TestPhase::PreDataInserted;

        self.operation.arrange(backend, &self.transformer, &ctx)?;
        self.phase = TestPhase::Arranged;

        self.operation.execute(backend, &ctx).await?;
        self.phase = TestPhase::Executed;

        self.operation
            .prepare_expected_collections(backend, &self.transformer, &ctx)?;
        self.phase = TestPhase::PostStateMaterialized;

        if log_enabled!(Level::Debug) {
            debug!("Test '{}' executed, asserting", self.description);
        }
        Ok(())
    }

    /// Check the outcome: the error kind for expected failures, otherwise
    /// the result, then both collections when a post-state was declared.
    pub fn verify(&mut self, backend: &dyn GridFsBackend) -> TckResult<()> {
        match (self.operation.kind(), self.operation.error()) {
            (OperationKind::ExpectedError(expected), Some(actual)) => {
                ResultMatcher::verify_error(expected, actual)?;
            }
            (OperationKind::ExpectedError(expected), None) => {
                return Err(TckError::MissingExpectedFailure {
                    operation: self.operation.name().to_string(),
                    expected: expected.to_string(),
                    result: "<not executed>".to_string(),
                });
            }
            (OperationKind::Success, _) => {
                let recorded = self.operation.result();
                let actual = recorded.cloned().unwrap_or(Value::Null);
                ResultMatcher::verify(&self.operation.assertion().result, &actual, recorded)?;
            }
        }

        if self.asserts_data() {
            let (expected_files, expected_chunks) = expected_collections(backend);
            CollectionStateMatcher::verify(
                backend.files_collection().name(),
                Some(expected_files.snapshot().as_slice()),
                &backend.files_collection().snapshot(),
                NaturalKey::Id,
            )?;
            CollectionStateMatcher::verify(
                backend.chunks_collection().name(),
                Some(expected_chunks.snapshot().as_slice()),
                &backend.chunks_collection().snapshot(),
                NaturalKey::FileChunk,
            )?;
        }

        self.phase = TestPhase::Asserted;
        Ok(())
    }

    /// Empty the live and expected collections.
    ///
    /// Safe to call whatever phase the test case stopped in.
    pub fn clear_collections(&self, backend: &dyn GridFsBackend) {
        let (expected_files, expected_chunks) = expected_collections(backend);
        let all = Document::new();
        let removed = backend.files_collection().delete_many(&all)
            + backend.chunks_collection().delete_many(&all)
            + expected_files.delete_many(&all)
            + expected_chunks.delete_many(&all);

        if log_enabled!(Level::Debug) {
            debug!(
                "Cleared collections after '{}' ({} documents removed)",
                self.description, removed
            );
        }
    }

    // Shared fixtures go to both the live and the expected collections
    fn insert_pre_data(&self, backend: &dyn GridFsBackend) -> TckResult<()> {
        let (expected_files, expected_chunks) = expected_collections(backend);
        let targets = [
            (&self.files_data, backend.files_collection(), expected_files),
            (&self.chunks_data, backend.chunks_collection(), expected_chunks),
        ];
        for (documents, live, expected) in targets {
            if documents.is_empty() {
                continue;
            }
            for collection in [live, expected] {
                collection
                    .insert_many(documents.iter().cloned())
                    .map_err(|e| TckError::fixture_setup(&self.description, e))?;
            }
        }
        Ok(())
    }
}

/// Shadow collections accumulating the expected post-state.
pub fn expected_collections(backend: &dyn GridFsBackend) -> (Collection, Collection) {
    (
        backend.collection(&format!("{}.{}", EXPECTED_PREFIX, FILES_SUFFIX)),
        backend.collection(&format!("{}.{}", EXPECTED_PREFIX, CHUNKS_SUFFIX)),
    )
}
