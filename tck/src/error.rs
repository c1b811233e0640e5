//! Engine error kinds.
//!
//! Only failures a scenario explicitly expects are caught by the engine;
//! everything else surfaces as one of these variants.

use gridfs_common::GridFsError;
use thiserror::Error;

/// Convenience alias used throughout the engine.
pub type TckResult<T> = Result<T, TckError>;

/// Errors raised while loading, running or asserting a scenario.
#[derive(Debug, Error)]
pub enum TckError {
    /// The scenario document is malformed; the whole spec is unusable.
    #[error("Failed to load spec '{spec}': {reason}")]
    SpecLoad {
        /// Spec description (source name)
        spec: String,
        /// What was wrong
        reason: String,
    },

    /// Inserting or arranging fixture data failed.
    #[error("Fixture setup failed for '{target}': {reason}")]
    FixtureSetup {
        /// Test case or collection being prepared
        target: String,
        /// Underlying failure
        reason: String,
    },

    /// An operation declared to succeed raised a failure.
    #[error("Operation '{operation}' failed unexpectedly: {source}")]
    UnexpectedOperationFailure {
        /// Operation name
        operation: String,
        /// Backend failure
        #[source]
        source: GridFsError,
    },

    /// An operation declared to fail returned a value.
    #[error("Operation '{operation}' expected to fail with {expected} but returned {result}")]
    MissingExpectedFailure {
        /// Operation name
        operation: String,
        /// Expected error kind
        expected: String,
        /// Value actually returned
        result: String,
    },

    /// An assert block names an error kind outside the mapping table.
    #[error("Unknown error kind '{0}'")]
    UnknownErrorKind(String),

    /// A matcher rejected the actual outcome.
    #[error("Assertion mismatch on {subject}:\n  expected: {expected}\n  actual:   {actual}")]
    AssertionMismatch {
        /// What was compared (result, error, collection name)
        subject: String,
        /// Rendered expected value
        expected: String,
        /// Rendered actual value
        actual: String,
    },

    /// Scenario-authored data could not be converted (bad hex, bad `$oid`, ...).
    #[error("Invalid scenario data: {0}")]
    Transform(String),
}

impl TckError {
    /// True for failures of the assertion phase (as opposed to harness errors).
    pub fn is_assertion_failure(&self) -> bool {
        matches!(
            self,
            TckError::AssertionMismatch { .. } | TckError::MissingExpectedFailure { .. }
        )
    }

    pub(crate) fn fixture_setup(target: &str, reason: impl ToString) -> Self {
        TckError::FixtureSetup {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn spec_load(spec: &str, reason: impl ToString) -> Self {
        TckError::SpecLoad {
            spec: spec.to_string(),
            reason: reason.to_string(),
        }
    }
}
