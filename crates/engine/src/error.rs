//! The module contains the errors the builder can report.
//!
//! - [`EngineError`] is returned by builder transitions that break a rule
//!   (unknown ids, illegal operators, out-of-range indices, ...). The
//!   configuration passed in is never modified when one is returned.
//! - [`ReportFailure`] describes a remote call that did not succeed. Failures
//!   are recorded on the session and surfaced as notices, they never end it.
use thiserror::Error;

use crate::session::RequestKind;
use crate::validation::ValidationIssue;

/// Builder custom errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Unknown field: {0}")]
    UnknownField(String),
    #[error("Invalid operator: {0}")]
    InvalidOperator(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Invalid sort: {0}")]
    InvalidSort(String),
    #[error("Invalid aggregation: {0}")]
    InvalidAggregation(String),
    #[error("Invalid index: {0}")]
    InvalidIndex(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Data source mismatch: {0}")]
    DataSourceMismatch(String),
    #[error("Report is not valid: {}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),
    #[error("A {0} request is already in progress")]
    RequestInFlight(RequestKind),
    #[error("Report session is closed")]
    SessionClosed,
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A remote call that failed, classified by the operation it belonged to.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReportFailure {
    #[error("Field catalog unavailable, using built-in fields: {0}")]
    MetadataFetch(String),
    #[error("Report is not valid: {0}")]
    Validation(String),
    #[error("Report execution failed: {0}")]
    Execution(String),
    #[error("Export failed: {0}")]
    Export(String),
    #[error("Template operation failed: {0}")]
    Template(String),
}

impl From<&EngineError> for ReportFailure {
    fn from(value: &EngineError) -> Self {
        match value {
            EngineError::Validation(issues) => Self::Validation(join_issues(issues)),
            other => Self::Validation(other.to_string()),
        }
    }
}
