use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while ingesting a raw definition document.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Unsupported schema: {0}")]
    UnsupportedSchema(String),
}

/// Errors that can occur while parsing an expression with the full grammar.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Expression nesting exceeds the depth limit of {limit}")]
    TooComplex { limit: usize },

    #[error("Syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("Unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },
}

/// Errors raised by variable lookups during sequence replay.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    #[error("Variable '{name}' referenced at action {action_index} before any visible declaration")]
    UndeclaredVariable { name: String, action_index: usize },
}

/// Errors reported by a flow store implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Upstream rejected the request with a retryable rate status")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),
}

/// Errors produced by the rate governor's retry driver.
#[derive(Error, Debug)]
pub enum GovernorError {
    #[error("Quota exceeded for '{label}' after {attempts} attempts ({waited:?} spent waiting)")]
    QuotaExceeded {
        label: String,
        attempts: u32,
        waited: Duration,
    },

    #[error("Call '{label}' failed: {source}")]
    CallFailed {
        label: String,
        #[source]
        source: StoreError,
    },
}

/// Errors that abort a whole batch run, as opposed to a single document.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Could not list flows from the store: {0}")]
    Listing(#[from] GovernorError),

    #[error("Could not write the analysis report: {0}")]
    Report(#[from] std::io::Error),
}
