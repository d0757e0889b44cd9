//! Error types for document store operations.

use thiserror::Error;

/// Errors from talking to the search backend.
#[derive(Debug, Error)]
pub enum ElasticError {
    /// Transport-level failure: refused connection, timeout, DNS.
    #[error("connection error during {operation}: {source}")]
    Connection {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status.
    #[error("{operation} returned status {status}: {body}")]
    ResponseCode {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// A bulk request succeeded at the transport level but some items failed.
    #[error("bulk had {failed} failed item(s), first: {first_error}")]
    BulkFail { failed: usize, first_error: String },

    /// The backend answered with a body the client could not interpret.
    #[error("invalid response body: {0}")]
    Json(#[from] serde_json::Error),

    /// A configured node URL could not be parsed.
    #[error("invalid node url '{url}': {reason}")]
    BadUrl { url: String, reason: String },
}

/// Result type for document store operations.
pub type ElasticResult<T> = Result<T, ElasticError>;
