//! Error types for ABI decoding.

use chainsearch_chain::PackError;
use thiserror::Error;

/// Errors from decoding a payload against an ABI.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    /// A type name resolves to nothing the schema or the built-ins know.
    #[error("unknown abi type '{0}'")]
    UnknownType(String),

    /// Nesting exceeded the configured depth guard.
    #[error("abi recursion deeper than {0}")]
    DepthExceeded(usize),

    /// The packed payload itself was malformed.
    #[error(transparent)]
    Pack(#[from] PackError),

    /// A decoded value could not be rendered as JSON.
    #[error("abi value not representable as json: {0}")]
    Json(String),
}

/// Result type for ABI decoding.
pub type AbiResult<T> = Result<T, AbiError>;
