//! Error types for the chain data model.

use thiserror::Error;

/// Errors from parsing chain names.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    /// Name is longer than the 13 characters a 64-bit name can carry.
    #[error("name '{0}' exceeds 13 characters")]
    TooLong(String),

    /// Character outside the `.1-5a-z` alphabet.
    #[error("invalid character '{ch}' in name '{name}'")]
    InvalidCharacter { name: String, ch: char },

    /// The 13th character can only carry 4 bits.
    #[error("13th character of '{0}' out of range")]
    ThirteenthCharacter(String),
}

/// Errors from the packed binary codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PackError {
    /// Read past the end of the buffer.
    #[error("unexpected end of packed data (wanted {wanted} more bytes)")]
    UnexpectedEnd { wanted: usize },

    /// A varuint32 did not terminate within 5 bytes.
    #[error("malformed varuint32")]
    BadVaruint,

    /// A decoded string was not valid UTF-8.
    #[error("packed string is not valid utf-8")]
    BadUtf8,

    /// Buffer had bytes left after a whole-value decode.
    #[error("{0} trailing bytes after packed value")]
    TrailingBytes(usize),
}

/// Errors from signature recovery and key handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Recovery id byte outside 0..=3.
    #[error("invalid signature recovery id {0}")]
    RecoveryId(u8),

    /// Malformed signature or digest.
    #[error("signature recovery failed: {0}")]
    Recovery(String),

    /// Wrong length for a fixed-size value.
    #[error("expected {expected} bytes, got {got}")]
    Length { expected: usize, got: usize },

    /// Hex string could not be decoded.
    #[error("invalid hex: {0}")]
    Hex(String),
}
