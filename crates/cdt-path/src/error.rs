//! Error types for path encoding and persisted-context decoding.

use thiserror::Error;

/// Result-code families reported by client-side checks.
///
/// The numeric values match the database result codes so callers can treat
/// local failures the same way as remote ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid argument supplied by the caller (result code 4).
    ParameterError,
    /// A value could not be serialized (result code -10).
    SerializeError,
    /// Persisted bytes could not be parsed (result code -2).
    ParseError,
}

impl ErrorCode {
    /// Returns the numeric result code.
    pub fn code(&self) -> i32 {
        match self {
            ErrorCode::ParameterError => 4,
            ErrorCode::SerializeError => -10,
            ErrorCode::ParseError => -2,
        }
    }
}

/// Error while building an operation payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("[4] {operation} requires a non-empty context chain")]
    EmptyContext { operation: &'static str },

    #[error("[4] {field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("[4] nesting depth exceeds maximum {max}")]
    DepthExceeded { max: usize },

    #[error("[-10] compiled expression is not a single packed object")]
    MalformedExpression,
}

impl EncodeError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EncodeError::EmptyContext { .. }
            | EncodeError::LengthExceedsLimit { .. }
            | EncodeError::DepthExceeded { .. } => ErrorCode::ParameterError,
            EncodeError::MalformedExpression => ErrorCode::SerializeError,
        }
    }
}

/// Error while decoding packed bytes or a persisted Base64 context.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("[-2] invalid base64: {0}")]
    InvalidBase64(String),

    #[error("[-2] unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("[-2] unexpected marker 0x{marker:02x} while reading {context}")]
    InvalidMarker { marker: u8, context: &'static str },

    #[error("[-2] invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    #[error("[-2] unknown particle type {particle_type}")]
    UnknownParticleType { particle_type: u8 },

    #[error("[-2] persisted context is not a list")]
    NotAContextList,

    #[error("[-2] persisted context has odd element count {len}")]
    OddContextLength { len: usize },

    #[error("[-2] persisted context is empty")]
    EmptyContext,

    #[error("[-2] context id {id} is not a valid segment id")]
    InvalidContextId { id: i64 },

    #[error("[-2] nesting depth exceeds maximum {max}")]
    DepthExceeded { max: usize },

    #[error("[-2] {field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("[-2] map contains a duplicate key")]
    DuplicateMapKey,

    #[error("[-2] {count} trailing bytes after packed context")]
    TrailingBytes { count: usize },
}

impl DecodeError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        ErrorCode::ParseError
    }
}
