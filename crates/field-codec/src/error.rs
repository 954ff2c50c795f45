//! Error types for the float codec.

use thiserror::Error;

/// Errors that can occur while encoding or decoding a compressed stream.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The compressed stream ended before the expected number of values.
    #[error("compressed stream truncated after {decoded} of {expected} values")]
    Truncated { decoded: usize, expected: usize },

    /// A leading-zero code that no encoder of this width produces.
    #[error("invalid leading-zero code {code} at value {index}")]
    InvalidCode { code: u8, index: usize },

    /// The output sink rejected a write.
    #[error("codec I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
