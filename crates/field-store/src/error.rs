//! Error types for the field store.

use std::io;
use std::path::{Path, PathBuf};

use field_codec::CodecError;
use thiserror::Error;

use crate::types::DataType;

/// Errors that can occur while opening, writing, reading or closing a store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The session was requested with an unusable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The file does not start with the container signature.
    #[error("{}: bad magic number {found:#010x}", .path.display())]
    BadMagic { path: PathBuf, found: i32 },

    /// The size recorded in the file header disagrees with the filesystem.
    #[error("{}: header records {stored} bytes but file has {actual}", .path.display())]
    SizeMismatch {
        path: PathBuf,
        stored: i64,
        actual: u64,
    },

    /// The file was written by an incompatible format revision.
    #[error(
        "{}: incompatible format (version {version}, file header {fsize} bytes, field header {hsize} bytes)",
        .path.display()
    )]
    IncompatibleVersion {
        path: PathBuf,
        version: u32,
        fsize: u32,
        hsize: u32,
    },

    /// A non-empty file too short to hold a file header.
    #[error("{}: {len} bytes is smaller than a file header", .path.display())]
    FileTooSmall { path: PathBuf, len: u64 },

    /// An empty file opened without write permission.
    #[error("{}: empty file opened without write permission", .path.display())]
    EmptyFile { path: PathBuf },

    /// The trailing field index is inconsistent with the file.
    #[error("{}: corrupt field index: {reason}", .path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    /// A system call failed.
    #[error("{}: {op} failed: {source}", .path.display())]
    Io {
        path: PathBuf,
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// A write was attempted on a session opened without write permission.
    #[error("{}: store not opened for writing", .path.display())]
    ReadOnly { path: PathBuf },

    /// The key does not address a field of this session.
    #[error("invalid field key {0}")]
    InvalidKey(i64),

    /// The field metadata or payload is malformed.
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// The requested element conversion is not possible.
    #[error("cannot convert {from} values to {to}")]
    Conversion { from: DataType, to: DataType },

    /// A compressed payload could not be decoded.
    #[error("{}: codec error: {source}", .path.display())]
    Codec {
        path: PathBuf,
        #[source]
        source: CodecError,
    },
}

impl StoreError {
    /// Build a mapper from `io::Error` for use with `map_err`.
    pub fn io<'a>(path: &'a Path, op: &'static str) -> impl FnOnce(io::Error) -> Self + 'a {
        move |source| Self::Io {
            path: path.to_path_buf(),
            op,
            source,
        }
    }

    /// Create a CorruptIndex error.
    pub fn corrupt_index(path: &Path, reason: impl Into<String>) -> Self {
        Self::CorruptIndex {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidField error.
    pub fn invalid_field(msg: impl Into<String>) -> Self {
        Self::InvalidField(msg.into())
    }

    /// Whether the error describes a malformed or incompatible file.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::BadMagic { .. }
                | Self::SizeMismatch { .. }
                | Self::IncompatibleVersion { .. }
                | Self::FileTooSmall { .. }
                | Self::EmptyFile { .. }
                | Self::CorruptIndex { .. }
        )
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
