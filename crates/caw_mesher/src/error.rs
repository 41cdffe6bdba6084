//! Error types shared by the codec, classifier and assembler.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::FaceGroup;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MeshError>;

/// Reasons a `.caw` byte stream is rejected by the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("file is {len} bytes, shorter than the {header}-byte header")]
    Truncated { len: usize, header: usize },

    #[error("bad magic {found:?}, expected \"caw\"")]
    BadMagic { found: [u8; 3] },

    #[error("unsupported format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u8, supported: u8 },

    #[error("negative vertex count {count} for group {group}")]
    NegativeCount { group: FaceGroup, count: i32 },

    #[error("size mismatch: header implies {expected} bytes, file has {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
}

/// Top-level error for every fallible operation in the crate.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Malformed template bytes.
    #[error("template format error: {0}")]
    Format(#[from] FormatError),

    /// Template file missing, unreadable or unwritable.
    #[error("i/o failure on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed voxel field, template or configuration handed to an operation.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl MeshError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
