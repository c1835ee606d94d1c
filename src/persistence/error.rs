//! Error types for persistence operations.

use thiserror::Error;

use crate::error::VamanaError;

/// Errors raised while encoding or decoding the on-disk index format.
///
/// These carry the precise failure; at the public API boundary everything
/// except `Io` collapses into [`VamanaError::CorruptIndex`].
#[derive(Debug, Error)]
pub enum FormatError {
    /// I/O error (file operations, stream reads/writes).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The payload does not start with the expected magic bytes.
    #[error("bad magic bytes: not a vamana index")]
    BadMagic,

    /// The payload was written by an unsupported format version.
    #[error("unsupported format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// A header field holds a value the format forbids.
    #[error("invalid header field: {0}")]
    InvalidHeader(String),

    /// Size fields are inconsistent with the payload length.
    #[error("truncated or oversized payload: {0}")]
    LengthMismatch(String),

    /// A neighbor list violates the graph invariants.
    #[error("invalid neighbor list for point {id}: {reason}")]
    InvalidNeighborList { id: u32, reason: String },

    /// Checksum mismatch (data corruption detected).
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
}

pub type FormatResult<T> = std::result::Result<T, FormatError>;

impl From<FormatError> for VamanaError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::Io(io) => VamanaError::Io(io),
            other => VamanaError::CorruptIndex(other.to_string()),
        }
    }
}
