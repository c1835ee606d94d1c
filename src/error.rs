//! Error types for vamana.

use std::fmt;

/// Errors that can occur when building or using an index.
#[derive(Debug)]
pub enum VamanaError {
    /// Vector or query dimension differs from the dataset dimension.
    DimensionMismatch { expected: usize, actual: usize },
    /// The dataset contains no vectors.
    EmptyDataset,
    /// Invalid parameter value.
    InvalidParameter(String),
    /// Point id lookup outside `[0, N)`.
    OutOfRange { id: u32, len: usize },
    /// Persisted index bytes violate the format contract.
    CorruptIndex(String),
    /// Underlying I/O failure while reading or writing an index.
    Io(std::io::Error),
    /// Any other error.
    Other(String),
}

impl fmt::Display for VamanaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VamanaError::DimensionMismatch { expected, actual } => write!(
                f,
                "Dimension mismatch: expected {expected} dimensions, got {actual}",
            ),
            VamanaError::EmptyDataset => write!(f, "Dataset is empty"),
            VamanaError::InvalidParameter(msg) => write!(f, "Invalid parameter: {msg}"),
            VamanaError::OutOfRange { id, len } => {
                write!(f, "Point id {id} out of range for {len} points")
            }
            VamanaError::CorruptIndex(msg) => write!(f, "Corrupt index: {msg}"),
            VamanaError::Io(err) => write!(f, "I/O error: {err}"),
            VamanaError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for VamanaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VamanaError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for VamanaError {
    fn from(err: std::io::Error) -> Self {
        VamanaError::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, VamanaError>;
