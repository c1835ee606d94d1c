//! Immutable vector storage.
//!
//! Vectors live in one contiguous `Vec<f32>` (structure-of-arrays), so point
//! `i` occupies `data[i * dimension .. (i + 1) * dimension]`. The store is
//! created once at load time and never mutated, which makes unsynchronized
//! concurrent reads safe for the lifetime of the index.

use crate::error::{Result, VamanaError};

/// Owns the dataset: N fixed-dimension vectors addressed by ids `0..N`.
#[derive(Debug, Clone)]
pub struct VectorStore {
    data: Vec<f32>,
    dimension: usize,
}

impl VectorStore {
    /// Load a dataset from per-row vectors.
    ///
    /// Fails with `EmptyDataset` if no rows are given and `DimensionMismatch`
    /// if any row's length differs from the first row's.
    pub fn load(vectors: &[Vec<f32>]) -> Result<Self> {
        if vectors.is_empty() {
            return Err(VamanaError::EmptyDataset);
        }
        let dimension = vectors[0].len();
        if dimension == 0 {
            return Err(VamanaError::InvalidParameter(
                "vector dimension must be at least 1".to_string(),
            ));
        }
        let mut data = Vec::with_capacity(vectors.len() * dimension);
        for row in vectors {
            if row.len() != dimension {
                return Err(VamanaError::DimensionMismatch {
                    expected: dimension,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { data, dimension })
    }

    /// Load a dataset from an already-flat `N * dimension` buffer.
    ///
    /// This is the zero-copy path used when deserializing a saved index and
    /// when callers already hold row-major data.
    pub fn from_flat(data: Vec<f32>, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(VamanaError::InvalidParameter(
                "vector dimension must be at least 1".to_string(),
            ));
        }
        if data.is_empty() {
            return Err(VamanaError::EmptyDataset);
        }
        if data.len() % dimension != 0 {
            return Err(VamanaError::InvalidParameter(format!(
                "flat buffer length {} is not a multiple of dimension {}",
                data.len(),
                dimension
            )));
        }
        Ok(Self { data, dimension })
    }

    /// Checked vector lookup. Fails with `OutOfRange` if `id >= N`.
    pub fn get(&self, id: u32) -> Result<&[f32]> {
        let idx = id as usize;
        if idx >= self.len() {
            return Err(VamanaError::OutOfRange {
                id,
                len: self.len(),
            });
        }
        Ok(self.vector(id))
    }

    /// Unchecked vector lookup for interior loops where ids are known valid.
    #[inline]
    #[must_use]
    pub(crate) fn vector(&self, id: u32) -> &[f32] {
        let start = id as usize * self.dimension;
        &self.data[start..start + self.dimension]
    }

    /// Dimension D shared by every vector.
    #[inline]
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of vectors N.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    /// Always false after construction; present for API completeness.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The full row-major buffer, used by persistence.
    #[inline]
    #[must_use]
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }
}
