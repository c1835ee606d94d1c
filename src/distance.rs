//! Distance metrics for dense vectors.
//!
//! A single, shared definition of the dense metrics the index supports. All
//! kernels are pure functions over read-only slices and are safe to call
//! concurrently without synchronization.
//!
//! ## Important nuance
//!
//! [`Metric::L2`] is **squared** Euclidean distance. Squaring preserves the
//! ordering of neighbors while skipping the square root in the hot loop, so
//! every ranking produced by the index is identical to true-L2 ranking. Callers
//! that need metric distances can take the root of returned values themselves.

use serde::{Deserialize, Serialize};

/// Distance metric for dense vectors.
///
/// The metric is fixed at build time, carried by the index, and persisted with
/// it, so a loaded index always ranks with the metric it was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Squared Euclidean (L2) distance.
    L2,
    /// Inner product distance $-\langle a,b\rangle$ (for maximum inner product search).
    InnerProduct,
    /// Cosine distance $1 - \cos(a,b)$.
    Cosine,
}

impl Metric {
    /// Compute distance between two vectors.
    ///
    /// If dimensions mismatch, this returns `f32::INFINITY` (so it is never
    /// selected as a nearest neighbor). The index validates dimensions at its
    /// public boundary, so internal traversal never hits that path.
    #[inline]
    #[must_use]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::L2 => l2_distance_squared(a, b),
            Metric::InnerProduct => inner_product_distance(a, b),
            Metric::Cosine => cosine_distance(a, b),
        }
    }

    /// Stable single-byte tag used by the persistence format.
    #[must_use]
    pub(crate) fn tag(self) -> u8 {
        match self {
            Metric::L2 => 0,
            Metric::InnerProduct => 1,
            Metric::Cosine => 2,
        }
    }

    /// Inverse of [`Metric::tag`]. `None` for unknown tags.
    #[must_use]
    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Metric::L2),
            1 => Some(Metric::InnerProduct),
            2 => Some(Metric::Cosine),
            _ => None,
        }
    }
}

/// Squared L2 (Euclidean) distance.
#[inline]
#[must_use]
pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Inner product distance (negative dot product).
#[inline]
#[must_use]
pub fn inner_product_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    -dot(a, b)
}

/// Cosine distance $1 - \cos(a,b)$.
///
/// This computes cosine similarity (including norms), so it does **not**
/// require pre-normalized vectors. If either vector has zero norm the distance
/// is defined as `1.0`.
#[inline]
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a < 1e-10 || norm_b < 1e-10 {
        return 1.0;
    }
    1.0 - (dot(a, b) / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Normalize a vector to unit L2 norm.
#[inline]
#[must_use]
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let n = dot(v, v).sqrt();
    if n < 1e-10 {
        return vec![0.0; v.len()];
    }
    v.iter().map(|x| x / n).collect()
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
