//! In-memory Vamana index.
//!
//! Ties the pieces together: a [`VectorStore`] for the raw vectors, a
//! frozen [`Graph`] produced by the builder, and greedy beam search over
//! both. Queries run lock-free against immutable state, so a built index
//! is cheap to share across threads.
//!
//! # References
//!
//! - Jayaram Subramanya et al. (2019): "DiskANN: Fast Accurate Billion-point
//!   Nearest Neighbor Search on a Single Node"

use std::cell::RefCell;
use std::io::{Read, Write};
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::builder::{build_graph, BuildParams};
use crate::distance::Metric;
use crate::error::{Result, VamanaError};
use crate::graph::Graph;
use crate::persistence;
use crate::search::{greedy_search, SearchBuffers};
use crate::store::VectorStore;

thread_local! {
    /// Reusable per-thread search scratch. Avoids reallocating the visited
    /// set and neighbor buffer on every query.
    static SEARCH_BUFFERS: RefCell<SearchBuffers> = RefCell::new(SearchBuffers::default());
}

/// Graph-based approximate nearest neighbor index.
///
/// Built once over a fixed set of vectors with the Vamana algorithm:
/// 1. Random graph initialization
/// 2. Medoid selection as the search entry point
/// 3. Refinement passes of greedy search plus alpha-pruning
///
/// After construction the index is immutable. Searches walk the graph from
/// the entry point with a beam of configurable width and return the k
/// closest ids with their distances.
#[derive(Debug)]
pub struct VamanaIndex {
    store: VectorStore,
    graph: Graph,
    metric: Metric,
    entry_point: u32,
}

/// Summary statistics for a built index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub num_vectors: usize,
    pub dimension: usize,
    pub max_degree: usize,
    pub avg_degree: f32,
    pub entry_point: u32,
    pub metric: Metric,
    pub size_bytes: usize,
}

impl VamanaIndex {
    /// Build an index over a set of vectors.
    ///
    /// All vectors must share one dimension. Returns
    /// [`VamanaError::EmptyDataset`] for an empty slice and
    /// [`VamanaError::DimensionMismatch`] for ragged input.
    pub fn build(vectors: &[Vec<f32>], metric: Metric, params: &BuildParams) -> Result<Self> {
        let store = VectorStore::load(vectors)?;
        Self::from_store(store, metric, params)
    }

    /// Build an index over vectors already laid out as one flat buffer of
    /// `dimension`-sized rows.
    pub fn build_from_flat(
        data: Vec<f32>,
        dimension: usize,
        metric: Metric,
        params: &BuildParams,
    ) -> Result<Self> {
        let store = VectorStore::from_flat(data, dimension)?;
        Self::from_store(store, metric, params)
    }

    fn from_store(store: VectorStore, metric: Metric, params: &BuildParams) -> Result<Self> {
        let (graph, entry_point) = build_graph(&store, metric, params)?;
        Ok(Self {
            store,
            graph,
            metric,
            entry_point,
        })
    }

    /// Search for the k nearest neighbors of `query`.
    ///
    /// `list_size` is the beam width (L). Larger values explore more of the
    /// graph and improve recall at the cost of latency; it must be at least
    /// `k`. Results are sorted by ascending distance, ties broken by
    /// ascending id.
    pub fn search(&self, query: &[f32], k: usize, list_size: usize) -> Result<Vec<(u32, f32)>> {
        if k < 1 {
            return Err(VamanaError::InvalidParameter(
                "k must be at least 1".to_string(),
            ));
        }
        if list_size < k {
            return Err(VamanaError::InvalidParameter(format!(
                "search list size (L = {list_size}) must be at least k ({k})"
            )));
        }
        if k > self.store.len() {
            return Err(VamanaError::InvalidParameter(format!(
                "k ({k}) exceeds the number of indexed points ({})",
                self.store.len()
            )));
        }
        if query.len() != self.store.dimension() {
            return Err(VamanaError::DimensionMismatch {
                expected: self.store.dimension(),
                actual: query.len(),
            });
        }

        let results = SEARCH_BUFFERS.with(|buffers| {
            let mut buffers = buffers.borrow_mut();
            let outcome = greedy_search(
                &self.graph,
                &self.store,
                self.metric,
                query,
                self.entry_point,
                list_size,
                &mut buffers,
            );
            let mut candidates = outcome.candidates;
            candidates.truncate(k);
            candidates.into_iter().map(|c| (c.id, c.dist)).collect()
        });
        Ok(results)
    }

    /// Search for the k nearest neighbors of every query in a batch.
    ///
    /// Queries run in parallel on the global thread pool. Each result is
    /// identical to a [`VamanaIndex::search`] call with the same arguments.
    pub fn search_batch(
        &self,
        queries: &[Vec<f32>],
        k: usize,
        list_size: usize,
    ) -> Result<Vec<Vec<(u32, f32)>>> {
        queries
            .par_iter()
            .map(|query| self.search(query, k, list_size))
            .collect()
    }

    /// Out-neighbors of a point in the built graph.
    pub fn neighbors(&self, id: u32) -> Result<&[u32]> {
        self.graph.neighbors(id).ok_or(VamanaError::OutOfRange {
            id,
            len: self.store.len(),
        })
    }

    /// The vector stored for `id`.
    pub fn vector(&self, id: u32) -> Result<&[f32]> {
        self.store.get(id)
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the index holds no vectors. Always false for a built index.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Vector dimension.
    pub fn dimension(&self) -> usize {
        self.store.dimension()
    }

    /// Distance metric the index was built with.
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Entry point (medoid) all searches start from.
    pub fn entry_point(&self) -> u32 {
        self.entry_point
    }

    /// Degree bound (R) the graph was built with.
    pub fn max_degree(&self) -> usize {
        self.graph.max_degree()
    }

    /// Approximate index size in bytes (vectors plus adjacency lists).
    pub fn size_bytes(&self) -> usize {
        self.store.as_flat().len() * std::mem::size_of::<f32>() + self.graph.size_bytes()
    }

    /// Summary statistics for the index.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            num_vectors: self.store.len(),
            dimension: self.store.dimension(),
            max_degree: self.graph.max_degree(),
            avg_degree: self.graph.edge_count() as f32 / self.store.len() as f32,
            entry_point: self.entry_point,
            metric: self.metric,
            size_bytes: self.size_bytes(),
        }
    }

    /// Serialize the index into a byte buffer.
    ///
    /// The buffer round-trips through [`VamanaIndex::from_bytes`] to an
    /// index that answers every query identically to this one.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        persistence::to_vec(&self.store, &self.graph, self.metric, self.entry_point)
    }

    /// Deserialize an index from a byte slice produced by
    /// [`VamanaIndex::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (store, graph, metric, entry_point) = persistence::from_slice(bytes)?;
        Ok(Self {
            store,
            graph,
            metric,
            entry_point,
        })
    }

    /// Serialize the index to a writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        persistence::write_to(writer, &self.store, &self.graph, self.metric, self.entry_point)
    }

    /// Deserialize an index from a reader.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let (store, graph, metric, entry_point) = persistence::read_from(reader)?;
        Ok(Self {
            store,
            graph,
            metric,
            entry_point,
        })
    }

    /// Serialize the index to a file, creating or truncating it.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_file(path, &self.store, &self.graph, self.metric, self.entry_point)
    }

    /// Deserialize an index from a file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (store, graph, metric, entry_point) = persistence::load_file(path)?;
        Ok(Self {
            store,
            graph,
            metric,
            entry_point,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corner_params() -> BuildParams {
        BuildParams {
            max_degree: 2,
            search_list_size: 4,
            alpha: 1.0,
            num_threads: 1,
            seed: Some(42),
            ..BuildParams::default()
        }
    }

    fn corner_points() -> Vec<Vec<f32>> {
        vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![10.0, 10.0],
        ]
    }

    #[test]
    fn four_point_index_finds_the_nearest_corner() {
        let index = VamanaIndex::build(&corner_points(), Metric::L2, &corner_params()).unwrap();

        let near_origin = index.search(&[0.1, 0.1], 1, 4).unwrap();
        assert_eq!(near_origin[0].0, 0);

        let near_far_corner = index.search(&[9.0, 9.0], 1, 4).unwrap();
        assert_eq!(near_far_corner[0].0, 3);
    }

    #[test]
    fn k_equal_to_n_returns_everything_sorted() {
        let index = VamanaIndex::build(&corner_points(), Metric::L2, &corner_params()).unwrap();
        let results = index.search(&[0.0, 0.0], 4, 8).unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].0, 0);
        for pair in results.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
    }

    #[test]
    fn rejects_invalid_search_parameters() {
        let index = VamanaIndex::build(&corner_points(), Metric::L2, &corner_params()).unwrap();

        assert!(matches!(
            index.search(&[0.0, 0.0], 0, 4),
            Err(VamanaError::InvalidParameter(_))
        ));
        assert!(matches!(
            index.search(&[0.0, 0.0], 3, 2),
            Err(VamanaError::InvalidParameter(_))
        ));
        assert!(matches!(
            index.search(&[0.0, 0.0], 5, 8),
            Err(VamanaError::InvalidParameter(_))
        ));
        assert!(matches!(
            index.search(&[0.0, 0.0, 0.0], 1, 4),
            Err(VamanaError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let err = VamanaIndex::build(&[], Metric::L2, &BuildParams::default()).unwrap_err();
        assert!(matches!(err, VamanaError::EmptyDataset));
    }

    #[test]
    fn single_point_index_searches() {
        let index =
            VamanaIndex::build(&[vec![3.0, 4.0]], Metric::L2, &corner_params()).unwrap();
        let results = index.search(&[0.0, 0.0], 1, 4).unwrap();
        assert_eq!(results, vec![(0, 25.0)]);
    }

    #[test]
    fn flat_build_matches_nested_build() {
        let nested = corner_points();
        let flat: Vec<f32> = nested.iter().flatten().copied().collect();

        let a = VamanaIndex::build(&nested, Metric::L2, &corner_params()).unwrap();
        let b = VamanaIndex::build_from_flat(flat, 2, Metric::L2, &corner_params()).unwrap();

        assert_eq!(
            a.search(&[0.2, 0.3], 4, 8).unwrap(),
            b.search(&[0.2, 0.3], 4, 8).unwrap()
        );
    }

    #[test]
    fn batch_search_matches_single_queries() {
        let vectors: Vec<Vec<f32>> = (0..50)
            .map(|i| vec![(i % 10) as f32, (i / 10) as f32])
            .collect();
        let params = BuildParams {
            max_degree: 8,
            search_list_size: 16,
            num_threads: 1,
            seed: Some(7),
            ..BuildParams::default()
        };
        let index = VamanaIndex::build(&vectors, Metric::L2, &params).unwrap();

        let queries: Vec<Vec<f32>> = vec![vec![0.5, 0.5], vec![9.0, 4.0], vec![3.3, 2.1]];
        let batch = index.search_batch(&queries, 5, 16).unwrap();

        for (query, batch_result) in queries.iter().zip(&batch) {
            assert_eq!(*batch_result, index.search(query, 5, 16).unwrap());
        }
    }

    #[test]
    fn batch_search_propagates_errors() {
        let index = VamanaIndex::build(&corner_points(), Metric::L2, &corner_params()).unwrap();
        let queries = vec![vec![0.0, 0.0], vec![1.0, 2.0, 3.0]];
        assert!(index.search_batch(&queries, 1, 4).is_err());
    }

    #[test]
    fn stats_reflect_the_graph() {
        let index = VamanaIndex::build(&corner_points(), Metric::L2, &corner_params()).unwrap();
        let stats = index.stats();

        assert_eq!(stats.num_vectors, 4);
        assert_eq!(stats.dimension, 2);
        assert_eq!(stats.max_degree, 2);
        assert_eq!(stats.entry_point, index.entry_point());
        assert_eq!(stats.metric, Metric::L2);
        assert!(stats.avg_degree > 0.0 && stats.avg_degree <= 2.0);
        assert!(stats.size_bytes >= 8 * std::mem::size_of::<f32>());

        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"num_vectors\":4"));
    }

    #[test]
    fn neighbors_rejects_out_of_range_ids() {
        let index = VamanaIndex::build(&corner_points(), Metric::L2, &corner_params()).unwrap();
        assert!(index.neighbors(2).is_ok());
        assert!(matches!(
            index.neighbors(4),
            Err(VamanaError::OutOfRange { id: 4, len: 4 })
        ));
    }

    #[test]
    fn byte_round_trip_answers_identically() {
        let vectors: Vec<Vec<f32>> = (0..40)
            .map(|i| vec![(i as f32).sin(), (i as f32).cos(), i as f32 / 40.0])
            .collect();
        let params = BuildParams {
            max_degree: 6,
            search_list_size: 12,
            num_threads: 1,
            seed: Some(11),
            ..BuildParams::default()
        };
        let index = VamanaIndex::build(&vectors, Metric::L2, &params).unwrap();

        let bytes = index.to_bytes().unwrap();
        let restored = VamanaIndex::from_bytes(&bytes).unwrap();

        assert_eq!(restored.len(), index.len());
        assert_eq!(restored.dimension(), index.dimension());
        assert_eq!(restored.metric(), index.metric());
        assert_eq!(restored.entry_point(), index.entry_point());

        for query in [[0.1, 0.9, 0.2], [-0.5, 0.5, 0.7], [0.0, 0.0, 1.0]] {
            assert_eq!(
                restored.search(&query, 5, 12).unwrap(),
                index.search(&query, 5, 12).unwrap()
            );
        }
    }
}
