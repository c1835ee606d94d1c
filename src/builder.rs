//! Parallel Vamana graph construction.
//!
//! # Algorithm
//!
//! 1. Give every point a small random neighbor list so the first pass has a
//!    connected structure to walk.
//! 2. Pick the entry point: the point nearest the dataset centroid.
//! 3. For `num_passes` rounds, visit all points in a fresh random order. For
//!    each point `p`, greedy-search from the entry point toward `p`, pool the
//!    expanded points with `p`'s current neighbors, and robust-prune the pool
//!    into `p`'s new list. Every edge newly added to `p` is mirrored: `p` is
//!    offered to each new neighbor `q`, re-pruning `q`'s list if it would
//!    exceed the degree bound.
//!
//! All passes before the last run with `alpha = 1.0`; the final pass applies
//! the configured alpha. Workers mutate disjoint points under per-point
//! locks and never hold two locks at once. Neighbor lists read during a
//! search may be a stale snapshot of another worker's point; that only
//! shifts which candidates are found, not the validity of the result.
//!
//! # References
//!
//! Subramanya et al., "DiskANN: Fast Accurate Billion-point Nearest Neighbor
//! Search on a Single Node", NeurIPS 2019.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::distance::Metric;
use crate::error::{Result, VamanaError};
use crate::graph::{Graph, LockedGraph, NeighborList};
use crate::prune::robust_prune;
use crate::search::{greedy_search, Candidate, SearchBuffers};
use crate::store::VectorStore;

/// Construction parameters.
///
/// `max_degree` is the R bound on every neighbor list; `search_list_size` is
/// the beam width L used while hunting for candidate neighbors (L ≥ R);
/// `alpha` relaxes the pruning rule (≥ 1.0). `seed` makes the random
/// initialization and visit orders reproducible; combined with
/// `num_threads = 1` the whole build is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildParams {
    pub max_degree: usize,
    pub search_list_size: usize,
    pub alpha: f32,
    pub num_passes: usize,
    pub num_threads: usize,
    pub seed: Option<u64>,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            max_degree: 64,
            search_list_size: 128,
            alpha: 1.2,
            num_passes: 2,
            num_threads: default_threads(),
            seed: None,
        }
    }
}

impl BuildParams {
    /// Lower-quality, faster construction.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            max_degree: 32,
            search_list_size: 64,
            num_passes: 1,
            ..Self::default()
        }
    }

    /// Higher-recall construction; roughly 2-3x the build cost of the default.
    #[must_use]
    pub fn high_quality() -> Self {
        Self {
            max_degree: 96,
            search_list_size: 192,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_degree < 1 {
            return Err(VamanaError::InvalidParameter(
                "max_degree (R) must be at least 1".to_string(),
            ));
        }
        if self.search_list_size < self.max_degree {
            return Err(VamanaError::InvalidParameter(format!(
                "search_list_size (L = {}) must be at least max_degree (R = {})",
                self.search_list_size, self.max_degree
            )));
        }
        if self.alpha.is_nan() || self.alpha < 1.0 {
            return Err(VamanaError::InvalidParameter(format!(
                "alpha must be at least 1.0, got {}",
                self.alpha
            )));
        }
        if self.num_passes < 1 {
            return Err(VamanaError::InvalidParameter(
                "num_passes must be at least 1".to_string(),
            ));
        }
        if self.num_threads < 1 {
            return Err(VamanaError::InvalidParameter(
                "num_threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Build the proximity graph. Returns the frozen graph and the entry point.
pub(crate) fn build_graph(
    store: &VectorStore,
    metric: Metric,
    params: &BuildParams,
) -> Result<(Graph, u32)> {
    params.validate()?;
    let n = store.len();
    let started = Instant::now();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(params.num_threads)
        .build()
        .map_err(|e| VamanaError::Other(format!("thread pool construction failed: {e}")))?;

    let mut rng: Box<dyn RngCore> = match params.seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
        None => Box::new(rand::rng()),
    };

    let graph = LockedGraph::new(n, params.max_degree);
    initialize_random_edges(&graph, params.max_degree, &mut rng);

    let entry = pool.install(|| find_medoid(store, metric));
    debug!(entry, "selected entry point");

    let mut order: Vec<u32> = (0..n as u32).collect();
    for pass in 0..params.num_passes {
        let alpha = if pass + 1 == params.num_passes {
            params.alpha
        } else {
            1.0
        };
        order.shuffle(&mut rng);
        pool.install(|| refine_pass(&graph, store, metric, entry, alpha, params, &order));
        debug!(pass, alpha, "refinement pass complete");
    }

    let graph = graph.freeze();
    info!(
        points = n,
        dimension = store.dimension(),
        edges = graph.edge_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "graph built"
    );
    Ok((graph, entry))
}

/// Seed every point with random distinct neighbors (no self-loops).
///
/// Short lists are tolerable here; the refinement passes rebuild every list.
fn initialize_random_edges(graph: &LockedGraph, max_degree: usize, rng: &mut dyn RngCore) {
    let n = graph.len();
    let target = (max_degree / 2).max(2).min(n.saturating_sub(1));
    if target == 0 {
        return;
    }
    for id in 0..n as u32 {
        let mut list = NeighborList::new();
        let mut attempts = 0;
        while list.len() < target && attempts < target * 8 {
            attempts += 1;
            let cand = rng.random_range(0..n) as u32;
            if cand != id && !list.contains(&cand) {
                list.push(cand);
            }
        }
        graph.set_neighbors(id, list);
    }
}

/// The point nearest the dataset centroid, ties toward the smaller id.
fn find_medoid(store: &VectorStore, metric: Metric) -> u32 {
    let n = store.len();
    let dim = store.dimension();

    let sums = (0..n as u32)
        .into_par_iter()
        .fold(
            || vec![0.0f64; dim],
            |mut acc, id| {
                for (a, &x) in acc.iter_mut().zip(store.vector(id)) {
                    *a += f64::from(x);
                }
                acc
            },
        )
        .reduce(
            || vec![0.0f64; dim],
            |mut a, b| {
                for (x, y) in a.iter_mut().zip(b) {
                    *x += y;
                }
                a
            },
        );
    let centroid: Vec<f32> = sums.iter().map(|&s| (s / n as f64) as f32).collect();

    (0..n as u32)
        .into_par_iter()
        .map(|id| Candidate::new(id, metric.distance(&centroid, store.vector(id))))
        .min()
        .map(|c| c.id)
        .unwrap_or(0)
}

/// One refinement pass over all points in the given order.
fn refine_pass(
    graph: &LockedGraph,
    store: &VectorStore,
    metric: Metric,
    entry: u32,
    alpha: f32,
    params: &BuildParams,
    order: &[u32],
) {
    order.par_iter().for_each_init(
        || (SearchBuffers::new(store.len()), Vec::<Candidate>::new()),
        |(buffers, pool), &p| {
            let outcome = greedy_search(
                graph,
                store,
                metric,
                store.vector(p),
                entry,
                params.search_list_size,
                buffers,
            );

            let current = graph.snapshot(p);
            pool.clear();
            pool.extend_from_slice(&outcome.expanded);
            let pv = store.vector(p);
            for &q in current.iter() {
                pool.push(Candidate::new(q, metric.distance(pv, store.vector(q))));
            }

            let new_list = robust_prune(p, pool, alpha, params.max_degree, store, metric);
            let added: Vec<u32> = new_list
                .iter()
                .copied()
                .filter(|q| !current.contains(q))
                .collect();
            graph.set_neighbors(p, new_list);

            for q in added {
                insert_backedge(graph, store, metric, q, p, alpha, params.max_degree, pool);
            }
        },
    );
}

/// Offer the reverse edge `q -> p`, re-pruning `q`'s list on overflow.
///
/// Runs entirely under `q`'s write lock; the prune touches only vector data,
/// so no second list lock is ever taken.
#[allow(clippy::too_many_arguments)]
fn insert_backedge(
    graph: &LockedGraph,
    store: &VectorStore,
    metric: Metric,
    q: u32,
    p: u32,
    alpha: f32,
    max_degree: usize,
    pool: &mut Vec<Candidate>,
) {
    graph.update(q, |list| {
        if list.contains(&p) {
            return;
        }
        if list.len() < max_degree {
            list.push(p);
            return;
        }
        let qv = store.vector(q);
        pool.clear();
        for &x in list.iter() {
            pool.push(Candidate::new(x, metric.distance(qv, store.vector(x))));
        }
        pool.push(Candidate::new(p, metric.distance(qv, store.vector(p))));
        *list = robust_prune(q, pool, alpha, max_degree, store, metric);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deterministic_vectors(n: usize, dim: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| {
                (0..dim)
                    .map(|d| (((i * 31 + d * 17) % 97) as f32) * 0.1)
                    .collect()
            })
            .collect()
    }

    fn tiny_params() -> BuildParams {
        BuildParams {
            max_degree: 4,
            search_list_size: 8,
            alpha: 1.2,
            num_passes: 2,
            num_threads: 1,
            seed: Some(7),
        }
    }

    #[test]
    fn default_params_are_valid() {
        assert!(BuildParams::default().validate().is_ok());
        assert!(BuildParams::fast().validate().is_ok());
        assert!(BuildParams::high_quality().validate().is_ok());
    }

    #[test]
    fn rejects_bad_parameters() {
        let base = tiny_params();

        let p = BuildParams {
            max_degree: 0,
            ..base.clone()
        };
        assert!(matches!(
            p.validate(),
            Err(VamanaError::InvalidParameter(_))
        ));

        let p = BuildParams {
            search_list_size: 3,
            ..base.clone()
        };
        assert!(matches!(
            p.validate(),
            Err(VamanaError::InvalidParameter(_))
        ));

        let p = BuildParams {
            alpha: 0.9,
            ..base.clone()
        };
        assert!(matches!(
            p.validate(),
            Err(VamanaError::InvalidParameter(_))
        ));

        let p = BuildParams {
            alpha: f32::NAN,
            ..base.clone()
        };
        assert!(matches!(
            p.validate(),
            Err(VamanaError::InvalidParameter(_))
        ));

        let p = BuildParams {
            num_passes: 0,
            ..base.clone()
        };
        assert!(matches!(
            p.validate(),
            Err(VamanaError::InvalidParameter(_))
        ));

        let p = BuildParams {
            num_threads: 0,
            ..base
        };
        assert!(matches!(
            p.validate(),
            Err(VamanaError::InvalidParameter(_))
        ));
    }

    #[test]
    fn build_upholds_graph_invariants() {
        let vectors = deterministic_vectors(40, 4);
        let store = VectorStore::load(&vectors).unwrap();
        let params = tiny_params();
        let (graph, entry) = build_graph(&store, Metric::L2, &params).unwrap();

        assert_eq!(graph.len(), 40);
        assert!((entry as usize) < 40);
        for id in 0..40u32 {
            let neighbors = graph.neighbors(id).unwrap();
            assert!(neighbors.len() <= params.max_degree);
            assert!(!neighbors.contains(&id), "self-loop at {id}");
            let mut sorted = neighbors.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), neighbors.len(), "duplicate edge at {id}");
            for &q in neighbors {
                assert!((q as usize) < 40);
            }
        }
    }

    #[test]
    fn single_point_builds() {
        let store = VectorStore::load(&[vec![1.0, 2.0, 3.0]]).unwrap();
        let (graph, entry) = build_graph(&store, Metric::L2, &tiny_params()).unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(entry, 0);
        assert!(graph.neighbors(0).unwrap().is_empty());
    }

    #[test]
    fn seeded_single_threaded_build_is_reproducible() {
        let vectors = deterministic_vectors(30, 3);
        let store = VectorStore::load(&vectors).unwrap();
        let params = tiny_params();

        let (a, entry_a) = build_graph(&store, Metric::L2, &params).unwrap();
        let (b, entry_b) = build_graph(&store, Metric::L2, &params).unwrap();

        assert_eq!(entry_a, entry_b);
        for id in 0..30u32 {
            assert_eq!(a.neighbors(id), b.neighbors(id), "divergence at {id}");
        }
    }

    #[test]
    fn multi_threaded_build_upholds_invariants() {
        let vectors = deterministic_vectors(60, 4);
        let store = VectorStore::load(&vectors).unwrap();
        let params = BuildParams {
            num_threads: 4,
            seed: None,
            ..tiny_params()
        };
        let (graph, _) = build_graph(&store, Metric::L2, &params).unwrap();
        for id in 0..60u32 {
            let neighbors = graph.neighbors(id).unwrap();
            assert!(neighbors.len() <= params.max_degree);
            assert!(!neighbors.contains(&id));
        }
    }
}
