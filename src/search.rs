//! Greedy beam search over a proximity graph.
//!
//! # Algorithm
//!
//! Two priority queues drive the traversal: a min-heap frontier of candidates
//! not yet expanded, and a bounded max-heap holding the best `list_size`
//! candidates found so far. Each step pops the closest frontier entry, expands
//! its neighbor list, scores unseen neighbors against the query, and admits
//! them to both queues when they beat the current worst retained candidate.
//! The search stops when the closest unexpanded candidate can no longer enter
//! a full retained set, i.e. when no unexpanded candidate remains within it.
//!
//! Every comparison is over `(distance, id)`, so equal distances break ties
//! toward the smaller id and two searches with identical inputs return
//! identical ordered results.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::distance::Metric;
use crate::graph::NeighborSource;
use crate::store::VectorStore;
use crate::visited::VisitedSet;

/// A scored point: distance from the current query plus the point id.
///
/// The ordering is total (`total_cmp` over the distance, then the id), so
/// heaps and sorts over candidates are deterministic even with ties or
/// non-finite distances.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub id: u32,
    pub dist: f32,
}

impl Candidate {
    #[inline]
    #[must_use]
    pub fn new(id: u32, dist: f32) -> Self {
        Self { id, dist }
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Reusable per-thread scratch state for [`greedy_search`].
///
/// Allocating the visited slots once per thread instead of once per call
/// keeps query-time search allocation-free at steady state.
#[derive(Debug, Default)]
pub(crate) struct SearchBuffers {
    pub visited: VisitedSet,
    pub neighbors: Vec<u32>,
}

impl SearchBuffers {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            visited: VisitedSet::new(capacity),
            neighbors: Vec::new(),
        }
    }
}

/// Outcome of one greedy search call.
pub(crate) struct SearchOutcome {
    /// The final candidate list: at most `list_size` entries, ascending by
    /// `(distance, id)`, unique ids.
    pub candidates: Vec<Candidate>,
    /// Every point that was expanded, in expansion order. This is the
    /// candidate pool the builder prunes over.
    pub expanded: Vec<Candidate>,
}

/// Beam search from `entry` toward `query`.
///
/// `list_size` caps the retained candidate set (the beam width L). Points are
/// marked seen when first scored, so no point is scored or expanded twice and
/// the loop terminates after at most N expansions.
pub(crate) fn greedy_search<G: NeighborSource>(
    graph: &G,
    store: &VectorStore,
    metric: Metric,
    query: &[f32],
    entry: u32,
    list_size: usize,
    buffers: &mut SearchBuffers,
) -> SearchOutcome {
    buffers.visited.ensure_capacity(store.len());
    buffers.visited.clear();

    let mut frontier: BinaryHeap<Reverse<Candidate>> = BinaryHeap::new();
    let mut retained: BinaryHeap<Candidate> = BinaryHeap::with_capacity(list_size + 1);
    let mut expanded = Vec::new();

    let seed = Candidate::new(entry, metric.distance(query, store.vector(entry)));
    buffers.visited.insert(entry);
    frontier.push(Reverse(seed));
    retained.push(seed);

    while let Some(Reverse(current)) = frontier.pop() {
        if retained.len() >= list_size {
            if let Some(worst) = retained.peek() {
                // The closest unexpanded candidate was evicted from the
                // retained set, and so was everything behind it.
                if current > *worst {
                    break;
                }
            }
        }
        expanded.push(current);

        graph.copy_neighbors(current.id, &mut buffers.neighbors);
        for &neighbor in &buffers.neighbors {
            if !buffers.visited.insert(neighbor) {
                continue;
            }
            let cand = Candidate::new(neighbor, metric.distance(query, store.vector(neighbor)));
            if retained.len() < list_size {
                retained.push(cand);
                frontier.push(Reverse(cand));
            } else if let Some(worst) = retained.peek() {
                if cand < *worst {
                    retained.pop();
                    retained.push(cand);
                    frontier.push(Reverse(cand));
                }
            }
        }
    }

    SearchOutcome {
        candidates: retained.into_sorted_vec(),
        expanded,
    }
}
