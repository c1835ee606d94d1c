//! Robust neighbor pruning.
//!
//! # Algorithm
//!
//! Candidates are visited in ascending `(distance, id)` order. A candidate
//! `c` is selected unless some already-selected neighbor `s` satisfies
//!
//! ```text
//! distance(s, c) * alpha <= distance(point, c)
//! ```
//!
//! in which case `c` is dominated: an existing neighbor already covers its
//! direction at least as well (scaled by `alpha`). Selection stops at
//! `max_degree` neighbors. The loop is explicit and bounded,
//! O(|candidates| * max_degree) distance evaluations in the worst case.
//!
//! `alpha = 1.0` is the strict diversity rule; `alpha > 1.0` makes domination
//! harder to trigger and therefore keeps more (denser, higher-recall) edges.

use crate::distance::Metric;
use crate::graph::NeighborList;
use crate::search::Candidate;
use crate::store::VectorStore;

/// Select at most `max_degree` diverse neighbors for `point` from `pool`.
///
/// Pool entries must carry the distance from `point` to their id. The pool is
/// sorted and deduplicated in place; `point` itself and duplicate ids are
/// ignored. The returned list preserves selection (ascending distance) order.
pub fn robust_prune(
    point: u32,
    pool: &mut Vec<Candidate>,
    alpha: f32,
    max_degree: usize,
    store: &VectorStore,
    metric: Metric,
) -> NeighborList {
    pool.sort_unstable();
    pool.dedup_by_key(|c| c.id);

    let mut selected = NeighborList::new();
    for cand in pool.iter() {
        if selected.len() >= max_degree {
            break;
        }
        if cand.id == point {
            continue;
        }
        let dominated = selected.iter().any(|&s| {
            metric.distance(store.vector(s), store.vector(cand.id)) * alpha <= cand.dist
        });
        if !dominated {
            selected.push(cand.id);
        }
    }
    selected
}
