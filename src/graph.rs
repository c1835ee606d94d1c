//! Graph storage: one bounded adjacency list per point.
//!
//! The graph exists in two forms. During construction each list sits behind
//! its own `parking_lot::RwLock` so worker threads can rewrite different
//! points concurrently; a reader may observe a neighbor list from slightly
//! before or after another worker's update, which the construction algorithm
//! tolerates (stale edges cost recall, never correctness). Once construction
//! finishes the locks are stripped and searches run over plain slices.

use parking_lot::RwLock;
use smallvec::SmallVec;

/// Adjacency list type. Degrees up to 32 stay inline; larger `R` spills.
pub(crate) type NeighborList = SmallVec<[u32; 32]>;

/// Read access to per-point neighbor lists during greedy search.
///
/// Implemented by both graph forms so a single search routine serves the
/// build phase and the query phase.
pub(crate) trait NeighborSource {
    /// Copy `id`'s current neighbor list into `out`, replacing its contents.
    fn copy_neighbors(&self, id: u32, out: &mut Vec<u32>);
}

/// Finished, read-only proximity graph.
///
/// Invariants (established by the builder and re-checked when loading a
/// persisted index): every list has length ≤ `max_degree`, contains no
/// self-loops, and contains no duplicate ids.
#[derive(Debug, Clone)]
pub struct Graph {
    lists: Vec<NeighborList>,
    max_degree: usize,
}

impl Graph {
    pub(crate) fn new(lists: Vec<NeighborList>, max_degree: usize) -> Self {
        Self { lists, max_degree }
    }

    /// Number of points.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// The degree bound R the graph was built (or loaded) with.
    #[inline]
    #[must_use]
    pub fn max_degree(&self) -> usize {
        self.max_degree
    }

    /// Neighbor ids of `id`, or `None` if `id` is out of range.
    #[must_use]
    pub fn neighbors(&self, id: u32) -> Option<&[u32]> {
        self.lists.get(id as usize).map(|list| list.as_slice())
    }

    /// Total out-degree across all points.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.lists.iter().map(|list| list.len()).sum()
    }

    /// Approximate heap footprint of the adjacency lists.
    pub(crate) fn size_bytes(&self) -> usize {
        let inline = self.lists.len() * std::mem::size_of::<NeighborList>();
        let spilled: usize = self
            .lists
            .iter()
            .filter(|list| list.spilled())
            .map(|list| list.capacity() * std::mem::size_of::<u32>())
            .sum();
        inline + spilled
    }

    pub(crate) fn lists(&self) -> &[NeighborList] {
        &self.lists
    }
}

impl NeighborSource for Graph {
    #[inline]
    fn copy_neighbors(&self, id: u32, out: &mut Vec<u32>) {
        out.clear();
        out.extend_from_slice(&self.lists[id as usize]);
    }
}

/// Construction-time graph with per-point write exclusivity.
pub(crate) struct LockedGraph {
    lists: Vec<RwLock<NeighborList>>,
    max_degree: usize,
}

impl LockedGraph {
    /// Create an edgeless graph over `n` points.
    pub(crate) fn new(n: usize, max_degree: usize) -> Self {
        let mut lists = Vec::with_capacity(n);
        lists.resize_with(n, || RwLock::new(NeighborList::new()));
        Self { lists, max_degree }
    }

    pub(crate) fn len(&self) -> usize {
        self.lists.len()
    }

    /// Snapshot `id`'s current list.
    pub(crate) fn snapshot(&self, id: u32) -> NeighborList {
        self.lists[id as usize].read().clone()
    }

    /// Replace `id`'s list.
    pub(crate) fn set_neighbors(&self, id: u32, list: NeighborList) {
        *self.lists[id as usize].write() = list;
    }

    /// Run `f` with exclusive access to `id`'s list.
    ///
    /// Callers must not take another point's lock inside `f`; the builder
    /// holds at most one list lock at a time.
    pub(crate) fn update<T>(&self, id: u32, f: impl FnOnce(&mut NeighborList) -> T) -> T {
        f(&mut self.lists[id as usize].write())
    }

    /// Strip the locks, yielding the read-only graph.
    pub(crate) fn freeze(self) -> Graph {
        let lists = self
            .lists
            .into_iter()
            .map(|list| list.into_inner())
            .collect();
        Graph::new(lists, self.max_degree)
    }
}

impl NeighborSource for LockedGraph {
    #[inline]
    fn copy_neighbors(&self, id: u32, out: &mut Vec<u32>) {
        out.clear();
        out.extend_from_slice(&self.lists[id as usize].read());
    }
}
