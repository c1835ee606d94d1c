//! Generation-based visited set for graph traversal.
//!
//! Greedy search touches a few thousand points per call out of a dataset that
//! may hold millions, so a `HashSet<u32>` per search is measurable overhead.
//! This set replaces hashing with O(1) array indexing: each `clear()` bumps a
//! generation counter instead of zeroing the array, and a slot counts as
//! visited only when it holds the current generation.

/// Per-search set of already-seen point ids.
///
/// Uses a u16 generation so a full memset happens only every 65534 clears.
#[derive(Debug)]
pub struct VisitedSet {
    slots: Vec<u16>,
    generation: u16,
}

impl VisitedSet {
    /// Create a set covering ids `0..capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![0u16; capacity],
            generation: 1,
        }
    }

    /// Reset the set. O(1) amortized; a full memset only on generation wrap.
    pub fn clear(&mut self) {
        if self.generation == u16::MAX {
            self.slots.fill(0);
            self.generation = 1;
        } else {
            self.generation += 1;
        }
    }

    /// Grow to cover at least `capacity` ids.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        if capacity > self.slots.len() {
            self.slots.resize(capacity, 0);
        }
    }

    /// Mark `id` as seen. Returns `true` if it was not seen before this call.
    #[inline]
    pub fn insert(&mut self, id: u32) -> bool {
        let slot = &mut self.slots[id as usize];
        if *slot == self.generation {
            false
        } else {
            *slot = self.generation;
            true
        }
    }
}

impl Default for VisitedSet {
    fn default() -> Self {
        Self::new(0)
    }
}
