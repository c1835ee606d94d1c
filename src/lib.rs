//! vamana: in-memory graph index for approximate nearest neighbor search.
//!
//! Implements the Vamana construction algorithm from the DiskANN paper:
//! a flat directed graph with bounded out-degree, built by repeated greedy
//! search and alpha-pruning, searched with a greedy beam from a fixed
//! entry point (the dataset medoid).
//!
//! # Usage
//!
//! ```
//! use vamana::{BuildParams, Metric, VamanaIndex};
//!
//! let vectors = vec![
//!     vec![0.0, 0.0],
//!     vec![1.0, 0.0],
//!     vec![0.0, 1.0],
//!     vec![10.0, 10.0],
//! ];
//! let params = BuildParams {
//!     max_degree: 2,
//!     search_list_size: 4,
//!     num_threads: 1,
//!     seed: Some(42),
//!     ..BuildParams::default()
//! };
//! let index = VamanaIndex::build(&vectors, Metric::L2, &params)?;
//!
//! let hits = index.search(&[0.1, 0.1], 1, 4)?;
//! assert_eq!(hits[0].0, 0);
//!
//! let bytes = index.to_bytes()?;
//! let restored = VamanaIndex::from_bytes(&bytes)?;
//! assert_eq!(restored.search(&[0.1, 0.1], 1, 4)?, hits);
//! # Ok::<(), vamana::VamanaError>(())
//! ```
//!
//! # Trade-offs
//!
//! Construction quality is governed by three knobs: `max_degree` (R) bounds
//! memory and fan-out, `search_list_size` (L) bounds how much of the graph
//! each insertion inspects, and `alpha` trades edge count for long-range
//! connectivity. Search takes its own beam width per query, so one built
//! graph serves both fast low-recall and slow high-recall callers.
//!
//! # References
//!
//! - Jayaram Subramanya et al. (2019): "DiskANN: Fast Accurate Billion-point
//!   Nearest Neighbor Search on a Single Node"

pub mod builder;
pub mod distance;
pub mod error;
pub mod graph;
pub mod index;
pub mod persistence;
pub mod prune;
pub mod search;
pub mod store;
pub mod visited;

pub use builder::BuildParams;
pub use distance::Metric;
pub use error::{Result, VamanaError};
pub use graph::Graph;
pub use index::{IndexStats, VamanaIndex};
pub use search::Candidate;
pub use store::VectorStore;
