//! Exact k-nearest-neighbor search with buffer k-d trees.
//!
//! A [`BufferKdTree`] answers a large batch of queries at once. Instead of walking the tree for one query at a time, every query carries a resumable
//! [`TraversalState`](search::TraversalState); queries that reach the same leaf are collected in that leaf's buffer, and full buffers are compared against
//! the leaf's patterns in one batch. This keeps a [`ComputeBackend`] busy with large, regular chunks of brute-force work while the tree still prunes
//! almost all of the training set. Training sets that do not fit into the backend's working memory are processed in chunks.
//!
//! ## Modules
//!
//! - [`search`]: The buffered engine and two single-query reference searches, [`KnnLinear`](search::KnnLinear) and
//!   [`KnnRecursive`](search::KnnRecursive).
//! - [`backend`]: The compute backend contract and the rayon-based [`CpuBackend`].
//! - [`memory`]: Planning of training chunks, leaf buffers and query sessions.
//! - [`utils`]: Selection, the top-k list and the ring buffer.

pub mod backend;
mod error;
mod index;
pub mod memory;
mod params;
pub mod search;
mod tree;
pub mod utils;

pub use backend::{ComputeBackend, CpuBackend, WorkingMemory};
pub use error::{Error, Result};
pub use index::BufferKdTree;
pub use params::{
    MAX_BATCH_FACTOR, MAX_LEAF_BUFFER_CAPACITY, MAX_NEIGHBORS, MAX_THREADS, MAX_TREE_DEPTH, MIN_TREE_DEPTH, Parameters, SplittingPolicy, check_k,
};
pub use search::{Neighbors, QueryStats};
pub use tree::{KdTree, Leaf, Node, Pattern, PatternStore, effective_depth};
pub use utils::FloatValue;
