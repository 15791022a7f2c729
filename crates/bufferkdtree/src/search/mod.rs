//! Exact k-nearest-neighbor search over a [`KdTree`].
//!
//! The buffered engine ([`run_session`]) is what [`BufferKdTree`](crate::BufferKdTree) uses. [`KnnLinear`] and [`KnnRecursive`] are simple,
//! single-query searches over the same tree that produce identical results.

use ndarray::ArrayView2;
use rayon::prelude::*;

use crate::{FloatValue, KdTree};

mod chunks;
mod linear;
mod recursive;
mod results;
mod scheduler;
mod traversal;

pub use chunks::{ChunkExecutor, clip_jobs};
pub use linear::KnnLinear;
pub use recursive::KnnRecursive;
pub use results::{Neighbors, ResultCollector};
pub use scheduler::{QueryStats, run_session};
pub use traversal::{Branch, LeafStep, TraversalState, next_leaf};

/// A single-query Nearest Neighbor Search algorithm.
pub trait Search<F: FloatValue> {
    /// Returns a name for the search algorithm.
    ///
    /// This is intended for diagnostic use. Ideally, it should include information about the parameters of the algorithm.
    fn name(&self) -> String;

    /// Searches for the nearest neighbors of `query` in the given `tree` and returns `(index, distance)` pairs sorted by increasing distance.
    ///
    /// The indices are rows of the matrix the tree was built from, and the distances are Euclidean.
    fn search(&self, tree: &KdTree<F>, query: &[F]) -> Vec<(usize, F)>;

    /// Batched version of [`Search::search`] over the rows of `queries`.
    fn batch_search(&self, tree: &KdTree<F>, queries: ArrayView2<F>) -> Vec<Vec<(usize, F)>> {
        queries.outer_iter().map(|query| self.search(tree, &query.to_vec())).collect()
    }

    /// Parallel version of [`Search::batch_search`].
    fn par_batch_search(&self, tree: &KdTree<F>, queries: ArrayView2<F>) -> Vec<Vec<(usize, F)>>
    where
        Self: Sync,
    {
        let queries = queries.outer_iter().map(|query| query.to_vec()).collect::<Vec<_>>();
        queries.par_iter().map(|query| self.search(tree, query)).collect()
    }
}

// Blanket implementations of `Search` for references and boxes.
impl<F: FloatValue, Alg: Search<F>> Search<F> for &Alg {
    fn name(&self) -> String {
        (**self).name()
    }

    fn search(&self, tree: &KdTree<F>, query: &[F]) -> Vec<(usize, F)> {
        (**self).search(tree, query)
    }
}

impl<F: FloatValue, Alg: Search<F>> Search<F> for Box<Alg> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn search(&self, tree: &KdTree<F>, query: &[F]) -> Vec<(usize, F)> {
        (**self).search(tree, query)
    }
}
