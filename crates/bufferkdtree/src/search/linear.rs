//! K-Nearest Neighbor (KNN) search with a naive linear scan.

use crate::{FloatValue, KdTree, utils::{TopK, euclidean_sq}};

use super::Search;

/// K-Nearest Neighbor (KNN) search with a naive linear scan.
///
/// The field is the number of nearest neighbors to find (k).
pub struct KnnLinear(pub usize);

impl<F: FloatValue> Search<F> for KnnLinear {
    fn name(&self) -> String {
        format!("KnnLinear(k={})", self.0)
    }

    fn search(&self, tree: &KdTree<F>, query: &[F]) -> Vec<(usize, F)> {
        let store = tree.store();
        let mut top = TopK::new(self.0);
        for (i, row) in store.iter() {
            top.insert(euclidean_sq(query, row), i);
        }
        top.iter()
            .filter(|(_, d)| d.is_finite())
            .map(|(i, d)| (store.original_index(i), d.sqrt()))
            .collect()
    }
}
