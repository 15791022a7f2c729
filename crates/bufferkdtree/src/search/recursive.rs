//! K-Nearest Neighbor (KNN) search with a single-query, recursive descent of the k-d tree.

use crate::{FloatValue, KdTree, utils::{TopK, euclidean_sq}};

use super::Search;

/// K-Nearest Neighbor (KNN) search with a recursive, depth-first descent of the tree.
///
/// At every node the query's own side is searched first; the other side is searched only if the squared distance from the query to the splitting plane is
/// no greater than the current `k`-th best squared distance.
///
/// The field is the number of nearest neighbors to find (k).
pub struct KnnRecursive(pub usize);

impl KnnRecursive {
    /// Returns the leaves visited while searching for the neighbors of `query`, in visiting order.
    pub fn leaf_sequence<F: FloatValue>(&self, tree: &KdTree<F>, query: &[F]) -> Vec<usize> {
        let mut top = TopK::new(self.0);
        let mut visited = Vec::new();
        descend(tree, query, 0, 0, &mut top, &mut visited);
        visited
    }
}

impl<F: FloatValue> Search<F> for KnnRecursive {
    fn name(&self) -> String {
        format!("KnnRecursive(k={})", self.0)
    }

    fn search(&self, tree: &KdTree<F>, query: &[F]) -> Vec<(usize, F)> {
        let mut top = TopK::new(self.0);
        let mut visited = Vec::new();
        descend(tree, query, 0, 0, &mut top, &mut visited);

        let store = tree.store();
        top.iter()
            .filter(|(_, d)| d.is_finite())
            .map(|(i, d)| (store.original_index(i), d.sqrt()))
            .collect()
    }
}

/// Searches the subtree rooted at node `id` on `level`.
fn descend<F: FloatValue>(tree: &KdTree<F>, query: &[F], id: usize, level: usize, top: &mut TopK<F>, visited: &mut Vec<usize>) {
    if level == tree.depth() {
        let leaf_id = id - tree.n_nodes();
        let leaf = tree.leaves()[leaf_id];
        let store = tree.store();
        for i in leaf.from..leaf.to {
            top.insert(euclidean_sq(query, store.row(i)), i);
        }
        visited.push(leaf_id);
        return;
    }

    let node = tree.nodes()[id];
    let diff = query[node.axis] - node.threshold;
    let (own, other) = if diff >= F::zero() {
        (2 * id + 2, 2 * id + 1)
    } else {
        (2 * id + 1, 2 * id + 2)
    };

    descend(tree, query, own, level + 1, top, visited);
    if diff.squared() <= top.kth() {
        descend(tree, query, other, level + 1, top, visited);
    }
}
