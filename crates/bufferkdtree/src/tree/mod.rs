//! A fixed-depth k-d tree over a sorted copy of the training patterns.

use ndarray::ArrayView2;

use crate::{
    Error, FloatValue, Result, SplittingPolicy,
    params::{MAX_TREE_DEPTH, MIN_TREE_DEPTH},
    utils::floor_log2,
};

mod split;
mod store;

pub use split::{choose_axis, partition_at_median};
pub use store::{Pattern, PatternStore};

/// An internal node of the tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node<F> {
    /// The splitting axis.
    pub axis: usize,
    /// The median of the node's patterns along `axis`.
    pub threshold: F,
}

/// A leaf of the tree: the half-open range `[from, to)` of the sorted patterns it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Leaf {
    /// First pattern of the leaf.
    pub from: usize,
    /// One past the last pattern of the leaf.
    pub to: usize,
}

impl Leaf {
    /// Returns the number of patterns in the leaf.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.to - self.from
    }

    /// Returns whether the leaf owns no patterns.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.to == self.from
    }
}

/// A complete binary tree of fixed depth over a sorted copy of the training patterns.
///
/// The `2^depth − 1` internal nodes live in a flat array with heap indexing: the children of node `i` are `2i + 1` (left) and `2i + 2` (right). The
/// `2^depth` leaves each own a contiguous range of the [`PatternStore`], and together the ranges partition it. A node's id in the heap numbering that is
/// at least `n_nodes` refers to leaf `id − n_nodes`.
///
/// The tree is immutable after construction.
///
/// # Type Parameters
///
/// - `F`: The type of the coordinates.
#[must_use]
#[derive(Debug, Clone)]
pub struct KdTree<F> {
    /// The internal nodes in heap order.
    nodes: Vec<Node<F>>,
    /// The leaves in left-to-right order.
    leaves: Vec<Leaf>,
    /// The depth of the tree.
    depth: usize,
    /// The patterns, sorted so that every leaf's patterns are contiguous.
    store: PatternStore<F>,
    /// How the splitting axes were chosen.
    policy: SplittingPolicy,
}

impl<F: FloatValue> KdTree<F> {
    /// Builds a tree over the rows of `data`.
    ///
    /// If `depth` exceeds `⌊log2 n⌋`, the tree is built with depth `max(2, ⌊log2 n⌋)` instead and a warning is logged.
    ///
    /// # Arguments
    ///
    /// - `data`: The `n × d` training matrix.
    /// - `depth`: The requested depth of the tree.
    /// - `policy`: How the splitting axis of each node is chosen.
    ///
    /// # Errors
    ///
    /// - If `depth` is not in `[2, 50]`.
    /// - If `data` is empty, has no columns or has a non-finite value.
    pub fn new(data: ArrayView2<F>, depth: usize, policy: SplittingPolicy) -> Result<Self> {
        if !(MIN_TREE_DEPTH..=MAX_TREE_DEPTH).contains(&depth) {
            return Err(Error::config(format!(
                "tree_depth must be in [{MIN_TREE_DEPTH}, {MAX_TREE_DEPTH}], got {depth}"
            )));
        }

        let dim = data.ncols();
        let patterns = PatternStore::patterns_from_array(data)?;
        let depth = effective_depth(patterns.len(), depth);

        Ok(Self::from_patterns(patterns, dim, depth, policy))
    }

    /// Builds a tree of exactly `depth` levels over the given patterns.
    ///
    /// The user must ensure that `depth` is in `[2, 50]` and that every pattern has `dim > 0` coordinates. Leaves may be empty if there are fewer than
    /// `2^depth` patterns.
    pub fn from_patterns(mut patterns: Vec<Pattern<F>>, dim: usize, depth: usize, policy: SplittingPolicy) -> Self {
        let n_nodes = (1 << depth) - 1;
        let mut nodes = vec![
            Node {
                axis: 0,
                threshold: F::zero()
            };
            n_nodes
        ];
        let mut leaves = vec![Leaf::default(); n_nodes + 1];

        let builder = Builder { dim, depth, policy };
        builder.build(&mut nodes, &mut leaves, &mut patterns, 0, 0, 0);
        ftlog::info!(
            "Built a k-d tree of depth {depth} with {n_nodes} nodes over {} patterns in {dim} dimensions",
            patterns.len()
        );

        Self {
            nodes,
            leaves,
            depth,
            store: PatternStore::from_patterns(patterns, dim),
            policy,
        }
    }

    /// Returns the internal nodes in heap order.
    #[must_use]
    pub fn nodes(&self) -> &[Node<F>] {
        &self.nodes
    }

    /// Returns the leaves in left-to-right order.
    #[must_use]
    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    /// Returns the depth of the tree.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the number of internal nodes, `2^depth − 1`.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of leaves, `2^depth`.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.leaves.len()
    }

    /// Returns the sorted patterns.
    pub const fn store(&self) -> &PatternStore<F> {
        &self.store
    }

    /// Returns the splitting policy the tree was built with.
    pub const fn policy(&self) -> SplittingPolicy {
        self.policy
    }

    /// Returns the number of bytes the nodes and leaves occupy on a compute backend.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.n_nodes() * F::byte_size() + self.n_leaves() * 2 * F::byte_size()
    }
}

/// Returns the depth a tree over `n` patterns is actually built with.
#[must_use]
pub fn effective_depth(n: usize, requested: usize) -> usize {
    let max_depth = floor_log2(n);
    if requested > max_depth {
        let depth = max_depth.max(MIN_TREE_DEPTH);
        ftlog::warn!("tree_depth {requested} is too large for {n} patterns, using {depth} instead");
        depth
    } else {
        requested
    }
}

/// The fixed settings of one tree construction.
struct Builder {
    /// The dimensionality of the patterns.
    dim: usize,
    /// The depth at which leaves are recorded.
    depth: usize,
    /// How splitting axes are chosen.
    policy: SplittingPolicy,
}

impl Builder {
    /// Recursively splits `patterns`, which start at position `offset` of the full set, and records node `id` at `level`.
    fn build<F: FloatValue>(
        &self,
        nodes: &mut [Node<F>],
        leaves: &mut [Leaf],
        patterns: &mut [Pattern<F>],
        offset: usize,
        id: usize,
        level: usize,
    ) {
        if level == self.depth {
            leaves[id - nodes.len()] = Leaf {
                from: offset,
                to: offset + patterns.len(),
            };
            return;
        }

        let axis = choose_axis(patterns, level, self.dim, self.policy);
        let (threshold, mid) = partition_at_median(patterns, axis);
        nodes[id] = Node { axis, threshold };

        let (left, right) = patterns.split_at_mut(mid);
        self.build(nodes, leaves, left, offset, 2 * id + 1, level + 1);
        self.build(nodes, leaves, right, offset + mid, 2 * id + 2, level + 1);
    }
}
