//! The resumable, iterative descent of one query through the tree.

use crate::{FloatValue, KdTree};

/// What has been done at one level of a query's path through the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Branch {
    /// The node at this level has not been entered yet.
    #[default]
    Unvisited,
    /// The query's own side was the right child; the left child is still pending.
    RightFirst,
    /// The query's own side was the left child; the right child is still pending.
    LeftFirst,
    /// Both children have been considered.
    Both,
}

/// The result of advancing a [`TraversalState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafStep {
    /// The query reached the leaf with this id and must be compared against its patterns.
    Leaf(usize),
    /// The query has exhausted the tree; its results are final.
    Done,
}

/// The position of one query in its depth-first walk of the tree.
///
/// The state is fully resumable: after [`next_leaf`] returns a leaf, the state points at the leaf's parent so that the next call continues the walk from
/// there.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TraversalState {
    /// The heap id of the current node.
    node: usize,
    /// The level of the current node.
    level: usize,
    /// One [`Branch`] per level above the leaves.
    stack: Vec<Branch>,
    /// Whether the walk has ascended past the root.
    finished: bool,
}

impl TraversalState {
    /// Creates a state at the root of a tree of the given depth.
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            node: 0,
            level: 0,
            stack: vec![Branch::Unvisited; depth],
            finished: false,
        }
    }

    /// Returns whether the walk is complete.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns the heap id of the current node.
    #[must_use]
    pub const fn node(&self) -> usize {
        self.node
    }

    /// Returns the level of the current node.
    #[must_use]
    pub const fn level(&self) -> usize {
        self.level
    }

    /// Resets the current level and moves to the parent. Returns `false` if the walk ascended past the root.
    fn ascend(&mut self) -> bool {
        self.stack[self.level] = Branch::Unvisited;
        if self.level == 0 {
            self.finished = true;
            false
        } else {
            self.node = (self.node - 1) / 2;
            self.level -= 1;
            true
        }
    }
}

/// Advances `state` until it reaches a leaf or exhausts the tree.
///
/// At each internal node the query first descends to its own side (`coordinate − threshold ≥ 0` means right). When it comes back, it descends into the
/// sibling only if `(coordinate − threshold)² ≤ radius`, where `radius` is the query's current `k`-th best squared distance. Otherwise, or once both
/// children are done, it ascends. Ascending past the root finishes the walk.
///
/// # Arguments
///
/// - `tree`: The tree to walk.
/// - `query`: The coordinates of the query.
/// - `radius`: The current `k`-th best squared distance of the query.
/// - `state`: The state of the walk, updated in place.
pub fn next_leaf<F: FloatValue>(tree: &KdTree<F>, query: &[F], radius: F, state: &mut TraversalState) -> LeafStep {
    if state.finished {
        return LeafStep::Done;
    }

    let n_nodes = tree.n_nodes();
    let depth = tree.depth();
    let nodes = tree.nodes();

    loop {
        if state.level == depth {
            let leaf = state.node - n_nodes;
            state.node = (state.node - 1) / 2;
            state.level -= 1;
            return LeafStep::Leaf(leaf);
        }

        let node = nodes[state.node];
        let diff = query[node.axis] - node.threshold;
        match state.stack[state.level] {
            Branch::Unvisited => {
                if diff >= F::zero() {
                    state.stack[state.level] = Branch::RightFirst;
                    state.node = 2 * state.node + 2;
                } else {
                    state.stack[state.level] = Branch::LeftFirst;
                    state.node = 2 * state.node + 1;
                }
                state.level += 1;
            }
            own @ (Branch::RightFirst | Branch::LeftFirst) => {
                if diff.squared() <= radius {
                    state.stack[state.level] = Branch::Both;
                    state.node = if own == Branch::RightFirst {
                        2 * state.node + 1
                    } else {
                        2 * state.node + 2
                    };
                    state.level += 1;
                } else if !state.ascend() {
                    return LeafStep::Done;
                }
            }
            Branch::Both => {
                if !state.ascend() {
                    return LeafStep::Done;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::{LeafStep, TraversalState, next_leaf};
    use crate::{KdTree, SplittingPolicy};

    #[test]
    fn infinite_radius_visits_every_leaf() -> Result<(), String> {
        let data = array![[0.0_f64], [1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0]];
        let tree = KdTree::new(data.view(), 2, SplittingPolicy::Cyclic)?;

        let mut state = TraversalState::new(tree.depth());
        let mut seen = Vec::new();
        while let LeafStep::Leaf(leaf) = next_leaf(&tree, &[5.5], f64::INFINITY, &mut state) {
            seen.push(leaf);
        }

        assert_eq!(seen, vec![2, 3, 1, 0]);
        assert!(state.is_finished());
        assert_eq!(next_leaf(&tree, &[5.5], f64::INFINITY, &mut state), LeafStep::Done);
        Ok(())
    }

    #[test]
    fn zero_radius_visits_own_leaf_only() -> Result<(), String> {
        let data = array![[0.0_f32], [1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0]];
        let tree = KdTree::new(data.view(), 2, SplittingPolicy::Cyclic)?;

        let mut state = TraversalState::new(tree.depth());
        assert_eq!(next_leaf(&tree, &[0.5], 0.0, &mut state), LeafStep::Leaf(0));
        assert_eq!(next_leaf(&tree, &[0.5], 0.0, &mut state), LeafStep::Done);
        Ok(())
    }
}
