//! The fitted index: a tree, its parameters and the backend that answers queries.

use ndarray::{Array2, ArrayView2, s};

use crate::{
    Error, FloatValue, KdTree, Parameters, PatternStore, Result,
    backend::{ChunkDescriptor, ComputeBackend, CpuBackend},
    memory,
    params::{MAX_NEIGHBORS, check_k},
    search::{Neighbors, QueryStats, ResultCollector, run_session},
};

/// An exact k-nearest-neighbor index over a fixed set of training patterns.
///
/// Queries are answered in batches by the buffered engine: many queries walk the tree at once, and the patterns of each leaf are compared against all
/// queries waiting at that leaf in one backend call. The results are identical to those of a linear scan.
///
/// # Type Parameters
///
/// - `F`: The type of the coordinates and distances.
/// - `B`: The compute backend.
///
/// # Examples
///
/// ```
/// use bufferkdtree::{BufferKdTree, CpuBackend, Parameters};
/// use ndarray::array;
///
/// let train = array![[0.0_f32, 0.0], [1.0, 0.0], [0.0, 1.0], [5.0, 5.0], [6.0, 5.0], [5.0, 6.0], [9.0, 9.0], [2.0, 2.0]];
/// let params = Parameters::default().with_tree_depth(2);
/// let index = BufferKdTree::fit(train.view(), params, CpuBackend::default()).map_err(String::from)?;
///
/// let neighbors = index.query(array![[5.2_f32, 5.1]].view(), 2).map_err(String::from)?;
/// assert_eq!(neighbors.indices.row(0).to_vec(), vec![3, 4]);
/// # Ok::<(), String>(())
/// ```
#[derive(Debug)]
pub struct BufferKdTree<F, B = CpuBackend> {
    /// The tree over the sorted patterns.
    tree: KdTree<F>,
    /// The validated parameters, with the depth the tree was actually built with.
    params: Parameters,
    /// Where queries are answered.
    backend: B,
    /// How the sorted patterns are split for brute-force work.
    chunks: Vec<ChunkDescriptor>,
}

impl<F: FloatValue> BufferKdTree<F, CpuBackend> {
    /// Fits an index that runs on the CPU with the default memory budget.
    ///
    /// # Errors
    ///
    /// See [`BufferKdTree::fit`].
    pub fn fit_cpu(patterns: ArrayView2<F>, params: Parameters) -> Result<Self> {
        Self::fit(patterns, params, CpuBackend::default())
    }
}

impl<F: FloatValue, B: ComputeBackend<F>> BufferKdTree<F, B> {
    /// Builds the tree over the rows of `patterns` and plans how the training set is chunked.
    ///
    /// # Arguments
    ///
    /// - `patterns`: The `n × d` training matrix.
    /// - `params`: The parameters of the index.
    /// - `backend`: Where queries will be answered.
    ///
    /// # Errors
    ///
    /// - If `params` is invalid.
    /// - If `patterns` is empty, has no columns or has a non-finite value.
    /// - If the tree or a single pattern does not fit into the backend's working memory.
    pub fn fit(patterns: ArrayView2<F>, params: Parameters, backend: B) -> Result<Self> {
        params.validate()?;
        ftlog::info!("Fitting a buffer k-d tree over {:?} patterns on {}", patterns.dim(), backend.name());

        let tree = KdTree::new(patterns, params.tree_depth, params.splitting)?;
        let chunks = memory::plan_chunks::<F>(tree.store().len(), tree.store().dim(), tree.depth(), &params, backend.working_memory())?;
        let params = params.with_tree_depth(tree.depth());

        Ok(Self {
            tree,
            params,
            backend,
            chunks,
        })
    }

    /// Finds the `k` nearest training patterns of every row of `queries`.
    ///
    /// # Errors
    ///
    /// See [`BufferKdTree::query_with_stats`].
    pub fn query(&self, queries: ArrayView2<F>, k: usize) -> Result<Neighbors<F>> {
        self.query_with_stats(queries, k).map(|(neighbors, _)| neighbors)
    }

    /// Finds the `n_neighbors` nearest training patterns of every row of `queries`, with `n_neighbors` taken from the parameters.
    ///
    /// # Errors
    ///
    /// See [`BufferKdTree::query_with_stats`].
    pub fn kneighbors(&self, queries: ArrayView2<F>) -> Result<Neighbors<F>> {
        self.query(queries, self.params.n_neighbors)
    }

    /// Finds the `k` nearest training patterns of every row of `queries` and reports the work done.
    ///
    /// The queries are answered inside a rayon thread pool with `num_threads` threads. If there are more queries than fit into the backend's working
    /// memory at once, they are answered in successive sessions.
    ///
    /// # Errors
    ///
    /// - If `k` is not in `[1, 100]` or exceeds the number of training patterns.
    /// - If the queries have a different dimensionality than the training patterns or have a non-finite value.
    /// - If not a single query fits into the backend's working memory.
    /// - If the thread pool cannot be built or a backend operation fails.
    pub fn query_with_stats(&self, queries: ArrayView2<F>, k: usize) -> Result<(Neighbors<F>, QueryStats)> {
        check_k(k)?;
        let store = self.tree.store();
        if k > store.len() {
            return Err(Error::config(format!(
                "Cannot find {k} neighbors among {} training patterns",
                store.len()
            )));
        }
        if queries.ncols() != store.dim() {
            return Err(Error::config(format!(
                "Queries have {} dimensions but the index was built over {}",
                queries.ncols(),
                store.dim()
            )));
        }

        let m = queries.nrows();
        if m == 0 {
            return Ok((Neighbors::empty(k), QueryStats::default()));
        }

        let per_session = self.max_queries_per_session(k)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.params.num_threads)
            .build()
            .map_err(|e| Error::backend(e.to_string()))?;

        pool.install(|| -> Result<(Neighbors<F>, QueryStats)> {
            let mut collector = ResultCollector::new(m, k);
            let mut stats = QueryStats::default();
            for start in (0..m).step_by(per_session) {
                let end = (start + per_session).min(m);
                let session = PatternStore::from_array(queries.slice(s![start..end, ..]))?;
                let (results, session_stats) = run_session(&self.tree, &self.backend, &self.chunks, &session, k, &self.params)?;
                collector.extend(&results, store);
                stats.absorb(&session_stats);
            }
            Ok((collector.finish()?, stats))
        })
    }

    /// Finds the `k` nearest neighbors of every training pattern, excluding the pattern itself.
    ///
    /// This queries the training set with `k + 1` neighbors and drops the first one, so with duplicate patterns the dropped neighbor may be a duplicate
    /// rather than the pattern itself.
    ///
    /// # Errors
    ///
    /// - If `k` is not in `[1, 99]`, since the pattern itself takes one of the at most 100 neighbors.
    /// - If `k + 1` exceeds the number of training patterns.
    /// - See [`BufferKdTree::query`].
    pub fn query_training_set(&self, k: usize) -> Result<Neighbors<F>> {
        if !(1..MAX_NEIGHBORS).contains(&k) {
            return Err(Error::config(format!(
                "The number of neighbors of a training pattern must be in [1, {}], got {k}",
                MAX_NEIGHBORS - 1
            )));
        }

        let store = self.tree.store();
        if k + 1 > store.len() {
            return Err(Error::config(format!(
                "Cannot find {k} neighbors of each of {} training patterns",
                store.len()
            )));
        }

        let mut training = Array2::from_elem((store.len(), store.dim()), F::zero());
        for (i, row) in store.iter() {
            training
                .row_mut(store.original_index(i))
                .iter_mut()
                .zip(row)
                .for_each(|(t, &v)| *t = v);
        }

        self.query(training.view(), k + 1).map(Neighbors::without_first_column)
    }

    /// Returns the largest number of queries with `k` neighbors one session can hold.
    ///
    /// # Errors
    ///
    /// If not a single query fits into the backend's working memory.
    pub fn max_queries_per_session(&self, k: usize) -> Result<usize> {
        memory::max_queries_per_session::<F>(
            self.tree.store().dim(),
            k,
            self.tree.depth(),
            &self.params,
            self.backend.working_memory(),
        )
    }

    /// Releases the index and everything the backend holds for it.
    pub fn free(self) {
        ftlog::debug!("Releasing a buffer k-d tree over {} patterns", self.tree.store().len());
    }

    /// Returns the tree.
    pub const fn tree(&self) -> &KdTree<F> {
        &self.tree
    }

    /// Returns the parameters, with the depth the tree was actually built with.
    pub const fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Returns the backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns how the sorted patterns are split for brute-force work.
    #[must_use]
    pub fn chunks(&self) -> &[ChunkDescriptor] {
        &self.chunks
    }
}
