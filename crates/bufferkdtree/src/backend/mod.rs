//! The compute backend: where traversal steps and brute-force work run.

use crate::{FloatValue, KdTree, PatternStore, Result, search::{LeafStep, TraversalState}, utils::TopK};

mod cpu;

pub use cpu::CpuBackend;

/// The memory budget of a compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WorkingMemory {
    /// The total number of bytes available.
    pub total_bytes: usize,
    /// The largest number of bytes a single allocation may occupy.
    pub max_alloc_bytes: usize,
}

/// A contiguous range `[start, end)` of the sorted patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// First pattern of the chunk.
    pub start: usize,
    /// One past the last pattern of the chunk.
    pub end: usize,
}

impl ChunkDescriptor {
    /// Returns the number of patterns in the chunk.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns whether the chunk holds no patterns.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Returns the part of `[from, to)` that lies inside the chunk, or `None` if they do not overlap.
    #[must_use]
    pub fn intersect(&self, from: usize, to: usize) -> Option<(usize, usize)> {
        let (lo, hi) = (from.max(self.start), to.min(self.end));
        (lo < hi).then_some((lo, hi))
    }
}

/// A chunk of patterns copied into a working-memory slot of a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedChunk<F> {
    /// Which patterns were staged.
    pub descriptor: ChunkDescriptor,
    /// The dimensionality of the patterns.
    pub dim: usize,
    /// The coordinates of the staged patterns, row-major.
    pub coordinates: Vec<F>,
}

impl<F: FloatValue> StagedChunk<F> {
    /// Returns the coordinates of the pattern at global position `i`, which must lie inside the chunk.
    #[must_use]
    pub fn row(&self, i: usize) -> &[F] {
        let local = i - self.descriptor.start;
        &self.coordinates[local * self.dim..(local + 1) * self.dim]
    }
}

/// One unit of brute-force work: compare a query against the sorted patterns `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BruteJob {
    /// The query's position in the query set.
    pub query: usize,
    /// First pattern to compare against.
    pub from: usize,
    /// One past the last pattern to compare against.
    pub to: usize,
}

/// The two coarse batch operations of the buffered search, plus chunk staging.
///
/// Implementations must be usable from inside a rayon thread pool; the CPU implementation parallelizes every batch with rayon. A batch operation either
/// fully succeeds or returns an error, which aborts the query session.
///
/// # Type Parameters
///
/// - `F`: The type of the coordinates and distances.
pub trait ComputeBackend<F: FloatValue>: Send + Sync {
    /// Returns a name for the backend, for diagnostics.
    fn name(&self) -> String;

    /// Returns the memory budget of the backend.
    fn working_memory(&self) -> WorkingMemory;

    /// Copies the patterns of `chunk` into working memory.
    ///
    /// # Errors
    ///
    /// If the backend cannot stage the chunk.
    fn stage_chunk(&self, store: &PatternStore<F>, chunk: ChunkDescriptor) -> Result<StagedChunk<F>>;

    /// Advances a batch of queries to their next leaf.
    ///
    /// # Arguments
    ///
    /// - `tree`: The tree to walk.
    /// - `queries`: All queries of the session.
    /// - `batch`: The positions in `queries` of the queries to advance.
    /// - `radii`: The current `k`-th best squared distance of each query in `batch`.
    /// - `states`: The traversal state of each query in `batch`, updated in place.
    ///
    /// # Errors
    ///
    /// If the batch could not be processed.
    fn find_leaf_batch(
        &self,
        tree: &KdTree<F>,
        queries: &PatternStore<F>,
        batch: &[usize],
        radii: &[F],
        states: &mut [TraversalState],
    ) -> Result<Vec<LeafStep>>;

    /// Computes, for every job, the `k` nearest patterns of the job's query among the job's range.
    ///
    /// Every job range must lie inside the staged chunk. The returned lists hold squared distances and positions in the sorted store.
    ///
    /// # Errors
    ///
    /// If the batch could not be processed.
    fn brute_force(&self, chunk: &StagedChunk<F>, queries: &PatternStore<F>, jobs: &[BruteJob], k: usize) -> Result<Vec<TopK<F>>>;
}

impl<F: FloatValue, B: ComputeBackend<F> + ?Sized> ComputeBackend<F> for Box<B> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn working_memory(&self) -> WorkingMemory {
        (**self).working_memory()
    }

    fn stage_chunk(&self, store: &PatternStore<F>, chunk: ChunkDescriptor) -> Result<StagedChunk<F>> {
        (**self).stage_chunk(store, chunk)
    }

    fn find_leaf_batch(
        &self,
        tree: &KdTree<F>,
        queries: &PatternStore<F>,
        batch: &[usize],
        radii: &[F],
        states: &mut [TraversalState],
    ) -> Result<Vec<LeafStep>> {
        (**self).find_leaf_batch(tree, queries, batch, radii, states)
    }

    fn brute_force(&self, chunk: &StagedChunk<F>, queries: &PatternStore<F>, jobs: &[BruteJob], k: usize) -> Result<Vec<TopK<F>>> {
        (**self).brute_force(chunk, queries, jobs, k)
    }
}

impl<F: FloatValue, B: ComputeBackend<F> + ?Sized> ComputeBackend<F> for &B {
    fn name(&self) -> String {
        (**self).name()
    }

    fn working_memory(&self) -> WorkingMemory {
        (**self).working_memory()
    }

    fn stage_chunk(&self, store: &PatternStore<F>, chunk: ChunkDescriptor) -> Result<StagedChunk<F>> {
        (**self).stage_chunk(store, chunk)
    }

    fn find_leaf_batch(
        &self,
        tree: &KdTree<F>,
        queries: &PatternStore<F>,
        batch: &[usize],
        radii: &[F],
        states: &mut [TraversalState],
    ) -> Result<Vec<LeafStep>> {
        (**self).find_leaf_batch(tree, queries, batch, radii, states)
    }

    fn brute_force(&self, chunk: &StagedChunk<F>, queries: &PatternStore<F>, jobs: &[BruteJob], k: usize) -> Result<Vec<TopK<F>>> {
        (**self).brute_force(chunk, queries, jobs, k)
    }
}
