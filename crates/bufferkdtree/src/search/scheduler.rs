//! The buffered query engine: the control loop that feeds traversal steps and brute-force work to a backend.

use crate::{
    Error, FloatValue, KdTree, Parameters, PatternStore, Result,
    backend::{BruteJob, ChunkDescriptor, ComputeBackend},
    memory::plan_buffers,
    utils::{RingBuffer, TopK},
};

use super::{LeafStep, TraversalState, chunks::ChunkExecutor};

/// Counters describing the work done by one or more query sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QueryStats {
    /// The number of sessions.
    pub sessions: usize,
    /// The number of queries answered.
    pub queries: usize,
    /// The number of scheduler rounds.
    pub rounds: usize,
    /// The number of batch traversal steps sent to the backend.
    pub traversal_calls: usize,
    /// The number of times all leaf buffers were drained.
    pub drains: usize,
    /// The number of leaf visits brute-forced during drains.
    pub leaf_jobs: usize,
    /// The number of final flushes.
    pub final_flushes: usize,
    /// The number of queries answered by a final flush.
    pub flushed_queries: usize,
    /// The number of queries whose traversal ran to completion.
    pub completed_traversals: usize,
    /// The number of times a leaf buffer doubled its capacity.
    pub buffer_growths: usize,
    /// The number of training chunks staged.
    pub chunk_stagings: usize,
}

impl QueryStats {
    /// Adds the counters of another session to these.
    pub const fn absorb(&mut self, other: &Self) {
        self.sessions += other.sessions;
        self.queries += other.queries;
        self.rounds += other.rounds;
        self.traversal_calls += other.traversal_calls;
        self.drains += other.drains;
        self.leaf_jobs += other.leaf_jobs;
        self.final_flushes += other.final_flushes;
        self.flushed_queries += other.flushed_queries;
        self.completed_traversals += other.completed_traversals;
        self.buffer_growths += other.buffer_growths;
        self.chunk_stagings += other.chunk_stagings;
    }
}

/// Answers every query in `queries` exactly and returns the working results.
///
/// Each round pulls up to a batch of queries, preferring those waiting to resume over new ones, advances them to their next leaf, and appends them to that
/// leaf's buffer. Once any buffer reaches its threshold, or no queries are left to pull, every non-empty buffer is drained: its queries are brute-forced
/// against the leaf's patterns and queued to resume. When all queries have been pulled and fewer than `bf_remaining_threshold` wait to resume, they are
/// brute-forced against all patterns instead and are done.
///
/// The returned lists hold squared distances and positions in the sorted store.
///
/// # Arguments
///
/// - `tree`: The tree to search.
/// - `backend`: Where the batch operations run.
/// - `chunks`: How the sorted patterns are split for brute-force work.
/// - `queries`: The queries of this session.
/// - `k`: The number of neighbors to find.
/// - `params`: The buffer sizes and the final flush threshold.
///
/// # Errors
///
/// If a backend operation fails.
pub fn run_session<F: FloatValue, B: ComputeBackend<F>>(
    tree: &KdTree<F>,
    backend: &B,
    chunks: &[ChunkDescriptor],
    queries: &PatternStore<F>,
    k: usize,
    params: &Parameters,
) -> Result<(Vec<TopK<F>>, QueryStats)> {
    let m = queries.len();
    let n = tree.store().len();
    let plan = plan_buffers(params, tree.depth(), m);
    ftlog::debug!(
        "Session over {m} queries: leaf buffers of {}, drain at {}, batches of {}",
        plan.leaf_capacity,
        plan.threshold,
        plan.batch_size
    );

    let mut stats = QueryStats {
        sessions: 1,
        queries: m,
        ..QueryStats::default()
    };
    let mut results = vec![TopK::new(k); m];
    let mut states = vec![TraversalState::new(tree.depth()); m];
    let mut buffers = vec![RingBuffer::with_capacity(plan.leaf_capacity); tree.n_leaves()];
    let mut reinsert = RingBuffer::with_capacity(m);
    let mut executor = ChunkExecutor::new(backend, tree.store(), chunks)?;

    let mut cursor = 0;
    let mut drain = false;
    let mut batch = Vec::with_capacity(plan.batch_size.min(m));

    while cursor < m || !reinsert.is_empty() {
        stats.rounds += 1;

        batch.clear();
        reinsert.pop_batch(plan.batch_size, &mut batch);
        let fresh = (plan.batch_size - batch.len()).min(m - cursor);
        batch.extend(cursor..cursor + fresh);
        cursor += fresh;

        if !batch.is_empty() {
            let radii = batch.iter().map(|&q| results[q].kth()).collect::<Vec<_>>();
            let mut batch_states = batch.iter().map(|&q| core::mem::take(&mut states[q])).collect::<Vec<_>>();
            let steps = backend.find_leaf_batch(tree, queries, &batch, &radii, &mut batch_states)?;
            stats.traversal_calls += 1;
            if steps.len() != batch.len() {
                return Err(Error::backend(format!(
                    "Backend returned {} traversal steps for {} queries",
                    steps.len(),
                    batch.len()
                )));
            }

            for ((&q, state), step) in batch.iter().zip(batch_states).zip(steps) {
                states[q] = state;
                match step {
                    LeafStep::Leaf(leaf) => {
                        let buffer = &mut buffers[leaf];
                        if buffer.is_full() {
                            stats.buffer_growths += 1;
                        }
                        buffer.push(q);
                        if buffer.len() >= plan.threshold {
                            drain = true;
                        }
                    }
                    LeafStep::Done => stats.completed_traversals += 1,
                }
            }
        }

        if drain || (cursor == m && reinsert.is_empty()) {
            drain = false;

            let mut jobs = Vec::new();
            for (leaf, buffer) in tree.leaves().iter().zip(buffers.iter_mut()) {
                jobs.extend(buffer.drain_all().into_iter().map(|query| BruteJob {
                    query,
                    from: leaf.from,
                    to: leaf.to,
                }));
            }
            stats.drains += 1;
            stats.leaf_jobs += jobs.len();

            executor.run(queries, &jobs, k, &mut results)?;
            for job in &jobs {
                reinsert.push(job.query);
            }

            if cursor == m && !reinsert.is_empty() && reinsert.len() < params.bf_remaining_threshold {
                let remaining = reinsert.drain_all();
                let jobs = remaining
                    .iter()
                    .map(|&query| {
                        results[query].reset();
                        BruteJob { query, from: 0, to: n }
                    })
                    .collect::<Vec<_>>();
                executor.run(queries, &jobs, k, &mut results)?;

                stats.final_flushes += 1;
                stats.flushed_queries += remaining.len();
            }
        }
    }

    stats.chunk_stagings = executor.stagings();
    ftlog::info!(
        "Answered {m} queries in {} rounds with {} drains, {} leaf visits and {} queries flushed",
        stats.rounds,
        stats.drains,
        stats.leaf_jobs,
        stats.flushed_queries
    );

    Ok((results, stats))
}
