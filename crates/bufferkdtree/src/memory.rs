//! Memory budgeting: training chunks, leaf buffer sizes and the number of queries per session.

use crate::{Error, FloatValue, Parameters, Result, backend::{ChunkDescriptor, WorkingMemory}};

/// The depth above which leaf buffers start at a fixed, small capacity.
const MAX_SCALED_BUFFER_DEPTH: usize = 16;

/// The initial leaf buffer capacity of trees deeper than [`MAX_SCALED_BUFFER_DEPTH`].
const DEEP_TREE_BUFFER_CAPACITY: usize = 128;

/// The sizes of the leaf buffers and of the per-round batch of one query session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BufferPlan {
    /// The initial capacity of every leaf buffer.
    pub leaf_capacity: usize,
    /// The number of buffered queries at which a leaf buffer triggers a drain.
    pub threshold: usize,
    /// The maximum number of queries advanced per round.
    pub batch_size: usize,
}

/// Splits `n` sorted patterns into chunks that fit the training budget of `memory`.
///
/// The raw training footprint is two copies of the patterns plus the nodes and leaf bounds. If that footprint divided by the requested number of chunks
/// exceeds `memory.total_bytes · allowed_train_mem_percent_chunk`, the number of chunks is raised to the smallest sufficient count (at least 3) and a
/// warning is logged. Every chunk holds `⌊n / n_chunks⌋ + 1` patterns except possibly the last; empty chunks are dropped.
///
/// # Errors
///
/// - If the tree itself does not fit into the working memory.
/// - If the training budget cannot hold even a single pattern.
#[expect(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn plan_chunks<F: FloatValue>(n: usize, dim: usize, depth: usize, params: &Parameters, memory: WorkingMemory) -> Result<Vec<ChunkDescriptor>> {
    let sz = F::byte_size();
    let n_nodes = (1_usize << depth) - 1;
    let tree_bytes = n_nodes * sz + (n_nodes + 1) * 2 * sz;
    if tree_bytes > memory.total_bytes {
        return Err(Error::resources(format!(
            "A tree of depth {depth} needs {tree_bytes} bytes but only {} are available",
            memory.total_bytes
        )));
    }

    let budget = memory.total_bytes as f64 * params.allowed_train_mem_percent_chunk;
    if budget < (dim * sz) as f64 {
        return Err(Error::resources(format!(
            "The training chunk budget of {budget:.0} bytes cannot hold a single pattern of {} bytes",
            dim * sz
        )));
    }

    let raw_bytes = (2 * n * dim * sz + tree_bytes) as f64;
    let mut n_chunks = params.n_train_chunks;
    if raw_bytes / n_chunks as f64 > budget {
        n_chunks = ((raw_bytes / budget).ceil() as usize).max(3);
        ftlog::warn!(
            "Training patterns need {raw_bytes:.0} bytes; using {n_chunks} chunks instead of {}",
            params.n_train_chunks
        );
    }
    let n_chunks = n_chunks.min(n).max(1);

    let per_chunk = n / n_chunks + 1;
    let chunks = (0..n_chunks)
        .map(|i| ChunkDescriptor {
            start: (i * per_chunk).min(n),
            end: ((i + 1) * per_chunk).min(n),
        })
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>();
    ftlog::info!("Split {n} patterns into {} chunks of at most {per_chunk} patterns", chunks.len());

    Ok(chunks)
}

/// Returns the initial leaf buffer capacity before it is capped by the number of queries.
#[must_use]
pub fn base_leaf_capacity(params: &Parameters, depth: usize) -> usize {
    params.leaf_buffer_capacity.unwrap_or_else(|| {
        if depth <= MAX_SCALED_BUFFER_DEPTH {
            1 << (24 - depth)
        } else {
            ftlog::warn!("Tree depth {depth} is large; leaf buffers start with capacity {DEEP_TREE_BUFFER_CAPACITY}");
            DEEP_TREE_BUFFER_CAPACITY
        }
    })
}

/// Sizes the leaf buffers and the batch of a session with `n_queries` queries.
#[must_use]
#[expect(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn plan_buffers(params: &Parameters, depth: usize, n_queries: usize) -> BufferPlan {
    let leaf_capacity = base_leaf_capacity(params, depth).min(n_queries).max(1);
    let threshold = ((params.buffer_threshold * leaf_capacity as f64).ceil() as usize).clamp(1, leaf_capacity);
    BufferPlan {
        leaf_capacity,
        threshold,
        batch_size: params.batch_factor.saturating_mul(leaf_capacity),
    }
}

/// Returns the number of bytes one query occupies during a session.
#[must_use]
pub fn bytes_per_query<F: FloatValue>(dim: usize, k: usize, depth: usize) -> usize {
    F::byte_size() * (2 * dim + 2 * k) + size_of::<usize>() * (2 * k + depth + 5)
}

/// Returns the largest number of queries a single session may hold in working memory.
///
/// This is the smaller of what fits into `memory.total_bytes · allowed_test_mem_percent` after the batch arrays, and a third of the largest single
/// allocation divided by `max(dim, k)` values.
///
/// # Errors
///
/// If not even one query fits.
#[expect(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn max_queries_per_session<F: FloatValue>(
    dim: usize,
    k: usize,
    depth: usize,
    params: &Parameters,
    memory: WorkingMemory,
) -> Result<usize> {
    let batch_bytes = params
        .batch_factor
        .saturating_mul(base_leaf_capacity(params, depth))
        .saturating_mul(2 * size_of::<usize>() + F::byte_size());
    let budget = ((memory.total_bytes as f64 * params.allowed_test_mem_percent) as usize).saturating_sub(batch_bytes);

    let by_total = budget / bytes_per_query::<F>(dim, k, depth);
    let by_alloc = (memory.max_alloc_bytes / 3) / (dim.max(k) * F::byte_size());
    let max_queries = by_total.min(by_alloc);

    if max_queries == 0 {
        Err(Error::resources(format!(
            "Not a single query fits into {} bytes of working memory",
            memory.total_bytes
        )))
    } else {
        Ok(max_queries)
    }
}
