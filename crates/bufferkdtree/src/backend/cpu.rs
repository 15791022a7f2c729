//! A compute backend that runs on the CPU with rayon.

use rayon::prelude::*;

use crate::{
    Error, FloatValue, KdTree, PatternStore, Result,
    search::{LeafStep, TraversalState, next_leaf},
    utils::{TopK, euclidean_sq},
};

use super::{BruteJob, ChunkDescriptor, ComputeBackend, StagedChunk, WorkingMemory};

/// The default working memory of the CPU backend: 4 GiB.
#[cfg(target_pointer_width = "64")]
pub const DEFAULT_TOTAL_BYTES: usize = 4 << 30;

/// The default working memory of the CPU backend: half of the address space.
#[cfg(not(target_pointer_width = "64"))]
pub const DEFAULT_TOTAL_BYTES: usize = usize::MAX / 2;

/// Runs both batch operations on the CPU, parallelized with rayon.
///
/// The operations use whichever rayon thread pool they are called from. Brute-force work is partitioned by job, and each job fills its own private
/// [`TopK`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuBackend {
    /// The memory budget used to plan chunks and query sessions.
    memory: WorkingMemory,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::with_working_memory(DEFAULT_TOTAL_BYTES, DEFAULT_TOTAL_BYTES / 4)
    }
}

impl CpuBackend {
    /// Creates a backend with the given memory budget.
    #[must_use]
    pub const fn with_working_memory(total_bytes: usize, max_alloc_bytes: usize) -> Self {
        Self {
            memory: WorkingMemory {
                total_bytes,
                max_alloc_bytes,
            },
        }
    }
}

impl<F: FloatValue> ComputeBackend<F> for CpuBackend {
    fn name(&self) -> String {
        format!("Cpu(threads={})", rayon::current_num_threads())
    }

    fn working_memory(&self) -> WorkingMemory {
        self.memory
    }

    fn stage_chunk(&self, store: &PatternStore<F>, chunk: ChunkDescriptor) -> Result<StagedChunk<F>> {
        if chunk.end > store.len() || chunk.start > chunk.end {
            return Err(Error::backend(format!(
                "Cannot stage chunk [{}, {}) of a store with {} patterns",
                chunk.start,
                chunk.end,
                store.len()
            )));
        }

        ftlog::debug!("Staging chunk [{}, {})", chunk.start, chunk.end);
        Ok(StagedChunk {
            descriptor: chunk,
            dim: store.dim(),
            coordinates: store.rows(chunk.start, chunk.end).to_vec(),
        })
    }

    fn find_leaf_batch(
        &self,
        tree: &KdTree<F>,
        queries: &PatternStore<F>,
        batch: &[usize],
        radii: &[F],
        states: &mut [TraversalState],
    ) -> Result<Vec<LeafStep>> {
        if batch.len() != radii.len() || batch.len() != states.len() {
            return Err(Error::backend(format!(
                "Mismatched traversal batch: {} queries, {} radii, {} states",
                batch.len(),
                radii.len(),
                states.len()
            )));
        }

        Ok(states
            .par_iter_mut()
            .zip(batch.par_iter().zip(radii.par_iter()))
            .map(|(state, (&q, &radius))| next_leaf(tree, queries.row(q), radius, state))
            .collect())
    }

    fn brute_force(&self, chunk: &StagedChunk<F>, queries: &PatternStore<F>, jobs: &[BruteJob], k: usize) -> Result<Vec<TopK<F>>> {
        let ChunkDescriptor { start, end } = chunk.descriptor;
        if let Some(job) = jobs.iter().find(|j| j.from < start || j.to > end || j.from > j.to) {
            return Err(Error::backend(format!(
                "Job [{}, {}) for query {} lies outside the staged chunk [{start}, {end})",
                job.from, job.to, job.query
            )));
        }

        Ok(jobs
            .par_iter()
            .map(|&BruteJob { query, from, to }| {
                let q = queries.row(query);
                let mut top = TopK::new(k);
                for i in from..to {
                    top.insert(euclidean_sq(q, chunk.row(i)), i);
                }
                top
            })
            .collect())
    }
}
