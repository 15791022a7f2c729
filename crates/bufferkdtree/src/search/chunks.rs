//! Brute-force work over a training set that is staged in chunks.

use crate::{
    Error, FloatValue, PatternStore, Result,
    backend::{BruteJob, ChunkDescriptor, ComputeBackend, StagedChunk},
    utils::TopK,
};

/// Runs batches of brute-force jobs over every chunk of the sorted patterns.
///
/// There are two chunk slots. While the backend works on the chunk in the front slot, the next chunk is staged into the other one. After the last chunk,
/// the first chunk has been staged again and is ready for the next batch. With a single chunk nothing is ever restaged.
pub struct ChunkExecutor<'a, F, B> {
    /// The backend doing the work.
    backend: &'a B,
    /// The sorted patterns the chunks are taken from.
    store: &'a PatternStore<F>,
    /// The chunks, in order.
    chunks: &'a [ChunkDescriptor],
    /// The chunk ready for computation.
    front: Option<StagedChunk<F>>,
    /// The number of chunks staged so far.
    stagings: usize,
}

impl<'a, F: FloatValue, B: ComputeBackend<F>> ChunkExecutor<'a, F, B> {
    /// Stages the first chunk.
    ///
    /// # Errors
    ///
    /// - If there are no chunks.
    /// - If the backend fails to stage the first chunk.
    pub fn new(backend: &'a B, store: &'a PatternStore<F>, chunks: &'a [ChunkDescriptor]) -> Result<Self> {
        let first = chunks.first().ok_or_else(|| Error::backend("There are no training chunks to stage"))?;
        let front = backend.stage_chunk(store, *first)?;
        Ok(Self {
            backend,
            store,
            chunks,
            front: Some(front),
            stagings: 1,
        })
    }

    /// Returns the number of chunks staged so far.
    #[must_use]
    pub const fn stagings(&self) -> usize {
        self.stagings
    }

    /// Brute-forces every job against every chunk and merges the partial results into `results`.
    ///
    /// Each job is restricted to the part of its range that lies inside the current chunk and skipped if that part is empty. No two jobs may share a
    /// query.
    ///
    /// # Errors
    ///
    /// If the backend fails to compute or stage a chunk.
    pub fn run(&mut self, queries: &PatternStore<F>, jobs: &[BruteJob], k: usize, results: &mut [TopK<F>]) -> Result<()> {
        if jobs.is_empty() {
            return Ok(());
        }

        let n_chunks = self.chunks.len();
        for i in 0..n_chunks {
            let current = self.front.take().ok_or_else(|| Error::backend("No training chunk is staged"))?;
            let clipped = clip_jobs(jobs, current.descriptor);

            let (partials, staged) = if n_chunks > 1 {
                let next = self.chunks[(i + 1) % n_chunks];
                let (partials, staged) = rayon::join(
                    || self.backend.brute_force(&current, queries, &clipped, k),
                    || self.backend.stage_chunk(self.store, next),
                );
                self.stagings += 1;
                (partials?, staged?)
            } else {
                (self.backend.brute_force(&current, queries, &clipped, k)?, current)
            };

            if partials.len() != clipped.len() {
                return Err(Error::backend(format!(
                    "Backend returned {} results for {} jobs",
                    partials.len(),
                    clipped.len()
                )));
            }
            for (job, partial) in clipped.iter().zip(&partials) {
                results[job.query].merge(partial);
            }

            self.front = Some(staged);
        }

        Ok(())
    }
}

/// Restricts every job to the given chunk, dropping jobs that do not overlap it.
#[must_use]
pub fn clip_jobs(jobs: &[BruteJob], chunk: ChunkDescriptor) -> Vec<BruteJob> {
    jobs.iter()
        .filter_map(|job| {
            chunk
                .intersect(job.from, job.to)
                .map(|(from, to)| BruteJob { query: job.query, from, to })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::clip_jobs;
    use crate::backend::{BruteJob, ChunkDescriptor};

    #[test]
    fn clipping_is_exhaustive_and_disjoint() {
        let chunks = [
            ChunkDescriptor { start: 0, end: 34 },
            ChunkDescriptor { start: 34, end: 68 },
            ChunkDescriptor { start: 68, end: 100 },
        ];
        for (from, to) in [(0, 100), (10, 20), (30, 40), (33, 69), (68, 68), (99, 100), (0, 34)] {
            let job = [BruteJob { query: 0, from, to }];
            let mut covered = chunks
                .iter()
                .flat_map(|&c| clip_jobs(&job, c))
                .flat_map(|j| j.from..j.to)
                .collect::<Vec<_>>();
            covered.sort_unstable();
            assert_eq!(covered, (from..to).collect::<Vec<_>>(), "[{from}, {to})");
        }
    }

    #[test]
    fn leaf_spanning_a_whole_chunk() {
        let chunk = ChunkDescriptor { start: 40, end: 60 };
        let clipped = clip_jobs(&[BruteJob { query: 3, from: 10, to: 90 }], chunk);
        assert_eq!(clipped, vec![BruteJob { query: 3, from: 40, to: 60 }]);
    }
}
