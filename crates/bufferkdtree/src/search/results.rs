//! Final, user-facing results of a k-nearest-neighbor query.

use ndarray::{Array2, s};

use crate::{Error, FloatValue, PatternStore, Result, utils::TopK};

/// The `k` nearest neighbors of every query.
///
/// Row `i` of both arrays belongs to query `i`. Distances are Euclidean and non-decreasing along each row; indices are rows of the training matrix the
/// index was fitted on.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbors<F> {
    /// The `m × k` distances.
    pub distances: Array2<F>,
    /// The `m × k` training rows.
    pub indices: Array2<usize>,
}

impl<F: FloatValue> Neighbors<F> {
    /// Returns results for zero queries.
    #[must_use]
    pub fn empty(k: usize) -> Self {
        Self {
            distances: Array2::from_elem((0, k), F::zero()),
            indices: Array2::zeros((0, k)),
        }
    }

    /// Returns the number of queries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.nrows()
    }

    /// Returns whether there are no queries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.nrows() == 0
    }

    /// Returns the number of neighbors per query.
    #[must_use]
    pub fn k(&self) -> usize {
        self.indices.ncols()
    }

    /// Returns the `(index, distance)` pairs of query `i`.
    #[must_use]
    pub fn row(&self, i: usize) -> Vec<(usize, F)> {
        self.indices.row(i).iter().copied().zip(self.distances.row(i).iter().copied()).collect()
    }

    /// Drops the first neighbor of every query.
    #[must_use]
    pub fn without_first_column(self) -> Self {
        Self {
            distances: self.distances.slice(s![.., 1..]).to_owned(),
            indices: self.indices.slice(s![.., 1..]).to_owned(),
        }
    }
}

/// Accumulates finalized rows from one or more query sessions.
#[derive(Debug)]
pub struct ResultCollector<F> {
    /// The number of neighbors per query.
    k: usize,
    /// Row-major distances.
    distances: Vec<F>,
    /// Row-major training rows.
    indices: Vec<usize>,
}

impl<F: FloatValue> ResultCollector<F> {
    /// Creates a collector for `m` queries with `k` neighbors each.
    #[must_use]
    pub fn new(m: usize, k: usize) -> Self {
        Self {
            k,
            distances: Vec::with_capacity(m * k),
            indices: Vec::with_capacity(m * k),
        }
    }

    /// Finalizes the working results of one session: takes square roots and maps sorted positions back to training rows.
    pub fn extend(&mut self, results: &[TopK<F>], store: &PatternStore<F>) {
        for top in results {
            for (i, d) in top.iter() {
                self.distances.push(d.sqrt());
                self.indices.push(store.original_index(i));
            }
        }
    }

    /// Builds the final arrays.
    ///
    /// # Errors
    ///
    /// If the collected rows do not all have `k` entries.
    pub fn finish(self) -> Result<Neighbors<F>> {
        let m = self.indices.len() / self.k;
        let distances = Array2::from_shape_vec((m, self.k), self.distances).map_err(|e| Error::backend(e.to_string()))?;
        let indices = Array2::from_shape_vec((m, self.k), self.indices).map_err(|e| Error::backend(e.to_string()))?;
        Ok(Neighbors { distances, indices })
    }
}
