//! Row-major storage of patterns.

use ndarray::ArrayView2;

use crate::{Error, FloatValue, Result};

/// A single training pattern together with its row in the matrix it came from.
///
/// Patterns are only used while the tree is built. Afterwards they are flattened into a [`PatternStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern<F> {
    /// The coordinates of the pattern.
    pub coordinates: Vec<F>,
    /// The row of the pattern in the input matrix.
    pub original_index: usize,
}

/// A flat row-major buffer of `len` patterns in `dim` dimensions with the original row of each pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternStore<F> {
    /// The dimensionality of every pattern.
    dim: usize,
    /// The coordinates, `dim` values per pattern.
    coordinates: Vec<F>,
    /// The original row of every pattern.
    original_indices: Vec<usize>,
}

impl<F: FloatValue> PatternStore<F> {
    /// Reads the rows of a matrix into typed patterns.
    ///
    /// # Errors
    ///
    /// - If the matrix has no rows or no columns.
    /// - If any coordinate is not finite.
    pub fn patterns_from_array(data: ArrayView2<F>) -> Result<Vec<Pattern<F>>> {
        let (n, d) = data.dim();
        if n == 0 {
            return Err(Error::config("Cannot build an index over zero patterns"));
        }
        if d == 0 {
            return Err(Error::config("Patterns must have at least one dimension"));
        }

        data.outer_iter()
            .enumerate()
            .map(|(i, row)| {
                if row.iter().all(|v| v.is_finite()) {
                    Ok(Pattern {
                        coordinates: row.to_vec(),
                        original_index: i,
                    })
                } else {
                    Err(Error::config(format!("Pattern {i} has a non-finite coordinate")))
                }
            })
            .collect()
    }

    /// Flattens patterns, in their current order, into a store.
    #[must_use]
    pub fn from_patterns(patterns: Vec<Pattern<F>>, dim: usize) -> Self {
        let mut coordinates = Vec::with_capacity(patterns.len() * dim);
        let mut original_indices = Vec::with_capacity(patterns.len());
        for Pattern {
            coordinates: row,
            original_index,
        } in patterns
        {
            coordinates.extend(row);
            original_indices.push(original_index);
        }
        Self {
            dim,
            coordinates,
            original_indices,
        }
    }

    /// Copies a matrix into a store, keeping the row order.
    ///
    /// # Errors
    ///
    /// See [`PatternStore::patterns_from_array`].
    pub fn from_array(data: ArrayView2<F>) -> Result<Self> {
        let dim = data.ncols();
        Self::patterns_from_array(data).map(|patterns| Self::from_patterns(patterns, dim))
    }

    /// Returns the number of patterns.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.original_indices.len()
    }

    /// Returns whether the store holds no patterns.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.original_indices.is_empty()
    }

    /// Returns the dimensionality of the patterns.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Returns the coordinates of the `i`-th pattern.
    #[must_use]
    pub fn row(&self, i: usize) -> &[F] {
        &self.coordinates[i * self.dim..(i + 1) * self.dim]
    }

    /// Returns the coordinates of the patterns in `[start, end)` as one flat slice.
    #[must_use]
    pub fn rows(&self, start: usize, end: usize) -> &[F] {
        &self.coordinates[start * self.dim..end * self.dim]
    }

    /// Returns the original row of the `i`-th pattern.
    #[must_use]
    pub fn original_index(&self, i: usize) -> usize {
        self.original_indices[i]
    }

    /// Returns the original rows of all patterns.
    #[must_use]
    pub fn original_indices(&self) -> &[usize] {
        &self.original_indices
    }

    /// Returns an iterator over `(position, coordinates)` of all patterns.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[F])> + '_ {
        self.coordinates.chunks_exact(self.dim).enumerate()
    }
}
