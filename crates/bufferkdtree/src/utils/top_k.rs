//! A fixed-capacity, sorted list of the best `k` candidates seen so far.

use crate::FloatValue;

/// A fixed-capacity list of `(distance, index)` pairs kept sorted in non-decreasing order of distance.
///
/// This is the bookkeeping for the `k` nearest neighbors of one query. Empty slots hold a distance of `+∞` and an index of `0`, so the `k`-th best
/// distance ([`TopK::kth`]) is `+∞` until `k` candidates have been seen.
///
/// # Type Parameters
///
/// - `T`: The type of the distance values.
#[derive(Debug, Clone, PartialEq)]
pub struct TopK<T> {
    /// The distances, sorted in non-decreasing order.
    distances: Vec<T>,
    /// The indices paired with `distances`.
    indices: Vec<usize>,
}

impl<T: FloatValue> TopK<T> {
    /// Creates a new `TopK` with capacity `k` where every slot is empty.
    ///
    /// The user must ensure that `k > 0`.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            distances: vec![T::infinity(); k],
            indices: vec![0; k],
        }
    }

    /// Returns the capacity `k`.
    #[must_use]
    pub const fn k(&self) -> usize {
        self.indices.len()
    }

    /// Returns the `k`-th best distance seen so far, i.e. the pruning radius.
    #[must_use]
    pub fn kth(&self) -> T {
        self.distances[self.distances.len() - 1]
    }

    /// Returns the distances in non-decreasing order.
    #[must_use]
    pub fn distances(&self) -> &[T] {
        &self.distances
    }

    /// Returns the indices paired with [`TopK::distances`].
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Returns an iterator over the `(index, distance)` pairs in non-decreasing order of distance.
    pub fn iter(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        self.indices.iter().copied().zip(self.distances.iter().copied())
    }

    /// Empties every slot.
    pub fn reset(&mut self) {
        self.distances.fill(T::infinity());
        self.indices.fill(0);
    }

    /// Offers a candidate to the list.
    ///
    /// The candidate is rejected outright if its distance is no smaller than the current `k`-th best. Otherwise it replaces the last slot and is bubbled
    /// to the left until the list is sorted again. Returns whether the candidate was admitted.
    pub fn insert(&mut self, distance: T, index: usize) -> bool {
        let mut j = self.distances.len() - 1;
        if self.distances[j] <= distance {
            return false;
        }

        self.distances[j] = distance;
        self.indices[j] = index;
        while j > 0 && self.distances[j] < self.distances[j - 1] {
            self.distances.swap(j, j - 1);
            self.indices.swap(j, j - 1);
            j -= 1;
        }

        true
    }

    /// Merges another sorted list of the same capacity into this one.
    ///
    /// This walks both lists from the front, taking the strictly smaller head each time, until `k` entries have been produced. On ties the entry already
    /// in `self` wins.
    pub fn merge(&mut self, other: &Self) {
        let k = self.k();
        let (mut ours, mut theirs) = (0, 0);
        let mut distances = Vec::with_capacity(k);
        let mut indices = Vec::with_capacity(k);

        for _ in 0..k {
            if other.distances[theirs] < self.distances[ours] {
                distances.push(other.distances[theirs]);
                indices.push(other.indices[theirs]);
                theirs += 1;
            } else {
                distances.push(self.distances[ours]);
                indices.push(self.indices[ours]);
                ours += 1;
            }
        }

        self.distances = distances;
        self.indices = indices;
    }
}
