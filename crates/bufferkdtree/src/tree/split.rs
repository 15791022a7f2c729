//! Choosing a splitting axis and partitioning patterns around the median.

use crate::{FloatValue, SplittingPolicy, utils::kth_smallest};

use super::Pattern;

/// Chooses the axis along which the patterns of a node are split.
///
/// With [`SplittingPolicy::LongestBox`], this is the axis with the largest extent of the bounding box of `patterns`; the first such axis wins ties. If every
/// axis has zero extent, or there are no patterns, we fall back to the cyclic axis.
pub fn choose_axis<F: FloatValue>(patterns: &[Pattern<F>], depth: usize, dim: usize, policy: SplittingPolicy) -> usize {
    let cyclic = depth % dim;
    match policy {
        SplittingPolicy::Cyclic => cyclic,
        SplittingPolicy::LongestBox => {
            let Some((first, rest)) = patterns.split_first() else {
                return cyclic;
            };

            let mut lower = first.coordinates.clone();
            let mut upper = first.coordinates.clone();
            for p in rest {
                for ((lo, hi), &v) in lower.iter_mut().zip(upper.iter_mut()).zip(&p.coordinates) {
                    if v < *lo {
                        *lo = v;
                    }
                    if v > *hi {
                        *hi = v;
                    }
                }
            }

            let (mut axis, mut extent) = (cyclic, F::zero());
            for (a, (&lo, &hi)) in lower.iter().zip(&upper).enumerate() {
                if hi - lo > extent {
                    axis = a;
                    extent = hi - lo;
                }
            }
            axis
        }
    }
}

/// Partitions `patterns` around the median of their coordinate along `axis`.
///
/// Returns the median, used as the threshold of the node, and the split position `count / 2`. After the call, every pattern left of the split position has
/// a coordinate no greater than the threshold and every pattern from the split position onwards has a coordinate no smaller than it. Patterns with a
/// coordinate equal to the threshold come first on the right side.
pub fn partition_at_median<F: FloatValue>(patterns: &mut [Pattern<F>], axis: usize) -> (F, usize) {
    let count = patterns.len();
    let mid = count / 2;
    if count == 0 {
        return (F::zero(), 0);
    }

    let mut values = patterns.iter().map(|p| p.coordinates[axis]).collect::<Vec<_>>();
    let pivot = kth_smallest(&mut values, count, mid);

    // Three-way partition: [< pivot | == pivot | > pivot].
    let (mut lo, mut i, mut hi) = (0, 0, count);
    while i < hi {
        let v = patterns[i].coordinates[axis];
        if v < pivot {
            patterns.swap(lo, i);
            lo += 1;
            i += 1;
        } else if v > pivot {
            hi -= 1;
            patterns.swap(i, hi);
        } else {
            i += 1;
        }
    }

    ftlog::debug!("Split {count} patterns on axis {axis} at {pivot}: {lo} below, {} equal", hi - lo);

    (pivot, mid)
}

#[cfg(test)]
mod tests {
    use super::{choose_axis, partition_at_median};
    use crate::{SplittingPolicy, tree::Pattern};

    fn patterns(rows: &[[f64; 2]]) -> Vec<Pattern<f64>> {
        rows.iter()
            .enumerate()
            .map(|(i, r)| Pattern {
                coordinates: r.to_vec(),
                original_index: i,
            })
            .collect()
    }

    #[test]
    fn axis_choice() {
        let ps = patterns(&[[0.0, 0.0], [1.0, 5.0], [2.0, -1.0]]);
        assert_eq!(choose_axis(&ps, 3, 2, SplittingPolicy::Cyclic), 1);
        assert_eq!(choose_axis(&ps, 0, 2, SplittingPolicy::LongestBox), 1);

        let tie = patterns(&[[0.0, 0.0], [3.0, 3.0]]);
        assert_eq!(choose_axis(&tie, 1, 2, SplittingPolicy::LongestBox), 0);

        let point = patterns(&[[1.0, 1.0], [1.0, 1.0]]);
        assert_eq!(choose_axis(&point, 1, 2, SplittingPolicy::LongestBox), 1);
    }

    #[test]
    fn median_partition_with_ties() {
        let mut ps = patterns(&[[3.0, 0.0], [1.0, 0.0], [3.0, 0.0], [0.0, 0.0], [3.0, 0.0], [5.0, 0.0], [2.0, 0.0]]);
        let (threshold, mid) = partition_at_median(&mut ps, 0);

        assert_eq!(threshold, 3.0);
        assert_eq!(mid, 3);
        assert!(ps[..mid].iter().all(|p| p.coordinates[0] <= threshold));
        assert!(ps[mid..].iter().all(|p| p.coordinates[0] >= threshold));
        assert_eq!(ps[mid].coordinates[0], threshold);

        let mut ids = ps.iter().map(|p| p.original_index).collect::<Vec<_>>();
        ids.sort_unstable();
        assert_eq!(ids, (0..7).collect::<Vec<_>>());
    }
}
