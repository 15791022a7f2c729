//! Selection of the k-th smallest element of a slice.

/// Finds the `k`-th smallest (0-indexed) among the first `n` elements of `values` and returns it.
///
/// This is Wirth's variant of Hoare's selection algorithm. It runs in expected linear time and reorders the first `n` elements of `values` in place so
/// that every element left of position `k` is no greater than the returned value and every element right of it is no smaller.
///
/// The user must ensure that `k < n <= values.len()` and that the values are totally ordered (e.g. no NaNs).
pub fn kth_smallest<T: PartialOrd + Copy>(values: &mut [T], n: usize, k: usize) -> T {
    values[kth_smallest_index(values, n, k)]
}

/// Same as [`kth_smallest`] but returns the position, which is always `k`, after reordering.
#[expect(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn kth_smallest_index<T: PartialOrd + Copy>(values: &mut [T], n: usize, k: usize) -> usize {
    let target = k as isize;
    let (mut lo, mut hi) = (0_isize, n as isize - 1);

    while lo < hi {
        let pivot = values[k];
        let (mut i, mut j) = (lo, hi);
        loop {
            while values[i as usize] < pivot {
                i += 1;
            }
            while pivot < values[j as usize] {
                j -= 1;
            }
            if i <= j {
                values.swap(i as usize, j as usize);
                i += 1;
                j -= 1;
            }
            if i > j {
                break;
            }
        }
        if j < target {
            lo = i;
        }
        if target < i {
            hi = j;
        }
    }

    k
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::kth_smallest;

    #[test]
    fn median_of_five() {
        let mut values = [7, 2, 9, 4, 1];
        assert_eq!(kth_smallest(&mut values, 5, 2), 4);
    }

    #[test_case(&[3.0, 1.0, 2.0], 0, 1.0; "min")]
    #[test_case(&[3.0, 1.0, 2.0], 2, 3.0; "max")]
    #[test_case(&[5.0, 5.0, 5.0, 5.0], 1, 5.0; "all equal")]
    #[test_case(&[2.0, 1.0, 2.0, 1.0, 2.0, 1.0], 3, 2.0; "duplicates")]
    #[test_case(&[0.5], 0, 0.5; "singleton")]
    fn kth(values: &[f64], k: usize, expected: f64) {
        let mut values = values.to_vec();
        let n = values.len();
        assert_eq!(kth_smallest(&mut values, n, k), expected);
        assert!(values[..k].iter().all(|&v| v <= expected));
        assert!(values[k + 1..].iter().all(|&v| v >= expected));
    }

    #[test]
    fn matches_sorting() {
        let values = (0..257_u64).map(|i| (i * 7919) % 263).collect::<Vec<_>>();
        let mut sorted = values.clone();
        sorted.sort_unstable();
        for k in [0, 1, 64, 128, 200, 256] {
            let mut scratch = values.clone();
            assert_eq!(kth_smallest(&mut scratch, values.len(), k), sorted[k], "k = {k}");
        }
    }

    #[test]
    fn only_prefix_is_touched() {
        let mut values = [9, 8, 7, 1, 0];
        assert_eq!(kth_smallest(&mut values, 3, 1), 8);
        assert_eq!(&values[3..], &[1, 0]);
    }
}
