#![allow(dead_code)]

pub mod data_gen;

use bufferkdtree::Neighbors;
use float_eq::assert_float_eq;

/// Asserts that the buffered results match the `(index, distance)` rows of a reference search.
pub fn check_neighbors(expected: &[Vec<(usize, f32)>], actual: &Neighbors<f32>, alg_name: &str) {
    assert_eq!(expected.len(), actual.len(), "{alg_name}: Query count mismatch");

    for (q, exp) in expected.iter().enumerate() {
        let got = actual.row(q);
        assert_eq!(exp.len(), got.len(), "{alg_name}: Hit count mismatch for query {q}: \nexp {exp:?}, \ngot {got:?}");

        for (i, (&(ei, ed), &(ai, ad))) in exp.iter().zip(got.iter()).enumerate() {
            assert_eq!(ei, ai, "{alg_name}: Index mismatch for query {q} at {i}: \nexp {exp:?}, \ngot {got:?}");
            assert_float_eq!(ed, ad, abs <= 1e-6, "{alg_name}: Distance mismatch for query {q} at {i}");
        }
    }
}
