//! Data generation utilities for testing.

use ndarray::Array2;
use rand::prelude::*;

pub fn tabular(car: usize, dim: usize, min: f32, max: f32, seed: u64) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_simple_fn((car, dim), || rng.random_range(min..max))
}

pub fn tabular_f64(car: usize, dim: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_simple_fn((car, dim), || rng.random_range(-1.0..1.0))
}

/// A grid of integer points in the square `[0, side)²`, with many equal coordinates per axis.
#[allow(clippy::cast_precision_loss)]
pub fn grid(side: usize) -> Array2<f32> {
    Array2::from_shape_fn((side * side, 2), |(i, j)| if j == 0 { (i / side) as f32 } else { (i % side) as f32 })
}
