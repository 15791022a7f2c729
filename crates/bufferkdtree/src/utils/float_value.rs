//! A trait for the floating-point types used as coordinates and distances.

use core::fmt::{Debug, Display};

/// A trait for types that can be used as coordinates and distance values in the buffer k-d tree.
///
/// We provide a blanket implementation for all types that satisfy the trait bounds. In practice, this means `f32` and `f64`.
#[must_use]
pub trait FloatValue:
    PartialEq
    + PartialOrd
    + Copy
    + Display
    + Debug
    + Default
    + Send
    + Sync
    + num_traits::Float
    + num_traits::NumAssignOps
    + num_traits::ToPrimitive
    + num_traits::FromPrimitive
    + std::iter::Sum
    + 'static
{
    /// Returns the square of the value.
    #[must_use]
    fn squared(self) -> Self {
        self * self
    }

    /// The number of bytes a single value occupies in working memory.
    #[must_use]
    fn byte_size() -> usize {
        core::mem::size_of::<Self>()
    }
}

/// Blanket implementation of `FloatValue` for all types that satisfy the trait bounds.
impl<T> FloatValue for T where
    T: PartialEq
        + PartialOrd
        + Copy
        + Display
        + Debug
        + Default
        + Send
        + Sync
        + num_traits::Float
        + num_traits::NumAssignOps
        + num_traits::ToPrimitive
        + num_traits::FromPrimitive
        + std::iter::Sum
        + 'static
{
}

/// Squared Euclidean distance between two vectors of the same dimensionality.
pub fn euclidean_sq<T: FloatValue>(x: &[T], y: &[T]) -> T {
    x.iter().zip(y).map(|(&a, &b)| (a - b).squared()).fold(T::zero(), |acc, v| acc + v)
}
