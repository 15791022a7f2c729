//! Utility functions for the crate. Intended for private use, but made public for testing.

mod float_value;
mod ring_buffer;
mod selection;
mod top_k;

pub use float_value::{FloatValue, euclidean_sq};
pub use ring_buffer::RingBuffer;
pub use selection::{kth_smallest, kth_smallest_index};
pub use top_k::TopK;

/// Returns `⌊log2 n⌋` for `n > 0` and `0` for `n == 0`.
#[must_use]
pub const fn floor_log2(n: usize) -> usize {
    if n == 0 { 0 } else { n.ilog2() as usize }
}
