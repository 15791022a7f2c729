//! Parameters of a buffer k-d tree and how they are validated.

use std::str::FromStr;

use crate::{Error, Result};

/// The largest number of neighbors a query may ask for.
pub const MAX_NEIGHBORS: usize = 100;
/// The shallowest tree that may be built.
pub const MIN_TREE_DEPTH: usize = 2;
/// The deepest tree that may be built.
pub const MAX_TREE_DEPTH: usize = 50;
/// The largest number of worker threads.
pub const MAX_THREADS: usize = 10_000;
/// The largest initial leaf buffer capacity, which is also the default capacity of the shallowest tree.
pub const MAX_LEAF_BUFFER_CAPACITY: usize = 1 << 22;
/// The largest batch factor.
pub const MAX_BATCH_FACTOR: usize = 1 << 10;

/// How the splitting axis of a tree node is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum SplittingPolicy {
    /// The axis is `depth mod d`.
    #[default]
    #[serde(rename = "cyclic")]
    Cyclic,
    /// The axis with the largest extent of the bounding box of the node's patterns.
    #[serde(rename = "longest", alias = "longest-box")]
    LongestBox,
}

impl core::fmt::Display for SplittingPolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Cyclic => write!(f, "cyclic"),
            Self::LongestBox => write!(f, "longest"),
        }
    }
}

impl FromStr for SplittingPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cyclic" => Ok(Self::Cyclic),
            "longest" | "longest-box" | "longest_box" => Ok(Self::LongestBox),
            _ => Err(Error::config(format!("Unknown splitting policy: '{s}'. Use 'cyclic' or 'longest'."))),
        }
    }
}

/// The parameters of a buffer k-d tree.
///
/// All fields have defaults (see [`Parameters::default`]) and can be set with the `with_*` methods. Deserializing from JSON fills in missing fields with
/// their defaults. Nothing is checked until [`Parameters::validate`] is called, which happens before any index is built.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// The number of nearest neighbors to find when no other number is given.
    pub n_neighbors: usize,
    /// The depth of the tree, i.e. the tree has `2^tree_depth` leaves.
    pub tree_depth: usize,
    /// The number of worker threads used while querying.
    pub num_threads: usize,
    /// How the splitting axis of each node is chosen.
    pub splitting: SplittingPolicy,
    /// The number of chunks the training patterns are split into for brute-force work.
    pub n_train_chunks: usize,
    /// The fraction of working memory a single training chunk may occupy.
    pub allowed_train_mem_percent_chunk: f64,
    /// The fraction of working memory the query working set may occupy.
    pub allowed_test_mem_percent: f64,
    /// Once no new queries remain and fewer than this many queries are waiting to resume, those queries are brute-forced against all patterns.
    pub bf_remaining_threshold: usize,
    /// Overrides the initial capacity of each leaf buffer.
    pub leaf_buffer_capacity: Option<usize>,
    /// The fill fraction of a leaf buffer that triggers draining all buffers.
    pub buffer_threshold: f64,
    /// The number of queries advanced per round, as a multiple of the leaf buffer capacity.
    pub batch_factor: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            n_neighbors: 10,
            tree_depth: 8,
            num_threads: 1,
            splitting: SplittingPolicy::Cyclic,
            n_train_chunks: 1,
            allowed_train_mem_percent_chunk: 0.2,
            allowed_test_mem_percent: 0.8,
            bf_remaining_threshold: 8192,
            leaf_buffer_capacity: None,
            buffer_threshold: 0.9,
            batch_factor: 10,
        }
    }
}

impl Parameters {
    /// Sets the default number of neighbors.
    #[must_use]
    pub const fn with_n_neighbors(mut self, n_neighbors: usize) -> Self {
        self.n_neighbors = n_neighbors;
        self
    }

    /// Sets the depth of the tree.
    #[must_use]
    pub const fn with_tree_depth(mut self, tree_depth: usize) -> Self {
        self.tree_depth = tree_depth;
        self
    }

    /// Sets the number of worker threads.
    #[must_use]
    pub const fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Sets the splitting policy.
    #[must_use]
    pub const fn with_splitting(mut self, splitting: SplittingPolicy) -> Self {
        self.splitting = splitting;
        self
    }

    /// Sets the requested number of training chunks.
    #[must_use]
    pub const fn with_n_train_chunks(mut self, n_train_chunks: usize) -> Self {
        self.n_train_chunks = n_train_chunks;
        self
    }

    /// Sets the memory fractions for one training chunk and for the query working set.
    #[must_use]
    pub const fn with_memory_fractions(mut self, train_chunk: f64, test: f64) -> Self {
        self.allowed_train_mem_percent_chunk = train_chunk;
        self.allowed_test_mem_percent = test;
        self
    }

    /// Sets the size below which the remaining queries are brute-forced against all patterns.
    #[must_use]
    pub const fn with_bf_remaining_threshold(mut self, threshold: usize) -> Self {
        self.bf_remaining_threshold = threshold;
        self
    }

    /// Overrides the initial capacity of each leaf buffer.
    #[must_use]
    pub const fn with_leaf_buffer_capacity(mut self, capacity: usize) -> Self {
        self.leaf_buffer_capacity = Some(capacity);
        self
    }

    /// Sets the fill fraction of a leaf buffer that triggers a drain.
    #[must_use]
    pub const fn with_buffer_threshold(mut self, threshold: f64) -> Self {
        self.buffer_threshold = threshold;
        self
    }

    /// Sets the batch size as a multiple of the leaf buffer capacity.
    #[must_use]
    pub const fn with_batch_factor(mut self, factor: usize) -> Self {
        self.batch_factor = factor;
        self
    }

    /// Checks every parameter against its allowed range.
    ///
    /// # Errors
    ///
    /// - If `n_neighbors` is not in `1..=100`.
    /// - If `tree_depth` is not in `2..=50`.
    /// - If `num_threads` is not in `1..=10000`.
    /// - If `n_train_chunks` is zero.
    /// - If either memory fraction is negative or not finite, or if they sum to more than one.
    /// - If `buffer_threshold` is not in `(0, 1]`.
    /// - If `batch_factor` is not in `1..=1024`.
    /// - If an overridden `leaf_buffer_capacity` is not in `1..=2^22`.
    pub fn validate(&self) -> Result<()> {
        check_k(self.n_neighbors)?;

        if !(MIN_TREE_DEPTH..=MAX_TREE_DEPTH).contains(&self.tree_depth) {
            return Err(Error::config(format!(
                "tree_depth must be in [{MIN_TREE_DEPTH}, {MAX_TREE_DEPTH}], got {}",
                self.tree_depth
            )));
        }

        if !(1..=MAX_THREADS).contains(&self.num_threads) {
            return Err(Error::config(format!(
                "num_threads must be in [1, {MAX_THREADS}], got {}",
                self.num_threads
            )));
        }

        if self.n_train_chunks == 0 {
            return Err(Error::config("n_train_chunks must be at least 1"));
        }

        let (train, test) = (self.allowed_train_mem_percent_chunk, self.allowed_test_mem_percent);
        if !train.is_finite() || !test.is_finite() || train < 0.0 || test < 0.0 {
            return Err(Error::config(format!(
                "Memory fractions must be finite and non-negative, got {train} and {test}"
            )));
        }
        if train + test > 1.0 + 1e-5 {
            return Err(Error::config(format!(
                "Memory fractions may not sum to more than 1, got {train} + {test}"
            )));
        }

        if !(self.buffer_threshold > 0.0 && self.buffer_threshold <= 1.0) {
            return Err(Error::config(format!(
                "buffer_threshold must be in (0, 1], got {}",
                self.buffer_threshold
            )));
        }

        if !(1..=MAX_BATCH_FACTOR).contains(&self.batch_factor) {
            return Err(Error::config(format!(
                "batch_factor must be in [1, {MAX_BATCH_FACTOR}], got {}",
                self.batch_factor
            )));
        }

        if let Some(capacity) = self.leaf_buffer_capacity
            && !(1..=MAX_LEAF_BUFFER_CAPACITY).contains(&capacity)
        {
            return Err(Error::config(format!(
                "leaf_buffer_capacity must be in [1, {MAX_LEAF_BUFFER_CAPACITY}], got {capacity}"
            )));
        }

        Ok(())
    }
}

/// Checks that a number of neighbors is in `1..=100`.
///
/// # Errors
///
/// If `k` is out of range.
pub fn check_k(k: usize) -> Result<()> {
    if (1..=MAX_NEIGHBORS).contains(&k) {
        Ok(())
    } else {
        Err(Error::config(format!("The number of neighbors must be in [1, {MAX_NEIGHBORS}], got {k}")))
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::{Parameters, SplittingPolicy};
    use crate::Error;

    #[test]
    fn defaults_are_valid() {
        let params = Parameters::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.n_neighbors, 10);
        assert_eq!(params.tree_depth, 8);
        assert_eq!(params.bf_remaining_threshold, 8192);
    }

    #[test_case(Parameters::default().with_n_neighbors(0); "k zero")]
    #[test_case(Parameters::default().with_n_neighbors(101); "k too large")]
    #[test_case(Parameters::default().with_tree_depth(1); "depth too small")]
    #[test_case(Parameters::default().with_tree_depth(51); "depth too large")]
    #[test_case(Parameters::default().with_num_threads(0); "no threads")]
    #[test_case(Parameters::default().with_n_train_chunks(0); "no chunks")]
    #[test_case(Parameters::default().with_memory_fractions(-0.1, 0.5); "negative fraction")]
    #[test_case(Parameters::default().with_memory_fractions(0.5, 0.6); "fractions over one")]
    #[test_case(Parameters::default().with_buffer_threshold(0.0); "zero threshold")]
    #[test_case(Parameters::default().with_buffer_threshold(1.5); "threshold over one")]
    #[test_case(Parameters::default().with_batch_factor(0); "zero batch factor")]
    #[test_case(Parameters::default().with_batch_factor(usize::MAX / 2); "huge batch factor")]
    #[test_case(Parameters::default().with_leaf_buffer_capacity(0); "zero capacity")]
    #[test_case(Parameters::default().with_leaf_buffer_capacity(usize::MAX); "huge capacity")]
    fn rejected(params: Parameters) {
        assert!(matches!(params.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn splitting_from_str() {
        assert_eq!("cyclic".parse::<SplittingPolicy>(), Ok(SplittingPolicy::Cyclic));
        assert_eq!("Longest".parse::<SplittingPolicy>(), Ok(SplittingPolicy::LongestBox));
        assert!(matches!("median".parse::<SplittingPolicy>(), Err(Error::Configuration(_))));
    }

    #[test]
    fn partial_json_uses_defaults() -> Result<(), String> {
        let params: Parameters =
            serde_json::from_str(r#"{ "tree_depth": 4, "splitting": "longest" }"#).map_err(|e| e.to_string())?;
        assert_eq!(params.tree_depth, 4);
        assert_eq!(params.splitting, SplittingPolicy::LongestBox);
        assert_eq!(params.n_neighbors, 10);
        assert_eq!(params.leaf_buffer_capacity, None);
        Ok(())
    }
}
