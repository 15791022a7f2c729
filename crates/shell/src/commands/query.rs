//! Fitting an index and answering queries.

use std::path::Path;

use bufferkdtree::{BufferKdTree, Neighbors, Parameters, QueryStats, SplittingPolicy};
use ndarray::Array2;

/// Command-line values that override the parameters read from a config file.
#[derive(clap::Args, Debug, Default)]
pub struct Overrides {
    /// The number of nearest neighbors to find.
    #[arg(short('k'), long)]
    k: Option<usize>,

    /// The depth of the tree.
    #[arg(short('t'), long)]
    tree_depth: Option<usize>,

    /// How the splitting axis of each node is chosen: cyclic or longest.
    #[arg(long)]
    splitting: Option<SplittingPolicy>,

    /// The number of chunks the training patterns are split into.
    #[arg(long)]
    n_train_chunks: Option<usize>,

    /// The number of worker threads.
    #[arg(long)]
    num_threads: Option<usize>,
}

impl Overrides {
    /// Applies the overrides to `params` and validates the result.
    ///
    /// # Errors
    ///
    /// If the resulting parameters are invalid.
    pub fn apply(&self, mut params: Parameters) -> Result<Parameters, String> {
        if let Some(k) = self.k {
            params = params.with_n_neighbors(k);
        }
        if let Some(depth) = self.tree_depth {
            params = params.with_tree_depth(depth);
        }
        if let Some(splitting) = self.splitting {
            params = params.with_splitting(splitting);
        }
        if let Some(chunks) = self.n_train_chunks {
            params = params.with_n_train_chunks(chunks);
        }
        if let Some(threads) = self.num_threads {
            params = params.with_num_threads(threads);
        }
        params.validate()?;
        Ok(params)
    }
}

/// The results written by the `query` command.
#[derive(Debug, serde::Serialize)]
struct QueryOutput {
    /// The parameters the index was fitted with.
    parameters: Parameters,
    /// The distances to the neighbors of each query, in increasing order.
    distances: Vec<Vec<f32>>,
    /// The row indices of the neighbors of each query.
    indices: Vec<Vec<usize>>,
    /// The work done while answering the queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<QueryStats>,
}

impl QueryOutput {
    /// Collects the output of a fitted index.
    fn new(parameters: Parameters, neighbors: &Neighbors<f32>, stats: Option<QueryStats>) -> Self {
        Self {
            parameters,
            distances: neighbors.distances.outer_iter().map(|row| row.to_vec()).collect(),
            indices: neighbors.indices.outer_iter().map(|row| row.to_vec()).collect(),
            stats,
        }
    }
}

/// Reads the parameters from a JSON file, or returns the defaults if there is no file.
///
/// # Errors
///
/// If the file could not be read or parsed.
pub fn read_parameters(path: Option<&Path>) -> Result<Parameters, String> {
    let Some(path) = path else {
        return Ok(Parameters::default());
    };
    ftlog::info!("Reading parameters from {path:?}");
    let file = std::fs::File::open(path).map_err(|e| format!("Could not open {path:?}: {e}"))?;
    serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| format!("Could not parse {path:?}: {e}"))
}

/// Fits an index over the training patterns, finds the neighbors of the queries and writes them as JSON.
///
/// # Arguments
///
/// - `inp_path`: The npy file with the training patterns.
/// - `queries_path`: The npy file with the queries. If `None`, the neighbors of each training pattern, excluding itself, are found.
/// - `params`: The parameters of the index. The number of neighbors is `params.n_neighbors`.
/// - `out_path`: The JSON file to write.
///
/// # Errors
///
/// - If a file could not be read or written.
/// - If fitting or querying the index fails.
pub fn run_queries(inp_path: &Path, queries_path: Option<&Path>, params: Parameters, out_path: &Path) -> Result<(), String> {
    let train = read_npy(inp_path)?;
    let k = params.n_neighbors;

    let start = std::time::Instant::now();
    let index = BufferKdTree::fit_cpu(train.view(), params)?;
    ftlog::info!(
        "Fitted a tree of depth {} with {} chunks in {:.3} seconds",
        index.tree().depth(),
        index.chunks().len(),
        start.elapsed().as_secs_f64()
    );

    let start = std::time::Instant::now();
    let (neighbors, stats) = match queries_path {
        Some(path) => {
            let queries = read_npy(path)?;
            let (neighbors, stats) = index.query_with_stats(queries.view(), k)?;
            (neighbors, Some(stats))
        }
        None => (index.query_training_set(k)?, None),
    };
    ftlog::info!(
        "Found {k} neighbors of {} queries in {:.3} seconds",
        neighbors.len(),
        start.elapsed().as_secs_f64()
    );
    if let Some(stats) = &stats {
        ftlog::info!("{stats:?}");
    }

    let output = QueryOutput::new(index.parameters().clone(), &neighbors, stats);
    index.free();

    ftlog::info!("Writing results to {out_path:?}");
    let file = std::fs::File::create(out_path).map_err(|e| format!("Could not create {out_path:?}: {e}"))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), &output).map_err(|e| e.to_string())
}

/// Reads a matrix of `f32` from an npy file.
fn read_npy(path: &Path) -> Result<Array2<f32>, String> {
    ftlog::info!("Reading {path:?}");
    ndarray_npy::read_npy::<_, Array2<f32>>(path).map_err(|e| format!("Could not read {path:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use bufferkdtree::{Parameters, SplittingPolicy};

    use super::Overrides;

    #[test]
    fn overrides() -> Result<(), String> {
        let params = Overrides::default().apply(Parameters::default())?;
        assert_eq!(params, Parameters::default());

        let overrides = Overrides {
            k: Some(3),
            tree_depth: Some(4),
            splitting: Some(SplittingPolicy::LongestBox),
            n_train_chunks: Some(2),
            num_threads: Some(8),
        };
        let params = overrides.apply(Parameters::default())?;
        assert_eq!(params.n_neighbors, 3);
        assert_eq!(params.tree_depth, 4);
        assert_eq!(params.splitting, SplittingPolicy::LongestBox);
        assert_eq!(params.n_train_chunks, 2);
        assert_eq!(params.num_threads, 8);

        let invalid = Overrides {
            k: Some(0),
            ..Overrides::default()
        };
        assert!(invalid.apply(Parameters::default()).is_err());

        Ok(())
    }
}
