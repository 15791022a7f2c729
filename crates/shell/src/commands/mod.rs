//! The commands under the `shell` CLI.

pub mod generate;
pub mod query;

use std::path::PathBuf;

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a random `f32` dataset and write it as npy.
    Generate {
        /// Number of vectors to generate.
        #[arg(short('n'), long)]
        num_vectors: usize,

        /// Dimensionality of each vector.
        #[arg(short('d'), long)]
        dimensions: usize,

        /// Partition splits as percentages (e.g., "95,5" for a 95/5 train/test split).
        /// If not provided, generates a single file with all vectors.
        #[arg(short('p'), long, value_delimiter = ',')]
        partitions: Option<Vec<usize>>,

        /// Minimum value for generated data.
        #[arg(long, default_value = "0.0")]
        min_val: f32,

        /// Maximum value for generated data.
        #[arg(long, default_value = "1.0")]
        max_val: f32,
    },
    /// Fit a buffer k-d tree and find the nearest neighbors of a set of queries.
    Query {
        /// The path to the training patterns, an npy file of `f32`.
        #[arg(short('i'), long)]
        inp_path: PathBuf,

        /// The path to the queries, an npy file of `f32`. Without it, the neighbors of every training pattern, excluding itself, are found.
        #[arg(short('q'), long)]
        queries_path: Option<PathBuf>,

        /// A JSON file with the parameters. Missing fields take their defaults.
        #[arg(short('c'), long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: query::Overrides,
    },
}
