//! CLI for exact k-nearest-neighbor search with buffer k-d trees.

mod commands;
pub mod utils;

use std::path::PathBuf;

use clap::Parser;
use rand::prelude::*;

use commands::Commands;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The path to the output file.
    #[arg(short('o'), long)]
    out_path: PathBuf,

    /// The random seed to use.
    #[arg(short('s'), long)]
    seed: Option<u64>,

    /// The name of the log-file to use.
    #[arg(short('l'), long, default_value = "shell.log")]
    log_name: String,

    /// The subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<(), String> {
    let args = Args::parse();

    let (_guard, log_path) = utils::configure_logger(&args.log_name)?;
    ftlog::info!("Log file: {log_path:?}");

    let out_path = &args.out_path;

    match args.command {
        Commands::Generate {
            num_vectors,
            dimensions,
            partitions,
            min_val,
            max_val,
        } => {
            let mut rng = args.seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
            commands::generate::generate_dataset(num_vectors, dimensions, partitions, min_val, max_val, out_path, &mut rng)
        }
        Commands::Query {
            inp_path,
            queries_path,
            config,
            overrides,
        } => {
            let params = overrides.apply(commands::query::read_parameters(config.as_deref())?)?;
            commands::query::run_queries(&inp_path, queries_path.as_deref(), params, out_path)
        }
    }
}
