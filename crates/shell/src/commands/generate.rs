//! Generating random datasets for testing and benchmarking.

use std::path::{Path, PathBuf};

use ndarray::{Array2, s};
use rand::prelude::*;

/// Generates a matrix of uniformly random `f32` values and writes it, or its partitions, as npy files.
///
/// # Arguments
///
/// - `num_vectors`: The number of rows to generate.
/// - `dimensions`: The number of columns of each row.
/// - `partitions`: Optional split of the rows as percentages that sum to 100. Each partition is written to `<stem>-<count>.npy` next to `out_path`.
/// - `min_val`: The inclusive lower bound of each value.
/// - `max_val`: The exclusive upper bound of each value.
/// - `out_path`: The npy file to write.
/// - `rng`: The random number generator.
///
/// # Errors
///
/// - If the shape or the range is empty.
/// - If the partitions do not sum to 100 or one of them would be empty.
/// - If a file could not be written.
pub fn generate_dataset<R: Rng>(
    num_vectors: usize,
    dimensions: usize,
    partitions: Option<Vec<usize>>,
    min_val: f32,
    max_val: f32,
    out_path: &Path,
    rng: &mut R,
) -> Result<(), String> {
    if num_vectors == 0 || dimensions == 0 {
        return Err(format!("Cannot generate a {num_vectors} x {dimensions} dataset"));
    }
    if !min_val.is_finite() || !max_val.is_finite() || min_val >= max_val {
        return Err(format!("The range [{min_val}, {max_val}) is empty"));
    }
    if let Some(parts) = &partitions {
        let sum = parts.iter().sum::<usize>();
        if parts.is_empty() || sum != 100 {
            return Err(format!("Partition percentages must sum to 100, got: {sum}"));
        }
    }

    ftlog::info!("Generating {num_vectors} vectors in {dimensions} dimensions with values in [{min_val}, {max_val})");
    let data = Array2::from_shape_simple_fn((num_vectors, dimensions), || rng.random_range(min_val..max_val));

    match partitions {
        Some(parts) => {
            let mut start = 0;
            for (i, &percentage) in parts.iter().enumerate() {
                let count = if i == parts.len() - 1 {
                    num_vectors - start
                } else {
                    (num_vectors * percentage) / 100
                };
                if count == 0 {
                    return Err(format!(
                        "Partition {i} ({percentage} percent) results in 0 vectors. Total vectors: {num_vectors}"
                    ));
                }

                let end = start + count;
                write_npy(&partition_path(out_path, count), &data.slice(s![start..end, ..]).to_owned())?;
                start = end;
            }
            Ok(())
        }
        None => write_npy(out_path, &data),
    }
}

/// Returns `<dir>/<stem>-<count>.npy` for an output path `<dir>/<stem>.npy`.
fn partition_path(out_path: &Path, count: usize) -> PathBuf {
    let stem = out_path.file_stem().map_or_else(|| "data".to_string(), |s| s.to_string_lossy().into_owned());
    out_path.with_file_name(format!("{stem}-{count}.npy"))
}

/// Writes `data` as an npy file.
fn write_npy(path: &Path, data: &Array2<f32>) -> Result<(), String> {
    ftlog::info!("Writing {:?} array to {path:?}", data.dim());
    ndarray_npy::write_npy(path, data).map_err(|e| e.to_string())
}
