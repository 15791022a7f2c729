//! Tests for exact k-nearest-neighbor queries with the buffered engine.

use bufferkdtree::{
    BufferKdTree, ComputeBackend, CpuBackend, Error, Parameters, SplittingPolicy,
    search::{KnnLinear, KnnRecursive, Search},
};
use ndarray::{Array2, array, s};
use test_case::test_case;

mod common;

#[test_case(1, SplittingPolicy::Cyclic; "one chunk cyclic")]
#[test_case(3, SplittingPolicy::Cyclic; "three chunks cyclic")]
#[test_case(1, SplittingPolicy::LongestBox; "one chunk longest")]
#[test_case(3, SplittingPolicy::LongestBox; "three chunks longest")]
fn matches_linear_scan(n_chunks: usize, splitting: SplittingPolicy) -> Result<(), String> {
    let data = common::data_gen::tabular(1_000, 8, -1.0, 1.0, 42);
    let queries = common::data_gen::tabular(200, 8, -1.0, 1.0, 43);

    // Every query walks the tree to the end; nothing is left to a final flush.
    let params = Parameters::default()
        .with_tree_depth(6)
        .with_n_train_chunks(n_chunks)
        .with_splitting(splitting)
        .with_bf_remaining_threshold(0)
        .with_leaf_buffer_capacity(8);
    let index = BufferKdTree::fit(data.view(), params, CpuBackend::default())?;
    assert_eq!(index.chunks().len(), n_chunks);

    for k in [1, 5, 20] {
        let expected = KnnLinear(k).par_batch_search(index.tree(), queries.view());
        let (actual, stats) = index.query_with_stats(queries.view(), k)?;
        assert_eq!(stats.flushed_queries, 0);
        assert_eq!(stats.completed_traversals, 200);
        assert!(stats.leaf_jobs > 200, "Queries must visit more than one leaf on average");
        common::check_neighbors(&expected, &actual, &format!("BufferKdTree(k={k}, chunks={n_chunks})"));

        let recursive = KnnRecursive(k).batch_search(index.tree(), queries.view());
        assert_eq!(expected, recursive, "KnnRecursive(k={k}) disagrees with KnnLinear(k={k})");
    }

    Ok(())
}

#[test_case(Parameters::default().with_num_threads(4); "four threads")]
#[test_case(Parameters::default().with_leaf_buffer_capacity(2); "tiny buffers")]
#[test_case(Parameters::default().with_leaf_buffer_capacity(16).with_buffer_threshold(0.25); "early drains")]
#[test_case(Parameters::default().with_buffer_threshold(1.0).with_batch_factor(1); "small batches")]
#[test_case(Parameters::default().with_n_train_chunks(3); "three chunks")]
#[test_case(Parameters::default().with_n_train_chunks(7).with_num_threads(3); "seven chunks")]
#[test_case(Parameters::default().with_bf_remaining_threshold(8_000); "final flush")]
#[test_case(Parameters::default().with_bf_remaining_threshold(50).with_leaf_buffer_capacity(8); "partial final flush")]
fn idempotent(variant: Parameters) -> Result<(), String> {
    let data = common::data_gen::tabular(1_000, 8, -1.0, 1.0, 42);
    let queries = common::data_gen::tabular(200, 8, -1.0, 1.0, 44);
    let k = 5;

    let baseline_params = Parameters::default().with_tree_depth(6).with_bf_remaining_threshold(0);
    let baseline = BufferKdTree::fit(data.view(), baseline_params, CpuBackend::default())?.query(queries.view(), k)?;

    let variant = Parameters {
        tree_depth: 6,
        bf_remaining_threshold: if variant.bf_remaining_threshold == Parameters::default().bf_remaining_threshold {
            0
        } else {
            variant.bf_remaining_threshold
        },
        ..variant
    };
    let index = BufferKdTree::fit(data.view(), variant.clone(), CpuBackend::default())?;
    let (actual, stats) = index.query_with_stats(queries.view(), k)?;

    assert_eq!(baseline.indices, actual.indices, "Indices differ for {variant:?}");
    assert_eq!(baseline.distances, actual.distances, "Distances differ for {variant:?}");
    assert_eq!(stats.queries, 200);
    assert_eq!(stats.completed_traversals + stats.flushed_queries, 200);

    Ok(())
}

#[test]
fn work_is_accounted() -> Result<(), String> {
    let data = common::data_gen::tabular(1_000, 8, -1.0, 1.0, 42);
    let queries = common::data_gen::tabular(200, 8, -1.0, 1.0, 45);

    // Without a final flush, every query walks the tree to the end.
    let params = Parameters::default().with_tree_depth(6).with_bf_remaining_threshold(0);
    let (_, stats) = BufferKdTree::fit(data.view(), params, CpuBackend::default())?.query_with_stats(queries.view(), 5)?;
    assert_eq!(stats.sessions, 1);
    assert_eq!(stats.final_flushes, 0);
    assert_eq!(stats.completed_traversals, 200);
    assert!(stats.leaf_jobs >= 200);
    assert_eq!(stats.chunk_stagings, 1);

    // With the default threshold, all queries are flushed after their first leaf.
    let params = Parameters::default().with_tree_depth(6);
    let (_, stats) = BufferKdTree::fit(data.view(), params, CpuBackend::default())?.query_with_stats(queries.view(), 5)?;
    assert_eq!(stats.final_flushes, 1);
    assert_eq!(stats.flushed_queries, 200);
    assert_eq!(stats.leaf_jobs, 200);
    assert_eq!(stats.completed_traversals, 0);

    // Buffers of one query must grow when a batch of 100 queries meets 64 leaves.
    let params = Parameters::default()
        .with_tree_depth(6)
        .with_bf_remaining_threshold(0)
        .with_leaf_buffer_capacity(1)
        .with_batch_factor(100);
    let (_, stats) = BufferKdTree::fit(data.view(), params, CpuBackend::default())?.query_with_stats(queries.view(), 5)?;
    assert!(stats.buffer_growths > 0);

    Ok(())
}

#[test]
fn small_working_memory() -> Result<(), String> {
    let data = common::data_gen::tabular(1_000, 8, -1.0, 1.0, 42);
    let queries = common::data_gen::tabular(200, 8, -1.0, 1.0, 46);
    let k = 10;

    // The training set needs 17 chunks and the queries need 6 sessions.
    let backend = CpuBackend::with_working_memory(20_000, 6_000);
    let params = Parameters::default()
        .with_tree_depth(6)
        .with_leaf_buffer_capacity(8)
        .with_num_threads(2)
        .with_bf_remaining_threshold(0);
    let index = BufferKdTree::fit(data.view(), params, backend)?;
    assert_eq!(index.chunks().len(), 17);
    assert_eq!(index.max_queries_per_session(k)?, 36);

    let (actual, stats) = index.query_with_stats(queries.view(), k)?;
    assert_eq!(stats.sessions, 6);
    assert_eq!(stats.flushed_queries, 0);
    assert_eq!(stats.completed_traversals, 200);
    assert!(stats.chunk_stagings > 17);

    let expected = KnnLinear(k).batch_search(index.tree(), queries.view());
    common::check_neighbors(&expected, &actual, "BufferKdTree(small memory)");

    Ok(())
}

#[test]
fn training_set_excludes_itself() -> Result<(), String> {
    let data = common::data_gen::tabular(300, 4, -1.0, 1.0, 42);
    let k = 3;

    let params = Parameters::default().with_tree_depth(4);
    let index = BufferKdTree::fit(data.view(), params, CpuBackend::default())?;
    let actual = index.query_training_set(k)?;
    assert_eq!(actual.indices.dim(), (300, k));

    let expected = KnnLinear(k + 1).batch_search(index.tree(), data.view());
    for (i, exp) in expected.iter().enumerate() {
        assert_eq!(exp[0].0, i, "Pattern {i} is not its own nearest neighbor");
        let got = actual.row(i);
        assert!(got.iter().all(|&(j, _)| j != i), "Pattern {i} was not excluded");
        assert_eq!(&exp[1..], got.as_slice(), "Neighbors of pattern {i}");
    }

    Ok(())
}

#[test]
fn boxed_backend_and_f64() -> Result<(), String> {
    let data = common::data_gen::tabular_f64(500, 3, 42);
    let queries = common::data_gen::tabular_f64(40, 3, 43);

    let backend: Box<dyn ComputeBackend<f64>> = Box::new(CpuBackend::default());
    let params = Parameters::default().with_tree_depth(5).with_bf_remaining_threshold(0);
    let index = BufferKdTree::fit(data.view(), params, backend)?;
    let actual = index.kneighbors(queries.view())?;
    assert_eq!(actual.k(), 10);

    let expected = KnnLinear(10).batch_search(index.tree(), queries.view());
    for (q, exp) in expected.iter().enumerate() {
        assert_eq!(exp, &actual.row(q), "Query {q}");
    }

    index.free();
    Ok(())
}

#[test]
fn depth_and_edge_cases() -> Result<(), String> {
    let data = common::data_gen::tabular(10, 2, -1.0, 1.0, 42);
    let index = BufferKdTree::fit_cpu(data.view(), Parameters::default())?;
    assert_eq!(index.tree().depth(), 3);
    assert_eq!(index.parameters().tree_depth, 3);

    // All patterns as neighbors.
    let all = index.query(data.slice(s![..2, ..]), 10)?;
    assert_eq!(all.indices.dim(), (2, 10));
    assert_eq!(all.indices[[0, 0]], 0);
    assert_eq!(all.indices[[1, 0]], 1);

    // No queries at all.
    let none = index.query(Array2::<f32>::zeros((0, 2)).view(), 3)?;
    assert!(none.is_empty());
    assert_eq!(none.k(), 3);

    Ok(())
}

#[test]
fn configuration_errors() -> Result<(), String> {
    let data = common::data_gen::tabular(50, 2, -1.0, 1.0, 42);
    let index = BufferKdTree::fit_cpu(data.view(), Parameters::default().with_tree_depth(3))?;
    let query = array![[0.0_f32, 0.0]];

    for k in [0, 51, 101] {
        assert!(matches!(index.query(query.view(), k), Err(Error::Configuration(_))), "k = {k}");
    }
    assert!(matches!(index.query_training_set(50), Err(Error::Configuration(_))));

    let large = common::data_gen::tabular(300, 2, -1.0, 1.0, 42);
    let large = BufferKdTree::fit_cpu(large.view(), Parameters::default().with_tree_depth(3))?;
    assert!(matches!(
        large.query_training_set(100),
        Err(Error::Configuration(msg)) if msg.contains("got 100")
    ));
    assert!(matches!(
        index.query(array![[0.0_f32, 0.0, 0.0]].view(), 1),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        index.query(array![[0.0_f32, f32::INFINITY]].view(), 1),
        Err(Error::Configuration(_))
    ));

    assert!(matches!(
        BufferKdTree::fit_cpu(Array2::<f32>::zeros((0, 2)).view(), Parameters::default()),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        BufferKdTree::fit_cpu(data.view(), Parameters::default().with_num_threads(0)),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        BufferKdTree::fit_cpu(data.view(), Parameters::default().with_memory_fractions(0.6, 0.6)),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        BufferKdTree::fit_cpu(data.view(), Parameters::default().with_batch_factor(usize::MAX / 2)),
        Err(Error::Configuration(_))
    ));

    Ok(())
}

#[test]
fn resource_errors() {
    let data = common::data_gen::tabular(50, 64, -1.0, 1.0, 42);

    let tiny = CpuBackend::with_working_memory(1_000, 1_000);
    assert!(matches!(
        BufferKdTree::fit(data.view(), Parameters::default().with_tree_depth(3), tiny),
        Err(Error::ResourceExhausted(_))
    ));

    let no_queries = CpuBackend::with_working_memory(100_000, 100);
    let params = Parameters::default().with_tree_depth(3).with_leaf_buffer_capacity(1);
    let result = BufferKdTree::fit(data.view(), params, no_queries).and_then(|index| index.query(data.view(), 5));
    assert!(matches!(result, Err(Error::ResourceExhausted(_))));
}
