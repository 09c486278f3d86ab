mod helpers;

use helpers::{abc_store, at_cosine, store};
use shortlist::catalog::EmbeddingStore;
use shortlist::error::InvalidArgument;
use shortlist::ranker::{rank, LinearScan, Ranker};

fn names(results: &[shortlist::ranker::RankedResult<'_>]) -> Vec<String> {
    results.iter().map(|r| r.entry.name.clone()).collect()
}

#[test]
fn closest_rows_come_first() {
    let store = abc_store();
    let results = rank(&[1.0, 0.0], &store, 2).unwrap();

    assert_eq!(names(&results), vec!["A", "C"]);
    assert!((results[0].score - 1.0).abs() < 1e-6);
    assert!((results[1].score - 0.7071).abs() < 1e-3);

    let reported: Vec<f64> = results.iter().map(|r| r.to_recommendation().score).collect();
    assert_eq!(reported, vec![1.0, 0.707]);
}

#[test]
fn zero_query_scores_zero_in_catalog_order() {
    let store = abc_store();
    let results = rank(&[0.0, 0.0], &store, 3).unwrap();

    assert_eq!(names(&results), vec!["A", "B", "C"]);
    for r in &results {
        assert_eq!(r.score, 0.0);
        assert!(!r.score.is_nan());
    }
}

#[test]
fn zero_norm_row_scores_zero() {
    let store = store(&[("zero", vec![0.0, 0.0]), ("x", vec![1.0, 0.0])]);
    let results = rank(&[1.0, 0.0], &store, 2).unwrap();
    assert_eq!(names(&results), vec!["x", "zero"]);
    assert_eq!(results[1].score, 0.0);
}

#[test]
fn returns_min_of_k_and_catalog_size_in_descending_order() {
    let store = store(&[
        ("p", vec![0.2, 0.9, 0.1]),
        ("q", vec![-0.5, 0.1, 0.8]),
        ("r", vec![0.9, 0.3, -0.2]),
        ("s", vec![0.0, -1.0, 0.0]),
    ]);
    let query = [0.6, 0.4, 0.1];

    for k in 1..=6 {
        let results = rank(&query, &store, k).unwrap();
        assert_eq!(results.len(), k.min(store.len()), "k = {k}");
        assert!(
            results.windows(2).all(|w| w[0].score >= w[1].score),
            "scores not sorted for k = {k}"
        );
        assert!(results.iter().all(|r| (-1.0..=1.0).contains(&r.score)));
    }
}

#[test]
fn ranking_is_deterministic() {
    let store = store(&[
        ("p", vec![0.2, 0.9, 0.1]),
        ("q", vec![-0.5, 0.1, 0.8]),
        ("r", vec![0.9, 0.3, -0.2]),
    ]);
    let query = [0.31, -0.2, 0.77];

    let first = rank(&query, &store, 3).unwrap();
    let second = rank(&query, &store, 3).unwrap();

    let first_bits: Vec<(usize, u64)> = first.iter().map(|r| (r.index, r.score.to_bits())).collect();
    let second_bits: Vec<(usize, u64)> = second.iter().map(|r| (r.index, r.score.to_bits())).collect();
    assert_eq!(first_bits, second_bits);
}

#[test]
fn query_equal_to_a_row_ranks_it_first_with_score_one() {
    let store = store(&[
        ("p", vec![0.2, 0.9, 0.1]),
        ("q", vec![-0.5, 0.1, 0.8]),
        ("r", vec![0.9, 0.3, -0.2]),
    ]);
    let (row, _) = store.row_at(1).unwrap();
    let query = row.to_vec();

    let results = rank(&query, &store, 3).unwrap();
    assert_eq!(results[0].index, 1);
    assert!((results[0].score - 1.0).abs() < 1e-6);
}

#[test]
fn exact_duplicates_tie_break_by_catalog_index() {
    let store = store(&[
        ("other", vec![0.1, 0.9]),
        ("first", vec![0.6, 0.8]),
        ("middle", vec![0.9, 0.1]),
        ("second", vec![0.6, 0.8]),
    ]);

    let results = rank(&[0.6, 0.8], &store, 2).unwrap();
    assert_eq!(names(&results), vec!["first", "second"]);
    assert_eq!(results[0].score, results[1].score);
}

#[test]
fn near_tie_keeps_true_order_even_though_reported_scores_match() {
    // Rounded to three places both score 0.707; ranking on rounded values
    // would keep catalog order and put "lower" first.
    let store = store(&[("lower", at_cosine(0.7071)), ("higher", at_cosine(0.7074))]);

    let results = rank(&[1.0, 0.0], &store, 2).unwrap();
    assert_eq!(names(&results), vec!["higher", "lower"]);
    assert!(results[0].score > results[1].score);

    let reported: Vec<f64> = results.iter().map(|r| r.to_recommendation().score).collect();
    assert_eq!(reported, vec![0.707, 0.707]);
}

#[test]
fn empty_store_returns_nothing_for_any_k() {
    let empty = EmbeddingStore::from_rows(vec![], vec![]).unwrap();
    for k in [0, 1, 10] {
        assert!(rank(&[1.0, 0.0], &empty, k).unwrap().is_empty(), "k = {k}");
    }
}

#[test]
fn zero_k_is_rejected() {
    let err = rank(&[1.0, 0.0], &abc_store(), 0).unwrap_err();
    assert_eq!(err, InvalidArgument::ZeroTopK);
}

#[test]
fn empty_query_vector_is_rejected() {
    let err = rank(&[], &abc_store(), 1).unwrap_err();
    assert_eq!(err, InvalidArgument::EmptyQuery);
}

#[test]
fn wrong_query_width_is_rejected() {
    let err = rank(&[1.0, 0.0, 0.0], &abc_store(), 1).unwrap_err();
    assert_eq!(
        err,
        InvalidArgument::DimensionMismatch {
            expected: 2,
            actual: 3
        }
    );
}

#[test]
fn linear_scan_matches_free_function() {
    let store = abc_store();
    let ranker: &dyn Ranker = &LinearScan;
    let via_trait = ranker.rank(&[0.3, 0.9], &store, 3).unwrap();
    let direct = rank(&[0.3, 0.9], &store, 3).unwrap();
    assert_eq!(via_trait, direct);
}

#[test]
fn non_finite_query_is_rejected_instead_of_ranked_first() {
    let store = abc_store();
    for query in [[f32::NAN, 0.0], [0.0, f32::INFINITY], [f32::NEG_INFINITY, 1.0]] {
        let err = rank(&query, &store, 3).unwrap_err();
        assert!(
            matches!(err, InvalidArgument::NonFiniteQuery { .. }),
            "{query:?}: {err}"
        );
    }
    assert_eq!(
        rank(&[1.0, f32::NAN], &store, 3).unwrap_err(),
        InvalidArgument::NonFiniteQuery { position: 1 }
    );
}

#[test]
fn overflowing_query_scores_zero_not_nan() {
    let store = abc_store();
    let results = rank(&[3e38, 3e38], &store, 3).unwrap();
    assert_eq!(names(&results), vec!["A", "B", "C"]);
    assert!(results.iter().all(|r| r.score == 0.0));
}
