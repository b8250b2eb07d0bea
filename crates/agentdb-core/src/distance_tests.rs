//! Tests for `distance` and `simd` modules.

use crate::distance::DistanceMetric;
use crate::simd;

const EPS: f32 = 1e-5;

fn sample(dim: usize, offset: f32) -> Vec<f32> {
    #[allow(clippy::cast_precision_loss)]
    (0..dim).map(|i| (i as f32 * 0.37 + offset).sin()).collect()
}

fn scalar_dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn test_simd_dot_matches_scalar_with_remainder() {
    // 19 = two full lanes + 3 tail elements
    let a = sample(19, 0.1);
    let b = sample(19, 1.3);

    assert!((simd::dot_product(&a, &b) - scalar_dot(&a, &b)).abs() < EPS);
}

#[test]
fn test_simd_squared_l2_matches_scalar() {
    let a = sample(131, 0.0);
    let b = sample(131, 2.0);
    let expected: f32 = a.iter().zip(&b).map(|(x, y)| (x - y) * (x - y)).sum();

    assert!((simd::squared_l2(&a, &b) - expected).abs() < 1e-3);
    assert!((simd::euclidean_distance(&a, &b) - expected.sqrt()).abs() < 1e-3);
}

#[test]
fn test_cosine_similarity_identical_and_orthogonal() {
    let x = vec![1.0, 0.0, 0.0];
    let y = vec![0.0, 1.0, 0.0];

    assert!((simd::cosine_similarity(&x, &x) - 1.0).abs() < EPS);
    assert!(simd::cosine_similarity(&x, &y).abs() < EPS);
}

#[test]
fn test_cosine_similarity_zero_vector_is_zero() {
    let zero = vec![0.0; 16];
    let other = sample(16, 0.5);

    assert!(simd::cosine_similarity(&zero, &other).abs() < EPS);
}

#[test]
#[should_panic(expected = "Vector dimensions must match")]
fn test_mismatched_lengths_panic() {
    let _ = simd::dot_product(&[1.0, 2.0], &[1.0]);
}

#[test]
fn test_normalize_inplace_produces_unit_vector() {
    let mut v = sample(64, 0.9);

    simd::normalize_inplace(&mut v);

    assert!((simd::dot_product(&v, &v) - 1.0).abs() < 1e-4);
}

#[test]
fn test_distance_is_lower_is_better_for_every_metric() {
    let q = vec![1.0, 0.0, 0.0, 0.0];
    let near = vec![0.9, 0.1, 0.0, 0.0];
    let far = vec![-1.0, 0.0, 0.0, 0.0];

    for metric in [
        DistanceMetric::Cosine,
        DistanceMetric::Euclidean,
        DistanceMetric::DotProduct,
    ] {
        assert!(
            metric.distance(&q, &near) < metric.distance(&q, &far),
            "{metric} should rank the nearer vector first"
        );
    }
}

#[test]
fn test_cosine_distance_range() {
    let q = vec![1.0, 0.0];
    let opposite = vec![-1.0, 0.0];

    assert!((DistanceMetric::Cosine.distance(&q, &q)).abs() < EPS);
    assert!((DistanceMetric::Cosine.distance(&q, &opposite) - 2.0).abs() < EPS);
}

#[test]
fn test_sort_results_by_metric_direction() {
    let mut sims = vec![("a", 0.2), ("b", 0.9), ("c", 0.5)];
    DistanceMetric::Cosine.sort_results(&mut sims);
    assert_eq!(sims[0].0, "b");

    let mut dists = vec![("a", 0.2), ("b", 0.9), ("c", 0.5)];
    DistanceMetric::Euclidean.sort_results(&mut dists);
    assert_eq!(dists[0].0, "a");
}

#[test]
fn test_metric_serde_names() {
    let json = serde_json::to_string(&DistanceMetric::DotProduct).expect("serialize");
    assert_eq!(json, "\"dot_product\"");

    let parsed: DistanceMetric = serde_json::from_str("\"dot\"").expect("alias");
    assert_eq!(parsed, DistanceMetric::DotProduct);
}
