//! Explicit SIMD kernels using the `wide` crate for portable vectorization.
//!
//! `wide` picks AVX2/SSE, NEON or SIMD128 at compile time and falls back to
//! scalar code elsewhere, so these kernels need no per-target `cfg`.

use wide::f32x8;

const LANES: usize = 8;

#[inline]
fn lanes(v: &[f32], chunk: usize) -> f32x8 {
    let offset = chunk * LANES;
    f32x8::from(&v[offset..offset + LANES])
}

/// Dot product of two equal-length vectors.
///
/// # Panics
///
/// Panics if vectors have different lengths.
#[inline]
#[must_use]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let chunks = a.len() / LANES;
    let mut acc = f32x8::ZERO;
    for i in 0..chunks {
        acc = lanes(a, i).mul_add(lanes(b, i), acc);
    }

    let tail: f32 = a[chunks * LANES..]
        .iter()
        .zip(&b[chunks * LANES..])
        .map(|(x, y)| x * y)
        .sum();
    acc.reduce_add() + tail
}

/// Squared L2 distance. Preserves ordering of [`euclidean_distance`] without the sqrt.
///
/// # Panics
///
/// Panics if vectors have different lengths.
#[inline]
#[must_use]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let chunks = a.len() / LANES;
    let mut acc = f32x8::ZERO;
    for i in 0..chunks {
        let diff = lanes(a, i) - lanes(b, i);
        acc = diff.mul_add(diff, acc);
    }

    let tail: f32 = a[chunks * LANES..]
        .iter()
        .zip(&b[chunks * LANES..])
        .map(|(x, y)| (x - y) * (x - y))
        .sum();
    acc.reduce_add() + tail
}

/// Euclidean (L2) distance.
#[inline]
#[must_use]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    squared_l2(a, b).sqrt()
}

/// Cosine similarity in a single fused pass (dot, |a|², |b|²).
///
/// Returns 0.0 when either vector has zero norm.
///
/// # Panics
///
/// Panics if vectors have different lengths.
#[inline]
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let chunks = a.len() / LANES;
    let mut dot = f32x8::ZERO;
    let mut norm_a = f32x8::ZERO;
    let mut norm_b = f32x8::ZERO;
    for i in 0..chunks {
        let va = lanes(a, i);
        let vb = lanes(b, i);
        dot = va.mul_add(vb, dot);
        norm_a = va.mul_add(va, norm_a);
        norm_b = vb.mul_add(vb, norm_b);
    }

    let (mut d, mut na, mut nb) = (dot.reduce_add(), norm_a.reduce_add(), norm_b.reduce_add());
    for (x, y) in a[chunks * LANES..].iter().zip(&b[chunks * LANES..]) {
        d += x * y;
        na += x * x;
        nb += y * y;
    }

    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    d / (na.sqrt() * nb.sqrt())
}

/// Normalizes `v` to unit length in place. Zero vectors are left untouched.
pub fn normalize_inplace(v: &mut [f32]) {
    let norm = dot_product(v, v).sqrt();
    if norm > 0.0 {
        let inv = 1.0 / norm;
        v.iter_mut().for_each(|x| *x *= inv);
    }
}
