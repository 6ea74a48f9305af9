//! Closed-form pairwise kernels.
//!
//! Every kernel has the signature of [PairwiseFn]: it evaluates the contribution of one
//! source with one value vector at one target and overwrites the first target-width entries
//! of `result`. Coincident source and target points contribute zero.
pub mod laplace;
pub mod stokes;

/// Contribution of one source at one target.
///
/// Arguments are the source point, the target point, the source value and the output.
pub type PairwiseFn = fn(&[f64], &[f64], &[f64], &mut [f64]);

/// Separation `target - source` and its inverse length, or `None` for coincident points.
#[inline(always)]
pub(crate) fn separation(source: &[f64], target: &[f64]) -> Option<([f64; 3], f64)> {
    let diff = [
        target[0] - source[0],
        target[1] - source[1],
        target[2] - source[2],
    ];
    let diff_norm_squared = diff[0] * diff[0] + diff[1] * diff[1] + diff[2] * diff[2];
    if diff_norm_squared == 0.0 {
        None
    } else {
        Some((diff, 1.0 / diff_norm_squared.sqrt()))
    }
}

#[inline(always)]
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}
