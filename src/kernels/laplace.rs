//! Laplace kernels in 3D.
//!
//! Single-layer sources carry a charge (1 value), double-layer sources a dipole (3 values).
//! The output is the potential followed by its gradient with respect to the target.
use super::{dot, separation};
use num::traits::FloatConst;

/// Single-layer potential and gradient. `result` has 4 entries.
pub fn sl_p_grad(source: &[f64], target: &[f64], charge: &[f64], result: &mut [f64]) {
    let Some((diff, inv_diff_norm)) = separation(source, target) else {
        result[..4].fill(0.0);
        return;
    };
    let m_inv_4pi = 0.25 * f64::FRAC_1_PI();
    let inv_diff_norm_cubed = inv_diff_norm * inv_diff_norm * inv_diff_norm;
    let charge = charge[0];

    result[0] = m_inv_4pi * charge * inv_diff_norm;
    for j in 0..3 {
        result[1 + j] = -m_inv_4pi * charge * diff[j] * inv_diff_norm_cubed;
    }
}

/// Double-layer potential and gradient. `result` has 4 entries.
pub fn dl_p_grad(source: &[f64], target: &[f64], dipole: &[f64], result: &mut [f64]) {
    let Some((diff, inv_diff_norm)) = separation(source, target) else {
        result[..4].fill(0.0);
        return;
    };
    let m_inv_4pi = 0.25 * f64::FRAC_1_PI();
    let inv_diff_norm_cubed = inv_diff_norm * inv_diff_norm * inv_diff_norm;
    let inv_diff_norm_5 = inv_diff_norm_cubed * inv_diff_norm * inv_diff_norm;
    let dipole_dot_diff = dot(dipole, &diff);

    result[0] = m_inv_4pi * dipole_dot_diff * inv_diff_norm_cubed;
    for j in 0..3 {
        result[1 + j] = m_inv_4pi
            * (dipole[j] * inv_diff_norm_cubed - 3.0 * dipole_dot_diff * diff[j] * inv_diff_norm_5);
    }
}
