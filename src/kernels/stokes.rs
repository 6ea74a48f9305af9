//! Stokes kernels in 3D with unit viscosity.
//!
//! Single-layer sources carry a force `f` (3 values), double-layer sources a tensor `D`
//! (9 values, row major). With `r = target - source` the single layer gives
//!
//! - `p = f.r / (4 pi |r|^3)`
//! - `u = (f / |r| + (f.r) r / |r|^3) / (8 pi)`
//!
//! and the double layer, with `A = r^T D r`,
//!
//! - `p = -(3 A / |r|^5 - tr(D) / |r|^3) / (2 pi)`
//! - `u = -3 A r / (4 pi |r|^5)`
//!
//! Velocity gradients are stored as `grad_u[3 * i + j] = d u_i / d x_j`.
use super::{dot, separation};
use num::traits::FloatConst;

fn m_inv_4pi() -> f64 {
    0.25 * f64::FRAC_1_PI()
}

fn single_layer_pressure_velocity(
    diff: &[f64; 3],
    inv_diff_norm: f64,
    force: &[f64],
) -> (f64, [f64; 3]) {
    let m_inv_4pi = m_inv_4pi();
    let inv_diff_norm_cubed = inv_diff_norm * inv_diff_norm * inv_diff_norm;
    let force_dot_diff = dot(force, diff);

    let pressure = m_inv_4pi * force_dot_diff * inv_diff_norm_cubed;
    let velocity = std::array::from_fn(|i| {
        0.5 * m_inv_4pi
            * (force[i] * inv_diff_norm + force_dot_diff * diff[i] * inv_diff_norm_cubed)
    });

    (pressure, velocity)
}

fn single_layer_gradients(
    diff: &[f64; 3],
    inv_diff_norm: f64,
    force: &[f64],
) -> ([f64; 3], [f64; 9]) {
    let m_inv_4pi = m_inv_4pi();
    let inv_diff_norm_cubed = inv_diff_norm * inv_diff_norm * inv_diff_norm;
    let inv_diff_norm_5 = inv_diff_norm_cubed * inv_diff_norm * inv_diff_norm;
    let force_dot_diff = dot(force, diff);

    let grad_pressure = std::array::from_fn(|j| {
        m_inv_4pi
            * (force[j] * inv_diff_norm_cubed - 3.0 * force_dot_diff * diff[j] * inv_diff_norm_5)
    });

    let grad_velocity = std::array::from_fn(|index| {
        let (i, j) = (index / 3, index % 3);
        let delta = if i == j { force_dot_diff } else { 0.0 };
        0.5 * m_inv_4pi
            * ((force[j] * diff[i] - force[i] * diff[j] + delta) * inv_diff_norm_cubed
                - 3.0 * force_dot_diff * diff[i] * diff[j] * inv_diff_norm_5)
    });

    (grad_pressure, grad_velocity)
}

/// The contractions `r^T D r`, `tr(D)` and `(D + D^T) r`.
fn double_layer_contractions(diff: &[f64; 3], dipole: &[f64]) -> (f64, f64, [f64; 3]) {
    let mut quadratic = 0.0;
    for j in 0..3 {
        for k in 0..3 {
            quadratic += diff[j] * dipole[3 * j + k] * diff[k];
        }
    }
    let trace = dipole[0] + dipole[4] + dipole[8];
    let sym_diff = std::array::from_fn(|i| {
        (0..3)
            .map(|k| (dipole[3 * i + k] + dipole[3 * k + i]) * diff[k])
            .sum::<f64>()
    });
    (quadratic, trace, sym_diff)
}

fn double_layer_pressure_velocity(
    diff: &[f64; 3],
    inv_diff_norm: f64,
    dipole: &[f64],
) -> (f64, [f64; 3]) {
    let m_inv_4pi = m_inv_4pi();
    let inv_diff_norm_cubed = inv_diff_norm * inv_diff_norm * inv_diff_norm;
    let inv_diff_norm_5 = inv_diff_norm_cubed * inv_diff_norm * inv_diff_norm;
    let (quadratic, trace, _) = double_layer_contractions(diff, dipole);

    let pressure =
        -2.0 * m_inv_4pi * (3.0 * quadratic * inv_diff_norm_5 - trace * inv_diff_norm_cubed);
    let velocity =
        std::array::from_fn(|i| -3.0 * m_inv_4pi * diff[i] * quadratic * inv_diff_norm_5);

    (pressure, velocity)
}

fn double_layer_gradients(
    diff: &[f64; 3],
    inv_diff_norm: f64,
    dipole: &[f64],
) -> ([f64; 3], [f64; 9]) {
    let m_inv_4pi = m_inv_4pi();
    let inv_diff_norm_squared = inv_diff_norm * inv_diff_norm;
    let inv_diff_norm_5 = inv_diff_norm_squared * inv_diff_norm_squared * inv_diff_norm;
    let inv_diff_norm_7 = inv_diff_norm_5 * inv_diff_norm_squared;
    let (quadratic, trace, sym_diff) = double_layer_contractions(diff, dipole);

    let grad_pressure = std::array::from_fn(|i| {
        -6.0 * m_inv_4pi
            * ((sym_diff[i] + trace * diff[i]) * inv_diff_norm_5
                - 5.0 * quadratic * diff[i] * inv_diff_norm_7)
    });

    let grad_velocity = std::array::from_fn(|index| {
        let (i, j) = (index / 3, index % 3);
        let delta = if i == j { quadratic } else { 0.0 };
        -3.0 * m_inv_4pi
            * ((delta + diff[i] * sym_diff[j]) * inv_diff_norm_5
                - 5.0 * diff[i] * diff[j] * quadratic * inv_diff_norm_7)
    });

    (grad_pressure, grad_velocity)
}

/// Stress `-p I + grad u + grad u^T`.
fn stress(pressure: f64, grad_velocity: &[f64; 9]) -> [f64; 9] {
    std::array::from_fn(|index| {
        let (i, j) = (index / 3, index % 3);
        let diagonal = if i == j { -pressure } else { 0.0 };
        diagonal + grad_velocity[3 * i + j] + grad_velocity[3 * j + i]
    })
}

fn write_pvel(pressure: f64, velocity: &[f64; 3], result: &mut [f64]) {
    result[0] = pressure;
    result[1..4].copy_from_slice(velocity);
}

/// Single-layer pressure and velocity. `result` has 4 entries.
pub fn sl_pvel(source: &[f64], target: &[f64], force: &[f64], result: &mut [f64]) {
    let Some((diff, inv_diff_norm)) = separation(source, target) else {
        result[..4].fill(0.0);
        return;
    };
    let (pressure, velocity) = single_layer_pressure_velocity(&diff, inv_diff_norm, force);
    write_pvel(pressure, &velocity, result);
}

/// Single-layer pressure, velocity, pressure gradient and velocity gradient.
///
/// `result` has 16 entries.
pub fn sl_pvel_grad(source: &[f64], target: &[f64], force: &[f64], result: &mut [f64]) {
    let Some((diff, inv_diff_norm)) = separation(source, target) else {
        result[..16].fill(0.0);
        return;
    };
    let (pressure, velocity) = single_layer_pressure_velocity(&diff, inv_diff_norm, force);
    let (grad_pressure, grad_velocity) = single_layer_gradients(&diff, inv_diff_norm, force);
    write_pvel(pressure, &velocity, result);
    result[4..7].copy_from_slice(&grad_pressure);
    result[7..16].copy_from_slice(&grad_velocity);
}

/// Single-layer stress tensor. `result` has 9 entries.
pub fn sl_traction(source: &[f64], target: &[f64], force: &[f64], result: &mut [f64]) {
    let Some((diff, inv_diff_norm)) = separation(source, target) else {
        result[..9].fill(0.0);
        return;
    };
    let (pressure, _) = single_layer_pressure_velocity(&diff, inv_diff_norm, force);
    let (_, grad_velocity) = single_layer_gradients(&diff, inv_diff_norm, force);
    result[..9].copy_from_slice(&stress(pressure, &grad_velocity));
}

/// Single-layer pressure, velocity and velocity Laplacian. `result` has 7 entries.
pub fn sl_pvel_laplacian(source: &[f64], target: &[f64], force: &[f64], result: &mut [f64]) {
    let Some((diff, inv_diff_norm)) = separation(source, target) else {
        result[..7].fill(0.0);
        return;
    };
    let (pressure, velocity) = single_layer_pressure_velocity(&diff, inv_diff_norm, force);
    // Stokes flow: the velocity Laplacian equals the pressure gradient.
    let (laplacian, _) = single_layer_gradients(&diff, inv_diff_norm, force);
    write_pvel(pressure, &velocity, result);
    result[4..7].copy_from_slice(&laplacian);
}

/// Double-layer pressure and velocity. `result` has 4 entries.
pub fn dl_pvel(source: &[f64], target: &[f64], dipole: &[f64], result: &mut [f64]) {
    let Some((diff, inv_diff_norm)) = separation(source, target) else {
        result[..4].fill(0.0);
        return;
    };
    let (pressure, velocity) = double_layer_pressure_velocity(&diff, inv_diff_norm, dipole);
    write_pvel(pressure, &velocity, result);
}

/// Double-layer pressure, velocity, pressure gradient and velocity gradient.
///
/// `result` has 16 entries.
pub fn dl_pvel_grad(source: &[f64], target: &[f64], dipole: &[f64], result: &mut [f64]) {
    let Some((diff, inv_diff_norm)) = separation(source, target) else {
        result[..16].fill(0.0);
        return;
    };
    let (pressure, velocity) = double_layer_pressure_velocity(&diff, inv_diff_norm, dipole);
    let (grad_pressure, grad_velocity) = double_layer_gradients(&diff, inv_diff_norm, dipole);
    write_pvel(pressure, &velocity, result);
    result[4..7].copy_from_slice(&grad_pressure);
    result[7..16].copy_from_slice(&grad_velocity);
}

/// Double-layer stress tensor. `result` has 9 entries.
pub fn dl_traction(source: &[f64], target: &[f64], dipole: &[f64], result: &mut [f64]) {
    let Some((diff, inv_diff_norm)) = separation(source, target) else {
        result[..9].fill(0.0);
        return;
    };
    let (pressure, _) = double_layer_pressure_velocity(&diff, inv_diff_norm, dipole);
    let (_, grad_velocity) = double_layer_gradients(&diff, inv_diff_norm, dipole);
    result[..9].copy_from_slice(&stress(pressure, &grad_velocity));
}

/// Double-layer pressure, velocity and velocity Laplacian. `result` has 7 entries.
pub fn dl_pvel_laplacian(source: &[f64], target: &[f64], dipole: &[f64], result: &mut [f64]) {
    let Some((diff, inv_diff_norm)) = separation(source, target) else {
        result[..7].fill(0.0);
        return;
    };
    let (pressure, velocity) = double_layer_pressure_velocity(&diff, inv_diff_norm, dipole);
    let (laplacian, _) = double_layer_gradients(&diff, inv_diff_norm, dipole);
    write_pvel(pressure, &velocity, result);
    result[4..7].copy_from_slice(&laplacian);
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::kernels::PairwiseFn;
    use approx::assert_relative_eq;

    const SOURCE: [f64; 3] = [0.1, 0.2, 0.3];
    const TARGET: [f64; 3] = [0.7, -0.4, 0.9];
    const FORCE: [f64; 3] = [0.5, -1.0, 0.25];
    const DIPOLE: [f64; 9] = [0.3, -0.2, 0.5, 0.1, -0.7, 0.4, 0.9, 0.2, -0.1];

    fn eval<const N: usize>(kernel: PairwiseFn, target: &[f64; 3], value: &[f64]) -> [f64; N] {
        let mut result = [0.0; N];
        kernel(&SOURCE, target, value, &mut result);
        result
    }

    fn shifted(direction: usize, step: f64) -> [f64; 3] {
        let mut target = TARGET;
        target[direction] += step;
        target
    }

    /// Central difference of component `component` of a 4-wide kernel along `direction`.
    fn central_difference(
        kernel: PairwiseFn,
        value: &[f64],
        component: usize,
        direction: usize,
    ) -> f64 {
        let step = 1E-6;
        let plus = eval::<4>(kernel, &shifted(direction, step), value);
        let minus = eval::<4>(kernel, &shifted(direction, -step), value);
        (plus[component] - minus[component]) / (2.0 * step)
    }

    /// Second-order central difference Laplacian of component `component` of a 4-wide kernel.
    fn laplacian(kernel: PairwiseFn, value: &[f64], component: usize) -> f64 {
        let step = 1E-4;
        let centre = eval::<4>(kernel, &TARGET, value)[component];
        (0..3)
            .map(|direction| {
                let plus = eval::<4>(kernel, &shifted(direction, step), value)[component];
                let minus = eval::<4>(kernel, &shifted(direction, -step), value)[component];
                (plus - 2.0 * centre + minus) / (step * step)
            })
            .sum()
    }

    #[test]
    fn test_stokeslet_closed_form() {
        let mut result = [0.0; 4];
        sl_pvel(&[0.0, 0.0, 0.0], &[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0], &mut result);

        let expected = 0.25 * f64::FRAC_1_PI();
        assert_relative_eq!(result[0], expected, epsilon = 1E-15);
        assert_relative_eq!(result[1], expected, epsilon = 1E-15);
        assert_relative_eq!(result[2], 0.0, epsilon = 1E-15);
        assert_relative_eq!(result[3], 0.0, epsilon = 1E-15);
    }

    #[test]
    fn test_coincident_points_contribute_zero() {
        let mut result = [1.0; 16];
        sl_pvel_grad(&SOURCE, &SOURCE, &FORCE, &mut result);
        assert!(result.iter().all(|&value| value == 0.0));

        let mut result = [1.0; 9];
        dl_traction(&SOURCE, &SOURCE, &DIPOLE, &mut result);
        assert!(result.iter().all(|&value| value == 0.0));
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        for (pvel, pvel_grad, value) in [
            (sl_pvel as PairwiseFn, sl_pvel_grad as PairwiseFn, &FORCE[..]),
            (dl_pvel as PairwiseFn, dl_pvel_grad as PairwiseFn, &DIPOLE[..]),
        ] {
            let full = eval::<16>(pvel_grad, &TARGET, value);
            let plain = eval::<4>(pvel, &TARGET, value);

            for index in 0..4 {
                assert_relative_eq!(full[index], plain[index], epsilon = 1E-15);
            }

            for direction in 0..3 {
                assert_relative_eq!(
                    full[4 + direction],
                    central_difference(pvel, value, 0, direction),
                    epsilon = 1E-6
                );
                for component in 0..3 {
                    assert_relative_eq!(
                        full[7 + 3 * component + direction],
                        central_difference(pvel, value, 1 + component, direction),
                        epsilon = 1E-6
                    );
                }
            }
        }
    }

    #[test]
    fn test_velocity_is_divergence_free() {
        for (pvel_grad, value) in [
            (sl_pvel_grad as PairwiseFn, &FORCE[..]),
            (dl_pvel_grad as PairwiseFn, &DIPOLE[..]),
        ] {
            let full = eval::<16>(pvel_grad, &TARGET, value);
            let divergence = full[7] + full[11] + full[15];
            assert_relative_eq!(divergence, 0.0, epsilon = 1E-13);
        }
    }

    #[test]
    fn test_laplacian_matches_finite_differences() {
        for (pvel, pvel_laplacian, value) in [
            (sl_pvel as PairwiseFn, sl_pvel_laplacian as PairwiseFn, &FORCE[..]),
            (dl_pvel as PairwiseFn, dl_pvel_laplacian as PairwiseFn, &DIPOLE[..]),
        ] {
            let full = eval::<7>(pvel_laplacian, &TARGET, value);
            for component in 0..3 {
                assert_relative_eq!(
                    full[4 + component],
                    laplacian(pvel, value, 1 + component),
                    epsilon = 1E-4
                );
            }
        }
    }

    #[test]
    fn test_single_layer_traction() {
        let result = eval::<9>(sl_traction, &TARGET, &FORCE);

        let diff: Vec<f64> = (0..3).map(|i| TARGET[i] - SOURCE[i]).collect();
        let diff_norm = diff.iter().map(|d| d * d).sum::<f64>().sqrt();
        let force_dot_diff = dot(&FORCE, &diff);

        for i in 0..3 {
            for j in 0..3 {
                let expected = -3.0 * 0.25 * f64::FRAC_1_PI() * diff[i] * diff[j] * force_dot_diff
                    / diff_norm.powi(5);
                assert_relative_eq!(result[3 * i + j], expected, epsilon = 1E-13);
            }
        }
    }

    #[test]
    fn test_double_layer_traction_is_symmetric() {
        let result = eval::<9>(dl_traction, &TARGET, &DIPOLE);
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(result[3 * i + j], result[3 * j + i], epsilon = 1E-14);
            }
        }
    }
}
