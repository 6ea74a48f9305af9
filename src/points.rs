//! Point and value generation.
//!
//! All generators place points in the box `[origin, origin + box_edge)^3`.
use num::traits::FloatConst;
use rand::Rng;
use serde::Deserialize;

use crate::error::VerifyError;
use crate::types::{PointSet, ValueSet};

/// Independent uniformly distributed points in the box.
pub fn uniform_random<R: Rng + ?Sized>(
    count: usize,
    box_edge: f64,
    origin: f64,
    rng: &mut R,
) -> PointSet {
    let mut points = PointSet::new();
    for _ in 0..count {
        points.push([
            origin + box_edge * rng.gen::<f64>(),
            origin + box_edge * rng.gen::<f64>(),
            origin + box_edge * rng.gen::<f64>(),
        ]);
    }
    points
}

/// Chebyshev nodes `0.5 * (1 - cos(i pi / n))` on `[0, 1]`, for `i = 0..=n`.
///
/// A single node at `0.5` for `n = 0`.
fn chebyshev_nodes(n: usize) -> Vec<f64> {
    if n == 0 {
        return vec![0.5];
    }
    (0..=n)
        .map(|i| 0.5 * (1.0 - (i as f64 * f64::PI() / n as f64).cos()))
        .collect()
}

/// Tensor-product lattice of `(n + 1)^3` points with Chebyshev spacing along each axis.
///
/// Points are ordered with x varying fastest, then y, then z.
pub fn chebyshev_lattice(n: usize, box_edge: f64, origin: f64) -> PointSet {
    let nodes = chebyshev_nodes(n)
        .into_iter()
        .map(|node| origin + box_edge * node)
        .collect::<Vec<_>>();

    let mut points = PointSet::new();
    for &z in &nodes {
        for &y in &nodes {
            for &x in &nodes {
                points.push([x, y, z]);
            }
        }
    }
    points
}

/// Deterministic configurations of 1, 2 or 4 points around the box center.
///
/// - 1: the center.
/// - 2: the center shifted by `±0.1 * box_edge` along x.
/// - 4: a regular tetrahedron with vertices at `center + 0.1 * box_edge * (±1, ±1, ±1)`,
///   taking the sign combinations with an even number of minus signs.
pub fn fixed_pattern(count: usize, box_edge: f64, origin: f64) -> Result<PointSet, VerifyError> {
    let center = origin + 0.5 * box_edge;
    let offset = 0.1 * box_edge;

    let directions: &[[f64; 3]] = match count {
        1 => &[[0.0, 0.0, 0.0]],
        2 => &[[1.0, 0.0, 0.0], [-1.0, 0.0, 0.0]],
        4 => &[
            [1.0, 1.0, 1.0],
            [1.0, -1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [-1.0, -1.0, 1.0],
        ],
        _ => {
            return Err(VerifyError::InvalidConfig {
                field: "source count",
                reason: format!("no fixed pattern with {count} points, expected 1, 2 or 4"),
            })
        }
    };

    let mut points = PointSet::new();
    for direction in directions {
        points.push([
            center + offset * direction[0],
            center + offset * direction[1],
            center + offset * direction[2],
        ]);
    }
    Ok(points)
}

/// How the sources of one layer are placed, chosen by the configured source count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourcePattern {
    /// No sources.
    Empty,
    /// One of the fixed patterns of [fixed_pattern].
    Fixed(usize),
    /// The sources coincide with the targets.
    SameAsTargets,
}

impl SourcePattern {
    /// Pattern for a configured source count: 0 is empty, 1, 2 and 4 are fixed patterns and
    /// any other count reuses the targets.
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => SourcePattern::Empty,
            1 | 2 | 4 => SourcePattern::Fixed(count),
            _ => SourcePattern::SameAsTargets,
        }
    }

    /// Generate the source points of this pattern.
    pub fn source_points(
        &self,
        box_edge: f64,
        origin: f64,
        targets: &PointSet,
    ) -> Result<PointSet, VerifyError> {
        match *self {
            SourcePattern::Empty => Ok(PointSet::new()),
            SourcePattern::Fixed(count) => fixed_pattern(count, box_edge, origin),
            SourcePattern::SameAsTargets => Ok(targets.clone()),
        }
    }
}

/// Placement of the targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetDistribution {
    /// Uniformly random points.
    #[default]
    Random,
    /// The Chebyshev lattice of [chebyshev_lattice].
    Chebyshev,
}

/// Generate `(n + 1)^3` targets.
pub fn target_points<R: Rng + ?Sized>(
    distribution: TargetDistribution,
    n: usize,
    box_edge: f64,
    origin: f64,
    rng: &mut R,
) -> PointSet {
    match distribution {
        TargetDistribution::Random => uniform_random((n + 1).pow(3), box_edge, origin, rng),
        TargetDistribution::Chebyshev => chebyshev_lattice(n, box_edge, origin),
    }
}

/// Source values uniformly distributed in `[-1, 1)`, `width` per point.
pub fn random_values<R: Rng + ?Sized>(npoints: usize, width: usize, rng: &mut R) -> ValueSet {
    let mut values = ValueSet::zeros(npoints, width);
    values
        .data_mut()
        .iter_mut()
        .for_each(|value| *value = rng.gen_range(-1.0..1.0));
    values
}

#[cfg(test)]
mod test {

    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_uniform_random_in_box() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let points = uniform_random(500, 2.0, -1.0, &mut rng);
        assert_eq!(points.len(), 500);
        assert!(points
            .coordinates()
            .iter()
            .all(|&coord| (-1.0..=1.0).contains(&coord)));

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(uniform_random(500, 2.0, -1.0, &mut rng), points);
    }

    #[test]
    fn test_chebyshev_lattice() {
        let points = chebyshev_lattice(2, 1.0, 0.0);
        assert_eq!(points.len(), 27);
        assert_eq!(points.point(0), &[0.0, 0.0, 0.0]);
        assert_relative_eq!(points.point(1)[0], 0.5, epsilon = 1E-15);
        assert_eq!(points.point(2)[0], 1.0);
        assert_eq!(points.point(3), &[0.0, points.point(4)[1], 0.0]);
        assert_eq!(points.point(26), &[1.0, 1.0, 1.0]);

        let points = chebyshev_lattice(4, 2.0, 1.0);
        assert_eq!(points.len(), 125);
        assert!(points
            .coordinates()
            .iter()
            .all(|&coord| (1.0..=3.0).contains(&coord)));

        let center = chebyshev_lattice(0, 1.0, 0.0);
        assert_eq!(center.coordinates(), &[0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_fixed_patterns() {
        let one = fixed_pattern(1, 2.0, 0.0).unwrap();
        assert_eq!(one.coordinates(), &[1.0, 1.0, 1.0]);

        let two = fixed_pattern(2, 1.0, 0.0).unwrap();
        assert_eq!(two.len(), 2);
        for index in 0..3 {
            assert_relative_eq!(
                0.5 * (two.point(0)[index] + two.point(1)[index]),
                0.5,
                epsilon = 1E-15
            );
        }

        let four = fixed_pattern(4, 1.0, 0.0).unwrap();
        assert_eq!(four.len(), 4);
        for i in 0..4 {
            for j in 0..i {
                let dist_sq = (0..3)
                    .map(|k| (four.point(i)[k] - four.point(j)[k]).powi(2))
                    .sum::<f64>();
                assert_relative_eq!(dist_sq, 0.08, epsilon = 1E-15);
            }
        }

        assert_eq!(fixed_pattern(4, 1.0, 0.0).unwrap(), four);
        assert!(matches!(
            fixed_pattern(3, 1.0, 0.0),
            Err(VerifyError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_source_pattern() {
        assert_eq!(SourcePattern::from_count(0), SourcePattern::Empty);
        assert_eq!(SourcePattern::from_count(2), SourcePattern::Fixed(2));
        assert_eq!(SourcePattern::from_count(3), SourcePattern::SameAsTargets);
        assert_eq!(SourcePattern::from_count(100), SourcePattern::SameAsTargets);

        let targets = chebyshev_lattice(1, 1.0, 0.0);
        let sources = SourcePattern::SameAsTargets
            .source_points(1.0, 0.0, &targets)
            .unwrap();
        assert_eq!(sources, targets);
        assert!(SourcePattern::Empty
            .source_points(1.0, 0.0, &targets)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_target_points() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let random = target_points(TargetDistribution::Random, 3, 1.0, 0.0, &mut rng);
        assert_eq!(random.len(), 64);
        let lattice = target_points(TargetDistribution::Chebyshev, 3, 1.0, 0.0, &mut rng);
        assert_eq!(lattice, chebyshev_lattice(3, 1.0, 0.0));
    }

    #[test]
    fn test_random_values() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let values = random_values(50, 9, &mut rng);
        assert_eq!(values.len(), 50);
        assert_eq!(values.width(), 9);
        assert!(values
            .data()
            .iter()
            .all(|&value| (-1.0..1.0).contains(&value)));
    }
}
