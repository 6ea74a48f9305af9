//! Comparison of solver output against the reference.
use std::fmt;

use log::debug;

use crate::distribute::check_count;
use crate::error::VerifyError;
use crate::helpers::{check_len, check_width};
use crate::traits::ProcessGroup;

/// Reference magnitudes at or below this value are excluded from the relative error.
pub const RELATIVE_ERROR_FLOOR: f64 = 1E-10;

/// Default tolerance on the maximum relative error for expansion order `order`.
///
/// Gains half a digit per order: `10^(1 - order / 2)`.
pub fn order_tolerance(order: usize) -> f64 {
    10f64.powf(1.0 - order as f64 / 2.0)
}

/// Error of one output component over all points.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ComponentError {
    /// Maximum absolute error.
    pub max_absolute: f64,
    /// Maximum relative error.
    pub max_relative: f64,
}

/// Aggregate comparison result.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorStats {
    /// Maximum absolute error over all values.
    pub max_absolute: f64,
    /// Maximum relative error over all values whose reference exceeds [RELATIVE_ERROR_FLOOR].
    pub max_relative: f64,
    /// `|computed - reference|_2 / |reference|_2`, or the absolute L2 error if the reference
    /// vanishes.
    pub l2_relative: f64,
    /// Errors per output component.
    pub per_component: Vec<ComponentError>,
    /// Number of points compared.
    pub npoints: usize,
    /// Tolerance the maximum relative error was checked against.
    pub tolerance: f64,
    /// Whether both the maximum relative and the L2 error are within the tolerance.
    ///
    /// The L2 check catches errors at points whose reference is below [RELATIVE_ERROR_FLOOR],
    /// including a reference that vanishes everywhere.
    pub passed: bool,
}

impl fmt::Display for ErrorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} points, max abs {:.3e}, max rel {:.3e}, L2 rel {:.3e} (tolerance {:.1e})",
            self.npoints, self.max_absolute, self.max_relative, self.l2_relative, self.tolerance
        )
    }
}

#[derive(Clone, Debug)]
struct Accumulator {
    per_component: Vec<ComponentError>,
    diff_sq: f64,
    reference_sq: f64,
    npoints: usize,
}

impl Accumulator {
    // Flattened as [npoints, diff_sq, reference_sq, (max_absolute, max_relative) per component].
    const HEADER: usize = 3;

    fn new(width: usize) -> Self {
        Self {
            per_component: vec![ComponentError::default(); width],
            diff_sq: 0.0,
            reference_sq: 0.0,
            npoints: 0,
        }
    }

    fn from_arrays(
        computed: &[f64],
        reference: &[f64],
        width: usize,
    ) -> Result<Self, VerifyError> {
        let npoints = check_width("reference values", reference.len(), width)?;
        check_len("computed values", computed.len(), npoints, width)?;

        let mut acc = Self::new(width);
        acc.npoints = npoints;

        for (computed, reference) in computed
            .chunks_exact(width)
            .zip(reference.chunks_exact(width))
        {
            for ((component, &c), &r) in acc.per_component.iter_mut().zip(computed).zip(reference)
            {
                let diff = (c - r).abs();
                if !diff.is_finite() {
                    // `f64::max` ignores NaN.
                    component.max_absolute = f64::INFINITY;
                    component.max_relative = f64::INFINITY;
                    acc.diff_sq = f64::INFINITY;
                    continue;
                }
                component.max_absolute = component.max_absolute.max(diff);
                if r.abs() > RELATIVE_ERROR_FLOOR {
                    component.max_relative = component.max_relative.max(diff / r.abs());
                }
                acc.diff_sq += diff * diff;
                acc.reference_sq += r * r;
            }
        }

        Ok(acc)
    }

    fn merge(&mut self, other: &Self) {
        for (mine, theirs) in self.per_component.iter_mut().zip(&other.per_component) {
            mine.max_absolute = mine.max_absolute.max(theirs.max_absolute);
            mine.max_relative = mine.max_relative.max(theirs.max_relative);
        }
        self.diff_sq += other.diff_sq;
        self.reference_sq += other.reference_sq;
        self.npoints += other.npoints;
    }

    fn buffer_len(width: usize) -> usize {
        Self::HEADER + 2 * width
    }

    fn to_buffer(&self) -> Vec<f64> {
        let mut buffer = vec![self.npoints as f64, self.diff_sq, self.reference_sq];
        for component in &self.per_component {
            buffer.push(component.max_absolute);
            buffer.push(component.max_relative);
        }
        buffer
    }

    fn from_buffer(buffer: &[f64]) -> Self {
        let per_component = buffer[Self::HEADER..]
            .chunks_exact(2)
            .map(|pair| ComponentError {
                max_absolute: pair[0],
                max_relative: pair[1],
            })
            .collect();
        Self {
            per_component,
            diff_sq: buffer[1],
            reference_sq: buffer[2],
            npoints: buffer[0] as usize,
        }
    }

    fn finish(self, tolerance: f64) -> ErrorStats {
        let max_absolute = self
            .per_component
            .iter()
            .fold(0.0, |acc: f64, component| acc.max(component.max_absolute));
        let max_relative = self
            .per_component
            .iter()
            .fold(0.0, |acc: f64, component| acc.max(component.max_relative));
        let l2_relative = if self.reference_sq > 0.0 {
            (self.diff_sq / self.reference_sq).sqrt()
        } else {
            self.diff_sq.sqrt()
        };

        ErrorStats {
            max_absolute,
            max_relative,
            l2_relative,
            per_component: self.per_component,
            npoints: self.npoints,
            tolerance,
            passed: max_relative <= tolerance && l2_relative <= tolerance,
        }
    }
}

/// Compare `computed` against `reference`, both holding `width` values per point.
///
/// An error above `tolerance` is reported through [ErrorStats::passed], not as an error.
/// Non-finite values in either array count as an infinite error. Arrays whose lengths do not
/// agree are an error.
pub fn compare_and_report(
    computed: &[f64],
    reference: &[f64],
    width: usize,
    tolerance: f64,
) -> Result<ErrorStats, VerifyError> {
    Ok(Accumulator::from_arrays(computed, reference, width)?.finish(tolerance))
}

/// Compare the local slices of every rank and return the statistics of the whole group.
///
/// Collective, with one fixed-size gather. Every rank returns the same statistics. If the
/// arrays of any rank do not fit `width`, every rank fails.
pub fn compare_distributed<G: ProcessGroup>(
    group: &G,
    computed: &[f64],
    reference: &[f64],
    width: usize,
    tolerance: f64,
) -> Result<ErrorStats, VerifyError> {
    let local = Accumulator::from_arrays(computed, reference, width);

    // A leading flag marks ranks whose local comparison failed.
    let buffer_len = 1 + Accumulator::buffer_len(width);
    let mut buffer = vec![0.0; buffer_len];
    match &local {
        Ok(acc) => {
            buffer[0] = 1.0;
            buffer[1..].copy_from_slice(&acc.to_buffer());
        }
        Err(err) => debug!("rank {} cannot compare: {}", group.rank(), err),
    }

    check_count(group, "comparison buffers", buffer_len * group.size())?;
    let counts = vec![buffer_len; group.size()];
    let gathered = group.all_gather_varcount(&buffer, &counts);

    let local = local?;
    let mut total = Accumulator::new(width);
    for (rank, buffer) in gathered.chunks_exact(buffer_len).enumerate() {
        if buffer[0] != 1.0 {
            return Err(VerifyError::PeerFailure {
                rank,
                what: "comparison",
            });
        }
        if rank == group.rank() {
            total.merge(&local);
        } else {
            total.merge(&Accumulator::from_buffer(&buffer[1..]));
        }
    }

    Ok(total.finish(tolerance))
}
