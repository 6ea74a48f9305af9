//! Interface to the accelerated solver under test, and a direct-summation stand-in.
//!
//! A solver is driven in a fixed order: [AcceleratedSolver::configure], then
//! [AcceleratedSolver::set_domain], then either [AcceleratedSolver::set_points] followed per
//! kernel by [AcceleratedSolver::build_spatial_structure] and [AcceleratedSolver::evaluate], or
//! only [AcceleratedSolver::evaluate_pairwise] calls.
use std::cmp::Ordering;

use log::debug;
use serde::Deserialize;

use crate::dispatch::{kernel_dimensions, kernel_entry};
use crate::error::VerifyError;
use crate::traits::{DistributedReferenceEvaluator, PairwiseKernel, ProcessGroup};
use crate::types::{KernelDimensions, KernelKind, KernelMask, LayerKind, LayerSources, Sources};

/// Periodic directions of the domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Periodicity {
    /// Free space.
    #[default]
    None,
    /// Periodic along x.
    X,
    /// Periodic along x and y.
    XY,
    /// Periodic along all axes.
    XYZ,
}

/// Solver parameters fixed for one expansion order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverSettings {
    /// Expansion order.
    pub order: usize,
    /// Maximum number of points in a leaf of the spatial structure.
    pub max_leaf_size: usize,
    /// Periodic directions.
    pub periodicity: Periodicity,
    /// Kernels to prepare.
    pub kernels: KernelMask,
}

/// Axis-aligned box containing all points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxDomain {
    /// Lower corner.
    pub lower: [f64; 3],
    /// Upper corner.
    pub upper: [f64; 3],
}

impl BoxDomain {
    /// The cube `[origin, origin + edge]^3`.
    pub fn cube(origin: f64, edge: f64) -> Self {
        Self {
            lower: [origin; 3],
            upper: [origin + edge; 3],
        }
    }
}

/// Operations the harness needs from the solver under test.
///
/// Methods taking `&mut self` other than [AcceleratedSolver::configure] and
/// [AcceleratedSolver::set_domain] may be collective: every rank calls them in the same order.
pub trait AcceleratedSolver {
    /// Prepare the kernels of `settings.kernels` for the given expansion order.
    fn configure(&mut self, settings: &SolverSettings) -> Result<(), VerifyError>;

    /// Set the bounding box of all points.
    fn set_domain(&mut self, domain: BoxDomain) -> Result<(), VerifyError>;

    /// Set the local single-layer sources, double-layer sources and targets.
    fn set_points(
        &mut self,
        single_layer: &[f64],
        double_layer: &[f64],
        targets: &[f64],
    ) -> Result<(), VerifyError>;

    /// Build the spatial structure for `kind` over the current points.
    fn build_spatial_structure(&mut self, kind: KernelKind) -> Result<(), VerifyError>;

    /// Evaluate `kind` at the local targets. `result` is overwritten.
    fn evaluate(
        &mut self,
        kind: KernelKind,
        single_layer_values: &[f64],
        double_layer_values: &[f64],
        result: &mut [f64],
    ) -> Result<(), VerifyError>;

    /// Add the direct contribution of the given sources of one layer to `result`.
    ///
    /// Local to the calling rank and independent of the points set with
    /// [AcceleratedSolver::set_points].
    fn evaluate_pairwise(
        &self,
        kind: KernelKind,
        layer: LayerKind,
        sources: &[f64],
        values: &[f64],
        targets: &[f64],
        result: &mut [f64],
    ) -> Result<(), VerifyError>;

    /// Value widths of a kernel.
    fn kernel_dimensions(&self, kind: KernelKind) -> KernelDimensions;

    /// Whether `kind` was prepared by the last [AcceleratedSolver::configure].
    fn is_kernel_active(&self, kind: KernelKind) -> bool;
}

#[derive(Clone, Debug, Default)]
struct SolverPoints {
    single_layer: Vec<f64>,
    double_layer: Vec<f64>,
    targets: Vec<f64>,
}

/// Solver that evaluates every sum exactly by gathering all sources.
///
/// Stands in for an accelerated solver when none is linked, and checks that it is driven in
/// the documented order.
pub struct DirectSolver<'g, G: ProcessGroup> {
    group: &'g G,
    settings: Option<SolverSettings>,
    domain: Option<BoxDomain>,
    points: Option<SolverPoints>,
    built: Option<KernelKind>,
}

impl<'g, G: ProcessGroup> DirectSolver<'g, G> {
    /// New solver over a process group.
    pub fn new(group: &'g G) -> Self {
        Self {
            group,
            settings: None,
            domain: None,
            points: None,
            built: None,
        }
    }

    fn check_active(&self, kind: KernelKind) -> Result<(), VerifyError> {
        if self.is_kernel_active(kind) {
            Ok(())
        } else {
            Err(VerifyError::Solver(format!("kernel {kind} is not active")))
        }
    }
}

impl<G: ProcessGroup> AcceleratedSolver for DirectSolver<'_, G> {
    fn configure(&mut self, settings: &SolverSettings) -> Result<(), VerifyError> {
        if settings.periodicity != Periodicity::None {
            return Err(VerifyError::Solver(format!(
                "periodicity {:?} is not supported by direct summation",
                settings.periodicity
            )));
        }
        debug!(
            "direct solver configured for order {} with kernel mask {}",
            settings.order,
            settings.kernels.bits()
        );
        self.settings = Some(*settings);
        self.points = None;
        self.built = None;
        Ok(())
    }

    fn set_domain(&mut self, domain: BoxDomain) -> Result<(), VerifyError> {
        if self.settings.is_none() {
            return Err(VerifyError::Solver(
                "domain set before the solver was configured".to_string(),
            ));
        }
        let is_empty = (0..3).any(|axis| {
            domain.lower[axis].partial_cmp(&domain.upper[axis]) != Some(Ordering::Less)
        });
        if is_empty {
            return Err(VerifyError::Solver(format!("empty domain {:?}", domain)));
        }
        self.domain = Some(domain);
        Ok(())
    }

    fn set_points(
        &mut self,
        single_layer: &[f64],
        double_layer: &[f64],
        targets: &[f64],
    ) -> Result<(), VerifyError> {
        if self.domain.is_none() {
            return Err(VerifyError::Solver("points set before the domain".to_string()));
        }
        self.points = Some(SolverPoints {
            single_layer: single_layer.to_vec(),
            double_layer: double_layer.to_vec(),
            targets: targets.to_vec(),
        });
        self.built = None;
        Ok(())
    }

    fn build_spatial_structure(&mut self, kind: KernelKind) -> Result<(), VerifyError> {
        self.check_active(kind)?;
        if self.points.is_none() {
            return Err(VerifyError::Solver(format!(
                "structure for {kind} built before points were set"
            )));
        }
        self.built = Some(kind);
        Ok(())
    }

    fn evaluate(
        &mut self,
        kind: KernelKind,
        single_layer_values: &[f64],
        double_layer_values: &[f64],
        result: &mut [f64],
    ) -> Result<(), VerifyError> {
        if self.built != Some(kind) {
            return Err(VerifyError::Solver(format!(
                "{kind} evaluated without building its structure"
            )));
        }
        let Some(points) = &self.points else {
            return Err(VerifyError::Solver("no points set".to_string()));
        };

        let sources = Sources::new(
            LayerSources::new(&points.single_layer, single_layer_values),
            LayerSources::new(&points.double_layer, double_layer_values),
        );
        kernel_entry(kind).evaluate_distributed(self.group, &points.targets, sources, result)
    }

    fn evaluate_pairwise(
        &self,
        kind: KernelKind,
        layer: LayerKind,
        sources: &[f64],
        values: &[f64],
        targets: &[f64],
        result: &mut [f64],
    ) -> Result<(), VerifyError> {
        self.check_active(kind)?;

        let layer_sources = LayerSources::new(sources, values);
        let sources = match layer {
            LayerKind::SingleLayer => Sources::new(layer_sources, LayerSources::empty()),
            LayerKind::DoubleLayer => Sources::new(LayerSources::empty(), layer_sources),
        };

        let mut contribution = vec![0.0; result.len()];
        kernel_entry(kind).evaluate_mt(targets, sources, &mut contribution)?;
        for (acc, increment) in result.iter_mut().zip(contribution) {
            *acc += increment;
        }
        Ok(())
    }

    fn kernel_dimensions(&self, kind: KernelKind) -> KernelDimensions {
        kernel_dimensions(kind)
    }

    fn is_kernel_active(&self, kind: KernelKind) -> bool {
        self.settings
            .is_some_and(|settings| settings.kernels.contains(kind))
    }
}
