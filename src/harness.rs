//! Verification driver.
//!
//! For every configured expansion order the harness configures the solver, generates points on
//! the root, and then for every active kernel draws fresh source values, runs the solver,
//! computes the reference and compares the two. Every rank of the group runs the same sequence
//! of collectives, so a failure that depends only on the configuration stops all ranks at the
//! same point.
use std::fmt;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::compare::{compare_distributed, ErrorStats};
use crate::config::{EvaluationMode, HarnessConfig};
use crate::dispatch::{kernel_dimensions, kernel_entry};
use crate::distribute::distribute;
use crate::error::VerifyError;
use crate::points::{random_values, target_points, SourcePattern};
use crate::solver::{AcceleratedSolver, BoxDomain};
use crate::traits::{DistributedReferenceEvaluator, ProcessGroup, ROOT};
use crate::types::{KernelDimensions, KernelKind, LayerKind, LayerSources, PointSet, Sources};

/// Outcome of one kernel at one expansion order.
#[derive(Clone, Debug, PartialEq)]
pub struct CaseReport {
    /// Expansion order.
    pub order: usize,
    /// Kernel.
    pub kind: KernelKind,
    /// Value widths of the kernel.
    pub dimensions: KernelDimensions,
    /// Comparison against the reference, `None` if verification is off.
    pub stats: Option<ErrorStats>,
}

impl CaseReport {
    /// Whether the case passed. Unverified cases pass.
    pub fn passed(&self) -> bool {
        self.stats.as_ref().map_or(true, |stats| stats.passed)
    }
}

impl fmt::Display for CaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p = {}, {}: ", self.order, self.kind)?;
        match &self.stats {
            Some(stats) if stats.passed => write!(f, "passed, {}", stats),
            Some(stats) => write!(f, "FAILED, {}", stats),
            None => write!(f, "not verified"),
        }
    }
}

/// Outcome of a whole run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HarnessReport {
    /// One entry per order and kernel, in the order they were run.
    pub cases: Vec<CaseReport>,
}

impl HarnessReport {
    /// Whether every case passed.
    pub fn all_passed(&self) -> bool {
        self.cases.iter().all(CaseReport::passed)
    }

    /// The failed cases.
    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> + '_ {
        self.cases.iter().filter(|case| !case.passed())
    }
}

/// Point sets of one rank.
struct LocalPoints {
    single_layer: Vec<f64>,
    double_layer: Vec<f64>,
    targets: Vec<f64>,
}

impl LocalPoints {
    fn ntargets(&self) -> usize {
        self.targets.len() / 3
    }
}

/// Drives a solver through all configured cases.
pub struct Harness<'g, G: ProcessGroup, S: AcceleratedSolver> {
    group: &'g G,
    solver: S,
    config: HarnessConfig,
}

impl<'g, G: ProcessGroup, S: AcceleratedSolver> Harness<'g, G, S> {
    /// New harness. The configuration is validated.
    pub fn new(group: &'g G, solver: S, config: HarnessConfig) -> Result<Self, VerifyError> {
        config.validate()?;
        Ok(Self {
            group,
            solver,
            config,
        })
    }

    /// The configuration.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Give back the solver.
    pub fn into_solver(self) -> S {
        self.solver
    }

    /// Run all cases. Collective.
    ///
    /// Cases failing their tolerance are recorded in the report. Errors abort the run.
    pub fn run(&mut self) -> Result<HarnessReport, VerifyError> {
        let mut point_rng = StdRng::seed_from_u64(self.config.seed);
        let mut value_rng =
            StdRng::seed_from_u64(self.config.seed.wrapping_add(1 + self.group.rank() as u64));

        let mut report = HarnessReport::default();
        for order in self.config.orders.clone() {
            if self.group.is_root() {
                info!("testing expansion order p = {}", order);
            }
            self.run_order(order, &mut point_rng, &mut value_rng, &mut report)?;
        }

        if self.group.is_root() {
            let nfailed = report.failures().count();
            if nfailed == 0 {
                info!("all {} cases passed", report.cases.len());
            } else {
                warn!("{} of {} cases failed", nfailed, report.cases.len());
            }
        }
        Ok(report)
    }

    /// Generate the global point sets. Only called on the root.
    fn generate_points(&self, rng: &mut StdRng) -> Result<[PointSet; 3], VerifyError> {
        let config = &self.config;
        let targets = target_points(
            config.target_distribution,
            config.targets,
            config.box_edge,
            config.shift,
            rng,
        );
        let single_layer = SourcePattern::from_count(config.single_layer_sources).source_points(
            config.box_edge,
            config.shift,
            &targets,
        )?;
        let double_layer = SourcePattern::from_count(config.double_layer_sources).source_points(
            config.box_edge,
            config.shift,
            &targets,
        )?;

        info!(
            "nSL: {}, nDL: {}, nTrg: {}",
            single_layer.len(),
            double_layer.len(),
            targets.len()
        );
        Ok([single_layer, double_layer, targets])
    }

    fn run_order(
        &mut self,
        order: usize,
        point_rng: &mut StdRng,
        value_rng: &mut StdRng,
        report: &mut HarnessReport,
    ) -> Result<(), VerifyError> {
        let settings = self.config.solver_settings(order)?;
        self.solver.configure(&settings)?;
        self.solver
            .set_domain(BoxDomain::cube(self.config.shift, self.config.box_edge))?;

        // Point generation only runs on the root. Its outcome is broadcast before any rank
        // returns.
        let generated = if self.group.is_root() {
            self.generate_points(point_rng)
        } else {
            Ok(Default::default())
        };
        let failed = self.group.broadcast_count(usize::from(generated.is_err()));
        let [single_layer, double_layer, targets] = generated?;
        if failed != 0 {
            return Err(VerifyError::PeerFailure {
                rank: ROOT,
                what: "point generation",
            });
        }
        self.group.barrier();

        let points = match self.config.mode {
            EvaluationMode::Accelerated => {
                let points = LocalPoints {
                    single_layer: distribute(self.group, single_layer.coordinates(), 3)?,
                    double_layer: distribute(self.group, double_layer.coordinates(), 3)?,
                    targets: distribute(self.group, targets.coordinates(), 3)?,
                };
                self.solver
                    .set_points(&points.single_layer, &points.double_layer, &points.targets)?;
                points
            }
            EvaluationMode::Pairwise => LocalPoints {
                single_layer: single_layer.into_coordinates(),
                double_layer: double_layer.into_coordinates(),
                targets: targets.into_coordinates(),
            },
        };

        for kind in settings.kernels.iter() {
            if !self.solver.is_kernel_active(kind) {
                continue;
            }
            let case = self.run_case(order, kind, &points, value_rng)?;
            if self.group.is_root() {
                if case.passed() {
                    info!("{}", case);
                } else {
                    warn!("{}", case);
                }
            }
            report.cases.push(case);
        }

        Ok(())
    }

    fn run_case(
        &mut self,
        order: usize,
        kind: KernelKind,
        points: &LocalPoints,
        value_rng: &mut StdRng,
    ) -> Result<CaseReport, VerifyError> {
        let dimensions = self.solver.kernel_dimensions(kind);
        let expected = kernel_dimensions(kind);
        if dimensions != expected {
            return Err(VerifyError::KernelDimensionMismatch {
                kind,
                expected,
                found: dimensions,
            });
        }
        if self.group.is_root() {
            info!("{}: kdim {}", kind, dimensions);
        }

        let single_layer_values = random_values(
            points.single_layer.len() / 3,
            dimensions.single_layer,
            value_rng,
        )
        .into_data();
        let double_layer_values = random_values(
            points.double_layer.len() / 3,
            dimensions.double_layer,
            value_rng,
        )
        .into_data();
        let mut computed = vec![0.0; points.ntargets() * dimensions.target];

        match self.config.mode {
            EvaluationMode::Accelerated => {
                self.solver.build_spatial_structure(kind)?;
                self.solver.evaluate(
                    kind,
                    &single_layer_values,
                    &double_layer_values,
                    &mut computed,
                )?;
            }
            EvaluationMode::Pairwise => {
                self.solver.evaluate_pairwise(
                    kind,
                    LayerKind::SingleLayer,
                    &points.single_layer,
                    &single_layer_values,
                    &points.targets,
                    &mut computed,
                )?;
                self.solver.evaluate_pairwise(
                    kind,
                    LayerKind::DoubleLayer,
                    &points.double_layer,
                    &double_layer_values,
                    &points.targets,
                    &mut computed,
                )?;
            }
        }

        let stats = if self.config.verify {
            let sources = Sources::new(
                LayerSources::new(&points.single_layer, &single_layer_values),
                LayerSources::new(&points.double_layer, &double_layer_values),
            );
            let mut reference = vec![0.0; computed.len()];
            kernel_entry(kind).evaluate_distributed(
                self.group,
                &points.targets,
                sources,
                &mut reference,
            )?;
            Some(compare_distributed(
                self.group,
                &computed,
                &reference,
                dimensions.target,
                self.config.tolerance_for(order),
            )?)
        } else {
            None
        };

        self.group.barrier();

        Ok(CaseReport {
            order,
            kind,
            dimensions,
            stats,
        })
    }
}
