//! Harness configuration.
//!
//! Read from TOML. Every field is optional; missing fields take the defaults of
//! [HarnessConfig::default].
//!
//! ```toml
//! single_layer_sources = 4
//! double_layer_sources = 0
//! targets = 8
//! kernel_mask = 3
//! target_distribution = "chebyshev"
//! orders = [8, 10]
//! ```
use std::path::Path;

use serde::Deserialize;

use crate::compare::order_tolerance;
use crate::error::VerifyError;
use crate::points::TargetDistribution;
use crate::solver::{Periodicity, SolverSettings};
use crate::types::KernelMask;

/// How the solver under test is exercised.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// Distribute all points and evaluate through the spatial structure.
    #[default]
    Accelerated,
    /// Keep all points on the root and use the solver's direct pairwise evaluation.
    Pairwise,
}

/// Configuration of a verification run.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Single-layer source count: 0 for none, 1, 2 or 4 for a fixed pattern, anything else
    /// to place the sources on the targets.
    pub single_layer_sources: usize,
    /// Double-layer source count, with the same meaning.
    pub double_layer_sources: usize,
    /// Target parameter `T`: `(T + 1)^3` targets are generated.
    pub targets: usize,
    /// Edge length of the box.
    pub box_edge: f64,
    /// Lower corner of the box along every axis.
    pub shift: f64,
    /// Kernel selection bits, 0 for all kernels.
    pub kernel_mask: u32,
    /// Placement of the targets.
    pub target_distribution: TargetDistribution,
    /// Evaluation mode.
    pub mode: EvaluationMode,
    /// Compute the reference and compare.
    pub verify: bool,
    /// Expansion orders to test.
    pub orders: Vec<usize>,
    /// Maximum points per leaf.
    pub max_leaf_size: usize,
    /// Periodic directions.
    pub periodicity: Periodicity,
    /// Fixed tolerance on the maximum relative error. Per-order default if absent.
    pub tolerance: Option<f64>,
    /// Seed of the point and value generators.
    pub seed: u64,
    /// Worker threads per process. One per CPU if absent.
    pub threads: Option<usize>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            single_layer_sources: 1,
            double_layer_sources: 1,
            targets: 2,
            box_edge: 1.0,
            shift: 0.0,
            kernel_mask: 0,
            target_distribution: TargetDistribution::Random,
            mode: EvaluationMode::Accelerated,
            verify: true,
            orders: vec![6, 8, 10, 12, 14],
            max_leaf_size: 2000,
            periodicity: Periodicity::None,
            tolerance: None,
            seed: 0,
            threads: None,
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> VerifyError {
    VerifyError::InvalidConfig {
        field,
        reason: reason.to_string(),
    }
}

impl HarnessConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, VerifyError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, VerifyError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Check all values, reporting the first offending field.
    pub fn validate(&self) -> Result<(), VerifyError> {
        if !(self.box_edge.is_finite() && self.box_edge > 0.0) {
            return Err(invalid("box_edge", "must be positive and finite"));
        }
        if !self.shift.is_finite() {
            return Err(invalid("shift", "must be finite"));
        }
        if self.orders.is_empty() {
            return Err(invalid("orders", "at least one expansion order is required"));
        }
        if self.orders.contains(&0) {
            return Err(invalid("orders", "expansion orders must be positive"));
        }
        if self.max_leaf_size == 0 {
            return Err(invalid("max_leaf_size", "must be positive"));
        }
        if let Some(tolerance) = self.tolerance {
            if !(tolerance.is_finite() && tolerance > 0.0) {
                return Err(invalid("tolerance", "must be positive and finite"));
            }
        }
        if self.threads == Some(0) {
            return Err(invalid("threads", "must be positive"));
        }
        self.kernels()?;
        Ok(())
    }

    /// Selected kernels.
    pub fn kernels(&self) -> Result<KernelMask, VerifyError> {
        KernelMask::from_bits(self.kernel_mask)
    }

    /// Tolerance on the maximum relative error at expansion order `order`.
    pub fn tolerance_for(&self, order: usize) -> f64 {
        self.tolerance.unwrap_or_else(|| order_tolerance(order))
    }

    /// Solver settings for expansion order `order`.
    pub fn solver_settings(&self, order: usize) -> Result<SolverSettings, VerifyError> {
        Ok(SolverSettings {
            order,
            max_leaf_size: self.max_leaf_size,
            periodicity: self.periodicity,
            kernels: self.kernels()?,
        })
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::types::KernelKind;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::from_toml_str("").unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.kernels().unwrap(), KernelMask::all());
        assert_eq!(config.orders, vec![6, 8, 10, 12, 14]);
        assert_eq!(config.tolerance_for(6), order_tolerance(6));
    }

    #[test]
    fn test_parse() {
        let config = HarnessConfig::from_toml_str(
            r#"
            single_layer_sources = 4
            double_layer_sources = 0
            targets = 8
            box_edge = 2.0
            shift = -1.0
            kernel_mask = 17
            target_distribution = "chebyshev"
            mode = "pairwise"
            verify = false
            orders = [8]
            periodicity = "none"
            tolerance = 1e-5
            seed = 42
            threads = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.single_layer_sources, 4);
        assert_eq!(config.target_distribution, TargetDistribution::Chebyshev);
        assert_eq!(config.mode, EvaluationMode::Pairwise);
        assert!(!config.verify);
        assert_eq!(config.tolerance_for(8), 1e-5);
        assert_eq!(config.threads, Some(2));

        let kernels = config.kernels().unwrap();
        assert_eq!(
            kernels.iter().collect::<Vec<_>>(),
            vec![KernelKind::PVel, KernelKind::LapPGrad]
        );

        let settings = config.solver_settings(8).unwrap();
        assert_eq!(settings.order, 8);
        assert_eq!(settings.max_leaf_size, 2000);
        assert_eq!(settings.kernels, kernels);
    }

    #[test]
    fn test_rejects_invalid_values() {
        for (input, field) in [
            ("box_edge = 0.0", "box_edge"),
            ("box_edge = -1.0", "box_edge"),
            ("shift = nan", "shift"),
            ("orders = []", "orders"),
            ("orders = [6, 0]", "orders"),
            ("max_leaf_size = 0", "max_leaf_size"),
            ("tolerance = 0.0", "tolerance"),
            ("threads = 0", "threads"),
            ("kernel_mask = 64", "kernel_mask"),
        ] {
            match HarnessConfig::from_toml_str(input) {
                Err(VerifyError::InvalidConfig { field: found, .. }) => assert_eq!(found, field),
                other => panic!("{input}: expected invalid {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            HarnessConfig::from_toml_str("unknown_field = 1"),
            Err(VerifyError::ConfigParse(_))
        ));
        assert!(matches!(
            HarnessConfig::from_toml_str("mode = \"fast\""),
            Err(VerifyError::ConfigParse(_))
        ));
        assert!(matches!(
            HarnessConfig::from_file("/nonexistent/fmm-verify.toml"),
            Err(VerifyError::Io(_))
        ));
    }
}
