//! Traits for process groups and reference kernel evaluation

use crate::distribute::replicate_layer;
use crate::error::VerifyError;
use crate::evaluate::evaluate_one_target;
use crate::helpers::check_dimensions_evaluate;
use crate::types::{KernelDimensions, KernelKind, LayerKind, LayerSources, Sources};
use rayon::prelude::*;

/// Rank that owns globally known arrays before distribution.
pub const ROOT: usize = 0;

/// Explicit execution context of a group of cooperating processes.
///
/// All collective methods block until every rank of the group has called them. Every rank
/// must call the same collectives the same number of times and in the same order, otherwise
/// the group deadlocks.
pub trait ProcessGroup {
    /// Rank of this process.
    fn rank(&self) -> usize;

    /// Number of processes in the group.
    fn size(&self) -> usize;

    /// Whether this process is the [ROOT].
    fn is_root(&self) -> bool {
        self.rank() == ROOT
    }

    /// Block until all ranks have arrived.
    fn barrier(&self);

    /// Gather one count from every rank, on every rank, ordered by rank.
    fn all_gather_counts(&self, local: usize) -> Vec<usize>;

    /// Gather variable-length slices from every rank, on every rank, concatenated in rank order.
    ///
    /// `counts` are the scalar lengths contributed by each rank, as returned by
    /// [ProcessGroup::all_gather_counts].
    fn all_gather_varcount(&self, local: &[f64], counts: &[usize]) -> Vec<f64>;

    /// Broadcast a count from the [ROOT] to every rank. Non-root arguments are ignored.
    fn broadcast_count(&self, value: usize) -> usize;

    /// Largest number of scalars a single collective may move in total.
    ///
    /// The collectives below may panic if a count or offset exceeds this value; callers check
    /// it first.
    fn max_count(&self) -> usize {
        usize::MAX
    }

    /// Scatter consecutive pieces of `global` from the [ROOT].
    ///
    /// Rank `r` receives `counts[r]` scalars.
    ///
    /// `global` is only read on the root.
    fn scatter_varcount(&self, global: &[f64], counts: &[usize]) -> Vec<f64>;
}

/// Reference evaluation of a pairwise kernel over single-layer and double-layer sources.
pub trait PairwiseKernel: Sync {
    /// The kernel kind.
    fn kind(&self) -> KernelKind;

    /// Value widths of sources and targets.
    fn dimensions(&self) -> KernelDimensions;

    /// Evaluate the contribution of a single source of a given layer at a single target.
    ///
    /// The first `dimensions().target` entries of `result` are overwritten.
    fn greens_fct(
        &self,
        layer: LayerKind,
        source: &[f64],
        target: &[f64],
        value: &[f64],
        result: &mut [f64],
    );

    /// Single threaded reference evaluation.
    ///
    /// - `targets`: target points in the form `[x_1, y_1, z_1, x_2, y_2, z_2, ...]`.
    /// - `sources`: coordinates (same layout as targets) and values of both layers. Each source
    ///   of a layer has `dimensions().single_layer` or `dimensions().double_layer` values.
    /// - `result`: `dimensions().target` values for each target, consecutively in memory.
    ///   Overwritten with the sum over all single-layer and then all double-layer sources.
    fn evaluate_st(
        &self,
        targets: &[f64],
        sources: Sources<'_>,
        result: &mut [f64],
    ) -> Result<(), VerifyError> {
        let dimensions = self.dimensions();
        check_dimensions_evaluate(dimensions, targets, &sources, result)?;

        result
            .chunks_exact_mut(dimensions.target)
            .zip(targets.chunks_exact(3))
            .for_each(|(my_chunk, target)| evaluate_one_target(self, target, &sources, my_chunk));

        Ok(())
    }

    /// Multi-threaded reference evaluation.
    ///
    /// The method parallelizes over the given targets in the global Rayon thread pool. Each
    /// target is summed in the same order as in [PairwiseKernel::evaluate_st], so both give
    /// bitwise identical results.
    fn evaluate_mt(
        &self,
        targets: &[f64],
        sources: Sources<'_>,
        result: &mut [f64],
    ) -> Result<(), VerifyError> {
        let dimensions = self.dimensions();
        check_dimensions_evaluate(dimensions, targets, &sources, result)?;

        result
            .par_chunks_exact_mut(dimensions.target)
            .zip(targets.par_chunks_exact(3))
            .for_each(|(my_chunk, target)| evaluate_one_target(self, target, &sources, my_chunk));

        Ok(())
    }
}

// Note that we cannot just add the `evaluate_distributed` method to the `PairwiseKernel` trait
// since it is generic over the process group and `PairwiseKernel` is used as a trait object.

/// Distributed reference evaluation.
pub trait DistributedReferenceEvaluator: PairwiseKernel {
    /// Evaluate at the local targets the contributions of the sources of all ranks.
    ///
    /// Sources and their values are replicated on every rank by a collective gather; the
    /// targets and `result` stay local. Must be called by every rank of `group`. Fails on every
    /// rank if the local sources of any rank have mismatched coordinate and value counts.
    fn evaluate_distributed<G: ProcessGroup>(
        &self,
        group: &G,
        targets: &[f64],
        local_sources: Sources<'_>,
        result: &mut [f64],
    ) -> Result<(), VerifyError> {
        let dimensions = self.dimensions();

        let (single_layer_coordinates, single_layer_values) = replicate_layer(
            group,
            local_sources.single_layer,
            dimensions.single_layer,
        )?;
        let (double_layer_coordinates, double_layer_values) = replicate_layer(
            group,
            local_sources.double_layer,
            dimensions.double_layer,
        )?;

        let global_sources = Sources::new(
            LayerSources::new(&single_layer_coordinates, &single_layer_values),
            LayerSources::new(&double_layer_coordinates, &double_layer_values),
        );

        self.evaluate_mt(targets, global_sources, result)
    }
}

impl<K: PairwiseKernel + ?Sized> DistributedReferenceEvaluator for K {}
