//! Reference evaluation by direct summation.
//!
//! For every target the contributions of all single-layer sources, in ascending order, and
//! then of all double-layer sources, in ascending order, are summed into a zeroed accumulator.
//! Floating point addition is not associative, so this order is part of the contract: two
//! evaluations over the same inputs agree bitwise, whatever the number of threads.
use crate::dispatch::kernel_entry;
use crate::error::VerifyError;
use crate::traits::PairwiseKernel;
use crate::types::{KernelKind, KernelOutput, LayerKind, Sources};

/// Evaluate the reference sum at one target.
///
/// `result` holds the `dimensions().target` values of the target and is overwritten.
pub fn evaluate_one_target<K: PairwiseKernel + ?Sized>(
    kernel: &K,
    target: &[f64],
    sources: &Sources<'_>,
    result: &mut [f64],
) {
    let dimensions = kernel.dimensions();
    let mut contribution = KernelOutput::zeros(dimensions.target);
    result.fill(0.0);

    for layer in [LayerKind::SingleLayer, LayerKind::DoubleLayer] {
        let layer_sources = sources.layer(layer);
        let width = dimensions.source(layer);

        for (source, value) in layer_sources
            .coordinates
            .chunks_exact(3)
            .zip(layer_sources.values.chunks_exact(width))
        {
            kernel.greens_fct(layer, source, target, value, contribution.as_mut_slice());
            for (acc, &increment) in result.iter_mut().zip(contribution.as_slice()) {
                *acc += increment;
            }
        }
    }
}

/// Evaluate the reference values of kernel `kind` at `targets`, multi-threaded.
///
/// Returns `dimensions.target` values per target.
pub fn evaluate(
    kind: KernelKind,
    targets: &[f64],
    sources: Sources<'_>,
) -> Result<Vec<f64>, VerifyError> {
    let entry = kernel_entry(kind);
    let mut result = vec![0.0; (targets.len() / 3) * entry.dimensions.target];
    entry.evaluate_mt(targets, sources, &mut result)?;
    Ok(result)
}
