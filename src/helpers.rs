//! Helper functions
use crate::error::VerifyError;
use crate::types::{KernelDimensions, LayerKind, Sources};

/// Check that `len` is a whole number of points of width `width` and return the point count.
pub fn check_width(what: &'static str, len: usize, width: usize) -> Result<usize, VerifyError> {
    if width == 0 || len % width != 0 {
        Err(VerifyError::DimensionMismatch { what, len, width })
    } else {
        Ok(len / width)
    }
}

/// Check that `len` equals `npoints * width`.
pub fn check_len(
    what: &'static str,
    len: usize,
    npoints: usize,
    width: usize,
) -> Result<(), VerifyError> {
    if len != npoints * width {
        Err(VerifyError::DimensionMismatch { what, len, width })
    } else {
        Ok(())
    }
}

/// Check array dimensions for a reference evaluation and return the number of targets.
pub fn check_dimensions_evaluate(
    dimensions: KernelDimensions,
    targets: &[f64],
    sources: &Sources<'_>,
    result: &[f64],
) -> Result<usize, VerifyError> {
    let ntargets = check_width("target coordinates", targets.len(), 3)?;

    for layer in [LayerKind::SingleLayer, LayerKind::DoubleLayer] {
        let (what_coords, what_values) = match layer {
            LayerKind::SingleLayer => ("single-layer coordinates", "single-layer values"),
            LayerKind::DoubleLayer => ("double-layer coordinates", "double-layer values"),
        };
        let layer_sources = sources.layer(layer);
        let nsources = check_width(what_coords, layer_sources.coordinates.len(), 3)?;
        check_len(
            what_values,
            layer_sources.values.len(),
            nsources,
            dimensions.source(layer),
        )?;
    }

    check_len("target values", result.len(), ntargets, dimensions.target)?;

    Ok(ntargets)
}
