//! Kernel dispatch table.
//!
//! Maps each [KernelKind] to its value widths and to its single-layer and double-layer
//! pairwise functions. The reference evaluator only ever goes through this table, so adding a
//! kernel means adding a [KernelKind] variant and one row here.
use crate::kernels::{laplace, stokes, PairwiseFn};
use crate::traits::PairwiseKernel;
use crate::types::{KernelDimensions, KernelKind, LayerKind};

/// One row of the dispatch table.
#[derive(Clone, Copy)]
pub struct KernelEntry {
    /// Kernel kind of this row.
    pub kind: KernelKind,
    /// Value widths.
    pub dimensions: KernelDimensions,
    /// Single-layer contribution.
    pub single_layer: PairwiseFn,
    /// Double-layer contribution.
    pub double_layer: PairwiseFn,
}

impl std::fmt::Debug for KernelEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelEntry")
            .field("kind", &self.kind)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

macro_rules! kernel_entry {
    ($kind:ident, $module:ident, $name:ident, [$sl:expr, $dl:expr, $trg:expr]) => {
        paste::paste! {
            KernelEntry {
                kind: KernelKind::$kind,
                dimensions: KernelDimensions::new($sl, $dl, $trg),
                single_layer: $module::[<sl_ $name>],
                double_layer: $module::[<dl_ $name>],
            }
        }
    };
}

/// The dispatch table, one row per kernel kind.
pub static KERNEL_TABLE: [KernelEntry; 5] = [
    kernel_entry!(PVel, stokes, pvel, [3, 9, 4]),
    kernel_entry!(PVelGrad, stokes, pvel_grad, [3, 9, 16]),
    kernel_entry!(Traction, stokes, traction, [3, 9, 9]),
    kernel_entry!(PVelLaplacian, stokes, pvel_laplacian, [3, 9, 7]),
    kernel_entry!(LapPGrad, laplace, p_grad, [1, 3, 4]),
];

/// Look up the table row of a kernel kind.
pub fn kernel_entry(kind: KernelKind) -> &'static KernelEntry {
    KERNEL_TABLE
        .iter()
        .find(|entry| entry.kind == kind)
        .unwrap_or_else(|| panic!("no dispatch table entry for {}", kind))
}

/// Value widths of a kernel kind.
pub fn kernel_dimensions(kind: KernelKind) -> KernelDimensions {
    kernel_entry(kind).dimensions
}

impl KernelEntry {
    /// Pairwise function of a layer.
    pub fn pairwise_fn(&self, layer: LayerKind) -> PairwiseFn {
        match layer {
            LayerKind::SingleLayer => self.single_layer,
            LayerKind::DoubleLayer => self.double_layer,
        }
    }
}

impl PairwiseKernel for KernelEntry {
    fn kind(&self) -> KernelKind {
        self.kind
    }

    fn dimensions(&self) -> KernelDimensions {
        self.dimensions
    }

    fn greens_fct(
        &self,
        layer: LayerKind,
        source: &[f64],
        target: &[f64],
        value: &[f64],
        result: &mut [f64],
    ) {
        (self.pairwise_fn(layer))(source, target, value, result)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_every_kind_has_one_entry() {
        for kind in KernelKind::ALL {
            assert_eq!(
                KERNEL_TABLE
                    .iter()
                    .filter(|entry| entry.kind == kind)
                    .count(),
                1
            );
            assert_eq!(kernel_entry(kind).kind, kind);
        }
    }

    #[test]
    fn test_dimensions() {
        assert_eq!(
            kernel_dimensions(KernelKind::PVel),
            KernelDimensions::new(3, 9, 4)
        );
        assert_eq!(kernel_dimensions(KernelKind::PVelGrad).target, 16);
        assert_eq!(kernel_dimensions(KernelKind::Traction).target, 9);
        assert_eq!(kernel_dimensions(KernelKind::PVelLaplacian).target, 7);
        assert_eq!(
            kernel_dimensions(KernelKind::LapPGrad),
            KernelDimensions::new(1, 3, 4)
        );
    }

    #[test]
    fn test_greens_fct_dispatches_by_layer() {
        let entry = kernel_entry(KernelKind::LapPGrad);
        let source = [0.0, 0.0, 0.0];
        let target = [0.0, 0.0, 2.0];

        let mut single = [0.0; 4];
        entry.greens_fct(LayerKind::SingleLayer, &source, &target, &[1.0], &mut single);
        let mut expected = [0.0; 4];
        laplace::sl_p_grad(&source, &target, &[1.0], &mut expected);
        assert_eq!(single, expected);

        let mut double = [0.0; 4];
        entry.greens_fct(
            LayerKind::DoubleLayer,
            &source,
            &target,
            &[0.0, 0.0, 1.0],
            &mut double,
        );
        laplace::dl_p_grad(&source, &target, &[0.0, 0.0, 1.0], &mut expected);
        assert_eq!(double, expected);
    }
}
