//! Type definitions

use std::fmt;

use crate::error::VerifyError;

/// Largest output width of any pairwise kernel.
pub const MAX_TARGET_DIM: usize = 20;

/// Physical quantity evaluated at the targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KernelKind {
    /// Stokes pressure and velocity.
    PVel,
    /// Stokes pressure, velocity and their gradients.
    PVelGrad,
    /// Stokes stress tensor.
    Traction,
    /// Stokes pressure, velocity and velocity Laplacian.
    PVelLaplacian,
    /// Laplace potential and its gradient.
    LapPGrad,
}

impl KernelKind {
    /// All kinds, in the order in which the harness tests them.
    pub const ALL: [KernelKind; 5] = [
        KernelKind::PVel,
        KernelKind::PVelGrad,
        KernelKind::PVelLaplacian,
        KernelKind::Traction,
        KernelKind::LapPGrad,
    ];

    /// Bit identifying this kind in a [KernelMask].
    pub fn bit(self) -> u32 {
        match self {
            KernelKind::PVel => 1,
            KernelKind::PVelGrad => 2,
            KernelKind::PVelLaplacian => 4,
            KernelKind::Traction => 8,
            KernelKind::LapPGrad => 16,
        }
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KernelKind::PVel => "PVel",
            KernelKind::PVelGrad => "PVelGrad",
            KernelKind::Traction => "Traction",
            KernelKind::PVelLaplacian => "PVelLaplacian",
            KernelKind::LapPGrad => "LapPGrad",
        };
        write!(f, "{}", name)
    }
}

/// How a source couples to the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Point force or charge.
    SingleLayer,
    /// Force dipole or charge dipole.
    DoubleLayer,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::SingleLayer => write!(f, "single layer"),
            LayerKind::DoubleLayer => write!(f, "double layer"),
        }
    }
}

/// Per-point value widths of a kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelDimensions {
    /// Width of a single-layer source value.
    pub single_layer: usize,
    /// Width of a double-layer source value.
    pub double_layer: usize,
    /// Width of a target value.
    pub target: usize,
}

impl KernelDimensions {
    /// Create new.
    ///
    /// Panics if `target` exceeds [MAX_TARGET_DIM]: at compile time in const contexts, at runtime
    /// otherwise.
    pub const fn new(single_layer: usize, double_layer: usize, target: usize) -> Self {
        assert!(target <= MAX_TARGET_DIM);
        Self {
            single_layer,
            double_layer,
            target,
        }
    }

    /// Source value width for a given layer.
    pub fn source(&self, layer: LayerKind) -> usize {
        match layer {
            LayerKind::SingleLayer => self.single_layer,
            LayerKind::DoubleLayer => self.double_layer,
        }
    }
}

impl fmt::Display for KernelDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SL {}, DL {}, TRG {}",
            self.single_layer, self.double_layer, self.target
        )
    }
}

/// Set of active kernel kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelMask(u32);

impl KernelMask {
    /// Mask with every kind active.
    pub fn all() -> Self {
        Self(KernelKind::ALL.iter().fold(0, |acc, kind| acc | kind.bit()))
    }

    /// Create a mask from its bit representation. `0` selects all kinds.
    pub fn from_bits(bits: u32) -> Result<Self, VerifyError> {
        let all = Self::all();
        if bits == 0 {
            return Ok(all);
        }
        if bits & !all.0 != 0 {
            return Err(VerifyError::InvalidConfig {
                field: "kernel_mask",
                reason: format!("{:#x} selects unknown kernels", bits & !all.0),
            });
        }
        Ok(Self(bits))
    }

    /// Bit representation.
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Whether a kind is active.
    pub fn contains(&self, kind: KernelKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Active kinds in test order.
    pub fn iter(&self) -> impl Iterator<Item = KernelKind> + '_ {
        KernelKind::ALL
            .into_iter()
            .filter(move |&kind| self.contains(kind))
    }
}

impl From<KernelKind> for KernelMask {
    fn from(kind: KernelKind) -> Self {
        Self(kind.bit())
    }
}

/// Output of one pairwise kernel evaluation.
///
/// Holds at most [MAX_TARGET_DIM] entries, of which only the first `width` are used.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KernelOutput {
    data: [f64; MAX_TARGET_DIM],
    width: usize,
}

impl KernelOutput {
    /// Zero output of a given width.
    pub fn zeros(width: usize) -> Self {
        assert!(
            width <= MAX_TARGET_DIM,
            "kernel output width {} exceeds {}",
            width,
            MAX_TARGET_DIM
        );
        Self {
            data: [0.0; MAX_TARGET_DIM],
            width,
        }
    }

    /// Width of the output.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Active entries.
    pub fn as_slice(&self) -> &[f64] {
        &self.data[..self.width]
    }

    /// Mutable active entries.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data[..self.width]
    }
}

/// Ordered set of 3D points stored as `[x_1, y_1, z_1, x_2, y_2, z_2, ...]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointSet {
    coordinates: Vec<f64>,
}

impl PointSet {
    /// Empty point set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from interleaved coordinates.
    pub fn from_coordinates(coordinates: Vec<f64>) -> Result<Self, VerifyError> {
        if coordinates.len() % 3 != 0 {
            return Err(VerifyError::DimensionMismatch {
                what: "point coordinates",
                len: coordinates.len(),
                width: 3,
            });
        }
        Ok(Self { coordinates })
    }

    /// Append a point.
    pub fn push(&mut self, point: [f64; 3]) {
        self.coordinates.extend_from_slice(&point);
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.coordinates.len() / 3
    }

    /// Whether there are no points.
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Coordinates of one point.
    pub fn point(&self, index: usize) -> &[f64] {
        &self.coordinates[3 * index..3 * index + 3]
    }

    /// Interleaved coordinates.
    pub fn coordinates(&self) -> &[f64] {
        &self.coordinates
    }

    /// Take the interleaved coordinates.
    pub fn into_coordinates(self) -> Vec<f64> {
        self.coordinates
    }
}

/// Per-point value vectors of fixed width, co-indexed with a [PointSet].
#[derive(Clone, Debug, PartialEq)]
pub struct ValueSet {
    width: usize,
    data: Vec<f64>,
}

impl ValueSet {
    /// Zero values for `npoints` points.
    pub fn zeros(npoints: usize, width: usize) -> Self {
        Self {
            width,
            data: vec![0.0; npoints * width],
        }
    }

    /// Create from a flat array.
    pub fn from_data(data: Vec<f64>, width: usize) -> Result<Self, VerifyError> {
        if width == 0 || data.len() % width != 0 {
            return Err(VerifyError::DimensionMismatch {
                what: "point values",
                len: data.len(),
                width,
            });
        }
        Ok(Self { width, data })
    }

    /// Value width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.data.len().checked_div(self.width).unwrap_or(0)
    }

    /// Whether there are no values.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat values.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable flat values.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Take the flat values.
    pub fn into_data(self) -> Vec<f64> {
        self.data
    }
}

/// Coordinates and values of the sources of one layer.
#[derive(Clone, Copy, Debug)]
pub struct LayerSources<'a> {
    /// Interleaved source coordinates.
    pub coordinates: &'a [f64],
    /// Flat source values.
    pub values: &'a [f64],
}

impl<'a> LayerSources<'a> {
    /// Create new.
    pub fn new(coordinates: &'a [f64], values: &'a [f64]) -> Self {
        Self {
            coordinates,
            values,
        }
    }

    /// No sources.
    pub fn empty() -> Self {
        Self::new(&[], &[])
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.coordinates.len() / 3
    }

    /// Whether there are no sources.
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}

/// Single-layer and double-layer sources contributing to the same targets.
#[derive(Clone, Copy, Debug)]
pub struct Sources<'a> {
    /// Single-layer sources.
    pub single_layer: LayerSources<'a>,
    /// Double-layer sources.
    pub double_layer: LayerSources<'a>,
}

impl<'a> Sources<'a> {
    /// Create new.
    pub fn new(single_layer: LayerSources<'a>, double_layer: LayerSources<'a>) -> Self {
        Self {
            single_layer,
            double_layer,
        }
    }

    /// Sources of one layer.
    pub fn layer(&self, layer: LayerKind) -> LayerSources<'a> {
        match layer {
            LayerKind::SingleLayer => self.single_layer,
            LayerKind::DoubleLayer => self.double_layer,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_kernel_mask() {
        let all = KernelMask::from_bits(0).unwrap();
        assert_eq!(all, KernelMask::all());
        assert_eq!(all.iter().collect::<Vec<_>>(), KernelKind::ALL.to_vec());

        let mask = KernelMask::from_bits(1 | 16).unwrap();
        assert_eq!(
            mask.iter().collect::<Vec<_>>(),
            vec![KernelKind::PVel, KernelKind::LapPGrad]
        );
        assert!(!mask.contains(KernelKind::Traction));

        assert!(matches!(
            KernelMask::from_bits(32),
            Err(VerifyError::InvalidConfig {
                field: "kernel_mask",
                ..
            })
        ));
    }

    #[test]
    fn test_kernel_output() {
        let mut output = KernelOutput::zeros(7);
        assert_eq!(output.width(), 7);
        output.as_mut_slice()[6] = 1.5;
        assert_eq!(output.as_slice(), &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.5]);
    }

    #[test]
    #[should_panic]
    fn test_kernel_output_too_wide() {
        KernelOutput::zeros(MAX_TARGET_DIM + 1);
    }

    #[test]
    #[should_panic]
    fn test_kernel_dimensions_too_wide() {
        let target = MAX_TARGET_DIM + 1;
        KernelDimensions::new(3, 9, target);
    }

    #[test]
    fn test_point_and_value_sets() {
        let points = PointSet::from_coordinates(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points.point(1), &[3.0, 4.0, 5.0]);
        assert!(PointSet::from_coordinates(vec![0.0; 4]).is_err());

        let values = ValueSet::from_data(vec![1.0; 18], 9).unwrap();
        assert_eq!(values.len(), 2);
        assert!(ValueSet::from_data(vec![1.0; 10], 9).is_err());
        assert!(ValueSet::from_data(vec![], 0).is_err());
    }
}
