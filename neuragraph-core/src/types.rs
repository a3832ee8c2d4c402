use num_traits::{Float, NumAssignOps};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar type every layer, edge and parameter of the engine operates on.
///
/// Double precision by default; the `f32` cargo feature switches the whole
/// engine to single precision.
#[cfg(not(feature = "f32"))]
pub type FloatT = f64;
#[cfg(feature = "f32")]
pub type FloatT = f32;

/// Default finite-difference step used by the gradient checker.
#[cfg(not(feature = "f32"))]
pub const DEFAULT_GRAD_EPSILON: FloatT = 1e-4;
#[cfg(feature = "f32")]
pub const DEFAULT_GRAD_EPSILON: FloatT = 1e-2;

/// Floating point types usable by the generic element kernels.
///
/// Only `f32` and `f64` implement it.
pub trait Numeric: Float + NumAssignOps + fmt::Debug + Send + Sync + 'static {}

impl Numeric for f32 {}
impl Numeric for f64 {}

/// Semantic layout (width, height, depth) of one flat sample.
///
/// Samples are stored depth-major: the value at `(x, y, channel)` lives at
/// `(channel * height + y) * width + x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Shape3d {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl Shape3d {
    pub const fn new(width: usize, height: usize, depth: usize) -> Self {
        Shape3d {
            width,
            height,
            depth,
        }
    }

    /// A `n x 1 x 1` shape, the layout of fully-connected activations.
    pub const fn vector(n: usize) -> Self {
        Shape3d::new(n, 1, 1)
    }

    /// Number of scalars in one sample of this shape.
    pub const fn size(&self) -> usize {
        self.width * self.height * self.depth
    }

    /// Number of positions in one channel.
    pub const fn area(&self) -> usize {
        self.width * self.height
    }

    /// Flat index of `(x, y, channel)`.
    #[inline]
    pub const fn index(&self, x: usize, y: usize, channel: usize) -> usize {
        (channel * self.height + y) * self.width + x
    }
}

impl fmt::Display for Shape3d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

/// Runtime phase flag read by stochastic layers such as dropout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetPhase {
    Train,
    #[default]
    Test,
}

/// Role of a parameter inside its layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Weight,
    Bias,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Weight => write!(f, "weight"),
            ParamKind::Bias => write!(f, "bias"),
        }
    }
}
