//! The layer contract and the closed catalogue dispatching to it.

use crate::error::NeuraGraphError;
use crate::nn::layers::{
    ActivationLayer, AddLayer, AveragePoolingLayer, ConcatLayer, ConvolutionLayer, DropoutLayer,
    FullyConnectedLayer, GlobalAveragePoolingLayer, InputLayer, L2NormalizationLayer,
    MaxPoolingLayer, PowerLayer, QuantizedFullyConnectedLayer, SliceLayer,
};
use crate::nn::parameter::Parameter;
use crate::tensor::Tensor;
use crate::types::{FloatT, NetPhase, Shape3d};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt::Debug;

/// Input and output shapes declared by a layer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerShapes {
    pub inputs: Vec<Shape3d>,
    pub outputs: Vec<Shape3d>,
}

/// Per-thread scratch state of one layer.
///
/// Every worker of the batch scheduler owns its own copy, so a layer can
/// remember what its forward call needs for backward (dropout mask, pooling
/// arg-max positions, quantized operands) without any shared mutation.
#[derive(Debug, Clone)]
pub struct LayerScratch {
    pub(crate) mask: Vec<FloatT>,
    pub(crate) buffer: Vec<FloatT>,
    pub(crate) indices: Vec<usize>,
    pub(crate) rng: StdRng,
}

impl LayerScratch {
    pub fn new(seed: u64) -> Self {
        LayerScratch {
            mask: Vec::new(),
            buffer: Vec::new(),
            indices: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

/// Tensors available to a backward call.
///
/// `inputs` and `outputs` are those of the matching forward call; `out_grads`
/// holds the loss gradient w.r.t. each output.
#[derive(Debug, Clone, Copy)]
pub struct BackwardPass<'a> {
    pub inputs: &'a [&'a Tensor],
    pub outputs: &'a [&'a Tensor],
    pub out_grads: &'a [&'a Tensor],
    pub phase: NetPhase,
}

/// The forward/backward protocol every layer kind implements.
///
/// Layers are shared read-only between worker threads during a step, hence
/// `&self` everywhere and the `Send + Sync` bound.
pub trait LayerOp: Debug + Send + Sync {
    /// Stable type tag, identical to the descriptor's `type` field.
    fn layer_type(&self) -> &'static str;

    /// Shapes of the data inputs, one per input slot.
    fn in_shapes(&self) -> &[Shape3d];

    /// Shapes of the outputs, one per output port.
    fn out_shapes(&self) -> &[Shape3d];

    /// Owned parameters, in a fixed order.
    fn parameters(&self) -> &[Parameter] {
        &[]
    }

    fn parameters_mut(&mut self) -> &mut [Parameter] {
        &mut []
    }

    /// Fan-in used by weight initialisation.
    fn fan_in_size(&self) -> usize {
        self.in_shapes().first().map_or(0, Shape3d::size)
    }

    /// Fan-out used by weight initialisation.
    fn fan_out_size(&self) -> usize {
        self.out_shapes().first().map_or(0, Shape3d::size)
    }

    /// Computes every output for the whole (sub-)batch.
    ///
    /// `outputs` arrive zeroed and sized `batch x out_shape.size()`.
    fn forward(
        &self,
        inputs: &[&Tensor],
        outputs: &mut [Tensor],
        phase: NetPhase,
        scratch: &mut LayerScratch,
    ) -> Result<(), NeuraGraphError>;

    /// Writes the gradient w.r.t. each input into `in_grads` (zeroed on entry)
    /// and adds the gradient w.r.t. each parameter into `param_grads`, which
    /// is ordered like [`LayerOp::parameters`].
    fn backward(
        &self,
        pass: BackwardPass<'_>,
        in_grads: &mut [Tensor],
        param_grads: &mut [Vec<FloatT>],
        scratch: &mut LayerScratch,
    ) -> Result<(), NeuraGraphError>;
}

/// Closed catalogue of layer kinds.
#[derive(Debug, Clone)]
pub enum Layer {
    Input(InputLayer),
    FullyConnected(FullyConnectedLayer),
    QuantizedFullyConnected(QuantizedFullyConnectedLayer),
    Convolution(ConvolutionLayer),
    MaxPooling(MaxPoolingLayer),
    AveragePooling(AveragePoolingLayer),
    GlobalAveragePooling(GlobalAveragePoolingLayer),
    Activation(ActivationLayer),
    Dropout(DropoutLayer),
    Add(AddLayer),
    Concat(ConcatLayer),
    Slice(SliceLayer),
    Power(PowerLayer),
    L2Normalization(L2NormalizationLayer),
}

impl Layer {
    /// Dispatches on the variant tag.
    pub fn op(&self) -> &dyn LayerOp {
        match self {
            Layer::Input(l) => l,
            Layer::FullyConnected(l) => l,
            Layer::QuantizedFullyConnected(l) => l,
            Layer::Convolution(l) => l,
            Layer::MaxPooling(l) => l,
            Layer::AveragePooling(l) => l,
            Layer::GlobalAveragePooling(l) => l,
            Layer::Activation(l) => l,
            Layer::Dropout(l) => l,
            Layer::Add(l) => l,
            Layer::Concat(l) => l,
            Layer::Slice(l) => l,
            Layer::Power(l) => l,
            Layer::L2Normalization(l) => l,
        }
    }

    pub fn op_mut(&mut self) -> &mut dyn LayerOp {
        match self {
            Layer::Input(l) => l,
            Layer::FullyConnected(l) => l,
            Layer::QuantizedFullyConnected(l) => l,
            Layer::Convolution(l) => l,
            Layer::MaxPooling(l) => l,
            Layer::AveragePooling(l) => l,
            Layer::GlobalAveragePooling(l) => l,
            Layer::Activation(l) => l,
            Layer::Dropout(l) => l,
            Layer::Add(l) => l,
            Layer::Concat(l) => l,
            Layer::Slice(l) => l,
            Layer::Power(l) => l,
            Layer::L2Normalization(l) => l,
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self, Layer::Input(_))
    }

    pub fn layer_type(&self) -> &'static str {
        self.op().layer_type()
    }

    pub fn in_shapes(&self) -> &[Shape3d] {
        self.op().in_shapes()
    }

    pub fn out_shapes(&self) -> &[Shape3d] {
        self.op().out_shapes()
    }

    pub fn parameters(&self) -> &[Parameter] {
        self.op().parameters()
    }

    pub fn parameters_mut(&mut self) -> &mut [Parameter] {
        self.op_mut().parameters_mut()
    }
}

/// Checks the number of tensors handed to a layer.
pub(crate) fn expect_arity(
    layer_type: &str,
    what: &str,
    expected: usize,
    actual: usize,
) -> Result<(), NeuraGraphError> {
    if expected != actual {
        return Err(NeuraGraphError::data_mismatch(
            format!("{layer_type} {what} count"),
            expected,
            actual,
        ));
    }
    Ok(())
}
