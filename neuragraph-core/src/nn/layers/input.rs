use crate::error::NeuraGraphError;
use crate::nn::config::check_shape;
use crate::nn::layer::{BackwardPass, LayerOp, LayerScratch, LayerShapes};
use crate::nn::layers::{check_inputs, copy_tensor};
use crate::tensor::Tensor;
use crate::types::{FloatT, NetPhase, Shape3d};

/// Entry point of a network.
///
/// Its single slot is fed by the network with caller data; it cannot be
/// connected to another layer. Forward is the identity, and backward exposes
/// the gradient with respect to the network input.
#[derive(Debug, Clone)]
pub struct InputLayer {
    shapes: Vec<Shape3d>,
}

impl InputLayer {
    pub const TYPE: &'static str = "input";

    pub fn shape_for(shape: Shape3d) -> Result<LayerShapes, NeuraGraphError> {
        check_shape(Self::TYPE, "input", shape)?;
        Ok(LayerShapes {
            inputs: vec![shape],
            outputs: vec![shape],
        })
    }

    pub fn new(shape: Shape3d) -> Result<Self, NeuraGraphError> {
        Self::shape_for(shape)?;
        Ok(InputLayer {
            shapes: vec![shape],
        })
    }

    pub fn shape(&self) -> Shape3d {
        self.shapes[0]
    }
}

impl LayerOp for InputLayer {
    fn layer_type(&self) -> &'static str {
        Self::TYPE
    }

    fn in_shapes(&self) -> &[Shape3d] {
        &self.shapes
    }

    fn out_shapes(&self) -> &[Shape3d] {
        &self.shapes
    }

    fn forward(
        &self,
        inputs: &[&Tensor],
        outputs: &mut [Tensor],
        _phase: NetPhase,
        _scratch: &mut LayerScratch,
    ) -> Result<(), NeuraGraphError> {
        check_inputs(Self::TYPE, inputs, &self.shapes)?;
        copy_tensor(Self::TYPE, &mut outputs[0], inputs[0])
    }

    fn backward(
        &self,
        pass: BackwardPass<'_>,
        in_grads: &mut [Tensor],
        _param_grads: &mut [Vec<FloatT>],
        _scratch: &mut LayerScratch,
    ) -> Result<(), NeuraGraphError> {
        copy_tensor(Self::TYPE, &mut in_grads[0], pass.out_grads[0])
    }
}
