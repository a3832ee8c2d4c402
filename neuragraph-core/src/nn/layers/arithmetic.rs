use crate::error::NeuraGraphError;
use crate::nn::config::check_shape;
use crate::nn::layer::{BackwardPass, LayerOp, LayerScratch, LayerShapes};
use crate::nn::layers::{check_inputs, copy_tensor};
use crate::tensor::Tensor;
use crate::types::{FloatT, NetPhase, Shape3d};

/// Element-wise sum of `num_inputs` equally shaped inputs.
///
/// This is how fan-in is expressed: edges never merge on their own.
#[derive(Debug, Clone)]
pub struct AddLayer {
    in_shapes: Vec<Shape3d>,
    out_shapes: Vec<Shape3d>,
}

impl AddLayer {
    pub const TYPE: &'static str = "add";

    pub fn shape_for(num_inputs: usize, shape: Shape3d) -> Result<LayerShapes, NeuraGraphError> {
        check_shape(Self::TYPE, "input", shape)?;
        if num_inputs == 0 {
            return Err(NeuraGraphError::invalid_layer(
                Self::TYPE,
                "add needs at least one input",
            ));
        }
        Ok(LayerShapes {
            inputs: vec![shape; num_inputs],
            outputs: vec![shape],
        })
    }

    pub fn new(num_inputs: usize, shape: Shape3d) -> Result<Self, NeuraGraphError> {
        let shapes = Self::shape_for(num_inputs, shape)?;
        Ok(AddLayer {
            in_shapes: shapes.inputs,
            out_shapes: shapes.outputs,
        })
    }
}

impl LayerOp for AddLayer {
    fn layer_type(&self) -> &'static str {
        Self::TYPE
    }

    fn in_shapes(&self) -> &[Shape3d] {
        &self.in_shapes
    }

    fn out_shapes(&self) -> &[Shape3d] {
        &self.out_shapes
    }

    fn forward(
        &self,
        inputs: &[&Tensor],
        outputs: &mut [Tensor],
        _phase: NetPhase,
        _scratch: &mut LayerScratch,
    ) -> Result<(), NeuraGraphError> {
        check_inputs(Self::TYPE, inputs, &self.in_shapes)?;
        copy_tensor(Self::TYPE, &mut outputs[0], inputs[0])?;
        for input in &inputs[1..] {
            outputs[0].add_assign(input)?;
        }
        Ok(())
    }

    fn backward(
        &self,
        pass: BackwardPass<'_>,
        in_grads: &mut [Tensor],
        _param_grads: &mut [Vec<FloatT>],
        _scratch: &mut LayerScratch,
    ) -> Result<(), NeuraGraphError> {
        for grad in in_grads.iter_mut() {
            copy_tensor(Self::TYPE, grad, pass.out_grads[0])?;
        }
        Ok(())
    }
}

/// `y = scale * x^factor`, element-wise.
#[derive(Debug, Clone)]
pub struct PowerLayer {
    factor: FloatT,
    scale: FloatT,
    shapes: Vec<Shape3d>,
}

impl PowerLayer {
    pub const TYPE: &'static str = "power";

    pub fn shape_for(shape: Shape3d, factor: FloatT, scale: FloatT) -> Result<LayerShapes, NeuraGraphError> {
        check_shape(Self::TYPE, "input", shape)?;
        if !factor.is_finite() || !scale.is_finite() {
            return Err(NeuraGraphError::invalid_layer(
                Self::TYPE,
                format!("factor and scale must be finite, got {factor} and {scale}"),
            ));
        }
        Ok(LayerShapes {
            inputs: vec![shape],
            outputs: vec![shape],
        })
    }

    pub fn new(shape: Shape3d, factor: FloatT, scale: FloatT) -> Result<Self, NeuraGraphError> {
        Self::shape_for(shape, factor, scale)?;
        Ok(PowerLayer {
            factor,
            scale,
            shapes: vec![shape],
        })
    }
}

impl LayerOp for PowerLayer {
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
        for (y, x) in outputs[0].as_mut_slice().iter_mut().zip(inputs[0].as_slice()) {
            *y = self.scale * x.powf(self.factor);
        }
        Ok(())
    }

    fn backward(
        &self,
        pass: BackwardPass<'_>,
        in_grads: &mut [Tensor],
        _param_grads: &mut [Vec<FloatT>],
        _scratch: &mut LayerScratch,
    ) -> Result<(), NeuraGraphError> {
        if self.factor == 0.0 {
            in_grads[0].fill(0.0);
            return Ok(());
        }
        let x = pass.inputs[0].as_slice();
        let dy = pass.out_grads[0].as_slice();
        for (i, dx) in in_grads[0].as_mut_slice().iter_mut().enumerate() {
            *dx = dy[i] * self.scale * self.factor * x[i].powf(self.factor - 1.0);
        }
        Ok(())
    }
}
