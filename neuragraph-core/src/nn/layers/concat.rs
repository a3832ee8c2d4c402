//! Channel-wise concatenation and splitting.
//!
//! Samples are depth-major, so joining along depth is plain concatenation of
//! the flat samples and splitting is cutting them into consecutive chunks.

use crate::error::NeuraGraphError;
use crate::nn::config::check_shape;
use crate::nn::layer::{BackwardPass, LayerOp, LayerScratch, LayerShapes};
use crate::nn::layers::check_inputs;
use crate::tensor::Tensor;
use crate::types::{FloatT, NetPhase, Shape3d};

/// Joins inputs of equal width/height along the depth axis.
#[derive(Debug, Clone)]
pub struct ConcatLayer {
    in_shapes: Vec<Shape3d>,
    out_shapes: Vec<Shape3d>,
}

impl ConcatLayer {
    pub const TYPE: &'static str = "concat";

    pub fn shape_for(inputs: &[Shape3d]) -> Result<LayerShapes, NeuraGraphError> {
        let first = inputs.first().ok_or_else(|| {
            NeuraGraphError::invalid_layer(Self::TYPE, "concat needs at least one input")
        })?;
        let mut depth = 0;
        for shape in inputs {
            check_shape(Self::TYPE, "input", *shape)?;
            if shape.width != first.width || shape.height != first.height {
                return Err(NeuraGraphError::invalid_layer(
                    Self::TYPE,
                    format!("input {shape} does not match extent {}x{}", first.width, first.height),
                ));
            }
            depth += shape.depth;
        }
        Ok(LayerShapes {
            inputs: inputs.to_vec(),
            outputs: vec![Shape3d::new(first.width, first.height, depth)],
        })
    }

    pub fn new(inputs: &[Shape3d]) -> Result<Self, NeuraGraphError> {
        let shapes = Self::shape_for(inputs)?;
        Ok(ConcatLayer {
            in_shapes: shapes.inputs,
            out_shapes: shapes.outputs,
        })
    }
}

impl LayerOp for ConcatLayer {
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
        let batch = check_inputs(Self::TYPE, inputs, &self.in_shapes)?;
        for s in 0..batch {
            let y = outputs[0].sample_mut(s);
            let mut offset = 0;
            for input in inputs {
                let x = input.sample(s);
                y[offset..offset + x.len()].copy_from_slice(x);
                offset += x.len();
            }
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
        let batch = check_inputs(Self::TYPE, pass.inputs, &self.in_shapes)?;
        for s in 0..batch {
            let dy = pass.out_grads[0].sample(s);
            let mut offset = 0;
            for grad in in_grads.iter_mut() {
                let dx = grad.sample_mut(s);
                let len = dx.len();
                dx.copy_from_slice(&dy[offset..offset + len]);
                offset += len;
            }
        }
        Ok(())
    }
}

/// Splits the input depth into `num_outputs` equal parts.
#[derive(Debug, Clone)]
pub struct SliceLayer {
    in_shapes: Vec<Shape3d>,
    out_shapes: Vec<Shape3d>,
}

impl SliceLayer {
    pub const TYPE: &'static str = "slice";

    pub fn shape_for(input: Shape3d, num_outputs: usize) -> Result<LayerShapes, NeuraGraphError> {
        check_shape(Self::TYPE, "input", input)?;
        if num_outputs == 0 || input.depth % num_outputs != 0 {
            return Err(NeuraGraphError::invalid_layer(
                Self::TYPE,
                format!("depth {} cannot be split into {num_outputs} equal parts", input.depth),
            ));
        }
        let part = Shape3d::new(input.width, input.height, input.depth / num_outputs);
        Ok(LayerShapes {
            inputs: vec![input],
            outputs: vec![part; num_outputs],
        })
    }

    pub fn new(input: Shape3d, num_outputs: usize) -> Result<Self, NeuraGraphError> {
        let shapes = Self::shape_for(input, num_outputs)?;
        Ok(SliceLayer {
            in_shapes: shapes.inputs,
            out_shapes: shapes.outputs,
        })
    }
}

impl LayerOp for SliceLayer {
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
        let batch = check_inputs(Self::TYPE, inputs, &self.in_shapes)?;
        for s in 0..batch {
            let x = inputs[0].sample(s);
            let mut offset = 0;
            for output in outputs.iter_mut() {
                let y = output.sample_mut(s);
                let len = y.len();
                y.copy_from_slice(&x[offset..offset + len]);
                offset += len;
            }
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
        let batch = check_inputs(Self::TYPE, pass.inputs, &self.in_shapes)?;
        for s in 0..batch {
            let dx = in_grads[0].sample_mut(s);
            let mut offset = 0;
            for grad in pass.out_grads {
                let dy = grad.sample(s);
                dx[offset..offset + dy.len()].copy_from_slice(dy);
                offset += dy.len();
            }
        }
        Ok(())
    }
}
