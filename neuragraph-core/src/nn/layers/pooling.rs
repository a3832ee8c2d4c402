//! Spatial pooling layers. None of them own parameters.

use crate::error::NeuraGraphError;
use crate::nn::config::check_shape;
use crate::nn::layer::{BackwardPass, LayerOp, LayerScratch, LayerShapes};
use crate::nn::layers::check_inputs;
use crate::tensor::Tensor;
use crate::types::{FloatT, NetPhase, Shape3d};

fn pooled_shape(
    layer_type: &str,
    input: Shape3d,
    pool_size: usize,
    stride: usize,
) -> Result<Shape3d, NeuraGraphError> {
    check_shape(layer_type, "input", input)?;
    if pool_size == 0 || stride == 0 {
        return Err(NeuraGraphError::invalid_layer(
            layer_type,
            "pool_size and stride must be positive",
        ));
    }
    if pool_size > input.width || pool_size > input.height {
        return Err(NeuraGraphError::invalid_layer(
            layer_type,
            format!("pool window {pool_size} larger than input {input}"),
        ));
    }
    if (input.width - pool_size) % stride != 0 || (input.height - pool_size) % stride != 0 {
        return Err(NeuraGraphError::invalid_layer(
            layer_type,
            format!("pool window {pool_size} with stride {stride} does not tile input {input}"),
        ));
    }
    Ok(Shape3d::new(
        (input.width - pool_size) / stride + 1,
        (input.height - pool_size) / stride + 1,
        input.depth,
    ))
}

/// Window geometry shared by max and average pooling.
#[derive(Debug, Clone)]
struct PoolWindow {
    in_shapes: Vec<Shape3d>,
    out_shapes: Vec<Shape3d>,
    pool_size: usize,
    stride: usize,
}

impl PoolWindow {
    fn new(layer_type: &str, input: Shape3d, pool_size: usize, stride: usize) -> Result<Self, NeuraGraphError> {
        let output = pooled_shape(layer_type, input, pool_size, stride)?;
        Ok(PoolWindow {
            in_shapes: vec![input],
            out_shapes: vec![output],
            pool_size,
            stride,
        })
    }

    /// Calls `f(out_index, in_indices)` for every output position of one sample.
    fn for_each_window(&self, mut f: impl FnMut(usize, &mut dyn Iterator<Item = usize>)) {
        let (ins, outs) = (self.in_shapes[0], self.out_shapes[0]);
        for c in 0..outs.depth {
            for oy in 0..outs.height {
                for ox in 0..outs.width {
                    let (x0, y0) = (ox * self.stride, oy * self.stride);
                    let pool = self.pool_size;
                    let mut taps = (0..pool)
                        .flat_map(move |dy| (0..pool).map(move |dx| ins.index(x0 + dx, y0 + dy, c)));
                    f(outs.index(ox, oy, c), &mut taps);
                }
            }
        }
    }
}

/// Max pooling. Forward remembers the arg-max of each window per sample.
#[derive(Debug, Clone)]
pub struct MaxPoolingLayer {
    window: PoolWindow,
}

impl MaxPoolingLayer {
    pub const TYPE: &'static str = "max_pooling";

    pub fn shape_for(input: Shape3d, pool_size: usize, stride: usize) -> Result<LayerShapes, NeuraGraphError> {
        Ok(LayerShapes {
            inputs: vec![input],
            outputs: vec![pooled_shape(Self::TYPE, input, pool_size, stride)?],
        })
    }

    pub fn new(input: Shape3d, pool_size: usize, stride: usize) -> Result<Self, NeuraGraphError> {
        Ok(MaxPoolingLayer {
            window: PoolWindow::new(Self::TYPE, input, pool_size, stride)?,
        })
    }
}

impl LayerOp for MaxPoolingLayer {
    fn layer_type(&self) -> &'static str {
        Self::TYPE
    }

    fn in_shapes(&self) -> &[Shape3d] {
        &self.window.in_shapes
    }

    fn out_shapes(&self) -> &[Shape3d] {
        &self.window.out_shapes
    }

    fn forward(
        &self,
        inputs: &[&Tensor],
        outputs: &mut [Tensor],
        _phase: NetPhase,
        scratch: &mut LayerScratch,
    ) -> Result<(), NeuraGraphError> {
        let batch = check_inputs(Self::TYPE, inputs, &self.window.in_shapes)?;
        let out_size = self.window.out_shapes[0].size();
        scratch.indices.resize(batch * out_size, 0);
        for s in 0..batch {
            let x = inputs[0].sample(s);
            let y = outputs[0].sample_mut(s);
            let argmax = &mut scratch.indices[s * out_size..(s + 1) * out_size];
            self.window.for_each_window(|o, taps| {
                let mut best = usize::MAX;
                for i in taps {
                    if best == usize::MAX || x[i] > x[best] {
                        best = i;
                    }
                }
                argmax[o] = best;
                y[o] = x[best];
            });
        }
        Ok(())
    }

    fn backward(
        &self,
        pass: BackwardPass<'_>,
        in_grads: &mut [Tensor],
        _param_grads: &mut [Vec<FloatT>],
        scratch: &mut LayerScratch,
    ) -> Result<(), NeuraGraphError> {
        let batch = check_inputs(Self::TYPE, pass.inputs, &self.window.in_shapes)?;
        let out_size = self.window.out_shapes[0].size();
        if scratch.indices.len() != batch * out_size {
            return Err(NeuraGraphError::data_mismatch(
                "max_pooling backward without matching forward",
                batch * out_size,
                scratch.indices.len(),
            ));
        }
        for s in 0..batch {
            let dy = pass.out_grads[0].sample(s);
            let dx = in_grads[0].sample_mut(s);
            for (o, src) in scratch.indices[s * out_size..(s + 1) * out_size].iter().enumerate() {
                dx[*src] += dy[o];
            }
        }
        Ok(())
    }
}

/// Average pooling over square windows.
#[derive(Debug, Clone)]
pub struct AveragePoolingLayer {
    window: PoolWindow,
}

impl AveragePoolingLayer {
    pub const TYPE: &'static str = "average_pooling";

    pub fn shape_for(input: Shape3d, pool_size: usize, stride: usize) -> Result<LayerShapes, NeuraGraphError> {
        Ok(LayerShapes {
            inputs: vec![input],
            outputs: vec![pooled_shape(Self::TYPE, input, pool_size, stride)?],
        })
    }

    pub fn new(input: Shape3d, pool_size: usize, stride: usize) -> Result<Self, NeuraGraphError> {
        Ok(AveragePoolingLayer {
            window: PoolWindow::new(Self::TYPE, input, pool_size, stride)?,
        })
    }

    fn scale(&self) -> FloatT {
        1.0 / (self.window.pool_size * self.window.pool_size) as FloatT
    }
}

impl LayerOp for AveragePoolingLayer {
    fn layer_type(&self) -> &'static str {
        Self::TYPE
    }

    fn in_shapes(&self) -> &[Shape3d] {
        &self.window.in_shapes
    }

    fn out_shapes(&self) -> &[Shape3d] {
        &self.window.out_shapes
    }

    fn forward(
        &self,
        inputs: &[&Tensor],
        outputs: &mut [Tensor],
        _phase: NetPhase,
        _scratch: &mut LayerScratch,
    ) -> Result<(), NeuraGraphError> {
        let batch = check_inputs(Self::TYPE, inputs, &self.window.in_shapes)?;
        let scale = self.scale();
        for s in 0..batch {
            let x = inputs[0].sample(s);
            let y = outputs[0].sample_mut(s);
            self.window.for_each_window(|o, taps| {
                y[o] = taps.map(|i| x[i]).sum::<FloatT>() * scale;
            });
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
        let batch = check_inputs(Self::TYPE, pass.inputs, &self.window.in_shapes)?;
        let scale = self.scale();
        for s in 0..batch {
            let dy = pass.out_grads[0].sample(s);
            let dx = in_grads[0].sample_mut(s);
            self.window.for_each_window(|o, taps| {
                for i in taps {
                    dx[i] += dy[o] * scale;
                }
            });
        }
        Ok(())
    }
}

/// Averages every channel down to a single value: `w x h x d -> 1 x 1 x d`.
#[derive(Debug, Clone)]
pub struct GlobalAveragePoolingLayer {
    in_shapes: Vec<Shape3d>,
    out_shapes: Vec<Shape3d>,
}

impl GlobalAveragePoolingLayer {
    pub const TYPE: &'static str = "global_average_pooling";

    pub fn shape_for(input: Shape3d) -> Result<LayerShapes, NeuraGraphError> {
        check_shape(Self::TYPE, "input", input)?;
        Ok(LayerShapes {
            inputs: vec![input],
            outputs: vec![Shape3d::new(1, 1, input.depth)],
        })
    }

    pub fn new(input: Shape3d) -> Result<Self, NeuraGraphError> {
        let shapes = Self::shape_for(input)?;
        Ok(GlobalAveragePoolingLayer {
            in_shapes: shapes.inputs,
            out_shapes: shapes.outputs,
        })
    }
}

impl LayerOp for GlobalAveragePoolingLayer {
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
        let area = self.in_shapes[0].area();
        for s in 0..batch {
            let x = inputs[0].sample(s);
            for (c, y) in outputs[0].sample_mut(s).iter_mut().enumerate() {
                *y = x[c * area..(c + 1) * area].iter().sum::<FloatT>() / area as FloatT;
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
        let area = self.in_shapes[0].area();
        for s in 0..batch {
            let dy = pass.out_grads[0].sample(s);
            let dx = in_grads[0].sample_mut(s);
            for (c, g) in dy.iter().enumerate() {
                dx[c * area..(c + 1) * area].fill(*g / area as FloatT);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "pooling_test.rs"]
mod tests;
