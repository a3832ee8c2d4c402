use crate::error::NeuraGraphError;
use crate::nn::config::check_shape;
use crate::nn::layer::{BackwardPass, LayerOp, LayerScratch, LayerShapes};
use crate::nn::layers::check_inputs;
use crate::nn::parameter::Parameter;
use crate::tensor::Tensor;
use crate::types::{FloatT, NetPhase, ParamKind, Shape3d};
use serde::{Deserialize, Serialize};

/// Border handling of a convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Padding {
    /// Only positions where the kernel fits entirely inside the input.
    Valid,
    /// Zero padding so that the output has `ceil(input / stride)` positions.
    Same,
}

/// Resolved geometry of a 2D convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvGeometry {
    pub input: Shape3d,
    pub output: Shape3d,
    pub kernel_width: usize,
    pub kernel_height: usize,
    pub stride: usize,
    pub pad_left: usize,
    pub pad_top: usize,
}

impl ConvGeometry {
    pub fn shapes(&self) -> LayerShapes {
        LayerShapes {
            inputs: vec![self.input],
            outputs: vec![self.output],
        }
    }

    fn kernel_area(&self) -> usize {
        self.kernel_width * self.kernel_height
    }

    #[inline]
    fn weight_index(&self, out_c: usize, in_c: usize, ky: usize, kx: usize) -> usize {
        ((out_c * self.input.depth + in_c) * self.kernel_height + ky) * self.kernel_width + kx
    }
}

/// Input coordinate read by kernel tap `k` of output position `pos`, if it
/// falls inside the (unpadded) input.
#[inline]
fn source(pos: usize, stride: usize, k: usize, pad: usize, limit: usize) -> Option<usize> {
    (pos * stride + k).checked_sub(pad).filter(|v| *v < limit)
}

fn extent(
    axis: &str,
    input: usize,
    kernel: usize,
    stride: usize,
    padding: Padding,
) -> Result<(usize, usize), NeuraGraphError> {
    match padding {
        Padding::Valid => {
            if (input - kernel) % stride != 0 {
                return Err(NeuraGraphError::invalid_layer(
                    ConvolutionLayer::TYPE,
                    format!(
                        "stride {stride} does not tile input {axis} {input} with kernel {kernel} under valid padding"
                    ),
                ));
            }
            Ok(((input - kernel) / stride + 1, 0))
        }
        Padding::Same => {
            let out = (input + stride - 1) / stride;
            let pad_total = ((out - 1) * stride + kernel).saturating_sub(input);
            Ok((out, pad_total / 2))
        }
    }
}

/// 2D convolution over depth-major samples.
///
/// Weights have shape `kernel_width x kernel_height x (in_channels * out_channels)`,
/// one bias per output channel.
#[derive(Debug, Clone)]
pub struct ConvolutionLayer {
    geometry: ConvGeometry,
    in_shapes: Vec<Shape3d>,
    out_shapes: Vec<Shape3d>,
    params: Vec<Parameter>,
}

impl ConvolutionLayer {
    pub const TYPE: &'static str = "convolution";

    /// Validates a convolution configuration and resolves its output shape and padding.
    pub fn geometry(
        input: Shape3d,
        kernel_width: usize,
        kernel_height: usize,
        out_channels: usize,
        stride: usize,
        padding: Padding,
    ) -> Result<ConvGeometry, NeuraGraphError> {
        check_shape(Self::TYPE, "input", input)?;
        if kernel_width == 0 || kernel_height == 0 || out_channels == 0 || stride == 0 {
            return Err(NeuraGraphError::invalid_layer(
                Self::TYPE,
                "kernel size, out_channels and stride must be positive",
            ));
        }
        if kernel_width > input.width || kernel_height > input.height {
            return Err(NeuraGraphError::invalid_layer(
                Self::TYPE,
                format!(
                    "kernel {kernel_width}x{kernel_height} larger than input {}x{}",
                    input.width, input.height
                ),
            ));
        }
        let (out_w, pad_left) = extent("width", input.width, kernel_width, stride, padding)?;
        let (out_h, pad_top) = extent("height", input.height, kernel_height, stride, padding)?;
        Ok(ConvGeometry {
            input,
            output: Shape3d::new(out_w, out_h, out_channels),
            kernel_width,
            kernel_height,
            stride,
            pad_left,
            pad_top,
        })
    }

    pub fn new(geometry: ConvGeometry, has_bias: bool) -> Self {
        let mut params = vec![Parameter::new(
            ParamKind::Weight,
            Shape3d::new(
                geometry.kernel_width,
                geometry.kernel_height,
                geometry.input.depth * geometry.output.depth,
            ),
        )];
        if has_bias {
            params.push(Parameter::new(
                ParamKind::Bias,
                Shape3d::vector(geometry.output.depth),
            ));
        }
        ConvolutionLayer {
            geometry,
            in_shapes: vec![geometry.input],
            out_shapes: vec![geometry.output],
            params,
        }
    }

    pub fn geometry_ref(&self) -> &ConvGeometry {
        &self.geometry
    }
}

impl LayerOp for ConvolutionLayer {
    fn layer_type(&self) -> &'static str {
        Self::TYPE
    }

    fn in_shapes(&self) -> &[Shape3d] {
        &self.in_shapes
    }

    fn out_shapes(&self) -> &[Shape3d] {
        &self.out_shapes
    }

    fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut [Parameter] {
        &mut self.params
    }

    fn fan_in_size(&self) -> usize {
        self.geometry.kernel_area() * self.geometry.input.depth
    }

    fn fan_out_size(&self) -> usize {
        self.geometry.kernel_area() * self.geometry.output.depth
    }

    fn forward(
        &self,
        inputs: &[&Tensor],
        outputs: &mut [Tensor],
        _phase: NetPhase,
        _scratch: &mut LayerScratch,
    ) -> Result<(), NeuraGraphError> {
        let batch = check_inputs(Self::TYPE, inputs, &self.in_shapes)?;
        let g = &self.geometry;
        let (ins, outs) = (g.input, g.output);
        let w = self.params[0].value();
        let bias = self.params.get(1).map(Parameter::value);

        for s in 0..batch {
            let x = inputs[0].sample(s);
            let y = outputs[0].sample_mut(s);
            for o in 0..outs.depth {
                let b = bias.map_or(0.0, |b| b[o]);
                for oy in 0..outs.height {
                    for ox in 0..outs.width {
                        let mut sum = b;
                        for i in 0..ins.depth {
                            for ky in 0..g.kernel_height {
                                let Some(iy) = source(oy, g.stride, ky, g.pad_top, ins.height) else {
                                    continue;
                                };
                                for kx in 0..g.kernel_width {
                                    if let Some(ix) = source(ox, g.stride, kx, g.pad_left, ins.width) {
                                        sum += w[g.weight_index(o, i, ky, kx)] * x[ins.index(ix, iy, i)];
                                    }
                                }
                            }
                        }
                        y[outs.index(ox, oy, o)] = sum;
                    }
                }
            }
        }
        Ok(())
    }

    fn backward(
        &self,
        pass: BackwardPass<'_>,
        in_grads: &mut [Tensor],
        param_grads: &mut [Vec<FloatT>],
        _scratch: &mut LayerScratch,
    ) -> Result<(), NeuraGraphError> {
        let batch = check_inputs(Self::TYPE, pass.inputs, &self.in_shapes)?;
        let g = &self.geometry;
        let (ins, outs) = (g.input, g.output);
        let w = self.params[0].value();
        let (dw, db) = match param_grads {
            [dw] => (dw, None),
            [dw, db] => (dw, Some(db)),
            _ => {
                return Err(NeuraGraphError::data_mismatch(
                    "convolution parameter gradient count",
                    self.params.len(),
                    param_grads.len(),
                ))
            }
        };
        let mut db = db;

        for s in 0..batch {
            let x = pass.inputs[0].sample(s);
            let dy = pass.out_grads[0].sample(s);
            let dx = in_grads[0].sample_mut(s);
            for o in 0..outs.depth {
                for oy in 0..outs.height {
                    for ox in 0..outs.width {
                        let grad = dy[outs.index(ox, oy, o)];
                        if let Some(db) = db.as_deref_mut() {
                            db[o] += grad;
                        }
                        for i in 0..ins.depth {
                            for ky in 0..g.kernel_height {
                                let Some(iy) = source(oy, g.stride, ky, g.pad_top, ins.height) else {
                                    continue;
                                };
                                for kx in 0..g.kernel_width {
                                    if let Some(ix) = source(ox, g.stride, kx, g.pad_left, ins.width) {
                                        let wi = g.weight_index(o, i, ky, kx);
                                        let xi = ins.index(ix, iy, i);
                                        dw[wi] += x[xi] * grad;
                                        dx[xi] += w[wi] * grad;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "convolution_test.rs"]
mod tests;
