use crate::error::NeuraGraphError;
use crate::nn::layer::{BackwardPass, LayerOp, LayerScratch, LayerShapes};
use crate::nn::layers::check_inputs;
use crate::nn::layers::fully_connected::{dense_backward, dense_forward, dense_params, dense_shapes};
use crate::nn::parameter::Parameter;
use crate::tensor::Tensor;
use crate::types::{FloatT, NetPhase, Shape3d};

/// Number of representable levels of the 8-bit grid.
const LEVELS: FloatT = 255.0;

/// Fully-connected layer computing on 8-bit quantized operands.
///
/// Forward snaps the weights and every input sample onto a 256-level grid
/// spanning their own range (zero always included), multiplies, then adds the
/// float bias. Backward uses the straight-through approximation: the Jacobian
/// of the float dense layer evaluated at the quantized operands.
#[derive(Debug, Clone)]
pub struct QuantizedFullyConnectedLayer {
    in_size: usize,
    out_size: usize,
    in_shapes: Vec<Shape3d>,
    out_shapes: Vec<Shape3d>,
    params: Vec<Parameter>,
}

impl QuantizedFullyConnectedLayer {
    pub const TYPE: &'static str = "quantized_fully_connected";

    pub fn shape_for(in_size: usize, out_size: usize) -> Result<LayerShapes, NeuraGraphError> {
        dense_shapes(Self::TYPE, in_size, out_size)
    }

    pub fn new(in_size: usize, out_size: usize, has_bias: bool) -> Result<Self, NeuraGraphError> {
        let shapes = Self::shape_for(in_size, out_size)?;
        Ok(QuantizedFullyConnectedLayer {
            in_size,
            out_size,
            in_shapes: shapes.inputs,
            out_shapes: shapes.outputs,
            params: dense_params(in_size, out_size, has_bias),
        })
    }
}

impl LayerOp for QuantizedFullyConnectedLayer {
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

    fn forward(
        &self,
        inputs: &[&Tensor],
        outputs: &mut [Tensor],
        _phase: NetPhase,
        scratch: &mut LayerScratch,
    ) -> Result<(), NeuraGraphError> {
        let batch = check_inputs(Self::TYPE, inputs, &self.in_shapes)?;
        // mask: quantized weights, buffer: quantized inputs (batch x in_size)
        scratch.mask.resize(self.params[0].len(), 0.0);
        fake_quantize(self.params[0].value(), &mut scratch.mask);
        scratch.buffer.resize(batch * self.in_size, 0.0);
        let bias = self.params.get(1).map(Parameter::value);
        for s in 0..batch {
            let qx = &mut scratch.buffer[s * self.in_size..(s + 1) * self.in_size];
            fake_quantize(inputs[0].sample(s), qx);
            dense_forward(qx, &scratch.mask, bias, self.out_size, outputs[0].sample_mut(s));
        }
        Ok(())
    }

    fn backward(
        &self,
        pass: BackwardPass<'_>,
        in_grads: &mut [Tensor],
        param_grads: &mut [Vec<FloatT>],
        scratch: &mut LayerScratch,
    ) -> Result<(), NeuraGraphError> {
        let batch = check_inputs(Self::TYPE, pass.inputs, &self.in_shapes)?;
        if scratch.buffer.len() != batch * self.in_size || scratch.mask.len() != self.params[0].len() {
            return Err(NeuraGraphError::data_mismatch(
                "quantized_fully_connected backward without matching forward",
                batch * self.in_size,
                scratch.buffer.len(),
            ));
        }
        for s in 0..batch {
            dense_backward(
                &scratch.buffer[s * self.in_size..(s + 1) * self.in_size],
                &scratch.mask,
                pass.out_grads[0].sample(s),
                self.in_size,
                self.out_size,
                in_grads[0].sample_mut(s),
                param_grads,
            );
        }
        Ok(())
    }
}

/// Rounds each value onto the 8-bit grid spanning `[min(values, 0), max(values, 0)]`
/// and writes the dequantized result into `out`.
pub(crate) fn fake_quantize(values: &[FloatT], out: &mut [FloatT]) {
    let (lo, hi) = values
        .iter()
        .fold((0.0 as FloatT, 0.0 as FloatT), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let step = (hi - lo) / LEVELS;
    if step <= 0.0 {
        out.copy_from_slice(values);
        return;
    }
    for (o, v) in out.iter_mut().zip(values) {
        *o = ((*v - lo) / step).round() * step + lo;
    }
}
