use crate::error::NeuraGraphError;
use crate::nn::layer::{BackwardPass, LayerOp, LayerScratch, LayerShapes};
use crate::nn::layers::check_inputs;
use crate::nn::parameter::Parameter;
use crate::tensor::Tensor;
use crate::types::{FloatT, NetPhase, ParamKind, Shape3d};

/// Dense layer: `y[r] = sum_c W[c * out + r] * x[c] + b[r]`.
///
/// The weight parameter has shape `out x in x 1`; row `c` holds the fan-out
/// of input `c`. The bias parameter is present only when `has_bias` is set.
#[derive(Debug, Clone)]
pub struct FullyConnectedLayer {
    in_size: usize,
    out_size: usize,
    in_shapes: Vec<Shape3d>,
    out_shapes: Vec<Shape3d>,
    params: Vec<Parameter>,
}

impl FullyConnectedLayer {
    pub const TYPE: &'static str = "fully_connected";

    pub fn shape_for(in_size: usize, out_size: usize) -> Result<LayerShapes, NeuraGraphError> {
        dense_shapes(Self::TYPE, in_size, out_size)
    }

    /// Creates a new fully-connected layer with zeroed parameters.
    ///
    /// # Arguments
    ///
    /// * `in_size` - Length of each input sample.
    /// * `out_size` - Length of each output sample.
    /// * `has_bias` - If `true`, the layer learns an additive bias.
    pub fn new(in_size: usize, out_size: usize, has_bias: bool) -> Result<Self, NeuraGraphError> {
        let shapes = Self::shape_for(in_size, out_size)?;
        Ok(FullyConnectedLayer {
            in_size,
            out_size,
            in_shapes: shapes.inputs,
            out_shapes: shapes.outputs,
            params: dense_params(in_size, out_size, has_bias),
        })
    }

    pub fn weights(&self) -> &Parameter {
        &self.params[0]
    }

    pub fn bias(&self) -> Option<&Parameter> {
        self.params.get(1)
    }

    pub fn has_bias(&self) -> bool {
        self.params.len() > 1
    }
}

impl LayerOp for FullyConnectedLayer {
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
        _scratch: &mut LayerScratch,
    ) -> Result<(), NeuraGraphError> {
        let batch = check_inputs(Self::TYPE, inputs, &self.in_shapes)?;
        let w = self.params[0].value();
        let b = self.bias().map(Parameter::value);
        for s in 0..batch {
            dense_forward(
                inputs[0].sample(s),
                w,
                b,
                self.out_size,
                outputs[0].sample_mut(s),
            );
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
        let w = self.params[0].value();
        for s in 0..batch {
            dense_backward(
                pass.inputs[0].sample(s),
                w,
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

pub(crate) fn dense_shapes(
    layer_type: &str,
    in_size: usize,
    out_size: usize,
) -> Result<LayerShapes, NeuraGraphError> {
    if in_size == 0 || out_size == 0 {
        return Err(NeuraGraphError::invalid_layer(
            layer_type,
            format!("in_size and out_size must be positive, got {in_size} -> {out_size}"),
        ));
    }
    Ok(LayerShapes {
        inputs: vec![Shape3d::vector(in_size)],
        outputs: vec![Shape3d::vector(out_size)],
    })
}

pub(crate) fn dense_params(in_size: usize, out_size: usize, has_bias: bool) -> Vec<Parameter> {
    let mut params = vec![Parameter::new(
        ParamKind::Weight,
        Shape3d::new(out_size, in_size, 1),
    )];
    if has_bias {
        params.push(Parameter::new(ParamKind::Bias, Shape3d::vector(out_size)));
    }
    params
}

/// One sample of the dense product.
pub(crate) fn dense_forward(
    x: &[FloatT],
    w: &[FloatT],
    b: Option<&[FloatT]>,
    out_size: usize,
    y: &mut [FloatT],
) {
    match b {
        Some(b) => y.copy_from_slice(b),
        None => y.fill(0.0),
    }
    for (c, xc) in x.iter().enumerate() {
        let row = &w[c * out_size..(c + 1) * out_size];
        for (yr, wr) in y.iter_mut().zip(row) {
            *yr += *wr * *xc;
        }
    }
}

/// One sample of the dense backward: writes `dx`, adds into `dW` and `db`.
pub(crate) fn dense_backward(
    x: &[FloatT],
    w: &[FloatT],
    dy: &[FloatT],
    in_size: usize,
    out_size: usize,
    dx: &mut [FloatT],
    param_grads: &mut [Vec<FloatT>],
) {
    for c in 0..in_size {
        let row = &w[c * out_size..(c + 1) * out_size];
        dx[c] = row.iter().zip(dy).map(|(wr, g)| *wr * *g).sum();
    }
    if let Some(dw) = param_grads.get_mut(0) {
        for (c, xc) in x.iter().enumerate() {
            let row = &mut dw[c * out_size..(c + 1) * out_size];
            for (dwr, g) in row.iter_mut().zip(dy) {
                *dwr += *xc * *g;
            }
        }
    }
    if let Some(db) = param_grads.get_mut(1) {
        for (dbr, g) in db.iter_mut().zip(dy) {
            *dbr += *g;
        }
    }
}

#[cfg(test)]
#[path = "fully_connected_test.rs"]
mod tests;
