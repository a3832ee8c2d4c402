use crate::error::NeuraGraphError;
use crate::nn::config::check_shape;
use crate::nn::layer::{BackwardPass, LayerOp, LayerScratch, LayerShapes};
use crate::nn::layers::check_inputs;
use crate::tensor::Tensor;
use crate::types::{FloatT, NetPhase, Numeric, Shape3d};
use serde::{Deserialize, Serialize};

/// Element-wise (or, for softmax, per-sample) activation functions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ActivationFn {
    Identity,
    Relu,
    LeakyRelu { alpha: FloatT },
    Sigmoid,
    Tanh,
    Softmax,
    Softplus,
    Elu { alpha: FloatT },
}

impl ActivationFn {
    pub fn name(&self) -> &'static str {
        match self {
            ActivationFn::Identity => "identity",
            ActivationFn::Relu => "relu",
            ActivationFn::LeakyRelu { .. } => "leaky_relu",
            ActivationFn::Sigmoid => "sigmoid",
            ActivationFn::Tanh => "tanh",
            ActivationFn::Softmax => "softmax",
            ActivationFn::Softplus => "softplus",
            ActivationFn::Elu { .. } => "elu",
        }
    }

    /// Target values `(negative, positive)` used when turning class labels
    /// into one-hot targets for a network ending in this activation.
    pub fn target_range(&self) -> (FloatT, FloatT) {
        match self {
            ActivationFn::Tanh => (-0.8, 0.8),
            ActivationFn::Softmax => (0.0, 1.0),
            _ => (0.1, 0.9),
        }
    }

    fn apply(&self, x: FloatT) -> FloatT {
        match *self {
            ActivationFn::Identity | ActivationFn::Softmax => x,
            ActivationFn::Relu => relu(x),
            ActivationFn::LeakyRelu { alpha } => leaky_relu(x, alpha),
            ActivationFn::Sigmoid => sigmoid(x),
            ActivationFn::Tanh => x.tanh(),
            ActivationFn::Softplus => softplus(x),
            ActivationFn::Elu { alpha } => elu(x, alpha),
        }
    }

    /// `dy/dx` given the input `x` and output `y` of the same element.
    fn derivative(&self, x: FloatT, y: FloatT) -> FloatT {
        match *self {
            ActivationFn::Identity | ActivationFn::Softmax => 1.0,
            ActivationFn::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            ActivationFn::LeakyRelu { alpha } => {
                if x > 0.0 {
                    1.0
                } else {
                    alpha
                }
            }
            ActivationFn::Sigmoid => y * (1.0 - y),
            ActivationFn::Tanh => 1.0 - y * y,
            ActivationFn::Softplus => sigmoid(x),
            ActivationFn::Elu { alpha } => {
                if x > 0.0 {
                    1.0
                } else {
                    y + alpha
                }
            }
        }
    }
}

fn relu<T: Numeric>(x: T) -> T {
    x.max(T::zero())
}

fn leaky_relu<T: Numeric>(x: T, alpha: T) -> T {
    if x > T::zero() {
        x
    } else {
        alpha * x
    }
}

fn sigmoid<T: Numeric>(x: T) -> T {
    T::one() / (T::one() + (-x).exp())
}

fn softplus<T: Numeric>(x: T) -> T {
    x.max(T::zero()) + (-x.abs()).exp().ln_1p()
}

fn elu<T: Numeric>(x: T, alpha: T) -> T {
    if x > T::zero() {
        x
    } else {
        alpha * x.exp_m1()
    }
}

fn softmax<T: Numeric>(x: &[T], y: &mut [T]) {
    let max = x.iter().copied().fold(T::neg_infinity(), T::max);
    let mut denom = T::zero();
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi = (*xi - max).exp();
        denom += *yi;
    }
    for yi in y.iter_mut() {
        *yi /= denom;
    }
}

/// Activation applied to a whole tensor of the given shape.
#[derive(Debug, Clone)]
pub struct ActivationLayer {
    function: ActivationFn,
    shapes: Vec<Shape3d>,
}

impl ActivationLayer {
    pub const TYPE: &'static str = "activation";

    pub fn shape_for(shape: Shape3d, function: ActivationFn) -> Result<LayerShapes, NeuraGraphError> {
        check_shape(Self::TYPE, "input", shape)?;
        if let ActivationFn::LeakyRelu { alpha } | ActivationFn::Elu { alpha } = function {
            if !alpha.is_finite() {
                return Err(NeuraGraphError::invalid_layer(
                    Self::TYPE,
                    format!("{} alpha must be finite, got {alpha}", function.name()),
                ));
            }
        }
        Ok(LayerShapes {
            inputs: vec![shape],
            outputs: vec![shape],
        })
    }

    pub fn new(shape: Shape3d, function: ActivationFn) -> Result<Self, NeuraGraphError> {
        Self::shape_for(shape, function)?;
        Ok(ActivationLayer {
            function,
            shapes: vec![shape],
        })
    }

    pub fn function(&self) -> ActivationFn {
        self.function
    }
}

impl LayerOp for ActivationLayer {
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
        let batch = check_inputs(Self::TYPE, inputs, &self.shapes)?;
        for s in 0..batch {
            let x = inputs[0].sample(s);
            let y = outputs[0].sample_mut(s);
            if self.function == ActivationFn::Softmax {
                softmax(x, y);
            } else {
                for (yi, xi) in y.iter_mut().zip(x) {
                    *yi = self.function.apply(*xi);
                }
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
        let batch = check_inputs(Self::TYPE, pass.inputs, &self.shapes)?;
        for s in 0..batch {
            let x = pass.inputs[0].sample(s);
            let y = pass.outputs[0].sample(s);
            let dy = pass.out_grads[0].sample(s);
            let dx = in_grads[0].sample_mut(s);
            if self.function == ActivationFn::Softmax {
                // dx_i = y_i * (dy_i - sum_j dy_j y_j)
                let dot: FloatT = dy.iter().zip(y).map(|(g, v)| *g * *v).sum();
                for ((dxi, yi), gi) in dx.iter_mut().zip(y).zip(dy) {
                    *dxi = *yi * (*gi - dot);
                }
            } else {
                for (i, dxi) in dx.iter_mut().enumerate() {
                    *dxi = dy[i] * self.function.derivative(x[i], y[i]);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "activation_test.rs"]
mod tests;
