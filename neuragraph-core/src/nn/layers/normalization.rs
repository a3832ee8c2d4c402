use crate::error::NeuraGraphError;
use crate::nn::config::check_shape;
use crate::nn::layer::{BackwardPass, LayerOp, LayerScratch, LayerShapes};
use crate::nn::layers::check_inputs;
use crate::tensor::Tensor;
use crate::types::{FloatT, NetPhase, Shape3d};

/// Scales every sample to unit L2 norm: `y = x / sqrt(sum(x^2) + epsilon)`.
///
/// Statistics are per sample, so results never depend on how a batch is split.
#[derive(Debug, Clone)]
pub struct L2NormalizationLayer {
    epsilon: FloatT,
    shapes: Vec<Shape3d>,
}

impl L2NormalizationLayer {
    pub const TYPE: &'static str = "l2_normalization";

    pub fn shape_for(shape: Shape3d, epsilon: FloatT) -> Result<LayerShapes, NeuraGraphError> {
        check_shape(Self::TYPE, "input", shape)?;
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(NeuraGraphError::invalid_layer(
                Self::TYPE,
                format!("epsilon must be finite and non-negative, got {epsilon}"),
            ));
        }
        Ok(LayerShapes {
            inputs: vec![shape],
            outputs: vec![shape],
        })
    }

    pub fn new(shape: Shape3d, epsilon: FloatT) -> Result<Self, NeuraGraphError> {
        Self::shape_for(shape, epsilon)?;
        Ok(L2NormalizationLayer {
            epsilon,
            shapes: vec![shape],
        })
    }

    fn norm(&self, x: &[FloatT]) -> FloatT {
        (x.iter().map(|v| v * v).sum::<FloatT>() + self.epsilon).sqrt()
    }
}

impl LayerOp for L2NormalizationLayer {
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
            let norm = self.norm(x);
            for (y, xi) in outputs[0].sample_mut(s).iter_mut().zip(x) {
                *y = *xi / norm;
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
            let norm = self.norm(pass.inputs[0].sample(s));
            let y = pass.outputs[0].sample(s);
            let dy = pass.out_grads[0].sample(s);
            let dot: FloatT = dy.iter().zip(y).map(|(g, v)| g * v).sum();
            for ((dx, g), v) in in_grads[0].sample_mut(s).iter_mut().zip(dy).zip(y) {
                *dx = (g - v * dot) / norm;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::config::LayerConfig;
    use crate::nn::layers::test_support::{build, run_backward};
    use approx::assert_relative_eq;

    #[test]
    fn test_l2_normalization_unit_norm_and_orthogonal_gradient() {
        let layer = build(LayerConfig::L2Normalization {
            shape: Shape3d::vector(2),
            epsilon: 0.0,
        });
        let x = Tensor::from_sample(&[3.0, 4.0]);
        // gradient along the output direction vanishes
        let dy = Tensor::from_sample(&[0.6, 0.8]);
        let (out, dx, _) = run_backward(&layer, &[&x], &[&dy]);
        assert_relative_eq!(out[0].sample(0)[0], 0.6, epsilon = 1e-12);
        assert_relative_eq!(out[0].sample(0)[1], 0.8, epsilon = 1e-12);
        for v in dx[0].sample(0) {
            assert_relative_eq!(*v, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_negative_epsilon_rejected() {
        let config = LayerConfig::L2Normalization {
            shape: Shape3d::vector(2),
            epsilon: -1.0,
        };
        assert!(config.shape_for().is_err());
    }
}
