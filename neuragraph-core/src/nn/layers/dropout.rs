use crate::error::NeuraGraphError;
use crate::nn::config::check_shape;
use crate::nn::layer::{BackwardPass, LayerOp, LayerScratch, LayerShapes};
use crate::nn::layers::{check_inputs, copy_tensor};
use crate::tensor::Tensor;
use crate::types::{FloatT, NetPhase, Shape3d};
use rand::Rng;

/// Inverted dropout.
///
/// In the `Train` phase each element is zeroed with probability `rate` and
/// the survivors are scaled by `1 / (1 - rate)`; the mask is drawn from the
/// worker's own RNG and kept for backward. In the `Test` phase the layer is
/// the identity.
#[derive(Debug, Clone)]
pub struct DropoutLayer {
    rate: FloatT,
    shapes: Vec<Shape3d>,
}

impl DropoutLayer {
    pub const TYPE: &'static str = "dropout";

    pub fn shape_for(shape: Shape3d, rate: FloatT) -> Result<LayerShapes, NeuraGraphError> {
        check_shape(Self::TYPE, "input", shape)?;
        if !(0.0..1.0).contains(&rate) {
            return Err(NeuraGraphError::invalid_layer(
                Self::TYPE,
                format!("dropout rate must be in [0, 1), got {rate}"),
            ));
        }
        Ok(LayerShapes {
            inputs: vec![shape],
            outputs: vec![shape],
        })
    }

    pub fn new(shape: Shape3d, rate: FloatT) -> Result<Self, NeuraGraphError> {
        Self::shape_for(shape, rate)?;
        Ok(DropoutLayer {
            rate,
            shapes: vec![shape],
        })
    }

    pub fn rate(&self) -> FloatT {
        self.rate
    }
}

impl LayerOp for DropoutLayer {
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
        phase: NetPhase,
        scratch: &mut LayerScratch,
    ) -> Result<(), NeuraGraphError> {
        check_inputs(Self::TYPE, inputs, &self.shapes)?;
        if phase == NetPhase::Test {
            return copy_tensor(Self::TYPE, &mut outputs[0], inputs[0]);
        }
        let keep_scale = 1.0 / (1.0 - self.rate);
        let x = inputs[0].as_slice();
        scratch.mask.resize(x.len(), 0.0);
        for (m, (y, xi)) in scratch
            .mask
            .iter_mut()
            .zip(outputs[0].as_mut_slice().iter_mut().zip(x))
        {
            *m = if scratch.rng.gen::<FloatT>() < self.rate {
                0.0
            } else {
                keep_scale
            };
            *y = *xi * *m;
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
        if pass.phase == NetPhase::Test {
            return copy_tensor(Self::TYPE, &mut in_grads[0], pass.out_grads[0]);
        }
        let dy = pass.out_grads[0].as_slice();
        if scratch.mask.len() != dy.len() {
            return Err(NeuraGraphError::data_mismatch(
                "dropout backward without matching forward",
                dy.len(),
                scratch.mask.len(),
            ));
        }
        for (dx, (g, m)) in in_grads[0]
            .as_mut_slice()
            .iter_mut()
            .zip(dy.iter().zip(&scratch.mask))
        {
            *dx = *g * *m;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::config::LayerConfig;
    use crate::nn::layers::test_support::{build, run_backward, run_forward};

    #[test]
    fn test_dropout_is_identity_at_test_time() {
        let layer = build(LayerConfig::dropout(Shape3d::vector(4), 0.5));
        let x = Tensor::from_sample(&[1.0, 2.0, 3.0, 4.0]);
        let (out, _) = run_forward(&layer, &[&x], NetPhase::Test);
        assert_eq!(out[0], x);
    }

    #[test]
    fn test_dropout_train_mask_is_inverted_and_reused_in_backward() {
        let layer = build(LayerConfig::dropout(Shape3d::vector(64), 0.5));
        let x = Tensor::from_sample(&[1.0; 64]);
        let dy = Tensor::from_sample(&[1.0; 64]);
        let (out, dx, _) = run_backward(&layer, &[&x], &[&dy]);
        let kept = out[0].as_slice().iter().filter(|v| **v != 0.0).count();
        assert!(kept > 0 && kept < 64);
        for (y, g) in out[0].as_slice().iter().zip(dx[0].as_slice()) {
            assert!(*y == 0.0 || *y == 2.0);
            assert_eq!(y, g);
        }
    }

    #[test]
    fn test_dropout_rate_bounds() {
        assert!(LayerConfig::dropout(Shape3d::vector(2), 1.0).shape_for().is_err());
        assert!(LayerConfig::dropout(Shape3d::vector(2), -0.1).shape_for().is_err());
        assert!(LayerConfig::dropout(Shape3d::vector(2), 0.0).shape_for().is_ok());
    }
}
