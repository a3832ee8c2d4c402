use super::*;
use crate::nn::config::LayerConfig;
use crate::nn::layers::test_support::{build, run_backward, run_forward};
use approx::assert_relative_eq;

#[test]
fn test_relu_clamps_negatives() {
    let layer = build(LayerConfig::relu(Shape3d::vector(4)));
    let x = Tensor::from_sample(&[1.0, -2.0, 0.0, 3.5]);
    let dy = Tensor::from_sample(&[1.0, 1.0, 1.0, 1.0]);
    let (out, dx, _) = run_backward(&layer, &[&x], &[&dy]);
    assert_eq!(out[0].sample(0), &[1.0, 0.0, 0.0, 3.5]);
    assert_eq!(dx[0].sample(0), &[1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn test_softmax_sums_to_one_and_is_shift_invariant() {
    let layer = build(LayerConfig::softmax(Shape3d::vector(3)));
    let x = Tensor::from_samples(&[[1.0, 2.0, 3.0], [1001.0, 1002.0, 1003.0]]).unwrap();
    let (out, _) = run_forward(&layer, &[&x], NetPhase::Test);
    let total: FloatT = out[0].sample(0).iter().sum();
    assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    for (a, b) in out[0].sample(0).iter().zip(out[0].sample(1)) {
        assert_relative_eq!(*a, *b, epsilon = 1e-12);
    }
}

#[test]
fn test_softmax_backward_of_uniform_gradient_is_zero() {
    let layer = build(LayerConfig::softmax(Shape3d::vector(3)));
    let x = Tensor::from_sample(&[0.3, -0.2, 1.1]);
    let dy = Tensor::from_sample(&[1.0, 1.0, 1.0]);
    let (_, dx, _) = run_backward(&layer, &[&x], &[&dy]);
    for v in dx[0].sample(0) {
        assert_relative_eq!(*v, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn test_elementwise_derivatives_match_finite_differences() {
    let functions = [
        ActivationFn::Identity,
        ActivationFn::LeakyRelu { alpha: 0.1 },
        ActivationFn::Sigmoid,
        ActivationFn::Tanh,
        ActivationFn::Softplus,
        ActivationFn::Elu { alpha: 1.0 },
    ];
    let eps = 1e-6;
    for f in functions {
        for x in [-1.3, -0.2, 0.4, 2.0] {
            let y = f.apply(x);
            let numeric = (f.apply(x + eps) - f.apply(x - eps)) / (2.0 * eps);
            assert_relative_eq!(f.derivative(x, y), numeric, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_softplus_is_stable_for_large_inputs() {
    assert_relative_eq!(softplus(800.0 as FloatT), 800.0, epsilon = 1e-9);
    assert!(softplus(-800.0 as FloatT) >= 0.0);
}

#[test]
fn test_non_finite_alpha_is_rejected() {
    let config = LayerConfig::activation(
        Shape3d::vector(2),
        ActivationFn::LeakyRelu {
            alpha: FloatT::NAN,
        },
    );
    assert!(config.shape_for().is_err());
}

#[test]
fn test_target_ranges() {
    assert_eq!(ActivationFn::Tanh.target_range(), (-0.8, 0.8));
    assert_eq!(ActivationFn::Softmax.target_range(), (0.0, 1.0));
    assert_eq!(ActivationFn::Sigmoid.target_range(), (0.1, 0.9));
}
