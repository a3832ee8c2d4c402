use crate::nn::config::LayerConfig;
use crate::nn::layers::test_support::{build, run_backward, run_forward};
use crate::tensor::Tensor;
use crate::types::{FloatT, NetPhase, Shape3d};

fn ramp(n: usize) -> Vec<FloatT> {
    (0..n).map(|i| i as FloatT).collect()
}

#[test]
fn test_max_pooling_picks_window_maximum() {
    let layer = build(LayerConfig::max_pooling(Shape3d::new(4, 4, 1), 2));
    assert_eq!(layer.out_shapes(), &[Shape3d::new(2, 2, 1)]);
    let x = Tensor::from_sample(&ramp(16));
    let (out, _) = run_forward(&layer, &[&x], NetPhase::Test);
    assert_eq!(out[0].sample(0), &[5.0, 7.0, 13.0, 15.0]);
}

#[test]
fn test_max_pooling_routes_gradient_to_argmax() {
    let layer = build(LayerConfig::max_pooling(Shape3d::new(2, 2, 2), 2));
    let x = Tensor::from_sample(&[0.1, 0.9, 0.3, 0.2, -1.0, -2.0, -0.5, -3.0]);
    let dy = Tensor::from_sample(&[1.0, 2.0]);
    let (out, dx, params) = run_backward(&layer, &[&x], &[&dy]);
    assert_eq!(out[0].sample(0), &[0.9, -0.5]);
    assert_eq!(dx[0].sample(0), &[0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 2.0, 0.0]);
    assert!(params.is_empty());
}

#[test]
fn test_average_pooling_forward_and_backward() {
    let layer = build(LayerConfig::average_pooling(Shape3d::new(2, 2, 1), 2));
    let x = Tensor::from_sample(&[1.0, 2.0, 3.0, 6.0]);
    let dy = Tensor::from_sample(&[4.0]);
    let (out, dx, _) = run_backward(&layer, &[&x], &[&dy]);
    assert_eq!(out[0].sample(0), &[3.0]);
    assert_eq!(dx[0].sample(0), &[1.0, 1.0, 1.0, 1.0]);
}

#[test]
fn test_overlapping_windows_accumulate() {
    let layer = build(LayerConfig::AveragePooling {
        input: Shape3d::new(3, 1, 1),
        pool_size: 1,
        stride: 1,
    });
    assert_eq!(layer.out_shapes(), &[Shape3d::new(3, 1, 1)]);

    let overlapping = LayerConfig::MaxPooling {
        input: Shape3d::new(3, 3, 1),
        pool_size: 2,
        stride: 1,
    }
    .build()
    .unwrap();
    let x = Tensor::from_sample(&[0.0, 0.0, 0.0, 0.0, 9.0, 0.0, 0.0, 0.0, 0.0]);
    let dy = Tensor::from_sample(&[1.0; 4]);
    let (_, dx, _) = run_backward(&overlapping, &[&x], &[&dy]);
    // the centre is the maximum of all four windows
    assert_eq!(dx[0].sample(0)[4], 4.0);
}

#[test]
fn test_pooling_rejects_non_tiling_window() {
    assert!(LayerConfig::max_pooling(Shape3d::new(5, 4, 1), 2).shape_for().is_err());
    assert!(LayerConfig::average_pooling(Shape3d::new(1, 1, 1), 2).shape_for().is_err());
}

#[test]
fn test_global_average_pooling() {
    let layer = build(LayerConfig::GlobalAveragePooling {
        input: Shape3d::new(2, 1, 2),
    });
    let x = Tensor::from_sample(&[1.0, 3.0, 10.0, 20.0]);
    let dy = Tensor::from_sample(&[2.0, 4.0]);
    let (out, dx, _) = run_backward(&layer, &[&x], &[&dy]);
    assert_eq!(out[0].sample(0), &[2.0, 15.0]);
    assert_eq!(dx[0].sample(0), &[1.0, 1.0, 2.0, 2.0]);
}
