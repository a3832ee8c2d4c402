use super::*;
use crate::nn::config::LayerConfig;
use crate::nn::layers::test_support::{build, run_backward, run_forward};

fn conv_config(input: Shape3d, kernel: usize, out_c: usize, stride: usize, padding: Padding) -> LayerConfig {
    LayerConfig::Convolution {
        input,
        kernel_width: kernel,
        kernel_height: kernel,
        out_channels: out_c,
        stride,
        padding,
        has_bias: true,
    }
}

#[test]
fn test_valid_and_same_output_shapes() -> Result<(), NeuraGraphError> {
    let valid = conv_config(Shape3d::new(5, 5, 2), 3, 4, 1, Padding::Valid).shape_for()?;
    assert_eq!(valid.outputs, vec![Shape3d::new(3, 3, 4)]);

    let strided = conv_config(Shape3d::new(7, 5, 1), 3, 1, 2, Padding::Valid).shape_for()?;
    assert_eq!(strided.outputs, vec![Shape3d::new(3, 2, 1)]);

    let same = conv_config(Shape3d::new(5, 4, 1), 3, 2, 2, Padding::Same).shape_for()?;
    assert_eq!(same.outputs, vec![Shape3d::new(3, 2, 2)]);
    Ok(())
}

#[test]
fn test_inconsistent_configurations_are_rejected() {
    let too_big = conv_config(Shape3d::new(2, 2, 1), 3, 1, 1, Padding::Valid).shape_for();
    assert!(matches!(too_big, Err(NeuraGraphError::InvalidLayerConfig { .. })));

    let bad_stride = conv_config(Shape3d::new(6, 6, 1), 3, 1, 2, Padding::Valid).shape_for();
    assert!(bad_stride.is_err());

    let zero_stride = conv_config(Shape3d::new(6, 6, 1), 3, 1, 0, Padding::Same).shape_for();
    assert!(zero_stride.is_err());
}

#[test]
fn test_convolution_forward_known_values() {
    // 3x3 single channel input, 2x2 kernel of ones, bias 1
    let mut layer = build(conv_config(Shape3d::new(3, 3, 1), 2, 1, 1, Padding::Valid));
    layer.parameters_mut()[0].value_mut().fill(1.0);
    layer.parameters_mut()[1].value_mut().fill(1.0);
    let x = Tensor::from_sample(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    let (out, _) = run_forward(&layer, &[&x], NetPhase::Test);
    assert_eq!(out[0].sample(0), &[13.0, 17.0, 25.0, 29.0]);
}

#[test]
fn test_same_padding_keeps_extent() {
    let mut layer = build(conv_config(Shape3d::new(3, 3, 1), 3, 1, 1, Padding::Same));
    layer.parameters_mut()[0].value_mut().fill(1.0);
    let x = Tensor::from_sample(&[1.0; 9]);
    let (out, _) = run_forward(&layer, &[&x], NetPhase::Test);
    // corners see 4 inputs, edges 6, centre 9
    assert_eq!(
        out[0].sample(0),
        &[4.0, 6.0, 4.0, 6.0, 9.0, 6.0, 4.0, 6.0, 4.0]
    );
}

#[test]
fn test_convolution_backward_accumulates_bias_and_input_grads() {
    let mut layer = build(conv_config(Shape3d::new(3, 3, 1), 2, 1, 1, Padding::Valid));
    layer.parameters_mut()[0].value_mut().fill(1.0);
    let x = Tensor::from_sample(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    let dy = Tensor::from_sample(&[1.0; 4]);
    let (_, dx, dparams) = run_backward(&layer, &[&x], &[&dy]);
    // each input counted once per window covering it
    assert_eq!(dx[0].sample(0), &[1.0, 2.0, 1.0, 2.0, 4.0, 2.0, 1.0, 2.0, 1.0]);
    // dW[ky][kx] = sum of the inputs under that tap
    assert_eq!(dparams[0], vec![12.0, 16.0, 24.0, 28.0]);
    assert_eq!(dparams[1], vec![4.0]);
}

#[test]
fn test_fan_sizes_follow_kernel() {
    let layer = build(conv_config(Shape3d::new(5, 5, 3), 3, 4, 1, Padding::Valid));
    assert_eq!(layer.op().fan_in_size(), 27);
    assert_eq!(layer.op().fan_out_size(), 36);
    assert_eq!(layer.parameters()[0].len(), 3 * 3 * 3 * 4);
}
