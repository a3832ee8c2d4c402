use super::*;
use crate::nn::parameter::Parameter;
use crate::types::{ParamKind, Shape3d};
use approx::assert_relative_eq;

fn param_id() -> ParamId {
    Parameter::new(ParamKind::Weight, Shape3d::vector(1)).id()
}

#[test]
fn test_gradient_descent_step() -> Result<(), NeuraGraphError> {
    let mut opt = GradientDescent::new(0.1)?;
    let mut w = vec![1.0, -2.0];
    opt.update(param_id(), &[0.5, -1.0], &mut w)?;
    assert_relative_eq!(w[0], 0.95, epsilon = 1e-12);
    assert_relative_eq!(w[1], -1.9, epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_gradient_descent_weight_decay() -> Result<(), NeuraGraphError> {
    let mut opt = GradientDescent::new(0.1)?.with_weight_decay(0.5)?;
    let mut w = vec![2.0];
    opt.update(param_id(), &[0.0], &mut w)?;
    // 2 - 0.1 * (0 + 0.5 * 2)
    assert_relative_eq!(w[0], 1.9, epsilon = 1e-12);
    assert_relative_eq!(opt.weight_decay(), 0.5);
    Ok(())
}

#[test]
fn test_momentum_accumulates_velocity() -> Result<(), NeuraGraphError> {
    let mut opt = Momentum::new(0.1, 0.9)?;
    let id = param_id();
    let mut w = vec![0.0];
    opt.update(id, &[1.0], &mut w)?;
    assert_relative_eq!(w[0], -0.1, epsilon = 1e-12);
    opt.update(id, &[1.0], &mut w)?;
    // V = 0.9 * -0.1 - 0.1 = -0.19
    assert_relative_eq!(w[0], -0.29, epsilon = 1e-12);
    assert_eq!(opt.state().len(), 1);

    opt.reset();
    assert!(opt.state().is_empty());
    opt.update(id, &[1.0], &mut w)?;
    assert_relative_eq!(w[0], -0.39, epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_momentum_state_is_per_parameter() -> Result<(), NeuraGraphError> {
    let mut opt = Momentum::default();
    let (a, b) = (param_id(), param_id());
    let mut wa = vec![0.0];
    let mut wb = vec![0.0, 0.0];
    opt.update(a, &[1.0], &mut wa)?;
    opt.update(b, &[1.0, 1.0], &mut wb)?;
    opt.update(a, &[0.0], &mut wa)?;
    assert_relative_eq!(wa[0], -0.01 - 0.009, epsilon = 1e-12);
    assert_relative_eq!(wb[1], -0.01, epsilon = 1e-12);

    let err = opt.update(a, &[1.0, 2.0], &mut [0.0, 0.0]).unwrap_err();
    assert!(matches!(err, NeuraGraphError::DataMismatch { .. }));
    Ok(())
}

#[test]
fn test_invalid_hyper_parameters() {
    assert!(GradientDescent::new(0.0).unwrap_err().is_configuration());
    assert!(GradientDescent::new(FloatT::NAN).is_err());
    assert!(GradientDescent::default().with_weight_decay(-1.0).is_err());
    assert!(Momentum::new(0.1, 1.0).is_err());
    assert!(Momentum::new(-0.1, 0.5).is_err());
}

#[test]
fn test_length_mismatch_rejected() {
    let mut opt = GradientDescent::default();
    let mut w = vec![0.0; 3];
    assert!(opt.update(param_id(), &[1.0], &mut w).is_err());
}

#[test]
fn test_set_learning_rate() -> Result<(), NeuraGraphError> {
    let mut opt = GradientDescent::default();
    assert_relative_eq!(opt.learning_rate(), 0.01);
    opt.set_learning_rate(0.5)?;
    assert_relative_eq!(opt.learning_rate(), 0.5);
    assert!(opt.set_learning_rate(0.0).is_err());
    Ok(())
}
