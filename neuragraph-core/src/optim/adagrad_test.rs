use super::*;
use crate::nn::parameter::Parameter;
use crate::types::{ParamKind, Shape3d};
use approx::assert_relative_eq;

#[test]
fn test_adagrad_first_steps() -> Result<(), NeuraGraphError> {
    let id = Parameter::new(ParamKind::Weight, Shape3d::vector(2)).id();
    let mut opt = Adagrad::new(0.1)?;
    let mut w = vec![1.0, 1.0];

    opt.update(id, &[2.0, -0.5], &mut w)?;
    // First step moves every element by lr * sign(g).
    assert_relative_eq!(w[0], 0.9, epsilon = 1e-6);
    assert_relative_eq!(w[1], 1.1, epsilon = 1e-6);

    opt.update(id, &[2.0, 0.0], &mut w)?;
    // G = 8, step = 0.1 * 2 / sqrt(8)
    assert_relative_eq!(w[0], 0.9 - 0.2 / (8.0 as FloatT).sqrt(), epsilon = 1e-6);
    assert_relative_eq!(w[1], 1.1, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_adagrad_step_shrinks_over_time() -> Result<(), NeuraGraphError> {
    let id = Parameter::new(ParamKind::Weight, Shape3d::vector(1)).id();
    let mut opt = Adagrad::default();
    let mut w = vec![0.0];
    let mut previous = FloatT::MAX;
    for _ in 0..5 {
        let before = w[0];
        opt.update(id, &[1.0], &mut w)?;
        let step = before - w[0];
        assert!(step > 0.0 && step < previous);
        previous = step;
    }
    Ok(())
}

#[test]
fn test_adagrad_reset_and_validation() -> Result<(), NeuraGraphError> {
    let id = Parameter::new(ParamKind::Weight, Shape3d::vector(1)).id();
    let mut opt = Adagrad::default();
    opt.update(id, &[1.0], &mut [0.0])?;
    assert_eq!(opt.state().len(), 1);
    opt.reset();
    assert!(opt.state().is_empty());

    assert!(Adagrad::new(-1.0).is_err());
    assert!(Adagrad::default().with_epsilon(0.0).is_err());
    Ok(())
}
