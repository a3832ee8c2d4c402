use super::*;
use crate::nn::parameter::Parameter;
use crate::types::{ParamKind, Shape3d};
use approx::assert_relative_eq;

fn new_id() -> ParamId {
    Parameter::new(ParamKind::Weight, Shape3d::vector(1)).id()
}

#[test]
fn test_adam_first_step_moves_by_lr() -> Result<(), NeuraGraphError> {
    let mut opt = Adam::new(0.1, 0.9, 0.999)?;
    let id = new_id();
    let mut w = vec![10.0, 10.0];
    opt.update(id, &[1.0, -3.0], &mut w)?;
    // Bias-corrected moments equal g and g^2 on the first step.
    assert_relative_eq!(w[0], 9.9, epsilon = 1e-6);
    assert_relative_eq!(w[1], 10.1, epsilon = 1e-6);
    assert_eq!(opt.state().get(id).map(|s| s.step), Some(1));
    Ok(())
}

#[test]
fn test_adam_step_counts_are_per_parameter() -> Result<(), NeuraGraphError> {
    let mut opt = Adam::default();
    let (a, b) = (new_id(), new_id());
    for _ in 0..3 {
        opt.update(a, &[0.5], &mut [1.0])?;
    }
    opt.update(b, &[0.5], &mut [1.0])?;
    assert_eq!(opt.state().get(a).map(|s| s.step), Some(3));
    assert_eq!(opt.state().get(b).map(|s| s.step), Some(1));

    opt.reset();
    assert!(opt.state().is_empty());
    Ok(())
}

#[test]
fn test_adam_converges_on_quadratic() -> Result<(), NeuraGraphError> {
    // minimise (w - 3)^2
    let mut opt = Adam::new(0.1, 0.9, 0.999)?;
    let id = new_id();
    let mut w = vec![0.0];
    for _ in 0..1000 {
        let g = 2.0 * (w[0] - 3.0);
        opt.update(id, &[g], &mut w)?;
    }
    assert!((w[0] - 3.0).abs() < 0.05, "w = {}", w[0]);
    Ok(())
}

#[test]
fn test_adam_invalid_hyper_parameters() {
    assert!(matches!(
        Adam::new(-0.001, 0.9, 0.999),
        Err(NeuraGraphError::ConfigurationError(_))
    ));
    assert!(Adam::new(0.001, 1.0, 0.999).is_err());
    assert!(Adam::new(0.001, 0.9, -0.1).is_err());
    assert!(Adam::default().with_epsilon(0.0).is_err());
}
