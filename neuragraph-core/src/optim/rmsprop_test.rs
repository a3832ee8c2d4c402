use super::*;
use crate::nn::parameter::Parameter;
use crate::types::{ParamKind, Shape3d};
use approx::assert_relative_eq;

#[test]
fn test_rmsprop_first_step() -> Result<(), NeuraGraphError> {
    let id = Parameter::new(ParamKind::Weight, Shape3d::vector(1)).id();
    let mut opt = RmsProp::new(0.01, 0.9)?;
    let mut w = vec![1.0];
    opt.update(id, &[2.0], &mut w)?;
    // G = 0.1 * 4 = 0.4
    let expected = 1.0 - 0.01 * 2.0 / (0.4 as FloatT + 1e-8).sqrt();
    assert_relative_eq!(w[0], expected, epsilon = 1e-6);
    assert_eq!(opt.state().get(id).map(Vec::len), Some(1));
    Ok(())
}

#[test]
fn test_rmsprop_defaults_and_validation() {
    let opt = RmsProp::default();
    assert_relative_eq!(opt.learning_rate(), 1e-4);
    assert!(RmsProp::new(0.01, 1.5).is_err());
    assert!(RmsProp::new(0.0, 0.5).is_err());
    assert!(RmsProp::default().with_epsilon(-1.0).is_err());
}
