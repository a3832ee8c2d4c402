use super::*;
use crate::graph::GraphBuilder;
use crate::nn::losses::{CrossEntropyMulticlass, Mse};
use crate::types::Shape3d;

fn v(n: usize) -> Shape3d {
    Shape3d::vector(n)
}

fn dense_tanh_net(seed: u64) -> Network {
    let mut b = GraphBuilder::new();
    let input = b.add_layer(LayerConfig::input(v(3))).unwrap();
    let fc1 = b.add_layer(LayerConfig::fully_connected(3, 4)).unwrap();
    let act = b.add_layer(LayerConfig::tanh(v(4))).unwrap();
    let fc2 = b.add_layer(LayerConfig::fully_connected(4, 2)).unwrap();
    let out = b.add_layer(LayerConfig::softmax(v(2))).unwrap();
    b.chain(input, fc1).unwrap();
    b.chain(fc1, act).unwrap();
    b.chain(act, fc2).unwrap();
    b.chain(fc2, out).unwrap();
    b.build(
        &[input],
        &[out],
        NetworkConfig::default()
            .with_threads(2)
            .with_seed(seed)
            .with_bias_init(crate::nn::WeightInit::gaussian(0.3)),
    )
    .unwrap()
}

fn batch() -> (Tensor, Tensor) {
    let x = Tensor::from_samples(&[[0.3, -0.7, 0.5], [-0.2, 0.9, 0.1], [0.8, 0.4, -0.6]]).unwrap();
    let t = Tensor::from_samples(&[[1.0, 0.0], [0.0, 1.0], [1.0, 0.0]]).unwrap();
    (x, t)
}

/// Mse with a gradient deliberately off by a factor of two.
#[derive(Debug)]
struct DoubledGradient;

impl Loss for DoubledGradient {
    fn loss(&self, y: &[FloatT], t: &[FloatT]) -> FloatT {
        Mse.loss(y, t)
    }

    fn gradient_into(&self, y: &[FloatT], t: &[FloatT], grad: &mut [FloatT]) {
        Mse.gradient_into(y, t, grad);
        grad.iter_mut().for_each(|g| *g *= 2.0);
    }
}

#[test]
fn test_dense_network_passes_full_check() -> Result<(), GradCheckError> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut net = dense_tanh_net(7);
    let (x, t) = batch();
    let report = GradientChecker::default()
        .with_inputs(true)
        .check_network(&mut net, &[x], &[t], &CrossEntropyMulticlass)?;
    // 3*4 + 4 + 4*2 + 2 parameter elements, 9 input elements.
    assert_eq!(report.len(), 26 + 9);
    assert!(report.passed(), "max difference {}", report.max_difference());
    assert_eq!(report.failures().count(), 0);
    Ok(())
}

#[test]
fn test_wrong_gradient_is_reported_not_raised() -> Result<(), GradCheckError> {
    let mut net = dense_tanh_net(3);
    let (x, t) = batch();
    let report = GradientChecker::default().check_network(&mut net, &[x], &[t], &DoubledGradient)?;
    assert!(!report.passed());
    let failure = report.failures().next().unwrap();
    assert!(failure.difference > report.tolerance());
    assert!(report.max_difference() >= failure.difference);
    Ok(())
}

#[test]
fn test_parameters_restored_and_gradients_cleared() -> Result<(), GradCheckError> {
    let mut net = dense_tanh_net(11);
    let before: Vec<Vec<FloatT>> = net.parameters().map(|(_, p)| p.value().to_vec()).collect();
    let (x, t) = batch();
    GradientChecker::default().check_network(&mut net, &[x], &[t], &Mse)?;
    let after: Vec<Vec<FloatT>> = net.parameters().map(|(_, p)| p.value().to_vec()).collect();
    assert_eq!(before, after);
    assert!(net.parameters().all(|(_, p)| p.grad().iter().all(|g| *g == 0.0)));
    Ok(())
}

#[test]
fn test_random_mode_is_reproducible() -> Result<(), GradCheckError> {
    let (x, t) = batch();
    let mode = CheckMode::Random {
        samples_per_tensor: 3,
        seed: 42,
    };
    let checker = GradientChecker::default().with_mode(mode);
    let targets = |report: &GradCheckReport| -> Vec<CheckTarget> {
        report.entries().iter().map(|e| e.target).collect()
    };

    let mut net = dense_tanh_net(5);
    let first = checker.check_network(&mut net, &[x.clone()], &[t.clone()], &Mse)?;
    let second = checker.check_network(&mut net, &[x.clone()], &[t.clone()], &Mse)?;
    assert_eq!(targets(&first), targets(&second));
    // Two bias vectors of length 4 and 2 clamp to their size: 3 + 3 + 3 + 2.
    assert_eq!(first.len(), 11);
    assert!(first.passed());

    let other = GradientChecker::default().with_mode(CheckMode::Random {
        samples_per_tensor: 3,
        seed: 43,
    });
    let third = other.check_network(&mut net, &[x], &[t], &Mse)?;
    assert_eq!(third.len(), 11);
    Ok(())
}

#[test]
fn test_no_targets_is_an_error() {
    let mut b = GraphBuilder::new();
    let input = b.add_layer(LayerConfig::input(v(2))).unwrap();
    let act = b.add_layer(LayerConfig::tanh(v(2))).unwrap();
    b.chain(input, act).unwrap();
    let mut net = b.build(&[input], &[act], NetworkConfig::default().with_threads(1)).unwrap();
    let x = Tensor::from_sample(&[0.1, 0.2]);
    let t = Tensor::from_sample(&[0.0, 1.0]);
    let err = GradientChecker::default()
        .check_network(&mut net, &[x], &[t], &Mse)
        .unwrap_err();
    assert_eq!(err, GradCheckError::NoTargets);
}

#[test]
fn test_execution_errors_propagate() {
    let mut net = dense_tanh_net(1);
    let x = Tensor::from_sample(&[0.1, 0.2]);
    let t = Tensor::from_sample(&[0.0, 1.0]);
    let err = GradientChecker::default()
        .check_network(&mut net, &[x], &[t], &Mse)
        .unwrap_err();
    assert!(matches!(err, GradCheckError::Network(NeuraGraphError::DataMismatch { .. })));
}

#[test]
fn test_invalid_settings() {
    assert!(matches!(
        GradientChecker::new(0.0, 1e-4),
        Err(GradCheckError::InvalidSettings(_))
    ));
    assert!(GradientChecker::new(1e-4, -1.0).is_err());
    let checker = GradientChecker::new(1e-3, 1e-3).unwrap();
    assert_eq!(checker.epsilon(), 1e-3);
    assert_eq!(checker.mode(), CheckMode::All);
}

#[test]
fn test_check_layer_fully_connected() -> Result<(), GradCheckError> {
    let x = Tensor::from_samples(&[[0.5, -1.0, 2.0], [1.5, 0.25, -0.75]])?;
    let report = GradientChecker::default().check_layer(&LayerConfig::fully_connected(3, 2), &[x], 9)?;
    // weights 6 + bias 2 + inputs 6
    assert_eq!(report.len(), 14);
    assert!(report.passed(), "max difference {}", report.max_difference());
    let inputs = report
        .entries()
        .iter()
        .filter(|e| matches!(e.target, CheckTarget::Input { .. }))
        .count();
    assert_eq!(inputs, 6);
    Ok(())
}
