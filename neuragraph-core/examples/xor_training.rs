//! Trains a two-layer perceptron on XOR and reports held-out accuracy.
//!
//! `RUST_LOG=info cargo run --example xor_training`

use neuragraph_core::nn::Mse;
use neuragraph_core::optim::Adagrad;
use neuragraph_core::{
    ActivationFn, FitOptions, FloatT, LayerConfig, NeuraGraphError, NetworkConfig, Sequential,
    Shape3d, Tensor,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn xor_samples(count: usize, rng: &mut StdRng) -> Result<(Tensor, Vec<usize>), NeuraGraphError> {
    let mut data = Vec::with_capacity(count * 2);
    let mut labels = Vec::with_capacity(count);
    for _ in 0..count {
        let (a, b): (bool, bool) = (rng.gen(), rng.gen());
        data.extend([FloatT::from(u8::from(a)), FloatT::from(u8::from(b))]);
        labels.push(usize::from(a ^ b));
    }
    Ok((Tensor::from_vec(data, count, 2)?, labels))
}

fn main() -> Result<(), NeuraGraphError> {
    env_logger::init();
    let mut rng = StdRng::seed_from_u64(2024);

    let mut net = Sequential::new()
        .with(LayerConfig::fully_connected(2, 10))?
        .with(LayerConfig::tanh(Shape3d::vector(10)))?
        .with(LayerConfig::fully_connected(10, 2))?
        .with(LayerConfig::activation(Shape3d::vector(2), ActivationFn::Tanh))?
        .build(NetworkConfig::default().with_seed(7))?;
    println!(
        "network: {} layers, {} parameters, {} worker threads",
        net.layer_count(),
        net.parameter_count(),
        net.threads()
    );

    let (train_x, train_labels) = xor_samples(300, &mut rng)?;
    let mut optimizer = Adagrad::new(0.1)?;
    let history = net.train_labels(&train_x, &train_labels, &Mse, &mut optimizer, &FitOptions::new(10, 50)?)?;
    if let (Some(first), Some(last)) = (history.first(), history.last()) {
        println!("mean loss: {first:.4} -> {last:.4}");
    }

    let (test_x, test_labels) = xor_samples(300, &mut rng)?;
    let result = net.test(&test_x, &test_labels)?;
    println!(
        "held-out accuracy: {}/{} ({:.1}%)",
        result.num_success,
        result.num_total,
        100.0 * result.accuracy()
    );
    println!("confusion matrix [predicted][actual]: {:?}", result.confusion_matrix);
    Ok(())
}
