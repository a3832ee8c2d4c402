//! Builds a residual-style graph by hand, checks its gradients, trains it
//! briefly and round-trips it through the JSON model format.

use neuragraph_core::nn::Mse;
use neuragraph_core::optim::Momentum;
use neuragraph_core::serialization::{load_model, save_model};
use neuragraph_core::{
    GradientChecker, GraphBuilder, LayerConfig, NetworkConfig, Shape3d, Tensor,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let v = Shape3d::vector;

    // input -> fc -> tanh -+-> add -> fc -> out
    //   \------------------/
    let mut b = GraphBuilder::new();
    let input = b.add_layer(LayerConfig::input(v(4)))?;
    let fc = b.add_layer(LayerConfig::fully_connected(4, 4))?;
    let act = b.add_layer(LayerConfig::tanh(v(4)))?;
    let add = b.add_layer(LayerConfig::add(2, v(4)))?;
    let head = b.add_layer(LayerConfig::fully_connected(4, 2))?;
    b.chain(input, fc)?;
    b.chain(fc, act)?;
    b.chain(act, add)?;
    let skip = b.output_edge(input, 0)?;
    b.connect(skip, add, 1)?;
    b.chain(add, head)?;
    let config = NetworkConfig::default().with_threads(2).with_seed(3);
    let mut net = b.build(&[input], &[head], config.clone())?;
    println!("forward order: {:?}", net.forward_order());

    let x = Tensor::from_samples(&[
        [0.1, -0.4, 0.3, 0.9],
        [-0.7, 0.2, 0.5, -0.1],
        [0.6, 0.6, -0.3, 0.0],
    ])?;
    let t = Tensor::from_samples(&[[1.0, 0.0], [0.0, 1.0], [0.5, 0.5]])?;

    let report = GradientChecker::default()
        .with_inputs(true)
        .check_network(&mut net, &[x.clone()], &[t.clone()], &Mse)?;
    println!(
        "gradient check: {} entries, passed: {}, max difference {:e}",
        report.len(),
        report.passed(),
        report.max_difference()
    );

    let mut optimizer = Momentum::default();
    for step in 0..200 {
        let loss = net.train_step(&[x.clone()], &[t.clone()], &Mse, &mut optimizer)?;
        if step % 50 == 0 {
            println!("step {step}: loss {loss:.5}");
        }
    }

    let mut stored = Vec::new();
    save_model(&net, &mut stored)?;
    let mut restored = load_model(stored.as_slice(), config)?;
    println!(
        "model document: {} bytes, restored weights identical: {}",
        stored.len(),
        restored.has_same_weights(&net, 0.0)
    );
    println!("restored prediction: {:?}", restored.predict(&[x])?[0].to_samples());
    Ok(())
}
