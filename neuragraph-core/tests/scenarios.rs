mod common;

use neuragraph_core::nn::{CrossEntropyMulticlass, Mse};
use neuragraph_core::optim::{Adagrad, Adam, Optimizer};
use neuragraph_core::{
    ActivationFn, FitOptions, GraphBuilder, LayerConfig, NeuraGraphError, Sequential, Shape3d,
    Tensor,
};

#[test]
fn xor_is_learned_without_held_out_errors() -> Result<(), NeuraGraphError> {
    common::init_logger();
    let mut seq = Sequential::new();
    seq.add(LayerConfig::fully_connected(2, 10))?;
    seq.add_activation(ActivationFn::Tanh)?;
    seq.add(LayerConfig::fully_connected(10, 2))?;
    seq.add_activation(ActivationFn::Tanh)?;
    let mut net = seq.build(common::config(2, 7))?;

    let mut optimizer = Adagrad::default();
    let lr = optimizer.learning_rate();
    optimizer.set_learning_rate(lr * 10.0)?;

    let (train_x, train_labels) = common::xor_samples(300, 1);
    let history = net.train_labels(
        &train_x,
        &train_labels,
        &Mse,
        &mut optimizer,
        &FitOptions::new(10, 50)?,
    )?;
    assert!(history.last() < history.first());

    let (test_x, test_labels) = common::xor_samples(300, 2);
    let result = net.test(&test_x, &test_labels)?;
    assert_eq!(result.num_success, result.num_total, "{:?}", result.confusion_matrix);

    for (a, b) in [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)] {
        let expected = usize::from((a != b) as u8);
        assert_eq!(net.predict_label(&[a, b])?, expected);
    }
    Ok(())
}

#[test]
fn multi_output_network_trains_both_heads() -> Result<(), NeuraGraphError> {
    let v = Shape3d::vector;
    let mut b = GraphBuilder::new();
    let input = b.add_layer(LayerConfig::input(v(2)))?;
    let hidden = b.add_layer(LayerConfig::fully_connected(2, 8))?;
    let hidden_act = b.add_layer(LayerConfig::tanh(v(8)))?;
    let head1 = b.add_layer(LayerConfig::fully_connected(8, 2))?;
    let out1 = b.add_layer(LayerConfig::tanh(v(2)))?;
    let head2 = b.add_layer(LayerConfig::fully_connected(8, 2))?;
    let out2 = b.add_layer(LayerConfig::tanh(v(2)))?;
    b.chain(input, hidden)?;
    b.chain(hidden, hidden_act)?;
    b.chain(hidden_act, head1)?;
    b.chain(head1, out1)?;
    b.chain(hidden_act, head2)?;
    b.chain(head2, out2)?;
    let mut net = b.build(&[input], &[out1, out2], common::config(3, 5))?;

    // one-hot heads: xor on the first, and on the second
    let patterns = [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
    let x = Tensor::from_samples(&patterns)?;
    let t1 = Tensor::from_samples(&[[1.0, 0.0], [0.0, 1.0], [0.0, 1.0], [1.0, 0.0]])?;
    let t2 = Tensor::from_samples(&[[1.0, 0.0], [1.0, 0.0], [1.0, 0.0], [0.0, 1.0]])?;

    let mut optimizer = Adam::new(0.05, 0.9, 0.999)?;
    let first = net.get_loss(&[x.clone()], &[t1.clone(), t2.clone()], &Mse)?;
    for _ in 0..400 {
        net.train_step(&[x.clone()], &[t1.clone(), t2.clone()], &Mse, &mut optimizer)?;
    }
    let last = net.get_loss(&[x.clone()], &[t1.clone(), t2.clone()], &Mse)?;
    assert!(last < first * 0.1, "loss went from {first} to {last}");

    let outputs = net.predict(&[x])?;
    assert_eq!(outputs.len(), 2);
    for s in 0..4 {
        assert_eq!(outputs[0].argmax(s), t1.argmax(s));
        assert_eq!(outputs[1].argmax(s), t2.argmax(s));
    }
    Ok(())
}

#[test]
fn small_convnet_fits_a_batch() -> Result<(), NeuraGraphError> {
    let mut seq = Sequential::new();
    seq.add(LayerConfig::convolution(Shape3d::new(6, 6, 1), 3, 2))?;
    seq.add_activation(ActivationFn::Relu)?;
    seq.add(LayerConfig::max_pooling(Shape3d::new(4, 4, 2), 2))?;
    seq.add(LayerConfig::fully_connected(8, 3))?;
    seq.add_activation(ActivationFn::Softmax)?;
    let mut net = seq.build(common::config(2, 3))?;

    let x = common::random_tensor(6, 36, 17);
    let labels = [0, 1, 2, 0, 1, 2];
    let targets = net.labels_to_targets(&labels)?;
    let mut optimizer = Adam::new(0.02, 0.9, 0.999)?;
    let history = net.fit(&x, &targets, &CrossEntropyMulticlass, &mut optimizer, &FitOptions::new(3, 200)?)?;
    assert!(history[199] < history[0] * 0.5, "{} -> {}", history[0], history[199]);
    Ok(())
}
