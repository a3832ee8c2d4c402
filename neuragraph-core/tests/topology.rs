mod common;

use neuragraph_core::{
    ActivationFn, GraphBuilder, LayerConfig, LayerId, NeuraGraphError, Network, Shape3d, Tensor,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Checks that every layer appears once and after the producers of its inputs.
fn assert_producers_first(net: &Network) {
    let order = net.forward_order();
    assert_eq!(order.len(), net.layer_count());
    let position: HashMap<LayerId, usize> = order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    assert_eq!(position.len(), order.len());
    for (i, id) in order.iter().enumerate() {
        for edge in net.node(*id).unwrap().input_edges() {
            let edge = edge.expect("built networks have every slot connected");
            let producer = net.edge(edge).unwrap().producer().layer;
            assert!(position[&producer] < i, "{producer:?} must run before {id:?}");
        }
    }
    let mut reversed = order.to_vec();
    reversed.reverse();
    assert_eq!(net.backward_order(), reversed);
}

#[test]
fn random_dags_are_ordered_and_evaluated() -> Result<(), NeuraGraphError> {
    common::init_logger();
    let shape = Shape3d::vector(2);
    for seed in 0..20u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = rng.gen_range(3..12);
        // logical node i > 0 adds one or two earlier nodes; node 0 is the input
        let preds: Vec<Vec<usize>> = (0..n)
            .map(|i| {
                if i == 0 {
                    return Vec::new();
                }
                let k = rng.gen_range(1..=2.min(i));
                (0..k).map(|_| rng.gen_range(0..i)).collect()
            })
            .collect();

        // insert layers into the builder in a shuffled order
        let mut insertion: Vec<usize> = (0..n).collect();
        insertion.shuffle(&mut rng);
        let mut b = GraphBuilder::new();
        let mut ids = vec![None; n];
        for &i in &insertion {
            let config = if i == 0 {
                LayerConfig::input(shape)
            } else {
                LayerConfig::add(preds[i].len(), shape)
            };
            ids[i] = Some(b.add_layer(config)?);
        }
        let ids: Vec<LayerId> = ids.into_iter().flatten().collect();
        let mut consumed = vec![false; n];
        for i in 1..n {
            for (slot, &p) in preds[i].iter().enumerate() {
                let edge = b.output_edge(ids[p], 0)?;
                b.connect(edge, ids[i], slot)?;
                consumed[p] = true;
            }
        }
        let sinks: Vec<usize> = (1..n).filter(|&i| !consumed[i]).collect();
        let outputs: Vec<LayerId> = sinks.iter().map(|&i| ids[i]).collect();
        let mut net = b.build(&[ids[0]], &outputs, common::config(1, seed))?;
        assert_producers_first(&net);

        // with an all-ones input every node holds its number of paths from the input
        let mut paths = vec![0.0; n];
        paths[0] = 1.0;
        for i in 1..n {
            paths[i] = preds[i].iter().map(|&p| paths[p]).sum();
        }
        let result = net.predict(&[Tensor::from_sample(&[1.0, 1.0])])?;
        for (out, &i) in result.iter().zip(&sinks) {
            assert_eq!(out.sample(0), &[paths[i], paths[i]][..], "seed {seed}, node {i}");
        }
    }
    Ok(())
}

#[test]
fn slice_and_concat_restore_the_input() -> Result<(), NeuraGraphError> {
    let mut b = GraphBuilder::new();
    let input = b.add_layer(LayerConfig::input(Shape3d::new(1, 2, 4)))?;
    let slice = b.add_layer(LayerConfig::slice(Shape3d::new(1, 2, 4), 2))?;
    let left = b.add_layer(LayerConfig::activation(Shape3d::new(1, 2, 2), ActivationFn::Identity))?;
    let right = b.add_layer(LayerConfig::activation(Shape3d::new(1, 2, 2), ActivationFn::Identity))?;
    let part = Shape3d::new(1, 2, 2);
    let concat = b.add_layer(LayerConfig::concat(vec![part, part]))?;
    b.chain(input, slice)?;
    b.connect(b.output_edge(slice, 0)?, left, 0)?;
    b.connect(b.output_edge(slice, 1)?, right, 0)?;
    b.connect(b.output_edge(left, 0)?, concat, 0)?;
    b.connect(b.output_edge(right, 0)?, concat, 1)?;
    let mut net = b.build(&[input], &[concat], common::config(2, 0))?;
    assert_producers_first(&net);
    assert_eq!(net.forward_order()[0], input);
    assert_eq!(net.forward_order()[4], concat);

    let x = common::random_tensor(5, 8, 3);
    let y = net.predict(&[x.clone()])?;
    assert_eq!(y[0], x);
    Ok(())
}

#[test]
fn cycles_are_rejected_at_build() -> Result<(), NeuraGraphError> {
    let shape = Shape3d::vector(3);
    let mut b = GraphBuilder::new();
    let input = b.add_layer(LayerConfig::input(shape))?;
    let merge = b.add_layer(LayerConfig::add(2, shape))?;
    let act = b.add_layer(LayerConfig::tanh(shape))?;
    let out = b.add_layer(LayerConfig::relu(shape))?;
    b.connect(b.output_edge(input, 0)?, merge, 0)?;
    b.chain(merge, act)?;
    b.connect(b.output_edge(act, 0)?, merge, 1)?;
    b.chain(act, out)?;

    match b.build(&[input], &[out], common::config(1, 0)) {
        Err(NeuraGraphError::CycleDetected { layers }) => {
            assert_eq!(layers, vec![merge.index(), act.index(), out.index()]);
        }
        other => panic!("expected a cycle error, got {other:?}"),
    }
    Ok(())
}
