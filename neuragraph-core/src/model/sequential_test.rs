use super::*;
use crate::nn::layers::ActivationFn;

fn v(n: usize) -> Shape3d {
    Shape3d::vector(n)
}

#[test]
fn test_input_inserted_automatically() -> Result<(), NeuraGraphError> {
    let mut seq = Sequential::new();
    let fc = seq.add(LayerConfig::fully_connected(4, 2))?;
    assert_eq!(seq.len(), 2);
    assert_eq!(fc.index(), 1);
    assert_eq!(seq.output_shape(), Some(v(2)));

    let net = seq.build(NetworkConfig::default().with_threads(1))?;
    assert_eq!(net.mode(), NetworkMode::Sequential);
    assert_eq!(net.input_shapes(), vec![v(4)]);
    assert!(net.layer(net.inputs()[0])?.is_input());
    assert_eq!(net.forward_order().len(), 2);
    Ok(())
}

#[test]
fn test_explicit_input_and_activation() -> Result<(), NeuraGraphError> {
    let mut seq = Sequential::new();
    seq.add(LayerConfig::input(v(3)))?;
    seq.add_named("hidden", LayerConfig::fully_connected(3, 5))?;
    let act = seq.add_activation(ActivationFn::Tanh)?;
    assert_eq!(seq.len(), 3);
    assert_eq!(seq.layer_id("hidden").map(|id| id.index()), Some(1));
    assert_eq!(act.index(), 2);
    let net = seq.build(NetworkConfig::default().with_threads(1))?;
    assert_eq!(net.output_shapes(), vec![v(5)]);
    Ok(())
}

#[test]
fn test_sequential_order_matches_graph_order() -> Result<(), NeuraGraphError> {
    let seq = Sequential::new()
        .with(LayerConfig::fully_connected(2, 3))?
        .with(LayerConfig::relu(v(3)))?
        .with(LayerConfig::fully_connected(3, 1))?;
    let net = seq.build(NetworkConfig::default().with_threads(1))?;

    let mut b = GraphBuilder::new();
    let ids = [
        b.add_layer(LayerConfig::input(v(2)))?,
        b.add_layer(LayerConfig::fully_connected(2, 3))?,
        b.add_layer(LayerConfig::relu(v(3)))?,
        b.add_layer(LayerConfig::fully_connected(3, 1))?,
    ];
    for pair in ids.windows(2) {
        b.chain(pair[0], pair[1])?;
    }
    let graph = b.build(&[ids[0]], &[ids[3]], NetworkConfig::default().with_threads(1))?;
    assert_eq!(net.forward_order(), graph.forward_order());
    Ok(())
}

#[test]
fn test_shape_mismatch_rejected() -> Result<(), NeuraGraphError> {
    let mut seq = Sequential::new();
    seq.add(LayerConfig::fully_connected(4, 2))?;
    let err = seq.add(LayerConfig::fully_connected(3, 1)).unwrap_err();
    assert!(matches!(err, NeuraGraphError::ConnectionShapeMismatch { .. }));
    assert_eq!(seq.len(), 2);
    Ok(())
}

#[test]
fn test_invalid_sequences() -> Result<(), NeuraGraphError> {
    assert!(Sequential::new().build(NetworkConfig::default()).is_err());
    assert!(Sequential::new().add_activation(ActivationFn::Relu).is_err());

    let mut seq = Sequential::new();
    let err = seq.add(LayerConfig::add(2, v(3))).unwrap_err();
    assert!(matches!(err, NeuraGraphError::InvalidLayerConfig { .. }));

    seq.add(LayerConfig::relu(v(3)))?;
    assert!(seq.add(LayerConfig::input(v(3))).is_err());
    assert!(seq.add_named("x", LayerConfig::relu(v(3))).is_ok());
    assert!(seq.add_named("x", LayerConfig::relu(v(3))).is_err());
    Ok(())
}
