use super::*;
use crate::nn::layers::ActivationFn;

fn catalogue() -> Vec<LayerConfig> {
    vec![
        LayerConfig::input(Shape3d::new(4, 4, 2)),
        LayerConfig::fully_connected(8, 3),
        LayerConfig::quantized_fully_connected(8, 3),
        LayerConfig::convolution(Shape3d::new(5, 5, 2), 3, 4),
        LayerConfig::Convolution {
            input: Shape3d::new(6, 6, 1),
            kernel_width: 3,
            kernel_height: 2,
            out_channels: 2,
            stride: 2,
            padding: Padding::Same,
            has_bias: false,
        },
        LayerConfig::max_pooling(Shape3d::new(4, 4, 3), 2),
        LayerConfig::average_pooling(Shape3d::new(4, 2, 1), 2),
        LayerConfig::GlobalAveragePooling {
            input: Shape3d::new(3, 3, 2),
        },
        LayerConfig::activation(Shape3d::vector(5), ActivationFn::Elu { alpha: 1.0 }),
        LayerConfig::dropout(Shape3d::vector(5), 0.3),
        LayerConfig::add(3, Shape3d::new(2, 2, 1)),
        LayerConfig::concat(vec![Shape3d::new(2, 2, 1), Shape3d::new(2, 2, 3)]),
        LayerConfig::slice(Shape3d::new(2, 2, 4), 2),
        LayerConfig::power(Shape3d::vector(3), 2.0, 0.5),
        LayerConfig::l2_normalization(Shape3d::vector(3)),
    ]
}

#[test]
fn test_build_matches_shape_for() -> Result<(), NeuraGraphError> {
    for config in catalogue() {
        let shapes = config.shape_for()?;
        let layer = config.build()?;
        assert_eq!(layer.in_shapes(), shapes.inputs.as_slice(), "{}", config.type_name());
        assert_eq!(layer.out_shapes(), shapes.outputs.as_slice(), "{}", config.type_name());
        assert_eq!(layer.layer_type(), config.type_name());
    }
    Ok(())
}

#[test]
fn test_descriptor_serde_round_trip() {
    for config in catalogue() {
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(&format!("\"type\":\"{}\"", config.type_name())));
        let back: LayerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}

#[test]
fn test_descriptor_reads_hand_written_json() {
    let json = r#"{"type":"convolution","input":{"width":8,"height":8,"depth":1},
        "kernel_width":3,"kernel_height":3,"out_channels":6,"stride":1,
        "padding":"valid","has_bias":true}"#;
    let config: LayerConfig = serde_json::from_str(json).unwrap();
    let shapes = config.shape_for().unwrap();
    assert_eq!(shapes.outputs, vec![Shape3d::new(6, 6, 6)]);
}

#[test]
fn test_zero_sized_shape_is_rejected() {
    let err = LayerConfig::relu(Shape3d::new(0, 1, 1)).shape_for().unwrap_err();
    assert!(err.is_configuration());
}
