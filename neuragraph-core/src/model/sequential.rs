use crate::error::NeuraGraphError;
use crate::graph::builder::GraphBuilder;
use crate::graph::edge::LayerId;
use crate::graph::network::{Network, NetworkConfig, NetworkMode};
use crate::nn::config::LayerConfig;
use crate::nn::layers::ActivationFn;
use crate::types::Shape3d;
use std::collections::BTreeMap;

/// Builds a chain network one layer at a time.
///
/// Each added layer is fed by output 0 of the previous one. If the first layer
/// is not an input layer, an input layer of matching shape is inserted in
/// front of it. The result goes through the same validation and ordering as
/// any graph built with [`GraphBuilder`].
#[derive(Debug, Clone, Default)]
pub struct Sequential {
    builder: GraphBuilder,
    first: Option<LayerId>,
    last: Option<(LayerId, Shape3d)>,
    named_layers: BTreeMap<String, LayerId>,
}

impl Sequential {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a layer with exactly one input and one output.
    pub fn add(&mut self, config: LayerConfig) -> Result<LayerId, NeuraGraphError> {
        let shapes = config.shape_for()?;
        if shapes.inputs.len() != 1 || shapes.outputs.len() != 1 {
            return Err(NeuraGraphError::invalid_layer(
                config.type_name(),
                "layers of a sequential network need exactly one input and one output",
            ));
        }
        let (input_shape, output_shape) = (shapes.inputs[0], shapes.outputs[0]);

        if let LayerConfig::Input { .. } = config {
            if self.last.is_some() {
                return Err(NeuraGraphError::ConfigurationError(
                    "an input layer can only start a sequential network".to_string(),
                ));
            }
            let id = self.builder.add_layer(config)?;
            self.first = Some(id);
            self.last = Some((id, output_shape));
            return Ok(id);
        }

        let (previous, previous_shape) = match self.last {
            Some(last) => last,
            None => {
                let id = self.builder.add_layer(LayerConfig::input(input_shape))?;
                self.first = Some(id);
                (id, input_shape)
            }
        };
        if previous_shape != input_shape {
            return Err(NeuraGraphError::ConnectionShapeMismatch {
                layer: self.builder.layer_count(),
                slot: 0,
                expected: input_shape,
                actual: previous_shape,
            });
        }
        let id = self.builder.add_layer(config)?;
        self.builder.chain(previous, id)?;
        self.last = Some((id, output_shape));
        Ok(id)
    }

    /// Like [`Sequential::add`], also registering `name` for [`Sequential::layer_id`].
    pub fn add_named(&mut self, name: &str, config: LayerConfig) -> Result<LayerId, NeuraGraphError> {
        if self.named_layers.contains_key(name) {
            return Err(NeuraGraphError::ConfigurationError(format!(
                "layer name '{name}' is already used"
            )));
        }
        let id = self.add(config)?;
        self.named_layers.insert(name.to_string(), id);
        Ok(id)
    }

    /// Appends an element-wise activation sized like the current output.
    pub fn add_activation(&mut self, function: ActivationFn) -> Result<LayerId, NeuraGraphError> {
        let shape = self.output_shape().ok_or_else(|| {
            NeuraGraphError::ConfigurationError(
                "an activation needs a preceding layer to take its shape from".to_string(),
            )
        })?;
        self.add(LayerConfig::activation(shape, function))
    }

    /// Builder-style [`Sequential::add`].
    pub fn with(mut self, config: LayerConfig) -> Result<Self, NeuraGraphError> {
        self.add(config)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.builder.layer_count()
    }

    pub fn is_empty(&self) -> bool {
        self.builder.layer_count() == 0
    }

    pub fn output_shape(&self) -> Option<Shape3d> {
        self.last.map(|(_, shape)| shape)
    }

    pub fn layer_id(&self, name: &str) -> Option<LayerId> {
        self.named_layers.get(name).copied()
    }

    pub fn named_layers(&self) -> &BTreeMap<String, LayerId> {
        &self.named_layers
    }

    pub fn build(self, config: NetworkConfig) -> Result<Network, NeuraGraphError> {
        let (first, (last, _)) = self.first.zip(self.last).ok_or_else(|| {
            NeuraGraphError::ConfigurationError("a sequential network needs at least one layer".to_string())
        })?;
        self.builder
            .build_with_mode(&[first], &[last], config, NetworkMode::Sequential)
    }
}

#[cfg(test)]
#[path = "sequential_test.rs"]
mod tests;
