use crate::graph::edge::EdgeId;
use crate::nn::config::LayerConfig;
use crate::nn::layer::Layer;

/// A layer together with its descriptor and its edge wiring.
#[derive(Debug, Clone)]
pub struct LayerNode {
    pub(crate) config: LayerConfig,
    pub(crate) layer: Layer,
    /// Edge feeding each input slot; always empty for input layers.
    pub(crate) inputs: Vec<Option<EdgeId>>,
    /// Edge produced on each output port.
    pub(crate) outputs: Vec<EdgeId>,
}

impl LayerNode {
    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    pub fn input_edges(&self) -> &[Option<EdgeId>] {
        &self.inputs
    }

    pub fn output_edges(&self) -> &[EdgeId] {
        &self.outputs
    }
}
