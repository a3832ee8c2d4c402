use crate::error::NeuraGraphError;
use crate::graph::edge::{Edge, EdgeId, LayerId, Port};
use crate::graph::network::{Network, NetworkConfig, NetworkMode};
use crate::graph::node::LayerNode;
use crate::nn::config::LayerConfig;
use log::debug;

/// Incrementally assembles a layer graph and validates it into a [`Network`].
///
/// Every layer added gets one edge per output port right away; wiring is then
/// expressed by connecting those edges to input slots of other layers.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    nodes: Vec<LayerNode>,
    edges: Vec<Edge>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `config`, creates the layer and its output edges.
    pub fn add_layer(&mut self, config: LayerConfig) -> Result<LayerId, NeuraGraphError> {
        let layer = config.build()?;
        let id = LayerId(self.nodes.len());
        let outputs = layer
            .out_shapes()
            .iter()
            .enumerate()
            .map(|(port, shape)| {
                let edge = EdgeId(self.edges.len());
                self.edges.push(Edge::new(*shape, Port { layer: id, index: port }));
                edge
            })
            .collect();
        let inputs = if layer.is_input() {
            Vec::new()
        } else {
            vec![None; layer.in_shapes().len()]
        };
        self.nodes.push(LayerNode {
            config,
            layer,
            inputs,
            outputs,
        });
        Ok(id)
    }

    /// The edge produced on output `port` of `layer`.
    pub fn output_edge(&self, layer: LayerId, port: usize) -> Result<EdgeId, NeuraGraphError> {
        let node = self.node(layer)?;
        node.outputs
            .get(port)
            .copied()
            .ok_or(NeuraGraphError::InvalidPort {
                layer: layer.0,
                port,
                available: node.outputs.len(),
            })
    }

    /// Feeds `source` into input `slot` of `dest`.
    pub fn connect(&mut self, source: EdgeId, dest: LayerId, slot: usize) -> Result<(), NeuraGraphError> {
        let shape = self
            .edges
            .get(source.0)
            .ok_or(NeuraGraphError::UnknownEdge(source.0))?
            .shape();
        let node = self
            .nodes
            .get_mut(dest.0)
            .ok_or(NeuraGraphError::UnknownLayer(dest.0))?;
        if node.layer.is_input() {
            return Err(NeuraGraphError::InvalidInputLayer {
                layer: dest.0,
                layer_type: node.layer.layer_type().to_string(),
                reason: "input layers are fed by the network and accept no connection".to_string(),
            });
        }
        let available = node.inputs.len();
        let current = node.inputs.get_mut(slot).ok_or(NeuraGraphError::InvalidSlot {
            layer: dest.0,
            slot,
            available,
        })?;
        if current.is_some() {
            return Err(NeuraGraphError::SlotAlreadyConnected { layer: dest.0, slot });
        }
        let expected = node.layer.in_shapes()[slot];
        if expected != shape {
            return Err(NeuraGraphError::ConnectionShapeMismatch {
                layer: dest.0,
                slot,
                expected,
                actual: shape,
            });
        }
        *current = Some(source);
        self.edges[source.0].add_consumer(Port { layer: dest, index: slot });
        Ok(())
    }

    /// Connects output 0 of `from` to input slot 0 of `to`.
    pub fn chain(&mut self, from: LayerId, to: LayerId) -> Result<(), NeuraGraphError> {
        let edge = self.output_edge(from, 0)?;
        self.connect(edge, to, 0)
    }

    pub fn layer_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: LayerId) -> Result<&LayerNode, NeuraGraphError> {
        self.nodes.get(id.0).ok_or(NeuraGraphError::UnknownLayer(id.0))
    }

    /// Validates the graph and turns it into a runnable network.
    ///
    /// `inputs` become the network inputs in the given order; the output
    /// edges of `outputs` (all ports, in order) become the network outputs.
    pub fn build(
        self,
        inputs: &[LayerId],
        outputs: &[LayerId],
        config: NetworkConfig,
    ) -> Result<Network, NeuraGraphError> {
        self.build_with_mode(inputs, outputs, config, NetworkMode::Graph)
    }

    pub(crate) fn build_with_mode(
        self,
        inputs: &[LayerId],
        outputs: &[LayerId],
        config: NetworkConfig,
        mode: NetworkMode,
    ) -> Result<Network, NeuraGraphError> {
        config.validate()?;
        self.validate_endpoints(inputs, outputs)?;
        let order = topological_order(&self.nodes, &self.edges, inputs)?;
        debug!(
            "built {:?} network: {} layers, {} edges, order {:?}",
            mode,
            self.nodes.len(),
            self.edges.len(),
            order.iter().map(LayerId::index).collect::<Vec<_>>()
        );
        Network::assemble(
            self.nodes,
            self.edges,
            inputs.to_vec(),
            outputs.to_vec(),
            order,
            mode,
            config,
        )
    }

    fn validate_endpoints(&self, inputs: &[LayerId], outputs: &[LayerId]) -> Result<(), NeuraGraphError> {
        if inputs.is_empty() || outputs.is_empty() {
            return Err(NeuraGraphError::ConfigurationError(
                "a network needs at least one input and one output layer".to_string(),
            ));
        }
        for (pos, id) in inputs.iter().enumerate() {
            let node = self.node(*id)?;
            if !node.layer.is_input() {
                return Err(NeuraGraphError::InvalidInputLayer {
                    layer: id.0,
                    layer_type: node.layer.layer_type().to_string(),
                    reason: "only input layers can be designated as network inputs".to_string(),
                });
            }
            if inputs[..pos].contains(id) {
                return Err(NeuraGraphError::InvalidInputLayer {
                    layer: id.0,
                    layer_type: node.layer.layer_type().to_string(),
                    reason: "designated more than once".to_string(),
                });
            }
        }
        for id in outputs {
            self.node(*id)?;
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if node.layer.is_input() && !inputs.contains(&LayerId(index)) {
                return Err(NeuraGraphError::InvalidInputLayer {
                    layer: index,
                    layer_type: node.layer.layer_type().to_string(),
                    reason: "input layer is not designated as a network input".to_string(),
                });
            }
            if let Some(slot) = node.inputs.iter().position(Option::is_none) {
                return Err(NeuraGraphError::UnconnectedInput {
                    layer: index,
                    slot,
                    layer_type: node.layer.layer_type().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Kahn-style ordering: a stack seeded with the designated inputs (the first
/// one on top); a layer is released once every one of its slots has been
/// produced.
pub(crate) fn topological_order(
    nodes: &[LayerNode],
    edges: &[Edge],
    inputs: &[LayerId],
) -> Result<Vec<LayerId>, NeuraGraphError> {
    let mut pending: Vec<usize> = nodes.iter().map(|n| n.inputs.len()).collect();
    let mut stack: Vec<LayerId> = inputs.iter().rev().copied().collect();
    let mut order = Vec::with_capacity(nodes.len());
    let mut visited = vec![false; nodes.len()];

    while let Some(id) = stack.pop() {
        if visited[id.0] {
            continue;
        }
        visited[id.0] = true;
        order.push(id);
        let node = &nodes[id.0];
        // Pushed in reverse so the first consumer of the first port runs next.
        let mut released = Vec::new();
        for edge in &node.outputs {
            for consumer in edges[edge.0].consumers() {
                let remaining = &mut pending[consumer.layer.0];
                *remaining -= 1;
                if *remaining == 0 {
                    released.push(consumer.layer);
                }
            }
        }
        stack.extend(released.into_iter().rev());
    }

    if order.len() != nodes.len() {
        let layers: Vec<usize> = (0..nodes.len()).filter(|i| !visited[*i]).collect();
        return Err(NeuraGraphError::CycleDetected { layers });
    }
    Ok(order)
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod tests;
