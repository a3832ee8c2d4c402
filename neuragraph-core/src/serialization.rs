//! JSON persistence of weights and whole models.
//!
//! A weights document lists, per layer, the kind, shape and values of every
//! parameter. A model document adds the topology (layer descriptors,
//! connections, designated inputs and outputs, build mode) and is loaded back
//! through [`GraphBuilder`] so every configuration check runs again.

use crate::error::NeuraGraphError;
use crate::graph::{GraphBuilder, LayerId, Network, NetworkConfig, NetworkMode};
use crate::nn::config::LayerConfig;
use crate::types::{FloatT, ParamKind, Shape3d};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed document: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Stored data does not fit the network at {location}: expected {expected}, stored {stored}")]
    ShapeMismatch {
        location: String,
        expected: usize,
        stored: usize,
    },

    #[error("Stored parameter at {location} has shape {stored}, the network expects {expected}")]
    ParameterShape {
        location: String,
        expected: Shape3d,
        stored: Shape3d,
    },

    #[error("Unsupported document version {0}")]
    UnsupportedVersion(u32),

    #[error("Stored topology is invalid: {0}")]
    InvalidTopology(#[from] NeuraGraphError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecord {
    pub kind: ParamKind,
    pub shape: Shape3d,
    pub values: Vec<FloatT>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerWeights {
    pub layer_type: String,
    pub parameters: Vec<ParameterRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightsDocument {
    pub format_version: u32,
    pub layers: Vec<LayerWeights>,
}

/// Output `from_port` of `from_layer` feeds input `to_slot` of `to_layer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub from_layer: usize,
    pub from_port: usize,
    pub to_layer: usize,
    pub to_slot: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    pub format_version: u32,
    pub mode: NetworkMode,
    pub layers: Vec<LayerConfig>,
    pub connections: Vec<ConnectionRecord>,
    pub inputs: Vec<usize>,
    pub outputs: Vec<usize>,
    pub weights: WeightsDocument,
}

/// Snapshot of every parameter value of `network`.
pub fn weights_document(network: &Network) -> WeightsDocument {
    let layers = network
        .nodes()
        .iter()
        .map(|node| LayerWeights {
            layer_type: node.layer().layer_type().to_string(),
            parameters: node
                .layer()
                .parameters()
                .iter()
                .map(|p| ParameterRecord {
                    kind: p.kind(),
                    shape: p.shape(),
                    values: p.value().to_vec(),
                })
                .collect(),
        })
        .collect();
    WeightsDocument {
        format_version: FORMAT_VERSION,
        layers,
    }
}

/// Copies the stored values into `network`.
///
/// The whole document is validated first; on error the network is unchanged.
pub fn apply_weights(network: &mut Network, document: &WeightsDocument) -> Result<(), PersistenceError> {
    check_version(document.format_version)?;
    let nodes = network.nodes();
    if nodes.len() != document.layers.len() {
        return Err(PersistenceError::ShapeMismatch {
            location: "layer count".to_string(),
            expected: nodes.len(),
            stored: document.layers.len(),
        });
    }
    for (index, (node, stored)) in nodes.iter().zip(&document.layers).enumerate() {
        let params = node.layer().parameters();
        if params.len() != stored.parameters.len() {
            return Err(PersistenceError::ShapeMismatch {
                location: format!("parameter count of layer {index} ({})", node.layer().layer_type()),
                expected: params.len(),
                stored: stored.parameters.len(),
            });
        }
        for (p, (param, record)) in params.iter().zip(&stored.parameters).enumerate() {
            if param.len() != record.values.len() {
                return Err(PersistenceError::ShapeMismatch {
                    location: format!("layer {index} parameter {p}"),
                    expected: param.len(),
                    stored: record.values.len(),
                });
            }
            if param.shape() != record.shape {
                return Err(PersistenceError::ParameterShape {
                    location: format!("layer {index} parameter {p}"),
                    expected: param.shape(),
                    stored: record.shape,
                });
            }
        }
    }

    for (index, stored) in document.layers.iter().enumerate() {
        let layer = network.layer_mut(LayerId(index))?;
        for (param, record) in layer.parameters_mut().iter_mut().zip(&stored.parameters) {
            param.load_values(&record.values)?;
        }
    }
    Ok(())
}

pub fn save_weights<W: Write>(network: &Network, writer: W) -> Result<(), PersistenceError> {
    serde_json::to_writer_pretty(writer, &weights_document(network))?;
    Ok(())
}

pub fn load_weights<R: Read>(network: &mut Network, reader: R) -> Result<(), PersistenceError> {
    let document: WeightsDocument = serde_json::from_reader(reader)?;
    apply_weights(network, &document)
}

pub fn save_weights_to_file<P: AsRef<Path>>(network: &Network, path: P) -> Result<(), PersistenceError> {
    let mut writer = BufWriter::new(File::create(path)?);
    save_weights(network, &mut writer)?;
    writer.flush()?;
    Ok(())
}

pub fn load_weights_from_file<P: AsRef<Path>>(network: &mut Network, path: P) -> Result<(), PersistenceError> {
    load_weights(network, BufReader::new(File::open(path)?))
}

/// Topology and weights of `network`.
pub fn model_document(network: &Network) -> ModelDocument {
    let mut connections = Vec::new();
    for (index, node) in network.nodes().iter().enumerate() {
        for (slot, edge) in node.input_edges().iter().enumerate() {
            if let Some(producer) = edge.and_then(|e| network.edge(e).ok()).map(|e| e.producer()) {
                connections.push(ConnectionRecord {
                    from_layer: producer.layer.index(),
                    from_port: producer.index,
                    to_layer: index,
                    to_slot: slot,
                });
            }
        }
    }
    ModelDocument {
        format_version: FORMAT_VERSION,
        mode: network.mode(),
        layers: network.nodes().iter().map(|n| n.config().clone()).collect(),
        connections,
        inputs: network.inputs().iter().map(LayerId::index).collect(),
        outputs: network.outputs().iter().map(LayerId::index).collect(),
        weights: weights_document(network),
    }
}

/// Rebuilds a network from `document`, then loads its weights.
pub fn network_from_document(
    document: &ModelDocument,
    config: NetworkConfig,
) -> Result<Network, PersistenceError> {
    check_version(document.format_version)?;
    let mut builder = GraphBuilder::new();
    for layer in &document.layers {
        builder.add_layer(layer.clone())?;
    }
    for c in &document.connections {
        let edge = builder.output_edge(LayerId(c.from_layer), c.from_port)?;
        builder.connect(edge, LayerId(c.to_layer), c.to_slot)?;
    }
    let inputs: Vec<LayerId> = document.inputs.iter().map(|i| LayerId(*i)).collect();
    let outputs: Vec<LayerId> = document.outputs.iter().map(|i| LayerId(*i)).collect();
    let mut network = builder.build_with_mode(&inputs, &outputs, config, document.mode)?;
    apply_weights(&mut network, &document.weights)?;
    debug!(
        "restored {:?} network with {} layers and {} connections",
        document.mode,
        document.layers.len(),
        document.connections.len()
    );
    Ok(network)
}

pub fn save_model<W: Write>(network: &Network, writer: W) -> Result<(), PersistenceError> {
    serde_json::to_writer_pretty(writer, &model_document(network))?;
    Ok(())
}

pub fn load_model<R: Read>(reader: R, config: NetworkConfig) -> Result<Network, PersistenceError> {
    let document: ModelDocument = serde_json::from_reader(reader)?;
    network_from_document(&document, config)
}

pub fn save_model_to_file<P: AsRef<Path>>(network: &Network, path: P) -> Result<(), PersistenceError> {
    let mut writer = BufWriter::new(File::create(path)?);
    save_model(network, &mut writer)?;
    writer.flush()?;
    Ok(())
}

pub fn load_model_from_file<P: AsRef<Path>>(path: P, config: NetworkConfig) -> Result<Network, PersistenceError> {
    load_model(BufReader::new(File::open(path)?), config)
}

fn check_version(version: u32) -> Result<(), PersistenceError> {
    if version != FORMAT_VERSION {
        return Err(PersistenceError::UnsupportedVersion(version));
    }
    Ok(())
}

#[cfg(test)]
#[path = "serialization_test.rs"]
mod tests;
