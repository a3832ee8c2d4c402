use crate::types::Shape3d;
use thiserror::Error;

/// Broad classes of [`NeuraGraphError`].
///
/// Lets callers (and tests) tell a rejected topology apart from a layer that
/// broke its own shape contract or from badly sized caller data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The graph or a layer/optimizer configuration was rejected.
    Configuration,
    /// A layer produced output disagreeing with its declared shape. Indicates a layer bug.
    InternalConsistency,
    /// Caller-provided tensors have the wrong count or length.
    InvalidData,
    /// A runtime resource (worker pool) could not be acquired.
    Resource,
}

/// Error type for graph construction and execution in neuragraph.
#[derive(Error, Debug, PartialEq, Clone)] // PartialEq for easier testing
pub enum NeuraGraphError {
    #[error("Invalid configuration for layer '{layer_type}': {reason}")]
    InvalidLayerConfig { layer_type: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Connection shape mismatch into layer {layer} slot {slot}: edge carries {actual}, layer expects {expected}")]
    ConnectionShapeMismatch {
        layer: usize,
        slot: usize,
        expected: Shape3d,
        actual: Shape3d,
    },

    #[error("Layer {layer} has no input slot {slot} (it accepts {available})")]
    InvalidSlot {
        layer: usize,
        slot: usize,
        available: usize,
    },

    #[error("Layer {layer} has no output port {port} (it produces {available})")]
    InvalidPort {
        layer: usize,
        port: usize,
        available: usize,
    },

    #[error("Input slot {slot} of layer {layer} is already connected")]
    SlotAlreadyConnected { layer: usize, slot: usize },

    #[error("Input slot {slot} of layer {layer} ({layer_type}) is not connected")]
    UnconnectedInput {
        layer: usize,
        slot: usize,
        layer_type: String,
    },

    #[error("Unknown layer id {0}")]
    UnknownLayer(usize),

    #[error("Unknown edge id {0}")]
    UnknownEdge(usize),

    #[error("Layer {layer} ({layer_type}) cannot act as a network input: {reason}")]
    InvalidInputLayer {
        layer: usize,
        layer_type: String,
        reason: String,
    },

    #[error("Cycle detected in layer graph, layers {layers:?} can never be scheduled")]
    CycleDetected { layers: Vec<usize> },

    #[error("Layer {layer} ({layer_type}) output {port}: declared {expected} values x {expected_samples} samples, produced {actual} x {actual_samples}")]
    ShapeMismatch {
        layer: usize,
        layer_type: String,
        port: usize,
        expected: usize,
        actual: usize,
        expected_samples: usize,
        actual_samples: usize,
    },

    #[error("Data mismatch in {context}: expected {expected}, got {actual}")]
    DataMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Index out of bounds: index {index} for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),
}

impl NeuraGraphError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            NeuraGraphError::InvalidLayerConfig { .. }
            | NeuraGraphError::ConfigurationError(_)
            | NeuraGraphError::ConnectionShapeMismatch { .. }
            | NeuraGraphError::InvalidSlot { .. }
            | NeuraGraphError::InvalidPort { .. }
            | NeuraGraphError::SlotAlreadyConnected { .. }
            | NeuraGraphError::UnconnectedInput { .. }
            | NeuraGraphError::UnknownLayer(_)
            | NeuraGraphError::UnknownEdge(_)
            | NeuraGraphError::InvalidInputLayer { .. }
            | NeuraGraphError::CycleDetected { .. } => ErrorKind::Configuration,
            NeuraGraphError::ShapeMismatch { .. } => ErrorKind::InternalConsistency,
            NeuraGraphError::DataMismatch { .. } | NeuraGraphError::IndexOutOfBounds { .. } => {
                ErrorKind::InvalidData
            }
            NeuraGraphError::ThreadPool(_) => ErrorKind::Resource,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    pub(crate) fn invalid_layer(layer_type: &str, reason: impl Into<String>) -> Self {
        NeuraGraphError::InvalidLayerConfig {
            layer_type: layer_type.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn data_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        NeuraGraphError::DataMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }
}
