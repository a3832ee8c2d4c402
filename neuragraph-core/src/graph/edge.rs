use crate::tensor::Tensor;
use crate::types::Shape3d;
use serde::{Deserialize, Serialize};

/// Index of a layer inside its network's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub(crate) usize);

impl LayerId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Index of an edge inside its network's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub(crate) usize);

impl EdgeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One end of an edge: a layer and one of its output ports or input slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Port {
    pub layer: LayerId,
    pub index: usize,
}

/// Tensor-carrying connection with exactly one producer and any number of
/// consumers.
///
/// Only topology lives here; the activation and gradient tensors of an edge
/// are kept per worker in [`EdgeBuffers`].
#[derive(Debug, Clone)]
pub struct Edge {
    shape: Shape3d,
    producer: Port,
    consumers: Vec<Port>,
}

impl Edge {
    pub(crate) fn new(shape: Shape3d, producer: Port) -> Self {
        Edge {
            shape,
            producer,
            consumers: Vec::new(),
        }
    }

    pub fn shape(&self) -> Shape3d {
        self.shape
    }

    pub fn producer(&self) -> Port {
        self.producer
    }

    pub fn consumers(&self) -> &[Port] {
        &self.consumers
    }

    pub(crate) fn add_consumer(&mut self, consumer: Port) {
        self.consumers.push(consumer);
    }
}

/// Activation and gradient of one edge for the samples a worker handles.
#[derive(Debug, Clone, Default)]
pub struct EdgeBuffers {
    pub value: Tensor,
    pub grad: Tensor,
}
