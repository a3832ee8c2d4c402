//! Layer graph: construction, validation and execution.

pub mod builder;
pub mod edge;
pub mod network;
pub mod node;
pub(crate) mod workspace;

pub use builder::GraphBuilder;
pub use edge::{Edge, EdgeBuffers, EdgeId, LayerId, Port};
pub use network::{FitOptions, Network, NetworkConfig, NetworkMode, TestResult};
pub use node::LayerNode;
