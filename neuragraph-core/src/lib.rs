//! neuragraph-core: a CPU neural-network engine over directed acyclic layer graphs.
//!
//! Networks are assembled from a closed catalogue of layers, either as a
//! chain ([`Sequential`]) or as an arbitrary DAG ([`GraphBuilder`]). A
//! [`Network`] runs forward and backward passes over mini-batches split
//! across a fixed pool of worker threads, hands averaged gradients to an
//! [`Optimizer`], and can verify its own gradients numerically with a
//! [`GradientChecker`].

pub mod autograd;
pub mod error;
pub mod graph;
pub mod model;
pub mod nn;
pub mod optim;
pub mod scheduler;
pub mod serialization;
pub mod tensor;
pub mod types;
pub mod utils;

pub use autograd::{CheckMode, CheckTarget, GradCheckError, GradCheckReport, GradientChecker};
pub use error::{ErrorKind, NeuraGraphError};
pub use graph::{
    EdgeId, FitOptions, GraphBuilder, LayerId, Network, NetworkConfig, NetworkMode, TestResult,
};
pub use model::Sequential;
pub use nn::{ActivationFn, Layer, LayerConfig, Loss, Padding, ParamId, Parameter, WeightInit};
pub use optim::Optimizer;
pub use scheduler::BatchScheduler;
pub use serialization::PersistenceError;
pub use tensor::Tensor;
pub use types::{FloatT, NetPhase, ParamKind, Shape3d, DEFAULT_GRAD_EPSILON};
