// src/nn/mod.rs
// Layers, their parameters, weight initialisation and losses.

pub mod config; // LayerConfig topology descriptor
pub mod init;
pub mod layer; // LayerOp trait + Layer catalogue
pub mod layers;
pub mod losses;
pub mod parameter;

// Re-export common items
pub use config::LayerConfig;
pub use init::WeightInit;
pub use layer::{BackwardPass, Layer, LayerOp, LayerScratch, LayerShapes};
pub use layers::{ActivationFn, Padding};
pub use losses::{Absolute, CrossEntropy, CrossEntropyMulticlass, Loss, Mse};
pub use parameter::{ParamId, Parameter};
