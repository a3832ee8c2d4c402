// src/nn/layers/mod.rs
// Layer kinds of the closed catalogue.

pub mod activation;
pub mod arithmetic;
pub mod concat;
pub mod convolution;
pub mod dropout;
pub mod fully_connected;
pub mod input;
pub mod normalization;
pub mod pooling;
pub mod quantized;

// Re-export key layer structs
pub use activation::{ActivationFn, ActivationLayer};
pub use arithmetic::{AddLayer, PowerLayer};
pub use concat::{ConcatLayer, SliceLayer};
pub use convolution::{ConvGeometry, ConvolutionLayer, Padding};
pub use dropout::DropoutLayer;
pub use fully_connected::FullyConnectedLayer;
pub use input::InputLayer;
pub use normalization::L2NormalizationLayer;
pub use pooling::{AveragePoolingLayer, GlobalAveragePoolingLayer, MaxPoolingLayer};
pub use quantized::QuantizedFullyConnectedLayer;

use crate::error::NeuraGraphError;
use crate::nn::layer::expect_arity;
use crate::tensor::Tensor;
use crate::types::Shape3d;

/// Validates the tensors handed to a layer against its declared shapes and
/// returns the batch size they share.
pub(crate) fn check_inputs(
    layer_type: &str,
    inputs: &[&Tensor],
    shapes: &[Shape3d],
) -> Result<usize, NeuraGraphError> {
    expect_arity(layer_type, "input", shapes.len(), inputs.len())?;
    let batch = inputs.first().map_or(0, |t| t.sample_count());
    for (input, shape) in inputs.iter().zip(shapes) {
        if input.sample_len() != shape.size() {
            return Err(NeuraGraphError::data_mismatch(
                format!("{layer_type} input sample length"),
                shape.size(),
                input.sample_len(),
            ));
        }
        if input.sample_count() != batch {
            return Err(NeuraGraphError::data_mismatch(
                format!("{layer_type} input batch size"),
                batch,
                input.sample_count(),
            ));
        }
    }
    Ok(batch)
}

/// Copies `src` into the equally sized `dst`.
pub(crate) fn copy_tensor(layer_type: &str, dst: &mut Tensor, src: &Tensor) -> Result<(), NeuraGraphError> {
    if dst.as_slice().len() != src.as_slice().len() {
        return Err(NeuraGraphError::data_mismatch(
            format!("{layer_type} copy"),
            dst.as_slice().len(),
            src.as_slice().len(),
        ));
    }
    dst.as_mut_slice().copy_from_slice(src.as_slice());
    Ok(())
}
