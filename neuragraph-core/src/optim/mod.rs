//! Optimizers for training neural networks.
//!
//! The network hands each trainable parameter to an [`Optimizer`] as a pair
//! of slices: the batch-averaged gradient and the values to update in place.
//! Stateful optimizers keep their per-parameter buffers in an
//! [`OptimizerState`] keyed by [`ParamId`](crate::nn::ParamId).

pub mod adagrad;
pub mod adam;
pub mod optimizer_state;
pub mod optimizer_trait;
pub mod rmsprop;
pub mod sgd;

pub use adagrad::Adagrad;
pub use adam::{Adam, AdamParamState};
pub use optimizer_state::OptimizerState;
pub use optimizer_trait::Optimizer;
pub use rmsprop::RmsProp;
pub use sgd::{GradientDescent, Momentum};

use crate::error::NeuraGraphError;
use crate::types::FloatT;

pub(crate) fn check_positive(optimizer: &str, what: &str, value: FloatT) -> Result<FloatT, NeuraGraphError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(NeuraGraphError::ConfigurationError(format!(
            "{optimizer}: {what} must be positive and finite, got {value}"
        )))
    }
}

pub(crate) fn check_non_negative(optimizer: &str, what: &str, value: FloatT) -> Result<FloatT, NeuraGraphError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(NeuraGraphError::ConfigurationError(format!(
            "{optimizer}: {what} must be non-negative, got {value}"
        )))
    }
}

/// Accepts decay factors in `[0, 1)`.
pub(crate) fn check_decay(optimizer: &str, what: &str, value: FloatT) -> Result<FloatT, NeuraGraphError> {
    if (0.0..1.0).contains(&value) {
        Ok(value)
    } else {
        Err(NeuraGraphError::ConfigurationError(format!(
            "{optimizer}: {what} must be in [0, 1), got {value}"
        )))
    }
}

pub(crate) fn check_lengths(grad: &[FloatT], value: &[FloatT]) -> Result<(), NeuraGraphError> {
    if grad.len() != value.len() {
        return Err(NeuraGraphError::data_mismatch(
            "optimizer gradient length",
            value.len(),
            grad.len(),
        ));
    }
    Ok(())
}
