use crate::error::NeuraGraphError;
use crate::nn::parameter::ParamId;
use crate::types::FloatT;
use std::fmt::Debug;

/// Common interface of all optimizers.
///
/// `update` is called once per trainable parameter and training step, strictly
/// between steps, never concurrently with a forward or backward pass.
pub trait Optimizer: Debug + Send {
    /// Updates `value` in place from `grad`, the gradient already divided by
    /// the batch size. `id` selects the per-parameter state.
    ///
    /// # Errors
    /// `DataMismatch` if `grad` and `value` differ in length, or if the
    /// parameter's stored state was created for another length.
    fn update(&mut self, id: ParamId, grad: &[FloatT], value: &mut [FloatT]) -> Result<(), NeuraGraphError>;

    /// Forgets all per-parameter state.
    fn reset(&mut self);

    fn learning_rate(&self) -> FloatT;

    fn set_learning_rate(&mut self, lr: FloatT) -> Result<(), NeuraGraphError>;
}
