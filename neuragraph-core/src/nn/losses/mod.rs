//! Loss functions.
//!
//! The engine only relies on the two-function contract of [`Loss`]: a scalar
//! loss per sample and its gradient with respect to the network output.

use crate::types::FloatT;
use std::fmt::Debug;

pub mod absolute;
pub mod cross_entropy;
pub mod mse;

pub use absolute::Absolute;
pub use cross_entropy::{CrossEntropy, CrossEntropyMulticlass};
pub use mse::Mse;

pub trait Loss: Debug + Send + Sync {
    /// Loss of one output sample `y` against its target `t`.
    fn loss(&self, y: &[FloatT], t: &[FloatT]) -> FloatT;

    /// Writes `d loss / d y` into `grad` (same length as `y`).
    fn gradient_into(&self, y: &[FloatT], t: &[FloatT], grad: &mut [FloatT]);

    /// Allocating variant of [`Loss::gradient_into`].
    fn gradient(&self, y: &[FloatT], t: &[FloatT]) -> Vec<FloatT> {
        let mut grad = vec![0.0; y.len()];
        self.gradient_into(y, t, &mut grad);
        grad
    }
}
