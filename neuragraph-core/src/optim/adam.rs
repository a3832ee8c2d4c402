use super::{check_decay, check_lengths, check_positive};
use crate::error::NeuraGraphError;
use crate::nn::parameter::ParamId;
use crate::optim::optimizer_state::OptimizerState;
use crate::optim::optimizer_trait::Optimizer;
use crate::types::FloatT;

/// Moment estimates of one parameter.
#[derive(Debug, Clone, Default)]
pub struct AdamParamState {
    /// First moment (moving average of gradients).
    pub m: Vec<FloatT>,
    /// Second moment (moving average of squared gradients).
    pub v: Vec<FloatT>,
    /// Updates applied so far, drives the bias correction.
    pub step: i32,
}

/// Adam with bias-corrected moments:
/// `W -= lr * m_hat / sqrt(v_hat + eps)`.
#[derive(Debug, Clone)]
pub struct Adam {
    lr: FloatT,
    beta1: FloatT,
    beta2: FloatT,
    eps: FloatT,
    state: OptimizerState<AdamParamState>,
}

impl Default for Adam {
    fn default() -> Self {
        Adam {
            lr: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            state: OptimizerState::default(),
        }
    }
}

impl Adam {
    pub fn new(lr: FloatT, beta1: FloatT, beta2: FloatT) -> Result<Self, NeuraGraphError> {
        Ok(Adam {
            lr: check_positive("adam", "learning rate", lr)?,
            beta1: check_decay("adam", "beta1", beta1)?,
            beta2: check_decay("adam", "beta2", beta2)?,
            ..Self::default()
        })
    }

    pub fn with_epsilon(mut self, eps: FloatT) -> Result<Self, NeuraGraphError> {
        self.eps = check_positive("adam", "epsilon", eps)?;
        Ok(self)
    }

    pub fn state(&self) -> &OptimizerState<AdamParamState> {
        &self.state
    }
}

impl Optimizer for Adam {
    fn update(&mut self, id: ParamId, grad: &[FloatT], value: &mut [FloatT]) -> Result<(), NeuraGraphError> {
        check_lengths(grad, value)?;
        let (lr, b1, b2, eps) = (self.lr, self.beta1, self.beta2, self.eps);
        let len = value.len();
        let state = self.state.get_or_insert_with(id, || AdamParamState {
            m: vec![0.0; len],
            v: vec![0.0; len],
            step: 0,
        });
        if state.m.len() != len {
            return Err(NeuraGraphError::data_mismatch("optimizer state length", state.m.len(), len));
        }
        state.step += 1;
        let correction1 = 1.0 - b1.powi(state.step);
        let correction2 = 1.0 - b2.powi(state.step);
        for (((w, g), m), v) in value
            .iter_mut()
            .zip(grad)
            .zip(state.m.iter_mut())
            .zip(state.v.iter_mut())
        {
            *m = b1 * *m + (1.0 - b1) * g;
            *v = b2 * *v + (1.0 - b2) * g * g;
            *w -= lr * (*m / correction1) / (*v / correction2 + eps).sqrt();
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.state.clear();
    }

    fn learning_rate(&self) -> FloatT {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: FloatT) -> Result<(), NeuraGraphError> {
        self.lr = check_positive("adam", "learning rate", lr)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "adam_test.rs"]
mod tests;
