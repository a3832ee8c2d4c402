use super::{check_decay, check_lengths, check_positive};
use crate::error::NeuraGraphError;
use crate::nn::parameter::ParamId;
use crate::optim::optimizer_state::OptimizerState;
use crate::optim::optimizer_trait::Optimizer;
use crate::types::FloatT;

/// RMSprop: `G = mu * G + (1 - mu) * dW^2; W -= lr * dW / sqrt(G + eps)`.
#[derive(Debug, Clone)]
pub struct RmsProp {
    lr: FloatT,
    mu: FloatT,
    eps: FloatT,
    mean_square: OptimizerState<Vec<FloatT>>,
}

impl Default for RmsProp {
    fn default() -> Self {
        RmsProp {
            lr: 1e-4,
            mu: 0.99,
            eps: 1e-8,
            mean_square: OptimizerState::default(),
        }
    }
}

impl RmsProp {
    pub fn new(lr: FloatT, mu: FloatT) -> Result<Self, NeuraGraphError> {
        Ok(RmsProp {
            lr: check_positive("rmsprop", "learning rate", lr)?,
            mu: check_decay("rmsprop", "decay", mu)?,
            ..Self::default()
        })
    }

    pub fn with_epsilon(mut self, eps: FloatT) -> Result<Self, NeuraGraphError> {
        self.eps = check_positive("rmsprop", "epsilon", eps)?;
        Ok(self)
    }

    pub fn state(&self) -> &OptimizerState<Vec<FloatT>> {
        &self.mean_square
    }
}

impl Optimizer for RmsProp {
    fn update(&mut self, id: ParamId, grad: &[FloatT], value: &mut [FloatT]) -> Result<(), NeuraGraphError> {
        check_lengths(grad, value)?;
        let (mu, lr, eps) = (self.mu, self.lr, self.eps);
        let g2 = self.mean_square.buffer(id, value.len())?;
        for ((w, g), acc) in value.iter_mut().zip(grad).zip(g2.iter_mut()) {
            *acc = mu * *acc + (1.0 - mu) * g * g;
            *w -= lr * g / (*acc + eps).sqrt();
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.mean_square.clear();
    }

    fn learning_rate(&self) -> FloatT {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: FloatT) -> Result<(), NeuraGraphError> {
        self.lr = check_positive("rmsprop", "learning rate", lr)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "rmsprop_test.rs"]
mod tests;
