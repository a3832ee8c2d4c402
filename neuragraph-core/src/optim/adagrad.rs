use super::{check_lengths, check_positive};
use crate::error::NeuraGraphError;
use crate::nn::parameter::ParamId;
use crate::optim::optimizer_state::OptimizerState;
use crate::optim::optimizer_trait::Optimizer;
use crate::types::FloatT;

/// Adagrad: `G += dW^2; W -= lr * dW / (sqrt(G) + eps)`.
#[derive(Debug, Clone)]
pub struct Adagrad {
    lr: FloatT,
    eps: FloatT,
    sum_squares: OptimizerState<Vec<FloatT>>,
}

impl Default for Adagrad {
    fn default() -> Self {
        Adagrad {
            lr: 0.01,
            eps: 1e-8,
            sum_squares: OptimizerState::default(),
        }
    }
}

impl Adagrad {
    pub fn new(lr: FloatT) -> Result<Self, NeuraGraphError> {
        Ok(Adagrad {
            lr: check_positive("adagrad", "learning rate", lr)?,
            ..Self::default()
        })
    }

    pub fn with_epsilon(mut self, eps: FloatT) -> Result<Self, NeuraGraphError> {
        self.eps = check_positive("adagrad", "epsilon", eps)?;
        Ok(self)
    }

    pub fn state(&self) -> &OptimizerState<Vec<FloatT>> {
        &self.sum_squares
    }
}

impl Optimizer for Adagrad {
    fn update(&mut self, id: ParamId, grad: &[FloatT], value: &mut [FloatT]) -> Result<(), NeuraGraphError> {
        check_lengths(grad, value)?;
        let g2 = self.sum_squares.buffer(id, value.len())?;
        for ((w, g), acc) in value.iter_mut().zip(grad).zip(g2.iter_mut()) {
            *acc += g * g;
            *w -= self.lr * g / (acc.sqrt() + self.eps);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.sum_squares.clear();
    }

    fn learning_rate(&self) -> FloatT {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: FloatT) -> Result<(), NeuraGraphError> {
        self.lr = check_positive("adagrad", "learning rate", lr)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "adagrad_test.rs"]
mod tests;
