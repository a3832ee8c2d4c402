use super::{check_decay, check_lengths, check_non_negative, check_positive};
use crate::error::NeuraGraphError;
use crate::nn::parameter::ParamId;
use crate::optim::optimizer_state::OptimizerState;
use crate::optim::optimizer_trait::Optimizer;
use crate::types::FloatT;

/// Plain stochastic gradient descent with L2 weight decay:
/// `W -= lr * (dW + weight_decay * W)`.
#[derive(Debug, Clone)]
pub struct GradientDescent {
    lr: FloatT,
    weight_decay: FloatT,
}

impl Default for GradientDescent {
    fn default() -> Self {
        GradientDescent {
            lr: 0.01,
            weight_decay: 0.0,
        }
    }
}

impl GradientDescent {
    pub fn new(lr: FloatT) -> Result<Self, NeuraGraphError> {
        Ok(GradientDescent {
            lr: check_positive("gradient descent", "learning rate", lr)?,
            ..Self::default()
        })
    }

    pub fn with_weight_decay(mut self, weight_decay: FloatT) -> Result<Self, NeuraGraphError> {
        self.weight_decay = check_non_negative("gradient descent", "weight decay", weight_decay)?;
        Ok(self)
    }

    pub fn weight_decay(&self) -> FloatT {
        self.weight_decay
    }
}

impl Optimizer for GradientDescent {
    fn update(&mut self, _id: ParamId, grad: &[FloatT], value: &mut [FloatT]) -> Result<(), NeuraGraphError> {
        check_lengths(grad, value)?;
        for (w, g) in value.iter_mut().zip(grad) {
            *w -= self.lr * (g + self.weight_decay * *w);
        }
        Ok(())
    }

    fn reset(&mut self) {}

    fn learning_rate(&self) -> FloatT {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: FloatT) -> Result<(), NeuraGraphError> {
        self.lr = check_positive("gradient descent", "learning rate", lr)?;
        Ok(())
    }
}

/// SGD with momentum:
/// `V = mu * V - lr * (dW + weight_decay * W); W += V`.
#[derive(Debug, Clone)]
pub struct Momentum {
    lr: FloatT,
    weight_decay: FloatT,
    mu: FloatT,
    velocity: OptimizerState<Vec<FloatT>>,
}

impl Default for Momentum {
    fn default() -> Self {
        Momentum {
            lr: 0.01,
            weight_decay: 0.0,
            mu: 0.9,
            velocity: OptimizerState::default(),
        }
    }
}

impl Momentum {
    pub fn new(lr: FloatT, mu: FloatT) -> Result<Self, NeuraGraphError> {
        Ok(Momentum {
            lr: check_positive("momentum", "learning rate", lr)?,
            mu: check_decay("momentum", "momentum factor", mu)?,
            ..Self::default()
        })
    }

    pub fn with_weight_decay(mut self, weight_decay: FloatT) -> Result<Self, NeuraGraphError> {
        self.weight_decay = check_non_negative("momentum", "weight decay", weight_decay)?;
        Ok(self)
    }

    pub fn state(&self) -> &OptimizerState<Vec<FloatT>> {
        &self.velocity
    }
}

impl Optimizer for Momentum {
    fn update(&mut self, id: ParamId, grad: &[FloatT], value: &mut [FloatT]) -> Result<(), NeuraGraphError> {
        check_lengths(grad, value)?;
        let velocity = self.velocity.buffer(id, value.len())?;
        for ((w, g), v) in value.iter_mut().zip(grad).zip(velocity.iter_mut()) {
            *v = self.mu * *v - self.lr * (g + *w * self.weight_decay);
            *w += *v;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.velocity.clear();
    }

    fn learning_rate(&self) -> FloatT {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: FloatT) -> Result<(), NeuraGraphError> {
        self.lr = check_positive("momentum", "learning rate", lr)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "sgd_test.rs"]
mod tests;
