use super::Loss;
use crate::types::FloatT;

/// Binary cross entropy summed over outputs: `-sum(t ln y + (1 - t) ln(1 - y))`.
///
/// Expects outputs strictly inside `(0, 1)`, e.g. after a sigmoid.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropy;

impl Loss for CrossEntropy {
    fn loss(&self, y: &[FloatT], t: &[FloatT]) -> FloatT {
        y.iter()
            .zip(t)
            .map(|(a, b)| -b * a.ln() - (1.0 - b) * (1.0 - a).ln())
            .sum()
    }

    fn gradient_into(&self, y: &[FloatT], t: &[FloatT], grad: &mut [FloatT]) {
        for ((g, a), b) in grad.iter_mut().zip(y).zip(t) {
            *g = (a - b) / (a * (1.0 - a));
        }
    }
}

/// Categorical cross entropy: `-sum(t ln y)`, for softmax outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyMulticlass;

impl Loss for CrossEntropyMulticlass {
    fn loss(&self, y: &[FloatT], t: &[FloatT]) -> FloatT {
        y.iter().zip(t).map(|(a, b)| -b * a.ln()).sum()
    }

    fn gradient_into(&self, y: &[FloatT], t: &[FloatT], grad: &mut [FloatT]) {
        for ((g, a), b) in grad.iter_mut().zip(y).zip(t) {
            *g = -b / a;
        }
    }
}
