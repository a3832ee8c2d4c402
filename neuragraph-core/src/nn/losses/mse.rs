use super::Loss;
use crate::types::FloatT;

/// Mean squared error: `sum((y - t)^2) / n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mse;

impl Loss for Mse {
    fn loss(&self, y: &[FloatT], t: &[FloatT]) -> FloatT {
        let n = y.len() as FloatT;
        y.iter().zip(t).map(|(a, b)| (a - b) * (a - b)).sum::<FloatT>() / n
    }

    fn gradient_into(&self, y: &[FloatT], t: &[FloatT], grad: &mut [FloatT]) {
        let factor = 2.0 / y.len() as FloatT;
        for ((g, a), b) in grad.iter_mut().zip(y).zip(t) {
            *g = factor * (a - b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mse_value_and_gradient() {
        let y = [1.0, 2.0, 4.0];
        let t = [1.0, 0.0, 1.0];
        assert_relative_eq!(Mse.loss(&y, &t), 13.0 / 3.0, epsilon = 1e-12);
        let g = Mse.gradient(&y, &t);
        assert_relative_eq!(g[0], 0.0);
        assert_relative_eq!(g[1], 4.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(g[2], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mse_zero_at_target() {
        let y = [0.3, -0.7];
        assert_eq!(Mse.loss(&y, &y), 0.0);
        assert!(Mse.gradient(&y, &y).iter().all(|g| *g == 0.0));
    }
}
