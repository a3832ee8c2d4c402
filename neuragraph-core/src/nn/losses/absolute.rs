use super::Loss;
use crate::types::FloatT;

/// Mean absolute error: `sum(|y - t|) / n`. The gradient at `y == t` is 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Absolute;

impl Loss for Absolute {
    fn loss(&self, y: &[FloatT], t: &[FloatT]) -> FloatT {
        y.iter().zip(t).map(|(a, b)| (a - b).abs()).sum::<FloatT>() / y.len() as FloatT
    }

    fn gradient_into(&self, y: &[FloatT], t: &[FloatT], grad: &mut [FloatT]) {
        let n = y.len() as FloatT;
        for ((g, a), b) in grad.iter_mut().zip(y).zip(t) {
            let d = a - b;
            *g = if d > 0.0 {
                1.0 / n
            } else if d < 0.0 {
                -1.0 / n
            } else {
                0.0
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_value_and_sign_gradient() {
        let y = [1.0, -1.0, 0.5, 2.0];
        let t = [0.0, 0.0, 0.5, 1.0];
        assert_eq!(Absolute.loss(&y, &t), 0.75);
        assert_eq!(Absolute.gradient(&y, &t), vec![0.25, -0.25, 0.0, 0.25]);
    }
}
