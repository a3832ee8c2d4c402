//! Weight initialisation policies.
//!
//! A [`WeightInit`] fills a parameter buffer given the owning layer's fan-in
//! and fan-out. Networks apply one policy to weights and one to biases,
//! driven by a seeded RNG so two networks built with the same seed start
//! from identical values.

use crate::error::NeuraGraphError;
use crate::types::FloatT;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeightInit {
    /// Uniform in `±sqrt(scale / (fan_in + fan_out))`.
    Xavier { scale: FloatT },
    /// Uniform in `±scale / sqrt(fan_in)`.
    Lecun { scale: FloatT },
    /// Normal with mean 0 and standard deviation `sigma`.
    Gaussian { sigma: FloatT },
    /// Every value set to `value`.
    Constant { value: FloatT },
    /// Normal with standard deviation `sqrt(scale / fan_in)`.
    He { scale: FloatT },
}

impl WeightInit {
    pub fn xavier() -> Self {
        WeightInit::Xavier { scale: 6.0 }
    }

    pub fn lecun() -> Self {
        WeightInit::Lecun { scale: 1.0 }
    }

    pub fn gaussian(sigma: FloatT) -> Self {
        WeightInit::Gaussian { sigma }
    }

    pub fn constant(value: FloatT) -> Self {
        WeightInit::Constant { value }
    }

    pub fn he() -> Self {
        WeightInit::He { scale: 2.0 }
    }

    /// Fills `values` for a layer with the given fan-in/fan-out.
    ///
    /// # Errors
    /// `ConfigurationError` when the policy needs a non-zero fan that the
    /// layer does not provide, or when a scale/sigma is negative or not finite.
    pub fn fill<R: Rng + ?Sized>(
        &self,
        values: &mut [FloatT],
        fan_in: usize,
        fan_out: usize,
        rng: &mut R,
    ) -> Result<(), NeuraGraphError> {
        match *self {
            WeightInit::Xavier { scale } => {
                let fans = fan_in + fan_out;
                if fans == 0 {
                    return Err(NeuraGraphError::ConfigurationError(
                        "xavier init requires fan_in + fan_out > 0".to_string(),
                    ));
                }
                let weight_base = (check_scale("xavier", scale)? / fans as FloatT).sqrt();
                fill_uniform(values, weight_base, rng);
            }
            WeightInit::Lecun { scale } => {
                if fan_in == 0 {
                    return Err(NeuraGraphError::ConfigurationError(
                        "lecun init requires fan_in > 0".to_string(),
                    ));
                }
                let weight_base = check_scale("lecun", scale)? / (fan_in as FloatT).sqrt();
                fill_uniform(values, weight_base, rng);
            }
            WeightInit::Gaussian { sigma } => {
                fill_normal(values, check_scale("gaussian", sigma)?, rng)?;
            }
            WeightInit::Constant { value } => values.fill(value),
            WeightInit::He { scale } => {
                if fan_in == 0 {
                    return Err(NeuraGraphError::ConfigurationError(
                        "he init requires fan_in > 0".to_string(),
                    ));
                }
                let sigma = (check_scale("he", scale)? / fan_in as FloatT).sqrt();
                fill_normal(values, sigma, rng)?;
            }
        }
        Ok(())
    }
}

impl Default for WeightInit {
    fn default() -> Self {
        WeightInit::xavier()
    }
}

fn check_scale(name: &str, scale: FloatT) -> Result<FloatT, NeuraGraphError> {
    if !scale.is_finite() || scale < 0.0 {
        return Err(NeuraGraphError::ConfigurationError(format!(
            "{name} init scale must be finite and non-negative, got {scale}"
        )));
    }
    Ok(scale)
}

fn fill_uniform<R: Rng + ?Sized>(values: &mut [FloatT], bound: FloatT, rng: &mut R) {
    let dist = Uniform::new_inclusive(-bound, bound);
    for v in values.iter_mut() {
        *v = dist.sample(rng);
    }
}

fn fill_normal<R: Rng + ?Sized>(
    values: &mut [FloatT],
    sigma: FloatT,
    rng: &mut R,
) -> Result<(), NeuraGraphError> {
    let dist = Normal::new(0.0, sigma).map_err(|e| {
        NeuraGraphError::ConfigurationError(format!("invalid normal distribution: {e}"))
    })?;
    for v in values.iter_mut() {
        *v = dist.sample(rng);
    }
    Ok(())
}

#[cfg(test)]
#[path = "init_test.rs"]
mod tests;
