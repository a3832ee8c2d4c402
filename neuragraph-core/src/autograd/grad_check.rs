use crate::error::NeuraGraphError;
use crate::graph::{GraphBuilder, LayerId, Network, NetworkConfig};
use crate::nn::config::LayerConfig;
use crate::nn::losses::Loss;
use crate::tensor::Tensor;
use crate::types::{FloatT, NetPhase, ParamKind, DEFAULT_GRAD_EPSILON};
use approx::AbsDiffEq;
use log::{debug, warn};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use std::fmt;
use thiserror::Error;

/// Failure to *run* a gradient check. A gradient that disagrees with its
/// finite-difference estimate is not an error; it shows up in the report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("Nothing to check: no trainable parameter element selected and input checking is disabled")]
    NoTargets,
    #[error("Network execution failed during gradient check: {0}")]
    Network(#[from] NeuraGraphError),
    #[error("Invalid gradient check settings: {0}")]
    InvalidSettings(String),
}

/// Which elements of each checked tensor are probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    All,
    /// Up to `samples_per_tensor` distinct elements per tensor, drawn from an
    /// RNG seeded with `seed`. The same seed always selects the same elements.
    Random { samples_per_tensor: usize, seed: u64 },
}

/// The scalar a gradient entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckTarget {
    Parameter {
        layer: LayerId,
        param: usize,
        kind: ParamKind,
        element: usize,
    },
    Input {
        input: usize,
        sample: usize,
        element: usize,
    },
}

impl fmt::Display for CheckTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckTarget::Parameter {
                layer,
                param,
                kind,
                element,
            } => write!(f, "layer {} param {param} ({kind:?}) [{element}]", layer.index()),
            CheckTarget::Input {
                input,
                sample,
                element,
            } => write!(f, "input {input} sample {sample} [{element}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradCheckEntry {
    pub target: CheckTarget,
    pub analytic: FloatT,
    pub numeric: FloatT,
    pub difference: FloatT,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradCheckReport {
    entries: Vec<GradCheckEntry>,
    tolerance: FloatT,
}

impl GradCheckReport {
    pub fn entries(&self) -> &[GradCheckEntry] {
        &self.entries
    }

    pub fn tolerance(&self) -> FloatT {
        self.tolerance
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn passed(&self) -> bool {
        self.entries.iter().all(|e| e.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &GradCheckEntry> + '_ {
        self.entries.iter().filter(|e| !e.passed)
    }

    pub fn max_difference(&self) -> FloatT {
        self.entries.iter().map(|e| e.difference).fold(0.0, FloatT::max)
    }
}

/// Compares back-propagated gradients with central finite differences
/// `(L(x + eps) - L(x - eps)) / 2 eps` of the summed loss.
///
/// Both sides are evaluated in the `Test` phase so that stochastic layers
/// behave deterministically. An entry passes when the absolute difference
/// `|analytic - numeric|` is within `tolerance`.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientChecker {
    epsilon: FloatT,
    tolerance: FloatT,
    mode: CheckMode,
    check_inputs: bool,
}

impl Default for GradientChecker {
    fn default() -> Self {
        GradientChecker {
            epsilon: DEFAULT_GRAD_EPSILON,
            tolerance: DEFAULT_GRAD_EPSILON,
            mode: CheckMode::All,
            check_inputs: false,
        }
    }
}

impl GradientChecker {
    pub fn new(epsilon: FloatT, tolerance: FloatT) -> Result<Self, GradCheckError> {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(GradCheckError::InvalidSettings(format!(
                "epsilon must be positive, got {epsilon}"
            )));
        }
        if !(tolerance.is_finite() && tolerance >= 0.0) {
            return Err(GradCheckError::InvalidSettings(format!(
                "tolerance must be non-negative, got {tolerance}"
            )));
        }
        Ok(GradientChecker {
            epsilon,
            tolerance,
            ..Self::default()
        })
    }

    pub fn with_mode(mut self, mode: CheckMode) -> Self {
        self.mode = mode;
        self
    }

    /// Also check the gradient w.r.t. the network inputs.
    pub fn with_inputs(mut self, check_inputs: bool) -> Self {
        self.check_inputs = check_inputs;
        self
    }

    pub fn epsilon(&self) -> FloatT {
        self.epsilon
    }

    pub fn tolerance(&self) -> FloatT {
        self.tolerance
    }

    pub fn mode(&self) -> CheckMode {
        self.mode
    }

    /// Checks every selected trainable parameter element (and optionally input
    /// element) of `network` for the loss `Σ loss(outputs, targets)`.
    ///
    /// Parameter values are restored bit-for-bit and every gradient
    /// accumulator is left cleared.
    pub fn check_network(
        &self,
        network: &mut Network,
        inputs: &[Tensor],
        targets: &[Tensor],
        loss: &dyn Loss,
    ) -> Result<GradCheckReport, GradCheckError> {
        if let CheckMode::Random { samples_per_tensor: 0, .. } = self.mode {
            return Err(GradCheckError::InvalidSettings(
                "random mode needs at least one sample per tensor".to_string(),
            ));
        }
        network.clear_gradients();
        network.compute_gradients_in_phase(inputs, targets, loss, NetPhase::Test)?;

        let mut rng = match self.mode {
            CheckMode::Random { seed, .. } => Some(StdRng::seed_from_u64(seed)),
            CheckMode::All => None,
        };

        let mut params = Vec::new();
        for (layer, param_index, param) in trainable_parameters(network) {
            let elements = self.select(param.len(), rng.as_mut());
            let analytic: Vec<FloatT> = elements.iter().map(|&e| param.grad()[e]).collect();
            params.push((layer, param_index, param.kind(), elements, analytic));
        }
        let mut input_probes = Vec::new();
        if self.check_inputs {
            for (k, grad) in network.input_gradients()?.into_iter().enumerate() {
                let elements = self.select(grad.as_slice().len(), rng.as_mut());
                let analytic: Vec<FloatT> = elements.iter().map(|&e| grad.as_slice()[e]).collect();
                input_probes.push((k, grad.sample_len(), elements, analytic));
            }
        }
        network.clear_gradients();

        let total: usize = params.iter().map(|p| p.3.len()).sum::<usize>()
            + input_probes.iter().map(|p| p.2.len()).sum::<usize>();
        if total == 0 {
            return Err(GradCheckError::NoTargets);
        }

        let mut entries = Vec::with_capacity(total);
        for (layer, param_index, kind, elements, analytic) in params {
            for (&element, &analytic) in elements.iter().zip(&analytic) {
                let numeric = self.numeric_parameter_gradient(
                    network,
                    layer,
                    param_index,
                    element,
                    inputs,
                    targets,
                    loss,
                )?;
                let target = CheckTarget::Parameter {
                    layer,
                    param: param_index,
                    kind,
                    element,
                };
                entries.push(self.entry(target, analytic, numeric));
            }
        }

        let mut probe: Vec<Tensor> = inputs.to_vec();
        for (k, sample_len, elements, analytic) in input_probes {
            for (&flat, &analytic) in elements.iter().zip(&analytic) {
                let original = probe[k].as_slice()[flat];
                probe[k].as_mut_slice()[flat] = original + self.epsilon;
                let plus = network.get_loss(&probe, targets, loss);
                probe[k].as_mut_slice()[flat] = original - self.epsilon;
                let minus = network.get_loss(&probe, targets, loss);
                probe[k].as_mut_slice()[flat] = original;
                let numeric = (plus? - minus?) / (2.0 * self.epsilon);
                let target = CheckTarget::Input {
                    input: k,
                    sample: flat / sample_len,
                    element: flat % sample_len,
                };
                entries.push(self.entry(target, analytic, numeric));
            }
        }

        let report = GradCheckReport {
            entries,
            tolerance: self.tolerance,
        };
        for failure in report.failures() {
            warn!(
                "gradient mismatch at {}: analytic {:e}, numeric {:e}, difference {:e}",
                failure.target, failure.analytic, failure.numeric, failure.difference
            );
        }
        debug!(
            "gradient check: {} entries, max difference {:e}",
            report.len(),
            report.max_difference()
        );
        Ok(report)
    }

    /// Checks one layer in isolation: each input slot is fed by its own input
    /// layer, and the loss is a random linear functional `Σ y·t` of the
    /// outputs. Input gradients are always checked.
    pub fn check_layer(
        &self,
        config: &LayerConfig,
        inputs: &[Tensor],
        seed: u64,
    ) -> Result<GradCheckReport, GradCheckError> {
        let shapes = config.shape_for()?;
        let mut builder = GraphBuilder::new();
        let mut input_layers = Vec::with_capacity(shapes.inputs.len());
        for shape in &shapes.inputs {
            input_layers.push(builder.add_layer(LayerConfig::input(*shape))?);
        }
        let layer = builder.add_layer(config.clone())?;
        for (slot, input) in input_layers.iter().enumerate() {
            let edge = builder.output_edge(*input, 0)?;
            builder.connect(edge, layer, slot)?;
        }
        let mut network = builder.build(
            &input_layers,
            &[layer],
            NetworkConfig::default().with_threads(1).with_seed(seed),
        )?;

        let batch = inputs.first().map_or(0, Tensor::sample_count);
        let mut rng = StdRng::seed_from_u64(seed);
        let uniform = Uniform::new_inclusive(-1.0, 1.0);
        let targets: Vec<Tensor> = shapes
            .outputs
            .iter()
            .map(|shape| {
                let data = (0..batch * shape.size()).map(|_| uniform.sample(&mut rng)).collect();
                Tensor::from_vec(data, batch, shape.size())
            })
            .collect::<Result<_, _>>()?;

        self.clone()
            .with_inputs(true)
            .check_network(&mut network, inputs, &targets, &LinearProjection)
    }

    fn select(&self, len: usize, rng: Option<&mut StdRng>) -> Vec<usize> {
        match (self.mode, rng) {
            (CheckMode::Random { samples_per_tensor, .. }, Some(rng)) => {
                let mut picked = index::sample(rng, len, samples_per_tensor.min(len)).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..len).collect(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn numeric_parameter_gradient(
        &self,
        network: &mut Network,
        layer: LayerId,
        param: usize,
        element: usize,
        inputs: &[Tensor],
        targets: &[Tensor],
        loss: &dyn Loss,
    ) -> Result<FloatT, GradCheckError> {
        let original = parameter_value(network, layer, param, element)?;
        set_parameter_value(network, layer, param, element, original + self.epsilon)?;
        let plus = network.get_loss(inputs, targets, loss);
        set_parameter_value(network, layer, param, element, original - self.epsilon)?;
        let minus = network.get_loss(inputs, targets, loss);
        set_parameter_value(network, layer, param, element, original)?;
        Ok((plus? - minus?) / (2.0 * self.epsilon))
    }

    fn entry(&self, target: CheckTarget, analytic: FloatT, numeric: FloatT) -> GradCheckEntry {
        let difference = (analytic - numeric).abs();
        let passed = numeric.is_finite()
            && analytic.is_finite()
            && analytic.abs_diff_eq(&numeric, self.tolerance);
        GradCheckEntry {
            target,
            analytic,
            numeric,
            difference,
            passed,
        }
    }
}

fn trainable_parameters(
    network: &Network,
) -> impl Iterator<Item = (LayerId, usize, &crate::nn::parameter::Parameter)> + '_ {
    network.nodes().iter().enumerate().flat_map(|(l, node)| {
        node.layer()
            .parameters()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_trainable())
            .map(move |(i, p)| (LayerId(l), i, p))
    })
}

fn parameter_value(
    network: &Network,
    layer: LayerId,
    param: usize,
    element: usize,
) -> Result<FloatT, GradCheckError> {
    let parameter = network
        .layer(layer)?
        .parameters()
        .get(param)
        .ok_or(NeuraGraphError::IndexOutOfBounds { index: param, len: 0 })?;
    parameter
        .value()
        .get(element)
        .copied()
        .ok_or_else(|| {
            GradCheckError::Network(NeuraGraphError::IndexOutOfBounds {
                index: element,
                len: parameter.len(),
            })
        })
}

fn set_parameter_value(
    network: &mut Network,
    layer: LayerId,
    param: usize,
    element: usize,
    value: FloatT,
) -> Result<(), GradCheckError> {
    let slot = network
        .parameter_mut(layer, param)
        .and_then(|p| p.value_mut().get_mut(element))
        .ok_or(NeuraGraphError::IndexOutOfBounds { index: element, len: 0 })?;
    *slot = value;
    Ok(())
}

/// `Σ y·t`: its gradient w.r.t. `y` is `t` itself.
#[derive(Debug, Clone, Copy)]
struct LinearProjection;

impl Loss for LinearProjection {
    fn loss(&self, y: &[FloatT], t: &[FloatT]) -> FloatT {
        y.iter().zip(t).map(|(a, b)| a * b).sum()
    }

    fn gradient_into(&self, _y: &[FloatT], t: &[FloatT], grad: &mut [FloatT]) {
        grad.copy_from_slice(t);
    }
}

#[cfg(test)]
#[path = "grad_check_test.rs"]
mod tests;
