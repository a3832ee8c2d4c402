use crate::error::NeuraGraphError;
use crate::graph::edge::{Edge, EdgeId, LayerId};
use crate::graph::node::LayerNode;
use crate::graph::workspace::{GraphView, Workspace};
use crate::nn::config::LayerConfig;
use crate::nn::init::WeightInit;
use crate::nn::layer::Layer;
use crate::nn::losses::Loss;
use crate::nn::parameter::Parameter;
use crate::optim::Optimizer;
use crate::scheduler::BatchScheduler;
use crate::tensor::{argmax, Tensor};
use crate::types::{FloatT, NetPhase, ParamKind, Shape3d};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::slice;

/// How a network was assembled. Purely informational after build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMode {
    Sequential,
    Graph,
}

/// Execution settings fixed when a network is built.
///
/// The default runs on one worker thread, so a seeded run gives the same
/// result on every machine. [`NetworkConfig::with_threads`] splits batches
/// across workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Worker threads used to split each batch.
    pub threads: usize,
    /// Seeds weight initialisation and per-worker layer randomness.
    pub seed: u64,
    pub weight_init: WeightInit,
    pub bias_init: WeightInit,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            threads: 1,
            seed: 0,
            weight_init: WeightInit::xavier(),
            bias_init: WeightInit::constant(0.0),
        }
    }
}

impl NetworkConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_weight_init(mut self, init: WeightInit) -> Self {
        self.weight_init = init;
        self
    }

    pub fn with_bias_init(mut self, init: WeightInit) -> Self {
        self.bias_init = init;
        self
    }

    pub fn validate(&self) -> Result<(), NeuraGraphError> {
        if self.threads == 0 {
            return Err(NeuraGraphError::ConfigurationError(
                "thread count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Options of [`Network::fit`] and [`Network::train_labels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitOptions {
    pub batch_size: usize,
    pub epochs: usize,
    /// Re-initialise weights and optimizer state before the first epoch.
    pub reset_weights: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            batch_size: 1,
            epochs: 1,
            reset_weights: false,
        }
    }
}

impl FitOptions {
    pub fn new(batch_size: usize, epochs: usize) -> Result<Self, NeuraGraphError> {
        let options = FitOptions {
            batch_size,
            epochs,
            reset_weights: false,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), NeuraGraphError> {
        if self.batch_size == 0 {
            return Err(NeuraGraphError::ConfigurationError(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Classification outcome of [`Network::test`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub num_success: usize,
    pub num_total: usize,
    /// `confusion_matrix[predicted][actual]`.
    pub confusion_matrix: Vec<Vec<usize>>,
}

impl TestResult {
    pub fn accuracy(&self) -> f64 {
        if self.num_total == 0 {
            return 0.0;
        }
        self.num_success as f64 / self.num_total as f64
    }
}

/// A validated layer graph ready to run.
///
/// Layers and edges live in arenas addressed by [`LayerId`] / [`EdgeId`].
/// Each batch is split across the scheduler's workers; every worker runs the
/// cached topological order over its own [`Workspace`] and the per-parameter
/// gradients are merged in worker order afterwards.
#[derive(Debug)]
pub struct Network {
    nodes: Vec<LayerNode>,
    edges: Vec<Edge>,
    inputs: Vec<LayerId>,
    outputs: Vec<LayerId>,
    output_edges: Vec<EdgeId>,
    order: Vec<LayerId>,
    feed_index: Vec<Option<usize>>,
    mode: NetworkMode,
    config: NetworkConfig,
    phase: NetPhase,
    scheduler: BatchScheduler,
    workspaces: Vec<Workspace>,
    active_workers: usize,
    warned_idle_workers: bool,
}

impl Network {
    pub(crate) fn assemble(
        nodes: Vec<LayerNode>,
        edges: Vec<Edge>,
        inputs: Vec<LayerId>,
        outputs: Vec<LayerId>,
        order: Vec<LayerId>,
        mode: NetworkMode,
        config: NetworkConfig,
    ) -> Result<Self, NeuraGraphError> {
        let output_edges = outputs
            .iter()
            .flat_map(|id| nodes[id.0].outputs.iter().copied())
            .collect();
        let mut feed_index = vec![None; nodes.len()];
        for (k, id) in inputs.iter().enumerate() {
            feed_index[id.0] = Some(k);
        }
        let scheduler = BatchScheduler::new(config.threads)?;
        let mut network = Network {
            nodes,
            edges,
            inputs,
            outputs,
            output_edges,
            order,
            feed_index,
            mode,
            config,
            phase: NetPhase::Train,
            scheduler,
            workspaces: Vec::new(),
            active_workers: 0,
            warned_idle_workers: false,
        };
        network.init_weights()?;
        Ok(network)
    }

    // ---- Introspection ----

    pub fn mode(&self) -> NetworkMode {
        self.mode
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn layer_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[LayerNode] {
        &self.nodes
    }

    pub fn node(&self, id: LayerId) -> Result<&LayerNode, NeuraGraphError> {
        self.nodes.get(id.0).ok_or(NeuraGraphError::UnknownLayer(id.0))
    }

    pub fn edge(&self, id: EdgeId) -> Result<&Edge, NeuraGraphError> {
        self.edges.get(id.0).ok_or(NeuraGraphError::UnknownEdge(id.0))
    }

    pub fn layer(&self, id: LayerId) -> Result<&Layer, NeuraGraphError> {
        self.node(id).map(|n| &n.layer)
    }

    /// Mutable access to a layer, e.g. to edit parameter values or flags.
    pub fn layer_mut(&mut self, id: LayerId) -> Result<&mut Layer, NeuraGraphError> {
        self.nodes
            .get_mut(id.0)
            .map(|n| &mut n.layer)
            .ok_or(NeuraGraphError::UnknownLayer(id.0))
    }

    pub fn layer_config(&self, id: LayerId) -> Result<&LayerConfig, NeuraGraphError> {
        self.node(id).map(|n| &n.config)
    }

    pub fn inputs(&self) -> &[LayerId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[LayerId] {
        &self.outputs
    }

    pub fn output_edges(&self) -> &[EdgeId] {
        &self.output_edges
    }

    pub fn input_shapes(&self) -> Vec<Shape3d> {
        self.inputs
            .iter()
            .map(|id| self.nodes[id.0].layer.in_shapes()[0])
            .collect()
    }

    pub fn output_shapes(&self) -> Vec<Shape3d> {
        self.output_edges.iter().map(|e| self.edges[e.0].shape()).collect()
    }

    /// Layers in the order forward propagation visits them.
    pub fn forward_order(&self) -> &[LayerId] {
        &self.order
    }

    pub fn backward_order(&self) -> Vec<LayerId> {
        self.order.iter().rev().copied().collect()
    }

    /// Every parameter with its owning layer, in layer then parameter order.
    pub fn parameters(&self) -> impl Iterator<Item = (LayerId, &Parameter)> + '_ {
        self.nodes.iter().enumerate().flat_map(|(i, node)| {
            node.layer.parameters().iter().map(move |p| (LayerId(i), p))
        })
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters().map(|(_, p)| p.len()).sum()
    }

    pub(crate) fn parameter_mut(&mut self, layer: LayerId, index: usize) -> Option<&mut Parameter> {
        self.nodes
            .get_mut(layer.0)?
            .layer
            .parameters_mut()
            .get_mut(index)
    }

    /// Phase used by gradient passes; prediction always runs in `Test`.
    pub fn phase(&self) -> NetPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: NetPhase) {
        self.phase = phase;
    }

    pub fn threads(&self) -> usize {
        self.scheduler.threads()
    }

    /// Replaces the worker pool. Edge values of the last run are discarded.
    pub fn set_threads(&mut self, threads: usize) -> Result<(), NeuraGraphError> {
        self.scheduler = BatchScheduler::new(threads)?;
        self.config.threads = threads;
        self.workspaces.clear();
        self.active_workers = 0;
        self.warned_idle_workers = false;
        Ok(())
    }

    // ---- Weights ----

    /// Re-initialises every trainable parameter from the configured policies,
    /// with an RNG seeded by `config.seed`.
    pub fn init_weights(&mut self) -> Result<(), NeuraGraphError> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let (weight_init, bias_init) = (self.config.weight_init, self.config.bias_init);
        for node in self.nodes.iter_mut() {
            let fan_in = node.layer.op().fan_in_size();
            let fan_out = node.layer.op().fan_out_size();
            for param in node.layer.parameters_mut() {
                if param.is_trainable() {
                    let init = match param.kind() {
                        ParamKind::Weight => weight_init,
                        ParamKind::Bias => bias_init,
                    };
                    init.fill(param.value_mut(), fan_in, fan_out, &mut rng)?;
                }
                param.clear_grad();
            }
        }
        Ok(())
    }

    /// Sets the weight policy and re-initialises.
    pub fn set_weight_init(&mut self, init: WeightInit) -> Result<(), NeuraGraphError> {
        self.config.weight_init = init;
        self.init_weights()
    }

    /// Sets the bias policy and re-initialises.
    pub fn set_bias_init(&mut self, init: WeightInit) -> Result<(), NeuraGraphError> {
        self.config.bias_init = init;
        self.init_weights()
    }

    /// True when both networks hold the same parameter layout and every value
    /// agrees within `eps`.
    pub fn has_same_weights(&self, other: &Network, eps: FloatT) -> bool {
        if self.nodes.len() != other.nodes.len() {
            return false;
        }
        self.nodes.iter().zip(&other.nodes).all(|(a, b)| {
            let (pa, pb) = (a.layer.parameters(), b.layer.parameters());
            pa.len() == pb.len()
                && pa.iter().zip(pb).all(|(x, y)| {
                    x.len() == y.len()
                        && x.value()
                            .iter()
                            .zip(y.value())
                            .all(|(u, v)| (u - v).abs() <= eps)
                })
        })
    }

    pub fn clear_gradients(&mut self) {
        for node in self.nodes.iter_mut() {
            for param in node.layer.parameters_mut() {
                param.clear_grad();
            }
        }
    }

    // ---- Execution ----

    /// Forward pass in `Test` phase; one tensor per output edge.
    pub fn predict(&mut self, inputs: &[Tensor]) -> Result<Vec<Tensor>, NeuraGraphError> {
        self.run(inputs, None, false, NetPhase::Test)?;
        self.output_edges
            .iter()
            .map(|e| self.edge_value(*e))
            .collect()
    }

    /// Single-input, single-sample prediction of the first output.
    pub fn predict_sample(&mut self, sample: &[FloatT]) -> Result<Vec<FloatT>, NeuraGraphError> {
        let outputs = self.predict(slice::from_ref(&Tensor::from_sample(sample)))?;
        Ok(outputs.into_iter().next().map(Tensor::into_vec).unwrap_or_default())
    }

    /// Index of the largest value of the first output.
    pub fn predict_label(&mut self, sample: &[FloatT]) -> Result<usize, NeuraGraphError> {
        Ok(argmax(&self.predict_sample(sample)?))
    }

    /// Single-input prediction of the first output for many samples.
    pub fn predict_batch<S: AsRef<[FloatT]>>(
        &mut self,
        samples: &[S],
    ) -> Result<Vec<Vec<FloatT>>, NeuraGraphError> {
        let batch = Tensor::from_samples(samples)?;
        let outputs = self.predict(slice::from_ref(&batch))?;
        Ok(outputs.first().map(Tensor::to_samples).unwrap_or_default())
    }

    /// Activation of `edge` from the last run, stitched across workers.
    pub fn edge_value(&self, edge: EdgeId) -> Result<Tensor, NeuraGraphError> {
        let size = self.edge(edge)?.shape().size();
        if self.active_workers == 0 {
            return Ok(Tensor::zeros(0, size));
        }
        let parts: Vec<&Tensor> = self.workspaces[..self.active_workers]
            .iter()
            .map(|ws| &ws.buffers[edge.0].value)
            .collect();
        Tensor::concat_samples(&parts)
    }

    /// Loss gradient w.r.t. each network input from the last gradient pass.
    pub fn input_gradients(&self) -> Result<Vec<Tensor>, NeuraGraphError> {
        (0..self.inputs.len())
            .map(|k| {
                let parts: Vec<&Tensor> = self.workspaces[..self.active_workers]
                    .iter()
                    .map(|ws| &ws.feeds[k].grad)
                    .collect();
                Tensor::concat_samples(&parts)
            })
            .collect()
    }

    /// Sum of `loss` over samples and outputs, forward only, `Test` phase.
    pub fn get_loss(
        &mut self,
        inputs: &[Tensor],
        targets: &[Tensor],
        loss: &dyn Loss,
    ) -> Result<FloatT, NeuraGraphError> {
        self.run(inputs, Some((targets, loss)), false, NetPhase::Test)
    }

    /// Forward and backward over the batch, adding the summed gradient into
    /// every parameter's accumulator. Returns the mean loss per sample.
    pub fn compute_gradients(
        &mut self,
        inputs: &[Tensor],
        targets: &[Tensor],
        loss: &dyn Loss,
    ) -> Result<FloatT, NeuraGraphError> {
        let phase = self.phase;
        let total = self.compute_gradients_in_phase(inputs, targets, loss, phase)?;
        Ok(total / inputs[0].sample_count() as FloatT)
    }

    /// Gradient pass returning the loss sum.
    pub(crate) fn compute_gradients_in_phase(
        &mut self,
        inputs: &[Tensor],
        targets: &[Tensor],
        loss: &dyn Loss,
        phase: NetPhase,
    ) -> Result<FloatT, NeuraGraphError> {
        self.run(inputs, Some((targets, loss)), true, phase)
    }

    /// Hands `grad / batch_size` of every trainable parameter to `optimizer`,
    /// then clears all accumulators.
    pub fn apply_gradients(
        &mut self,
        optimizer: &mut dyn Optimizer,
        batch_size: usize,
    ) -> Result<(), NeuraGraphError> {
        if batch_size == 0 {
            return Err(NeuraGraphError::data_mismatch("optimizer batch size", 1, 0));
        }
        let scale = 1.0 / batch_size as FloatT;
        let mut scaled = Vec::new();
        for node in self.nodes.iter_mut() {
            for param in node.layer.parameters_mut() {
                if param.is_trainable() {
                    scaled.clear();
                    scaled.extend(param.grad().iter().map(|g| g * scale));
                    let id = param.id();
                    optimizer.update(id, &scaled, param.value_mut())?;
                }
                param.clear_grad();
            }
        }
        Ok(())
    }

    /// One optimizer step on a batch; returns the mean loss before the update.
    pub fn train_step(
        &mut self,
        inputs: &[Tensor],
        targets: &[Tensor],
        loss: &dyn Loss,
        optimizer: &mut dyn Optimizer,
    ) -> Result<FloatT, NeuraGraphError> {
        let mean = self.compute_gradients(inputs, targets, loss)?;
        self.apply_gradients(optimizer, inputs[0].sample_count())?;
        Ok(mean)
    }

    /// Mini-batch training of a single-input, single-output network.
    ///
    /// Samples are visited in order; the last batch of an epoch may be short.
    /// Returns the mean loss of every epoch.
    pub fn fit(
        &mut self,
        inputs: &Tensor,
        targets: &Tensor,
        loss: &dyn Loss,
        optimizer: &mut dyn Optimizer,
        options: &FitOptions,
    ) -> Result<Vec<FloatT>, NeuraGraphError> {
        options.validate()?;
        if self.inputs.len() != 1 || self.output_edges.len() != 1 {
            return Err(NeuraGraphError::ConfigurationError(
                "fit requires a single-input, single-output network".to_string(),
            ));
        }
        let n = inputs.sample_count();
        if n == 0 {
            return Err(NeuraGraphError::data_mismatch("training samples", 1, 0));
        }
        if targets.sample_count() != n {
            return Err(NeuraGraphError::data_mismatch(
                "training targets",
                n,
                targets.sample_count(),
            ));
        }
        if options.reset_weights {
            self.init_weights()?;
            optimizer.reset();
        }
        let mut history = Vec::with_capacity(options.epochs);
        for epoch in 0..options.epochs {
            let mut total = 0.0;
            let mut start = 0;
            while start < n {
                let end = (start + options.batch_size).min(n);
                let x = inputs.slice_samples(start..end)?;
                let t = targets.slice_samples(start..end)?;
                let phase = self.phase;
                total += self.compute_gradients_in_phase(
                    slice::from_ref(&x),
                    slice::from_ref(&t),
                    loss,
                    phase,
                )?;
                self.apply_gradients(optimizer, end - start)?;
                start = end;
            }
            let mean = total / n as FloatT;
            info!("epoch {}/{}: mean loss {:.6}", epoch + 1, options.epochs, mean);
            history.push(mean);
        }
        Ok(history)
    }

    /// [`Network::fit`] on class labels, turned into one-hot targets scaled to
    /// the value range of the output activation.
    pub fn train_labels(
        &mut self,
        inputs: &Tensor,
        labels: &[usize],
        loss: &dyn Loss,
        optimizer: &mut dyn Optimizer,
        options: &FitOptions,
    ) -> Result<Vec<FloatT>, NeuraGraphError> {
        let targets = self.labels_to_targets(labels)?;
        self.fit(inputs, &targets, loss, optimizer, options)
    }

    /// One-hot targets for `labels` using the output activation's range.
    pub fn labels_to_targets(&self, labels: &[usize]) -> Result<Tensor, NeuraGraphError> {
        let size = self.first_output_size()?;
        let (low, high) = match self.outputs.first().map(|id| &self.nodes[id.0].config) {
            Some(LayerConfig::Activation { function, .. }) => function.target_range(),
            _ => (0.0, 1.0),
        };
        let mut data = Vec::with_capacity(labels.len() * size);
        for &label in labels {
            if label >= size {
                return Err(NeuraGraphError::IndexOutOfBounds { index: label, len: size });
            }
            let start = data.len();
            data.resize(start + size, low);
            data[start + label] = high;
        }
        Tensor::from_vec(data, labels.len(), size)
    }

    /// Classifies every sample and compares the arg-max with `labels`.
    pub fn test(&mut self, inputs: &Tensor, labels: &[usize]) -> Result<TestResult, NeuraGraphError> {
        if labels.len() != inputs.sample_count() {
            return Err(NeuraGraphError::data_mismatch(
                "test labels",
                inputs.sample_count(),
                labels.len(),
            ));
        }
        let size = self.first_output_size()?;
        let mut result = TestResult {
            num_success: 0,
            num_total: labels.len(),
            confusion_matrix: vec![vec![0; size]; size],
        };
        if labels.is_empty() {
            return Ok(result);
        }
        let outputs = self.predict(slice::from_ref(inputs))?;
        for (s, &actual) in labels.iter().enumerate() {
            if actual >= size {
                return Err(NeuraGraphError::IndexOutOfBounds { index: actual, len: size });
            }
            let predicted = outputs[0].argmax(s);
            result.confusion_matrix[predicted][actual] += 1;
            if predicted == actual {
                result.num_success += 1;
            }
        }
        Ok(result)
    }

    fn first_output_size(&self) -> Result<usize, NeuraGraphError> {
        self.output_edges
            .first()
            .map(|e| self.edges[e.0].shape().size())
            .ok_or_else(|| NeuraGraphError::ConfigurationError("network has no output".to_string()))
    }

    fn check_batch(
        &self,
        inputs: &[Tensor],
        targets: Option<&[Tensor]>,
    ) -> Result<usize, NeuraGraphError> {
        if inputs.len() != self.inputs.len() {
            return Err(NeuraGraphError::data_mismatch(
                "number of input tensors",
                self.inputs.len(),
                inputs.len(),
            ));
        }
        let batch = inputs.first().map_or(0, Tensor::sample_count);
        if batch == 0 {
            return Err(NeuraGraphError::data_mismatch("batch size", 1, 0));
        }
        for (k, (tensor, shape)) in inputs.iter().zip(self.input_shapes()).enumerate() {
            if tensor.sample_len() != shape.size() {
                return Err(NeuraGraphError::data_mismatch(
                    format!("sample length of input {k}"),
                    shape.size(),
                    tensor.sample_len(),
                ));
            }
            if tensor.sample_count() != batch {
                return Err(NeuraGraphError::data_mismatch(
                    format!("sample count of input {k}"),
                    batch,
                    tensor.sample_count(),
                ));
            }
        }
        if let Some(targets) = targets {
            if targets.len() != self.output_edges.len() {
                return Err(NeuraGraphError::data_mismatch(
                    "number of target tensors",
                    self.output_edges.len(),
                    targets.len(),
                ));
            }
            for (k, (tensor, shape)) in targets.iter().zip(self.output_shapes()).enumerate() {
                if tensor.sample_len() != shape.size() {
                    return Err(NeuraGraphError::data_mismatch(
                        format!("sample length of target {k}"),
                        shape.size(),
                        tensor.sample_len(),
                    ));
                }
                if tensor.sample_count() != batch {
                    return Err(NeuraGraphError::data_mismatch(
                        format!("sample count of target {k}"),
                        batch,
                        tensor.sample_count(),
                    ));
                }
            }
        }
        Ok(batch)
    }

    /// Runs one batch through the scheduler and returns the loss sum (zero
    /// without targets). With `backward`, per-worker parameter gradients are
    /// merged into the accumulators in worker order.
    fn run(
        &mut self,
        inputs: &[Tensor],
        supervision: Option<(&[Tensor], &dyn Loss)>,
        backward: bool,
        phase: NetPhase,
    ) -> Result<FloatT, NeuraGraphError> {
        let batch = self.check_batch(inputs, supervision.map(|(t, _)| t))?;
        let threads = self.scheduler.threads();
        if batch < threads && !self.warned_idle_workers {
            warn!("batch of {batch} samples leaves {} of {threads} workers idle", threads - batch);
            self.warned_idle_workers = true;
        }
        let ranges = BatchScheduler::partition(batch, threads);

        let Network {
            nodes,
            edges,
            order,
            output_edges,
            feed_index,
            inputs: input_layers,
            scheduler,
            workspaces,
            config,
            active_workers,
            ..
        } = self;
        let view = GraphView {
            nodes,
            edges,
            order,
            output_edges,
            feed_index,
            feed_count: input_layers.len(),
        };
        while workspaces.len() < ranges.len() {
            let worker = workspaces.len() as u64;
            let seed = config.seed ^ (worker + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
            workspaces.push(Workspace::new(&view, seed));
        }
        *active_workers = 0;

        let results = scheduler.run(
            &mut workspaces[..ranges.len()],
            &ranges,
            |ws: &mut Workspace, range| -> Result<FloatT, NeuraGraphError> {
                let offset = range.start;
                ws.load(inputs, range)?;
                ws.forward(&view, phase)?;
                let Some((targets, loss)) = supervision else {
                    return Ok(0.0);
                };
                if backward {
                    ws.clear_gradients(&view);
                }
                let total = ws.apply_loss(&view, targets, offset, loss, backward);
                if backward {
                    ws.backward(&view, phase)?;
                }
                Ok(total)
            },
        );
        let mut total = 0.0;
        for result in results {
            total += result?;
        }
        *active_workers = ranges.len();

        if backward {
            for (l, node) in self.nodes.iter_mut().enumerate() {
                for (p, param) in node.layer.parameters_mut().iter_mut().enumerate() {
                    for ws in &self.workspaces[..ranges.len()] {
                        param.accumulate(&ws.param_grads[l][p])?;
                    }
                }
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
#[path = "network_test.rs"]
mod tests;
