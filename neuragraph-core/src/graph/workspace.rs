//! Worker-private execution state.
//!
//! A [`Workspace`] holds everything a forward/backward pass writes: the
//! activation and gradient of every edge, the data fed to each input layer,
//! per-layer scratch and per-parameter gradient buffers. Layers themselves are
//! only read, so any number of workspaces can run over the same network at
//! once.

use crate::error::NeuraGraphError;
use crate::graph::edge::{Edge, EdgeBuffers, EdgeId, LayerId};
use crate::graph::node::LayerNode;
use crate::nn::layer::{BackwardPass, LayerScratch};
use crate::nn::losses::Loss;
use crate::tensor::Tensor;
use crate::types::{FloatT, NetPhase};
use std::ops::Range;

/// Read-only view of a built network shared by every worker.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GraphView<'a> {
    pub nodes: &'a [LayerNode],
    pub edges: &'a [Edge],
    pub order: &'a [LayerId],
    pub output_edges: &'a [EdgeId],
    /// Position among the designated inputs, for input layers.
    pub feed_index: &'a [Option<usize>],
    pub feed_count: usize,
}

#[derive(Debug)]
pub(crate) struct Workspace {
    pub(crate) buffers: Vec<EdgeBuffers>,
    /// Data fed to each designated input and the loss gradient w.r.t. it.
    pub(crate) feeds: Vec<EdgeBuffers>,
    scratch: Vec<LayerScratch>,
    /// Per layer, per parameter, ordered like `LayerOp::parameters`.
    pub(crate) param_grads: Vec<Vec<Vec<FloatT>>>,
    in_grads: Vec<Vec<Tensor>>,
    loss_grad: Vec<FloatT>,
    batch: usize,
}

impl Workspace {
    pub(crate) fn new(view: &GraphView<'_>, seed: u64) -> Self {
        let scratch = (0..view.nodes.len())
            .map(|i| LayerScratch::new(seed ^ (i as u64 + 1).wrapping_mul(0xA076_1D64_78BD_642F)))
            .collect();
        let param_grads = view
            .nodes
            .iter()
            .map(|node| {
                node.layer
                    .parameters()
                    .iter()
                    .map(|p| vec![0.0; p.len()])
                    .collect()
            })
            .collect();
        let in_grads = view
            .nodes
            .iter()
            .map(|node| vec![Tensor::default(); node.layer.in_shapes().len()])
            .collect();
        Workspace {
            buffers: vec![EdgeBuffers::default(); view.edges.len()],
            feeds: vec![EdgeBuffers::default(); view.feed_count],
            scratch,
            param_grads,
            in_grads,
            loss_grad: Vec::new(),
            batch: 0,
        }
    }

    /// Copies samples `range` of every input tensor into the feed buffers.
    pub(crate) fn load(&mut self, inputs: &[Tensor], range: Range<usize>) -> Result<(), NeuraGraphError> {
        self.batch = range.len();
        for (feed, input) in self.feeds.iter_mut().zip(inputs) {
            feed.value = input.slice_samples(range.clone())?;
        }
        Ok(())
    }

    pub(crate) fn forward(&mut self, view: &GraphView<'_>, phase: NetPhase) -> Result<(), NeuraGraphError> {
        let Workspace {
            buffers,
            feeds,
            scratch,
            batch,
            ..
        } = self;
        let batch = *batch;
        for &id in view.order {
            let node = &view.nodes[id.0];
            let mut outputs: Vec<Tensor> = node
                .outputs
                .iter()
                .map(|e| std::mem::take(&mut buffers[e.0].value))
                .collect();
            for (tensor, shape) in outputs.iter_mut().zip(node.layer.out_shapes()) {
                tensor.reset(batch, shape.size());
            }
            let result = gather_inputs(view, id, buffers, feeds).and_then(|inputs| {
                node.layer
                    .op()
                    .forward(&inputs, &mut outputs, phase, &mut scratch[id.0])
            });
            let checked = result.and_then(|()| verify_outputs(id, node, &outputs, batch));
            for (e, tensor) in node.outputs.iter().zip(outputs) {
                buffers[e.0].value = tensor;
            }
            checked?;
        }
        Ok(())
    }

    /// Zeroes every gradient buffer ahead of a backward pass.
    pub(crate) fn clear_gradients(&mut self, view: &GraphView<'_>) {
        let batch = self.batch;
        for (buf, edge) in self.buffers.iter_mut().zip(view.edges) {
            buf.grad.reset(batch, edge.shape().size());
        }
        for feed in self.feeds.iter_mut() {
            let len = feed.value.sample_len();
            feed.grad.reset(batch, len);
        }
        for grads in self.param_grads.iter_mut().flatten() {
            grads.fill(0.0);
        }
    }

    /// Evaluates `loss` on every output edge and returns its sum over samples
    /// and outputs. With `seed_grads` the loss gradient is added into the
    /// output edges' gradient buffers.
    pub(crate) fn apply_loss(
        &mut self,
        view: &GraphView<'_>,
        targets: &[Tensor],
        offset: usize,
        loss: &dyn Loss,
        seed_grads: bool,
    ) -> FloatT {
        let Workspace {
            buffers,
            loss_grad,
            batch,
            ..
        } = self;
        let mut total = 0.0;
        for (e, target) in view.output_edges.iter().zip(targets) {
            let EdgeBuffers { value, grad } = &mut buffers[e.0];
            for s in 0..*batch {
                let y = value.sample(s);
                let t = target.sample(offset + s);
                total += loss.loss(y, t);
                if seed_grads {
                    loss_grad.clear();
                    loss_grad.resize(y.len(), 0.0);
                    loss.gradient_into(y, t, loss_grad);
                    for (g, d) in grad.sample_mut(s).iter_mut().zip(loss_grad.iter()) {
                        *g += *d;
                    }
                }
            }
        }
        total
    }

    pub(crate) fn backward(&mut self, view: &GraphView<'_>, phase: NetPhase) -> Result<(), NeuraGraphError> {
        let Workspace {
            buffers,
            feeds,
            scratch,
            param_grads,
            in_grads,
            batch,
            ..
        } = self;
        for &id in view.order.iter().rev() {
            let node = &view.nodes[id.0];
            let mut grads = std::mem::take(&mut in_grads[id.0]);
            for (grad, shape) in grads.iter_mut().zip(node.layer.in_shapes()) {
                grad.reset(*batch, shape.size());
            }
            let result = gather_inputs(view, id, buffers, feeds).and_then(|inputs| {
                let outputs: Vec<&Tensor> = node.outputs.iter().map(|e| &buffers[e.0].value).collect();
                let out_grads: Vec<&Tensor> = node.outputs.iter().map(|e| &buffers[e.0].grad).collect();
                let pass = BackwardPass {
                    inputs: &inputs,
                    outputs: &outputs,
                    out_grads: &out_grads,
                    phase,
                };
                node.layer
                    .op()
                    .backward(pass, &mut grads, &mut param_grads[id.0], &mut scratch[id.0])
            });
            let routed = result.and_then(|()| {
                if let Some(k) = view.feed_index[id.0] {
                    return feeds[k].grad.add_assign(&grads[0]);
                }
                for (slot, grad) in node.inputs.iter().zip(&grads) {
                    if let Some(e) = slot {
                        buffers[e.0].grad.add_assign(grad)?;
                    }
                }
                Ok(())
            });
            in_grads[id.0] = grads;
            routed?;
        }
        Ok(())
    }
}

fn gather_inputs<'b>(
    view: &GraphView<'_>,
    id: LayerId,
    buffers: &'b [EdgeBuffers],
    feeds: &'b [EdgeBuffers],
) -> Result<Vec<&'b Tensor>, NeuraGraphError> {
    let node = &view.nodes[id.0];
    if let Some(k) = view.feed_index[id.0] {
        return Ok(vec![&feeds[k].value]);
    }
    node.inputs
        .iter()
        .enumerate()
        .map(|(slot, edge)| {
            edge.map(|e| &buffers[e.0].value)
                .ok_or_else(|| NeuraGraphError::UnconnectedInput {
                    layer: id.0,
                    slot,
                    layer_type: node.layer.layer_type().to_string(),
                })
        })
        .collect()
}

fn verify_outputs(
    id: LayerId,
    node: &LayerNode,
    outputs: &[Tensor],
    batch: usize,
) -> Result<(), NeuraGraphError> {
    for (port, (tensor, shape)) in outputs.iter().zip(node.layer.out_shapes()).enumerate() {
        if tensor.sample_len() != shape.size() || tensor.sample_count() != batch {
            return Err(NeuraGraphError::ShapeMismatch {
                layer: id.0,
                layer_type: node.layer.layer_type().to_string(),
                port,
                expected: shape.size(),
                actual: tensor.sample_len(),
                expected_samples: batch,
                actual_samples: tensor.sample_count(),
            });
        }
    }
    Ok(())
}
