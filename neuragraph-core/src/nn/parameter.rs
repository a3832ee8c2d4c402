use crate::error::NeuraGraphError;
use crate::types::{FloatT, ParamKind, Shape3d};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PARAM_ID: AtomicU64 = AtomicU64::new(0);

/// Stable identity of a [`Parameter`].
///
/// Optimizers key their per-parameter state on it, so the id never changes
/// while the parameter lives, even though its buffers are rewritten every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(u64);

impl ParamId {
    fn next() -> Self {
        ParamId(NEXT_PARAM_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// A learnable buffer (weight or bias) owned by exactly one layer.
///
/// Holds the current values and a same-sized gradient accumulator. The
/// accumulator is only ever added into during a step, handed to the
/// optimizer, then cleared.
pub struct Parameter {
    id: ParamId,
    kind: ParamKind,
    shape: Shape3d,
    trainable: bool,
    value: Vec<FloatT>,
    grad: Vec<FloatT>,
}

impl Parameter {
    /// Creates a zero-valued trainable parameter of the given shape.
    pub fn new(kind: ParamKind, shape: Shape3d) -> Self {
        Parameter {
            id: ParamId::next(),
            kind,
            shape,
            trainable: true,
            value: vec![0.0; shape.size()],
            grad: vec![0.0; shape.size()],
        }
    }

    /// Creates a parameter with explicit values.
    ///
    /// # Errors
    /// `DataMismatch` if `values.len() != shape.size()`.
    pub fn with_values(
        kind: ParamKind,
        shape: Shape3d,
        values: Vec<FloatT>,
    ) -> Result<Self, NeuraGraphError> {
        let mut param = Parameter::new(kind, shape);
        param.load_values(&values)?;
        Ok(param)
    }

    pub fn id(&self) -> ParamId {
        self.id
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn shape(&self) -> Shape3d {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn is_trainable(&self) -> bool {
        self.trainable
    }

    /// Frozen parameters keep their values: weight init and optimizers skip them.
    pub fn set_trainable(&mut self, trainable: bool) {
        self.trainable = trainable;
    }

    pub fn value(&self) -> &[FloatT] {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut [FloatT] {
        &mut self.value
    }

    pub fn grad(&self) -> &[FloatT] {
        &self.grad
    }

    /// Split borrow used when handing the pair to an optimizer.
    pub fn value_and_grad_mut(&mut self) -> (&mut [FloatT], &[FloatT]) {
        (&mut self.value, &self.grad)
    }

    /// Overwrites the values, keeping identity and gradient.
    pub fn load_values(&mut self, values: &[FloatT]) -> Result<(), NeuraGraphError> {
        if values.len() != self.value.len() {
            return Err(NeuraGraphError::data_mismatch(
                format!("{} parameter values", self.kind),
                self.value.len(),
                values.len(),
            ));
        }
        self.value.copy_from_slice(values);
        Ok(())
    }

    /// Sums `delta` into the gradient accumulator.
    pub fn accumulate(&mut self, delta: &[FloatT]) -> Result<(), NeuraGraphError> {
        if delta.len() != self.grad.len() {
            return Err(NeuraGraphError::data_mismatch(
                format!("{} gradient accumulation", self.kind),
                self.grad.len(),
                delta.len(),
            ));
        }
        for (g, d) in self.grad.iter_mut().zip(delta) {
            *g += *d;
        }
        Ok(())
    }

    pub fn clear_grad(&mut self) {
        self.grad.fill(0.0);
    }
}

impl Clone for Parameter {
    /// A clone is a distinct parameter: same values and gradient, fresh id.
    fn clone(&self) -> Self {
        Parameter {
            id: ParamId::next(),
            kind: self.kind,
            shape: self.shape,
            trainable: self.trainable,
            value: self.value.clone(),
            grad: self.grad.clone(),
        }
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("id", &self.id.0)
            .field("kind", &self.kind)
            .field("shape", &self.shape)
            .field("trainable", &self.trainable)
            .finish()
    }
}

#[cfg(test)]
#[path = "parameter_test.rs"]
mod tests;
