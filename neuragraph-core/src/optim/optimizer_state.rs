use crate::error::NeuraGraphError;
use crate::nn::parameter::ParamId;
use crate::types::FloatT;
use std::collections::HashMap;

/// Per-parameter state of a stateful optimizer.
#[derive(Debug, Clone)]
pub struct OptimizerState<S> {
    entries: HashMap<ParamId, S>,
}

impl<S> Default for OptimizerState<S> {
    fn default() -> Self {
        OptimizerState {
            entries: HashMap::new(),
        }
    }
}

impl<S> OptimizerState<S> {
    pub fn get(&self, id: ParamId) -> Option<&S> {
        self.entries.get(&id)
    }

    pub fn get_or_insert_with(&mut self, id: ParamId, init: impl FnOnce() -> S) -> &mut S {
        self.entries.entry(id).or_insert_with(init)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl OptimizerState<Vec<FloatT>> {
    /// The zero-initialised buffer of `id`, checked against `len`.
    pub fn buffer(&mut self, id: ParamId, len: usize) -> Result<&mut Vec<FloatT>, NeuraGraphError> {
        let buffer = self.get_or_insert_with(id, || vec![0.0; len]);
        if buffer.len() != len {
            return Err(NeuraGraphError::data_mismatch(
                "optimizer state length",
                buffer.len(),
                len,
            ));
        }
        Ok(buffer)
    }
}
