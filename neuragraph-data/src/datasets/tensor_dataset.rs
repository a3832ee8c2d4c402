use super::traits::{Dataset, Sample};
use neuragraph_core::{NeuraGraphError, Tensor};

/// Paired input and target tensors; sample `i` of each forms item `i`.
#[derive(Debug, Clone)]
pub struct TensorDataset {
    inputs: Tensor,
    targets: Tensor,
}

impl TensorDataset {
    /// # Errors
    /// `NeuraGraphError::DataMismatch` when the two tensors hold a different
    /// number of samples.
    pub fn new(inputs: Tensor, targets: Tensor) -> Result<Self, NeuraGraphError> {
        if inputs.sample_count() != targets.sample_count() {
            return Err(NeuraGraphError::DataMismatch {
                context: "dataset targets".to_string(),
                expected: inputs.sample_count(),
                actual: targets.sample_count(),
            });
        }
        Ok(Self { inputs, targets })
    }

    pub fn inputs(&self) -> &Tensor {
        &self.inputs
    }

    pub fn targets(&self) -> &Tensor {
        &self.targets
    }

    pub fn input_len(&self) -> usize {
        self.inputs.sample_len()
    }

    pub fn target_len(&self) -> usize {
        self.targets.sample_len()
    }
}

impl Dataset for TensorDataset {
    type Item = Sample;

    fn get(&self, index: usize) -> Result<Self::Item, NeuraGraphError> {
        match (self.inputs.get_sample(index), self.targets.get_sample(index)) {
            (Some(input), Some(target)) => Ok(Sample::new(input.to_vec(), target.to_vec())),
            _ => Err(NeuraGraphError::IndexOutOfBounds {
                index,
                len: self.len(),
            }),
        }
    }

    fn len(&self) -> usize {
        self.inputs.sample_count()
    }
}

#[cfg(test)]
#[path = "tensor_dataset_test.rs"]
mod tests;
