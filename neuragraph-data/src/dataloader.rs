//! Mini-batch loading.
//!
//! ```
//! use neuragraph_core::Tensor;
//! use neuragraph_data::{DataLoader, SequentialSampler, TensorDataset};
//!
//! let inputs = Tensor::from_samples(&[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0]]).unwrap();
//! let targets = Tensor::from_samples(&[[0.0], [1.0], [1.0]]).unwrap();
//! let dataset = TensorDataset::new(inputs, targets).unwrap();
//! let mut loader = DataLoader::new(dataset, 2, SequentialSampler::new(), false).unwrap();
//! let sizes: Vec<usize> = loader
//!     .iter()
//!     .map(|batch| batch.unwrap().len())
//!     .collect();
//! assert_eq!(sizes, vec![2, 1]);
//! ```

use crate::datasets::{Dataset, Sample};
use crate::samplers::Sampler;
use log::trace;
use neuragraph_core::{NeuraGraphError, Tensor};

/// A stacked mini-batch, one tensor sample per dataset item.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: Tensor,
    pub targets: Tensor,
}

impl Batch {
    /// Stacks the samples; every input (and every target) must share a length.
    pub fn from_samples(samples: &[Sample]) -> Result<Self, NeuraGraphError> {
        let inputs: Vec<&[_]> = samples.iter().map(|s| s.input.as_slice()).collect();
        let targets: Vec<&[_]> = samples.iter().map(|s| s.target.as_slice()).collect();
        Ok(Batch {
            inputs: Tensor::from_samples(&inputs)?,
            targets: Tensor::from_samples(&targets)?,
        })
    }

    pub fn len(&self) -> usize {
        self.inputs.sample_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Groups the indices of a [`Sampler`] into batches of `batch_size` dataset items.
///
/// The loader can be iterated once per epoch with [`DataLoader::iter`]; each
/// call asks the sampler for a fresh pass.
#[derive(Debug)]
pub struct DataLoader<D, S> {
    dataset: D,
    sampler: S,
    batch_size: usize,
    drop_last: bool,
}

impl<D, S> DataLoader<D, S>
where
    D: Dataset<Item = Sample>,
    S: Sampler,
{
    /// `drop_last` skips a trailing batch shorter than `batch_size`.
    ///
    /// # Errors
    /// `NeuraGraphError::ConfigurationError` when `batch_size` is zero.
    pub fn new(dataset: D, batch_size: usize, sampler: S, drop_last: bool) -> Result<Self, NeuraGraphError> {
        if batch_size == 0 {
            return Err(NeuraGraphError::ConfigurationError(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(DataLoader {
            dataset,
            sampler,
            batch_size,
            drop_last,
        })
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn drop_last(&self) -> bool {
        self.drop_last
    }

    /// Number of batches one pass yields.
    pub fn num_batches(&self) -> usize {
        let n = self.sampler.len(self.dataset.len());
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }

    /// Starts a new pass over the dataset.
    pub fn iter(&mut self) -> Batches<'_, D> {
        let indices = self.sampler.iter(self.dataset.len());
        trace!(
            "data loader pass: {} items in batches of {}",
            self.dataset.len(),
            self.batch_size
        );
        Batches {
            dataset: &self.dataset,
            indices,
            batch_size: self.batch_size,
            drop_last: self.drop_last,
        }
    }
}

/// One pass of a [`DataLoader`].
pub struct Batches<'a, D> {
    dataset: &'a D,
    indices: Box<dyn Iterator<Item = usize> + Send>,
    batch_size: usize,
    drop_last: bool,
}

impl<D: Dataset<Item = Sample>> Iterator for Batches<'_, D> {
    type Item = Result<Batch, NeuraGraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut samples = Vec::with_capacity(self.batch_size);
        for index in self.indices.by_ref().take(self.batch_size) {
            match self.dataset.get(index) {
                Ok(sample) => samples.push(sample),
                Err(e) => return Some(Err(e)),
            }
        }
        if samples.is_empty() || (self.drop_last && samples.len() < self.batch_size) {
            return None;
        }
        Some(Batch::from_samples(&samples))
    }
}

#[cfg(test)]
#[path = "dataloader_test.rs"]
mod tests;
