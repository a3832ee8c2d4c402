//! Datasets, samplers and mini-batch loading for `neuragraph` networks.
//!
//! A [`DataLoader`] draws sample indices from a [`Sampler`], fetches the
//! samples from a [`Dataset`] and stacks them into a [`Batch`] whose tensors
//! go straight into `Network::train_step`.

pub mod dataloader;
pub mod datasets;
pub mod samplers;

pub use dataloader::{Batch, Batches, DataLoader};
pub use datasets::{Dataset, Sample, TensorDataset, VecDataset};
pub use samplers::{RandomSampler, Sampler, SequentialSampler};
