use std::fmt::Debug;

/// Produces the order in which a `DataLoader` visits dataset indices.
///
/// `iter` takes `&mut self` so that stateful samplers advance between
/// epochs (a seeded shuffle yields a new permutation on each call).
pub trait Sampler: Debug + Send {
    /// Indices for one pass over a dataset of `dataset_len` items.
    fn iter(&mut self, dataset_len: usize) -> Box<dyn Iterator<Item = usize> + Send>;

    /// Number of indices `iter` yields for `dataset_len` items.
    fn len(&self, dataset_len: usize) -> usize;
}
