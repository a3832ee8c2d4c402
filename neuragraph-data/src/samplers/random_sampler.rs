use super::traits::Sampler;
use log::warn;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Random index order drawn from a seeded generator.
///
/// Two samplers built with the same seed produce the same sequence of
/// passes; successive passes of one sampler differ.
#[derive(Debug, Clone)]
pub struct RandomSampler {
    replacement: bool,
    num_samples: Option<usize>,
    rng: StdRng,
}

impl RandomSampler {
    /// * `replacement`: an index may be drawn several times in one pass.
    /// * `num_samples`: indices per pass, the dataset size when `None`.
    pub fn new(replacement: bool, num_samples: Option<usize>, seed: u64) -> Self {
        RandomSampler {
            replacement,
            num_samples,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Without-replacement shuffle of the whole dataset.
    pub fn shuffled(seed: u64) -> Self {
        Self::new(false, None, seed)
    }
}

impl Sampler for RandomSampler {
    fn iter(&mut self, dataset_len: usize) -> Box<dyn Iterator<Item = usize> + Send> {
        if dataset_len == 0 {
            return Box::new(std::iter::empty());
        }
        let count = self.num_samples.unwrap_or(dataset_len);

        if self.replacement {
            let rng = &mut self.rng;
            let indices: Vec<usize> = (0..count).map(|_| rng.gen_range(0..dataset_len)).collect();
            return Box::new(indices.into_iter());
        }
        if count > dataset_len {
            warn!(
                "RandomSampler: {count} samples requested from {dataset_len} items without replacement, yielding none"
            );
            return Box::new(std::iter::empty());
        }
        let mut indices: Vec<usize> = (0..dataset_len).collect();
        indices.shuffle(&mut self.rng);
        indices.truncate(count);
        Box::new(indices.into_iter())
    }

    fn len(&self, dataset_len: usize) -> usize {
        if dataset_len == 0 {
            return 0;
        }
        match self.num_samples {
            Some(n) if !self.replacement && n > dataset_len => 0,
            Some(n) => n,
            None => dataset_len,
        }
    }
}

#[cfg(test)]
#[path = "random_sampler_test.rs"]
mod tests;
