//! Batched sample storage flowing along edges.
//!
//! A [`Tensor`] is an ordered batch of samples, every sample being a flat run
//! of `sample_len` scalars laid out according to some [`Shape3d`](crate::types::Shape3d).
//! Storage is a single contiguous buffer so sub-batches can be sliced out and
//! stitched back together cheaply by the batch scheduler.

use crate::error::NeuraGraphError;
use crate::types::FloatT;
use std::ops::Range;

/// Fixed-length batch of samples.
///
/// Invariant: `data.len() == sample_count * sample_len`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tensor {
    data: Vec<FloatT>,
    sample_count: usize,
    sample_len: usize,
}

impl Tensor {
    /// Creates a zero-filled tensor of `sample_count` samples of `sample_len` values.
    pub fn zeros(sample_count: usize, sample_len: usize) -> Self {
        Tensor {
            data: vec![0.0; sample_count * sample_len],
            sample_count,
            sample_len,
        }
    }

    /// Wraps a flat buffer holding `sample_count` consecutive samples.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::DataMismatch` if `data.len()` is not
    /// `sample_count * sample_len`.
    pub fn from_vec(
        data: Vec<FloatT>,
        sample_count: usize,
        sample_len: usize,
    ) -> Result<Self, NeuraGraphError> {
        if data.len() != sample_count * sample_len {
            return Err(NeuraGraphError::data_mismatch(
                "tensor storage length",
                sample_count * sample_len,
                data.len(),
            ));
        }
        Ok(Tensor {
            data,
            sample_count,
            sample_len,
        })
    }

    /// Builds a tensor from a list of samples that must all share one length.
    pub fn from_samples<S: AsRef<[FloatT]>>(samples: &[S]) -> Result<Self, NeuraGraphError> {
        let sample_len = samples.first().map_or(0, |s| s.as_ref().len());
        let mut data = Vec::with_capacity(samples.len() * sample_len);
        for sample in samples {
            let sample = sample.as_ref();
            if sample.len() != sample_len {
                return Err(NeuraGraphError::data_mismatch(
                    "sample length",
                    sample_len,
                    sample.len(),
                ));
            }
            data.extend_from_slice(sample);
        }
        Ok(Tensor {
            data,
            sample_count: samples.len(),
            sample_len,
        })
    }

    /// A batch holding exactly one sample.
    pub fn from_sample(sample: &[FloatT]) -> Self {
        Tensor {
            data: sample.to_vec(),
            sample_count: 1,
            sample_len: sample.len(),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn sample_len(&self) -> usize {
        self.sample_len
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    pub fn as_slice(&self) -> &[FloatT] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [FloatT] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<FloatT> {
        self.data
    }

    /// Returns sample `index`.
    ///
    /// # Panics
    /// Panics if `index >= sample_count()`.
    #[inline]
    pub fn sample(&self, index: usize) -> &[FloatT] {
        let start = index * self.sample_len;
        &self.data[start..start + self.sample_len]
    }

    /// Mutable access to sample `index`.
    ///
    /// # Panics
    /// Panics if `index >= sample_count()`.
    #[inline]
    pub fn sample_mut(&mut self, index: usize) -> &mut [FloatT] {
        let start = index * self.sample_len;
        &mut self.data[start..start + self.sample_len]
    }

    /// Checked variant of [`Tensor::sample`].
    pub fn get_sample(&self, index: usize) -> Option<&[FloatT]> {
        (index < self.sample_count).then(|| self.sample(index))
    }

    /// Iterates over the samples in batch order.
    pub fn samples(&self) -> impl Iterator<Item = &[FloatT]> + '_ {
        self.data
            .chunks(self.sample_len.max(1))
            .take(self.sample_count)
    }

    pub fn samples_mut(&mut self) -> impl Iterator<Item = &mut [FloatT]> + '_ {
        let count = self.sample_count;
        self.data.chunks_mut(self.sample_len.max(1)).take(count)
    }

    pub fn to_samples(&self) -> Vec<Vec<FloatT>> {
        self.samples().map(<[FloatT]>::to_vec).collect()
    }

    pub fn fill(&mut self, value: FloatT) {
        self.data.fill(value);
    }

    /// Re-dimensions the tensor and zeroes it, reusing the allocation.
    pub fn reset(&mut self, sample_count: usize, sample_len: usize) {
        self.data.clear();
        self.data.resize(sample_count * sample_len, 0.0);
        self.sample_count = sample_count;
        self.sample_len = sample_len;
    }

    /// Element-wise `self += other`.
    pub fn add_assign(&mut self, other: &Tensor) -> Result<(), NeuraGraphError> {
        self.check_same_dims(other, "tensor add_assign")?;
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += *b;
        }
        Ok(())
    }

    pub fn scale(&mut self, factor: FloatT) {
        for v in self.data.iter_mut() {
            *v *= factor;
        }
    }

    /// Copies samples `range` into a new tensor.
    pub fn slice_samples(&self, range: Range<usize>) -> Result<Tensor, NeuraGraphError> {
        if range.start > range.end || range.end > self.sample_count {
            return Err(NeuraGraphError::IndexOutOfBounds {
                index: range.end,
                len: self.sample_count,
            });
        }
        let start = range.start * self.sample_len;
        let end = range.end * self.sample_len;
        Ok(Tensor {
            data: self.data[start..end].to_vec(),
            sample_count: range.len(),
            sample_len: self.sample_len,
        })
    }

    /// Stitches batches with the same sample length back into one batch.
    pub fn concat_samples(parts: &[&Tensor]) -> Result<Tensor, NeuraGraphError> {
        let sample_len = parts.first().map_or(0, |t| t.sample_len);
        let total: usize = parts.iter().map(|t| t.sample_count).sum();
        let mut data = Vec::with_capacity(total * sample_len);
        for part in parts {
            if part.sample_len != sample_len {
                return Err(NeuraGraphError::data_mismatch(
                    "concatenated sample length",
                    sample_len,
                    part.sample_len,
                ));
            }
            data.extend_from_slice(&part.data);
        }
        Ok(Tensor {
            data,
            sample_count: total,
            sample_len,
        })
    }

    /// Index of the largest value in sample `index` (first one on ties).
    pub fn argmax(&self, index: usize) -> usize {
        argmax(self.sample(index))
    }

    fn check_same_dims(&self, other: &Tensor, context: &str) -> Result<(), NeuraGraphError> {
        if self.sample_len != other.sample_len {
            return Err(NeuraGraphError::data_mismatch(
                format!("{context} (sample length)"),
                self.sample_len,
                other.sample_len,
            ));
        }
        if self.sample_count != other.sample_count {
            return Err(NeuraGraphError::data_mismatch(
                format!("{context} (sample count)"),
                self.sample_count,
                other.sample_count,
            ));
        }
        Ok(())
    }
}

/// Index of the largest element of `values`, 0 for an empty slice.
pub fn argmax(values: &[FloatT]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
#[path = "tensor_test.rs"]
mod tests;
