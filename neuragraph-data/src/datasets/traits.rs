use neuragraph_core::{FloatT, NeuraGraphError};

/// Indexed collection of samples.
///
/// `Item` must be `Send + 'static` so datasets can be moved to loader threads.
pub trait Dataset {
    type Item: Send + 'static;

    /// Returns the item at `index`.
    ///
    /// # Errors
    /// `NeuraGraphError::IndexOutOfBounds` when `index >= self.len()`.
    fn get(&self, index: usize) -> Result<Self::Item, NeuraGraphError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One supervised training example.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sample {
    pub input: Vec<FloatT>,
    pub target: Vec<FloatT>,
}

impl Sample {
    pub fn new(input: Vec<FloatT>, target: Vec<FloatT>) -> Self {
        Sample { input, target }
    }
}
