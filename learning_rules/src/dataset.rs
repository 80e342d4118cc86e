use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayView2, Axis};

use crate::{LearnErr, Result};

/// A set of samples, one row of features in `x` paired with one row of targets in `y`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x: Array2<f64>,
    y: Array2<f64>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `x` - A `samples x features` matrix.
    /// * `y` - A `samples x targets` matrix.
    ///
    /// # Returns
    /// The dataset or `ShapeMismatch` if `x` and `y` have a different amount of rows.
    pub fn new(x: Array2<f64>, y: Array2<f64>) -> Result<Self> {
        LearnErr::check_dim("target rows", y.nrows(), x.nrows())?;
        Ok(Self { x, y })
    }

    /// Returns the amount of samples.
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x_size(&self) -> usize {
        self.x.ncols()
    }

    pub fn y_size(&self) -> usize {
        self.y.ncols()
    }

    pub fn x(&self) -> ArrayView2<'_, f64> {
        self.x.view()
    }

    pub fn y(&self) -> ArrayView2<'_, f64> {
        self.y.view()
    }

    /// Splits the dataset into contiguous batches, the last one may be shorter.
    ///
    /// # Arguments
    /// * `batch_size` - The amount of samples per batch.
    ///
    /// # Returns
    /// An iterator over `(x, y)` pairs of views.
    pub fn batches(
        &self,
        batch_size: NonZeroUsize,
    ) -> impl Iterator<Item = (ArrayView2<'_, f64>, ArrayView2<'_, f64>)> {
        let size = batch_size.get();
        self.x
            .axis_chunks_iter(Axis(0), size)
            .zip(self.y.axis_chunks_iter(Axis(0), size))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn batches_are_contiguous_and_the_last_one_is_short() {
        let x = array![[0.], [1.], [2.], [3.], [4.]];
        let y = array![[10.], [11.], [12.], [13.], [14.]];
        let dataset = Dataset::new(x, y).unwrap();

        let batches: Vec<_> = dataset.batches(NonZeroUsize::new(2).unwrap()).collect();

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].0, array![[0.], [1.]]);
        assert_eq!(batches[1].1, array![[12.], [13.]]);
        assert_eq!(batches[2].0, array![[4.]]);
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let err = Dataset::new(Array2::zeros((3, 2)), Array2::zeros((2, 1))).unwrap_err();
        assert_eq!(
            err,
            LearnErr::ShapeMismatch {
                what: "target rows",
                got: 2,
                expected: 3
            }
        );
    }
}
