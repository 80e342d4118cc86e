use ndarray::{linalg, prelude::*};

use crate::{
    LearnErr, Result,
    arch::activations::ActFn,
    linalg::add_bias,
};

/// A fully connected layer whose bias is folded into the last column of its weights.
#[derive(Debug, Clone, PartialEq)]
pub struct Dense {
    weights: Array2<f64>,
    act_fn: ActFn,
    updatable: bool,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `weights` - A `(output_dim, input_dim + 1)` matrix, the last column being the bias.
    /// * `act_fn` - The activation applied to the weighted sums.
    /// * `updatable` - Whether the layer receives gradient updates.
    ///
    /// # Returns
    /// The new layer or `ShapeMismatch` if the weights have no input or output units.
    pub fn new(weights: Array2<f64>, act_fn: ActFn, updatable: bool) -> Result<Self> {
        if weights.ncols() < 2 {
            return Err(LearnErr::ShapeMismatch {
                what: "layer weight columns",
                got: weights.ncols(),
                expected: 2,
            });
        }

        if weights.nrows() == 0 {
            return Err(LearnErr::ShapeMismatch {
                what: "layer weight rows",
                got: 0,
                expected: 1,
            });
        }

        Ok(Self {
            weights,
            act_fn,
            updatable,
        })
    }

    pub fn input_dim(&self) -> usize {
        self.weights.ncols() - 1
    }

    pub fn output_dim(&self) -> usize {
        self.weights.nrows()
    }

    pub fn weights(&self) -> ArrayView2<'_, f64> {
        self.weights.view()
    }

    pub fn act_fn(&self) -> ActFn {
        self.act_fn
    }

    pub fn is_updatable(&self) -> bool {
        self.updatable
    }

    /// Computes `f(add_bias(x) · Wᵗ)`.
    ///
    /// The caller is expected to have checked that `x` has `input_dim` columns.
    pub fn forward(&self, x: ArrayView2<f64>) -> Array2<f64> {
        let mut z = Array2::zeros((x.nrows(), self.output_dim()));
        linalg::general_mat_mul(1.0, &add_bias(x), &self.weights.t(), 0.0, &mut z);
        self.act_fn.apply(z)
    }

    /// Computes the gradient of the weights, `deltaᵗ · add_bias(x)`.
    ///
    /// # Arguments
    /// * `delta` - The error signal at this layer's output.
    /// * `x` - The input this layer saw on the forward pass.
    pub fn gradient(&self, delta: ArrayView2<f64>, x: ArrayView2<f64>) -> Array2<f64> {
        let mut grad = Array2::zeros(self.weights.raw_dim());
        linalg::general_mat_mul(1.0, &delta.t(), &add_bias(x), 0.0, &mut grad);
        grad
    }

    /// Takes a gradient descent step, `W -= learning_rate · grad`.
    pub(crate) fn step(&mut self, grad: &Array2<f64>, learning_rate: f64) {
        self.weights.scaled_add(-learning_rate, grad);
    }

    /// Scales every weight except the bias column by `factor`.
    pub(crate) fn decay(&mut self, factor: f64) {
        let cols = self.input_dim();
        self.weights
            .slice_mut(s![.., ..cols])
            .mapv_inplace(|w| w * factor);
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn layer(act_fn: ActFn) -> Dense {
        Dense::new(array![[1., -1., 0.5], [2., 0., -1.]], act_fn, true).unwrap()
    }

    #[test]
    fn forward_appends_the_bias_before_multiplying() {
        let x = array![[1., 2.], [0., 0.]];
        let y = layer(ActFn::Identity).forward(x.view());
        assert_eq!(y, array![[-0.5, 1.], [0.5, -1.]]);
    }

    #[test]
    fn forward_applies_the_activation() {
        let x = array![[1., 2.]];
        let y = layer(ActFn::Relu).forward(x.view());
        assert_eq!(y, array![[0., 1.]]);
    }

    #[test]
    fn gradient_includes_the_bias_column() {
        let dense = layer(ActFn::Identity);
        let delta = array![[1., 0.], [0., 2.]];
        let x = array![[1., 2.], [3., 4.]];

        let grad = dense.gradient(delta.view(), x.view());

        assert_eq!(grad, array![[1., 2., 1.], [6., 8., 2.]]);
    }

    #[test]
    fn decay_leaves_the_bias_untouched() {
        let mut dense = layer(ActFn::Identity);
        dense.decay(0.5);
        assert_eq!(dense.weights(), array![[0.5, -0.5, 0.5], [1., 0., -1.]]);
    }

    #[test]
    fn weights_without_inputs_are_rejected() {
        let err = Dense::new(Array2::zeros((2, 1)), ActFn::Relu, true).unwrap_err();
        assert!(matches!(err, LearnErr::ShapeMismatch { .. }));
    }
}
