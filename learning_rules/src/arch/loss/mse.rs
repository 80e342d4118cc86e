use ndarray::{Array1, Array2, ArrayView2, Axis};

use super::LossFn;

/// Mean squared error loss function.
///
/// The per-sample loss is `Σ ½ (y_pred - y)²` over the output units, so its gradient with
/// respect to the prediction is simply `y_pred - y`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mse;

impl LossFn for Mse {
    fn loss(&self, y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> Array1<f64> {
        (&y_pred - &y)
            .mapv_into(|d| 0.5 * d.powi(2))
            .sum_axis(Axis(1))
    }

    fn loss_prime(&self, y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> Array2<f64> {
        &y_pred - &y
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn loss_is_summed_per_sample() {
        let y_pred = array![[1., 2.], [0., 0.]];
        let y = array![[0., 0.], [0., 1.]];

        assert_eq!(Mse.loss(y_pred.view(), y.view()), array![2.5, 0.5]);
        assert_eq!(
            Mse.loss_prime(y_pred.view(), y.view()),
            array![[1., 2.], [0., -1.]]
        );
    }
}
