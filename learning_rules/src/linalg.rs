//! Small matrix helpers shared by the model and its learning rules.

use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView2, s};

use crate::{LearnErr, Result};

/// Ridge added to the gram matrix before inverting it in [`pseudo_inverse`].
pub const PINV_EPSILON: f64 = 1.0e-3;

/// Computes the regularized Moore-Penrose pseudoinverse of `w`.
///
/// The gram matrix is built on the smaller side of `w` so that the inverted matrix is as small
/// as possible:
/// * `m <= n`: `wᵗ · (w · wᵗ + εI)⁻¹`
/// * `m > n`: `(wᵗ · w + εI)⁻¹ · wᵗ`
///
/// # Arguments
/// * `w` - A `m x n` matrix.
///
/// # Returns
/// The `n x m` pseudoinverse or a `NumericalError` if the matrix is empty, holds non finite
/// values or the regularized gram matrix could not be inverted.
pub fn pseudo_inverse(w: ArrayView2<f64>) -> Result<Array2<f64>> {
    let (m, n) = w.dim();

    if m == 0 || n == 0 {
        return Err(LearnErr::numerical(format!(
            "cannot take the pseudoinverse of a {m}x{n} matrix"
        )));
    }

    if w.iter().any(|v| !v.is_finite()) {
        return Err(LearnErr::numerical(
            "cannot take the pseudoinverse of a matrix with non finite values",
        ));
    }

    let pinv = if m <= n {
        let gram = w.dot(&w.t()) + Array2::<f64>::eye(m) * PINV_EPSILON;
        w.t().dot(&invert(&gram)?)
    } else {
        let gram = w.t().dot(&w) + Array2::<f64>::eye(n) * PINV_EPSILON;
        invert(&gram)?.dot(&w.t())
    };

    if pinv.iter().any(|v| !v.is_finite()) {
        return Err(LearnErr::numerical("pseudoinverse has non finite values"));
    }

    Ok(pinv)
}

/// Inverts a square matrix through `nalgebra`'s LU decomposition.
fn invert(a: &Array2<f64>) -> Result<Array2<f64>> {
    let (rows, cols) = a.dim();
    let matrix = DMatrix::from_row_iterator(rows, cols, a.iter().copied());

    let inverse = matrix.try_inverse().ok_or_else(|| {
        LearnErr::numerical(format!("the regularized {rows}x{cols} gram matrix is singular"))
    })?;

    Ok(Array2::from_shape_fn((rows, cols), |(i, j)| inverse[(i, j)]))
}

/// Appends a constant column of ones to `x`.
pub fn add_bias(x: ArrayView2<f64>) -> Array2<f64> {
    let (rows, cols) = x.dim();
    let mut biased = Array2::ones((rows, cols + 1));
    biased.slice_mut(s![.., ..cols]).assign(&x);
    biased
}

/// Returns the view of `w` without its trailing bias column.
pub fn without_bias(w: ArrayView2<f64>) -> ArrayView2<f64> {
    let cols = w.ncols().saturating_sub(1);
    w.slice_move(s![.., ..cols])
}

/// Rescales randomly drawn weights by their empirical variance and a fan factor.
///
/// # Arguments
/// * `x` - The drawn weights.
/// * `n` - The fan factor, derived from the layer's dimensions.
///
/// # Returns
/// `x / (var(x) * n)`, or a `NumericalError` if the variance is zero or not finite.
pub fn normalize_xavier(x: Array2<f64>, n: f64) -> Result<Array2<f64>> {
    let variance = x.var(0.);

    if !(variance.is_finite() && variance > 0.) {
        return Err(LearnErr::numerical(format!(
            "cannot rescale a {:?} matrix with variance {variance}",
            x.dim()
        )));
    }

    Ok(x / (variance * n))
}
