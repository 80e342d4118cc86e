use std::{fmt, str::FromStr};

use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{Mse, SoftmaxCrossEntropy};
use crate::LearnErr;

pub trait LossFn {
    /// Computes the loss of every sample (row) of the batch.
    fn loss(&self, y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> Array1<f64>;

    /// Computes the gradient of the loss with respect to `y_pred`.
    fn loss_prime(&self, y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> Array2<f64>;
}

/// The registry of loss functions a model can be trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    Mse,
    SoftmaxCrossEntropy,
}

impl Loss {
    /// Every registered loss function.
    pub const ALL: [Loss; 2] = [Loss::Mse, Loss::SoftmaxCrossEntropy];

    /// Returns the registered name of this loss function.
    pub fn name(&self) -> &'static str {
        match self {
            Loss::Mse => "mse",
            Loss::SoftmaxCrossEntropy => "softmax_cross_entropy",
        }
    }
}

impl LossFn for Loss {
    fn loss(&self, y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> Array1<f64> {
        match self {
            Loss::Mse => Mse.loss(y_pred, y),
            Loss::SoftmaxCrossEntropy => SoftmaxCrossEntropy.loss(y_pred, y),
        }
    }

    fn loss_prime(&self, y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> Array2<f64> {
        match self {
            Loss::Mse => Mse.loss_prime(y_pred, y),
            Loss::SoftmaxCrossEntropy => SoftmaxCrossEntropy.loss_prime(y_pred, y),
        }
    }
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Loss {
    type Err = LearnErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|loss| loss.name() == s)
            .ok_or_else(|| LearnErr::invalid_config(format!("unknown loss function: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_known_names() {
        assert_eq!("mse".parse::<Loss>().unwrap(), Loss::Mse);
        assert_eq!(
            "softmax_cross_entropy".parse::<Loss>().unwrap(),
            Loss::SoftmaxCrossEntropy
        );
        assert!(matches!(
            "hinge".parse::<Loss>(),
            Err(LearnErr::InvalidConfiguration(_))
        ));
    }
}
