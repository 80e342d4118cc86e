use std::{fmt, str::FromStr};

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::LearnErr;

/// The activation functions a layer can apply to its weighted sums.
///
/// The derivative `df` is expressed in terms of the activation's *output*, that is, given
/// `z = f(y)` it returns `d f(y) / dy` without needing `y`. This way the backward pass only
/// needs the activations cached by the forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFn {
    Sigmoid,
    Tanh,
    Relu,
    Identity,
}
use ActFn::*;

impl ActFn {
    /// Every registered activation function.
    pub const ALL: [ActFn; 4] = [Sigmoid, Tanh, Relu, Identity];

    /// Returns the registered name of this activation.
    pub fn name(&self) -> &'static str {
        match self {
            Sigmoid => "sigmoid",
            Tanh => "tanh",
            Relu => "relu",
            Identity => "identity",
        }
    }

    pub fn f(&self, y: f64) -> f64 {
        match self {
            Sigmoid => 1. / (1. + (-y).exp()),
            Tanh => y.tanh(),
            Relu => y.max(0.),
            Identity => y,
        }
    }

    pub fn df(&self, z: f64) -> f64 {
        match self {
            Sigmoid => z * (1. - z),
            Tanh => 1. - z.powi(2),
            Relu => (z > 0.) as u8 as f64,
            Identity => 1.,
        }
    }

    /// Applies the activation element-wise, consuming the weighted sums.
    pub fn apply(&self, y: Array2<f64>) -> Array2<f64> {
        if *self == Identity {
            return y;
        }

        y.mapv_into(|y| self.f(y))
    }

    /// Computes the element-wise derivative given the activation's output.
    pub fn derivative(&self, z: ArrayView2<f64>) -> Array2<f64> {
        z.mapv(|z| self.df(z))
    }
}

impl fmt::Display for ActFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActFn {
    type Err = LearnErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|act_fn| act_fn.name() == s)
            .ok_or_else(|| LearnErr::invalid_config(format!("unknown activation function: {s}")))
    }
}
