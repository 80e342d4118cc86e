use std::{fmt, str::FromStr};

use ndarray::{Array2, ArrayView2, CowArray, Ix2};

use crate::{
    LearnErr, Result,
    linalg::{pseudo_inverse, without_bias},
};

/// The names of the learning rules a model can be trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LearningMode {
    Bp,
    Pi,
    Fa,
    FaPiW,
    FaPiB,
}
use LearningMode::*;

impl LearningMode {
    /// Every learning mode, in the order they are usually compared.
    pub const ALL: [LearningMode; 5] = [Bp, Pi, Fa, FaPiW, FaPiB];

    /// Returns the registered name of this learning mode.
    pub fn name(&self) -> &'static str {
        match self {
            Bp => "BP",
            Pi => "PI",
            Fa => "FA",
            FaPiW => "FA-PI-W",
            FaPiB => "FA-PI-B",
        }
    }

    /// Whether this mode stores one fixed feedback matrix per layer.
    pub fn uses_feedback_matrices(&self) -> bool {
        matches!(self, Fa | FaPiW | FaPiB)
    }
}

impl fmt::Display for LearningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LearningMode {
    type Err = LearnErr;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| LearnErr::invalid_config(format!("unknown learning mode: {s}")))
    }
}

/// The state of a learning rule.
///
/// Each variant carries only what its rule needs to transport the error signal from a
/// layer's output back to its input. The feedback matrices of the alignment variants have
/// shape `(output_dim, input_dim)`, they have no bias column and are never trained.
#[derive(Debug, Clone, PartialEq)]
pub enum Feedback {
    /// Transports through the forward weights.
    Backprop,

    /// Transports through the pseudoinverse of the current forward weights.
    PseudoInverse,

    /// Random feedback matrices.
    Alignment(Vec<Array2<f64>>),

    /// Feedback matrices taken from the pseudoinverse of the initial forward weights.
    AlignmentFromWeights(Vec<Array2<f64>>),

    /// Random feedback matrices from which the initial forward weights were derived.
    AlignmentFromFeedback(Vec<Array2<f64>>),
}

impl Feedback {
    /// Creates the feedback state of a learning mode.
    ///
    /// # Arguments
    /// * `mode` - The learning mode.
    /// * `matrices` - One feedback matrix per layer, ignored by `BP` and `PI`.
    pub fn new(mode: LearningMode, matrices: Vec<Array2<f64>>) -> Self {
        match mode {
            Bp => Feedback::Backprop,
            Pi => Feedback::PseudoInverse,
            Fa => Feedback::Alignment(matrices),
            FaPiW => Feedback::AlignmentFromWeights(matrices),
            FaPiB => Feedback::AlignmentFromFeedback(matrices),
        }
    }

    /// Returns the mode this feedback state belongs to.
    pub fn mode(&self) -> LearningMode {
        match self {
            Feedback::Backprop => Bp,
            Feedback::PseudoInverse => Pi,
            Feedback::Alignment(_) => Fa,
            Feedback::AlignmentFromWeights(_) => FaPiW,
            Feedback::AlignmentFromFeedback(_) => FaPiB,
        }
    }

    /// Returns the stored feedback matrices, if this rule has any.
    pub fn matrices(&self) -> Option<&[Array2<f64>]> {
        match self {
            Feedback::Backprop | Feedback::PseudoInverse => None,
            Feedback::Alignment(b)
            | Feedback::AlignmentFromWeights(b)
            | Feedback::AlignmentFromFeedback(b) => Some(b),
        }
    }

    /// Computes the transport matrix of a layer.
    ///
    /// # Arguments
    /// * `i` - The index of the layer.
    /// * `weights` - The current weights of that layer, bias column included.
    ///
    /// # Returns
    /// A `(output_dim, input_dim)` matrix, borrowed when it is already stored.
    pub fn transport<'a>(
        &'a self,
        i: usize,
        weights: ArrayView2<'a, f64>,
    ) -> Result<CowArray<'a, f64, Ix2>> {
        let transport = match self {
            Feedback::Backprop => CowArray::from(without_bias(weights)),
            Feedback::PseudoInverse => {
                let pinv = pseudo_inverse(without_bias(weights))?;
                CowArray::from(pinv.reversed_axes())
            }
            Feedback::Alignment(b)
            | Feedback::AlignmentFromWeights(b)
            | Feedback::AlignmentFromFeedback(b) => {
                let b = b.get(i).ok_or(LearnErr::ShapeMismatch {
                    what: "feedback matrices",
                    got: b.len(),
                    expected: i + 1,
                })?;

                CowArray::from(b.view())
            }
        };

        Ok(transport)
    }
}
