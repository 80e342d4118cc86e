use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire learning rules crate.
pub type Result<T> = std::result::Result<T, LearnErr>;

/// The learning rules crate's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum LearnErr {
    /// An unknown name or an out of range hyperparameter was given at construction.
    InvalidConfiguration(String),

    /// A matrix does not have the dimensions the model expects.
    ShapeMismatch {
        /// What was being checked (e.g. "batch features", "targets").
        what: &'static str,
        got: usize,
        expected: usize,
    },

    /// A numeric routine could not produce a finite result.
    NumericalError(String),
}

impl LearnErr {
    pub(crate) fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub(crate) fn numerical<S: Into<String>>(msg: S) -> Self {
        Self::NumericalError(msg.into())
    }

    /// Returns `Ok` if `got` equals `expected`, a `ShapeMismatch` otherwise.
    pub(crate) fn check_dim(what: &'static str, got: usize, expected: usize) -> Result<()> {
        if got != expected {
            return Err(Self::ShapeMismatch {
                what,
                got,
                expected,
            });
        }

        Ok(())
    }
}

impl Display for LearnErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearnErr::InvalidConfiguration(msg) => write!(f, "invalid configuration: {msg}"),
            LearnErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "shape mismatch for {what}: got {got}, expected {expected}"
            ),
            LearnErr::NumericalError(msg) => write!(f, "numerical error: {msg}"),
        }
    }
}

impl Error for LearnErr {}
