use std::{fmt, io};

use learning_rules::LearnErr;

/// All errors that can occur while running a comparison.
#[derive(Debug)]
pub enum ComparatorError {
    /// Invalid command line options, caught before any data is prepared.
    InvalidConfig(String),
    /// A line of a CSV dataset could not be parsed.
    Parse { line: usize, msg: String },
    /// The learning rules crate rejected a model, dataset or hyperparameter.
    Learning(LearnErr),
    /// An underlying I/O error.
    Io(io::Error),
}

impl fmt::Display for ComparatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Parse { line, msg } => write!(f, "line {line}: {msg}"),
            Self::Learning(e) => write!(f, "learning error: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for ComparatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Learning(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ComparatorError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<LearnErr> for ComparatorError {
    fn from(e: LearnErr) -> Self {
        Self::Learning(e)
    }
}

impl From<serde_json::Error> for ComparatorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Io(e.into())
    }
}

impl From<ComparatorError> for io::Error {
    fn from(e: ComparatorError) -> Self {
        match e {
            ComparatorError::Io(e) => e,
            ComparatorError::InvalidConfig(_) | ComparatorError::Parse { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
            }
            ComparatorError::Learning(_) => io::Error::other(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ComparatorError>;
