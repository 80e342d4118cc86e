//! Feed forward networks trained with back-propagation, pseudoinverse transport or one of
//! three feedback alignment rules, so that the rules can be compared on the same topology.

pub mod arch;
pub mod dataset;
pub mod error;
pub mod linalg;
pub mod training;

pub use arch::{LayerSpec, LearningMode, Model, ModelBuilder, ModelSpec};
pub use dataset::Dataset;
pub use error::{LearnErr, Result};
pub use training::{
    CancelToken, Cancellation, Confirm, FitConfig, FitLog, LogRecord, ModelTrainer, RecordKind,
};
