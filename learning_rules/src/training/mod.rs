mod cancel;
mod config;
mod fit_log;
pub mod metrics;
mod model_trainer;

pub use cancel::{CancelToken, Cancellation, Confirm};
pub use config::FitConfig;
pub use fit_log::{FitLog, LogRecord, RecordKind};
pub use model_trainer::ModelTrainer;
