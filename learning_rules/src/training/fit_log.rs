use serde::{Deserialize, Serialize};

/// The stage of training a [`LogRecord`] was taken at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordKind {
    /// Running scores after a training batch.
    TrainIntermediate,
    /// Scores over a whole training epoch.
    Train,
    /// Scores over the validation set after an epoch.
    Validation,
}

/// A snapshot of the training scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// The amount of training samples seen since `fit` was called.
    pub samples: usize,
    pub loss: f64,
    pub accuracy: f64,
    pub kind: RecordKind,
}

/// The ordered records produced by a call to `ModelTrainer::fit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FitLog {
    records: Vec<LogRecord>,
    cancelled: bool,
}

impl FitLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether training stopped before running every epoch.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Returns the records of a single kind, in order.
    pub fn of_kind(&self, kind: RecordKind) -> impl Iterator<Item = &LogRecord> {
        self.records.iter().filter(move |r| r.kind == kind)
    }

    /// Returns the latest record of a kind.
    pub fn last(&self, kind: RecordKind) -> Option<&LogRecord> {
        self.records.iter().rev().find(|r| r.kind == kind)
    }

    pub(crate) fn push(&mut self, record: LogRecord) {
        self.records.push(record);
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }
}

impl FromIterator<LogRecord> for FitLog {
    fn from_iter<I: IntoIterator<Item = LogRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
            cancelled: false,
        }
    }
}
