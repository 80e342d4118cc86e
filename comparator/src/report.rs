//! Textual summaries of the trained models and the JSON lines export of their fit logs.

use std::{
    fs::File,
    io::{BufWriter, Write},
    num::NonZeroUsize,
    path::Path,
};

use learning_rules::{Dataset, LearningMode, LogRecord, RecordKind, training::metrics::argmax};
use ndarray::Axis;
use serde::Serialize;

use crate::{error::Result, experiment::{Trial, mean_validation}};

/// A fit log record tagged with the trial it belongs to.
#[derive(Debug, Serialize)]
struct TaggedRecord<'a> {
    learning: &'a str,
    trial: usize,
    #[serde(flatten)]
    record: &'a LogRecord,
}

/// Writes every record of every trial as one JSON object per line.
pub fn write_jsonl<W: Write>(mut writer: W, trials: &[Trial]) -> Result<()> {
    for trial in trials {
        for record in trial.log.records() {
            let tagged = TaggedRecord {
                learning: trial.learning.name(),
                trial: trial.trial,
                record,
            };

            serde_json::to_writer(&mut writer, &tagged)?;
            writer.write_all(b"\n")?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Exports the fit logs of `trials` to a file, see [`write_jsonl`].
pub fn export<P: AsRef<Path>>(path: P, trials: &[Trial]) -> Result<()> {
    let file = File::create(path)?;
    write_jsonl(BufWriter::new(file), trials)
}

/// Writes the last train and validation scores of every trial.
pub fn final_scores<W: Write>(mut out: W, trials: &[Trial]) -> Result<()> {
    for trial in trials {
        write!(out, "{:<8} trial {}", trial.learning.name(), trial.trial)?;

        for kind in [RecordKind::Train, RecordKind::Validation] {
            if let Some(r) = trial.log.last(kind) {
                let name = if kind == RecordKind::Train { "train" } else { "validation" };
                write!(out, "  {name} loss={:.6} acc={:.6}", r.loss, r.accuracy)?;
            }
        }

        if trial.log.is_cancelled() {
            write!(out, "  (cancelled)")?;
        }

        writeln!(out)?;
    }

    Ok(())
}

/// Tabulates the mean validation scores of every learning rule by training samples.
pub fn comparison<W: Write>(mut out: W, trials: &[Trial], modes: &[LearningMode]) -> Result<()> {
    writeln!(out, "{:<8} {:>10} {:>12} {:>10}", "learning", "samples", "loss", "acc")?;

    for &mode in modes {
        for score in mean_validation(trials, mode) {
            writeln!(
                out,
                "{:<8} {:>10} {:>12.6} {:>10.4}",
                mode.name(),
                score.samples,
                score.loss,
                score.accuracy
            )?;
        }
    }

    Ok(())
}

/// Lists the predicted and true class of every test sample, `o` marking the hits.
pub fn test_predictions<W: Write>(
    mut out: W,
    trial: &Trial,
    test: &Dataset,
    batch_size: NonZeroUsize,
) -> Result<()> {
    let y_pred = trial.model.predict(test.x(), batch_size)?;

    for (p, t) in y_pred.axis_iter(Axis(0)).zip(test.y().axis_iter(Axis(0))) {
        let (p, t) = (argmax(p), argmax(t));
        writeln!(out, "{p} {t} {}", if p == t { 'o' } else { 'x' })?;
    }

    Ok(())
}
