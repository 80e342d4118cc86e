use std::{collections::BTreeMap, sync::Arc};

use learning_rules::{
    CancelToken, Cancellation, Confirm, Dataset, FitConfig, FitLog, LearningMode, Model,
    ModelBuilder, ModelTrainer, RecordKind,
};
use log::info;
use rayon::prelude::*;

use crate::{configs::Cli, error::Result};

/// The outcome of training one model.
#[derive(Debug)]
pub struct Trial {
    pub learning: LearningMode,
    pub trial: usize,
    pub log: FitLog,
    pub model: Model,
}

/// The mean validation scores of a learning rule after some amount of training samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanScore {
    pub samples: usize,
    pub loss: f64,
    pub accuracy: f64,
}

/// Trains every requested learning rule on the same data.
pub struct Experiment {
    config: FitConfig,
    token: CancelToken,
    confirm: Arc<dyn Confirm>,
}

impl Experiment {
    /// Creates a new `Experiment`.
    ///
    /// # Arguments
    /// * `config` - The hyperparameters shared by every trial.
    /// * `token` - The token shared by every trial, cancelling it stops them all.
    /// * `confirm` - Asked whether to stop when an interruption is requested.
    pub fn new<C>(config: FitConfig, token: CancelToken, confirm: C) -> Self
    where
        C: Confirm + 'static,
    {
        Self {
            config,
            token,
            confirm: Arc::new(confirm),
        }
    }

    /// Trains `trials` fresh models per learning rule in parallel.
    ///
    /// # Arguments
    /// * `cli` - The options describing the topology and seeds.
    /// * `train` - The training set.
    /// * `test` - The validation set.
    ///
    /// # Returns
    /// The trials ordered by learning rule then trial, or the first error that occurred.
    pub fn run(&self, cli: &Cli, train: &Dataset, test: &Dataset) -> Result<Vec<Trial>> {
        let modes = cli.learning_modes()?;
        let trials = cli.trials()?;

        let jobs: Vec<_> = modes
            .iter()
            .flat_map(|&mode| (0..trials).map(move |trial| (mode, trial)))
            .collect();

        info!(
            "training {} model(s) for {} epoch(s)",
            jobs.len(),
            self.config.epochs
        );

        jobs.into_par_iter()
            .map(|(mode, trial)| self.run_trial(cli, mode, trial, train, test))
            .collect()
    }

    fn run_trial(
        &self,
        cli: &Cli,
        learning: LearningMode,
        trial: usize,
        train: &Dataset,
        test: &Dataset,
    ) -> Result<Trial> {
        let spec = cli.model_spec(train.x_size(), train.y_size(), learning);
        let seed = cli.seed.wrapping_add(trial as u64);
        let model = ModelBuilder::new(Some(seed)).build(&spec)?;

        let confirm = Arc::clone(&self.confirm);
        let cancellation = Cancellation::new(self.token.clone(), move || confirm.confirm());
        let mut trainer = ModelTrainer::new(model).with_cancellation(cancellation);

        info!("start {learning} trial {trial}");
        trainer.fit(train, Some(test), &self.config)?;

        let log = trainer.log().clone();
        Ok(Trial {
            learning,
            trial,
            log,
            model: trainer.into_model(),
        })
    }
}

/// Averages the validation records of a learning rule's trials by sample count.
pub fn mean_validation(trials: &[Trial], learning: LearningMode) -> Vec<MeanScore> {
    let mut groups: BTreeMap<usize, (f64, f64, usize)> = BTreeMap::new();

    let records = trials
        .iter()
        .filter(|t| t.learning == learning)
        .flat_map(|t| t.log.of_kind(RecordKind::Validation));

    for record in records {
        let (loss, accuracy, count) = groups.entry(record.samples).or_default();
        *loss += record.loss;
        *accuracy += record.accuracy;
        *count += 1;
    }

    groups
        .into_iter()
        .map(|(samples, (loss, accuracy, count))| MeanScore {
            samples,
            loss: loss / count as f64,
            accuracy: accuracy / count as f64,
        })
        .collect()
}
