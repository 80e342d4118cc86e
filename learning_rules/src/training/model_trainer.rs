use std::ops::ControlFlow;

use log::{debug, info};
use ndarray::ArrayView2;

use super::{
    Cancellation, FitConfig, FitLog, LogRecord, RecordKind,
    metrics::{RunningScore, count_correct},
};
use crate::{
    LearnErr, Result,
    arch::{Model, loss::LossFn},
    dataset::Dataset,
};

/// Trains a [`Model`] with mini batch gradient descent and keeps the log of its last fit.
pub struct ModelTrainer {
    model: Model,
    cancellation: Option<Cancellation>,
    log: FitLog,
}

impl ModelTrainer {
    /// Creates a new `ModelTrainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    pub fn new(model: Model) -> Self {
        Self {
            model,
            cancellation: None,
            log: FitLog::new(),
        }
    }

    /// Makes the training loop check `cancellation` at every batch boundary.
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    /// Returns the log of the last call to `fit`.
    pub fn log(&self) -> &FitLog {
        &self.log
    }

    /// Trains the model for `config.epochs` epochs.
    ///
    /// # Arguments
    /// * `train` - The training samples, iterated in order.
    /// * `validation` - Samples scored after every epoch, if any.
    /// * `config` - The hyperparameters of this fit.
    ///
    /// # Returns
    /// The fit log, a prefix of the full log if training was cancelled, or an error if the
    /// configuration is invalid or a dataset doesn't fit the model.
    pub fn fit(
        &mut self,
        train: &Dataset,
        validation: Option<&Dataset>,
        config: &FitConfig,
    ) -> Result<&FitLog> {
        config.validate()?;
        self.check_dataset(train)?;

        if train.is_empty() {
            return Err(LearnErr::invalid_config("the training set is empty"));
        }

        let validation = match validation {
            Some(dataset) => {
                self.check_dataset(dataset)?;
                Some(dataset).filter(|dataset| !dataset.is_empty())
            }
            None => None,
        };

        self.log = FitLog::new();
        let epochs = config.epochs.get();
        let mut total = 0;

        for epoch in 1..=epochs {
            let ControlFlow::Continue(score) = self.train_epoch(train, config, total)? else {
                self.log.mark_cancelled();
                break;
            };

            total += score.samples();
            self.record(epoch, epochs, total, score, RecordKind::Train);

            let Some(validation) = validation else {
                continue;
            };

            let ControlFlow::Continue(score) = self.score(validation, config)? else {
                self.log.mark_cancelled();
                break;
            };

            self.record(epoch, epochs, total, score, RecordKind::Validation);
        }

        Ok(&self.log)
    }

    /// Computes the mean loss and accuracy of the model over a dataset.
    pub fn evaluate(&self, dataset: &Dataset, config: &FitConfig) -> Result<RunningScore> {
        self.check_dataset(dataset)?;

        let mut score = RunningScore::default();
        for (x, y) in dataset.batches(config.batch_size) {
            self.score_batch(&mut score, x, y)?;
        }

        Ok(score)
    }

    fn train_epoch(
        &mut self,
        train: &Dataset,
        config: &FitConfig,
        total: usize,
    ) -> Result<ControlFlow<(), RunningScore>> {
        let loss_fn = self.model.loss();
        let mut score = RunningScore::default();

        for (x, y) in train.batches(config.batch_size) {
            if self.should_stop() {
                return Ok(ControlFlow::Break(()));
            }

            let n = x.nrows();
            let pass = self.model.forward(x)?;
            let y_pred = pass.output();

            let delta = loss_fn.loss_prime(y_pred, y) / n as f64;
            score.add(loss_fn.loss(y_pred, y).sum(), count_correct(y_pred, y), n);

            self.log.push(LogRecord {
                samples: total + score.samples(),
                loss: score.loss(),
                accuracy: score.accuracy(),
                kind: RecordKind::TrainIntermediate,
            });

            self.model.backward(
                pass,
                delta.view(),
                config.learning_rate,
                config.gradient_noise,
            )?;

            if config.weight_decay > 0. {
                self.model.weight_decay(config.weight_decay, n);
            }
        }

        Ok(ControlFlow::Continue(score))
    }

    fn score(&self, dataset: &Dataset, config: &FitConfig) -> Result<ControlFlow<(), RunningScore>> {
        let mut score = RunningScore::default();

        for (x, y) in dataset.batches(config.batch_size) {
            if self.should_stop() {
                return Ok(ControlFlow::Break(()));
            }

            self.score_batch(&mut score, x, y)?;
        }

        Ok(ControlFlow::Continue(score))
    }

    fn score_batch(
        &self,
        score: &mut RunningScore,
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
    ) -> Result<()> {
        let loss_fn = self.model.loss();
        let pass = self.model.forward(x)?;
        let y_pred = pass.output();

        score.add(
            loss_fn.loss(y_pred, y).sum(),
            count_correct(y_pred, y),
            x.nrows(),
        );

        Ok(())
    }

    fn record(
        &mut self,
        epoch: usize,
        epochs: usize,
        samples: usize,
        score: RunningScore,
        kind: RecordKind,
    ) {
        let (loss, accuracy) = (score.loss(), score.accuracy());
        let name = match kind {
            RecordKind::Validation => "validation",
            _ => "train",
        };

        info!("epoch {epoch:>3}/{epochs:>3} {name:<10} loss={loss:.6} acc={accuracy:.6}");
        debug!(epoch = epoch, samples = samples; "recorded {name} scores");

        self.log.push(LogRecord {
            samples,
            loss,
            accuracy,
            kind,
        });
    }

    fn should_stop(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|cancellation| cancellation.should_stop())
    }

    fn check_dataset(&self, dataset: &Dataset) -> Result<()> {
        LearnErr::check_dim("dataset features", dataset.x_size(), self.model.input_dim())?;
        LearnErr::check_dim("dataset targets", dataset.y_size(), self.model.output_dim())
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use ndarray::{Array2, array};

    use super::*;
    use crate::arch::{LayerSpec, ModelBuilder, ModelSpec};

    fn trainer() -> ModelTrainer {
        let spec = ModelSpec {
            input_dim: 2,
            layers: vec![LayerSpec::new(3, "tanh", true), LayerSpec::new(2, "identity", true)],
            loss: "mse".to_string(),
            learning: "BP".to_string(),
        };

        ModelTrainer::new(ModelBuilder::new(Some(3)).build(&spec).unwrap())
    }

    fn dataset(samples: usize) -> Dataset {
        let x = Array2::from_shape_fn((samples, 2), |(i, j)| (i + j) as f64 / samples as f64);
        let y = Array2::from_shape_fn((samples, 2), |(i, j)| ((i % 2) == j) as u8 as f64);
        Dataset::new(x, y).unwrap()
    }

    fn config(epochs: usize) -> FitConfig {
        FitConfig::new(
            NonZeroUsize::new(4).unwrap(),
            NonZeroUsize::new(epochs).unwrap(),
            0.05,
        )
    }

    #[test]
    fn log_layout_follows_batches_and_epochs() {
        let mut trainer = trainer();
        let log = trainer
            .fit(&dataset(10), Some(&dataset(6)), &config(2))
            .unwrap();

        let kinds: Vec<_> = log.records().iter().map(|r| r.kind).collect();
        let samples: Vec<_> = log.records().iter().map(|r| r.samples).collect();

        use RecordKind::*;
        assert_eq!(
            kinds,
            [
                TrainIntermediate,
                TrainIntermediate,
                TrainIntermediate,
                Train,
                Validation,
                TrainIntermediate,
                TrainIntermediate,
                TrainIntermediate,
                Train,
                Validation
            ]
        );
        assert_eq!(samples, [4, 8, 10, 10, 10, 14, 18, 20, 20, 20]);
        assert!(!log.is_cancelled());
    }

    #[test]
    fn epoch_record_matches_the_last_running_score() {
        let mut trainer = trainer();
        let log = trainer.fit(&dataset(10), None, &config(1)).unwrap();

        let intermediate = log.last(RecordKind::TrainIntermediate).unwrap();
        let epoch = log.last(RecordKind::Train).unwrap();

        assert_eq!(intermediate.loss, epoch.loss);
        assert_eq!(intermediate.accuracy, epoch.accuracy);
    }

    #[test]
    fn every_fit_starts_a_fresh_log() {
        let mut trainer = trainer();
        trainer.fit(&dataset(8), None, &config(1)).unwrap();
        let log = trainer.fit(&dataset(8), None, &config(1)).unwrap();

        assert_eq!(log.len(), 3);
        assert_eq!(log.records()[0].samples, 4);
    }

    #[test]
    fn mismatched_datasets_are_rejected() {
        let mut trainer = trainer();
        let wide = Dataset::new(Array2::zeros((4, 3)), Array2::zeros((4, 2))).unwrap();
        let narrow_targets = Dataset::new(Array2::zeros((4, 2)), array![[1.], [0.], [1.], [0.]])
            .unwrap();

        for bad in [&wide, &narrow_targets] {
            assert!(matches!(
                trainer.fit(bad, None, &config(1)),
                Err(LearnErr::ShapeMismatch { .. })
            ));
            assert!(matches!(
                trainer.fit(&dataset(4), Some(bad), &config(1)),
                Err(LearnErr::ShapeMismatch { .. })
            ));
        }
    }

    #[test]
    fn invalid_configs_are_rejected_before_training() {
        let mut trainer = trainer();
        let before = trainer.model().layers().to_vec();

        let result = trainer.fit(&dataset(4), None, &config(1).with_weight_decay(2.));

        assert!(matches!(result, Err(LearnErr::InvalidConfiguration(_))));
        assert_eq!(trainer.model().layers(), before.as_slice());
    }

    #[test]
    fn evaluate_does_not_touch_the_weights() {
        let trainer = trainer();
        let before = trainer.model().layers().to_vec();

        let score = trainer.evaluate(&dataset(6), &config(1)).unwrap();

        assert_eq!(score.samples(), 6);
        assert_eq!(trainer.model().layers(), before.as_slice());
    }
}
