use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::{LearnErr, Result};

const DEFAULT_BATCH_SIZE: NonZeroUsize = NonZeroUsize::new(64).unwrap();
const DEFAULT_EPOCHS: NonZeroUsize = NonZeroUsize::new(5).unwrap();

/// The hyperparameters of a call to `ModelTrainer::fit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    pub batch_size: NonZeroUsize,
    pub epochs: NonZeroUsize,
    pub learning_rate: f64,
    /// Standard deviation of the normal noise added to every gradient.
    #[serde(default)]
    pub gradient_noise: f64,
    /// Per sample weight decay rate, applied after every batch.
    #[serde(default)]
    pub weight_decay: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            epochs: DEFAULT_EPOCHS,
            learning_rate: 0.001,
            gradient_noise: 0.,
            weight_decay: 0.,
        }
    }
}

impl FitConfig {
    /// Creates a new `FitConfig` without gradient noise nor weight decay.
    pub fn new(batch_size: NonZeroUsize, epochs: NonZeroUsize, learning_rate: f64) -> Self {
        Self {
            batch_size,
            epochs,
            learning_rate,
            ..Default::default()
        }
    }

    pub fn with_gradient_noise(mut self, gradient_noise: f64) -> Self {
        self.gradient_noise = gradient_noise;
        self
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    /// Checks every hyperparameter is in range.
    ///
    /// # Returns
    /// `InvalidConfiguration` naming the first offending hyperparameter.
    pub fn validate(&self) -> Result<()> {
        let &Self {
            learning_rate,
            gradient_noise,
            weight_decay,
            ..
        } = self;

        if !(learning_rate.is_finite() && learning_rate > 0.) {
            return Err(LearnErr::invalid_config(format!(
                "learning rate must be positive, got {learning_rate}"
            )));
        }

        if !(gradient_noise.is_finite() && gradient_noise >= 0.) {
            return Err(LearnErr::invalid_config(format!(
                "gradient noise must be non negative, got {gradient_noise}"
            )));
        }

        if !(0. ..1.).contains(&weight_decay) {
            return Err(LearnErr::invalid_config(format!(
                "weight decay must be in [0, 1), got {weight_decay}"
            )));
        }

        Ok(())
    }
}
