use std::{num::NonZeroUsize, path::PathBuf};

use clap::{Parser, ValueEnum};
use learning_rules::{FitConfig, LayerSpec, LearningMode, ModelSpec};

use crate::error::{ComparatorError, Result};

/// The synthetic datasets that can be generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DatasetKind {
    Blobs,
    Spiral,
}

/// What to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemoKind {
    /// Train a single model with the selected learning rule.
    Single,
    /// Train every learning rule and average the validation scores over the trials.
    Compare,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "comparator",
    about = "Compare back-propagation, pseudoinverse and feedback alignment learning rules"
)]
pub struct Cli {
    /// Number of training epochs
    #[arg(short, long, default_value_t = 10)]
    pub epoch: usize,

    /// Mini-batch size
    #[arg(short, long, default_value_t = 128)]
    pub batchsize: usize,

    /// Synthetic dataset, ignored when --csv is given
    #[arg(short, long, value_enum, default_value_t = DatasetKind::Blobs)]
    pub dataset: DatasetKind,

    /// CSV file with the features followed by the integer label on every line
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Only samples with a label lower than this are kept
    #[arg(short, long, default_value_t = 10)]
    pub classes: usize,

    /// Number of synthetic samples
    #[arg(long, default_value_t = 2000)]
    pub samples: usize,

    /// Fraction of samples held out for validation
    #[arg(short, long, default_value_t = 0.2)]
    pub test_size: f64,

    #[arg(short, long, default_value_t = 0.001)]
    pub learning_rate: f64,

    /// Standard deviation of the noise added to the gradients
    #[arg(short, long, default_value_t = 0.0)]
    pub gradient_noise: f64,

    /// Per sample weight decay rate
    #[arg(short, long, default_value_t = 0.0)]
    pub weight_decay: f64,

    #[arg(short = 'D', long, value_enum, default_value_t = DemoKind::Single)]
    pub demo: DemoKind,

    /// Learning rule used by the single demo: BP, PI, FA, FA-PI-W or FA-PI-B
    #[arg(short = 'L', long, default_value = "BP")]
    pub learning: String,

    /// Units of every hidden layer
    #[arg(long, value_delimiter = ',', default_value = "80,80")]
    pub hidden: Vec<usize>,

    /// Activation of the hidden layers
    #[arg(long, default_value = "relu")]
    pub activation: String,

    /// Repetitions of every learning rule in the compare demo
    #[arg(long, default_value_t = 2)]
    pub trials: usize,

    #[arg(short, long, default_value_t = 1)]
    pub seed: u64,

    /// Print the prediction of every validation sample
    #[arg(short = 'T', long)]
    pub print_test: bool,

    /// Write every fit log record as a JSON line to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Builds the fit configuration from the options.
    pub fn fit_config(&self) -> Result<FitConfig> {
        let positive = |value: usize, name: &str| {
            NonZeroUsize::new(value)
                .ok_or_else(|| ComparatorError::InvalidConfig(format!("{name} must be positive")))
        };

        let config = FitConfig::new(
            positive(self.batchsize, "batch size")?,
            positive(self.epoch, "epochs")?,
            self.learning_rate,
        )
        .with_gradient_noise(self.gradient_noise)
        .with_weight_decay(self.weight_decay);

        config.validate()?;
        Ok(config)
    }

    /// Returns the learning rules to train.
    pub fn learning_modes(&self) -> Result<Vec<LearningMode>> {
        match self.demo {
            DemoKind::Single => Ok(vec![self.learning.parse()?]),
            DemoKind::Compare => Ok(LearningMode::ALL.to_vec()),
        }
    }

    /// Returns the amount of models trained per learning rule.
    pub fn trials(&self) -> Result<usize> {
        match self.demo {
            DemoKind::Single => Ok(1),
            DemoKind::Compare if self.trials == 0 => Err(ComparatorError::InvalidConfig(
                "trials must be positive".into(),
            )),
            DemoKind::Compare => Ok(self.trials),
        }
    }

    /// Builds the spec of the compared topology: the hidden layers followed by an identity
    /// output layer, trained with softmax cross entropy.
    ///
    /// # Arguments
    /// * `input_dim` - The amount of features.
    /// * `classes` - The amount of output units.
    /// * `mode` - The learning rule.
    pub fn model_spec(&self, input_dim: usize, classes: usize, mode: LearningMode) -> ModelSpec {
        let mut layers: Vec<_> = self
            .hidden
            .iter()
            .map(|&units| LayerSpec::new(units, &self.activation, true))
            .collect();

        layers.push(LayerSpec::new(classes, "identity", true));

        ModelSpec {
            input_dim,
            layers,
            loss: "softmax_cross_entropy".to_string(),
            learning: mode.name().to_string(),
        }
    }
}
