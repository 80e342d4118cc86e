pub mod configs;
pub mod data;
pub mod error;
pub mod experiment;
pub mod report;

use std::io;

use learning_rules::{CancelToken, Confirm};
use log::info;
use rand::{SeedableRng, rngs::StdRng};

use configs::{Cli, DatasetKind, DemoKind};
use experiment::{Experiment, Trial};

pub use error::{ComparatorError, Result};

/// Prepares the dataset, trains the requested models and reports their scores.
///
/// # Arguments
/// * `cli` - The parsed command line options.
/// * `token` - Interrupts every model being trained.
/// * `confirm` - Asked whether to stop when an interruption is requested.
///
/// # Returns
/// The trained models and their fit logs.
pub fn run<C>(cli: &Cli, token: CancelToken, confirm: C) -> Result<Vec<Trial>>
where
    C: Confirm + 'static,
{
    let config = cli.fit_config()?;
    let mut rng = StdRng::seed_from_u64(cli.seed);

    let samples = match (&cli.csv, cli.dataset) {
        (Some(path), _) => data::load_csv(path)?,
        (None, DatasetKind::Blobs) => data::blobs(cli.classes, cli.samples, &mut rng)?,
        (None, DatasetKind::Spiral) => data::spiral(cli.classes, cli.samples, &mut rng)?,
    };

    let (train, test) = data::prepare(samples, cli.classes, cli.test_size, &mut rng)?;
    info!("{} training and {} test samples", train.len(), test.len());

    let experiment = Experiment::new(config, token, confirm);
    let trials = experiment.run(cli, &train, &test)?;

    let mut stdout = io::stdout().lock();
    report::final_scores(&mut stdout, &trials)?;

    match cli.demo {
        DemoKind::Single if cli.print_test => {
            for trial in &trials {
                report::test_predictions(&mut stdout, trial, &test, config.batch_size)?;
            }
        }
        DemoKind::Single => {}
        DemoKind::Compare => {
            report::comparison(&mut stdout, &trials, &cli.learning_modes()?)?;
        }
    }

    if let Some(path) = &cli.log_file {
        report::export(path, &trials)?;
        info!("fit logs written to {}", path.display());
    }

    Ok(trials)
}
