use std::{
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use learning_rules::{
    CancelToken, Cancellation, Dataset, FitConfig, FitLog, LayerSpec, ModelBuilder, ModelSpec,
    ModelTrainer,
};
use ndarray::Array2;

fn dataset() -> Dataset {
    let x = Array2::from_shape_fn((40, 3), |(i, j)| ((i * 7 + j * 3) % 11) as f64 / 11. - 0.5);
    let y = Array2::from_shape_fn((40, 2), |(i, j)| (i % 2 == j) as u8 as f64);
    Dataset::new(x, y).unwrap()
}

fn trainer() -> ModelTrainer {
    let spec = ModelSpec {
        input_dim: 3,
        layers: vec![
            LayerSpec::new(6, "tanh", true),
            LayerSpec::new(2, "identity", true),
        ],
        loss: "softmax_cross_entropy".to_string(),
        learning: "FA-PI-W".to_string(),
    };

    ModelTrainer::new(ModelBuilder::new(Some(21)).build(&spec).unwrap())
}

fn config() -> FitConfig {
    FitConfig::new(
        NonZeroUsize::new(8).unwrap(),
        NonZeroUsize::new(3).unwrap(),
        0.1,
    )
    .with_gradient_noise(0.001)
}

fn uninterrupted() -> FitLog {
    let train = dataset();
    let validation = dataset();
    trainer()
        .fit(&train, Some(&validation), &config())
        .unwrap()
        .clone()
}

/// Builds a cancellation whose hook is asked at every batch boundary: it requests again
/// after answering, and answers `true` only on call number `stop_at`.
fn asking(stop_at: Option<usize>) -> (Cancellation, Arc<AtomicUsize>) {
    let token = CancelToken::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let hook_token = token.clone();
    let hook_calls = Arc::clone(&calls);
    let confirm = move || {
        let call = hook_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if Some(call) == stop_at {
            return true;
        }

        hook_token.request();
        false
    };

    token.request();
    (Cancellation::new(token, confirm), calls)
}

#[test]
fn declining_every_request_reproduces_the_uninterrupted_log() {
    let (cancellation, calls) = asking(None);
    let mut trainer = trainer().with_cancellation(cancellation);
    let train = dataset();
    let validation = dataset();

    let log = trainer
        .fit(&train, Some(&validation), &config())
        .unwrap()
        .clone();

    // 5 training and 5 validation batches per epoch
    assert_eq!(calls.load(Ordering::SeqCst), 30);
    assert!(!log.is_cancelled());
    assert_eq!(log.records(), uninterrupted().records());
}

#[test]
fn confirming_returns_a_strict_prefix_of_the_log() {
    let full = uninterrupted();

    for stop_at in [1, 4, 8, 13, 30] {
        let (cancellation, _) = asking(Some(stop_at));
        let mut trainer = trainer().with_cancellation(cancellation);
        let train = dataset();
        let validation = dataset();

        let log = trainer.fit(&train, Some(&validation), &config()).unwrap();

        assert!(log.is_cancelled());
        assert!(log.len() < full.len());
        assert_eq!(log.records(), &full.records()[..log.len()]);
    }
}

#[test]
fn a_cancelled_token_stops_before_the_first_batch() {
    let token = CancelToken::new();
    token.cancel();
    let mut trainer = trainer().with_cancellation(Cancellation::new(token, || false));

    let log = trainer.fit(&dataset(), None, &config()).unwrap();

    assert!(log.is_cancelled());
    assert!(log.is_empty());
}
