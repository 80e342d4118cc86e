use std::{env, fs, process};

use clap::Parser;
use comparator::configs::Cli;
use learning_rules::{CancelToken, LearningMode, RecordKind};

fn scratch(name: &str) -> std::path::PathBuf {
    env::temp_dir().join(format!("comparator-{}-{name}", process::id()))
}

#[test]
fn single_run_on_a_csv_exports_its_log() {
    let csv = scratch("single.csv");
    let log_file = scratch("single.jsonl");

    let mut content = String::from("# x0,x1,label\n");
    for i in 0..60 {
        let class = i % 3;
        let offset = class as f64 * 4.;
        content.push_str(&format!("{},{},{class}\n", offset + (i % 5) as f64 * 0.1, -offset));
    }
    fs::write(&csv, content).unwrap();

    let cli = Cli::parse_from([
        "comparator".to_string(),
        "--csv".to_string(),
        csv.display().to_string(),
        "--classes".to_string(),
        "2".to_string(),
        "--epoch".to_string(),
        "3".to_string(),
        "--batchsize".to_string(),
        "10".to_string(),
        "--hidden".to_string(),
        "8".to_string(),
        "-L".to_string(),
        "FA-PI-B".to_string(),
        "--print-test".to_string(),
        "--log-file".to_string(),
        log_file.display().to_string(),
    ]);

    let trials = comparator::run(&cli, CancelToken::new(), || false).unwrap();

    assert_eq!(trials.len(), 1);
    assert_eq!(trials[0].learning, LearningMode::FaPiB);
    assert_eq!(trials[0].model.output_dim(), 2);
    assert_eq!(trials[0].log.of_kind(RecordKind::Validation).count(), 3);

    let exported = fs::read_to_string(&log_file).unwrap();
    assert_eq!(exported.lines().count(), trials[0].log.len());
    for line in exported.lines() {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["learning"], "FA-PI-B");
    }

    fs::remove_file(csv).unwrap();
    fs::remove_file(log_file).unwrap();
}

#[test]
fn unknown_learning_rules_fail_before_training() {
    let cli = Cli::parse_from(["comparator", "-L", "Hebbian", "--samples", "40"]);

    let err = comparator::run(&cli, CancelToken::new(), || false).unwrap_err();

    assert!(matches!(err, comparator::ComparatorError::Learning(_)));
    let io: std::io::Error = err.into();
    assert_eq!(io.kind(), std::io::ErrorKind::Other);
}
