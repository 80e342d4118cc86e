//! Dataset preparation: synthetic or CSV samples, feature scaling, class filtering, one-hot
//! encoding and the train/test split.

use std::{f64::consts::PI, fs, path::Path};

use learning_rules::Dataset;
use log::info;
use ndarray::{Array2, Axis};
use ndarray_rand::RandomExt;
use rand::{Rng, seq::SliceRandom};
use rand_distr::{Normal, StandardNormal};

use crate::error::{ComparatorError, Result};

const BLOB_RADIUS: f64 = 3.0;
const BLOB_STD: f64 = 0.5;
const SPIRAL_TURNS: f64 = 1.5;
const SPIRAL_NOISE: f64 = 0.2;

/// Labelled samples, one row of `x` per label.
#[derive(Debug, Clone, PartialEq)]
pub struct Samples {
    pub x: Array2<f64>,
    pub labels: Vec<usize>,
}

impl Samples {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Keeps only the samples whose label is lower than `classes`.
    pub fn filter_classes(self, classes: usize) -> Self {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&i| self.labels[i] < classes)
            .collect();

        Self {
            x: self.x.select(Axis(0), &keep),
            labels: keep.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// Draws `samples` points around `classes` centers evenly spread on a circle.
///
/// # Arguments
/// * `classes` - The amount of clusters.
/// * `samples` - The total amount of points, assigned round robin to the clusters.
/// * `rng` - The generator the points are drawn from.
pub fn blobs<R: Rng>(classes: usize, samples: usize, rng: &mut R) -> Result<Samples> {
    check_classes(classes)?;

    let noise = Normal::new(0., BLOB_STD)
        .map_err(|e| ComparatorError::InvalidConfig(e.to_string()))?;
    let mut x = Array2::random_using((samples, 2), noise, rng);
    let labels: Vec<usize> = (0..samples).map(|i| i % classes).collect();

    for (mut row, &label) in x.axis_iter_mut(Axis(0)).zip(&labels) {
        let angle = 2. * PI * label as f64 / classes as f64;
        row[0] += BLOB_RADIUS * angle.cos();
        row[1] += BLOB_RADIUS * angle.sin();
    }

    Ok(Samples { x, labels })
}

/// Draws `samples` points on `classes` interleaved spiral arms.
pub fn spiral<R: Rng>(classes: usize, samples: usize, rng: &mut R) -> Result<Samples> {
    check_classes(classes)?;

    let jitter: Array2<f64> = Array2::random_using((samples, 1), StandardNormal, rng);
    let mut x = Array2::zeros((samples, 2));
    let labels: Vec<usize> = (0..samples).map(|i| i % classes).collect();
    let per_class = samples.div_ceil(classes).max(1) as f64;

    for (i, mut row) in x.axis_iter_mut(Axis(0)).enumerate() {
        let label = labels[i];
        let t = (i / classes) as f64 / per_class;
        let theta = 2. * PI * (label as f64 / classes as f64 + SPIRAL_TURNS * t)
            + SPIRAL_NOISE * jitter[[i, 0]];

        row[0] = t * theta.cos();
        row[1] = t * theta.sin();
    }

    Ok(Samples { x, labels })
}

/// Loads samples from a CSV file, every line holding the features followed by the label.
///
/// Empty lines and lines starting with `#` are skipped.
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Samples> {
    let content = fs::read_to_string(path)?;
    parse_csv(&content)
}

fn parse_csv(content: &str) -> Result<Samples> {
    let mut features = Vec::new();
    let mut labels = Vec::new();
    let mut width = None;

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parse_err = |msg: String| ComparatorError::Parse { line: i + 1, msg };

        let values = line
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| parse_err(format!("invalid number: {e}")))?;

        let Some((&label, row)) = values.split_last() else {
            return Err(parse_err("missing label".into()));
        };

        if row.is_empty() {
            return Err(parse_err("a sample needs at least one feature".into()));
        }

        if *width.get_or_insert(row.len()) != row.len() {
            return Err(parse_err(format!(
                "expected {} features, got {}",
                width.unwrap_or_default(),
                row.len()
            )));
        }

        if label < 0. || label.fract() != 0. {
            return Err(parse_err(format!("label {label} is not a class index")));
        }

        features.extend_from_slice(row);
        labels.push(label as usize);
    }

    let width = width.unwrap_or_default();
    let x = Array2::from_shape_vec((labels.len(), width), features)
        .map_err(|e| ComparatorError::InvalidConfig(e.to_string()))?;

    Ok(Samples { x, labels })
}

/// Scales every feature to `[-0.5, 0.5]` using the global minimum and range.
pub fn normalize(x: &mut Array2<f64>) -> Result<()> {
    let min = x.iter().copied().fold(f64::INFINITY, f64::min);
    let max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let ptp = max - min;

    if !(ptp.is_finite() && ptp > 0.) {
        return Err(ComparatorError::InvalidConfig(
            "cannot normalize constant or empty features".into(),
        ));
    }

    x.mapv_inplace(|v| (v - min) / ptp - 0.5);
    Ok(())
}

/// Encodes the labels one-hot, with `1 + max(labels)` columns.
pub fn category_encode(labels: &[usize]) -> Array2<f64> {
    let width = labels.iter().max().map_or(0, |&max| max + 1);
    let mut encoded = Array2::zeros((labels.len(), width));

    for (i, &label) in labels.iter().enumerate() {
        encoded[[i, label]] = 1.;
    }

    encoded
}

/// Shuffles the samples and splits them into a training and a test set.
///
/// # Arguments
/// * `x` - The features.
/// * `y` - The encoded targets.
/// * `test_size` - The fraction of samples held out for testing, rounded up.
/// * `rng` - The generator used to shuffle.
pub fn train_test_split<R: Rng>(
    x: &Array2<f64>,
    y: &Array2<f64>,
    test_size: f64,
    rng: &mut R,
) -> Result<(Dataset, Dataset)> {
    if !(test_size > 0. && test_size < 1.) {
        return Err(ComparatorError::InvalidConfig(format!(
            "test size must be in (0, 1), got {test_size}"
        )));
    }

    let n = x.nrows();
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(ComparatorError::InvalidConfig(format!(
            "cannot hold out {n_test} of {n} samples"
        )));
    }

    let mut idx: Vec<usize> = (0..n).collect();
    idx.shuffle(rng);
    let (test, train) = idx.split_at(n_test);

    let train = Dataset::new(x.select(Axis(0), train), y.select(Axis(0), train))?;
    let test = Dataset::new(x.select(Axis(0), test), y.select(Axis(0), test))?;
    Ok((train, test))
}

/// Normalizes, filters, encodes and splits samples into a training and a test set.
pub fn prepare<R: Rng>(
    mut samples: Samples,
    classes: usize,
    test_size: f64,
    rng: &mut R,
) -> Result<(Dataset, Dataset)> {
    normalize(&mut samples.x)?;
    let samples = samples.filter_classes(classes);

    if samples.is_empty() {
        return Err(ComparatorError::InvalidConfig(format!(
            "no sample has a label lower than {classes}"
        )));
    }

    info!(
        "dataset {} samples {} features",
        samples.len(),
        samples.x.ncols()
    );

    let y = category_encode(&samples.labels);
    train_test_split(&samples.x, &y, test_size, rng)
}

fn check_classes(classes: usize) -> Result<()> {
    if classes < 2 {
        return Err(ComparatorError::InvalidConfig(format!(
            "at least two classes are needed, got {classes}"
        )));
    }

    Ok(())
}
