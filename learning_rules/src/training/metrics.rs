use ndarray::{ArrayView1, ArrayView2, Axis};

/// Returns the index of the largest value, the first one on ties.
pub fn argmax(row: ArrayView1<f64>) -> usize {
    row.iter()
        .enumerate()
        .fold(0, |max_i, (i, &v)| if v > row[max_i] { i } else { max_i })
}

/// Counts the rows whose predicted class matches the target class.
pub fn count_correct(y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> usize {
    y_pred
        .axis_iter(Axis(0))
        .zip(y.axis_iter(Axis(0)))
        .filter(|(p, t)| argmax(p.view()) == argmax(t.view()))
        .count()
}

/// Accumulates the loss and accuracy of consecutive batches.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningScore {
    loss: f64,
    correct: usize,
    samples: usize,
}

impl RunningScore {
    /// Adds the scores of a batch.
    ///
    /// # Arguments
    /// * `loss` - The summed per sample loss of the batch.
    /// * `correct` - The amount of correctly classified samples.
    /// * `samples` - The size of the batch.
    pub fn add(&mut self, loss: f64, correct: usize, samples: usize) {
        self.loss += loss;
        self.correct += correct;
        self.samples += samples;
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Returns the mean loss per sample.
    pub fn loss(&self) -> f64 {
        self.loss / self.samples as f64
    }

    pub fn accuracy(&self) -> f64 {
        self.correct as f64 / self.samples as f64
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn argmax_picks_the_first_maximum() {
        assert_eq!(argmax(array![0.1, 0.7, 0.7].view()), 1);
        assert_eq!(argmax(array![-1., -2.].view()), 0);
    }

    #[test]
    fn correct_predictions_are_counted_by_class() {
        let y_pred = array![[0.9, 0.1], [0.2, 0.8], [0.6, 0.4]];
        let y = array![[1., 0.], [1., 0.], [1., 0.]];
        assert_eq!(count_correct(y_pred.view(), y.view()), 2);
    }

    #[test]
    fn running_score_averages_over_samples() {
        let mut score = RunningScore::default();
        score.add(3., 2, 4);
        score.add(1., 0, 4);

        assert_eq!(score.samples(), 8);
        assert_eq!(score.loss(), 0.5);
        assert_eq!(score.accuracy(), 0.25);
    }
}
