use std::num::NonZeroUsize;

use ndarray::prelude::*;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand_distr::Normal;

use super::{Feedback, LearningMode, layers::Dense, loss::Loss};
use crate::{LearnErr, Result};

/// The activations of every layer computed by [`Model::forward`].
///
/// Index `0` holds the input batch and index `i + 1` the output of layer `i`. The pass is
/// consumed by [`Model::backward`], so no cache is ever left behind in the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardPass {
    activations: Vec<Array2<f64>>,
}

impl ForwardPass {
    pub fn activations(&self) -> &[Array2<f64>] {
        &self.activations
    }

    /// Returns the number of samples that went through the model.
    pub fn batch_size(&self) -> usize {
        self.activations.first().map_or(0, |a| a.nrows())
    }

    /// Returns the output of the last layer.
    pub fn output(&self) -> ArrayView2<'_, f64> {
        self.activations[self.activations.len() - 1].view()
    }
}

/// A feed forward network of dense layers together with the learning rule that updates it.
#[derive(Debug, Clone)]
pub struct Model {
    layers: Vec<Dense>,
    feedback: Feedback,
    loss: Loss,
    rng: StdRng,
}

impl Model {
    /// Creates a new `Model`.
    ///
    /// # Arguments
    /// * `layers` - The layers, each one's input dimension matching the previous one's output.
    /// * `feedback` - The learning rule, alignment rules hold one matrix per layer.
    /// * `loss` - The loss function the model is trained with.
    /// * `rng` - The generator used for gradient noise.
    ///
    /// # Returns
    /// The new model or an error if the layers or feedback matrices don't chain up.
    pub fn new(layers: Vec<Dense>, feedback: Feedback, loss: Loss, rng: StdRng) -> Result<Self> {
        if layers.is_empty() {
            return Err(LearnErr::invalid_config("a model needs at least one layer"));
        }

        for pair in layers.windows(2) {
            LearnErr::check_dim("layer inputs", pair[1].input_dim(), pair[0].output_dim())?;
        }

        if let Some(matrices) = feedback.matrices() {
            LearnErr::check_dim("feedback matrices", matrices.len(), layers.len())?;

            for (b, layer) in matrices.iter().zip(&layers) {
                LearnErr::check_dim("feedback rows", b.nrows(), layer.output_dim())?;
                LearnErr::check_dim("feedback columns", b.ncols(), layer.input_dim())?;
            }
        }

        Ok(Self {
            layers,
            feedback,
            loss,
            rng,
        })
    }

    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    pub fn feedback(&self) -> &Feedback {
        &self.feedback
    }

    pub fn learning_mode(&self) -> LearningMode {
        self.feedback.mode()
    }

    pub fn loss(&self) -> Loss {
        self.loss
    }

    pub fn input_dim(&self) -> usize {
        self.layers[0].input_dim()
    }

    pub fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].output_dim()
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `x` - A `batch x input_dim` matrix.
    ///
    /// # Returns
    /// The activations of every layer or `ShapeMismatch` if `x` has the wrong width.
    pub fn forward(&self, x: ArrayView2<f64>) -> Result<ForwardPass> {
        LearnErr::check_dim("batch features", x.ncols(), self.input_dim())?;

        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(x.to_owned());

        for layer in &self.layers {
            let a = layer.forward(activations[activations.len() - 1].view());
            activations.push(a);
        }

        Ok(ForwardPass { activations })
    }

    /// Computes the gradient of every layer's weights without updating them.
    ///
    /// # Arguments
    /// * `pass` - The forward pass the output gradient was computed on.
    /// * `delta` - The gradient of the loss with respect to the model's output.
    ///
    /// # Returns
    /// One gradient per layer, shaped like the layer's weights, frozen layers included.
    pub fn gradients(&self, pass: &ForwardPass, delta: ArrayView2<f64>) -> Result<Vec<Array2<f64>>> {
        let deltas = self.deltas(pass, delta)?;

        let grads = self
            .layers
            .iter()
            .zip(&deltas)
            .zip(&pass.activations)
            .map(|((layer, d), x)| layer.gradient(d.view(), x.view()))
            .collect();

        Ok(grads)
    }

    /// Transports the output error back through the network and updates every updatable
    /// layer with gradient descent.
    ///
    /// # Arguments
    /// * `pass` - The forward pass the output gradient was computed on.
    /// * `delta` - The gradient of the loss with respect to the output, already averaged.
    /// * `learning_rate` - The step size.
    /// * `gradient_noise` - The standard deviation of the normal noise added to each gradient,
    ///   zero disables it.
    pub fn backward(
        &mut self,
        pass: ForwardPass,
        delta: ArrayView2<f64>,
        learning_rate: f64,
        gradient_noise: f64,
    ) -> Result<()> {
        let deltas = self.deltas(&pass, delta)?;

        let noise = if gradient_noise > 0. {
            let normal = Normal::new(0., gradient_noise).map_err(|e| {
                LearnErr::invalid_config(format!("gradient noise {gradient_noise}: {e}"))
            })?;
            Some(normal)
        } else {
            None
        };

        for ((layer, d), x) in self.layers.iter_mut().zip(&deltas).zip(&pass.activations) {
            if !layer.is_updatable() {
                continue;
            }

            let mut grad = layer.gradient(d.view(), x.view());

            if let Some(normal) = noise {
                grad += &Array2::random_using(grad.raw_dim(), normal, &mut self.rng);
            }

            layer.step(&grad, learning_rate);
        }

        Ok(())
    }

    /// Shrinks the non bias weights of every updatable layer by `(1 - rate)^samples`.
    ///
    /// # Arguments
    /// * `rate` - The per sample decay rate.
    /// * `samples` - The amount of samples seen since the last decay.
    pub fn weight_decay(&mut self, rate: f64, samples: usize) {
        let factor = (1. - rate).powf(samples as f64);

        for layer in self.layers.iter_mut().filter(|layer| layer.is_updatable()) {
            layer.decay(factor);
        }
    }

    /// Computes the outputs of the model for every row of `x`.
    ///
    /// # Arguments
    /// * `x` - A `samples x input_dim` matrix.
    /// * `batch_size` - How many rows are forwarded at once.
    ///
    /// # Returns
    /// A `samples x output_dim` matrix, rows in the same order as `x`.
    pub fn predict(&self, x: ArrayView2<f64>, batch_size: NonZeroUsize) -> Result<Array2<f64>> {
        LearnErr::check_dim("prediction features", x.ncols(), self.input_dim())?;

        let mut y = Array2::zeros((x.nrows(), self.output_dim()));
        let chunks = x
            .axis_chunks_iter(Axis(0), batch_size.get())
            .zip(y.axis_chunks_iter_mut(Axis(0), batch_size.get()));

        for (xb, mut yb) in chunks {
            yb.assign(&self.forward(xb)?.output());
        }

        Ok(y)
    }

    /// Computes the error signal at the output of every layer.
    fn deltas(&self, pass: &ForwardPass, delta: ArrayView2<f64>) -> Result<Vec<Array2<f64>>> {
        self.check_pass(pass)?;
        LearnErr::check_dim("output gradient rows", delta.nrows(), pass.batch_size())?;
        LearnErr::check_dim("output gradient columns", delta.ncols(), self.output_dim())?;

        let nlayers = self.layers.len();
        let a = &pass.activations;

        let mut d = self.layers[nlayers - 1].act_fn().derivative(a[nlayers].view()) * &delta;
        let mut deltas = Vec::with_capacity(nlayers);

        for i in (1..nlayers).rev() {
            let transport = self.feedback.transport(i, self.layers[i].weights())?;
            let df = self.layers[i - 1].act_fn().derivative(a[i].view());
            let below = df * d.dot(&transport);
            deltas.push(d);
            d = below;
        }

        deltas.push(d);
        deltas.reverse();
        Ok(deltas)
    }

    fn check_pass(&self, pass: &ForwardPass) -> Result<()> {
        let a = &pass.activations;
        LearnErr::check_dim("forward pass activations", a.len(), self.layers.len() + 1)?;
        LearnErr::check_dim("forward pass inputs", a[0].ncols(), self.input_dim())?;

        for (layer, a) in self.layers.iter().zip(&a[1..]) {
            LearnErr::check_dim("forward pass outputs", a.ncols(), layer.output_dim())?;
            LearnErr::check_dim("forward pass rows", a.nrows(), pass.batch_size())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::SeedableRng;

    use super::*;
    use crate::arch::activations::ActFn;

    fn model(feedback: Feedback) -> Model {
        let layers = vec![
            Dense::new(array![[1., 0., 0.], [0., 1., 0.]], ActFn::Identity, true).unwrap(),
            Dense::new(array![[1., 1., 0.]], ActFn::Identity, true).unwrap(),
        ];

        Model::new(layers, feedback, Loss::Mse, StdRng::seed_from_u64(0)).unwrap()
    }

    #[test]
    fn forward_caches_the_input_and_every_output() {
        let model = model(Feedback::Backprop);
        let pass = model.forward(array![[1., 2.]].view()).unwrap();

        assert_eq!(pass.activations().len(), 3);
        assert_eq!(pass.activations()[0], array![[1., 2.]]);
        assert_eq!(pass.output(), array![[3.]]);
    }

    #[test]
    fn forward_rejects_the_wrong_width() {
        let model = model(Feedback::Backprop);
        let err = model.forward(array![[1., 2., 3.]].view()).unwrap_err();
        assert_eq!(
            err,
            LearnErr::ShapeMismatch {
                what: "batch features",
                got: 3,
                expected: 2
            }
        );
    }

    #[test]
    fn backward_with_backprop_follows_the_gradient() {
        let mut model = model(Feedback::Backprop);
        let x = array![[1., 2.]];
        let pass = model.forward(x.view()).unwrap();

        model.backward(pass, array![[1.]].view(), 0.1, 0.).unwrap();

        let w = model.layers();
        assert_abs_diff_eq!(w[1].weights(), array![[0.9, 0.8, -0.1]], epsilon = 1e-12);
        assert_abs_diff_eq!(
            w[0].weights(),
            array![[0.9, -0.2, -0.1], [-0.1, 0.8, -0.1]],
            epsilon = 1e-12
        );
    }

    #[test]
    fn feedback_alignment_transports_through_the_feedback_matrix() {
        let b = vec![Array2::zeros((2, 2)), array![[2., 0.]]];
        let model = model(Feedback::new(LearningMode::Fa, b));
        let pass = model.forward(array![[1., 2.]].view()).unwrap();

        let grads = model.gradients(&pass, array![[1.]].view()).unwrap();

        assert_eq!(grads[1], array![[1., 2., 1.]]);
        assert_eq!(grads[0], array![[2., 4., 2.], [0., 0., 0.]]);
    }

    #[test]
    fn mismatched_feedback_matrices_are_rejected() {
        let layers = vec![Dense::new(Array2::ones((1, 3)), ActFn::Identity, true).unwrap()];
        let feedback = Feedback::new(LearningMode::Fa, vec![Array2::ones((1, 3))]);

        let err = Model::new(layers, feedback, Loss::Mse, StdRng::seed_from_u64(0)).unwrap_err();

        assert!(matches!(err, LearnErr::ShapeMismatch { .. }));
    }

    #[test]
    fn foreign_forward_passes_are_rejected() {
        let mut model = model(Feedback::Backprop);
        let pass = ForwardPass {
            activations: vec![array![[1., 2.]], array![[1.]]],
        };

        let err = model.backward(pass, array![[1.]].view(), 0.1, 0.).unwrap_err();

        assert!(matches!(err, LearnErr::ShapeMismatch { .. }));
    }

    #[test]
    fn predict_keeps_the_input_order() {
        let model = model(Feedback::Backprop);
        let x = array![[1., 0.], [0., 1.], [2., 2.]];

        let y = model.predict(x.view(), NonZeroUsize::new(2).unwrap()).unwrap();

        assert_eq!(y, array![[1.], [1.], [4.]]);
    }
}
