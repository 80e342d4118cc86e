use log::debug;
use ndarray::{Array2, s};
use ndarray_rand::RandomExt;
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::StandardNormal;

use super::{
    Feedback, LayerSpec, LearningMode, Model, ModelSpec, activations::ActFn, layers::Dense,
    loss::Loss,
};
use crate::{
    LearnErr, Result,
    linalg::{add_bias, normalize_xavier, pseudo_inverse, without_bias},
};

/// Builds `Model`s given a specification.
///
/// The initial weights of every layer, and the feedback matrices of the alignment modes, are
/// drawn in layer order from a single generator which is then handed to the model for its
/// gradient noise. Two builders created with the same seed build identical models.
pub struct ModelBuilder {
    rng: StdRng,
}

impl ModelBuilder {
    /// Creates a new `ModelBuilder`.
    ///
    /// # Arguments
    /// * `seed` - The seed of the generator, `None` seeds it from the OS.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self { rng }
    }

    /// Builds a new `Model` following a spec.
    ///
    /// # Arguments
    /// * `spec` - The specification for the model.
    ///
    /// # Returns
    /// The model or `InvalidConfiguration` if a name is unknown or a dimension is zero.
    pub fn build(mut self, spec: &ModelSpec) -> Result<Model> {
        let mode: LearningMode = spec.learning.parse()?;
        let loss: Loss = spec.loss.parse()?;
        self.check_topology(spec)?;

        let mut layers = Vec::with_capacity(spec.layers.len());
        let mut matrices = Vec::new();
        let mut ch_in = spec.input_dim;

        for layer_spec in &spec.layers {
            let (layer, b) = self.resolve_layer(mode, ch_in, layer_spec)?;
            layers.push(layer);
            matrices.extend(b);
            ch_in = layer_spec.output_dim;
        }

        debug!(
            mode = mode.name(), layers = layers.len(), loss = loss.name();
            "built model"
        );

        Model::new(layers, Feedback::new(mode, matrices), loss, self.rng)
    }

    fn check_topology(&self, spec: &ModelSpec) -> Result<()> {
        if spec.layers.is_empty() {
            return Err(LearnErr::invalid_config("a model needs at least one layer"));
        }

        if spec.input_dim == 0 {
            return Err(LearnErr::invalid_config("the input dimension must be positive"));
        }

        if let Some(i) = spec.layers.iter().position(|l| l.output_dim == 0) {
            return Err(LearnErr::invalid_config(format!(
                "layer {i} has no output units"
            )));
        }

        Ok(())
    }

    fn resolve_layer(
        &mut self,
        mode: LearningMode,
        ch_in: usize,
        spec: &LayerSpec,
    ) -> Result<(Dense, Option<Array2<f64>>)> {
        let act_fn: ActFn = spec.activation.parse()?;
        let (weights, b) = self.resolve_weights(mode, ch_in, spec.output_dim)?;
        let layer = Dense::new(weights, act_fn, spec.updatable)?;
        Ok((layer, b))
    }

    /// Draws the initial weights of a `ch_in -> ch_out` layer and, for the alignment modes,
    /// its feedback matrix.
    fn resolve_weights(
        &mut self,
        mode: LearningMode,
        ch_in: usize,
        ch_out: usize,
    ) -> Result<(Array2<f64>, Option<Array2<f64>>)> {
        let fan = ((ch_out + ch_in) as f64).sqrt();
        let mut w = normalize_xavier(self.standard_normal((ch_out, ch_in + 1)), fan)?;

        match mode {
            LearningMode::Bp | LearningMode::Pi => Ok((w, None)),
            LearningMode::Fa => {
                w.slice_mut(s![.., ..ch_in]).fill(0.);
                let b = normalize_xavier(self.standard_normal((ch_out, ch_in)), ch_out as f64)?;
                Ok((w, Some(b)))
            }
            LearningMode::FaPiW => {
                let pinv = pseudo_inverse(without_bias(w.view()))?;
                let b = normalize_xavier(pinv.reversed_axes(), ch_out as f64)?;
                Ok((w, Some(b)))
            }
            LearningMode::FaPiB => {
                let b = normalize_xavier(self.standard_normal((ch_out, ch_in)), ch_out as f64)?;
                let pinv = pseudo_inverse(b.view())?;
                let w = add_bias(normalize_xavier(pinv.reversed_axes(), ch_in as f64)?.view());
                Ok((w, Some(b)))
            }
        }
    }

    fn standard_normal(&mut self, shape: (usize, usize)) -> Array2<f64> {
        Array2::random_using(shape, StandardNormal, &mut self.rng)
    }
}
