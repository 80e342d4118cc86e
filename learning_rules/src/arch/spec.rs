use serde::{Deserialize, Serialize};

/// The description of a layer of a [`ModelSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub output_dim: usize,
    pub activation: String,
    #[serde(default = "default_updatable")]
    pub updatable: bool,
}

fn default_updatable() -> bool {
    true
}

impl LayerSpec {
    /// Creates a new `LayerSpec`.
    ///
    /// # Arguments
    /// * `output_dim` - The amount of units of the layer.
    /// * `activation` - The registered name of its activation function.
    /// * `updatable` - Whether the layer receives gradient updates.
    pub fn new(output_dim: usize, activation: &str, updatable: bool) -> Self {
        Self {
            output_dim,
            activation: activation.to_string(),
            updatable,
        }
    }
}

/// The description of a model, every name is resolved by the `ModelBuilder`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub input_dim: usize,
    pub layers: Vec<LayerSpec>,
    pub loss: String,
    pub learning: String,
}
