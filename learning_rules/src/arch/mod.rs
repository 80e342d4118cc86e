pub mod activations;
mod builder;
mod feedback;
pub mod layers;
pub mod loss;
mod model;
mod spec;

pub use builder::ModelBuilder;
pub use feedback::{Feedback, LearningMode};
pub use model::{ForwardPass, Model};
pub use spec::{LayerSpec, ModelSpec};
