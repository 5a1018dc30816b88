//! The shared sequence model and the adapter the rest of the bot talks to.

mod adapter;
mod char_lstm;
mod handle;

pub use adapter::{MAX_EXAMPLE_CHARS, ModelAdapter, TrainOutcome, normalize_example};
pub use char_lstm::CharLstm;
pub use handle::ModelHandle;

use crate::error::Result;
use crate::types::TrainingExample;

/// A trainable text-to-text model.
///
/// Implementations own their parameters and a JSON representation of them.
/// `load_json` must leave the model untouched when it returns an error.
pub trait SequenceModel: Send {
    /// Produce a reply for `input`. May be empty when the model knows nothing yet.
    fn run(&self, input: &str) -> String;

    /// Fit one example for `iterations` passes and return the final loss.
    fn train(&mut self, example: &TrainingExample, iterations: usize) -> f64;

    fn to_json(&self) -> Result<String>;

    fn load_json(&mut self, blob: &str) -> Result<()>;
}
