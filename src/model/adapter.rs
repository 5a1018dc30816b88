//! Validation and bookkeeping around a [`SequenceModel`].

use log::debug;

use crate::error::Result;
use crate::types::TrainingExample;

use super::SequenceModel;

/// Upper bound on each half of a training example, in characters.
pub const MAX_EXAMPLE_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainOutcome {
    Trained,
    /// The example was empty or too long; the model was not touched
    Rejected,
}

/// Trims both halves and checks their lengths.
///
/// Returns `None` unless each half holds between 1 and [`MAX_EXAMPLE_CHARS`]
/// characters after trimming.
#[must_use]
pub fn normalize_example(example: &TrainingExample) -> Option<TrainingExample> {
    let input = example.input.trim();
    let output = example.output.trim();
    let fits = |s: &str| (1..=MAX_EXAMPLE_CHARS).contains(&s.chars().count());

    (fits(input) && fits(output)).then(|| TrainingExample::new(input, output))
}

pub struct ModelAdapter {
    model: Box<dyn SequenceModel>,
    iterations: usize,
}

impl ModelAdapter {
    pub fn new(model: Box<dyn SequenceModel>, iterations: usize) -> Self {
        Self { model, iterations }
    }

    pub fn infer(&self, input: &str) -> String {
        self.model.run(input)
    }

    /// Train on one example, blocking for the full iteration count.
    pub fn train(&mut self, example: &TrainingExample) -> TrainOutcome {
        let Some(example) = normalize_example(example) else {
            debug!("Rejected training example: {example:?}");
            return TrainOutcome::Rejected;
        };

        let loss = self.model.train(&example, self.iterations);
        debug!(
            "Trained {} iterations on {:?} -> {:?}, loss {loss:.4}",
            self.iterations, example.input, example.output
        );
        TrainOutcome::Trained
    }

    pub fn serialize(&self) -> Result<String> {
        self.model.to_json()
    }

    pub fn deserialize(&mut self, blob: &str) -> Result<()> {
        self.model.load_json(blob)
    }
}
