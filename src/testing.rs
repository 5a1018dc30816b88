//! Test doubles shared by the unit tests.

use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::model::SequenceModel;
use crate::types::TrainingExample;

#[derive(Default)]
struct Recorded {
    reply: String,
    inputs: Vec<String>,
    trained: Vec<TrainingExample>,
    iterations: Vec<usize>,
}

/// Sequence model that answers with a fixed reply and remembers every call.
///
/// Clones share the same recording, so a test can keep one clone and hand
/// the other to the code under test.
#[derive(Clone, Default)]
pub struct RecordingModel {
    state: Arc<Mutex<Recorded>>,
}

impl RecordingModel {
    pub fn with_reply(reply: &str) -> Self {
        let model = Self::default();
        model.lock().reply = reply.to_string();
        model
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.state.lock().expect("recording lock poisoned")
    }

    pub fn inputs(&self) -> Vec<String> {
        self.lock().inputs.clone()
    }

    pub fn trained(&self) -> Vec<TrainingExample> {
        self.lock().trained.clone()
    }

    pub fn iterations(&self) -> Vec<usize> {
        self.lock().iterations.clone()
    }
}

impl SequenceModel for RecordingModel {
    fn run(&self, input: &str) -> String {
        let mut state = self.lock();
        state.inputs.push(input.to_string());
        state.reply.clone()
    }

    fn train(&mut self, example: &TrainingExample, iterations: usize) -> f64 {
        let mut state = self.lock();
        state.trained.push(example.clone());
        state.iterations.push(iterations);
        0.0
    }

    fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.lock().trained)?)
    }

    fn load_json(&mut self, blob: &str) -> Result<()> {
        let trained: Vec<TrainingExample> = serde_json::from_str(blob)?;
        self.lock().trained = trained;
        Ok(())
    }
}
