//! Shared, lock-guarded access to the model adapter.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task;

use crate::error::Result;
use crate::types::TrainingExample;

use super::adapter::{ModelAdapter, TrainOutcome};

/// Cloneable handle to the single model instance.
///
/// Every operation holds one coarse lock for its whole duration, so training
/// and serialization never interleave. Work runs on the blocking pool because a
/// training call can take seconds.
#[derive(Clone)]
pub struct ModelHandle {
    inner: Arc<Mutex<ModelAdapter>>,
}

impl ModelHandle {
    pub fn new(adapter: ModelAdapter) -> Self {
        Self {
            inner: Arc::new(Mutex::new(adapter)),
        }
    }

    async fn with_adapter<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ModelAdapter) -> T + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let value = task::spawn_blocking(move || {
            // Training swaps in new weights only once it finishes, so a
            // poisoned lock still guards a consistent model.
            let mut adapter = inner.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut adapter)
        })
        .await?;
        Ok(value)
    }

    pub async fn infer(&self, input: impl Into<String>) -> Result<String> {
        let input = input.into();
        self.with_adapter(move |adapter| adapter.infer(&input))
            .await
    }

    pub async fn train(&self, example: TrainingExample) -> Result<TrainOutcome> {
        self.with_adapter(move |adapter| adapter.train(&example))
            .await
    }

    pub async fn serialize(&self) -> Result<String> {
        self.with_adapter(|adapter| adapter.serialize()).await?
    }

    pub async fn deserialize(&self, blob: String) -> Result<()> {
        self.with_adapter(move |adapter| adapter.deserialize(&blob))
            .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CharLstm;
    use crate::testing::RecordingModel;

    #[tokio::test]
    async fn clones_share_one_model() -> Result<()> {
        let model = RecordingModel::with_reply("pong");
        let handle = ModelHandle::new(ModelAdapter::new(Box::new(model.clone()), 3));
        let other = handle.clone();

        other.train(TrainingExample::new("ping", "pong")).await?;
        assert_eq!(handle.infer("ping").await?, "pong");
        assert_eq!(model.trained().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn serialized_state_restores_identical_replies() -> Result<()> {
        let source = ModelHandle::new(ModelAdapter::new(Box::new(CharLstm::new(10, 5)), 40));
        source.train(TrainingExample::new("Hello", "Hi")).await?;
        let blob = source.serialize().await?;

        let restored = ModelHandle::new(ModelAdapter::new(Box::new(CharLstm::default()), 40));
        restored.deserialize(blob).await?;

        assert_eq!(
            restored.infer("Hello").await?,
            source.infer("Hello").await?
        );
        Ok(())
    }
}
