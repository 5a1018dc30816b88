//! Loading and saving the model's serialized state.

use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use log::{debug, error, info, warn};
use tokio::{
    fs,
    sync::Mutex,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{
    config::MissingModelPolicy,
    error::{BotError, Result},
    model::ModelHandle,
};

/// How the model came to be in memory at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Restored,
    Fresh,
}

/// File-backed store for the model state.
///
/// Clones share one write lock, so saves from the autosave task and from
/// commands never interleave on the temporary file.
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Read the persisted state into `model`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or does not parse, or if it
    /// is missing and `policy` is [`MissingModelPolicy::Fail`].
    pub async fn load_into(
        &self,
        model: &ModelHandle,
        policy: MissingModelPolicy,
    ) -> Result<LoadOutcome> {
        debug!("Loading model from {}", self.path.display());

        let blob = match fs::read_to_string(&self.path).await {
            Ok(blob) => blob,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return match policy {
                    MissingModelPolicy::Fail => Err(BotError::ModelMissing {
                        path: self.path.display().to_string(),
                    }),
                    MissingModelPolicy::Fresh => {
                        warn!(
                            "No model at {}, starting from a fresh one",
                            self.path.display()
                        );
                        Ok(LoadOutcome::Fresh)
                    }
                };
            }
            Err(e) => return Err(e.into()),
        };

        let size = blob.len();
        model.deserialize(blob).await?;
        info!("Loaded model from {} ({size} bytes)", self.path.display());
        Ok(LoadOutcome::Restored)
    }

    /// Serialize `model` and replace the file with it.
    ///
    /// The state is written to a sibling `.tmp` file first and then renamed over
    /// the target, so a crash mid-write leaves the previous save intact.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any filesystem step fails.
    pub async fn save(&self, model: &ModelHandle) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let blob = model.serialize().await?;
        let temp = self.temp_path();

        fs::write(&temp, blob.as_bytes()).await?;
        fs::rename(&temp, &self.path).await?;

        info!(
            "Saved model to {} ({} bytes)",
            self.path.display(),
            blob.len()
        );
        Ok(())
    }
}

/// Save the model every `every`, starting one period from now.
///
/// Failures are logged and the next tick tries again.
pub fn spawn_autosave(store: ModelStore, model: ModelHandle, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            debug!("Autosave tick");
            if let Err(e) = store.save(&model).await {
                error!("Autosave to {} failed: {e}", store.path().display());
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelAdapter;
    use crate::testing::RecordingModel;
    use crate::types::TrainingExample;

    fn handle_with(model: &RecordingModel) -> ModelHandle {
        ModelHandle::new(ModelAdapter::new(Box::new(model.clone()), 1))
    }

    #[tokio::test]
    async fn save_then_load_restores_state() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ModelStore::new(dir.path().join("network.json"));

        let source = RecordingModel::default();
        let handle = handle_with(&source);
        handle.train(TrainingExample::new("Hello", "Hi")).await?;
        store.save(&handle).await?;
        assert!(!store.temp_path().exists());

        let target = RecordingModel::default();
        let outcome = store
            .load_into(&handle_with(&target), MissingModelPolicy::Fail)
            .await?;
        assert_eq!(outcome, LoadOutcome::Restored);
        assert_eq!(target.trained(), source.trained());
        Ok(())
    }

    #[tokio::test]
    async fn save_replaces_the_whole_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("network.json");
        std::fs::write(&path, "x".repeat(4096))?;

        let store = ModelStore::new(&path);
        store.save(&handle_with(&RecordingModel::default())).await?;
        assert_eq!(std::fs::read_to_string(&path)?, "[]");
        Ok(())
    }

    #[tokio::test]
    async fn missing_file_follows_policy() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ModelStore::new(dir.path().join("absent.json"));
        let handle = handle_with(&RecordingModel::default());

        let err = store.load_into(&handle, MissingModelPolicy::Fail).await;
        assert!(matches!(err, Err(BotError::ModelMissing { .. })));

        let outcome = store.load_into(&handle, MissingModelPolicy::Fresh).await?;
        assert_eq!(outcome, LoadOutcome::Fresh);
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_file_is_fatal_under_any_policy() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("network.json");
        std::fs::write(&path, "{ half a json")?;
        let store = ModelStore::new(&path);
        let handle = handle_with(&RecordingModel::default());

        for policy in [MissingModelPolicy::Fail, MissingModelPolicy::Fresh] {
            let err = store.load_into(&handle, policy).await;
            assert!(matches!(err, Err(BotError::ModelFormat(_))));
        }
        Ok(())
    }

    #[tokio::test]
    async fn failed_save_keeps_the_model_in_memory() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ModelStore::new(dir.path().join("no-such-dir").join("network.json"));
        let model = RecordingModel::default();
        let handle = handle_with(&model);
        handle.train(TrainingExample::new("Hello", "Hi")).await?;

        assert!(matches!(store.save(&handle).await, Err(BotError::Io(_))));
        assert_eq!(model.trained().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn autosave_skips_the_immediate_tick_then_writes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("network.json");
        let store = ModelStore::new(&path);
        let handle = handle_with(&RecordingModel::default());

        let task = spawn_autosave(store, handle, Duration::from_millis(200));
        time::sleep(Duration::from_millis(50)).await;
        assert!(!path.exists());

        for _ in 0..40 {
            if path.exists() {
                break;
            }
            time::sleep(Duration::from_millis(50)).await;
        }
        task.abort();
        assert!(path.exists());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_saves_all_succeed() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("network.json");
        let store = ModelStore::new(&path);

        let model = RecordingModel::default();
        let handle = handle_with(&model);
        for i in 0..200 {
            handle
                .train(TrainingExample::new(format!("line {i}"), "x".repeat(200)))
                .await?;
        }

        for _ in 0..10 {
            let (a, b, c) = tokio::join!(
                tokio::spawn({
                    let (store, handle) = (store.clone(), handle.clone());
                    async move { store.save(&handle).await }
                }),
                tokio::spawn({
                    let (store, handle) = (store.clone(), handle.clone());
                    async move { store.save(&handle).await }
                }),
                store.save(&handle),
            );
            a??;
            b??;
            c?;
        }

        assert!(!store.temp_path().exists());
        let saved: Vec<TrainingExample> = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(saved, model.trained());
        Ok(())
    }
}
