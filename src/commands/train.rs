//! `train <input> : <output>`: teach the model one exchange.

use async_trait::async_trait;
use log::{error, info};
use thiserror::Error;

use crate::error::Result;
use crate::model::{MAX_EXAMPLE_CHARS, ModelHandle, TrainOutcome};
use crate::persistence::ModelStore;
use crate::types::{Reply, TrainingExample};

use super::router::{CommandContext, CommandHandler};

/// Why a `train` command was refused. The message is sent back as the reply.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainInputError {
    #[error("This data is too long to train on, please keep it under 300 characters total.")]
    TooLong,
    #[error("This data is not formatted correctly, please see !help")]
    MissingDelimiter,
    #[error("Input data is too short.")]
    EmptyInput,
    #[error("Train output is too short.")]
    EmptyOutput,
}

/// Split `input : output`, both halves trimmed and non-empty.
///
/// The limit applies to the raw argument text as a whole.
pub fn parse_training_pair(args: &str) -> std::result::Result<TrainingExample, TrainInputError> {
    if args.chars().count() > MAX_EXAMPLE_CHARS {
        return Err(TrainInputError::TooLong);
    }

    let (input, output) = args
        .split_once(':')
        .ok_or(TrainInputError::MissingDelimiter)?;
    let (input, output) = (input.trim(), output.trim());

    if input.is_empty() {
        return Err(TrainInputError::EmptyInput);
    }
    if output.is_empty() {
        return Err(TrainInputError::EmptyOutput);
    }
    Ok(TrainingExample::new(input, output))
}

/// Train on `example` and, when asked to, persist the result straight away.
///
/// A failed save is logged; the trained model stays in memory either way.
///
/// # Errors
///
/// Returns an error if the training task itself fails.
pub async fn submit_example(
    model: &ModelHandle,
    store: &ModelStore,
    example: TrainingExample,
    save_after: bool,
) -> Result<TrainOutcome> {
    let outcome = model.train(example).await?;
    if outcome == TrainOutcome::Trained
        && save_after
        && let Err(e) = store.save(model).await
    {
        error!("Saving after training failed: {e}");
    }
    Ok(outcome)
}

pub struct TrainCommand;

#[async_trait]
impl CommandHandler for TrainCommand {
    async fn handle(&self, ctx: &CommandContext<'_>) -> Result<Option<Reply>> {
        let example = match parse_training_pair(ctx.args) {
            Ok(example) => example,
            Err(e) => {
                info!("Refused training data {:?}: {e}", ctx.args);
                return Ok(Some(Reply::Text(e.to_string())));
            }
        };

        info!(
            "Training data: input '{}' output '{}'",
            example.input, example.output
        );
        let outcome = submit_example(ctx.model, ctx.store, example, ctx.save_after_training).await?;
        info!("Done training ({outcome:?})");
        Ok(None)
    }
}
