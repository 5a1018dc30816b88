use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Serenity error: {0}")]
    Serenity(Box<poise::serenity_prelude::Error>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model file {path} not found")]
    ModelMissing { path: String },

    #[error("Model serialization error: {0}")]
    ModelFormat(#[from] serde_json::Error),

    #[error("Model state is invalid: {0}")]
    ModelState(String),

    #[error("Model task failed: {0}")]
    ModelTask(#[from] tokio::task::JoinError),
}

impl From<poise::serenity_prelude::Error> for BotError {
    fn from(err: poise::serenity_prelude::Error) -> Self {
        BotError::Serenity(Box::new(err))
    }
}

impl BotError {
    /// Returns a user-friendly error message suitable for displaying in Discord
    pub fn user_message(&self) -> String {
        match self {
            BotError::Serenity(_) => {
                "Sorry, I'm having trouble communicating with Discord right now. Please try again later.".to_string()
            }
            BotError::Config(_) => {
                "Sorry, there's a configuration issue on my end. Please contact the bot administrator.".to_string()
            }
            BotError::Io(_) | BotError::ModelMissing { .. } => {
                "Sorry, I couldn't reach my saved brain. Please try again later.".to_string()
            }
            BotError::ModelFormat(_) | BotError::ModelState(_) => {
                "Sorry, my brain seems to be scrambled. Please contact the bot administrator.".to_string()
            }
            BotError::ModelTask(_) => {
                "Sorry, I lost my train of thought. Please try again.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
