use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use log::{debug, error, info};
use strum::{Display, EnumString};

use crate::error::{BotError, Result};

const DEFAULT_TOKEN_FILE: &str = "token";
const DEFAULT_MODEL_PATH: &str = "network.json";
const DEFAULT_SAVE_INTERVAL_SECS: u64 = 10 * 60;
const DEFAULT_CONVERSATION_TIMEOUT_SECS: u64 = 60;
const DEFAULT_TRAINING_ITERATIONS: usize = 1000;

/// What to do when the persisted model file does not exist at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum MissingModelPolicy {
    /// Refuse to start.
    #[default]
    Fail,
    /// Start from a freshly initialized model.
    Fresh,
}

/// What to do when a message invokes a command nobody registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum UnknownCommandPolicy {
    #[default]
    Ignore,
    Reply,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub model_path: PathBuf,
    pub missing_model: MissingModelPolicy,
    pub save_interval: Duration,
    pub conversation_timeout: Duration,
    pub training_iterations: usize,
    pub save_after_training: bool,
    pub unknown_command: UnknownCommandPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            missing_model: MissingModelPolicy::default(),
            save_interval: Duration::from_secs(DEFAULT_SAVE_INTERVAL_SECS),
            conversation_timeout: Duration::from_secs(DEFAULT_CONVERSATION_TIMEOUT_SECS),
            training_iterations: DEFAULT_TRAINING_ITERATIONS,
            save_after_training: false,
            unknown_command: UnknownCommandPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        debug!("Loading configuration from environment");
        dotenvy::dotenv().ok();

        let discord_token = load_discord_token()?;
        let defaults = Self::default();

        let model_path = env::var("MODEL_PATH").map_or(defaults.model_path, PathBuf::from);
        let missing_model = optional_var("MODEL_MISSING")?.unwrap_or(defaults.missing_model);
        let save_interval = optional_var("SAVE_INTERVAL_SECS")?
            .map_or(defaults.save_interval, Duration::from_secs);
        let conversation_timeout = optional_var("CONVERSATION_TIMEOUT_SECS")?
            .map_or(defaults.conversation_timeout, Duration::from_secs);
        let training_iterations =
            optional_var("TRAINING_ITERATIONS")?.unwrap_or(defaults.training_iterations);
        let save_after_training =
            optional_var("SAVE_AFTER_TRAINING")?.unwrap_or(defaults.save_after_training);
        let unknown_command =
            optional_var("UNKNOWN_COMMAND")?.unwrap_or(defaults.unknown_command);

        if save_interval.is_zero() {
            return Err(BotError::Config(
                "SAVE_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        info!("Configuration loaded successfully");
        debug!("Discord token length: {} characters", discord_token.len());
        debug!("Model path: {}", model_path.display());
        debug!("Missing model policy: {missing_model}");
        debug!("Save interval: {}s", save_interval.as_secs());
        debug!(
            "Conversation timeout: {}s",
            conversation_timeout.as_secs()
        );
        debug!("Training iterations: {training_iterations}");
        debug!("Save after training: {save_after_training}");
        debug!("Unknown command policy: {unknown_command}");

        Ok(Self {
            discord_token,
            model_path,
            missing_model,
            save_interval,
            conversation_timeout,
            training_iterations,
            save_after_training,
            unknown_command,
        })
    }
}

/// Reads the bot token from `DISCORD_TOKEN`, falling back to the bare-secret
/// file named by `DISCORD_TOKEN_FILE`.
fn load_discord_token() -> Result<String> {
    if let Ok(token) = env::var("DISCORD_TOKEN") {
        return non_empty_token(&token, "DISCORD_TOKEN");
    }

    let path = env::var("DISCORD_TOKEN_FILE")
        .map_or_else(|_| PathBuf::from(DEFAULT_TOKEN_FILE), PathBuf::from);
    read_token_file(&path)
}

fn read_token_file(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path).map_err(|e| {
        error!(
            "Failed to load DISCORD_TOKEN from environment or token file {}: {e}",
            path.display()
        );
        e
    })?;
    non_empty_token(&raw, &format!("Token file {}", path.display()))
}

fn non_empty_token(raw: &str, source: &str) -> Result<String> {
    let token = raw.trim();
    if token.is_empty() {
        return Err(BotError::Config(format!("{source} is empty")));
    }
    Ok(token.to_string())
}

fn optional_var<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Ok(raw) = env::var(key) else {
        return Ok(None);
    };
    parse_value(key, &raw).map(Some)
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| {
        error!("Failed to parse {key}={raw}: {e}");
        BotError::Config(format!("{key}: {e}"))
    })
}
