//! Name-to-handler table for prefix commands.

use std::collections::HashMap;

use async_trait::async_trait;
use log::debug;

use crate::error::Result;
use crate::model::ModelHandle;
use crate::persistence::ModelStore;
use crate::types::{IncomingMessage, Reply};

/// Everything a command handler may touch while it runs.
pub struct CommandContext<'a> {
    pub message: &'a IncomingMessage,
    /// Raw text after the command token
    pub args: &'a str,
    pub prefix: char,
    pub bot_tag: &'a str,
    pub model: &'a ModelHandle,
    pub store: &'a ModelStore,
    pub save_after_training: bool,
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: &CommandContext<'_>) -> Result<Option<Reply>>;
}

/// Result of looking a command up and running it.
#[derive(Debug, PartialEq)]
pub enum Dispatch {
    NotFound,
    Handled(Option<Reply>),
}

#[derive(Default)]
pub struct CommandRouter {
    handlers: HashMap<String, Box<dyn CommandHandler>>,
}

impl CommandRouter {
    /// Store `handler` under `name`, replacing any earlier registration.
    pub fn register(&mut self, name: impl Into<String>, handler: impl CommandHandler + 'static) {
        let name = name.into();
        if self.handlers.insert(name.clone(), Box::new(handler)).is_some() {
            debug!("Replaced handler for command '{name}'");
        }
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Run the handler registered for `name`, if there is one.
    ///
    /// # Errors
    ///
    /// Propagates the handler's error.
    pub async fn dispatch(&self, name: &str, ctx: &CommandContext<'_>) -> Result<Dispatch> {
        let Some(handler) = self.handlers.get(name) else {
            debug!("No handler for command '{name}'");
            return Ok(Dispatch::NotFound);
        };
        handler.handle(ctx).await.map(Dispatch::Handled)
    }
}
