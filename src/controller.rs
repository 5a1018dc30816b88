//! Message classification and the per-message state machine.

use log::{debug, error, info};

use crate::commands::{CommandContext, CommandRouter, Dispatch, builtin_commands, submit_example};
use crate::config::{Config, UnknownCommandPolicy};
use crate::conversation::ConversationTracker;
use crate::model::ModelHandle;
use crate::persistence::ModelStore;
use crate::types::{IncomingMessage, MessageRecord, Reply};

pub const COMMAND_PREFIX: char = '!';

/// Passive replies must be longer than this, in characters.
pub const MIN_PASSIVE_REPLY_CHARS: usize = 10;

/// How a message is handled, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind<'a> {
    OwnMessage,
    Command { name: &'a str, args: &'a str },
    Addressed,
    Passive,
}

#[must_use]
pub fn classify(message: &IncomingMessage, prefix: char) -> MessageKind<'_> {
    if message.from_self {
        return MessageKind::OwnMessage;
    }

    if let Some(rest) = message.content.strip_prefix(prefix) {
        let (name, args) = rest
            .split_once(' ')
            .map_or((rest, ""), |(name, args)| (name, args.trim_start()));
        return MessageKind::Command { name, args };
    }

    if message.mentions_bot || message.is_direct {
        MessageKind::Addressed
    } else {
        MessageKind::Passive
    }
}

pub struct BotController {
    router: CommandRouter,
    tracker: ConversationTracker,
    model: ModelHandle,
    store: ModelStore,
    bot_tag: String,
    save_after_training: bool,
    unknown_command: UnknownCommandPolicy,
}

impl BotController {
    /// Controller with the built-in commands registered.
    pub fn new(config: &Config, model: ModelHandle, store: ModelStore, bot_tag: String) -> Self {
        Self {
            router: builtin_commands(),
            tracker: ConversationTracker::new(config.conversation_timeout),
            model,
            store,
            bot_tag,
            save_after_training: config.save_after_training,
            unknown_command: config.unknown_command,
        }
    }

    #[cfg(test)]
    pub(crate) fn router_mut(&mut self) -> &mut CommandRouter {
        &mut self.router
    }

    #[cfg(test)]
    pub(crate) fn tracker(&self) -> &ConversationTracker {
        &self.tracker
    }

    /// Handle one message and return what to send back, if anything.
    ///
    /// Never fails: errors from handlers or the model are logged and dropped.
    pub async fn handle(&mut self, message: &IncomingMessage) -> Option<Reply> {
        match classify(message, COMMAND_PREFIX) {
            MessageKind::OwnMessage => None,
            MessageKind::Command { name, args } => self.run_command(message, name, args).await,
            MessageKind::Addressed => self.run_command(message, "talk", "").await,
            MessageKind::Passive => self.observe_passive(message).await,
        }
    }

    async fn run_command(
        &self,
        message: &IncomingMessage,
        name: &str,
        args: &str,
    ) -> Option<Reply> {
        let ctx = CommandContext {
            message,
            args,
            prefix: COMMAND_PREFIX,
            bot_tag: &self.bot_tag,
            model: &self.model,
            store: &self.store,
            save_after_training: self.save_after_training,
        };

        match self.router.dispatch(name, &ctx).await {
            Ok(Dispatch::Handled(reply)) => reply,
            Ok(Dispatch::NotFound) => match self.unknown_command {
                UnknownCommandPolicy::Ignore => None,
                UnknownCommandPolicy::Reply => Some(Reply::Text(format!(
                    "I don't know the command `{COMMAND_PREFIX}{name}`, see {COMMAND_PREFIX}help"
                ))),
            },
            Err(e) => {
                error!("Command '{name}' failed: {e}");
                None
            }
        }
    }

    async fn observe_passive(&mut self, message: &IncomingMessage) -> Option<Reply> {
        let reply = match self.model.infer(message.content.as_str()).await {
            Ok(response) if response.chars().count() > MIN_PASSIVE_REPLY_CHARS => {
                debug!("Passive reply: '{response}'");
                Some(Reply::Text(response))
            }
            Ok(_) => None,
            Err(e) => {
                error!("Passive inference failed: {e}");
                None
            }
        };

        if let Some(example) = self.tracker.observe(MessageRecord::from(message)) {
            info!(
                "Passive learning | Input: '{}' output: '{}'",
                example.input, example.output
            );
            if let Err(e) = submit_example(
                &self.model,
                &self.store,
                example,
                self.save_after_training,
            )
            .await
            {
                error!("Passive learning failed: {e}");
            }
        }

        reply
    }
}
