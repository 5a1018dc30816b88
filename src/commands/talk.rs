//! `talk`: ask the model for a reply.

use async_trait::async_trait;
use log::info;

use crate::error::Result;
use crate::types::{IncomingMessage, Reply};

use super::router::{CommandContext, CommandHandler};

const NOTHING_TO_SAY: &str = "I don't know what to say to that yet. Teach me with !train";

pub struct TalkCommand;

/// Text the model should answer.
///
/// A leading command token or bot mention is dropped; a direct message with
/// neither is used whole.
pub fn talk_input(message: &IncomingMessage, prefix: char) -> &str {
    let content = message.content.trim();
    if content.starts_with(prefix) || message.mentions_bot {
        content
            .split_once(char::is_whitespace)
            .map_or(content, |(_, rest)| rest.trim())
    } else {
        content
    }
}

#[async_trait]
impl CommandHandler for TalkCommand {
    async fn handle(&self, ctx: &CommandContext<'_>) -> Result<Option<Reply>> {
        let input = talk_input(ctx.message, ctx.prefix);
        let response = ctx.model.infer(input).await?;
        info!("Talk | Input: '{input}' Response: '{response}'");

        let text = if response.trim().is_empty() {
            NOTHING_TO_SAY.to_string()
        } else {
            response
        };
        Ok(Some(Reply::Text(text)))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use poise::serenity_prelude::ChannelId;

    use super::*;

    fn message(content: &str, mentions_bot: bool) -> IncomingMessage {
        IncomingMessage {
            from_self: false,
            content: content.to_string(),
            channel_id: ChannelId::new(1),
            is_direct: !mentions_bot,
            mentions_bot,
            received_at: Instant::now(),
        }
    }

    #[test]
    fn strips_command_token() {
        assert_eq!(talk_input(&message("!talk  Hello there ", false), '!'), "Hello there");
    }

    #[test]
    fn strips_leading_mention() {
        assert_eq!(talk_input(&message("<@42> how are you", true), '!'), "how are you");
    }

    #[test]
    fn direct_message_is_used_whole() {
        assert_eq!(talk_input(&message(" how are you ", false), '!'), "how are you");
    }

    #[test]
    fn lone_token_is_kept() {
        assert_eq!(talk_input(&message("!talk", false), '!'), "!talk");
    }
}
