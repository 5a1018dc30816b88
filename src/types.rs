//! Common types used throughout the livbot bot.

use std::time::Instant;

use chrono::{DateTime, Utc};
use poise::serenity_prelude::ChannelId;
use serde::{Deserialize, Serialize};

/// Platform-neutral view of an incoming chat message.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// The bot itself wrote this message
    pub from_self: bool,
    pub content: String,
    pub channel_id: ChannelId,
    /// Sent in a direct-message channel
    pub is_direct: bool,
    /// The bot user is in the mention list
    pub mentions_bot: bool,
    pub received_at: Instant,
}

/// A passively observed message, kept for conversation pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub timestamp: Instant,
    pub content: String,
    pub channel_id: ChannelId,
}

impl From<&IncomingMessage> for MessageRecord {
    fn from(message: &IncomingMessage) -> Self {
        Self {
            timestamp: message.received_at,
            content: message.content.clone(),
            channel_id: message.channel_id,
        }
    }
}

/// One supervised `(input, output)` pair for the sequence model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub input: String,
    pub output: String,
}

impl TrainingExample {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

/// Something the bot wants to send back to the platform.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Reply to the triggering message with plain text
    Text(String),
    /// Send the usage card to the triggering channel
    Help(HelpCard),
}

/// Structured content for the help embed.
#[derive(Debug, Clone, PartialEq)]
pub struct HelpCard {
    pub color: u32,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub footer: String,
    pub timestamp: DateTime<Utc>,
}
