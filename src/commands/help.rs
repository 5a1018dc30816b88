//! `help`: usage card.

use async_trait::async_trait;
use chrono::Utc;

use crate::error::Result;
use crate::types::{HelpCard, Reply};

use super::router::{CommandContext, CommandHandler};

pub const HELP_COLOR: u32 = 9_999_999;

const DESCRIPTION: &str = "Hello! I'm a bot based on Machine Learning. You can teach me how to act! \
    I listen to conversations in this channel and learn...";
const FOOTER: &str = "© livbot";
const REPOSITORY: &str = env!("CARGO_PKG_REPOSITORY");

pub struct HelpCommand;

pub fn help_card(prefix: char, bot_tag: &str) -> HelpCard {
    HelpCard {
        color: HELP_COLOR,
        description: description(REPOSITORY),
        fields: vec![
            (
                "To talk with me:".to_string(),
                format!(
                    "Just @ me with your message or use {prefix}talk, Ex. ```@{bot_tag} Hello!``` \
                     or you can chat with me in private (you can also teach me in private...)"
                ),
            ),
            (
                "To teach me:".to_string(),
                format!(
                    "Use **{prefix}train** to train me. First write the input, then the desired \
                     output after a colon - like this: ```{prefix}train Hello! : Hi!```"
                ),
            ),
            (
                "NOTE:".to_string(),
                "It takes me a short while to comprehend things when I'm taught, \
                 so I might disappear some times."
                    .to_string(),
            ),
        ],
        footer: FOOTER.to_string(),
        timestamp: Utc::now(),
    }
}

/// The intro text, linking to the source when the package names a repository.
fn description(repository: &str) -> String {
    if repository.is_empty() {
        DESCRIPTION.to_string()
    } else {
        format!("{DESCRIPTION} [Check out my code]({repository})")
    }
}

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn handle(&self, ctx: &CommandContext<'_>) -> Result<Option<Reply>> {
        Ok(Some(Reply::Help(help_card(ctx.prefix, ctx.bot_tag))))
    }
}
