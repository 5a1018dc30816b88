//! `save`: write the model to disk now.

use async_trait::async_trait;
use log::error;

use crate::error::Result;
use crate::types::Reply;

use super::router::{CommandContext, CommandHandler};

pub struct SaveCommand;

#[async_trait]
impl CommandHandler for SaveCommand {
    async fn handle(&self, ctx: &CommandContext<'_>) -> Result<Option<Reply>> {
        let text = match ctx.store.save(ctx.model).await {
            Ok(()) => "Saved net!".to_string(),
            Err(e) => {
                error!("Save requested by command failed: {e}");
                e.user_message()
            }
        };
        Ok(Some(Reply::Text(text)))
    }
}
