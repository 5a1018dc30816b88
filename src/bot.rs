//! Discord front end: framework setup, event routing and reply delivery.

use std::error::Error as StdError;
use std::time::Instant;

use log::{debug, error, info};
use poise::{
    Framework, FrameworkOptions,
    serenity_prelude::{
        ActivityData, ClientBuilder, Context, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter,
        CreateMessage, FullEvent, GatewayIntents, Message as SerenityMessage, Timestamp,
    },
};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::controller::{BotController, COMMAND_PREFIX};
use crate::error::Result;
use crate::model::{CharLstm, ModelAdapter, ModelHandle};
use crate::persistence::{ModelStore, spawn_autosave};
use crate::types::{HelpCard, IncomingMessage, Reply};

type EventResult = std::result::Result<(), Box<dyn StdError + Send + Sync>>;

pub struct Data {
    controller: Mutex<BotController>,
}

/// Run the Discord bot.
pub async fn run() -> Result<()> {
    info!("Initializing bot");
    let config = Config::from_env()?;

    debug!("Loading model");
    let model = ModelHandle::new(ModelAdapter::new(
        Box::new(CharLstm::default()),
        config.training_iterations,
    ));
    let store = ModelStore::new(config.model_path.clone());
    store.load_into(&model, config.missing_model).await?;

    let autosave = spawn_autosave(store.clone(), model.clone(), config.save_interval);
    info!(
        "Autosaving to {} every {}s",
        store.path().display(),
        config.save_interval.as_secs()
    );

    debug!("Setting up gateway intents");
    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;

    // Extract values before moving config into closure
    let discord_token = config.discord_token.clone();
    let controller_model = model.clone();
    let controller_store = store.clone();

    debug!("Building framework");
    let framework = Framework::builder()
        .options(FrameworkOptions {
            event_handler: |ctx, event, _framework, data| Box::pin(event_handler(ctx, event, data)),
            ..Default::default()
        })
        .setup(move |ctx, ready, _framework| {
            Box::pin(async move {
                let tag = ready.user.tag();
                info!("{tag} is ready to roll!");
                ctx.set_activity(Some(ActivityData::playing(format!(
                    "Machine Learning Bot | {COMMAND_PREFIX}help"
                ))));
                Ok(Data {
                    controller: Mutex::new(BotController::new(
                        &config,
                        controller_model,
                        controller_store,
                        tag,
                    )),
                })
            })
        })
        .build();

    debug!("Creating Discord client");
    let mut client = ClientBuilder::new(discord_token, intents)
        .framework(framework)
        .await?;

    info!("Starting Discord client");

    tokio::select! {
        result = client.start() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down...");
        }
    }

    autosave.abort();
    if let Err(e) = store.save(&model).await {
        error!("Final save failed: {e}");
    }

    Ok(())
}

/// Platform-neutral view of a Discord message.
fn to_incoming(ctx: &Context, message: &SerenityMessage) -> IncomingMessage {
    let bot_id = ctx.cache.current_user().id;
    IncomingMessage {
        from_self: message.author.id == bot_id,
        content: message.content.clone(),
        channel_id: message.channel_id,
        is_direct: message.guild_id.is_none(),
        mentions_bot: message.mentions_user_id(bot_id),
        received_at: Instant::now(),
    }
}

fn help_embed(ctx: &Context, card: HelpCard) -> CreateEmbed {
    // Copy what we need out of the cache guard before building anything
    let (name, avatar) = {
        let me = ctx.cache.current_user();
        (me.name.clone(), me.avatar_url())
    };

    let mut author = CreateEmbedAuthor::new(name);
    let mut footer = CreateEmbedFooter::new(card.footer);
    if let Some(url) = avatar {
        author = author.icon_url(url.clone());
        footer = footer.icon_url(url);
    }

    let mut embed = CreateEmbed::new()
        .color(card.color)
        .author(author)
        .description(card.description)
        .footer(footer);
    for (name, value) in card.fields {
        embed = embed.field(name, value, false);
    }
    if let Ok(timestamp) = Timestamp::from_unix_timestamp(card.timestamp.timestamp()) {
        embed = embed.timestamp(timestamp);
    }
    embed
}

async fn send_reply(ctx: &Context, message: &SerenityMessage, reply: Reply) -> Result<()> {
    match reply {
        Reply::Text(text) => {
            message.reply(&ctx.http, &text).await?;
            info!(
                "Replied to {} in channel {}: {}",
                message.author.tag(),
                message.channel_id,
                text
            );
        }
        Reply::Help(card) => {
            let embed = help_embed(ctx, card);
            message
                .channel_id
                .send_message(&ctx.http, CreateMessage::new().embed(embed))
                .await?;
            info!(
                "Sent help to {} in channel {}",
                message.author.tag(),
                message.channel_id
            );
        }
    }
    Ok(())
}

async fn event_handler(ctx: &Context, event: &FullEvent, data: &Data) -> EventResult {
    if let FullEvent::Message { new_message } = event {
        let incoming = to_incoming(ctx, new_message);
        if incoming.from_self {
            return Ok(());
        }

        debug!(
            "Received message from {} in channel {}: {}",
            new_message.author.tag(),
            new_message.channel_id,
            new_message.content
        );

        // One message at a time: the controller lock is held for the whole turn
        let reply = {
            let mut controller = data.controller.lock().await;
            controller.handle(&incoming).await
        };

        if let Some(reply) = reply {
            send_reply(ctx, new_message, reply).await?;
        }
    }
    Ok(())
}
