#[tokio::main]
async fn main() -> livbot::error::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("livbot=info,serenity=warn"),
    )
    .init();
    log::info!("Starting livbot Discord bot");

    match livbot::run().await {
        Ok(()) => {
            log::info!("Bot shut down successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Bot encountered an error: {e}");
            Err(e)
        }
    }
}
