use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use twilight_gateway::{EventTypeFlags, Intents, Shard, ShardId, StreamExt as _};
use twilight_http::Client;
use twilight_model::gateway::event::Event;

use rustls::crypto::ring::default_provider;
use sqlx::postgres::PgPoolOptions;

use greenbot_actions::{ActionParser, UrlFetcher};
use greenbot_commands::{
    dispatch::callback_registry, filters::filter_registry, handle_message, load_commands,
    variables::variable_registry,
};
use greenbot_core::{Context, Settings};
use greenbot_database::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load the .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls ring provider"))?;

    let settings = Settings::from_env()?;
    let token = settings.discord_token.clone();

    // Create a single shared HTTP Client
    let http = Arc::new(Client::new(token.clone()));
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;
    info!("PostgreSQL connection established.");
    let db = Database::new(db_pool);
    db.migrate().await?;

    let fetcher = UrlFetcher::new(&settings.user_agent)?;
    let ctx = Context::new(Arc::clone(&http), db, settings, fetcher, filter_registry());

    // Registries only need to live while descriptions are parsed
    let variables = variable_registry();
    let callbacks = callback_registry();
    let parser = ActionParser::new(&variables, &callbacks);
    let commands = Arc::new(RwLock::new(load_commands(&ctx, &parser).await?));

    let intents = Intents::GUILDS
        | Intents::GUILD_MESSAGES
        | Intents::MESSAGE_CONTENT
        | Intents::DIRECT_MESSAGES;

    // One gateway connection is plenty for a single guild
    let mut shard = Shard::new(ShardId::new(0, 1), token, intents);

    info!("Greenbot is connecting...");

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        let event = match item {
            Ok(event) => event,
            Err(source) => {
                error!(?source, "gateway event stream error");
                continue;
            }
        };

        match event {
            Event::Ready(_) => {
                info!("Greenbot has successfully awoken!");
            }
            Event::MessageCreate(msg) => {
                if let Err(source) =
                    handle_message(ctx.clone(), Arc::clone(&commands), msg).await
                {
                    error!(?source, "message handler failed");
                }
            }
            _ => {} // Ignore unused events
        }
    }

    Ok(())
}
