use std::sync::Arc;

use serde_json::Value;
use tracing::{error, warn};
use twilight_http::{Client, request::AuditLogReason as _};
use twilight_model::id::{
    Id,
    marker::{ChannelMarker, UserMarker},
};

use greenbot_actions::{ActionHost, FetchTask, FilterRegistry, SubstitutionFilter, UrlFetcher};
use greenbot_database::Database;
use greenbot_utils::markdown::escape_markdown;

/// Environment-driven runtime configuration.
pub mod settings;

pub use settings::Settings;

/// Shared application context passed into command handlers.
///
/// Cheap to clone because it only stores reference-counted shared state.
#[derive(Clone)]
pub struct Context {
    pub http: Arc<Client>,
    pub db: Database,
    pub settings: Arc<Settings>,
    pub fetcher: UrlFetcher,
    pub filters: Arc<FilterRegistry>,
}

impl Context {
    /// Create a new application context.
    pub fn new(
        http: Arc<Client>,
        db: Database,
        settings: Settings,
        fetcher: UrlFetcher,
        filters: FilterRegistry,
    ) -> Self {
        Self {
            http,
            db,
            settings: Arc::new(settings),
            fetcher,
            filters: Arc::new(filters),
        }
    }
}

async fn send_private_message(
    http: &Client,
    user_id: Id<UserMarker>,
    content: &str,
) -> anyhow::Result<()> {
    let channel = http.create_private_channel(user_id).await?.model().await?;
    http.create_message(channel.id).content(content).await?;

    Ok(())
}

/// Platform calls are spawned onto the runtime so actions never wait on
/// Discord.
impl ActionHost for Context {
    fn say(&self, channel_id: Id<ChannelMarker>, text: &str) -> bool {
        let http = Arc::clone(&self.http);
        let content = text.to_owned();

        tokio::spawn(async move {
            if let Err(source) = http.create_message(channel_id).content(&content).await {
                error!(?source, channel_id = channel_id.get(), "channel message failed");
            }
        });

        true
    }

    fn private_message(&self, user_id: Id<UserMarker>, text: &str) -> bool {
        let http = Arc::clone(&self.http);
        let content = escape_markdown(text);

        tokio::spawn(async move {
            if let Err(source) = send_private_message(&http, user_id, &content).await {
                error!(?source, user_id = user_id.get(), "private message failed");
            }
        });

        true
    }

    fn apply_filter(
        &self,
        value: Value,
        filter: &SubstitutionFilter,
    ) -> anyhow::Result<Option<Value>> {
        self.filters.apply(value, filter)
    }

    fn schedule_fetch(&self, task: FetchTask) {
        let ctx = self.clone();

        tokio::spawn(async move {
            task.execute(&ctx.fetcher, &ctx).await;
        });
    }

    fn ban(&self, user_id: Id<UserMarker>, reason: Option<&str>) {
        let http = Arc::clone(&self.http);
        let guild_id = self.settings.guild_id;
        let reason = reason.map(ToOwned::to_owned);

        tokio::spawn(async move {
            let mut request = http.create_ban(guild_id, user_id);
            if let Some(reason) = reason.as_deref() {
                request = request.reason(reason);
            }

            if let Err(source) = request.await {
                warn!(?source, user_id = user_id.get(), "ban request failed");
            }
        });
    }

    fn unban(&self, user_id: Id<UserMarker>, reason: Option<&str>) {
        let http = Arc::clone(&self.http);
        let guild_id = self.settings.guild_id;
        let reason = reason.map(ToOwned::to_owned);

        tokio::spawn(async move {
            let mut request = http.delete_ban(guild_id, user_id);
            if let Some(reason) = reason.as_deref() {
                request = request.reason(reason);
            }

            if let Err(source) = request.await {
                warn!(?source, user_id = user_id.get(), "unban request failed");
            }
        });
    }
}
