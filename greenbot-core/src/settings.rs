use std::{collections::HashMap, env};

use anyhow::{Context as _, bail};
use twilight_model::id::{
    Id,
    marker::{ChannelMarker, GuildMarker, RoleMarker},
};

const DEFAULT_COMMAND_PREFIX: &str = "!";

/// Runtime configuration read from the environment (and `.env`).
#[derive(Clone)]
pub struct Settings {
    pub discord_token: String,
    pub database_url: String,
    /// The one guild the bot serves.
    pub guild_id: Id<GuildMarker>,
    pub command_prefix: String,
    /// Role to access level, from `ADMIN_ROLES`.
    pub admin_roles: HashMap<Id<RoleMarker>, i32>,
    /// Channels commands are read from. Empty means every channel.
    pub listen_channels: Vec<Id<ChannelMarker>>,
    /// User agent sent with `urlfetch` requests.
    pub user_agent: String,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let require = |key: &str| lookup(key).with_context(|| format!("{key} is not set"));

        let guild_id = parse_id(&require("DISCORD_GUILD_ID")?).context("invalid DISCORD_GUILD_ID")?;
        let admin_roles = lookup("ADMIN_ROLES")
            .map(|raw| parse_admin_roles(&raw))
            .transpose()?
            .unwrap_or_default();
        let listen_channels = lookup("LISTEN_CHANNELS")
            .map(|raw| parse_channel_ids(&raw))
            .transpose()?
            .unwrap_or_default();
        let command_prefix = lookup("COMMAND_PREFIX")
            .map(|prefix| prefix.trim().to_owned())
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_owned());
        let user_agent = lookup("BOT_USER_AGENT")
            .unwrap_or_else(|| format!("greenbot/{}", env!("CARGO_PKG_VERSION")));

        Ok(Self {
            discord_token: require("DISCORD_TOKEN")?,
            database_url: require("DATABASE_URL")?,
            guild_id,
            command_prefix,
            admin_roles,
            listen_channels,
            user_agent,
        })
    }

    /// Whether guild messages in `channel_id` are read for commands.
    pub fn listens_in(&self, channel_id: Id<ChannelMarker>) -> bool {
        self.listen_channels.is_empty() || self.listen_channels.contains(&channel_id)
    }
}

fn parse_id<T>(raw: &str) -> anyhow::Result<Id<T>> {
    let value = raw
        .trim()
        .parse::<u64>()
        .with_context(|| format!("`{raw}` is not a snowflake"))?;

    Id::new_checked(value).with_context(|| format!("`{raw}` is not a snowflake"))
}

/// Parse `role_id:level` pairs separated by whitespace or commas.
fn parse_admin_roles(raw: &str) -> anyhow::Result<HashMap<Id<RoleMarker>, i32>> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let Some((role, level)) = pair.split_once(':') else {
                bail!("admin role `{pair}` must look like role_id:level");
            };
            let level = level
                .parse::<i32>()
                .with_context(|| format!("invalid level in admin role `{pair}`"))?;
            Ok((parse_id(role)?, level))
        })
        .collect()
}

fn parse_channel_ids(raw: &str) -> anyhow::Result<Vec<Id<ChannelMarker>>> {
    raw.split_whitespace().map(parse_id).collect()
}
