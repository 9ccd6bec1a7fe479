//! Message command handling on top of the action engine.

/// Callbacks available to `func` actions.
pub mod dispatch;
/// Host filters.
pub mod filters;
/// Loaded command table.
pub mod manager;
/// Host variable families.
pub mod variables;

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info};
use twilight_model::{
    gateway::payload::incoming::MessageCreate,
    id::{Id, marker::RoleMarker},
};

use greenbot_actions::{ActionParser, Invocation, InvocationArgs};
use greenbot_core::Context;
use greenbot_database::commands::enabled_commands;
use greenbot_utils::levels::resolve_user_level;
use greenbot_utils::parse::split_first_token;

pub use manager::CommandManager;

/// Read every enabled command from the database.
pub async fn load_commands(
    ctx: &Context,
    parser: &ActionParser<'_>,
) -> anyhow::Result<CommandManager> {
    let rows = enabled_commands(&ctx.db).await?;
    Ok(CommandManager::from_rows(&rows, parser))
}

/// Split `content` into a lowercased trigger and the remaining text.
///
/// `None` when the prefix is missing or nothing follows it.
fn parse_invocation<'m>(content: &'m str, prefix: &str) -> Option<(String, Option<&'m str>)> {
    let content = content.trim().strip_prefix(prefix)?;
    // `! ping` is not an invocation.
    if content.starts_with(char::is_whitespace) {
        return None;
    }

    let (trigger, message) = split_first_token(content);
    Some((trigger?.to_lowercase(), message))
}

/// Role list of the author, `None` for direct messages.
async fn author_roles(ctx: &Context, msg: &MessageCreate) -> anyhow::Result<Option<Vec<Id<RoleMarker>>>> {
    if msg.guild_id.is_none() {
        return Ok(None);
    }

    if let Some(member) = msg.member.as_ref() {
        return Ok(Some(member.roles.clone()));
    }

    let member = ctx
        .http
        .guild_member(ctx.settings.guild_id, msg.author.id)
        .await?
        .model()
        .await?;

    Ok(Some(member.roles))
}

pub async fn handle_message(
    ctx: Context,
    commands: Arc<RwLock<CommandManager>>,
    msg: Box<MessageCreate>,
) -> anyhow::Result<()> {
    if msg.author.bot {
        return Ok(());
    }

    if let Some(guild_id) = msg.guild_id
        && (guild_id != ctx.settings.guild_id || !ctx.settings.listens_in(msg.channel_id))
    {
        return Ok(());
    }

    let Some((trigger, message)) = parse_invocation(&msg.content, &ctx.settings.command_prefix)
    else {
        return Ok(());
    };

    if commands.read().await.get(&trigger).is_none() {
        return Ok(());
    }

    let roles = match author_roles(&ctx, &msg).await {
        Ok(roles) => roles,
        Err(source) => {
            error!(?source, user_id = msg.author.id.get(), "failed to fetch member roles");
            None
        }
    };
    let user_level = resolve_user_level(roles.as_deref(), &ctx.settings.admin_roles);

    let args = InvocationArgs {
        trigger,
        user_level,
    };
    let invocation = Invocation {
        user_id: msg.author.id,
        channel_id: msg.channel_id,
        message,
        whisper: msg.guild_id.is_none(),
        args: &args,
    };

    let commands = commands.read().await;
    let Some(command) = commands.get(&args.trigger) else {
        return Ok(());
    };

    if user_level < command.level {
        info!(
            user_id = msg.author.id.get(),
            trigger = %args.trigger,
            user_level,
            required_level = command.level,
            "user tried running a command they have no access to"
        );
        return Ok(());
    }

    let acted = command.run(&ctx, &invocation)?;
    debug!(trigger = %args.trigger, acted, "command ran");

    Ok(())
}
