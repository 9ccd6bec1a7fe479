//! Callbacks that `func` actions may name.

use greenbot_actions::{ActionHost, CallbackRegistry, Invocation};
use greenbot_utils::parse::{parse_target_user_id, split_first_token};

/// Every callback a description can reference by `cb`.
pub fn callback_registry() -> CallbackRegistry {
    CallbackRegistry::new()
        .with("ping", ping)
        .with("level", level)
        .with("ban", ban)
        .with("unban", unban)
}

/// Reply in the channel the invocation arrived from, privately if it was a
/// direct message.
fn reply(host: &dyn ActionHost, invocation: &Invocation<'_>, text: &str) -> bool {
    if invocation.whisper {
        host.private_message(invocation.user_id, text)
    } else {
        host.say(invocation.channel_id, text)
    }
}

pub fn ping(host: &dyn ActionHost, invocation: &Invocation<'_>) -> anyhow::Result<bool> {
    Ok(reply(host, invocation, "Pong!"))
}

pub fn level(host: &dyn ActionHost, invocation: &Invocation<'_>) -> anyhow::Result<bool> {
    let text = format!(
        "<@{}>, your level is {}",
        invocation.user_id, invocation.args.user_level
    );
    Ok(reply(host, invocation, &text))
}

pub fn ban(host: &dyn ActionHost, invocation: &Invocation<'_>) -> anyhow::Result<bool> {
    let (target, reason) = split_first_token(invocation.message.unwrap_or_default());
    let Some(user_id) = target.and_then(parse_target_user_id) else {
        let usage = format!("Usage: `{} <user> [reason]`", invocation.args.trigger);
        return Ok(reply(host, invocation, &usage));
    };

    if user_id == invocation.user_id {
        return Ok(reply(host, invocation, "You cannot ban yourself."));
    }

    host.ban(user_id, reason);
    Ok(reply(host, invocation, &format!("Ban requested for <@{user_id}>.")))
}

pub fn unban(host: &dyn ActionHost, invocation: &Invocation<'_>) -> anyhow::Result<bool> {
    let (target, reason) = split_first_token(invocation.message.unwrap_or_default());
    let Some(user_id) = target.and_then(parse_target_user_id) else {
        let usage = format!("Usage: `{} <user> [reason]`", invocation.args.trigger);
        return Ok(reply(host, invocation, &usage));
    };

    host.unban(user_id, reason);
    Ok(reply(host, invocation, &format!("Unban requested for <@{user_id}>.")))
}
