//! Variable families available to `$(family:key)` placeholders.

use serde_json::{Value, json};

use greenbot_actions::{ExtraContext, VariableRegistry};
use greenbot_utils::parse::parse_target_user_id;

/// The bot's variable families:
///
/// - `source`: the invoker (`id`, `mention`, `level`)
/// - `user`: a user named by the `;N` argument (`id`, `mention`)
/// - `command`: the invocation (`trigger`)
/// - `message`: the text after the trigger (`text`)
pub fn variable_registry() -> VariableRegistry {
    let mut variables = VariableRegistry::new();
    variables
        .register("source", source)
        .register("user", user)
        .register("command", command)
        .register("message", message);
    variables
}

fn source(key: &str, extra: &ExtraContext) -> Option<Value> {
    match key {
        "id" => Some(json!(extra.user_id.to_string())),
        "mention" => Some(json!(format!("<@{}>", extra.user_id))),
        "level" => Some(json!(extra.args.user_level)),
        _ => None,
    }
}

fn user(key: &str, extra: &ExtraContext) -> Option<Value> {
    let user_id = parse_target_user_id(extra.argument.as_deref()?)?;
    match key {
        "id" => Some(json!(user_id.to_string())),
        "mention" => Some(json!(format!("<@{user_id}>"))),
        _ => None,
    }
}

fn command(key: &str, extra: &ExtraContext) -> Option<Value> {
    match key {
        "trigger" => Some(json!(extra.args.trigger)),
        _ => None,
    }
}

fn message(key: &str, extra: &ExtraContext) -> Option<Value> {
    match key {
        "text" => Some(json!(extra.message.as_deref().unwrap_or_default())),
        _ => None,
    }
}
