use std::{collections::HashMap, sync::Arc};

use tracing::info;

use greenbot_utils::parse::split_first_token;

use crate::command::Command;
use crate::host::{ActionHost, Invocation};

/// Routes the first token of the remaining message to a child command.
///
/// The live mapping can be extended with [`MultiAction::merge`];
/// [`MultiAction::reset`] restores the mapping the action was built with.
/// Nothing here is synchronised: callers must not merge while dispatching
/// through the same instance.
#[derive(Clone, Debug, Default)]
pub struct MultiAction {
    commands: HashMap<String, Arc<Command>>,
    original_commands: HashMap<String, Arc<Command>>,
    default: Option<String>,
    fallback: Option<String>,
}

/// Outcome of alias routing.
struct Route<'s, 'm> {
    alias: &'s str,
    command: &'s Arc<Command>,
    message: Option<&'m str>,
}

impl MultiAction {
    /// Build from an existing alias mapping and snapshot it.
    ///
    /// Aliases, `default`, and `fallback` are lowercased.
    pub fn ready_built(
        commands: HashMap<String, Arc<Command>>,
        default: Option<String>,
        fallback: Option<String>,
    ) -> Self {
        let commands = commands
            .into_iter()
            .map(|(alias, command)| (alias.to_lowercase(), command))
            .collect::<HashMap<_, _>>();

        Self {
            original_commands: commands.clone(),
            commands,
            default: default.map(|alias| alias.to_lowercase()),
            fallback: fallback.map(|alias| alias.to_lowercase()),
        }
    }

    pub fn get(&self, alias: &str) -> Option<&Arc<Command>> {
        self.commands.get(&alias.to_lowercase())
    }

    /// Live aliases, sorted.
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases = self.commands.keys().map(String::as_str).collect::<Vec<_>>();
        aliases.sort_unstable();
        aliases
    }

    pub fn default_alias(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn fallback_alias(&self) -> Option<&str> {
        self.fallback.as_deref()
    }

    /// Copy `other`'s live children into this mapping. Same aliases are overwritten.
    pub fn merge(&mut self, other: &MultiAction) {
        self.commands.extend(
            other
                .commands
                .iter()
                .map(|(alias, command)| (alias.clone(), Arc::clone(command))),
        );
    }

    /// Restore the mapping present at construction.
    pub fn reset(&mut self) {
        self.commands = self.original_commands.clone();
    }

    /// Route and run a child command, enforcing its access level.
    pub fn run(&self, host: &dyn ActionHost, invocation: &Invocation<'_>) -> anyhow::Result<bool> {
        let Some(route) = self.route(invocation.message) else {
            return Ok(false);
        };

        if invocation.args.user_level < route.command.level {
            info!(
                user_id = invocation.user_id.get(),
                sub_command = route.alias,
                user_level = invocation.args.user_level,
                required_level = route.command.level,
                "user tried running a sub-command they have no access to"
            );
            return Ok(false);
        }

        route
            .command
            .run(host, &invocation.with_message(route.message))
    }

    /// Any text selects a child by its first token, falling back to the
    /// `fallback` child with the whole text. No text selects `default`.
    fn route<'m>(&self, message: Option<&'m str>) -> Option<Route<'_, 'm>> {
        let Some(text) = message.filter(|text| !text.trim().is_empty()) else {
            let alias = self.default.as_deref()?;
            let (alias, command) = self.commands.get_key_value(alias)?;
            return Some(Route {
                alias,
                command,
                message: None,
            });
        };

        let (head, tail) = split_first_token(text);
        let token = head?.to_lowercase();
        if let Some((alias, command)) = self.commands.get_key_value(&token) {
            return Some(Route {
                alias,
                command,
                message: tail,
            });
        }

        let fallback = self.fallback.as_deref()?;
        let (alias, command) = self.commands.get_key_value(fallback)?;
        Some(Route {
            alias,
            command,
            message: Some(text),
        })
    }
}
