use std::collections::{HashMap, hash_map::Entry};
use std::sync::Arc;

use serde::Deserialize;
use tracing::error;

use crate::action::{Action, ActionCallback, FuncAction, MessageAction};
use crate::command::{Command, DEFAULT_LEVEL};
use crate::error::ParseError;
use crate::multi::MultiAction;
use crate::substitution::VariableRegistry;

/// Persisted action description.
///
/// Kept loose on purpose: `type` is matched explicitly in
/// [`ActionParser::parse`] so unknown kinds get their own error.
#[derive(Clone, Debug, Deserialize)]
pub struct ActionDescription {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub cb: Option<String>,
    #[serde(default)]
    pub args: Vec<CommandDescription>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub fallback: Option<String>,
}

/// A child command inside a `multi` description.
#[derive(Clone, Debug, Deserialize)]
pub struct CommandDescription {
    /// Aliases separated by `|`.
    pub command: String,
    #[serde(default = "default_level")]
    pub level: i32,
    pub action: ActionDescription,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_level() -> i32 {
    DEFAULT_LEVEL
}

/// Static callback name to function mapping for `func` actions.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    callbacks: HashMap<&'static str, ActionCallback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, callback: ActionCallback) -> Self {
        self.callbacks.insert(name, callback);
        self
    }

    pub fn get(&self, name: &str) -> Option<ActionCallback> {
        self.callbacks.get(name).copied()
    }
}

/// Builds actions from descriptions against fixed registries.
#[derive(Clone, Copy)]
pub struct ActionParser<'r> {
    variables: &'r VariableRegistry,
    callbacks: &'r CallbackRegistry,
}

impl<'r> ActionParser<'r> {
    pub fn new(variables: &'r VariableRegistry, callbacks: &'r CallbackRegistry) -> Self {
        Self {
            variables,
            callbacks,
        }
    }

    /// Parse a raw JSON description. `command` only labels log lines.
    pub fn parse_json(&self, raw: &str, command: &str) -> Result<Option<Action>, ParseError> {
        let description = serde_json::from_str::<ActionDescription>(raw)?;
        self.parse(&description, command)
    }

    /// Build the action for `description`.
    ///
    /// `Ok(None)` means the action referenced something that does not exist
    /// (already logged). Unknown kinds and missing fields are errors.
    pub fn parse(
        &self,
        description: &ActionDescription,
        command: &str,
    ) -> Result<Option<Action>, ParseError> {
        match description.kind.as_str() {
            "channelmessage" => {
                let message = required(description.message.as_deref(), "channelmessage", "message")?;
                Ok(Some(Action::Say(MessageAction::new(message, self.variables))))
            }
            "privatemessage" => {
                let message = required(description.message.as_deref(), "privatemessage", "message")?;
                Ok(Some(Action::Whisper(MessageAction::new(message, self.variables))))
            }
            "func" => {
                let name = required(description.cb.as_deref(), "func", "cb")?;
                let Some(callback) = self.callbacks.get(name) else {
                    error!(command, callback = name, "unknown callback when parsing func action");
                    return Ok(None);
                };

                Ok(Some(Action::Func(FuncAction::new(name, callback))))
            }
            "multi" => self
                .multi_action(description, command)
                .map(|action| Some(Action::Multi(action))),
            other => Err(ParseError::UnknownActionType(other.to_owned())),
        }
    }

    /// Build a command from a child description. `Ok(None)` when its action
    /// resolved to nothing.
    pub fn parse_command(&self, description: &CommandDescription) -> Result<Option<Command>, ParseError> {
        let Some(action) = self.parse(&description.action, &description.command)? else {
            return Ok(None);
        };

        let mut command = Command::new(action).with_level(description.level);
        command.description = description.description.clone();
        Ok(Some(command))
    }

    fn multi_action(
        &self,
        description: &ActionDescription,
        command: &str,
    ) -> Result<MultiAction, ParseError> {
        let mut commands: HashMap<String, Arc<Command>> = HashMap::new();

        for child in &description.args {
            let Some(sub_command) = self.parse_command(child)? else {
                error!(command, aliases = %child.command, "dropping sub-command without an action");
                continue;
            };

            let sub_command = Arc::new(sub_command);
            for alias in child
                .command
                .split('|')
                .map(str::trim)
                .filter(|alias| !alias.is_empty())
            {
                match commands.entry(alias.to_lowercase()) {
                    Entry::Occupied(_) => {
                        error!(command, alias, "alias for this multi action is already in use");
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(Arc::clone(&sub_command));
                    }
                }
            }
        }

        Ok(MultiAction::ready_built(
            commands,
            description.default.clone(),
            description.fallback.clone(),
        ))
    }
}

fn required<'a>(
    value: Option<&'a str>,
    kind: &'static str,
    field: &'static str,
) -> Result<&'a str, ParseError> {
    value.ok_or(ParseError::MissingField { kind, field })
}
