use std::collections::HashMap;

use tracing::{debug, error, info};

use greenbot_actions::{Action, ActionParser, Command, FuncAction};
use greenbot_database::commands::CommandRow;
use greenbot_utils::levels::BASE_LEVEL;

use crate::dispatch;

/// Loaded commands keyed by trigger.
///
/// One command may answer to several triggers. Adding a `multi` command
/// under a trigger already bound to a `multi` merges the children into the
/// existing one; any other duplicate keeps the first definition.
#[derive(Debug, Default)]
pub struct CommandManager {
    commands: Vec<Command>,
    triggers: HashMap<String, usize>,
}

fn split_aliases(aliases: &str) -> impl Iterator<Item = String> + '_ {
    aliases
        .split('|')
        .map(|alias| alias.trim().to_lowercase())
        .filter(|alias| !alias.is_empty())
}

impl CommandManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager holding the built-in commands and every row that parses.
    pub fn from_rows(rows: &[CommandRow], parser: &ActionParser<'_>) -> Self {
        let mut manager = Self::new();

        manager.add(
            "ping",
            Command::new(Action::RawFunc(FuncAction::new("ping", dispatch::ping)))
                .with_level(BASE_LEVEL)
                .with_description("Replies with Pong!"),
        );
        manager.add(
            "level",
            Command::new(Action::Func(FuncAction::new("level", dispatch::level)))
                .with_level(BASE_LEVEL)
                .with_description("Shows your access level."),
        );

        for row in rows {
            let action = match parser.parse_json(&row.action_json, &row.command) {
                Ok(Some(action)) => action,
                Ok(None) => continue,
                Err(source) => {
                    error!(%source, id = row.id, command = %row.command, "skipping unparseable command");
                    continue;
                }
            };

            let mut command = Command::new(action).with_level(row.level);
            command.description = row.description.clone();
            manager.add(&row.command, command);
        }

        info!(
            commands = manager.len(),
            triggers = manager.triggers.len(),
            "commands loaded"
        );
        manager
    }

    /// Bind `command` to every `|`-separated alias.
    pub fn add(&mut self, aliases: &str, command: Command) {
        let index = self.commands.len();
        let mut bound = false;

        for alias in split_aliases(aliases) {
            let Some(&existing) = self.triggers.get(&alias) else {
                self.triggers.insert(alias, index);
                bound = true;
                continue;
            };

            match (&mut self.commands[existing].action, &command.action) {
                (Action::Multi(current), Action::Multi(extra)) => {
                    current.merge(extra);
                    debug!(%alias, "merged sub-commands into existing command");
                }
                _ => error!(%alias, "duplicate command trigger, keeping the first definition"),
            }
        }

        if bound {
            self.commands.push(command);
        }
    }

    pub fn get(&self, trigger: &str) -> Option<&Command> {
        self.triggers
            .get(&trigger.to_lowercase())
            .map(|&index| &self.commands[index])
    }

    /// Drop sub-commands merged in since construction.
    ///
    /// Not called by the gateway loop. Code that extends `multi` commands at
    /// runtime through [`CommandManager::add`] calls this under the write
    /// lock to undo those extensions.
    pub fn reset(&mut self) {
        for command in &mut self.commands {
            command.action.reset();
        }
    }

    /// Bound triggers, sorted.
    pub fn triggers(&self) -> Vec<&str> {
        let mut triggers = self.triggers.keys().map(String::as_str).collect::<Vec<_>>();
        triggers.sort_unstable();
        triggers
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use greenbot_actions::{ActionParser, MultiAction};

    use super::*;
    use crate::dispatch::callback_registry;
    use crate::variables::variable_registry;

    fn row(id: i32, command: &str, level: i32, action_json: &str) -> CommandRow {
        CommandRow {
            id,
            command: command.to_owned(),
            level,
            action_json: action_json.to_owned(),
            description: None,
        }
    }

    fn load(rows: &[CommandRow]) -> CommandManager {
        let variables = variable_registry();
        let callbacks = callback_registry();
        CommandManager::from_rows(rows, &ActionParser::new(&variables, &callbacks))
    }

    fn multi_aliases(manager: &CommandManager, trigger: &str) -> Vec<String> {
        match &manager.get(trigger).unwrap().action {
            Action::Multi(multi) => multi.aliases().into_iter().map(ToOwned::to_owned).collect(),
            other => panic!("expected multi, got {}", other.kind()),
        }
    }

    #[test]
    fn builtins_are_always_present() {
        let manager = load(&[]);
        assert_eq!(manager.triggers(), vec!["level", "ping"]);
        assert_eq!(manager.get("PING").unwrap().action.kind(), "rawfunc");
        assert_eq!(manager.get("level").unwrap().level, BASE_LEVEL);
    }

    #[test]
    fn rows_bind_every_alias() {
        let manager = load(&[row(
            1,
            "hug|Cuddle",
            100,
            r#"{"type":"channelmessage","message":"hugs $(1)"}"#,
        )]);

        assert_eq!(manager.len(), 3);
        assert_eq!(manager.get("cuddle").unwrap().action.kind(), "channelmessage");
        assert!(std::ptr::eq(manager.get("hug").unwrap(), manager.get("cuddle").unwrap()));
    }

    #[test]
    fn broken_rows_are_skipped() {
        let manager = load(&[
            row(1, "bad", 100, r#"{"type":"telepathy"}"#),
            row(2, "worse", 100, "not json"),
            row(3, "nocb", 100, r#"{"type":"func","cb":"missing"}"#),
            row(4, "fine", 100, r#"{"type":"func","cb":"ping"}"#),
        ]);

        assert_eq!(manager.triggers(), vec!["fine", "level", "ping"]);
    }

    #[test]
    fn first_definition_wins() {
        let manager = load(&[row(
            1,
            "ping",
            100,
            r#"{"type":"channelmessage","message":"not pong"}"#,
        )]);

        assert_eq!(manager.len(), 2);
        assert_eq!(manager.get("ping").unwrap().action.kind(), "rawfunc");
    }

    #[test]
    fn multi_rows_merge_and_reset() {
        let mut manager = load(&[row(
            1,
            "quote",
            100,
            r#"{"type":"multi","args":[
                {"command":"add","action":{"type":"func","cb":"ping"}}
            ]}"#,
        )]);
        assert_eq!(multi_aliases(&manager, "quote"), vec!["add"]);

        let extra = MultiAction::ready_built(
            HashMap::from([(
                "remove".to_owned(),
                std::sync::Arc::new(Command::new(Action::Func(FuncAction::new(
                    "level",
                    dispatch::level,
                )))),
            )]),
            None,
            None,
        );
        manager.add("quote", Command::new(Action::Multi(extra)));

        assert_eq!(manager.len(), 3);
        assert_eq!(multi_aliases(&manager, "quote"), vec!["add", "remove"]);

        manager.reset();
        assert_eq!(multi_aliases(&manager, "quote"), vec!["add"]);
    }
}
