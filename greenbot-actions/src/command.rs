use crate::action::Action;
use crate::host::{ActionHost, Invocation};

/// Level required when a description does not name one.
pub const DEFAULT_LEVEL: i32 = 100;

/// An action guarded by an access level.
#[derive(Clone, Debug)]
pub struct Command {
    pub level: i32,
    pub action: Action,
    pub description: Option<String>,
}

impl Command {
    pub fn new(action: Action) -> Self {
        Self {
            level: DEFAULT_LEVEL,
            action,
            description: None,
        }
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Run the action. Level checks are the caller's job.
    pub fn run(&self, host: &dyn ActionHost, invocation: &Invocation<'_>) -> anyhow::Result<bool> {
        self.action.run(host, invocation)
    }
}
