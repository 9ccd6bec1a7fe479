use serde_json::Value;
use twilight_model::id::{
    Id,
    marker::{ChannelMarker, UserMarker},
};

use crate::filter::SubstitutionFilter;
use crate::urlfetch::FetchTask;

/// Arguments the message handler attaches to every invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InvocationArgs {
    /// Trigger word the command was invoked with, prefix stripped.
    pub trigger: String,
    /// Access level of the invoking user.
    pub user_level: i32,
}

/// A single command invocation as seen by an action.
#[derive(Clone, Copy, Debug)]
pub struct Invocation<'a> {
    pub user_id: Id<UserMarker>,
    pub channel_id: Id<ChannelMarker>,
    /// Text following the trigger, `None` when nothing followed it.
    pub message: Option<&'a str>,
    /// Whether the command arrived as a private message.
    pub whisper: bool,
    pub args: &'a InvocationArgs,
}

impl<'a> Invocation<'a> {
    /// Same invocation with a different remaining message.
    pub fn with_message(self, message: Option<&'a str>) -> Self {
        Self { message, ..self }
    }
}

/// Capabilities the bot hands to actions.
///
/// Every method returns without waiting on the platform. Implementations
/// queue network work on the async runtime.
pub trait ActionHost: Send + Sync {
    /// Queue a message for a channel. Returns `false` when nothing was queued.
    fn say(&self, channel_id: Id<ChannelMarker>, text: &str) -> bool;

    /// Queue a private message for a user.
    fn private_message(&self, user_id: Id<UserMarker>, text: &str) -> bool;

    /// Apply one named filter. `Ok(None)` aborts the surrounding response.
    fn apply_filter(
        &self,
        value: Value,
        filter: &SubstitutionFilter,
    ) -> anyhow::Result<Option<Value>>;

    /// Run fetch resolution and final delivery off the event loop.
    fn schedule_fetch(&self, task: FetchTask);

    fn ban(&self, user_id: Id<UserMarker>, reason: Option<&str>);

    fn unban(&self, user_id: Id<UserMarker>, reason: Option<&str>);
}
