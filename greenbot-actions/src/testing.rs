//! Recording host and fixture registries shared by unit tests.

use std::sync::Mutex;

use serde_json::{Value, json};
use twilight_model::id::{
    Id,
    marker::{ChannelMarker, UserMarker},
};

use crate::filter::{FilterRegistry, SubstitutionFilter};
use crate::host::ActionHost;
use crate::substitution::VariableRegistry;
use crate::urlfetch::FetchTask;

fn upper(value: Value, _argument: Option<&str>) -> anyhow::Result<Option<Value>> {
    Ok(Some(json!(crate::substitution::value_text(&value).to_uppercase())))
}

fn exclaim(value: Value, _argument: Option<&str>) -> anyhow::Result<Option<Value>> {
    Ok(Some(json!(format!("{}!", crate::substitution::value_text(&value)))))
}

fn explode(_value: Value, _argument: Option<&str>) -> anyhow::Result<Option<Value>> {
    anyhow::bail!("filter exploded")
}

fn drop_value(_value: Value, _argument: Option<&str>) -> anyhow::Result<Option<Value>> {
    Ok(None)
}

/// Families used across tests:
/// - `source`: `level` (number), `staff` (level >= 500), anything else is no value.
/// - `echo`: `arg` returns the injected argument, `message` the whole
///   message, any other key echoes itself.
pub(crate) fn test_variables() -> VariableRegistry {
    let mut variables = VariableRegistry::new();
    variables
        .register("source", |key, extra| match key {
            "level" => Some(json!(extra.args.user_level)),
            "staff" => Some(json!(extra.args.user_level >= 500)),
            _ => None,
        })
        .register("echo", |key, extra| match key {
            "arg" => extra.argument.clone().map(Value::String),
            "message" => extra.message.clone().map(Value::String),
            other => Some(json!(other)),
        });
    variables
}

pub(crate) struct RecordingHost {
    filters: FilterRegistry,
    said: Mutex<Vec<(Id<ChannelMarker>, String)>>,
    whispered: Mutex<Vec<(Id<UserMarker>, String)>>,
    scheduled: Mutex<Vec<FetchTask>>,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self {
            filters: FilterRegistry::new()
                .with("upper", upper)
                .with("exclaim", exclaim)
                .with("explode", explode)
                .with("drop", drop_value),
            said: Mutex::default(),
            whispered: Mutex::default(),
            scheduled: Mutex::default(),
        }
    }
}

impl RecordingHost {
    pub(crate) fn said(&self) -> Vec<(Id<ChannelMarker>, String)> {
        self.said.lock().unwrap().clone()
    }

    pub(crate) fn whispered(&self) -> Vec<(Id<UserMarker>, String)> {
        self.whispered.lock().unwrap().clone()
    }

    pub(crate) fn scheduled(&self) -> Vec<FetchTask> {
        self.scheduled.lock().unwrap().clone()
    }
}

impl ActionHost for RecordingHost {
    fn say(&self, channel_id: Id<ChannelMarker>, text: &str) -> bool {
        self.said.lock().unwrap().push((channel_id, text.to_owned()));
        true
    }

    fn private_message(&self, user_id: Id<UserMarker>, text: &str) -> bool {
        self.whispered.lock().unwrap().push((user_id, text.to_owned()));
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
        self.scheduled.lock().unwrap().push(task);
    }

    fn ban(&self, _user_id: Id<UserMarker>, _reason: Option<&str>) {}

    fn unban(&self, _user_id: Id<UserMarker>, _reason: Option<&str>) {}
}
