use std::fmt;

use tracing::error;

use crate::host::{ActionHost, Invocation};
use crate::multi::MultiAction;
use crate::substitution::{
    ArgumentSubstitution, ExtraContext, Substitution, VariableRegistry,
    apply_argument_substitutions, apply_substitutions, argument_substitutions,
    named_substitutions,
};
use crate::urlfetch::{Delivery, FetchTask, count_fetch_placeholders};

/// Callback bound to `func` actions. `Ok(true)` means the callback acted.
pub type ActionCallback = fn(&dyn ActionHost, &Invocation<'_>) -> anyhow::Result<bool>;

/// What happens when a command fires.
#[derive(Clone, Debug)]
pub enum Action {
    /// Reply in the invoking channel.
    Say(MessageAction),
    /// Reply privately to the invoker.
    Whisper(MessageAction),
    /// Callback with errors logged and swallowed.
    Func(FuncAction),
    /// Callback with errors propagated to the caller.
    RawFunc(FuncAction),
    /// Sub-command router.
    Multi(MultiAction),
}

impl Action {
    /// Discriminator used in declarative descriptions and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Say(_) => "channelmessage",
            Self::Whisper(_) => "privatemessage",
            Self::Func(_) => "func",
            Self::RawFunc(_) => "rawfunc",
            Self::Multi(_) => "multi",
        }
    }

    pub fn run(&self, host: &dyn ActionHost, invocation: &Invocation<'_>) -> anyhow::Result<bool> {
        match self {
            Self::Say(action) => Ok(action.deliver(
                host,
                invocation,
                Delivery::Channel(invocation.channel_id),
            )),
            Self::Whisper(action) => Ok(action.deliver(
                host,
                invocation,
                Delivery::Private(invocation.user_id),
            )),
            Self::Func(action) => match (action.callback)(host, invocation) {
                Ok(acted) => Ok(acted),
                Err(source) => {
                    error!(?source, callback = %action.name, "uncaught error in func action");
                    Ok(false)
                }
            },
            Self::RawFunc(action) => (action.callback)(host, invocation),
            Self::Multi(action) => action.run(host, invocation),
        }
    }

    /// Undo runtime changes. Only multi actions carry any.
    pub fn reset(&mut self) {
        if let Self::Multi(action) = self {
            action.reset();
        }
    }
}

/// A named callback reference.
#[derive(Clone)]
pub struct FuncAction {
    pub name: String,
    pub callback: ActionCallback,
}

impl FuncAction {
    pub fn new(name: impl Into<String>, callback: ActionCallback) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

impl fmt::Debug for FuncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncAction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Response template with its parsed substitution tables.
#[derive(Clone, Debug)]
pub struct MessageAction {
    response: String,
    subs: Vec<Substitution>,
    argument_subs: Vec<ArgumentSubstitution>,
    fetch_ceiling: usize,
}

impl MessageAction {
    pub fn new(response: impl Into<String>, variables: &VariableRegistry) -> Self {
        let response = response.into();
        let subs = named_substitutions(&response, variables);
        let argument_subs = argument_substitutions(&response);
        let fetch_ceiling = count_fetch_placeholders(&response);

        Self {
            response,
            subs,
            argument_subs,
            fetch_ceiling,
        }
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn fetch_ceiling(&self) -> usize {
        self.fetch_ceiling
    }

    /// Resolve the template, `None` when any named substitution aborts.
    pub fn get_response(&self, host: &dyn ActionHost, extra: &mut ExtraContext) -> Option<String> {
        let resolved = apply_substitutions(&self.response, &self.subs, host, extra)?;
        Some(apply_argument_substitutions(
            resolved,
            &self.argument_subs,
            extra.message.as_deref(),
        ))
    }

    fn deliver(&self, host: &dyn ActionHost, invocation: &Invocation<'_>, delivery: Delivery) -> bool {
        let mut extra = ExtraContext::new(invocation);
        let Some(response) = self.get_response(host, &mut extra) else {
            return false;
        };

        if response.is_empty() {
            return false;
        }

        let found = count_fetch_placeholders(&response);
        if found > self.fetch_ceiling {
            error!(
                found,
                ceiling = self.fetch_ceiling,
                user_id = invocation.user_id.get(),
                message = %response,
                "HIJACK ATTEMPT: resolved response carries extra urlfetch placeholders"
            );
            return false;
        }

        if self.fetch_ceiling == 0 {
            return delivery.send(host, &response);
        }

        host.schedule_fetch(FetchTask {
            delivery,
            message: response,
            ceiling: self.fetch_ceiling,
        });

        true
    }
}
