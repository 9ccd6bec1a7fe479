//! Message substitution and action dispatch.
//!
//! Command definitions are parsed into [`Action`]s once at load time. On
//! invocation an action resolves its `$(...)` template against the caller,
//! runs filters, and hands the text to an [`ActionHost`] for delivery.

/// Action variants and message delivery.
pub mod action;
/// Level-guarded commands.
pub mod command;
/// Engine error types.
pub mod error;
/// Substitution filters.
pub mod filter;
/// Host capabilities and invocation data.
pub mod host;
/// Sub-command routing.
pub mod multi;
/// Declarative action descriptions.
pub mod parser;
/// Substitution tables and resolution.
pub mod substitution;
/// Placeholder grammar.
pub mod template;
/// Fetch placeholder guard and resolution.
pub mod urlfetch;

#[cfg(test)]
mod testing;

pub use action::{Action, ActionCallback, FuncAction, MessageAction};
pub use command::Command;
pub use error::{FetchError, ParseError};
pub use filter::{FilterRegistry, SubstitutionFilter};
pub use host::{ActionHost, Invocation, InvocationArgs};
pub use multi::MultiAction;
pub use parser::{ActionDescription, ActionParser, CallbackRegistry, CommandDescription};
pub use substitution::{ExtraContext, VariableRegistry};
pub use urlfetch::{Delivery, FetchTask, UrlFetcher};
