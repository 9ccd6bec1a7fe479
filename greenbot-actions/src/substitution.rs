//! Substitution tables and their resolution against an invocation.

use std::{collections::HashMap, fmt, sync::Arc};

use serde_json::Value;
use tracing::{debug, error};
use twilight_model::id::{Id, marker::UserMarker};

use greenbot_utils::parse::token_at;

use crate::filter::{SubstitutionFilter, apply_filters};
use crate::host::{ActionHost, Invocation, InvocationArgs};
use crate::template::{Placeholder, scan_arguments, scan_placeholders};

const CONDITIONAL_PATH: &str = "if";
const DEFAULT_FALSE_RESPONSE: &str = "No";

/// Host-supplied variable family. Receives the key (or positional value) and
/// the invocation context; `None` aborts the whole response.
pub type VariableFn = Arc<dyn Fn(&str, &ExtraContext) -> Option<Value> + Send + Sync>;

/// Path name to variable family mapping, populated at startup.
#[derive(Clone, Default)]
pub struct VariableRegistry {
    families: HashMap<String, VariableFn>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, path: &str, resolve: F) -> &mut Self
    where
        F: Fn(&str, &ExtraContext) -> Option<Value> + Send + Sync + 'static,
    {
        self.families.insert(path.to_owned(), Arc::new(resolve));
        self
    }

    pub fn get(&self, path: &str) -> Option<&VariableFn> {
        self.families.get(path)
    }
}

/// Per-invocation context handed to variable families.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtraContext {
    pub user_id: Id<UserMarker>,
    pub message: Option<String>,
    /// Positional value of the substitution being resolved, when it has both
    /// a key and a `;N` argument.
    pub argument: Option<String>,
    pub args: InvocationArgs,
}

impl ExtraContext {
    pub fn new(invocation: &Invocation<'_>) -> Self {
        Self {
            user_id: invocation.user_id,
            message: invocation.message.map(ToOwned::to_owned),
            argument: None,
            args: invocation.args.clone(),
        }
    }
}

#[derive(Clone)]
enum Resolver {
    Variable(VariableFn),
    Conditional(Box<Conditional>),
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(_) => f.write_str("Variable(..)"),
            Self::Conditional(conditional) => f.debug_tuple("Conditional").field(conditional).finish(),
        }
    }
}

/// A named or conditional placeholder ready for resolution.
#[derive(Clone, Debug)]
pub struct Substitution {
    pub needle: String,
    pub key: Option<String>,
    pub argument: Option<usize>,
    pub filters: Vec<SubstitutionFilter>,
    resolver: Resolver,
}

impl Substitution {
    fn from_placeholder(placeholder: &Placeholder, resolver: Resolver) -> Self {
        Self {
            needle: placeholder.needle.clone(),
            key: placeholder.key.clone(),
            argument: placeholder.argument,
            filters: placeholder.filters.clone(),
            resolver,
        }
    }

    /// Parameter handed to the resolver. A key with a `;N` argument stores
    /// that positional value in `extra.argument` first.
    fn param(&self, extra: &mut ExtraContext) -> Option<String> {
        match (&self.key, self.argument) {
            (Some(key), Some(argument)) => {
                let value = argument_value(extra.message.as_deref(), argument).to_owned();
                extra.argument = Some(value);
                Some(key.clone())
            }
            (Some(key), None) => Some(key.clone()),
            (None, Some(argument)) => {
                Some(argument_value(extra.message.as_deref(), argument).to_owned())
            }
            (None, None) => None,
        }
    }

    fn resolve(&self, param: &str, extra: &mut ExtraContext, host: &dyn ActionHost) -> Option<Value> {
        match &self.resolver {
            Resolver::Variable(resolve) => resolve(param, extra),
            Resolver::Conditional(conditional) => {
                conditional.evaluate(extra, host).map(Value::String)
            }
        }
    }
}

/// A positional `$(N)` placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentSubstitution {
    pub needle: String,
    pub argument: usize,
}

#[derive(Clone, Debug)]
enum Condition {
    Variable(Substitution),
    Argument(usize),
}

/// `$(if:<condition>,'true','false')`.
#[derive(Clone, Debug)]
pub struct Conditional {
    condition: Condition,
    true_response: String,
    false_response: String,
    true_subs: Vec<Substitution>,
    false_subs: Vec<Substitution>,
}

impl Conditional {
    /// Build from a parsed `if` placeholder. The key must hold exactly one
    /// nested named placeholder or exactly one positional placeholder.
    fn build(placeholder: &Placeholder, variables: &VariableRegistry) -> Option<Self> {
        let key = placeholder.key.as_deref()?;
        let true_response = placeholder.branches.first()?.clone();
        let false_response = placeholder
            .branches
            .get(1)
            .cloned()
            .unwrap_or_else(|| DEFAULT_FALSE_RESPONSE.to_owned());

        let mut nested = named_substitutions(key, variables);
        let condition = if nested.len() == 1 {
            let sub = nested.remove(0);
            match (&sub.key, sub.argument) {
                (Some(_), _) => Condition::Variable(sub),
                (None, Some(argument)) => Condition::Argument(argument),
                (None, None) => return None,
            }
        } else {
            let arguments = argument_substitutions(key);
            match arguments.as_slice() {
                [only] => Condition::Argument(only.argument),
                _ => return None,
            }
        };

        let true_subs = named_substitutions(&true_response, variables);
        let false_subs = named_substitutions(&false_response, variables);

        Some(Self {
            condition,
            true_response,
            false_response,
            true_subs,
            false_subs,
        })
    }

    fn evaluate(&self, extra: &mut ExtraContext, host: &dyn ActionHost) -> Option<String> {
        let truthy = match &self.condition {
            Condition::Argument(argument) => {
                !argument_value(extra.message.as_deref(), *argument).is_empty()
            }
            Condition::Variable(sub) => sub
                .param(extra)
                .and_then(|param| sub.resolve(&param, extra, host))
                .is_some_and(|value| is_truthy(&value)),
        };

        if truthy {
            apply_substitutions(&self.true_response, &self.true_subs, host, extra)
        } else {
            apply_substitutions(&self.false_response, &self.false_subs, host, extra)
        }
    }
}

/// Build the named substitution table for `text`.
///
/// Conditionals come first, then host variable families, each in order of
/// appearance. A needle seen twice yields one entry. Placeholders whose path
/// has no family stay in the text untouched.
pub fn named_substitutions(text: &str, variables: &VariableRegistry) -> Vec<Substitution> {
    let placeholders = scan_placeholders(text).collect::<Vec<_>>();
    let mut subs: Vec<Substitution> = Vec::new();

    for placeholder in placeholders
        .iter()
        .filter(|placeholder| placeholder.path == CONDITIONAL_PATH)
    {
        if subs.iter().any(|sub| sub.needle == placeholder.needle) {
            continue;
        }

        let Some(conditional) = Conditional::build(placeholder, variables) else {
            debug!(needle = %placeholder.needle, "ignoring conditional without a usable condition");
            continue;
        };

        subs.push(Substitution::from_placeholder(
            placeholder,
            Resolver::Conditional(Box::new(conditional)),
        ));
    }

    for placeholder in placeholders
        .iter()
        .filter(|placeholder| placeholder.path != CONDITIONAL_PATH)
    {
        if subs.iter().any(|sub| sub.needle == placeholder.needle) {
            continue;
        }

        let Some(resolve) = variables.get(&placeholder.path) else {
            continue;
        };

        subs.push(Substitution::from_placeholder(
            placeholder,
            Resolver::Variable(Arc::clone(resolve)),
        ));
    }

    subs
}

/// Positional placeholders in `text`, one per argument number.
///
/// `"$(1) $(1) $(2)"` yields two substitutions.
pub fn argument_substitutions(text: &str) -> Vec<ArgumentSubstitution> {
    let mut subs: Vec<ArgumentSubstitution> = Vec::new();

    for placeholder in scan_arguments(text) {
        if subs.iter().any(|sub| sub.argument == placeholder.argument) {
            continue;
        }

        subs.push(ArgumentSubstitution {
            needle: placeholder.needle,
            argument: placeholder.argument,
        });
    }

    subs
}

/// Resolve `subs` against `extra` and return the rewritten text.
///
/// Returns `None` as soon as one substitution yields no value: a message with
/// an unresolved variable is never sent.
pub fn apply_substitutions(
    text: &str,
    subs: &[Substitution],
    host: &dyn ActionHost,
    extra: &mut ExtraContext,
) -> Option<String> {
    let mut text = text.to_owned();

    for sub in subs {
        let Some(param) = sub.param(extra) else {
            error!(needle = %sub.needle, "substitution has neither a key nor an argument");
            return None;
        };

        let Some(value) = sub.resolve(&param, extra, host) else {
            debug!(needle = %sub.needle, "substitution resolved to no value, dropping response");
            return None;
        };

        let Some(value) = apply_filters(host, value, &sub.filters) else {
            debug!(needle = %sub.needle, "filters yielded no value, dropping response");
            return None;
        };

        text = text.replace(&sub.needle, &value_text(&value));
    }

    Some(text)
}

/// Replace positional placeholders with message tokens. Never fails.
pub fn apply_argument_substitutions(
    text: String,
    subs: &[ArgumentSubstitution],
    message: Option<&str>,
) -> String {
    subs.iter().fold(text, |text, sub| {
        let value = argument_value(message, sub.argument);
        debug!(needle = %sub.needle, value, "replacing positional argument");
        text.replace(&sub.needle, value)
    })
}

/// Token for 1-based `argument`, or `""` when absent, out of range, or zero.
pub fn argument_value(message: Option<&str>, argument: usize) -> &str {
    argument
        .checked_sub(1)
        .map_or("", |index| token_at(message, index))
}

/// Render a resolved value for insertion into a message.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|number| number != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{RecordingHost, test_variables};

    fn extra(message: Option<&str>, user_level: i32) -> ExtraContext {
        ExtraContext {
            user_id: Id::new(7),
            message: message.map(ToOwned::to_owned),
            argument: None,
            args: InvocationArgs {
                trigger: "test".to_owned(),
                user_level,
            },
        }
    }

    fn resolve(text: &str, message: Option<&str>, user_level: i32) -> Option<String> {
        let host = RecordingHost::default();
        let variables = test_variables();
        let subs = named_substitutions(text, &variables);
        let mut context = extra(message, user_level);
        let resolved = apply_substitutions(text, &subs, &host, &mut context)?;
        Some(apply_argument_substitutions(
            resolved,
            &argument_substitutions(text),
            message,
        ))
    }

    #[test]
    fn positional_arguments_are_deduplicated() {
        let subs = argument_substitutions("$(1) $(1) $(2)");
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].argument, 1);
        assert_eq!(subs[1].argument, 2);
    }

    #[test]
    fn out_of_range_arguments_resolve_empty() {
        assert_eq!(resolve("[$(1)][$(3)]", Some("only"), 100).as_deref(), Some("[only][]"));
        assert_eq!(resolve("[$(1)]", None, 100).as_deref(), Some("[]"));
        assert_eq!(resolve("[$(0)]", Some("zero"), 100).as_deref(), Some("[]"));
    }

    #[test]
    fn duplicate_needles_share_one_entry() {
        let variables = test_variables();
        let subs = named_substitutions("$(source:level) and $(source:level)", &variables);
        assert_eq!(subs.len(), 1);
        assert_eq!(
            resolve("$(source:level) and $(source:level)", None, 250).as_deref(),
            Some("250 and 250")
        );
    }

    #[test]
    fn unresolved_variable_aborts_whole_response() {
        assert_eq!(resolve("$(source:level) $(source:nothing)", None, 100), None);
    }

    #[test]
    fn unknown_families_stay_literal() {
        assert_eq!(
            resolve("$(mystery:thing) ok", None, 100).as_deref(),
            Some("$(mystery:thing) ok")
        );
    }

    #[test]
    fn filters_run_on_resolved_values() {
        assert_eq!(
            resolve("$(echo:shout|upper|exclaim)", None, 100).as_deref(),
            Some("SHOUT!")
        );
    }

    #[test]
    fn key_with_argument_injects_argument_into_context() {
        assert_eq!(
            resolve("$(echo;2:arg)", Some("first second"), 100).as_deref(),
            Some("second")
        );
    }

    #[test]
    fn conditional_on_positional_argument() {
        let template = "$(if:$(1),'hello $(1)','nobody')";
        assert_eq!(resolve(template, Some("bob"), 100).as_deref(), Some("hello bob"));
        assert_eq!(resolve(template, None, 100).as_deref(), Some("nobody"));
    }

    #[test]
    fn conditional_on_variable_resolves_nested_branches() {
        let template = "$(if:$(source:staff),'staff at $(source:level)')";
        assert_eq!(resolve(template, None, 500).as_deref(), Some("staff at 500"));
        assert_eq!(resolve(template, None, 100).as_deref(), Some("No"));
    }

    #[test]
    fn conditional_on_variable_with_argument() {
        let template = "$(if:$(echo;2:arg),'got $(2)','missing')";
        assert_eq!(resolve(template, Some("a b"), 100).as_deref(), Some("got b"));
        assert_eq!(resolve(template, Some("a"), 100).as_deref(), Some("missing"));
    }

    #[test]
    fn conditional_argument_is_not_left_over_from_earlier_substitution() {
        let template = "$(if:$(1),'$(echo;1:arg)') $(if:$(echo;2:arg),'two','none')";
        assert_eq!(resolve(template, Some("a"), 100).as_deref(), Some("a none"));
        assert_eq!(resolve(template, Some("a b"), 100).as_deref(), Some("a two"));
    }

    #[test]
    fn conditional_without_branches_is_ignored() {
        let variables = test_variables();
        assert!(named_substitutions("$(if:$(1))", &variables).is_empty());
    }

    #[test]
    fn truthiness_follows_value_kind() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!(1.5)));
        assert!(is_truthy(&json!("x")));
        assert_eq!(value_text(&json!("plain")), "plain");
        assert_eq!(value_text(&json!(42)), "42");
    }
}
