use std::collections::HashMap;

use serde_json::Value;
use tracing::error;

use crate::host::ActionHost;

/// A named value transform with at most one argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubstitutionFilter {
    pub name: String,
    pub argument: Option<String>,
}

/// Filter implementation. `Ok(None)` means "no value" and aborts the response.
pub type FilterFn = fn(Value, Option<&str>) -> anyhow::Result<Option<Value>>;

/// Static name to implementation mapping, populated at startup.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<&'static str, FilterFn>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter, replacing any previous one with the same name.
    pub fn with(mut self, name: &'static str, filter: FilterFn) -> Self {
        self.filters.insert(name, filter);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Apply `filter` to `value`. Unknown filter names pass the value through.
    pub fn apply(&self, value: Value, filter: &SubstitutionFilter) -> anyhow::Result<Option<Value>> {
        match self.filters.get(filter.name.as_str()) {
            Some(apply) => apply(value, filter.argument.as_deref()),
            None => Ok(Some(value)),
        }
    }
}

/// Run `filters` over `value` in declared order.
///
/// A failing filter is logged and stops the pipeline; the last good value is
/// kept. `None` from any filter aborts.
pub fn apply_filters(
    host: &dyn ActionHost,
    value: Value,
    filters: &[SubstitutionFilter],
) -> Option<Value> {
    let mut current = value;

    for filter in filters {
        match host.apply_filter(current.clone(), filter) {
            Ok(Some(next)) => current = next,
            Ok(None) => return None,
            Err(source) => {
                error!(?source, filter = %filter.name, "exception caught in filter application");
                break;
            }
        }
    }

    Some(current)
}
