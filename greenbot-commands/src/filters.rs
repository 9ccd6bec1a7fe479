//! Filters available to `$(...|filter)` placeholders.

use anyhow::Context as _;
use serde_json::{Number, Value, json};

use greenbot_actions::FilterRegistry;
use greenbot_actions::substitution::{is_truthy, value_text};

/// The bot's filter set. Unknown names pass values through unchanged.
pub fn filter_registry() -> FilterRegistry {
    FilterRegistry::new()
        .with("lower", lower)
        .with("upper", upper)
        .with("title", title)
        .with("capitalize", capitalize)
        .with("swapcase", swapcase)
        .with("strip", strip)
        .with("urlencode", urlencode)
        .with("add", add)
        .with("subtract", subtract)
        .with("join", join)
        .with("default", default)
}

fn text_filter(value: &Value, map: impl FnOnce(&str) -> String) -> anyhow::Result<Option<Value>> {
    Ok(Some(Value::String(map(&value_text(value)))))
}

fn lower(value: Value, _argument: Option<&str>) -> anyhow::Result<Option<Value>> {
    text_filter(&value, str::to_lowercase)
}

fn upper(value: Value, _argument: Option<&str>) -> anyhow::Result<Option<Value>> {
    text_filter(&value, str::to_uppercase)
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn title(value: Value, _argument: Option<&str>) -> anyhow::Result<Option<Value>> {
    text_filter(&value, |text| {
        text.split(' ').map(capitalize_word).collect::<Vec<_>>().join(" ")
    })
}

fn capitalize(value: Value, _argument: Option<&str>) -> anyhow::Result<Option<Value>> {
    text_filter(&value, capitalize_word)
}

fn swapcase(value: Value, _argument: Option<&str>) -> anyhow::Result<Option<Value>> {
    text_filter(&value, |text| {
        text.chars()
            .flat_map(|c| {
                if c.is_uppercase() {
                    c.to_lowercase().collect::<Vec<_>>()
                } else {
                    c.to_uppercase().collect::<Vec<_>>()
                }
            })
            .collect()
    })
}

fn strip(value: Value, _argument: Option<&str>) -> anyhow::Result<Option<Value>> {
    text_filter(&value, |text| text.trim().to_owned())
}

fn urlencode(value: Value, _argument: Option<&str>) -> anyhow::Result<Option<Value>> {
    text_filter(&value, |text| urlencoding::encode(text).into_owned())
}

fn number_of(value: &Value) -> anyhow::Result<f64> {
    match value {
        Value::Number(number) => number.as_f64().context("number out of range"),
        other => value_text(other)
            .trim()
            .parse::<f64>()
            .with_context(|| format!("`{}` is not a number", value_text(other))),
    }
}

fn offset(value: &Value, argument: Option<&str>, sign: f64) -> anyhow::Result<Option<Value>> {
    let delta = argument
        .context("missing operand")?
        .trim()
        .parse::<f64>()
        .context("operand is not a number")?;
    let result = number_of(value)? + sign * delta;

    // Keep integers integral so `$(x|add(1))` renders `5`, not `5.0`.
    let rendered = if result.fract() == 0.0 && result.abs() < i64::MAX as f64 {
        json!(result as i64)
    } else {
        Value::Number(Number::from_f64(result).context("result is not finite")?)
    };

    Ok(Some(rendered))
}

fn add(value: Value, argument: Option<&str>) -> anyhow::Result<Option<Value>> {
    offset(&value, argument, 1.0)
}

fn subtract(value: Value, argument: Option<&str>) -> anyhow::Result<Option<Value>> {
    offset(&value, argument, -1.0)
}

fn join(value: Value, argument: Option<&str>) -> anyhow::Result<Option<Value>> {
    let separator = argument.unwrap_or(", ");
    match value {
        Value::Array(items) => {
            let joined = items.iter().map(value_text).collect::<Vec<_>>().join(separator);
            Ok(Some(Value::String(joined)))
        }
        other => Ok(Some(other)),
    }
}

fn default(value: Value, argument: Option<&str>) -> anyhow::Result<Option<Value>> {
    if is_truthy(&value) {
        return Ok(Some(value));
    }

    Ok(Some(Value::String(argument.unwrap_or_default().to_owned())))
}

#[cfg(test)]
mod tests {
    use greenbot_actions::SubstitutionFilter;

    use super::*;

    fn apply(value: Value, name: &str, argument: Option<&str>) -> anyhow::Result<Option<Value>> {
        filter_registry().apply(
            value,
            &SubstitutionFilter {
                name: name.to_owned(),
                argument: argument.map(ToOwned::to_owned),
            },
        )
    }

    #[test]
    fn text_filters() {
        assert_eq!(apply(json!("MiXeD"), "lower", None).unwrap(), Some(json!("mixed")));
        assert_eq!(apply(json!("hello world"), "title", None).unwrap(), Some(json!("Hello World")));
        assert_eq!(apply(json!("hELLO"), "capitalize", None).unwrap(), Some(json!("Hello")));
        assert_eq!(apply(json!("aBc"), "swapcase", None).unwrap(), Some(json!("AbC")));
        assert_eq!(apply(json!("  pad "), "strip", None).unwrap(), Some(json!("pad")));
        assert_eq!(apply(json!("a b&c"), "urlencode", None).unwrap(), Some(json!("a%20b%26c")));
    }

    #[test]
    fn arithmetic_filters() {
        assert_eq!(apply(json!(4), "add", Some("1")).unwrap(), Some(json!(5)));
        assert_eq!(apply(json!("10"), "subtract", Some("2.5")).unwrap(), Some(json!(7.5)));
        assert!(apply(json!("ten"), "add", Some("1")).is_err());
        assert!(apply(json!(1), "add", None).is_err());
    }

    #[test]
    fn join_and_default() {
        assert_eq!(
            apply(json!(["a", 1, "b"]), "join", Some("-")).unwrap(),
            Some(json!("a-1-b"))
        );
        assert_eq!(apply(json!(""), "default", Some("nobody")).unwrap(), Some(json!("nobody")));
        assert_eq!(apply(json!("x"), "default", Some("nobody")).unwrap(), Some(json!("x")));
    }

    #[test]
    fn registers_every_filter() {
        let registry = filter_registry();
        for name in [
            "lower", "upper", "title", "capitalize", "swapcase", "strip", "urlencode", "add",
            "subtract", "join", "default",
        ] {
            assert!(registry.contains(name), "missing filter {name}");
        }
        assert!(!registry.contains("nope"));
    }

    #[test]
    fn unknown_filter_passes_through() {
        assert_eq!(apply(json!("same"), "nope", None).unwrap(), Some(json!("same")));
    }
}
