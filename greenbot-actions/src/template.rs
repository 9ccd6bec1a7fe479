//! Lexer for the `$(...)` placeholder grammar.
//!
//! Named and conditional placeholders look like
//! `$(path[;N][:key][|filter[(arg)]]*[,'true'[,'false']])`, positional ones
//! like `$(N)`. Text matching either form is always a placeholder; there is
//! no escape syntax.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::filter::SubstitutionFilter;

static ARGUMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\(([0-9]+)\)").expect("argument pattern compilation failed")
});

static PLACEHOLDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\$\((?P<path>[a-z_]+)",
        r"(?P<argument>;[0-9]+)?",
        r"(?P<key>:[\w./ -]+|:\$\([\w:;./ -]+\))?",
        r"(?P<filters>(?:\|\w+(?:\([\w%:/ +-]+\))?)*)",
        r#"(?P<branches>(?:,['"][\w |$;:().-]+['"]){0,2})\)"#,
    ))
    .expect("placeholder pattern compilation failed")
});

static FILTER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\|(?P<name>\w+)(?:\((?P<argument>[\w%:/ +-]+)\))?")
        .expect("filter pattern compilation failed")
});

static BRANCH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#",['"](?P<body>[\w |$;:().-]+)['"]"#).expect("branch pattern compilation failed")
});

/// One named or conditional placeholder occurrence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placeholder {
    /// Exact matched text, used for replacement.
    pub needle: String,
    /// Variable family, e.g. `if` or `source`.
    pub path: String,
    /// 1-based positional argument from `;N`.
    pub argument: Option<usize>,
    /// Text after `:`, either a literal or one nested placeholder.
    pub key: Option<String>,
    pub filters: Vec<SubstitutionFilter>,
    /// Quoted branch bodies, quotes stripped.
    pub branches: Vec<String>,
}

/// One positional `$(N)` occurrence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentPlaceholder {
    pub needle: String,
    pub argument: usize,
}

/// Scan `text` for named and conditional placeholders, in order of appearance.
pub fn scan_placeholders(text: &str) -> impl Iterator<Item = Placeholder> + '_ {
    PLACEHOLDER_PATTERN
        .captures_iter(text)
        .map(|captures| placeholder_from_captures(&captures))
}

/// Scan `text` for positional placeholders, in order of appearance.
///
/// Numbers too large for `usize` are skipped.
pub fn scan_arguments(text: &str) -> impl Iterator<Item = ArgumentPlaceholder> + '_ {
    ARGUMENT_PATTERN.captures_iter(text).filter_map(|captures| {
        let argument = captures[1].parse::<usize>().ok()?;
        Some(ArgumentPlaceholder {
            needle: captures[0].to_owned(),
            argument,
        })
    })
}

fn placeholder_from_captures(captures: &Captures<'_>) -> Placeholder {
    let argument = captures
        .name("argument")
        .and_then(|found| found.as_str()[1..].parse::<usize>().ok());
    let key = captures
        .name("key")
        .map(|found| found.as_str()[1..].to_owned());
    let filters = captures
        .name("filters")
        .map(|found| parse_filters(found.as_str()))
        .unwrap_or_default();
    let branches = captures
        .name("branches")
        .map(|found| {
            BRANCH_PATTERN
                .captures_iter(found.as_str())
                .map(|branch| branch["body"].to_owned())
                .collect()
        })
        .unwrap_or_default();

    Placeholder {
        needle: captures[0].to_owned(),
        path: captures["path"].to_owned(),
        argument,
        key,
        filters,
        branches,
    }
}

fn parse_filters(raw: &str) -> Vec<SubstitutionFilter> {
    FILTER_PATTERN
        .captures_iter(raw)
        .map(|filter| SubstitutionFilter {
            name: filter["name"].to_owned(),
            argument: filter.name("argument").map(|found| found.as_str().to_owned()),
        })
        .collect()
}
