use thiserror::Error;

/// Failure to turn a declarative description into an [`Action`](crate::Action).
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid action description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown action type `{0}`")]
    UnknownActionType(String),

    #[error("action type `{kind}` is missing field `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
}

/// Failure while resolving `urlfetch` placeholders before delivery.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("urlfetch hijack attempt: {found} fetches found, {ceiling} allowed")]
    Hijack { found: usize, ceiling: usize },

    #[error("urlfetch request failed: {0}")]
    Request(#[from] reqwest::Error),
}
