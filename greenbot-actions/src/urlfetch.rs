//! `$(urlfetch URL)` resolution and its injection guard.
//!
//! The number of fetch placeholders in a template is recorded when the
//! action is built. Resolved text carrying more than that many is rejected,
//! so a substituted value can never add fetches of its own.

use std::{sync::LazyLock, time::Duration};

use regex::Regex;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use tracing::{error, warn};
use twilight_model::id::{
    Id,
    marker::{ChannelMarker, UserMarker},
};

use crate::error::FetchError;
use crate::host::ActionHost;

/// Upper bound on a single outbound fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Characters kept from a fetched body.
pub const MAX_FETCH_CHARS: usize = 400;

// RFC 3986 URL characters only.
static FETCH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\$\(urlfetch ([A-Za-z0-9\-._~:/?#\[\]@!$%&'()*+,;=]+)\)"#)
        .expect("urlfetch pattern compilation failed")
});

static ANY_FETCH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\(urlfetch (.+?)\)").expect("urlfetch detection pattern compilation failed")
});

/// Count every `$(urlfetch ...)` occurrence, duplicates included.
pub fn count_fetch_placeholders(text: &str) -> usize {
    ANY_FETCH_PATTERN.find_iter(text).count()
}

/// Distinct resolvable `(needle, url)` pairs, in order of appearance.
fn fetch_placeholders(text: &str) -> Vec<(String, String)> {
    let mut found: Vec<(String, String)> = Vec::new();

    for captures in FETCH_PATTERN.captures_iter(text) {
        let needle = &captures[0];
        if found.iter().any(|(seen, _)| seen == needle) {
            continue;
        }

        found.push((needle.to_owned(), captures[1].to_owned()));
    }

    found
}

/// Trim a fetched body, drop line breaks, keep the first [`MAX_FETCH_CHARS`].
pub fn clean_fetch_body(body: &str) -> String {
    body.trim()
        .chars()
        .filter(|c| !matches!(c, '\n' | '\r'))
        .take(MAX_FETCH_CHARS)
        .collect()
}

/// Where a resolved message ends up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Channel(Id<ChannelMarker>),
    Private(Id<UserMarker>),
}

impl Delivery {
    pub fn send(self, host: &dyn ActionHost, text: &str) -> bool {
        match self {
            Self::Channel(channel_id) => host.say(channel_id, text),
            Self::Private(user_id) => host.private_message(user_id, text),
        }
    }
}

/// Deferred "resolve fetches, then deliver" job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTask {
    pub delivery: Delivery,
    /// Fully substituted text, fetch placeholders still in place.
    pub message: String,
    /// Fetch count of the template the message came from.
    pub ceiling: usize,
}

impl FetchTask {
    /// Resolve and deliver. Any failure drops the message.
    pub async fn execute(self, fetcher: &UrlFetcher, host: &dyn ActionHost) -> bool {
        match fetcher.resolve_fetches(&self.message, self.ceiling).await {
            Ok(text) => self.delivery.send(host, &text),
            Err(FetchError::Hijack { found, ceiling }) => {
                error!(found, ceiling, message = %self.message, "HIJACK ATTEMPT: urlfetch message rejected");
                false
            }
            Err(source) => {
                warn!(?source, "urlfetch failed, message dropped");
                false
            }
        }
    }
}

/// HTTP client with the fixed header set used for fetch placeholders.
#[derive(Clone, Debug)]
pub struct UrlFetcher {
    client: reqwest::Client,
}

impl UrlFetcher {
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/plain"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US, en;q=0.9, *;q=0.5"),
        );

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(FETCH_TIMEOUT)
            .build()?;

        Ok(Self { client })
    }

    /// Replace every fetch placeholder in `text` with its fetched body.
    ///
    /// Fails without touching the network when `text` holds more fetch
    /// placeholders than `ceiling`.
    pub async fn resolve_fetches(&self, text: &str, ceiling: usize) -> Result<String, FetchError> {
        let found = count_fetch_placeholders(text);
        if found > ceiling {
            return Err(FetchError::Hijack { found, ceiling });
        }

        let mut resolved = text.to_owned();
        for (needle, url) in fetch_placeholders(text) {
            let value = self.fetch(&url).await?;
            resolved = resolved.replace(&needle, &value);
        }

        Ok(resolved)
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(clean_fetch_body(&body))
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt as _, AsyncWriteExt as _},
        net::TcpListener,
    };

    use super::*;
    use crate::testing::RecordingHost;

    /// Answer a single HTTP request on a local port and return its base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buffer = [0_u8; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                let read = stream.read(&mut buffer).await.unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buffer[..read]);
            }

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });

        format!("http://{address}")
    }

    fn channel_task(message: String) -> FetchTask {
        FetchTask {
            delivery: Delivery::Channel(Id::new(1)),
            message,
            ceiling: 1,
        }
    }

    #[test]
    fn counts_every_occurrence() {
        let text = "$(urlfetch https://a.example/x) $(urlfetch https://a.example/x) $(urlfetch not a url)";
        assert_eq!(count_fetch_placeholders(text), 3);
        assert_eq!(count_fetch_placeholders("no fetches here"), 0);
    }

    #[test]
    fn resolvable_placeholders_are_distinct() {
        let text = "$(urlfetch https://a.example/x) $(urlfetch https://a.example/x) $(urlfetch https://b.example/?q=1)";
        let found = fetch_placeholders(text);
        assert_eq!(
            found,
            vec![
                (
                    "$(urlfetch https://a.example/x)".to_owned(),
                    "https://a.example/x".to_owned()
                ),
                (
                    "$(urlfetch https://b.example/?q=1)".to_owned(),
                    "https://b.example/?q=1".to_owned()
                ),
            ]
        );
    }

    #[test]
    fn fetched_bodies_are_flattened_and_truncated() {
        assert_eq!(clean_fetch_body("  line one\nline two\r\n "), "line oneline two");
        assert_eq!(clean_fetch_body(&"é".repeat(500)).chars().count(), MAX_FETCH_CHARS);
    }

    #[tokio::test]
    async fn extra_fetches_are_rejected_before_any_request() {
        let fetcher = UrlFetcher::new("greenbot-test").unwrap();
        let result = fetcher
            .resolve_fetches("$(urlfetch http://127.0.0.1:9/a) $(urlfetch http://127.0.0.1:9/b)", 1)
            .await;
        assert!(matches!(result, Err(FetchError::Hijack { found: 2, ceiling: 1 })));
    }

    #[tokio::test]
    async fn hijacked_task_never_delivers() {
        let fetcher = UrlFetcher::new("greenbot-test").unwrap();
        let host = RecordingHost::default();
        let task = FetchTask {
            delivery: Delivery::Channel(Id::new(1)),
            message: "$(urlfetch http://127.0.0.1:9/evil)".to_owned(),
            ceiling: 0,
        };

        assert!(!task.execute(&fetcher, &host).await);
        assert!(host.said().is_empty());
    }

    #[tokio::test]
    async fn unreachable_fetch_drops_message() {
        let fetcher = UrlFetcher::new("greenbot-test").unwrap();
        let host = RecordingHost::default();
        let task = channel_task("$(urlfetch http://127.0.0.1:9/x)".to_owned());

        assert!(!task.execute(&fetcher, &host).await);
        assert!(host.said().is_empty());
    }

    #[tokio::test]
    async fn error_status_drops_message() {
        let base = serve_once("404 Not Found", "missing").await;
        let fetcher = UrlFetcher::new("greenbot-test").unwrap();
        let host = RecordingHost::default();
        let task = channel_task(format!("got $(urlfetch {base}/quote)"));

        assert!(!task.execute(&fetcher, &host).await);
        assert!(host.said().is_empty());
    }

    #[tokio::test]
    async fn fetched_body_replaces_placeholder() {
        let base = serve_once("200 OK", "  sunny\r\nand warm \n").await;
        let fetcher = UrlFetcher::new("greenbot-test").unwrap();
        let host = RecordingHost::default();
        let task = channel_task(format!("weather: $(urlfetch {base}/today)"));

        assert!(task.execute(&fetcher, &host).await);
        assert_eq!(
            host.said(),
            vec![(Id::new(1), "weather: sunnyand warm".to_owned())]
        );
    }

    #[tokio::test]
    async fn text_without_fetches_passes_through() {
        let fetcher = UrlFetcher::new("greenbot-test").unwrap();
        let resolved = fetcher.resolve_fetches("plain text", 1).await.unwrap();
        assert_eq!(resolved, "plain text");
    }
}
