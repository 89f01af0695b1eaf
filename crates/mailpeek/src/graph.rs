//! Microsoft Graph mail listing.
//!
//! One authenticated GET against `/v1.0/me/messages`, selecting just the
//! fields the console output needs. The response mapping is deliberately
//! lenient: Graph treats most message fields as optional, so a missing
//! subject or sender becomes an empty string instead of failing the run.

use mailpeek_oauth::Token;
use serde::Deserialize;
use tracing::debug;

/// Longest error-body snippet carried in a [`FetchError::Status`].
const ERROR_BODY_LIMIT: usize = 512;

/// Fields requested from Graph via `$select`.
const SELECT_FIELDS: &str = "subject,from,receivedDateTime,bodyPreview";

/// Mail fetch failure. Never retried; the run ends after printing it.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Graph answered with a non-2xx status.
    #[error("request failed with status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: reqwest::StatusCode,
        /// Snippet of the response body, for diagnostics.
        body: String,
    },

    /// The response body was not the expected JSON shape.
    #[error("unexpected response payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read-only projection of one remote mail item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    /// Sender address; empty when Graph omits it.
    pub sender: String,
    /// Subject line; empty when absent.
    pub subject: String,
    /// Received timestamp as Graph reports it (ISO 8601).
    pub received: String,
    /// Short plain-text body preview.
    pub preview: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    value: Vec<GraphMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphMessage {
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    received_date_time: Option<String>,
    #[serde(default)]
    body_preview: Option<String>,
    #[serde(default)]
    from: Option<Recipient>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Recipient {
    #[serde(default)]
    email_address: Option<EmailAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct EmailAddress {
    #[serde(default)]
    address: Option<String>,
}

impl From<GraphMessage> for MessageSummary {
    fn from(message: GraphMessage) -> Self {
        let sender = message
            .from
            .and_then(|f| f.email_address)
            .and_then(|e| e.address)
            .unwrap_or_default();

        Self {
            sender,
            subject: message.subject.unwrap_or_default(),
            received: message.received_date_time.unwrap_or_default(),
            preview: message.body_preview.unwrap_or_default(),
        }
    }
}

/// Parses a Graph message-list body into summaries.
///
/// A missing `value` array means an empty mailbox page, not an error.
///
/// # Errors
///
/// Returns an error only when the top-level body is not valid JSON of the
/// expected shape.
pub fn parse_message_list(body: &str) -> Result<Vec<MessageSummary>, FetchError> {
    let list: MessageList = serde_json::from_str(body)?;
    Ok(list.value.into_iter().map(Into::into).collect())
}

/// Thin client for the Graph mail endpoint.
#[derive(Debug, Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
}

impl GraphClient {
    /// Creates a client against the given Graph host.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Fetches the `count` most recently received messages.
    ///
    /// Single request/response exchange; no pagination follow-up and no
    /// retries.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, a non-2xx status, or a
    /// malformed top-level response body.
    pub async fn fetch_recent(
        &self,
        token: &Token,
        count: u32,
    ) -> Result<Vec<MessageSummary>, FetchError> {
        // Literal $ and pre-encoded space keep the query exactly as Graph
        // documents it.
        let url = format!(
            "{}/v1.0/me/messages?$top={count}&$orderby=receivedDateTime%20desc&$select={SELECT_FIELDS}",
            self.base_url
        );

        debug!("fetching up to {count} messages");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status,
                body: snippet(&body),
            });
        }

        let body = response.text().await?;
        let messages = parse_message_list(&body)?;
        debug!("received {} messages", messages.len());
        Ok(messages)
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_order() {
        let body = r#"{
            "value": [
                {"subject": "first", "receivedDateTime": "2026-08-23T10:00:00Z",
                 "bodyPreview": "one",
                 "from": {"emailAddress": {"address": "a@example.com", "name": "A"}}},
                {"subject": "second", "receivedDateTime": "2026-08-23T09:00:00Z",
                 "bodyPreview": "two",
                 "from": {"emailAddress": {"address": "b@example.com", "name": "B"}}},
                {"subject": "third", "receivedDateTime": "2026-08-23T08:00:00Z",
                 "bodyPreview": "three",
                 "from": {"emailAddress": {"address": "c@example.com", "name": "C"}}}
            ]
        }"#;

        let messages = parse_message_list(body).unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].subject, "first");
        assert_eq!(messages[1].subject, "second");
        assert_eq!(messages[2].subject, "third");
        assert_eq!(messages[0].sender, "a@example.com");
    }

    #[test]
    fn test_missing_sender_address_is_empty() {
        let body = r#"{
            "value": [
                {"subject": "no sender", "receivedDateTime": "2026-08-23T10:00:00Z",
                 "bodyPreview": "p", "from": {"emailAddress": {"name": "A"}}}
            ]
        }"#;

        let messages = parse_message_list(body).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, "");
        assert_eq!(messages[0].subject, "no sender");
    }

    #[test]
    fn test_missing_from_entirely() {
        let body = r#"{"value": [{"subject": "s"}]}"#;

        let messages = parse_message_list(body).unwrap();
        assert_eq!(messages[0].sender, "");
        assert_eq!(messages[0].received, "");
        assert_eq!(messages[0].preview, "");
    }

    #[test]
    fn test_missing_value_array_is_empty() {
        let messages = parse_message_list("{}").unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn test_malformed_body_is_an_error() {
        assert!(matches!(
            parse_message_list("not json"),
            Err(FetchError::Json(_))
        ));
    }

    #[test]
    fn test_snippet_bounds_long_bodies() {
        let long = "x".repeat(2000);
        let s = snippet(&long);
        assert!(s.len() <= ERROR_BODY_LIMIT + 3);
        assert!(s.ends_with("..."));

        assert_eq!(snippet("  short  "), "short");
    }
}
