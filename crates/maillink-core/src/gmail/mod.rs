//! Gmail API metadata model and endpoints.

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

/// Default Gmail API root.
pub const DEFAULT_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/";

/// The header that identifies a message across mailboxes.
pub const MESSAGE_ID_HEADER: &str = "Message-ID";

/// A message fetched with `format=metadata`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    /// Gmail message id.
    #[serde(default)]
    pub id: String,
    /// Gmail thread id.
    #[serde(default)]
    pub thread_id: String,
    /// Top-level part; only its headers are populated in metadata format.
    #[serde(default)]
    pub payload: Option<MessagePart>,
}

/// A MIME part as returned by the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePart {
    /// Headers, in message order.
    #[serde(default)]
    pub headers: Vec<Header>,
}

/// One header line.
#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    /// Header name, in whatever case the sender used.
    pub name: String,
    /// Raw header value.
    pub value: String,
}

impl MessageMetadata {
    /// Looks a header up by name, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// A thread fetched with `format=metadata`.
///
/// The API omits `messages` entirely for a thread with nothing in it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadMetadata {
    /// Gmail thread id.
    #[serde(default)]
    pub id: String,
    /// Messages, oldest first.
    #[serde(default)]
    pub messages: Vec<MessageMetadata>,
}

impl ThreadMetadata {
    /// The most recent message.
    ///
    /// # Errors
    ///
    /// Returns `EmptyThread` if the thread has no messages.
    pub fn last_message(&self) -> Result<&MessageMetadata> {
        self.messages.last().ok_or(Error::EmptyThread)
    }
}

/// Builds the two metadata URLs relative to an API root.
#[derive(Debug, Clone)]
pub struct GmailEndpoints {
    base: Url,
}

impl GmailEndpoints {
    /// Creates endpoints under `base` (e.g. `https://gmail.googleapis.com/gmail/v1/`).
    ///
    /// # Errors
    ///
    /// Returns an error if `base` is not a valid hierarchical URL.
    pub fn new(base: impl AsRef<str>) -> Result<Self> {
        let base = Url::parse(base.as_ref())?;
        if base.cannot_be_a_base() {
            return Err(Error::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        Ok(Self { base })
    }

    /// `users/me/messages/{id}?format=metadata&metadataHeaders=Message-ID`
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty.
    pub fn message_metadata(&self, message_id: &str) -> Result<Url> {
        self.metadata_url("messages", message_id)
    }

    /// `users/me/threads/{id}?format=metadata&metadataHeaders=Message-ID`
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty.
    pub fn thread_metadata(&self, thread_id: &str) -> Result<Url> {
        self.metadata_url("threads", thread_id)
    }

    fn metadata_url(&self, collection: &str, id: &str) -> Result<Url> {
        if id.is_empty() {
            return Err(Error::InvalidRequest(format!("empty {collection} id")));
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(["users", "me", collection, id]);
        url.query_pairs_mut()
            .append_pair("format", "metadata")
            .append_pair("metadataHeaders", MESSAGE_ID_HEADER);
        Ok(url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_metadata_url() {
        let url = GmailEndpoints::new(DEFAULT_API_BASE)
            .unwrap()
            .message_metadata("18c2f0a1b")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://gmail.googleapis.com/gmail/v1/users/me/messages/18c2f0a1b?format=metadata&metadataHeaders=Message-ID"
        );
    }

    #[test]
    fn test_thread_url_encodes_id_and_tolerates_missing_slash() {
        let endpoints = GmailEndpoints::new("http://127.0.0.1:9000/gmail/v1").unwrap();
        let url = endpoints.thread_metadata("a/b").unwrap();
        assert_eq!(url.path(), "/gmail/v1/users/me/threads/a%2Fb");
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(matches!(
            GmailEndpoints::new(DEFAULT_API_BASE).unwrap().message_metadata(""),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let json = r#"{
            "id": "m1",
            "threadId": "t1",
            "payload": {"headers": [
                {"name": "Subject", "value": "hi"},
                {"name": "Message-Id", "value": "<a@b>"}
            ]}
        }"#;
        let message: MessageMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(message.thread_id, "t1");
        assert_eq!(message.header("MESSAGE-ID"), Some("<a@b>"));
        assert_eq!(message.header("From"), None);
    }

    #[test]
    fn test_thread_without_messages_field() {
        let thread: ThreadMetadata = serde_json::from_str(r#"{"id": "t1"}"#).unwrap();
        assert!(matches!(thread.last_message(), Err(Error::EmptyThread)));
    }

    #[test]
    fn test_thread_last_message() {
        let json = r#"{"id": "t1", "messages": [{"id": "m1"}, {"id": "m2"}]}"#;
        let thread: ThreadMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(thread.last_message().unwrap().id, "m2");
    }
}
