//! The request/response contract between the page side and the resolver.
//!
//! ```text
//! { "type": "getDeepLinkForMessage",    "gmailMessageId": "<id>" }
//! { "type": "getDeepLinkForThreadLast", "threadId": "<id>" }
//! { "ok": true,  "url": "<link>" }
//! { "ok": false, "error": "<text>" }
//! ```
//!
//! Every failure becomes an `ok: false` response; nothing is raised across
//! the boundary.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use maillink_oauth::IdentityProvider;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::resolver::Resolver;
use crate::transport::HttpTransport;

const MESSAGE_TYPE: &str = "getDeepLinkForMessage";
const THREAD_LAST_TYPE: &str = "getDeepLinkForThreadLast";

/// A link request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Link to one message.
    #[serde(rename = "getDeepLinkForMessage")]
    Message {
        /// Gmail message id.
        #[serde(rename = "gmailMessageId")]
        gmail_message_id: String,
    },
    /// Link to the newest message of a thread.
    #[serde(rename = "getDeepLinkForThreadLast")]
    ThreadLast {
        /// Gmail thread id.
        #[serde(rename = "threadId")]
        thread_id: String,
    },
}

impl Request {
    /// Parses a request, telling an unknown `type` apart from a malformed one.
    ///
    /// # Errors
    ///
    /// `UnknownRequestType` if `type` is missing or unrecognized,
    /// `InvalidRequest` if a known type lacks its id field.
    pub fn from_value(value: Value) -> Result<Self> {
        match value.get("type").and_then(Value::as_str) {
            Some(MESSAGE_TYPE | THREAD_LAST_TYPE) => {
                serde_json::from_value(value).map_err(|e| Error::InvalidRequest(e.to_string()))
            }
            _ => Err(Error::UnknownRequestType),
        }
    }
}

/// Outcome of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Whether `url` is set.
    pub ok: bool,
    /// The link, on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// What went wrong, on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// A successful response.
    #[must_use]
    pub fn success(url: impl Into<String>) -> Self {
        Self {
            ok: true,
            url: Some(url.into()),
            error: None,
        }
    }

    /// A failed response.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            url: None,
            error: Some(error.into()),
        }
    }

    /// The link, or the error text. An `ok` response without a URL counts as
    /// a failure.
    ///
    /// # Errors
    ///
    /// Returns the error text when the response is not a usable success.
    pub fn into_result(self) -> std::result::Result<String, String> {
        match (self.ok, self.url) {
            (true, Some(url)) => Ok(url),
            (true, None) => Err("response carried no url".to_string()),
            (false, _) => Err(self.error.unwrap_or_else(|| "unknown error".to_string())),
        }
    }
}

/// Anything that answers link requests.
pub trait LinkService: Send + Sync {
    /// Answers one request. Never fails; failures are `ok: false`.
    fn resolve(&self, request: Request) -> impl Future<Output = Response> + Send;

    /// Parses a raw JSON request and answers it.
    fn resolve_value(&self, value: Value) -> impl Future<Output = Response> + Send {
        async move {
            match Request::from_value(value) {
                Ok(request) => self.resolve(request).await,
                Err(e) => Response::failure(e.to_string()),
            }
        }
    }
}

impl<I, H, C> LinkService for Resolver<I, H, C>
where
    I: IdentityProvider,
    H: HttpTransport,
    C: Clock,
{
    async fn resolve(&self, request: Request) -> Response {
        let result = match &request {
            Request::Message { gmail_message_id } => {
                self.resolve_message_link(gmail_message_id).await
            }
            Request::ThreadLast { thread_id } => self.resolve_thread_last_link(thread_id).await,
        };

        match result {
            Ok(url) => {
                info!(?request, "deep link resolved");
                Response::success(url)
            }
            Err(e) => {
                warn!(?request, error = %e, "deep link resolution failed");
                Response::failure(e.to_string())
            }
        }
    }
}

impl<S: LinkService> LinkService for Arc<S> {
    fn resolve(&self, request: Request) -> impl Future<Output = Response> + Send {
        (**self).resolve(request)
    }
}

/// A request in flight across the channel, with its reply slot.
#[derive(Debug)]
pub struct Envelope {
    /// The request.
    pub request: Request,
    /// Where the single response goes.
    pub reply: oneshot::Sender<Response>,
}

/// Page-side handle that talks to a resolver over a channel.
#[derive(Debug, Clone)]
pub struct ChannelService {
    tx: mpsc::Sender<Envelope>,
}

impl ChannelService {
    /// Creates a connected handle and the receiving end for [`serve`].
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl LinkService for ChannelService {
    async fn resolve(&self, request: Request) -> Response {
        let (reply, response) = oneshot::channel();
        if self.tx.send(Envelope { request, reply }).await.is_err() {
            return Response::failure("resolver is not running");
        }
        response
            .await
            .unwrap_or_else(|_| Response::failure("resolver dropped the request"))
    }
}

/// Answers envelopes until every [`ChannelService`] handle is dropped.
///
/// Each request runs on its own task, so a slow lookup does not hold up the
/// ones behind it.
pub async fn serve<S>(service: Arc<S>, mut rx: mpsc::Receiver<Envelope>)
where
    S: LinkService + 'static,
{
    while let Some(Envelope { request, reply }) = rx.recv().await {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            let response = service.resolve(request).await;
            // The requester may have gone away; the work is done regardless.
            let _ = reply.send(response);
        });
    }
}
