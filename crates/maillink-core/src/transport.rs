//! HTTP GET seam between the fetch protocol and the network.

use std::future::Future;

use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use url::Url;

use crate::error::Result;

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body as text.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues authenticated GETs.
///
/// Only failures that leave no status behind are errors; a 401 or a 500 is a
/// successful exchange with an unsuccessful status.
pub trait HttpTransport: Send + Sync {
    /// GETs `url` with the given `Authorization` header value.
    fn get(&self, url: &Url, authorization: &str)
    -> impl Future<Output = Result<HttpResponse>> + Send;
}

/// [`HttpTransport`] over a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Wraps an existing client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url, authorization: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, authorization)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}
