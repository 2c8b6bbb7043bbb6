//! Authenticated fetch: bearer token, one re-authorization on 401.
//!
//! Per call:
//! 1. silent token, falling back to an interactive one;
//! 2. GET;
//! 3. on 401, invalidate that token, acquire interactively and GET once more;
//! 4. anything but 2xx now is `Api { status, body }`.
//!
//! So a call makes at most two requests, strictly one after the other.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use maillink_oauth::{AccessToken, IdentityProvider};

use crate::error::{Error, Result};
use crate::transport::HttpTransport;

const UNAUTHORIZED: u16 = 401;

/// GETs JSON from the read API on behalf of an identity.
pub struct AuthenticatedFetch<I, H> {
    identity: I,
    transport: H,
}

impl<I: IdentityProvider, H: HttpTransport> AuthenticatedFetch<I, H> {
    /// Creates a fetcher.
    #[must_use]
    pub const fn new(identity: I, transport: H) -> Self {
        Self {
            identity,
            transport,
        }
    }

    /// The identity tokens come from.
    #[must_use]
    pub const fn identity(&self) -> &I {
        &self.identity
    }

    /// The transport requests go through.
    #[must_use]
    pub const fn transport(&self) -> &H {
        &self.transport
    }

    /// GETs `url` and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// `TokenUnavailable` if no token can be had, `Api` on a non-2xx final
    /// status, `Transport` or `Decode` for network and body failures.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let token = self.initial_token().await?;
        let mut response = self.transport.get(url, &token.authorization()).await?;

        if response.status == UNAUTHORIZED {
            warn!(path = url.path(), "access token rejected, re-authorizing");
            self.identity.invalidate(&token).await;
            let token = self
                .identity
                .acquire(true)
                .await
                .map_err(Error::TokenUnavailable)?;
            response = self.transport.get(url, &token.authorization()).await?;
        }

        if !response.is_success() {
            return Err(Error::Api {
                status: response.status,
                body: response.body,
            });
        }

        Ok(serde_json::from_str(&response.body)?)
    }

    async fn initial_token(&self) -> Result<AccessToken> {
        match self.identity.acquire(false).await {
            Ok(token) => Ok(token),
            Err(e) => {
                debug!(error = %e, "no silent token, asking interactively");
                self.identity
                    .acquire(true)
                    .await
                    .map_err(Error::TokenUnavailable)
            }
        }
    }
}
