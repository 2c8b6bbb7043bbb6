//! Authorization server endpoints.

use crate::error::{Error, Result};
use url::Url;

/// Scope sufficient for `format=metadata` message and thread lookups.
pub const GMAIL_METADATA_SCOPE: &str = "https://www.googleapis.com/auth/gmail.metadata";

/// `OAuth2` provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Provider name (e.g., "Google").
    pub name: String,
    /// Authorization endpoint URL.
    pub auth_url: Url,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Scopes requested on the consent screen.
    pub scopes: Vec<String>,
    /// Extra query parameters appended to the authorization URL.
    pub extra_auth_params: Vec<(String, String)>,
}

impl Provider {
    /// Creates a provider from its two endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if either URL is invalid.
    pub fn new(
        name: impl Into<String>,
        auth_url: impl AsRef<str>,
        token_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            auth_url: Url::parse(auth_url.as_ref())?,
            token_url: Url::parse(token_url.as_ref())?,
            scopes: Vec::new(),
            extra_auth_params: Vec::new(),
        })
    }

    /// Sets the requested scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Adds a provider-specific authorization parameter.
    #[must_use]
    pub fn with_auth_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_auth_params.push((key.into(), value.into()));
        self
    }

    /// Google, scoped to Gmail metadata.
    ///
    /// `access_type=offline` makes the first exchange return a refresh token,
    /// which is what later silent acquisitions run on.
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn google() -> Result<Self> {
        Ok(Self::new(
            "Google",
            "https://accounts.google.com/o/oauth2/v2/auth",
            "https://oauth2.googleapis.com/token",
        )?
        .with_scopes(vec![GMAIL_METADATA_SCOPE.to_string()])
        .with_auth_param("access_type", "offline")
        .with_auth_param("prompt", "consent"))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no scope is configured or an endpoint is not HTTP(S).
    pub fn validate(&self) -> Result<()> {
        if self.scopes.is_empty() {
            return Err(Error::InvalidConfig(format!("{} has no scopes", self.name)));
        }
        for url in [&self.auth_url, &self.token_url] {
            if !matches!(url.scheme(), "https" | "http") {
                return Err(Error::InvalidConfig(format!("unsupported endpoint {url}")));
            }
        }
        Ok(())
    }
}
