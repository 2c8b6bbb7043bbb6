//! Identity provider: hands out bearer credentials for the read API.
//!
//! Callers never see the refresh token or the expiry bookkeeping. They ask
//! for a token (silently or with consent allowed) and report a rejected one
//! back through [`IdentityProvider::invalidate`].

use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::flow::{AuthorizationCodeFlow, LoopbackRedirect, OAuthClient};
use crate::token::Token;

/// How long the consent screen may stay open before we give up.
const DEFAULT_CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Opaque bearer credential.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw access token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for comparison by providers.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Source of bearer credentials.
pub trait IdentityProvider: Send + Sync {
    /// Obtains a token. With `interactive == false` the user is never
    /// prompted; with `true` a consent screen may be shown.
    fn acquire(&self, interactive: bool) -> impl Future<Output = Result<AccessToken>> + Send;

    /// Forgets a token the API rejected, so it is not handed out again.
    fn invalidate(&self, token: &AccessToken) -> impl Future<Output = ()> + Send;
}

/// Presents the consent URL to the user (browser, terminal, ...).
pub trait ConsentPrompt: Send + Sync {
    /// Shows `url`. Returning an error aborts the interactive acquisition.
    ///
    /// # Errors
    ///
    /// Implementation-defined; typically the browser could not be opened.
    fn present(&self, url: &Url) -> Result<()>;
}

impl<F> ConsentPrompt for F
where
    F: Fn(&Url) -> Result<()> + Send + Sync,
{
    fn present(&self, url: &Url) -> Result<()> {
        self(url)
    }
}

/// In-memory `OAuth2` identity: cached token set, silent refresh, consent via
/// loopback redirect.
pub struct OAuthIdentity<P> {
    client: OAuthClient,
    prompt: P,
    consent_timeout: Duration,
    cached: Mutex<Option<Token>>,
}

impl<P: ConsentPrompt> OAuthIdentity<P> {
    /// Creates an identity with nothing cached.
    #[must_use]
    pub fn new(client: OAuthClient, prompt: P) -> Self {
        Self {
            client,
            prompt,
            consent_timeout: DEFAULT_CONSENT_TIMEOUT,
            cached: Mutex::new(None),
        }
    }

    /// Sets how long to wait for the consent redirect.
    #[must_use]
    pub const fn with_consent_timeout(mut self, timeout: Duration) -> Self {
        self.consent_timeout = timeout;
        self
    }

    /// Seeds the cache, e.g. with a token set obtained out of band.
    pub async fn seed(&self, token: Token) {
        *self.cached.lock().await = Some(token);
    }

    async fn acquire_silently(&self) -> Result<AccessToken> {
        let mut cached = self.cached.lock().await;
        let Some(token) = cached.as_ref() else {
            return Err(Error::NoCachedToken);
        };

        if !token.is_expired_at(Utc::now()) {
            debug!("using cached access token");
            return Ok(AccessToken::new(token.access_token.clone()));
        }

        if token.refresh_token.is_none() {
            *cached = None;
            return Err(Error::NoCachedToken);
        }

        match self.client.refresh_token(token).await {
            Ok(fresh) => {
                info!("refreshed access token");
                let access = AccessToken::new(fresh.access_token.clone());
                *cached = Some(fresh);
                Ok(access)
            }
            Err(e) => {
                warn!(error = %e, "silent refresh failed");
                *cached = None;
                Err(e)
            }
        }
    }

    async fn acquire_with_consent(&self) -> Result<AccessToken> {
        let redirect = LoopbackRedirect::bind().await?;
        let flow = AuthorizationCodeFlow::new(&self.client, redirect.redirect_uri());
        self.prompt.present(&flow.authorization_url()?)?;

        let code = redirect
            .receive_code(flow.state(), self.consent_timeout)
            .await?;
        let token = flow.exchange_code(&code).await?;
        info!("consent granted, access token issued");

        let access = AccessToken::new(token.access_token.clone());
        *self.cached.lock().await = Some(token);
        Ok(access)
    }
}

impl<P: ConsentPrompt> IdentityProvider for OAuthIdentity<P> {
    async fn acquire(&self, interactive: bool) -> Result<AccessToken> {
        if interactive {
            self.acquire_with_consent().await
        } else {
            self.acquire_silently().await
        }
    }

    async fn invalidate(&self, token: &AccessToken) {
        let mut cached = self.cached.lock().await;
        if cached
            .as_ref()
            .is_some_and(|t| t.access_token == token.secret())
        {
            debug!("dropping rejected access token");
            *cached = None;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::provider::Provider;
    use chrono::Duration as ChronoDuration;

    type NoBrowser = fn(&Url) -> Result<()>;

    fn no_browser(_: &Url) -> Result<()> {
        Err(Error::InvalidConfig("no browser".into()))
    }

    fn identity() -> OAuthIdentity<NoBrowser> {
        let client = OAuthClient::new("id", Provider::google().unwrap());
        OAuthIdentity::new(client, no_browser as NoBrowser)
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("ya29.secret");
        assert_eq!(format!("{token:?}"), "AccessToken(***)");
        assert_eq!(token.authorization(), "Bearer ya29.secret");
    }

    #[tokio::test]
    async fn test_silent_acquire_with_empty_cache() {
        let identity = identity();
        assert!(matches!(
            identity.acquire(false).await,
            Err(Error::NoCachedToken)
        ));
    }

    #[tokio::test]
    async fn test_silent_acquire_returns_cached_token() {
        let identity = identity();
        identity
            .seed(Token::bearer("ya29.live").with_expires_at(Utc::now() + ChronoDuration::hours(1)))
            .await;

        let token = identity.acquire(false).await.unwrap();
        assert_eq!(token.secret(), "ya29.live");
    }

    #[tokio::test]
    async fn test_expired_token_without_refresh_is_dropped() {
        let identity = identity();
        identity
            .seed(Token::bearer("old").with_expires_at(Utc::now() - ChronoDuration::hours(1)))
            .await;

        assert!(identity.acquire(false).await.is_err());
        assert!(identity.cached.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_only_matching_token() {
        let identity = identity();
        identity.seed(Token::bearer("current")).await;

        identity.invalidate(&AccessToken::new("other")).await;
        assert!(identity.acquire(false).await.is_ok());

        identity.invalidate(&AccessToken::new("current")).await;
        assert!(matches!(
            identity.acquire(false).await,
            Err(Error::NoCachedToken)
        ));
    }

    #[tokio::test]
    async fn test_interactive_acquire_aborts_when_prompt_fails() {
        let identity = identity();
        assert!(matches!(
            identity.acquire(true).await,
            Err(Error::InvalidConfig(_))
        ));
    }
}
