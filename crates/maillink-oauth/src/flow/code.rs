//! Authorization Code Flow with PKCE.

use super::pkce::METHOD_S256;
use super::{OAuthClient, PkceChallenge};
use crate::error::Result;
use crate::token::Token;
use rand::Rng;
use rand::distributions::Alphanumeric;
use url::Url;

/// One consent attempt: the URL the user visits and the exchange that follows.
///
/// PKCE and the anti-forgery `state` are generated per attempt and never
/// reused.
#[derive(Debug)]
pub struct AuthorizationCodeFlow<'a> {
    client: &'a OAuthClient,
    redirect_uri: String,
    pkce: PkceChallenge,
    state: String,
}

impl<'a> AuthorizationCodeFlow<'a> {
    /// Starts a consent attempt that redirects back to `redirect_uri`.
    #[must_use]
    pub fn new(client: &'a OAuthClient, redirect_uri: impl Into<String>) -> Self {
        let state = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        Self {
            client,
            redirect_uri: redirect_uri.into(),
            pkce: PkceChallenge::generate(),
            state,
        }
    }

    /// The anti-forgery value the redirect must echo back.
    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Builds the consent screen URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider configuration is invalid.
    pub fn authorization_url(&self) -> Result<Url> {
        let provider = &self.client.provider;
        provider.validate()?;

        let mut url = provider.auth_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("client_id", &self.client.client_id)
                .append_pair("response_type", "code")
                .append_pair("redirect_uri", &self.redirect_uri)
                .append_pair("scope", &provider.scopes.join(" "))
                .append_pair("state", &self.state)
                .append_pair("code_challenge", self.pkce.challenge())
                .append_pair("code_challenge_method", METHOD_S256);

            for (key, value) in &provider.extra_auth_params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Exchanges the code delivered to the redirect for a token set.
    ///
    /// # Errors
    ///
    /// Returns an error if the token endpoint rejects the exchange.
    pub async fn exchange_code(&self, code: &str) -> Result<Token> {
        self.client
            .exchange_code(code, &self.redirect_uri, self.pkce.verifier())
            .await
    }
}
