//! Token set returned by the Google token endpoint.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds of slack subtracted from the server-reported lifetime.
const EXPIRY_SKEW_SECS: i64 = 60;

/// `OAuth2` token set: the access token plus what is needed to renew it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Access token string.
    pub access_token: String,
    /// Token type (usually "Bearer").
    pub token_type: String,
    /// Expiration time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Refresh token for renewing without a consent screen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Scope granted by the authorization server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Token {
    /// Creates a bearer token with no expiry information.
    #[must_use]
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "Bearer".to_string(),
            expires_at: None,
            refresh_token: None,
            scope: None,
        }
    }

    /// Builds a token from an endpoint response received at `received_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the response carries an empty access token.
    pub fn from_response(response: TokenResponse, received_at: DateTime<Utc>) -> Result<Self> {
        if response.access_token.is_empty() {
            return Err(Error::InvalidResponse("empty access_token".into()));
        }

        let expires_at = response
            .expires_in
            .map(|secs| received_at + Duration::seconds(i64::from(secs)));

        Ok(Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_at,
            refresh_token: response.refresh_token,
            scope: response.scope,
        })
    }

    /// Whether the token is expired (or about to be) at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|exp| now + Duration::seconds(EXPIRY_SKEW_SECS) >= exp)
    }

    /// Whether the token is expired right now.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the expiration time.
    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Returns the refresh token if available.
    ///
    /// # Errors
    ///
    /// Returns an error if no refresh token is available.
    pub fn refresh_token(&self) -> Result<&str> {
        self.refresh_token.as_deref().ok_or(Error::NoRefreshToken)
    }
}

/// Successful response from the token endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u32>,
    /// Refresh token (only sent on the first exchange with `access_type=offline`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Error body from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,
    /// Error description.
    #[serde(default)]
    pub error_description: String,
}

impl ErrorResponse {
    /// Converts to an Error.
    #[must_use]
    pub fn into_error(self) -> Error {
        match self.error.as_str() {
            "access_denied" => Error::AccessDenied,
            _ => Error::oauth_error(self.error, self.error_description),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_defaults() {
        let token = Token::bearer("ya29.abc");
        assert_eq!(token.token_type, "Bearer");
        assert!(token.expires_at.is_none());
        assert!(!token.is_expired());
        assert!(matches!(token.refresh_token(), Err(Error::NoRefreshToken)));
    }

    #[test]
    fn test_expiry_applies_skew() {
        let now = Utc::now();
        let token = Token::bearer("t").with_expires_at(now + Duration::seconds(30));
        assert!(token.is_expired_at(now));

        let token = Token::bearer("t").with_expires_at(now + Duration::seconds(3600));
        assert!(!token.is_expired_at(now));
        assert!(token.is_expired_at(now + Duration::seconds(3550)));
    }

    #[test]
    fn test_from_google_response() {
        let json = r#"{
            "access_token": "ya29.a0Af",
            "expires_in": 3599,
            "refresh_token": "1//0g",
            "scope": "https://www.googleapis.com/auth/gmail.metadata",
            "token_type": "Bearer"
        }"#;
        let response: TokenResponse = serde_json::from_str(json).unwrap();
        let received = Utc::now();
        let token = Token::from_response(response, received).unwrap();

        assert_eq!(token.access_token, "ya29.a0Af");
        assert_eq!(token.refresh_token().unwrap(), "1//0g");
        assert_eq!(token.expires_at, Some(received + Duration::seconds(3599)));
    }

    #[test]
    fn test_empty_access_token_rejected() {
        let response: TokenResponse = serde_json::from_str(r#"{"access_token": ""}"#).unwrap();
        assert!(matches!(
            Token::from_response(response, Utc::now()),
            Err(Error::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_access_denied_mapping() {
        let body: ErrorResponse = serde_json::from_str(r#"{"error": "access_denied"}"#).unwrap();
        assert!(matches!(body.into_error(), Error::AccessDenied));

        let body: ErrorResponse = serde_json::from_str(
            r#"{"error": "invalid_grant", "error_description": "Token has been expired or revoked."}"#,
        )
        .unwrap();
        assert!(
            matches!(body.into_error(), Error::OAuth { error, .. } if error == "invalid_grant")
        );
    }
}
