//! # maillink-oauth
//!
//! `OAuth2` token acquisition for the Gmail read API.
//!
//! ## Features
//!
//! - **Identity provider**: [`IdentityProvider`] hands out opaque bearer
//!   credentials, silently when it can and interactively when it must
//! - **Consent flow**: Authorization Code Flow with PKCE and a loopback
//!   redirect listener
//! - **Token management**: expiry checks with clock skew, refresh grant
//!
//! ## Quick Start
//!
//! ```ignore
//! use maillink_oauth::{IdentityProvider, OAuthClient, OAuthIdentity, Provider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OAuthClient::new("your_client_id", Provider::google()?);
//!     let identity = OAuthIdentity::new(client, |url: &url::Url| {
//!         eprintln!("Open {url} to grant access");
//!         Ok(())
//!     });
//!
//!     // Silent first, consent screen as a last resort.
//!     let token = match identity.acquire(false).await {
//!         Ok(token) => token,
//!         Err(_) => identity.acquire(true).await?,
//!     };
//!     println!("Authorization: {}", token.authorization());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod flow;
pub mod identity;
pub mod provider;
pub mod token;

pub use error::{Error, Result};
pub use flow::{AuthorizationCodeFlow, LoopbackRedirect, OAuthClient, PkceChallenge};
pub use identity::{AccessToken, ConsentPrompt, IdentityProvider, OAuthIdentity};
pub use provider::Provider;
pub use token::Token;
