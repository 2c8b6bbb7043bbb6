//! Wires settings into a resolver.

use anyhow::{Context, Result, bail};

use maillink_core::{AuthenticatedFetch, LinkCache, ReqwestTransport, Resolver, SystemClock};
use maillink_oauth::{OAuthClient, OAuthIdentity, Provider};

use crate::desktop::{ConsentPrinter, print_consent_url};
use crate::settings::{CLIENT_ID_ENV, Settings};

/// The resolver the CLI runs.
pub type AppResolver = Resolver<OAuthIdentity<ConsentPrinter>, ReqwestTransport>;

/// Builds a resolver with an empty cache and no token yet.
pub fn build_resolver(settings: &Settings) -> Result<AppResolver> {
    if settings.client_id.trim().is_empty() {
        bail!(
            "no OAuth client id configured; set \"client_id\" in {} or {CLIENT_ID_ENV}",
            Settings::default_path().display()
        );
    }

    let mut client = OAuthClient::new(settings.client_id.as_str(), Provider::google()?);
    if let Some(secret) = &settings.client_secret {
        client = client.with_client_secret(secret.as_str());
    }
    let identity = OAuthIdentity::new(client, print_consent_url as ConsentPrinter)
        .with_consent_timeout(settings.consent_timeout());

    let http = reqwest::Client::builder()
        .user_agent(concat!("maillink/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")?;

    let fetch = AuthenticatedFetch::new(identity, ReqwestTransport::new(http));
    let cache = LinkCache::with_clock(SystemClock, settings.cache_ttl());
    Ok(Resolver::new(fetch, cache, settings.resolver_config())?)
}
