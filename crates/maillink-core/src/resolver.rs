//! Message and thread references to deep links.

use tracing::{debug, info};

use maillink_oauth::IdentityProvider;

use crate::cache::{CacheKey, LinkCache};
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::fetch::AuthenticatedFetch;
use crate::gmail::{
    DEFAULT_API_BASE, GmailEndpoints, MESSAGE_ID_HEADER, MessageMetadata, ThreadMetadata,
};
use crate::link::{DEFAULT_MAIL_HOST, build_link, normalize_message_id};
use crate::transport::HttpTransport;

/// Where to fetch from and which host the links point at.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Gmail API root.
    pub api_base: String,
    /// Host of the web UI embedded in generated links.
    pub mail_host: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            mail_host: DEFAULT_MAIL_HOST.to_string(),
        }
    }
}

/// Resolves references through the cache and the metadata endpoints.
///
/// Two concurrent lookups of the same uncached key both go to the network;
/// whichever finishes last wins the cache slot, and both write the same
/// value.
pub struct Resolver<I, H, C = SystemClock> {
    fetch: AuthenticatedFetch<I, H>,
    endpoints: GmailEndpoints,
    mail_host: String,
    cache: LinkCache<C>,
}

impl<I, H, C> Resolver<I, H, C>
where
    I: IdentityProvider,
    H: HttpTransport,
    C: Clock,
{
    /// Creates a resolver owning `cache`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured API root is not a valid URL.
    pub fn new(
        fetch: AuthenticatedFetch<I, H>,
        cache: LinkCache<C>,
        config: ResolverConfig,
    ) -> Result<Self> {
        Ok(Self {
            fetch,
            endpoints: GmailEndpoints::new(&config.api_base)?,
            mail_host: config.mail_host,
            cache,
        })
    }

    /// The cache this resolver reads and writes.
    #[must_use]
    pub const fn cache(&self) -> &LinkCache<C> {
        &self.cache
    }

    /// The fetcher, for inspecting its identity and transport.
    #[must_use]
    pub const fn fetcher(&self) -> &AuthenticatedFetch<I, H> {
        &self.fetch
    }

    /// Deep link for one message.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for an empty id, `HeaderMissing` if the message has
    /// no Message-ID (or one that is blank once unwrapped), plus any fetch
    /// error.
    pub async fn resolve_message_link(&self, message_id: &str) -> Result<String> {
        let canonical = self
            .canonical_id(CacheKey::Message(message_id.to_string()))
            .await?;
        Ok(build_link(&self.mail_host, &canonical))
    }

    /// Deep link for whatever message is currently newest in a thread.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for an empty id, `EmptyThread` if the thread has no
    /// messages, `HeaderMissing` if the newest one has no Message-ID, plus any
    /// fetch error.
    pub async fn resolve_thread_last_link(&self, thread_id: &str) -> Result<String> {
        let canonical = self
            .canonical_id(CacheKey::ThreadLast(thread_id.to_string()))
            .await?;
        Ok(build_link(&self.mail_host, &canonical))
    }

    async fn canonical_id(&self, key: CacheKey) -> Result<String> {
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let raw = match &key {
            CacheKey::Message(id) => {
                let url = self.endpoints.message_metadata(id)?;
                let message: MessageMetadata = self.fetch.get_json(&url).await?;
                message_id_header(&message)?
            }
            CacheKey::ThreadLast(id) => {
                let url = self.endpoints.thread_metadata(id)?;
                let thread: ThreadMetadata = self.fetch.get_json(&url).await?;
                let last = thread.last_message()?;
                debug!(%key, message = %last.id, "thread resolved to newest message");
                message_id_header(last)?
            }
        };

        let canonical = normalize_message_id(&raw);
        if canonical.is_empty() {
            return Err(Error::HeaderMissing);
        }
        let canonical = canonical.to_string();
        info!(%key, "resolved Message-ID");
        self.cache.insert(key, canonical.clone());
        Ok(canonical)
    }
}

fn message_id_header(message: &MessageMetadata) -> Result<String> {
    message
        .header(MESSAGE_ID_HEADER)
        .map(str::to_string)
        .ok_or(Error::HeaderMissing)
}
