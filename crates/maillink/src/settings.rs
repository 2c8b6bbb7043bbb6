//! Persisted settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use maillink_core::gmail::DEFAULT_API_BASE;
use maillink_core::{DEFAULT_MAIL_HOST, DEFAULT_TTL, ResolverConfig};
use maillink_dom::AnchorRules;

/// Overrides `client_id` when set.
pub const CLIENT_ID_ENV: &str = "MAILLINK_CLIENT_ID";

/// Settings that persist across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `OAuth2` client id of an installed-app client.
    pub client_id: String,
    /// Client secret, if the client type has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Gmail API root.
    pub api_base_url: String,
    /// Web UI host embedded in links.
    pub mail_host: String,
    /// How long a resolved Message-ID is reused.
    pub cache_ttl_ms: u64,
    /// How long to wait on the consent screen.
    pub consent_timeout_secs: u64,
    /// Where controls go on the page.
    pub anchors: AnchorRules,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            api_base_url: DEFAULT_API_BASE.to_string(),
            mail_host: DEFAULT_MAIL_HOST.to_string(),
            cache_ttl_ms: u64::try_from(DEFAULT_TTL.as_millis()).unwrap_or(120_000),
            consent_timeout_secs: 300,
            anchors: AnchorRules::default(),
        }
    }
}

impl Settings {
    /// `<config dir>/maillink/settings.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("maillink")
            .join("settings.json")
    }

    /// Reads settings from `path`, falling back to defaults if the file does
    /// not exist, then applies the environment override.
    pub async fn load(path: &Path) -> Result<Self> {
        let settings = if path.exists() {
            let contents = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            tracing::debug!("no settings at {:?}, using defaults", path);
            Self::default()
        };
        Ok(settings.with_client_id_override(std::env::var(CLIENT_ID_ENV).ok()))
    }

    /// Writes settings as pretty JSON, creating the directory if needed.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("Settings saved to {:?}", path);
        Ok(())
    }

    /// Replaces `client_id` with a non-empty override.
    #[must_use]
    pub fn with_client_id_override(mut self, client_id: Option<String>) -> Self {
        if let Some(id) = client_id.filter(|id| !id.trim().is_empty()) {
            self.client_id = id;
        }
        self
    }

    /// Copy safe to print.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            client_secret: self.client_secret.as_ref().map(|_| "***".to_string()),
            ..self.clone()
        }
    }

    /// Cache entry lifetime.
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Consent wait bound.
    pub const fn consent_timeout(&self) -> Duration {
        Duration::from_secs(self.consent_timeout_secs)
    }

    /// Endpoint configuration for the resolver.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            api_base: self.api_base_url.clone(),
            mail_host: self.mail_host.clone(),
        }
    }
}
