//! Client configuration.

use thiserror::Error;

pub const DEFAULT_API_VERSION: &str = "v1";
pub const DEFAULT_AUTH_HEADER: &str = "x-public-key";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),
}

/// Immutable settings for a `ContentClient`.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `CONTENT_API_DOMAIN` | (required) | Base URL of the API, no version segment |
/// | `CONTENT_API_VERSION` | `v1` | Version segment every path starts with |
/// | `CONTENT_API_KEY` | (absent) | Static public key sent on every request |
/// | `CONTENT_API_MEDIA_DOMAIN` | API domain | Base URL for media asset URLs |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub domain: String,
    pub api_version: String,
    pub public_key: Option<String>,
    /// Header the public key is sent in.
    pub auth_header: String,
    pub media_domain: Option<String>,
}

impl ClientConfig {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: trim_domain(domain),
            api_version: DEFAULT_API_VERSION.to_string(),
            public_key: None,
            auth_header: DEFAULT_AUTH_HEADER.to_string(),
            media_domain: None,
        }
    }

    pub fn with_api_version(mut self, version: &str) -> Self {
        self.api_version = version.trim_matches('/').to_string();
        self
    }

    pub fn with_public_key(mut self, key: impl Into<String>) -> Self {
        self.public_key = Some(key.into());
        self
    }

    pub fn with_auth_header(mut self, header: impl Into<String>) -> Self {
        self.auth_header = header.into();
        self
    }

    pub fn with_media_domain(mut self, domain: &str) -> Self {
        self.media_domain = Some(trim_domain(domain));
        self
    }

    /// Populate config from `CONTENT_API_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let domain =
            lookup("CONTENT_API_DOMAIN").ok_or(ConfigError::MissingVar("CONTENT_API_DOMAIN"))?;
        let mut config = Self::new(&domain);
        if let Some(version) = lookup("CONTENT_API_VERSION") {
            config = config.with_api_version(&version);
        }
        if let Some(key) = lookup("CONTENT_API_KEY") {
            config = config.with_public_key(key);
        }
        if let Some(media) = lookup("CONTENT_API_MEDIA_DOMAIN") {
            config = config.with_media_domain(&media);
        }
        Ok(config)
    }

    /// `/{version}`, the prefix every server-relative path must carry.
    pub fn version_prefix(&self) -> String {
        format!("/{}", self.api_version)
    }

    /// Domain media URLs are built on.
    pub fn media_domain(&self) -> &str {
        self.media_domain.as_deref().unwrap_or(&self.domain)
    }
}

fn trim_domain(domain: &str) -> String {
    domain.trim_end_matches('/').to_string()
}
