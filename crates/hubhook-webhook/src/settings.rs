//! Listener configuration

use crate::Result;
use ::config::{Config, Environment, File};
use serde::Deserialize;

/// Largest accepted request body, in bytes
pub const DEFAULT_MAX_BODY_BYTES: usize = 1_000_000;

/// Construction-time listener options
#[derive(Clone, Deserialize)]
pub struct ListenerConfig {
    /// Shared secret; enables signature verification when set
    #[serde(default)]
    pub webhook_secret: Option<String>,
    /// PEM private key; TLS is used only when `cert` is also set
    #[serde(default)]
    pub key: Option<String>,
    /// PEM certificate chain
    #[serde(default)]
    pub cert: Option<String>,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl ListenerConfig {
    pub fn new() -> Self {
        Self {
            webhook_secret: None,
            key: None,
            cert: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }

    /// Load configuration from environment variables with a prefix
    /// (`HUBHOOK__WEBHOOK_SECRET`, `HUBHOOK__MAX_BODY_BYTES`, ...)
    pub fn load_from_env(prefix: &str) -> Result<Self> {
        let builder = Config::builder()
            .add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("max_body_bytes", DEFAULT_MAX_BODY_BYTES as u64)?;

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load configuration from file with environment overrides
    pub fn load_from_file(path: &str) -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("HUBHOOK")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("max_body_bytes", DEFAULT_MAX_BODY_BYTES as u64)?;

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn with_secret(mut self, secret: &str) -> Self {
        self.webhook_secret = Some(secret.to_string());
        self
    }

    /// Serve over TLS with a PEM key and certificate chain
    pub fn with_tls(mut self, key: &str, cert: &str) -> Self {
        self.key = Some(key.to_string());
        self.cert = Some(cert.to_string());
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Secret used for verification; an empty string counts as unset
    pub fn webhook_secret(&self) -> Option<&str> {
        self.webhook_secret.as_deref().filter(|s| !s.is_empty())
    }

    /// Key and certificate, when both are configured
    pub fn tls_identity(&self) -> Option<(&str, &str)> {
        match (self.key.as_deref(), self.cert.as_deref()) {
            (Some(key), Some(cert)) if !key.is_empty() && !cert.is_empty() => Some((key, cert)),
            _ => None,
        }
    }

    pub fn is_tls_enabled(&self) -> bool {
        self.tls_identity().is_some()
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ListenerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerConfig")
            .field("webhook_secret", &self.webhook_secret().map(|_| "<redacted>"))
            .field("tls", &self.is_tls_enabled())
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}
