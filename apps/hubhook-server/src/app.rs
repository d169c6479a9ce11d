//! Application initialization

use anyhow::{Context, Result};
use hubhook_webhook::{ListenerConfig, WebhookListener};
use std::path::Path;
use tracing::info;

use crate::cli::Args;
use crate::handlers::subscribe_all;
use crate::server::Server;

/// Prefix for `HUBHOOK__*` configuration variables
const ENV_PREFIX: &str = "HUBHOOK";

/// Main application
pub struct App {
    args: Args,
    listener: WebhookListener,
}

impl App {
    /// Build the application with all dependencies
    pub async fn build(args: Args) -> Result<Self> {
        args.validate()
            .context("Invalid command line arguments")?;

        let config = listener_config(&args)?;
        info!(config = ?config, "Loaded listener configuration");

        let listener = WebhookListener::new(config)
            .context("Failed to create webhook listener")?;
        subscribe_all(&listener);

        Ok(Self { args, listener })
    }

    /// Run the application
    pub async fn run(self) -> Result<()> {
        info!("Starting server");
        info!("Port: {}", self.args.port);

        Server::new(self.args.port, self.listener).run().await
    }
}

/// Resolve listener settings: file or environment first, then CLI overrides
pub fn listener_config(args: &Args) -> Result<ListenerConfig> {
    let mut config = match &args.config {
        Some(path) => ListenerConfig::load_from_file(&path.to_string_lossy())
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ListenerConfig::load_from_env(ENV_PREFIX)
            .context("Failed to load config from environment")?,
    };

    if let Some(secret) = &args.webhook_secret {
        config = config.with_secret(secret);
    }

    if let (Some(key_path), Some(cert_path)) = (&args.tls_key, &args.tls_cert) {
        let key = read_pem(key_path)?;
        let cert = read_pem(cert_path)?;
        config = config.with_tls(&key, &cert);
    }

    if let Some(max_body_bytes) = args.max_body_bytes {
        config = config.with_max_body_bytes(max_body_bytes);
    }

    Ok(config)
}

fn read_pem(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
