//! Command-line argument parsing

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "hubhook-server",
    about = "GitHub webhook receiver",
    version,
    long_about = "Receives GitHub webhook deliveries, verifies their signatures \
                  and logs every event."
)]
pub struct Args {
    /// Path to configuration file (TOML, YAML or JSON)
    #[arg(short, long, env = "CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Shared secret used to verify x-hub-signature-256
    #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
    pub webhook_secret: Option<String>,

    /// Path to a PEM private key; requires --tls-cert
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key: Option<PathBuf>,

    /// Path to a PEM certificate chain; requires --tls-key
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert: Option<PathBuf>,

    /// Largest accepted request body in bytes
    #[arg(long, env = "MAX_BODY_BYTES")]
    pub max_body_bytes: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        env = "LOG_LEVEL",
        default_value = "info",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    pub log_level: String,

    /// Enable JSON log format (useful for production)
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,
}

impl Args {
    /// Validate the arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        match (&self.tls_key, &self.tls_cert) {
            (Some(_), None) => anyhow::bail!("--tls-key requires --tls-cert"),
            (None, Some(_)) => anyhow::bail!("--tls-cert requires --tls-key"),
            _ => Ok(()),
        }
    }
}
