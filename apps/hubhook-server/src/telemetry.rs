//! Logging setup

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Args;

/// Connection-level crates kept at `warn` unless `RUST_LOG` says otherwise
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "rustls", "tokio_rustls"];

/// Install the global subscriber: JSON lines or pretty output.
pub fn init_telemetry(args: &Args) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => default_filter(&args.log_level)?,
    };

    let registry = tracing_subscriber::registry().with(filter);

    if args.json_logs {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true),
            )
            .init();
    }

    Ok(())
}

/// Filter for `--log-level`, with noisy transport crates capped at `warn`
fn default_filter(log_level: &str) -> Result<EnvFilter> {
    let directives = std::iter::once(log_level.to_string())
        .chain(QUIET_TARGETS.iter().map(|target| format!("{}=warn", target)))
        .collect::<Vec<_>>()
        .join(",");

    EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid log filter: {}", directives))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_quiets_transport() {
        let filter = default_filter("debug").unwrap().to_string();

        assert!(filter.contains("debug"));
        assert!(filter.contains("hyper=warn"));
        assert!(filter.contains("rustls=warn"));
    }

    #[test]
    fn test_default_filter_rejects_garbage() {
        assert!(default_filter("hubhook=loud").is_err());
    }
}
