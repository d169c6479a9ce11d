//! Webhook server

use anyhow::{Context, Result};
use hubhook_webhook::WebhookListener;
use tracing::{error, info};

pub struct Server {
    port: u16,
    listener: WebhookListener,
}

impl Server {
    pub fn new(port: u16, listener: WebhookListener) -> Self {
        Self { port, listener }
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> Result<()> {
        let listener = self.listener.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            listener.shutdown();
        });

        let scheme = if self.listener.config().is_tls_enabled() {
            "https"
        } else {
            "http"
        };

        self.listener
            .start(
                self.port,
                Some(Box::new(move |addr| {
                    info!("Webhook server listening on {}://{}", scheme, addr);
                })),
            )
            .await
            .context("Webhook server error")?;

        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl-C; serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
