//! Event subscribers installed by the server

use async_trait::async_trait;
use hubhook_webhook::{EventHandler, EventKind, VerifiedEvent, WebhookListener};
use std::sync::Arc;
use tracing::{info, warn};

/// Logs a one-line summary of every delivery
pub struct LoggingHandler;

#[async_trait]
impl EventHandler for LoggingHandler {
    async fn handle(&self, event: Arc<VerifiedEvent>) -> hubhook_webhook::Result<()> {
        if let (Some(kind), Some(action)) = (event.kind(), event.action()) {
            if !kind.documented_actions().is_empty() && !kind.is_documented_action(action) {
                warn!(event = %kind, action = %action, "Undocumented action");
            }
        }

        info!(
            event = %event.event_name(),
            action = ?event.action(),
            delivery_id = ?event.delivery_id(),
            repository = ?event.repository_full_name(),
            sender = ?event.sender_login(),
            "Webhook event"
        );

        Ok(())
    }

    fn name(&self) -> &str {
        "logger"
    }
}

/// Subscribe the logging handler to every catalogued event
pub fn subscribe_all(listener: &WebhookListener) {
    let handler: Arc<dyn EventHandler> = Arc::new(LoggingHandler);

    for kind in EventKind::ALL {
        listener.on(kind.as_str(), Arc::clone(&handler));
    }
}
