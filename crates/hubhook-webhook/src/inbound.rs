//! Inbound webhook handling
//!
//! The receiver pipeline runs a fixed sequence of checks on every request and
//! stops at the first failure:
//!
//! 1. bounded body read (413)
//! 2. method must be `POST` (405)
//! 3. `content-type` must be JSON or form-encoded (400)
//! 4. `x-hub-signature-256` must match, when a secret is configured (401)
//! 5. payload must decode as JSON (400)
//! 6. dispatch by `x-github-event`, then answer 200
//!
//! Dispatch runs on a spawned task so the response never waits on handlers.

use crate::{
    dispatcher::Dispatcher,
    payload::{decode_payload, ContentKind, VerifiedEvent, EVENT_HEADER},
    settings::ListenerConfig,
    signature::{WebhookVerifier, SIGNATURE_HEADER},
    Result, WebhookError,
};
use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode},
    Router,
};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Read a body stream into memory, failing once more than `limit` bytes arrive.
///
/// Reading stops at the first chunk that crosses the limit; the rest of the
/// stream is never polled.
pub async fn read_bounded_body<S, E>(stream: S, limit: usize) -> Result<Bytes>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            WebhookError::BadRequest(format!("Failed to read request body: {}", e))
        })?;

        if buffer.len() + chunk.len() > limit {
            return Err(WebhookError::PayloadTooLarge { limit });
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buffer))
}

/// The verified-dispatch pipeline
pub struct WebhookReceiver {
    verifier: Option<WebhookVerifier>,
    max_body_bytes: usize,
    dispatcher: Arc<Dispatcher>,
}

impl WebhookReceiver {
    pub fn new(config: &ListenerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            verifier: config.webhook_secret().map(WebhookVerifier::new),
            max_body_bytes: config.max_body_bytes,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Whether deliveries must carry a valid signature
    pub fn verifies_signatures(&self) -> bool {
        self.verifier.is_some()
    }

    /// Run every pipeline stage except dispatch
    pub async fn receive(&self, request: Request) -> Result<VerifiedEvent> {
        let (parts, body) = request.into_parts();

        let raw_body = read_bounded_body(body.into_data_stream(), self.max_body_bytes).await?;

        if parts.method != Method::POST {
            return Err(WebhookError::MethodNotAllowed(parts.method.to_string()));
        }

        let kind = ContentKind::from_headers(&parts.headers)?;

        if let Some(verifier) = &self.verifier {
            verifier.verify(&raw_body, signature_header(&parts.headers)?)?;
        }

        let payload = decode_payload(kind, &raw_body)?;

        let event_name = parts
            .headers
            .get(EVENT_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        Ok(VerifiedEvent::from_parts(event_name, &parts.headers, payload))
    }

    /// Run the full pipeline and return the response status
    pub async fn handle(&self, request: Request) -> StatusCode {
        match self.receive(request).await {
            Ok(event) => {
                self.dispatch_in_background(event);
                StatusCode::OK
            }
            Err(e) => {
                let status = e.status_code();
                warn!(status = status.as_u16(), error = %e, "Rejected webhook delivery");
                status
            }
        }
    }

    fn dispatch_in_background(&self, event: VerifiedEvent) {
        if event.event_name().is_empty() {
            warn!(
                delivery_id = ?event.delivery_id(),
                "Delivery has no {} header; nothing dispatched",
                EVENT_HEADER
            );
            return;
        }

        info!(
            event = %event.event_name(),
            delivery_id = ?event.delivery_id(),
            hook_id = ?event.hook_id(),
            "Received webhook delivery"
        );

        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            dispatcher.dispatch(Arc::new(event)).await;
        });
    }
}

impl std::fmt::Debug for WebhookReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookReceiver")
            .field("verifies_signatures", &self.verifies_signatures())
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

fn signature_header(headers: &HeaderMap) -> Result<Option<&str>> {
    headers
        .get(SIGNATURE_HEADER)
        .map(|v| v.to_str())
        .transpose()
        .map_err(|_| {
            WebhookError::Unauthorized(format!("{} header is not valid UTF-8", SIGNATURE_HEADER))
        })
}

/// Create Axum router for inbound webhooks.
///
/// The pipeline is the fallback service, so every path and method reaches it.
pub fn create_webhook_router(receiver: Arc<WebhookReceiver>) -> Router {
    Router::new()
        .fallback(handle_webhook)
        .with_state(receiver)
        .layer(TraceLayer::new_for_http())
}

/// Handle incoming webhook request
async fn handle_webhook(
    State(receiver): State<Arc<WebhookReceiver>>,
    request: Request,
) -> StatusCode {
    receiver.handle(request).await
}
