//! Verified GitHub webhook receiver
//!
//! This crate accepts GitHub webhook deliveries over HTTP or HTTPS, checks
//! their `x-hub-signature-256` HMAC, decodes the payload and hands the result
//! to subscribers registered by event name.
//!
//! # Features
//!
//! - **Bounded Reads**: bodies are read frame by frame and cut off at 1 MB
//! - **Signature Verification**: HMAC-SHA256 with constant-time comparison
//! - **Form and JSON Payloads**: `application/json` and `payload=` form bodies
//! - **Dispatch**: name-keyed multi-subscriber registry, fire-and-forget
//! - **Event Catalogue**: every documented GitHub event name and its fields
//!
//! # Example
//!
//! ```rust,ignore
//! use hubhook_webhook::{ListenerConfig, WebhookListener};
//!
//! let listener = WebhookListener::new(ListenerConfig::new().with_secret("topsecret"))?;
//!
//! listener.on_fn("push", |event| async move {
//!     tracing::info!(repository = ?event.repository_full_name(), "Pushed");
//! });
//!
//! listener
//!     .start(3000, Some(Box::new(|addr| println!("Listening on {addr}"))))
//!     .await?;
//! ```

// Module order matters due to dependencies
pub mod events;
pub mod signature;
pub mod settings;
pub mod payload;
pub mod dispatcher;
pub mod inbound;
pub mod tls;
pub mod listener;

pub use events::*;
pub use signature::*;
pub use settings::*;
pub use payload::*;
pub use dispatcher::*;
pub use inbound::*;
pub use listener::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Webhook errors
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Signature verification failed: {0}")]
    Unauthorized(String),

    #[error("TLS configuration error: {0}")]
    Tls(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Handler failed: {0}")]
    Handler(String),
}

impl WebhookError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            WebhookError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            WebhookError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebhookError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            WebhookError::Tls(_)
            | WebhookError::Config(_)
            | WebhookError::Io(_)
            | WebhookError::Handler(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        self.status_code().into_response()
    }
}

impl From<::config::ConfigError> for WebhookError {
    fn from(err: ::config::ConfigError) -> Self {
        WebhookError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WebhookError>;
