//! Payload decoding and the verified event type
//!
//! GitHub posts either a raw JSON document (`application/json`) or a form body
//! with a single `payload=<url-encoded JSON>` field
//! (`application/x-www-form-urlencoded`).

use crate::{EventKind, Result, WebhookError};
use axum::http::{header::CONTENT_TYPE, HeaderMap};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

/// Header naming the event, used as the dispatch key
pub const EVENT_HEADER: &str = "x-github-event";

/// Header carrying the unique delivery GUID
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// Header carrying the id of the hook that sent the delivery
pub const HOOK_ID_HEADER: &str = "x-github-hook-id";

/// Prefix of the decoded form body in form-encoded deliveries
pub const FORM_PAYLOAD_PREFIX: &str = "payload=";

/// Keys merged into every event body
pub const RAW_HEADERS_KEY: &str = "rawHeaders";
pub const DELIVERY_ID_KEY: &str = "deliveryId";
/// Holds the hook id. The name is kept for compatibility with existing consumers.
pub const REQUEST_ID_KEY: &str = "RequestId";

/// Accepted request body encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    FormUrlEncoded,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
        }
    }

    /// Resolve the body encoding from `content-type`.
    ///
    /// The value must match exactly; parameters such as `charset` are rejected.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let value = headers
            .get(CONTENT_TYPE)
            .ok_or_else(|| WebhookError::BadRequest("Missing content-type header".to_string()))?
            .to_str()
            .map_err(|_| {
                WebhookError::BadRequest("content-type header is not valid UTF-8".to_string())
            })?;

        match value {
            "application/json" => Ok(Self::Json),
            "application/x-www-form-urlencoded" => Ok(Self::FormUrlEncoded),
            other => Err(WebhookError::BadRequest(format!(
                "Unsupported content-type: {}",
                other
            ))),
        }
    }
}

/// Decode a raw body into a JSON value
pub fn decode_payload(kind: ContentKind, body: &[u8]) -> Result<Value> {
    match kind {
        ContentKind::Json => serde_json::from_slice(body)
            .map_err(|e| WebhookError::BadRequest(format!("Invalid JSON payload: {}", e))),
        ContentKind::FormUrlEncoded => {
            // The whole body is decoded before the prefix is stripped
            let spaced: Vec<u8> = body
                .iter()
                .map(|&b| if b == b'+' { b' ' } else { b })
                .collect();
            let decoded = urlencoding::decode_binary(&spaced);
            let decoded = std::str::from_utf8(&decoded).map_err(|_| {
                WebhookError::BadRequest("Form body is not valid UTF-8".to_string())
            })?;

            let document = decoded.strip_prefix(FORM_PAYLOAD_PREFIX).ok_or_else(|| {
                WebhookError::BadRequest(format!(
                    "Form body must start with '{}'",
                    FORM_PAYLOAD_PREFIX
                ))
            })?;

            serde_json::from_str(document)
                .map_err(|e| WebhookError::BadRequest(format!("Invalid JSON payload: {}", e)))
        }
    }
}

/// Convert a header map to JSON.
///
/// Names are lower case. A header sent once maps to a string, a repeated
/// header maps to an array of strings in arrival order.
pub fn headers_to_json(headers: &HeaderMap) -> Map<String, Value> {
    let mut map = Map::new();

    for name in headers.keys() {
        let mut values: Vec<Value> = headers
            .get_all(name)
            .iter()
            .map(|v| Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();

        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            Value::Array(values)
        };
        map.insert(name.as_str().to_string(), value);
    }

    map
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

/// A delivery that passed verification and decoding.
///
/// The body is the decoded payload object with `rawHeaders`, `deliveryId` and
/// `RequestId` merged in. Only the receiver pipeline constructs these.
#[derive(Debug, Clone)]
pub struct VerifiedEvent {
    event_name: String,
    delivery_id: Option<String>,
    hook_id: Option<String>,
    body: Map<String, Value>,
    received_at: DateTime<Utc>,
}

impl VerifiedEvent {
    pub(crate) fn from_parts(event_name: &str, headers: &HeaderMap, payload: Value) -> Self {
        let delivery_id = header_string(headers, DELIVERY_HEADER);
        let hook_id = header_string(headers, HOOK_ID_HEADER);

        let mut body = match payload {
            Value::Object(map) => map,
            other => {
                debug!(
                    event = %event_name,
                    kind = json_kind(&other),
                    "Payload is not an object; no fields merged"
                );
                Map::new()
            }
        };

        body.insert(
            RAW_HEADERS_KEY.to_string(),
            Value::Object(headers_to_json(headers)),
        );
        body.insert(
            DELIVERY_ID_KEY.to_string(),
            delivery_id.clone().map(Value::String).unwrap_or(Value::Null),
        );
        body.insert(
            REQUEST_ID_KEY.to_string(),
            hook_id.clone().map(Value::String).unwrap_or(Value::Null),
        );

        Self {
            event_name: event_name.to_string(),
            delivery_id,
            hook_id,
            body,
            received_at: Utc::now(),
        }
    }

    /// Event name from `x-github-event`
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Catalogue entry for the event name, if it is a documented event
    pub fn kind(&self) -> Option<EventKind> {
        self.event_name.parse().ok()
    }

    pub fn delivery_id(&self) -> Option<&str> {
        self.delivery_id.as_deref()
    }

    /// Hook id from `x-github-hook-id`, also exposed in the body as `RequestId`
    pub fn hook_id(&self) -> Option<&str> {
        self.hook_id.as_deref()
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Merged body
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Header mapping as attached under `rawHeaders`
    pub fn raw_headers(&self) -> Option<&Map<String, Value>> {
        self.body.get(RAW_HEADERS_KEY).and_then(Value::as_object)
    }

    /// First value of a request header (name is matched in lower case)
    pub fn header(&self, name: &str) -> Option<&str> {
        let value = self.raw_headers()?.get(&name.to_ascii_lowercase())?;
        match value {
            Value::String(s) => Some(s.as_str()),
            Value::Array(values) => values.first().and_then(Value::as_str),
            _ => None,
        }
    }

    pub fn action(&self) -> Option<&str> {
        self.body.get("action").and_then(Value::as_str)
    }

    pub fn repository_full_name(&self) -> Option<&str> {
        self.body
            .get("repository")
            .and_then(|r| r.get("full_name"))
            .and_then(Value::as_str)
    }

    pub fn sender_login(&self) -> Option<&str> {
        self.body
            .get("sender")
            .and_then(|s| s.get("login"))
            .and_then(Value::as_str)
    }

    pub fn installation_id(&self) -> Option<u64> {
        self.body
            .get("installation")
            .and_then(|i| i.get("id"))
            .and_then(Value::as_u64)
    }

    /// Merged body as a JSON value
    pub fn to_value(&self) -> Value {
        Value::Object(self.body.clone())
    }
}

impl Serialize for VerifiedEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
