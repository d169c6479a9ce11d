//! Integration tests for hubhook-webhook

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use hubhook_webhook::{ListenerConfig, VerifiedEvent, WebhookListener, WebhookSigner};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tower::ServiceExt;

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(100);

type Events = mpsc::UnboundedReceiver<Arc<VerifiedEvent>>;

fn listener_with(config: ListenerConfig, event_name: &str) -> (WebhookListener, Events) {
    let listener = WebhookListener::new(config).unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    listener.on_fn(event_name, move |event| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(event);
        }
    });

    (listener, rx)
}

fn request(method: &str, content_type: Option<&str>, event: &str, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri("/")
        .header("x-github-event", event)
        .header("x-github-delivery", "72d3162e-cc78-11e3-81ab-4c9367dc0958")
        .header("x-github-hook-id", "292430182");

    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }

    builder.body(body.into()).unwrap()
}

fn signed(secret: &str, body: &str) -> Request<Body> {
    let signature = WebhookSigner::new(secret).sign(body.as_bytes());
    let mut request = request("POST", Some("application/json"), "push", body.to_string());
    request
        .headers_mut()
        .insert("x-hub-signature-256", signature.parse().unwrap());
    request
}

async fn status(router: Router, request: Request<Body>) -> StatusCode {
    router.oneshot(request).await.unwrap().status()
}

async fn assert_no_event(events: &mut Events) {
    assert!(timeout(QUIET, events.recv()).await.is_err());
}

/// A JSON document of exactly `len` bytes
fn json_of_len(len: usize) -> String {
    let overhead = r#"{"zen":""}"#.len();
    format!(r#"{{"zen":"{}"}}"#, "a".repeat(len - overhead))
}

// ==== Method Tests ====

#[tokio::test]
async fn test_non_post_rejected() {
    for method in ["GET", "PUT", "DELETE", "PATCH"] {
        let (listener, mut events) = listener_with(ListenerConfig::new(), "push");
        let request = request(method, Some("application/json"), "push", "{}");

        assert_eq!(status(listener.router(), request).await, StatusCode::METHOD_NOT_ALLOWED);
        assert_no_event(&mut events).await;
    }
}

#[tokio::test]
async fn test_any_path_accepted() {
    let (listener, mut events) = listener_with(ListenerConfig::new(), "push");
    let mut request = request("POST", Some("application/json"), "push", "{}");
    *request.uri_mut() = "/hooks/github/deep/path".parse().unwrap();

    assert_eq!(status(listener.router(), request).await, StatusCode::OK);
    assert!(timeout(WAIT, events.recv()).await.unwrap().is_some());
}

// ==== Content-Type Tests ====

#[tokio::test]
async fn test_missing_content_type_rejected() {
    let (listener, mut events) = listener_with(ListenerConfig::new(), "push");
    let request = request("POST", None, "push", "{}");

    assert_eq!(status(listener.router(), request).await, StatusCode::BAD_REQUEST);
    assert_no_event(&mut events).await;
}

#[tokio::test]
async fn test_unrecognised_content_type_rejected() {
    for content_type in ["text/plain", "application/xml", "application/json; charset=utf-8"] {
        let (listener, mut events) = listener_with(ListenerConfig::new(), "push");
        let request = request("POST", Some(content_type), "push", "{}");

        assert_eq!(status(listener.router(), request).await, StatusCode::BAD_REQUEST);
        assert_no_event(&mut events).await;
    }
}

#[tokio::test]
async fn test_form_payload_accepted() {
    let (listener, mut events) = listener_with(ListenerConfig::new(), "push");
    let body = format!(
        "payload={}",
        urlencoding::encode(r#"{"ref":"refs/heads/main","note":"a b"}"#)
    );
    let request = request("POST", Some("application/x-www-form-urlencoded"), "push", body);

    assert_eq!(status(listener.router(), request).await, StatusCode::OK);

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event.get("ref").and_then(|v| v.as_str()), Some("refs/heads/main"));
    assert_eq!(event.get("note").and_then(|v| v.as_str()), Some("a b"));
}

#[tokio::test]
async fn test_form_payload_decoded_before_prefix_strip() {
    for body in [r#"payload={"note":"x&y"}"#, "payload%3D%7B%22note%22%3A%22x%26y%22%7D"] {
        let (listener, mut events) = listener_with(ListenerConfig::new(), "push");
        let request = request("POST", Some("application/x-www-form-urlencoded"), "push", body);

        assert_eq!(status(listener.router(), request).await, StatusCode::OK);

        let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
        assert_eq!(event.get("note").and_then(|v| v.as_str()), Some("x&y"));
    }
}

// ==== Signature Tests ====

#[tokio::test]
async fn test_valid_signature_accepted() {
    let (listener, mut events) = listener_with(ListenerConfig::new().with_secret("topsecret"), "push");
    let request = signed("topsecret", r#"{"ref":"refs/heads/main"}"#);

    assert_eq!(status(listener.router(), request).await, StatusCode::OK);
    assert!(timeout(WAIT, events.recv()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_single_byte_body_mutation_rejected() {
    let body = r#"{"ref":"refs/heads/main"}"#;
    let signature = WebhookSigner::new("topsecret").sign(body.as_bytes());

    for index in [0, body.len() / 2, body.len() - 1] {
        let (listener, mut events) =
            listener_with(ListenerConfig::new().with_secret("topsecret"), "push");

        let mut bytes = body.as_bytes().to_vec();
        bytes[index] ^= 0x01;

        let mut request = request("POST", Some("application/json"), "push", bytes);
        request
            .headers_mut()
            .insert("x-hub-signature-256", signature.parse().unwrap());

        assert_eq!(status(listener.router(), request).await, StatusCode::UNAUTHORIZED);
        assert_no_event(&mut events).await;
    }
}

#[tokio::test]
async fn test_single_byte_signature_mutation_rejected() {
    let (listener, mut events) = listener_with(ListenerConfig::new().with_secret("topsecret"), "push");
    let body = r#"{"ref":"refs/heads/main"}"#;
    let mut signature = WebhookSigner::new("topsecret").sign(body.as_bytes());

    let last = signature.pop().unwrap();
    signature.push(if last == '0' { '1' } else { '0' });

    let mut request = request("POST", Some("application/json"), "push", body.to_string());
    request
        .headers_mut()
        .insert("x-hub-signature-256", signature.parse().unwrap());

    assert_eq!(status(listener.router(), request).await, StatusCode::UNAUTHORIZED);
    assert_no_event(&mut events).await;
}

#[tokio::test]
async fn test_wrong_secret_rejected() {
    let listener = WebhookListener::new(ListenerConfig::new().with_secret("topsecret")).unwrap();
    let request = signed("othersecret", "{}");

    assert_eq!(status(listener.router(), request).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unsigned_accepted_without_secret() {
    let (listener, mut events) = listener_with(ListenerConfig::new(), "push");
    let request = request("POST", Some("application/json"), "push", "{}");

    assert_eq!(status(listener.router(), request).await, StatusCode::OK);
    assert!(timeout(WAIT, events.recv()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_ping_without_signature_rejected_when_secret_set() {
    let (listener, mut events) = listener_with(ListenerConfig::new().with_secret("topsecret"), "ping");
    let request = request("POST", Some("application/json"), "ping", r#"{"zen":"str8"}"#);

    assert_eq!(status(listener.router(), request).await, StatusCode::UNAUTHORIZED);
    assert_no_event(&mut events).await;
}

// ==== Body Size Tests ====

#[tokio::test]
async fn test_body_at_limit_accepted() {
    let (listener, mut events) = listener_with(ListenerConfig::new(), "push");
    let body = json_of_len(1_000_000);
    assert_eq!(body.len(), 1_000_000);

    let request = request("POST", Some("application/json"), "push", body);

    assert_eq!(status(listener.router(), request).await, StatusCode::OK);
    assert!(timeout(WAIT, events.recv()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_body_over_limit_rejected() {
    let (listener, mut events) = listener_with(ListenerConfig::new(), "push");
    let body = json_of_len(1_000_001);

    let request = request("POST", Some("application/json"), "push", body);

    assert_eq!(status(listener.router(), request).await, StatusCode::PAYLOAD_TOO_LARGE);
    assert_no_event(&mut events).await;
}

#[tokio::test]
async fn test_size_checked_before_everything_else() {
    let listener = WebhookListener::new(ListenerConfig::new().with_secret("topsecret")).unwrap();
    let request = request("GET", None, "push", "a".repeat(1_000_001));

    assert_eq!(status(listener.router(), request).await, StatusCode::PAYLOAD_TOO_LARGE);
}

// ==== Decoding Tests ====

#[tokio::test]
async fn test_malformed_json_rejected() {
    let (listener, mut events) = listener_with(ListenerConfig::new(), "push");
    let request = request("POST", Some("application/json"), "push", "{not json");

    assert_eq!(status(listener.router(), request).await, StatusCode::BAD_REQUEST);
    assert_no_event(&mut events).await;
}

#[tokio::test]
async fn test_malformed_form_payload_rejected() {
    let (listener, mut events) = listener_with(ListenerConfig::new(), "push");
    let request = request(
        "POST",
        Some("application/x-www-form-urlencoded"),
        "push",
        "payload=%7Bnot%20json",
    );

    assert_eq!(status(listener.router(), request).await, StatusCode::BAD_REQUEST);
    assert_no_event(&mut events).await;
}

#[tokio::test]
async fn test_form_without_payload_field_rejected() {
    let (listener, mut events) = listener_with(ListenerConfig::new(), "push");
    let request = request(
        "POST",
        Some("application/x-www-form-urlencoded"),
        "push",
        "data=%7B%7D",
    );

    assert_eq!(status(listener.router(), request).await, StatusCode::BAD_REQUEST);
    assert_no_event(&mut events).await;
}

// ==== Dispatch Tests ====

#[tokio::test]
async fn test_ping_end_to_end() {
    let (listener, mut events) = listener_with(ListenerConfig::new(), "ping");
    let request = request("POST", Some("application/json"), "ping", r#"{"zen":"str8"}"#);

    assert_eq!(status(listener.router(), request).await, StatusCode::OK);

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event.event_name(), "ping");
    assert_eq!(event.get("zen").and_then(|v| v.as_str()), Some("str8"));
    assert_eq!(
        event.get("deliveryId").and_then(|v| v.as_str()),
        Some("72d3162e-cc78-11e3-81ab-4c9367dc0958")
    );
    assert_eq!(event.get("RequestId").and_then(|v| v.as_str()), Some("292430182"));

    let raw_headers = event.raw_headers().unwrap();
    assert_eq!(
        raw_headers.get("x-github-event").and_then(|v| v.as_str()),
        Some("ping")
    );
    assert_eq!(
        raw_headers.get("content-type").and_then(|v| v.as_str()),
        Some("application/json")
    );
}

#[tokio::test]
async fn test_handlers_run_in_registration_order() {
    let listener = WebhookListener::new(ListenerConfig::new()).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    for label in ["h1", "h2"] {
        let tx = tx.clone();
        listener.on_fn("push", move |_event| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(label);
            }
        });
    }

    let other = tx.clone();
    listener.on_fn("issues", move |_event| {
        let other = other.clone();
        async move {
            let _ = other.send("issues");
        }
    });

    let request = request("POST", Some("application/json"), "push", "{}");
    assert_eq!(status(listener.router(), request).await, StatusCode::OK);

    assert_eq!(timeout(WAIT, rx.recv()).await.unwrap(), Some("h1"));
    assert_eq!(timeout(WAIT, rx.recv()).await.unwrap(), Some("h2"));
    assert!(timeout(QUIET, rx.recv()).await.is_err());
}

#[tokio::test]
async fn test_unsubscribed_event_still_succeeds() {
    let (listener, mut events) = listener_with(ListenerConfig::new(), "push");
    let request = request("POST", Some("application/json"), "star", "{}");

    assert_eq!(status(listener.router(), request).await, StatusCode::OK);
    assert_no_event(&mut events).await;
}

#[tokio::test]
async fn test_same_delivery_twice_dispatched_twice() {
    let (listener, mut events) = listener_with(ListenerConfig::new(), "push");

    for _ in 0..2 {
        let request = request("POST", Some("application/json"), "push", "{}");
        assert_eq!(status(listener.router(), request).await, StatusCode::OK);
    }

    assert!(timeout(WAIT, events.recv()).await.unwrap().is_some());
    assert!(timeout(WAIT, events.recv()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_response_does_not_wait_for_handlers() {
    let listener = WebhookListener::new(ListenerConfig::new()).unwrap();
    let (release_tx, release_rx) = oneshot::channel::<()>();
    let release_rx = Arc::new(tokio::sync::Mutex::new(Some(release_rx)));
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();

    listener.on_fn("push", move |_event| {
        let release_rx = Arc::clone(&release_rx);
        let done_tx = done_tx.clone();
        async move {
            if let Some(rx) = release_rx.lock().await.take() {
                let _ = rx.await;
            }
            let _ = done_tx.send(());
        }
    });

    let request = request("POST", Some("application/json"), "push", "{}");
    let response = timeout(WAIT, listener.router().oneshot(request))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(done_rx.try_recv().is_err());

    release_tx.send(()).unwrap();
    assert!(timeout(WAIT, done_rx.recv()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_failing_handler_does_not_affect_response() {
    let listener = WebhookListener::new(ListenerConfig::new()).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    listener.on_fn("push", |_event| async {
        panic!("subscriber bug");
    });
    listener.on_fn("push", move |_event| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(());
        }
    });

    let request = request("POST", Some("application/json"), "push", "{}");
    assert_eq!(status(listener.router(), request).await, StatusCode::OK);
    assert!(timeout(WAIT, rx.recv()).await.unwrap().is_some());
}

// ==== Socket Tests ====

async fn spawn_listener(listener: &WebhookListener) -> std::net::SocketAddr {
    let (tx, rx) = oneshot::channel();
    let server = listener.clone();

    tokio::spawn(async move {
        server
            .start(
                0,
                Some(Box::new(move |addr| {
                    let _ = tx.send(addr);
                })),
            )
            .await
    });

    rx.await.unwrap()
}

#[tokio::test]
async fn test_signed_delivery_over_socket() {
    let (listener, mut events) = listener_with(ListenerConfig::new().with_secret("topsecret"), "push");
    let addr = spawn_listener(&listener).await;

    let body = r#"{"ref":"refs/heads/main"}"#;
    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{}/webhook", addr.port()))
        .header("content-type", "application/json")
        .header("x-github-event", "push")
        .header("x-hub-signature-256", WebhookSigner::new("topsecret").sign(body.as_bytes()))
        .body(body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert!(response.bytes().await.unwrap().is_empty());

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event.get("ref").and_then(|v| v.as_str()), Some("refs/heads/main"));

    listener.shutdown();
}

fn tls_config() -> ListenerConfig {
    ListenerConfig::new().with_tls(
        include_str!("fixtures/localhost.key"),
        include_str!("fixtures/localhost.crt"),
    )
}

async fn https_ping(port: u16) -> reqwest::Response {
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap();

    client
        .post(format!("https://localhost:{}/", port))
        .header("content-type", "application/json")
        .header("x-github-event", "ping")
        .body(r#"{"zen":"str8"}"#)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_delivery_over_tls() {
    let (listener, mut events) = listener_with(tls_config(), "ping");
    let addr = spawn_listener(&listener).await;

    let response = https_ping(addr.port()).await;
    assert_eq!(response.status().as_u16(), 200);

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event.get("zen").and_then(|v| v.as_str()), Some("str8"));

    listener.shutdown();
}

#[tokio::test]
async fn test_failed_handshake_leaves_listener_serving() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let (listener, mut events) = listener_with(tls_config(), "ping");
    let addr = spawn_listener(&listener).await;

    // Plain HTTP on the TLS port
    let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", addr.port()))
        .await
        .unwrap();
    stream
        .write_all(b"POST / HTTP/1.1\r\nhost: localhost\r\ncontent-length: 2\r\n\r\n{}")
        .await
        .unwrap();

    // The server drops the connection instead of answering
    let mut buffer = Vec::new();
    let closed = timeout(WAIT, stream.read_to_end(&mut buffer)).await;
    assert!(closed.is_ok());
    assert!(!String::from_utf8_lossy(&buffer).starts_with("HTTP/1.1"));

    let response = https_ping(addr.port()).await;
    assert_eq!(response.status().as_u16(), 200);

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event.get("zen").and_then(|v| v.as_str()), Some("str8"));

    listener.shutdown();
}
