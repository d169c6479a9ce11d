//! Network listener
//!
//! [`WebhookListener`] owns the subscriber registry and serves the receiver
//! pipeline on a TCP port, over TLS when a key and certificate are configured.

use crate::{
    dispatcher::{Dispatcher, EventHandler},
    inbound::{create_webhook_router, WebhookReceiver},
    payload::VerifiedEvent,
    settings::ListenerConfig,
    tls, Result,
};
use axum::Router;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use rustls::ServerConfig;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tower::Service;
use tracing::{debug, info, warn};

/// Pause after a failed accept, matching `axum::serve`
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Invoked once with the bound address, after the socket is listening
pub type ReadyCallback = Box<dyn FnOnce(SocketAddr) + Send>;

/// Webhook listener
#[derive(Clone)]
pub struct WebhookListener {
    config: Arc<ListenerConfig>,
    dispatcher: Arc<Dispatcher>,
    receiver: Arc<WebhookReceiver>,
    tls: Option<Arc<ServerConfig>>,
    shutdown: CancellationToken,
}

impl WebhookListener {
    /// Create a listener. TLS material is parsed here so bad PEM fails early.
    pub fn new(config: ListenerConfig) -> Result<Self> {
        let tls = match config.tls_identity() {
            Some((key, cert)) => Some(tls::server_config(key, cert)?),
            None => None,
        };

        let dispatcher = Arc::new(Dispatcher::new());
        let receiver = Arc::new(WebhookReceiver::new(&config, Arc::clone(&dispatcher)));

        Ok(Self {
            config: Arc::new(config),
            dispatcher,
            receiver,
            tls,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Subscribe a handler to an event name
    pub fn on(&self, event_name: &str, handler: Arc<dyn EventHandler>) {
        self.dispatcher.subscribe(event_name, handler);
    }

    /// Subscribe an async closure to an event name
    pub fn on_fn<F, Fut>(&self, event_name: &str, callback: F)
    where
        F: Fn(Arc<VerifiedEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.dispatcher.subscribe_fn(event_name, callback);
    }

    /// The receiver pipeline as an axum router
    pub fn router(&self) -> Router {
        create_webhook_router(Arc::clone(&self.receiver))
    }

    /// Bind `0.0.0.0:port` and serve until [`shutdown`](Self::shutdown) is called.
    ///
    /// `ready` runs once the socket is bound; port `0` picks a free port and
    /// the callback receives the actual address.
    pub async fn start(&self, port: u16, ready: Option<ReadyCallback>) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        info!(
            addr = %local_addr,
            tls = self.tls.is_some(),
            verifies_signatures = self.receiver.verifies_signatures(),
            "Webhook listener started"
        );

        if let Some(ready) = ready {
            ready(local_addr);
        }

        self.serve(listener).await
    }

    /// Serve on an already-bound socket
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        match &self.tls {
            Some(tls) => self.serve_tls(listener, Arc::clone(tls)).await,
            None => self.serve_plain(listener).await,
        }
    }

    /// Stop accepting connections; `start` returns once the accept loop exits
    pub fn shutdown(&self) {
        info!("Webhook listener shutting down");
        self.shutdown.cancel();
    }

    async fn serve_plain(&self, listener: TcpListener) -> Result<()> {
        axum::serve(listener, self.router().into_make_service())
            .with_graceful_shutdown(self.shutdown.clone().cancelled_owned())
            .await?;
        Ok(())
    }

    async fn serve_tls(&self, listener: TcpListener, tls: Arc<ServerConfig>) -> Result<()> {
        let acceptor = TlsAcceptor::from(tls);
        let router = self.router();

        loop {
            let Some((stream, peer)) =
                accept_with_backoff(&self.shutdown, || listener.accept()).await
            else {
                break;
            };

            let acceptor = acceptor.clone();
            let router = router.clone();

            tokio::spawn(async move {
                // A failed handshake only drops this connection
                let stream = match acceptor.accept(stream).await {
                    Ok(stream) => stream,
                    Err(e) => {
                        debug!(peer = %peer, error = %e, "TLS handshake failed");
                        return;
                    }
                };

                let service = hyper::service::service_fn(move |request: hyper::Request<Incoming>| {
                    router.clone().call(request)
                });

                if let Err(e) = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                    .serve_connection_with_upgrades(TokioIo::new(stream), service)
                    .await
                {
                    debug!(peer = %peer, error = %e, "Connection closed with error");
                }
            });
        }

        Ok(())
    }
}

/// Wait for the next connection, pausing after accept errors.
///
/// Returns `None` once `shutdown` is cancelled, including during a pause.
async fn accept_with_backoff<T, F, Fut>(shutdown: &CancellationToken, mut accept: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<T>>,
{
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => return None,
            accepted = accept() => accepted,
        };

        match accepted {
            Ok(conn) => return Some(conn),
            Err(e) => {
                // Errors such as EMFILE repeat until a descriptor frees up
                warn!(error = %e, "Failed to accept connection");
                tokio::select! {
                    _ = shutdown.cancelled() => return None,
                    _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => {}
                }
            }
        }
    }
}

impl std::fmt::Debug for WebhookListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookListener")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
