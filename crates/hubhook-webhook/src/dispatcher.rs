//! Event dispatch
//!
//! [`Dispatcher`] maps event names to ordered handler lists. Every handler
//! registered under an event's name is started in registration order and all
//! of them run concurrently; none waits for another to finish.

use crate::{payload::VerifiedEvent, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::{future::join_all, FutureExt};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Event handler trait
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle a verified delivery
    async fn handle(&self, event: Arc<VerifiedEvent>) -> Result<()>;

    /// Name used in logs and dispatch reports
    fn name(&self) -> &str {
        "handler"
    }
}

/// Adapts an async closure into an [`EventHandler`]
pub struct FnHandler<F> {
    name: String,
    callback: F,
}

impl<F, Fut> FnHandler<F>
where
    F: Fn(Arc<VerifiedEvent>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    pub fn new(name: &str, callback: F) -> Self {
        Self {
            name: name.to_string(),
            callback,
        }
    }
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Arc<VerifiedEvent>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, event: Arc<VerifiedEvent>) -> Result<()> {
        (self.callback)(event).await;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A handler that returned an error or panicked
#[derive(Debug, Clone)]
pub struct HandlerFailure {
    pub handler: String,
    pub error: String,
}

/// Result of dispatching one event
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Event name that was dispatched
    pub event_name: String,
    /// Number of handlers started
    pub handlers_invoked: usize,
    /// Handlers that failed
    pub failures: Vec<HandlerFailure>,
}

impl DispatchReport {
    /// Returns true if every handler completed without error
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

/// Name-keyed multi-subscriber registry
pub struct Dispatcher {
    subscriptions: DashMap<String, Vec<Arc<dyn EventHandler>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
        }
    }

    /// Register a handler for an event name.
    ///
    /// Registering again under the same name appends another handler.
    pub fn subscribe(&self, event_name: &str, handler: Arc<dyn EventHandler>) {
        info!(
            event = %event_name,
            handler = %handler.name(),
            "Registering event handler"
        );
        self.subscriptions
            .entry(event_name.to_string())
            .or_default()
            .push(handler);
    }

    /// Register an async closure for an event name
    pub fn subscribe_fn<F, Fut>(&self, event_name: &str, callback: F)
    where
        F: Fn(Arc<VerifiedEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.subscribe(event_name, Arc::new(FnHandler::new(event_name, callback)));
    }

    /// Remove every handler for an event name, returning how many were removed
    pub fn unsubscribe_all(&self, event_name: &str) -> usize {
        let removed = self
            .subscriptions
            .remove(event_name)
            .map(|(_, handlers)| handlers.len())
            .unwrap_or(0);
        if removed > 0 {
            info!(event = %event_name, removed, "Removed event handlers");
        }
        removed
    }

    pub fn handler_count(&self, event_name: &str) -> usize {
        self.subscriptions
            .get(event_name)
            .map(|handlers| handlers.len())
            .unwrap_or(0)
    }

    /// Event names with at least one handler, sorted
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .subscriptions
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    // Snapshot so no map guard is held across an await
    fn handlers_for(&self, event_name: &str) -> Vec<Arc<dyn EventHandler>> {
        self.subscriptions
            .get(event_name)
            .map(|handlers| handlers.clone())
            .unwrap_or_default()
    }

    /// Invoke every handler registered under the event's name.
    ///
    /// Handlers are first polled in registration order and then driven
    /// concurrently. Errors and panics are logged and reported, never
    /// propagated. No deduplication: dispatching the same event twice runs
    /// every handler twice.
    pub async fn dispatch(&self, event: Arc<VerifiedEvent>) -> DispatchReport {
        let event_name = event.event_name().to_string();
        let handlers = self.handlers_for(&event_name);

        if handlers.is_empty() {
            debug!(event = %event_name, "No handlers registered");
            return DispatchReport {
                event_name,
                handlers_invoked: 0,
                failures: Vec::new(),
            };
        }

        let runs = handlers.iter().map(|handler| {
            let handler = Arc::clone(handler);
            let event = Arc::clone(&event);
            async move {
                let outcome = AssertUnwindSafe(handler.handle(event)).catch_unwind().await;
                (handler, outcome)
            }
        });

        let mut failures = Vec::new();
        for (handler, outcome) in join_all(runs).await {
            let failure = match outcome {
                Ok(Ok(())) => {
                    debug!(event = %event_name, handler = %handler.name(), "Handler completed");
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("handler panicked: {}", panic_message(&*panic)),
            };

            error!(
                event = %event_name,
                handler = %handler.name(),
                error = %failure,
                "Event handler failed"
            );
            failures.push(HandlerFailure {
                handler: handler.name().to_string(),
                error: failure,
            });
        }

        DispatchReport {
            event_name,
            handlers_invoked: handlers.len(),
            failures,
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("events", &self.event_names())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
