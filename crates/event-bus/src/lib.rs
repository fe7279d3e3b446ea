//! Asynchronous event bus for network lifecycle notifications.
//!
//! The orchestrator publishes a [`SystemEvent`] after each state change it
//! commits. Listeners run in registration-name order; a failing listener
//! never prevents the others from seeing the event.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use l2net_shared_types::SystemEvent;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::RwLock;

pub type EventBusResult<T> = Result<T, EventBusError>;

#[async_trait]
pub trait EventListener: Send + Sync {
    async fn on_event(&self, event: &SystemEvent) -> anyhow::Result<()>;
}

#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<RwLock<BTreeMap<String, Arc<dyn EventListener>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener under a unique name
    pub async fn register_listener<L>(
        &self,
        name: impl Into<String>,
        listener: L,
    ) -> EventBusResult<()>
    where
        L: EventListener + 'static,
    {
        let name = name.into();
        let mut guard = self.listeners.write().await;
        if guard.contains_key(&name) {
            return Err(EventBusError::ListenerExists(name));
        }

        debug!("Registered event listener '{}'", name);
        guard.insert(name, Arc::new(listener));
        Ok(())
    }

    pub async fn unregister_listener(&self, name: &str) -> EventBusResult<()> {
        let mut guard = self.listeners.write().await;
        guard
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EventBusError::ListenerNotFound(name.to_string()))
    }

    pub async fn listener_names(&self) -> Vec<String> {
        self.listeners.read().await.keys().cloned().collect()
    }

    /// Deliver an event to every listener and report the ones that failed
    pub async fn publish(&self, event: SystemEvent) -> EventBusResult<()> {
        let listeners: Vec<(String, Arc<dyn EventListener>)> = {
            let guard = self.listeners.read().await;
            guard
                .iter()
                .map(|(name, listener)| (name.clone(), Arc::clone(listener)))
                .collect()
        };

        let mut failures = Vec::new();
        for (name, listener) in listeners {
            if let Err(err) = listener.on_event(&event).await {
                warn!("Event listener '{}' failed: {}", name, err);
                failures.push(ListenerFailure {
                    listener: name,
                    error: err.to_string(),
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(EventBusError::ListenerFailures(ListenerFailureReport(
                failures,
            )))
        }
    }

    /// Publish and only log listener failures
    pub async fn notify(&self, event: SystemEvent) {
        let network_id = event.network_id().to_string();
        if let Err(err) = self.publish(event).await {
            warn!("Event for network {} not fully delivered: {}", network_id, err);
        }
    }
}

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("listener '{0}' already registered")]
    ListenerExists(String),
    #[error("listener '{0}' not found")]
    ListenerNotFound(String),
    #[error("one or more listeners failed: {0}")]
    ListenerFailures(ListenerFailureReport),
}

impl EventBusError {
    pub fn listener_failures(&self) -> Option<&[ListenerFailure]> {
        match self {
            EventBusError::ListenerFailures(report) => Some(&report.0),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListenerFailure {
    pub listener: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct ListenerFailureReport(pub Vec<ListenerFailure>);

impl fmt::Display for ListenerFailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|failure| format!("{}: {}", failure.listener, failure.error))
            .collect();
        f.write_str(&rendered.join("; "))
    }
}

/// Writes every event to the log as JSON
pub struct LogListener;

#[async_trait]
impl EventListener for LogListener {
    async fn on_event(&self, event: &SystemEvent) -> anyhow::Result<()> {
        info!("event: {}", serde_json::to_string(event)?);
        Ok(())
    }
}
