//! Relay state
//!
//! Shared dependencies handed to every session.

use crate::broadcast::Broadcaster;
use crate::connection::Registry;
use chat_common::AppConfig;
use chat_core::{ConnectionId, ConnectionIdGenerator, MessageFormatter};
use std::sync::Arc;
use std::time::Duration;

/// Relay application state
///
/// Owned by the server and cloned into each session; it lives exactly as
/// long as the server that created it.
#[derive(Clone)]
pub struct RelayState {
    /// Who is currently in the chat
    registry: Arc<Registry>,
    /// Fan-out over the registry
    broadcaster: Broadcaster,
    /// Wire text rendering
    formatter: MessageFormatter,
    /// Source of connection ids
    connection_ids: Arc<ConnectionIdGenerator>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl RelayState {
    /// Create a new relay state with an empty registry
    pub fn new(config: AppConfig) -> Self {
        let registry = Registry::new_shared();

        Self {
            broadcaster: Broadcaster::new(registry.clone()),
            registry,
            formatter: MessageFormatter::new(config.session.timestamps),
            connection_ids: Arc::new(ConnectionIdGenerator::new()),
            config: Arc::new(config),
        }
    }

    /// Get the registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Get the broadcaster
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Get the message formatter
    pub fn formatter(&self) -> &MessageFormatter {
        &self.formatter
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Allocate the id for a newly accepted connection
    pub fn next_connection_id(&self) -> ConnectionId {
        self.connection_ids.generate()
    }

    /// Per-write bound for every connection
    pub fn write_timeout(&self) -> Duration {
        self.config.session.write_timeout()
    }

    /// Silence allowed before a session is closed, if any
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.config.session.idle_timeout()
    }
}

impl std::fmt::Debug for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayState")
            .field("registry", &self.registry)
            .field("formatter", &self.formatter)
            .field("config", &"AppConfig")
            .finish()
    }
}
