//! Chat membership registry
//!
//! The single source of truth for who is currently in the chat. All
//! operations share one mutex, which is only ever held long enough to touch
//! the map; nothing awaits while holding it.

use super::Connection;
use chat_core::{ConnectionId, Identity};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Registry errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The connection is already registered
    #[error("Connection {0} is already registered")]
    DuplicateRegistration(ConnectionId),
}

/// A registered connection and the identity it joined with
#[derive(Debug, Clone)]
pub struct Member {
    pub connection: Arc<Connection>,
    pub identity: Identity,
}

impl Member {
    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }
}

/// Connections currently eligible to receive broadcasts
///
/// Entries are keyed by [`ConnectionId`], so snapshots come out in accept
/// order.
#[derive(Default)]
pub struct Registry {
    members: Mutex<BTreeMap<ConnectionId, Member>>,
}

impl Registry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Add a connection under its identity
    ///
    /// A connection registered twice without an `unregister` in between is
    /// rejected and the existing entry is left as it was.
    pub fn register(
        &self,
        connection: &Arc<Connection>,
        identity: Identity,
    ) -> Result<(), RegistryError> {
        let id = connection.id();
        let mut members = self.members.lock();

        if members.contains_key(&id) {
            return Err(RegistryError::DuplicateRegistration(id));
        }

        members.insert(
            id,
            Member {
                connection: connection.clone(),
                identity,
            },
        );
        drop(members);

        tracing::debug!(connection_id = %id, "Connection registered");
        Ok(())
    }

    /// Remove a connection, returning the identity it held
    ///
    /// Removing an unknown or already removed connection is a no-op.
    pub fn unregister(&self, id: ConnectionId) -> Option<Identity> {
        let removed = self.members.lock().remove(&id);

        if removed.is_some() {
            tracing::debug!(connection_id = %id, "Connection unregistered");
        }

        removed.map(|member| member.identity)
    }

    /// Copy of the current membership, in accept order
    pub fn snapshot(&self) -> Vec<Member> {
        self.members.lock().values().cloned().collect()
    }

    /// Whether a connection is registered
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.lock().contains_key(&id)
    }

    /// Identities of all members, in accept order
    pub fn identities(&self) -> Vec<Identity> {
        self.members
            .lock()
            .values()
            .map(|m| m.identity.clone())
            .collect()
    }

    /// Number of registered connections
    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    /// Whether nobody is registered
    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("members", &self.len())
            .finish()
    }
}
