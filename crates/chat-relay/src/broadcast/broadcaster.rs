//! Broadcaster
//!
//! Delivers a frame to every member of the registry except, optionally, one
//! connection. Each recipient is written to independently: a failed or slow
//! recipient is marked failed and left for its own session to tear down, and
//! never stops delivery to the others.

use crate::connection::{Member, Registry};
use chat_core::ConnectionId;
use futures::future::join_all;
use std::sync::Arc;

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Members targeted (snapshot size minus the excluded connection)
    pub recipients: usize,
    /// Deliveries that completed
    pub delivered: usize,
    /// Deliveries that failed or timed out
    pub failed: usize,
}

/// Fans frames out to registry members
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
}

impl Broadcaster {
    /// Create a broadcaster over a registry
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// The registry this broadcaster reads from
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Send `frame` to every member except `exclude`
    ///
    /// Writes run concurrently, each bounded by its connection's write
    /// timeout. Failures are logged and the failing connection is marked for
    /// teardown; they are never returned to the caller.
    pub async fn broadcast(&self, frame: &str, exclude: Option<ConnectionId>) -> BroadcastReport {
        let recipients: Vec<Member> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|member| Some(member.id()) != exclude)
            .collect();

        let deliveries = recipients.iter().map(|member| async move {
            match member.connection.send(frame).await {
                Ok(()) => true,
                Err(e) => {
                    if member.connection.mark_failed() {
                        tracing::warn!(
                            connection_id = %member.id(),
                            identity = %member.identity,
                            error = %e,
                            "Delivery failed, scheduling teardown"
                        );
                    } else {
                        tracing::debug!(
                            connection_id = %member.id(),
                            error = %e,
                            "Skipped delivery to closing connection"
                        );
                    }
                    false
                }
            }
        });

        let delivered = join_all(deliveries)
            .await
            .into_iter()
            .filter(|ok| *ok)
            .count();

        let report = BroadcastReport {
            recipients: recipients.len(),
            delivered,
            failed: recipients.len() - delivered,
        };

        tracing::trace!(
            recipients = report.recipients,
            delivered = report.delivered,
            failed = report.failed,
            "Broadcast complete"
        );

        report
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("registry", &self.registry)
            .finish()
    }
}
