//! Session handler
//!
//! Drives one connection through `Connected -> AwaitingIdentity -> Active ->
//! Closing -> Closed`. Every fault is absorbed here; nothing a peer does can
//! reach the accept loop.

use super::state::{CloseReason, SessionState, SessionSummary};
use crate::connection::Connection;
use crate::server::RelayState;
use crate::transport::{BoxFrameStream, FrameStream};
use chat_core::{is_exit_command, ChatEvent, Identity};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

type Step = Result<SessionState, CloseReason>;

/// Per-connection control loop
pub struct SessionHandler {
    state: RelayState,
    connection: Arc<Connection>,
    reader: BoxFrameStream,
    session_state: SessionState,
    identity: Option<Identity>,
    messages_relayed: u64,
}

impl SessionHandler {
    /// Create a handler for a freshly accepted connection
    pub fn new(state: RelayState, connection: Arc<Connection>, reader: BoxFrameStream) -> Self {
        Self {
            state,
            connection,
            reader,
            session_state: SessionState::Connected,
            identity: None,
            messages_relayed: 0,
        }
    }

    /// Current lifecycle state
    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    /// Run the session to completion
    ///
    /// Always ends in `Closed`, with the connection out of the registry and
    /// its transport released.
    pub async fn run(mut self) -> SessionSummary {
        let mut close_reason = CloseReason::PeerClosed;

        while !self.session_state.is_terminal() {
            let step = match self.session_state {
                SessionState::Connected => self.greet().await,
                SessionState::AwaitingIdentity => self.await_identity().await,
                SessionState::Active => match self.identity.clone() {
                    Some(identity) => Err(self.relay(&identity).await),
                    None => Ok(SessionState::Closing),
                },
                SessionState::Closing => {
                    self.leave(&close_reason).await;
                    self.connection.shutdown().await;
                    Ok(SessionState::Closed)
                }
                SessionState::Closed => Ok(SessionState::Closed),
            };

            let next = match step {
                Ok(next) => next,
                Err(reason) => {
                    close_reason = reason;
                    SessionState::Closing
                }
            };
            self.transition(next);
        }

        SessionSummary {
            connection_id: self.connection.id(),
            identity: self.identity,
            messages_relayed: self.messages_relayed,
            close_reason,
        }
    }

    fn transition(&mut self, next: SessionState) {
        if next != self.session_state {
            tracing::trace!(
                connection_id = %self.connection.id(),
                from = %self.session_state,
                to = %next,
                "Session state change"
            );
            self.session_state = next;
        }
    }

    /// `Connected`: send the welcome text
    async fn greet(&mut self) -> Step {
        let welcome = self.state.formatter().render(&ChatEvent::Welcome);
        self.connection.send(&welcome).await?;
        Ok(SessionState::AwaitingIdentity)
    }

    /// `AwaitingIdentity`: read the identity, join, announce
    ///
    /// The join is announced only once the peer has its confirmation, so a
    /// peer that never reaches `Active` is never announced joining or leaving.
    async fn await_identity(&mut self) -> Step {
        let Some(name) = read_frame(self.reader.as_mut(), self.state.idle_timeout()).await? else {
            return Err(CloseReason::PeerClosed);
        };

        let id = self.connection.id();
        let identity = Identity::new(name);
        self.state
            .registry()
            .register(&self.connection, identity.clone())?;

        let formatter = *self.state.formatter();
        let confirmation = formatter.render(&ChatEvent::JoinConfirmed {
            identity: identity.clone(),
        });
        if let Err(e) = self.connection.send(&confirmation).await {
            self.state.registry().unregister(id);
            return Err(e.into());
        }
        self.identity = Some(identity.clone());

        tracing::info!(
            connection_id = %id,
            peer = %self.connection.peer_addr(),
            identity = %identity,
            "Joined the chat"
        );

        let notice = formatter.render(&ChatEvent::MemberJoined { identity });
        self.state.broadcaster().broadcast(&notice, Some(id)).await;

        Ok(SessionState::Active)
    }

    /// `Active`: relay frames until something ends the session
    async fn relay(&mut self, identity: &Identity) -> CloseReason {
        let connection = self.connection.clone();
        let idle_timeout = self.state.idle_timeout();

        loop {
            let frame = tokio::select! {
                biased;
                () = connection.closed() => return CloseReason::DeliveryFailed,
                frame = read_frame(self.reader.as_mut(), idle_timeout) => frame,
            };

            let text = match frame {
                Ok(Some(text)) => text,
                Ok(None) => return CloseReason::PeerClosed,
                Err(reason) => return reason,
            };

            if is_exit_command(&text) {
                return CloseReason::ExitCommand;
            }

            tracing::debug!(
                connection_id = %connection.id(),
                identity = %identity,
                len = text.len(),
                "Relaying message"
            );

            let line = self
                .state
                .formatter()
                .render(&ChatEvent::message(identity, text));
            self.state
                .broadcaster()
                .broadcast(&line, Some(connection.id()))
                .await;
            self.messages_relayed += 1;
        }
    }

    /// `Closing`: leave the registry and tell everyone who is left
    async fn leave(&mut self, reason: &CloseReason) {
        let id = self.connection.id();

        match reason.fault() {
            Some(kind) if !reason.is_expected() => tracing::warn!(
                connection_id = %id,
                fault = ?kind,
                reason = %reason,
                "Session closing on fault"
            ),
            _ => tracing::debug!(connection_id = %id, reason = %reason, "Session closing"),
        }

        let Some(identity) = self.state.registry().unregister(id) else {
            return;
        };

        tracing::info!(connection_id = %id, identity = %identity, "Left the chat");

        let notice = self
            .state
            .formatter()
            .render(&ChatEvent::MemberLeft { identity });
        self.state.broadcaster().broadcast(&notice, None).await;
    }
}

/// Read one frame, honouring the idle timeout
async fn read_frame(
    reader: &mut dyn FrameStream,
    idle_timeout: Option<Duration>,
) -> Result<Option<String>, CloseReason> {
    let frame = match idle_timeout {
        Some(limit) => timeout(limit, reader.next_frame())
            .await
            .map_err(|_| CloseReason::IdleTimeout)?,
        None => reader.next_frame().await,
    };

    Ok(frame?)
}
