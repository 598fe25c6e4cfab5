//! Events produced over the lifetime of a chat session

use crate::value_objects::Identity;

/// Keyword a client sends to leave the chat (matched case-insensitively)
pub const EXIT_KEYWORD: &str = "exit";

/// Greeting sent to every peer as soon as its connection is accepted
pub const WELCOME_TEXT: &str = "Welcome to the chat! Type 'exit' to quit.";

/// Check whether an inbound frame is the exit keyword
///
/// Only the exact keyword matches, in any ASCII case. Surrounding whitespace
/// makes it an ordinary message.
pub fn is_exit_command(frame: &str) -> bool {
    frame.eq_ignore_ascii_case(EXIT_KEYWORD)
}

/// Something the relay tells its peers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Greeting sent directly to a freshly accepted peer
    Welcome,

    /// Direct confirmation to a peer that completed the handshake
    JoinConfirmed { identity: Identity },

    /// Broadcast to everyone else when a peer joins
    MemberJoined { identity: Identity },

    /// A chat line relayed from a peer
    Message { identity: Identity, body: String },

    /// Broadcast to the remaining peers when a peer leaves
    MemberLeft { identity: Identity },
}

impl ChatEvent {
    /// Create a chat line event
    pub fn message(identity: &Identity, body: impl Into<String>) -> Self {
        Self::Message {
            identity: identity.clone(),
            body: body.into(),
        }
    }
}
