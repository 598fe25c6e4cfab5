//! # chat-core
//!
//! Domain layer for the chat relay: connection ids, display identities, and the
//! chat events that travel between sessions. This crate does no I/O.

pub mod events;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use events::{is_exit_command, ChatEvent, MessageFormatter, EXIT_KEYWORD, WELCOME_TEXT};
pub use value_objects::{ConnectionId, ConnectionIdGenerator, Identity};
