//! # chat-relay
//!
//! Real-time multi-client chat relay. Peers connect, name themselves, and
//! every line they send is relayed to everyone else in the chat.
//!
//! The core (registry, broadcaster, session state machine) is transport
//! agnostic; [`transport`] provides newline-framed TCP and WebSocket.

pub mod broadcast;
pub mod connection;
pub mod server;
pub mod session;
pub mod transport;

pub use server::{run, RelayServer, RelayState};
