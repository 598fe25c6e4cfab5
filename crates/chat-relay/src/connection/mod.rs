//! Connection management
//!
//! Live connections and the registry of who is currently in the chat.

mod connection;
mod registry;

pub use connection::Connection;
pub use registry::{Member, Registry, RegistryError};
