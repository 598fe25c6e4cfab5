//! Chat sessions
//!
//! One session drives one connection from accept to teardown: greeting, the
//! identity handshake, relaying, and leaving.

mod error;
mod handler;
mod state;

pub use error::{FaultKind, SessionError};
pub use handler::SessionHandler;
pub use state::{CloseReason, SessionState, SessionSummary};
