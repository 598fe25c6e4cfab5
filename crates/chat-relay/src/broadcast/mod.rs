//! Message broadcasting
//!
//! Fans a frame out to every registered connection.

mod broadcaster;

pub use broadcaster::{BroadcastReport, Broadcaster};
