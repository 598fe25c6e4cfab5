//! Value objects - immutable types that represent domain concepts

mod connection_id;
mod identity;

pub use connection_id::{ConnectionId, ConnectionIdGenerator};
pub use identity::Identity;
