//! Chat events and their wire text
//!
//! Every frame the relay sends is rendered from a [`ChatEvent`] by a
//! [`MessageFormatter`].

mod chat_event;
mod formatter;

pub use chat_event::{is_exit_command, ChatEvent, EXIT_KEYWORD, WELCOME_TEXT};
pub use formatter::MessageFormatter;
