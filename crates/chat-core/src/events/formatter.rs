//! Renders chat events into the text frames peers receive

use super::chat_event::{ChatEvent, WELCOME_TEXT};
use chrono::{Local, NaiveDateTime};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Turns [`ChatEvent`]s into wire text
///
/// The plain style is `"<identity>: <message>"`, `"<identity> joined the chat!"`
/// and so on. With timestamps enabled every identity-bearing line also carries
/// the local time the relay produced it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageFormatter {
    timestamps: bool,
}

impl MessageFormatter {
    /// Formatter producing the plain protocol text
    #[must_use]
    pub const fn plain() -> Self {
        Self { timestamps: false }
    }

    /// Formatter stamping lines with the local time
    #[must_use]
    pub const fn timestamped() -> Self {
        Self { timestamps: true }
    }

    /// Create a formatter, stamping lines when `timestamps` is set
    #[must_use]
    pub const fn new(timestamps: bool) -> Self {
        Self { timestamps }
    }

    /// Whether lines carry timestamps
    pub const fn timestamps(&self) -> bool {
        self.timestamps
    }

    /// Render an event using the current local time
    pub fn render(&self, event: &ChatEvent) -> String {
        self.render_at(event, Local::now().naive_local())
    }

    /// Render an event as if produced at `at`
    pub fn render_at(&self, event: &ChatEvent, at: NaiveDateTime) -> String {
        if !self.timestamps {
            return match event {
                ChatEvent::Welcome => WELCOME_TEXT.to_string(),
                ChatEvent::JoinConfirmed { .. } => "You joined the chat!".to_string(),
                ChatEvent::MemberJoined { identity } => format!("{identity} joined the chat!"),
                ChatEvent::Message { identity, body } => format!("{identity}: {body}"),
                ChatEvent::MemberLeft { identity } => format!("{identity} left the chat!"),
            };
        }

        let ts = at.format(TIMESTAMP_FORMAT);
        match event {
            ChatEvent::Welcome => WELCOME_TEXT.to_string(),
            ChatEvent::JoinConfirmed { identity } => {
                format!("Welcome, {identity}! You joined the chat at {ts}.")
            }
            ChatEvent::MemberJoined { identity } => format!("{identity} joined the chat at {ts}!"),
            ChatEvent::Message { identity, body } => format!("{identity} at {ts}: {body}"),
            ChatEvent::MemberLeft { identity } => format!("{identity} left the chat at {ts}!"),
        }
    }
}
