use std::time::{Duration, Instant};

/// How long a status message stays live before its scheduled clear fires.
pub const STATUS_TTL: Duration = Duration::from_secs(2);

/// Identity of an issued status message; ids only ever increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub id: MessageId,
    pub text: String,
    pub issued_at: Instant,
}

/// Single-slot, most-recent-wins status line
///
/// Not a queue: a newer message replaces the live one and the older text is
/// never shown again. Clears are keyed by id so a timer scheduled for a
/// superseded message is a no-op even when both messages share the same text.
#[derive(Debug, Default)]
pub struct StatusBoard {
    live: Option<StatusMessage>,
    next_id: u64,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, text: impl Into<String>, now: Instant) -> MessageId {
        self.next_id += 1;
        let id = MessageId(self.next_id);
        let text = text.into();
        tracing::debug!("Status #{}: {}", id.0, text);
        self.live = Some(StatusMessage {
            id,
            text,
            issued_at: now,
        });
        id
    }

    /// Clear the live message only if it is still the one identified by `id`.
    pub fn clear_if_current(&mut self, id: MessageId) -> bool {
        match &self.live {
            Some(message) if message.id == id => {
                self.live = None;
                true
            }
            _ => false,
        }
    }

    pub fn current(&self) -> Option<&StatusMessage> {
        self.live.as_ref()
    }

    /// Live text, or an empty string when nothing is displayed
    pub fn text(&self) -> &str {
        self.live.as_ref().map_or("", |m| m.text.as_str())
    }
}
