//! Chat channels, message composition and recipient routing.

mod command;
mod composer;
mod router;

use std::{collections::VecDeque, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{FactionId, PlayerId, SystemId};

pub use command::{parse_line, ChatCommand, ChatInput, HELP_LINES};
pub use composer::{sanitize, Composer, MAX_MESSAGE_LEN};
pub use router::{resolve_recipients, RouteError};

/// Entries kept in the scrollback.
pub const MAX_LOG_ENTRIES: usize = 200;

/// Channel a message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Everyone online.
    Global,
    /// Everyone in the sender's star system.
    System,
    /// Members of the sender's faction.
    Faction,
    /// One named player.
    Direct,
    /// Everyone online, for buy/sell chatter.
    Trade,
}

impl Channel {
    /// Order used when cycling with `Tab`.
    pub const ALL: [Channel; 5] = [
        Channel::Global,
        Channel::System,
        Channel::Faction,
        Channel::Direct,
        Channel::Trade,
    ];

    /// Next channel in cycling order.
    pub fn next(self) -> Channel {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Short label for the channel tab.
    pub fn label(self) -> &'static str {
        match self {
            Channel::Global => "Global",
            Channel::System => "System",
            Channel::Faction => "Faction",
            Channel::Direct => "Direct",
            Channel::Trade => "Trade",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How an entry should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    /// Ordinary message.
    Say,
    /// `/me` action.
    Emote,
    /// Locally generated notice.
    System,
}

/// One line of chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    /// Channel the line belongs to.
    pub channel: Channel,
    /// Presentation kind.
    pub kind: ChatKind,
    /// Sender, `None` for system lines.
    pub sender: Option<PlayerId>,
    /// Display name of the sender.
    pub sender_name: String,
    /// Recipient username for direct messages.
    #[serde(default)]
    pub recipient_name: Option<String>,
    /// Sanitised text.
    pub body: String,
    /// Send time.
    pub sent_at: DateTime<Utc>,
}

impl ChatEntry {
    /// Locally generated notice shown in `channel`.
    pub fn system(channel: Channel, body: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            channel,
            kind: ChatKind::System,
            sender: None,
            sender_name: "*".to_string(),
            recipient_name: None,
            body: body.into(),
            sent_at: at,
        }
    }

    /// Single-line rendering used by the log view.
    pub fn display_line(&self) -> String {
        let stamp = self.sent_at.format("%H:%M");
        match self.kind {
            ChatKind::System => format!("{stamp} * {}", self.body),
            ChatKind::Emote => format!("{stamp} [{}] * {} {}", self.channel, self.sender_name, self.body),
            ChatKind::Say => match &self.recipient_name {
                Some(recipient) => format!(
                    "{stamp} [{}] {} -> {}: {}",
                    self.channel, self.sender_name, recipient, self.body
                ),
                None => format!("{stamp} [{}] {}: {}", self.channel, self.sender_name, self.body),
            },
        }
    }
}

/// Recipient set description, resolved at send time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatTarget {
    /// Everyone online.
    Everyone,
    /// Everyone in a system.
    System(SystemId),
    /// Everyone in a faction.
    Faction(FactionId),
    /// One player by username.
    User(String),
}

/// Session-level chat state. Lives outside the screen union so scrollback
/// survives navigation.
#[derive(Debug, Clone)]
pub struct ChatState {
    /// Channel new messages go to.
    pub channel: Channel,
    /// Scrollback, oldest first.
    pub log: VecDeque<ChatEntry>,
    /// Input line state machine.
    pub composer: Composer,
    /// Username direct messages go to.
    pub dm_target: Option<String>,
    /// Lines received while the chat screen was not shown.
    pub unread: usize,
}

impl Default for ChatState {
    fn default() -> Self {
        Self {
            channel: Channel::Global,
            log: VecDeque::new(),
            composer: Composer::default(),
            dm_target: None,
            unread: 0,
        }
    }
}

impl ChatState {
    /// Append an entry, dropping the oldest beyond [`MAX_LOG_ENTRIES`].
    pub fn push(&mut self, entry: ChatEntry) {
        self.log.push_back(entry);
        while self.log.len() > MAX_LOG_ENTRIES {
            self.log.pop_front();
        }
    }

    /// Append a system notice on the active channel.
    pub fn notify(&mut self, body: impl Into<String>, at: DateTime<Utc>) {
        let entry = ChatEntry::system(self.channel, body, at);
        self.push(entry);
    }

    /// Drop the scrollback.
    pub fn clear(&mut self) {
        self.log.clear();
        self.unread = 0;
    }

    /// Advance to the next channel.
    pub fn cycle_channel(&mut self) {
        self.channel = self.channel.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_is_bounded() {
        let mut chat = ChatState::default();
        let now = Utc::now();
        for idx in 0..(MAX_LOG_ENTRIES + 5) {
            chat.notify(format!("line {idx}"), now);
        }
        assert_eq!(chat.log.len(), MAX_LOG_ENTRIES);
        assert_eq!(chat.log.front().map(|e| e.body.as_str()), Some("line 5"));
    }

    #[test]
    fn channels_cycle_back_to_global() {
        let mut chat = ChatState::default();
        for _ in 0..Channel::ALL.len() {
            chat.cycle_channel();
        }
        assert_eq!(chat.channel, Channel::Global);
    }
}
