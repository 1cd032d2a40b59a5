use chrono::{DateTime, Utc};

use super::{command::Compensation, state::ScreenKind, ActionKey};
use crate::{
    capability::StoreResult,
    chat::ChatEntry,
    models::{Player, Ship},
    screens::{
        ChatIntent, ChatOutcome, MarketIntent, MarketOutcome, MissionIntent, MissionOutcome,
        OutfitterIntent, OutfitterOutcome, ServiceOutcome, ServicesIntent, StationIntent,
    },
};

/// Terminal-independent key press.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Esc,
    Tab,
    BackTab,
    Backspace,
    Char(char),
}

/// What a key press means on the current screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Switch to a screen.
    Open(ScreenKind),
    /// Leave the current screen for the hub.
    Back,
    /// End the session.
    Quit,
    /// Re-read the player and ship records.
    RefreshPlayer,
    /// Hub menu.
    Station(StationIntent),
    /// Chat.
    Chat(ChatIntent),
    /// Outfitter.
    Outfitter(OutfitterIntent),
    /// Landing services.
    Services(ServicesIntent),
    /// Marketplace.
    Market(MarketIntent),
    /// Missions.
    Missions(MissionIntent),
}

/// Result of a command, tagged by the workflow that scheduled it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Fresh player and ship records.
    PlayerRefreshed(StoreResult<(Player, Ship)>),
    /// Outfitter reads and writes.
    Outfitter(OutfitterOutcome),
    /// Station service persistence.
    Services(ServiceOutcome),
    /// Marketplace reads and writes.
    Market(MarketOutcome),
    /// Mission board reads and writes.
    Missions(MissionOutcome),
    /// Chat delivery.
    Chat(ChatOutcome),
    /// A compensating write finished.
    Compensated {
        /// What was undone.
        compensation: Compensation,
        /// Whether the undo reached the store.
        result: StoreResult<()>,
    },
}

impl Outcome {
    /// In-flight key released by this outcome.
    pub fn action_key(&self) -> Option<ActionKey> {
        match self {
            Outcome::PlayerRefreshed(_) => Some(ActionKey::RefreshPlayer),
            Outcome::Outfitter(outcome) => Some(outcome.action_key()),
            Outcome::Services(_) => Some(ActionKey::Service),
            Outcome::Market(outcome) => Some(outcome.action_key()),
            Outcome::Missions(outcome) => Some(outcome.action_key()),
            Outcome::Compensated { .. } => Some(ActionKey::Compensate),
            Outcome::Chat(_) => None,
        }
    }
}

/// Input to the transition function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Clock advance.
    Tick(DateTime<Utc>),
    /// Raw key press.
    Key(Key),
    /// Jump straight to a screen.
    Navigate(ScreenKind),
    /// Already-interpreted player action.
    Intent(Intent),
    /// Command result.
    Result(Outcome),
    /// Chat line delivered by someone else.
    ChatReceived(ChatEntry),
}
