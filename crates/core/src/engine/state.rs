use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};

use super::command::ActionKey;
use crate::{
    chat::ChatState,
    error::ValidationError,
    models::{Player, Ship, ShipType},
    screens::{MarketState, MissionState, OutfitterState, ServicesState, StationState},
};

/// Screen selector without its sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenKind {
    /// Station hub menu.
    Station,
    /// Chat channels.
    Chat,
    /// Equipment shop and loadouts.
    Outfitter,
    /// Refuel and repair.
    Services,
    /// Auctions, contracts and bounties.
    Marketplace,
    /// Mission board.
    Missions,
}

impl ScreenKind {
    /// Title shown in the header.
    pub fn title(self) -> &'static str {
        match self {
            ScreenKind::Station => "Station",
            ScreenKind::Chat => "Comms",
            ScreenKind::Outfitter => "Outfitter",
            ScreenKind::Services => "Landing Services",
            ScreenKind::Marketplace => "Marketplace",
            ScreenKind::Missions => "Mission Board",
        }
    }
}

/// Active screen together with its sub-state. Only the active screen's
/// state exists.
#[derive(Debug, Clone)]
pub enum Screen {
    /// Hub menu.
    Station(StationState),
    /// Chat; its state lives at session level.
    Chat,
    /// Outfitter.
    Outfitter(OutfitterState),
    /// Landing services.
    Services(ServicesState),
    /// Marketplace.
    Marketplace(MarketState),
    /// Missions.
    Missions(MissionState),
}

impl Screen {
    /// Selector of this screen.
    pub fn kind(&self) -> ScreenKind {
        match self {
            Screen::Station(_) => ScreenKind::Station,
            Screen::Chat => ScreenKind::Chat,
            Screen::Outfitter(_) => ScreenKind::Outfitter,
            Screen::Services(_) => ScreenKind::Services,
            Screen::Marketplace(_) => ScreenKind::Marketplace,
            Screen::Missions(_) => ScreenKind::Missions,
        }
    }
}

/// Severity of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Success report.
    Info,
    /// Local validation failure, shown inline.
    Warning,
    /// Remote failure, shown as a dialog until the next key.
    Error,
}

/// One-line status shown under the active screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Text to show.
    pub text: String,
}

/// Tunables the transition function reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Marketplace auto-refresh period.
    pub refresh_interval: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::seconds(30),
        }
    }
}

/// Everything the session owns apart from the active screen.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Local player snapshot; the only copy the session mutates.
    pub player: Player,
    /// Active ship snapshot.
    pub ship: Ship,
    /// Catalog entry of the active ship.
    pub ship_type: ShipType,
    /// Chat scrollback and composer.
    pub chat: ChatState,
    /// Current status line.
    pub notice: Option<Notice>,
    /// Actions with a command outstanding.
    pub in_flight: BTreeSet<ActionKey>,
    /// Session clock, advanced by ticks.
    pub now: DateTime<Utc>,
    /// When the pilot record was last read back from the store.
    pub last_sync: DateTime<Utc>,
    /// Tunables.
    pub settings: SessionSettings,
}

impl SessionContext {
    /// Refuse to start `key` while a previous request for it is outstanding.
    ///
    /// Balance-moving actions share one slot: none starts while any other
    /// is still running.
    pub fn ensure_idle(&self, key: ActionKey) -> Result<(), ValidationError> {
        let blocking = if key.moves_credits() {
            self.in_flight.iter().find(|k| k.moves_credits())
        } else {
            self.in_flight.get(&key)
        };
        match blocking {
            Some(busy) => Err(ValidationError::Busy(busy.label())),
            None => Ok(()),
        }
    }

    /// Whether no command that reads or writes the balance is outstanding.
    pub fn credits_settled(&self) -> bool {
        !self.in_flight.iter().any(|k| k.moves_credits())
    }

    /// Whether a command for `key` is outstanding.
    pub fn is_busy(&self, key: ActionKey) -> bool {
        self.in_flight.contains(&key)
    }

    /// Show a success line.
    pub fn info(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            level: NoticeLevel::Info,
            text: text.into(),
        });
    }

    /// Show an inline validation failure.
    pub fn warn(&mut self, error: &ValidationError) {
        self.notice = Some(Notice {
            level: NoticeLevel::Warning,
            text: error.to_string(),
        });
    }

    /// Show an error dialog.
    pub fn fail(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            level: NoticeLevel::Error,
            text: text.into(),
        });
    }

    /// Whether an error dialog is up.
    pub fn has_dialog(&self) -> bool {
        matches!(
            self.notice,
            Some(Notice {
                level: NoticeLevel::Error,
                ..
            })
        )
    }
}

/// Complete in-memory state of one player's session.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Session-wide data.
    pub ctx: SessionContext,
    /// Active screen.
    pub screen: Screen,
    /// Set once the player asks to leave.
    pub should_quit: bool,
}

impl SessionState {
    /// Fresh session parked at the station hub.
    pub fn new(
        player: Player,
        mut ship: Ship,
        ship_type: ShipType,
        settings: SessionSettings,
        now: DateTime<Utc>,
    ) -> Self {
        ship.clamp_to(&ship_type);
        Self {
            ctx: SessionContext {
                player,
                ship,
                ship_type,
                chat: ChatState::default(),
                notice: None,
                in_flight: BTreeSet::new(),
                now,
                last_sync: now,
                settings,
            },
            screen: Screen::Station(StationState::default()),
            should_quit: false,
        }
    }

    /// Active screen selector.
    pub fn screen_kind(&self) -> ScreenKind {
        self.screen.kind()
    }

    /// Outfitter sub-state when that screen is active.
    pub fn outfitter(&self) -> Option<&OutfitterState> {
        match &self.screen {
            Screen::Outfitter(state) => Some(state),
            _ => None,
        }
    }

    /// Services sub-state when that screen is active.
    pub fn services(&self) -> Option<&ServicesState> {
        match &self.screen {
            Screen::Services(state) => Some(state),
            _ => None,
        }
    }

    /// Marketplace sub-state when that screen is active.
    pub fn market(&self) -> Option<&MarketState> {
        match &self.screen {
            Screen::Marketplace(state) => Some(state),
            _ => None,
        }
    }

    /// Missions sub-state when that screen is active.
    pub fn missions(&self) -> Option<&MissionState> {
        match &self.screen {
            Screen::Missions(state) => Some(state),
            _ => None,
        }
    }
}
