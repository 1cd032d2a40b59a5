use crate::engine::{Intent, Key, ScreenKind};

/// Hub menu entries in display order. `None` quits.
pub const MENU: [(&str, Option<ScreenKind>); 6] = [
    ("Comms", Some(ScreenKind::Chat)),
    ("Outfitter", Some(ScreenKind::Outfitter)),
    ("Landing Services", Some(ScreenKind::Services)),
    ("Marketplace", Some(ScreenKind::Marketplace)),
    ("Mission Board", Some(ScreenKind::Missions)),
    ("Launch (quit)", None),
];

/// Hub menu cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationState {
    /// Highlighted menu row.
    pub cursor: usize,
}

/// Hub menu actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationIntent {
    /// Move the highlight up.
    Up,
    /// Move the highlight down.
    Down,
    /// Activate the highlighted entry.
    Select,
}

/// Translate a key on the hub.
pub fn keymap(_state: &StationState, key: Key) -> Option<Intent> {
    let intent = match key {
        Key::Up | Key::Char('k') => Intent::Station(StationIntent::Up),
        Key::Down | Key::Char('j') => Intent::Station(StationIntent::Down),
        Key::Enter => Intent::Station(StationIntent::Select),
        Key::Char('q') | Key::Esc => Intent::Quit,
        Key::Char('r') => Intent::RefreshPlayer,
        Key::Char(ch @ '1'..='6') => {
            let idx = ch as usize - '1' as usize;
            match MENU[idx].1 {
                Some(kind) => Intent::Open(kind),
                None => Intent::Quit,
            }
        }
        _ => return None,
    };
    Some(intent)
}

/// Apply a hub intent; returns the intent the selection stands for.
pub(crate) fn handle(state: &mut StationState, intent: StationIntent) -> Option<Intent> {
    match intent {
        StationIntent::Up => {
            state.cursor = (state.cursor + MENU.len() - 1) % MENU.len();
            None
        }
        StationIntent::Down => {
            state.cursor = (state.cursor + 1) % MENU.len();
            None
        }
        StationIntent::Select => Some(match MENU.get(state.cursor).and_then(|entry| entry.1) {
            Some(kind) => Intent::Open(kind),
            None => Intent::Quit,
        }),
    }
}
