//! Mission board for the current star system.

use tracing::info;

use crate::{
    capability::StoreResult,
    economy,
    engine::{ActionKey, Command, Intent, Key, SessionContext},
    error::ValidationError,
    models::{Mission, MissionId},
};

/// Offers in the system plus the player's active mission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissionBoardView {
    /// Missions on offer.
    pub available: Vec<Mission>,
    /// The mission the player is flying, if any.
    pub active: Option<Mission>,
}

/// Mission board sub-state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissionState {
    /// Missions on offer.
    pub available: Vec<Mission>,
    /// The player's active mission.
    pub active: Option<Mission>,
    /// Highlighted offer.
    pub cursor: usize,
}

impl MissionState {
    /// Offer under the cursor.
    pub fn selected(&self) -> Option<&Mission> {
        self.available.get(self.cursor)
    }
}

/// Mission board actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionIntent {
    /// Move the highlight up.
    Up,
    /// Move the highlight down.
    Down,
    /// Take an offer.
    Accept {
        /// Offer to take.
        mission: MissionId,
    },
    /// Drop the active mission.
    Abandon {
        /// The active mission.
        mission: MissionId,
    },
    /// Reload the board.
    Refresh,
}

/// Translate a key on the mission board.
pub fn keymap(state: &MissionState, key: Key) -> Option<Intent> {
    let intent = match key {
        Key::Up | Key::Char('k') => MissionIntent::Up,
        Key::Down | Key::Char('j') => MissionIntent::Down,
        Key::Enter | Key::Char('a') => MissionIntent::Accept {
            mission: state.selected()?.id,
        },
        Key::Char('x') => MissionIntent::Abandon {
            mission: state.active.as_ref()?.id,
        },
        Key::Char('r') => MissionIntent::Refresh,
        Key::Esc => return Some(Intent::Back),
        _ => return None,
    };
    Some(Intent::Missions(intent))
}

/// Board load for the player's current system unless one is outstanding.
pub(crate) fn load(ctx: &SessionContext) -> Option<Command> {
    if ctx.is_busy(ActionKey::LoadMissions) {
        return None;
    }
    Some(Command::LoadMissions {
        player: ctx.player.id,
        system: ctx.player.system_id,
    })
}

pub(crate) fn handle(
    ctx: &mut SessionContext,
    state: &mut MissionState,
    intent: MissionIntent,
) -> Result<Option<Command>, ValidationError> {
    let player = ctx.player.id;
    match intent {
        MissionIntent::Up => state.cursor = state.cursor.saturating_sub(1),
        MissionIntent::Down => {
            state.cursor = (state.cursor + 1).min(state.available.len().saturating_sub(1));
        }
        MissionIntent::Accept { mission } => {
            if state.active.is_some() {
                return Err(ValidationError::illegal(
                    "Finish or abandon your active mission first",
                ));
            }
            if !state.available.iter().any(|m| m.id == mission) {
                return Err(ValidationError::NotFound("Mission".to_string()));
            }
            ctx.ensure_idle(ActionKey::Mission)?;
            info!(%player, %mission, "Mission accept requested");
            return Ok(Some(Command::AcceptMission { player, mission }));
        }
        MissionIntent::Abandon { mission } => {
            if state.active.as_ref().map(|m| m.id) != Some(mission) {
                return Err(ValidationError::illegal("That mission is not active"));
            }
            ctx.ensure_idle(ActionKey::Mission)?;
            return Ok(Some(Command::AbandonMission { player, mission }));
        }
        MissionIntent::Refresh => {
            ctx.ensure_idle(ActionKey::LoadMissions)?;
            return Ok(load(ctx));
        }
    }
    Ok(None)
}

/// Mission board command results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionOutcome {
    /// Board read.
    Loaded(StoreResult<MissionBoardView>),
    /// Offer taken.
    Accepted(StoreResult<Mission>),
    /// Active mission dropped.
    Abandoned(StoreResult<Mission>),
}

impl MissionOutcome {
    pub(crate) fn action_key(&self) -> ActionKey {
        match self {
            MissionOutcome::Loaded(_) => ActionKey::LoadMissions,
            MissionOutcome::Accepted(_) | MissionOutcome::Abandoned(_) => ActionKey::Mission,
        }
    }
}

pub(crate) fn on_outcome(
    ctx: &mut SessionContext,
    state: Option<&mut MissionState>,
    outcome: MissionOutcome,
) {
    match outcome {
        MissionOutcome::Loaded(Ok(view)) => {
            if let Some(state) = state {
                state.available = view.available;
                state.active = view.active;
                state.cursor = state.cursor.min(state.available.len().saturating_sub(1));
            }
        }
        MissionOutcome::Loaded(Err(err)) => ctx.fail(format!("Could not load missions: {err}")),
        MissionOutcome::Accepted(Ok(mission)) => {
            ctx.info(format!(
                "Accepted '{}' for {} cr",
                mission.title,
                economy::format_credits(mission.reward)
            ));
            if let Some(state) = state {
                state.available.retain(|m| m.id != mission.id);
                state.cursor = state.cursor.min(state.available.len().saturating_sub(1));
                state.active = Some(mission);
            }
        }
        MissionOutcome::Accepted(Err(err)) => ctx.fail(format!("Could not accept mission: {err}")),
        MissionOutcome::Abandoned(Ok(mission)) => {
            ctx.info(format!("Abandoned '{}'", mission.title));
            if let Some(state) = state {
                state.active = None;
            }
        }
        MissionOutcome::Abandoned(Err(err)) => {
            ctx.fail(format!("Could not abandon mission: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MissionStatus;
    use uuid::Uuid;

    fn offer(title: &str) -> Mission {
        Mission {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            reward: 2_000,
            origin: 1,
            destination: 2,
            status: MissionStatus::Available,
            assignee: None,
        }
    }

    #[test]
    fn abandon_key_needs_an_active_mission() {
        let mut state = MissionState {
            available: vec![offer("Ore run")],
            ..MissionState::default()
        };
        assert_eq!(keymap(&state, Key::Char('x')), None);
        state.active = Some(offer("Courier job"));
        let id = state.active.as_ref().map(|m| m.id).unwrap();
        assert_eq!(
            keymap(&state, Key::Char('x')),
            Some(Intent::Missions(MissionIntent::Abandon { mission: id }))
        );
    }
}
