//! The transition function.
//!
//! `update` is total over every (screen, message) pair: screen intents that
//! arrive for a screen that is no longer shown are logged and dropped, and
//! command results are applied to whatever state exists when they land.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use super::{
    command::Compensation,
    message::{Intent, Key, Message, Outcome},
    state::{Screen, ScreenKind, SessionContext, SessionState},
    ActionKey, Command,
};
use crate::{
    chat::ChatEntry,
    error::ValidationError,
    models::EquipmentCategory,
    screens::{
        chat, marketplace, missions, outfitter, services, station, MarketState, MissionState,
        OutfitterState, ServicesState, StationState,
    },
};

/// Pure transition: consume a state and a message, return the next state and
/// at most one command to run.
pub fn transition(mut state: SessionState, message: Message) -> (SessionState, Option<Command>) {
    let command = update(&mut state, message);
    (state, command)
}

/// In-place form of [`transition`].
pub fn update(state: &mut SessionState, message: Message) -> Option<Command> {
    let command = match message {
        Message::Tick(now) => on_tick(state, now),
        Message::Key(key) => on_key(state, key),
        Message::Navigate(kind) => enter_screen(state, kind),
        Message::Intent(intent) => apply_intent(state, intent),
        Message::Result(outcome) => on_result(state, outcome),
        Message::ChatReceived(entry) => {
            on_chat_received(state, entry);
            None
        }
    };
    if let Some(command) = &command {
        if let Some(key) = command.action_key() {
            state.ctx.in_flight.insert(key);
        }
        debug!(command = command.name(), "Command scheduled");
    }
    command
}

fn on_tick(state: &mut SessionState, now: DateTime<Utc>) -> Option<Command> {
    if now > state.ctx.now {
        state.ctx.now = now;
    }
    let command = match &mut state.screen {
        Screen::Marketplace(market) => marketplace::on_tick(&state.ctx, market),
        _ => None,
    };
    command.or_else(|| reconcile(&mut state.ctx))
}

/// Re-read the pilot record on the refresh interval once no balance change
/// is outstanding, so balance moves made elsewhere reach the local copy.
fn reconcile(ctx: &mut SessionContext) -> Option<Command> {
    if !ctx.credits_settled() || ctx.now - ctx.last_sync < ctx.settings.refresh_interval {
        return None;
    }
    ctx.last_sync = ctx.now;
    debug!(player = %ctx.player.id, "Reconciling pilot record");
    Some(Command::RefreshPlayer {
        player: ctx.player.id,
        ship: ctx.ship.id,
    })
}

fn on_key(state: &mut SessionState, key: Key) -> Option<Command> {
    if state.ctx.has_dialog() {
        state.ctx.notice = None;
        return None;
    }
    state.ctx.notice = None;
    let intent = match &state.screen {
        Screen::Station(menu) => station::keymap(menu, key),
        Screen::Chat => chat::keymap(&state.ctx.chat, key),
        Screen::Outfitter(shop) => outfitter::keymap(shop, key),
        Screen::Services(services) => services::keymap(services, key),
        Screen::Marketplace(market) => marketplace::keymap(market, key),
        Screen::Missions(board) => missions::keymap(board, key),
    }?;
    apply_intent(state, intent)
}

fn apply_intent(state: &mut SessionState, intent: Intent) -> Option<Command> {
    match intent {
        Intent::Open(kind) => enter_screen(state, kind),
        Intent::Back => {
            if state.screen_kind() == ScreenKind::Station {
                return None;
            }
            enter_screen(state, ScreenKind::Station)
        }
        Intent::Quit => {
            info!(player = %state.ctx.player.id, "Session ending");
            state.should_quit = true;
            None
        }
        Intent::RefreshPlayer => {
            let ctx = &mut state.ctx;
            let result = ctx.ensure_idle(ActionKey::RefreshPlayer).map(|()| {
                Some(Command::RefreshPlayer {
                    player: ctx.player.id,
                    ship: ctx.ship.id,
                })
            });
            checked(ctx, result)
        }
        Intent::Station(intent) => {
            let Screen::Station(menu) = &mut state.screen else {
                return ignored(ScreenKind::Station, state.screen_kind());
            };
            let next = station::handle(menu, intent)?;
            apply_intent(state, next)
        }
        Intent::Chat(intent) => chat::handle(&mut state.ctx, intent),
        Intent::Outfitter(intent) => {
            let Screen::Outfitter(shop) = &mut state.screen else {
                return ignored(ScreenKind::Outfitter, state.screen_kind());
            };
            let result = outfitter::handle(&mut state.ctx, shop, intent);
            checked(&mut state.ctx, result)
        }
        Intent::Services(intent) => {
            let Screen::Services(menu) = &mut state.screen else {
                return ignored(ScreenKind::Services, state.screen_kind());
            };
            let result = services::handle(&mut state.ctx, menu, intent);
            checked(&mut state.ctx, result)
        }
        Intent::Market(intent) => {
            let Screen::Marketplace(market) = &mut state.screen else {
                return ignored(ScreenKind::Marketplace, state.screen_kind());
            };
            let result = marketplace::handle(&mut state.ctx, market, intent);
            checked(&mut state.ctx, result)
        }
        Intent::Missions(intent) => {
            let Screen::Missions(board) = &mut state.screen else {
                return ignored(ScreenKind::Missions, state.screen_kind());
            };
            let result = missions::handle(&mut state.ctx, board, intent);
            checked(&mut state.ctx, result)
        }
    }
}

fn checked(
    ctx: &mut SessionContext,
    result: Result<Option<Command>, ValidationError>,
) -> Option<Command> {
    match result {
        Ok(command) => command,
        Err(err) => {
            debug!(%err, "Action rejected locally");
            ctx.warn(&err);
            None
        }
    }
}

fn ignored(wanted: ScreenKind, active: ScreenKind) -> Option<Command> {
    debug!(?wanted, ?active, "Dropping intent for inactive screen");
    None
}

/// Swap in a fresh sub-state for `kind` and issue its initial load.
fn enter_screen(state: &mut SessionState, kind: ScreenKind) -> Option<Command> {
    if state.screen_kind() == kind {
        return None;
    }
    let ctx = &mut state.ctx;
    let (screen, command) = match kind {
        ScreenKind::Station => (Screen::Station(StationState::default()), None),
        ScreenKind::Chat => {
            ctx.chat.unread = 0;
            (Screen::Chat, None)
        }
        ScreenKind::Outfitter => {
            let shop = OutfitterState::new(EquipmentCategory::Weapon);
            let command = (!ctx.is_busy(ActionKey::LoadOutfitter)).then(|| {
                Command::OpenOutfitter {
                    player: ctx.player.id,
                    category: shop.category,
                }
            });
            (Screen::Outfitter(shop), command)
        }
        ScreenKind::Services => (Screen::Services(ServicesState::default()), None),
        ScreenKind::Marketplace => {
            let market = MarketState::default();
            let command = marketplace::load(ctx, &market);
            (Screen::Marketplace(market), command)
        }
        ScreenKind::Missions => (Screen::Missions(MissionState::default()), missions::load(ctx)),
    };
    info!(from = ?state.screen_kind(), to = ?kind, "Screen changed");
    state.screen = screen;
    command
}

fn on_result(state: &mut SessionState, outcome: Outcome) -> Option<Command> {
    if let Some(key) = outcome.action_key() {
        state.ctx.in_flight.remove(&key);
    }
    let ctx = &mut state.ctx;
    match outcome {
        Outcome::PlayerRefreshed(Ok((player, mut ship))) => {
            ship.clamp_to(&ctx.ship_type);
            ctx.player = player;
            ctx.ship = ship;
            ctx.last_sync = ctx.now;
            None
        }
        Outcome::PlayerRefreshed(Err(err)) => {
            ctx.fail(format!("Could not refresh pilot records: {err}"));
            None
        }
        Outcome::Outfitter(outcome) => {
            let shop = match &mut state.screen {
                Screen::Outfitter(shop) => Some(shop),
                _ => None,
            };
            outfitter::on_outcome(ctx, shop, outcome)
        }
        Outcome::Services(outcome) => services::on_outcome(ctx, outcome),
        Outcome::Market(outcome) => {
            let market = match &mut state.screen {
                Screen::Marketplace(market) => Some(market),
                _ => None,
            };
            marketplace::on_outcome(ctx, market, outcome)
        }
        Outcome::Missions(outcome) => {
            let board = match &mut state.screen {
                Screen::Missions(board) => Some(board),
                _ => None,
            };
            missions::on_outcome(ctx, board, outcome);
            None
        }
        Outcome::Chat(outcome) => {
            chat::on_outcome(ctx, outcome);
            None
        }
        Outcome::Compensated {
            compensation,
            result,
        } => {
            match result {
                Ok(()) => info!(?compensation, "Compensating write applied"),
                Err(err) => {
                    error!(?compensation, %err, "Compensating write failed");
                    let what = match compensation {
                        Compensation::RestoreShip { .. } => "ship record",
                        Compensation::RefundCredits { .. } => "credit balance",
                    };
                    ctx.fail(format!(
                        "Could not restore the stored {what}: {err}. Stored and local values may differ."
                    ));
                }
            }
            None
        }
    }
}

fn on_chat_received(state: &mut SessionState, entry: ChatEntry) {
    state.ctx.chat.push(entry);
    if state.screen_kind() != ScreenKind::Chat {
        state.ctx.chat.unread += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chat::Channel,
        engine::{NoticeLevel, SessionSettings},
        models::{Player, Ship, ShipType},
        screens::{ServicesIntent, ServiceKind},
    };
    use std::collections::HashMap;
    use uuid::Uuid;

    fn session(credits: i64, fuel: u32) -> SessionState {
        let player_id = Uuid::new_v4();
        let ship_id = Uuid::new_v4();
        let player = Player {
            id: player_id,
            username: "pilot".into(),
            credits,
            faction: None,
            reputation: HashMap::new(),
            system_id: 1,
            ship_id,
        };
        let ship = Ship {
            id: ship_id,
            owner: player_id,
            name: "Kestrel".into(),
            ship_type: "courier".into(),
            hull: 90,
            shields: 50,
            fuel,
            cargo: 0,
        };
        let ty = ShipType {
            id: "courier".into(),
            name: "Courier".into(),
            max_hull: 100,
            max_shields: 50,
            max_fuel: 200,
            max_cargo: 20,
            slots: Vec::new(),
        };
        SessionState::new(player, ship, ty, SessionSettings::default(), Utc::now())
    }

    fn services(state: &mut SessionState) {
        update(state, Message::Navigate(ScreenKind::Services));
        assert_eq!(state.screen_kind(), ScreenKind::Services);
    }

    #[test]
    fn full_tank_schedules_nothing() {
        let mut state = session(1_000, 200);
        services(&mut state);
        let command = update(
            &mut state,
            Message::Intent(Intent::Services(ServicesIntent::Buy(ServiceKind::Refuel))),
        );
        assert_eq!(command, None);
        let notice = state.ctx.notice.clone().unwrap();
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert!(notice.text.contains("already full"));
        assert_eq!(state.ctx.player.credits, 1_000);
    }

    #[test]
    fn second_request_is_refused_while_first_is_in_flight() {
        let mut state = session(1_000, 150);
        services(&mut state);
        let buy = Message::Intent(Intent::Services(ServicesIntent::Buy(ServiceKind::Refuel)));
        assert!(matches!(
            update(&mut state, buy),
            Some(Command::PersistService(_))
        ));
        assert!(state.ctx.is_busy(ActionKey::Service));
        assert_eq!(
            update(
                &mut state,
                Message::Intent(Intent::Services(ServicesIntent::Buy(ServiceKind::RepairHull)))
            ),
            None
        );
        let notice = state.ctx.notice.clone().unwrap();
        assert!(notice.text.starts_with("Still processing"));
        assert_eq!(state.ctx.ship.hull, 90);
    }

    #[test]
    fn service_waits_for_an_outstanding_purchase() {
        let mut state = session(1_000, 150);
        services(&mut state);
        state.ctx.in_flight.insert(ActionKey::Purchase);
        let command = update(
            &mut state,
            Message::Intent(Intent::Services(ServicesIntent::Buy(ServiceKind::Refuel))),
        );
        assert_eq!(command, None);
        let notice = state.ctx.notice.clone().unwrap();
        assert_eq!(notice.text, "Still processing the previous purchase request");
        assert_eq!(state.ctx.player.credits, 1_000);
        assert_eq!(state.ctx.ship.fuel, 150);
    }

    #[test]
    fn idle_ticks_reconcile_on_the_refresh_interval() {
        let mut state = session(1_000, 150);
        let start = state.ctx.now;
        assert_eq!(
            update(&mut state, Message::Tick(start + chrono::Duration::seconds(10))),
            None
        );
        let command = update(&mut state, Message::Tick(start + chrono::Duration::seconds(31)));
        assert!(matches!(command, Some(Command::RefreshPlayer { .. })));
        assert!(state.ctx.is_busy(ActionKey::RefreshPlayer));
        assert_eq!(
            update(&mut state, Message::Tick(start + chrono::Duration::seconds(90))),
            None
        );
    }

    #[test]
    fn no_reconcile_while_a_balance_write_is_outstanding() {
        let mut state = session(1_000, 150);
        services(&mut state);
        let start = state.ctx.now;
        assert!(matches!(
            update(
                &mut state,
                Message::Intent(Intent::Services(ServicesIntent::Buy(ServiceKind::Refuel)))
            ),
            Some(Command::PersistService(_))
        ));
        let command = update(&mut state, Message::Tick(start + chrono::Duration::seconds(60)));
        assert_eq!(command, None);
        assert!(!state.ctx.is_busy(ActionKey::RefreshPlayer));
    }

    #[test]
    fn error_dialog_swallows_the_next_key() {
        let mut state = session(1_000, 150);
        state.ctx.fail("boom");
        assert_eq!(update(&mut state, Message::Key(Key::Char('2'))), None);
        assert_eq!(state.screen_kind(), ScreenKind::Station);
        assert!(state.ctx.notice.is_none());
        let command = update(&mut state, Message::Key(Key::Char('2')));
        assert_eq!(state.screen_kind(), ScreenKind::Outfitter);
        assert!(matches!(command, Some(Command::OpenOutfitter { .. })));
    }

    #[test]
    fn intents_for_hidden_screens_are_dropped() {
        let mut state = session(1_000, 150);
        let command = update(
            &mut state,
            Message::Intent(Intent::Services(ServicesIntent::Buy(ServiceKind::Refuel))),
        );
        assert_eq!(command, None);
        assert_eq!(state.ctx.player.credits, 1_000);
    }

    #[test]
    fn incoming_chat_counts_unread_off_screen() {
        let mut state = session(1_000, 150);
        let now = state.ctx.now;
        update(
            &mut state,
            Message::ChatReceived(ChatEntry::system(Channel::Global, "hello", now)),
        );
        assert_eq!(state.ctx.chat.unread, 1);
        update(&mut state, Message::Navigate(ScreenKind::Chat));
        assert_eq!(state.ctx.chat.unread, 0);
        assert_eq!(state.ctx.chat.log.len(), 1);
    }

    #[test]
    fn transition_returns_the_new_state() {
        let state = session(1_000, 150);
        let (state, command) = transition(state, Message::Intent(Intent::Quit));
        assert!(state.should_quit);
        assert_eq!(command, None);
    }
}
