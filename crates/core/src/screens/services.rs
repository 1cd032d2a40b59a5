//! Landing services: refuel, hull repair, shield recharge.
//!
//! The local ship and balance change as soon as a service is bought. The
//! durable writes follow in one command, ship first and credits second. If
//! the ship write fails nothing durable changed and the local effect is
//! reverted. If the credit write fails the local effect is reverted and a
//! compensating command restores the durable ship record; that restore is
//! attempted once and its failure is only reported.

use std::fmt;

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    economy::{self, Quote},
    engine::{ActionKey, Command, Compensation, Intent, Key, ServicePlan, SessionContext},
    error::{StoreError, ValidationError},
    models::{Ship, ShipType, ShipVitals},
};

/// Purchasable station service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// Fill the fuel tank.
    Refuel,
    /// Repair hull to maximum.
    RepairHull,
    /// Recharge shields to maximum.
    RechargeShields,
    /// Hull and shields together.
    RepairAll,
}

impl ServiceKind {
    /// Menu order.
    pub const ALL: [ServiceKind; 4] = [
        ServiceKind::Refuel,
        ServiceKind::RepairHull,
        ServiceKind::RechargeShields,
        ServiceKind::RepairAll,
    ];

    /// Menu label.
    pub fn label(self) -> &'static str {
        match self {
            ServiceKind::Refuel => "Refuel",
            ServiceKind::RepairHull => "Repair hull",
            ServiceKind::RechargeShields => "Recharge shields",
            ServiceKind::RepairAll => "Repair all",
        }
    }

    /// Whether the fuel gauge is written.
    pub fn writes_fuel(self) -> bool {
        matches!(self, ServiceKind::Refuel)
    }

    /// Whether hull and shield gauges are written.
    pub fn writes_hull_and_shields(self) -> bool {
        !self.writes_fuel()
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Price of a service for the ship as it is now, and the gauges afterwards.
pub fn quote(
    kind: ServiceKind,
    ship: &Ship,
    ty: &ShipType,
) -> Result<(Quote, ShipVitals), ValidationError> {
    let mut after = ship.vitals();
    let quote = match kind {
        ServiceKind::Refuel => {
            after.fuel = ty.max_fuel;
            economy::refill_quote(ship.fuel, ty.max_fuel, economy::FUEL_PRICE_PER_UNIT)
                .ok_or(ValidationError::AlreadyFull("Fuel tank"))?
        }
        ServiceKind::RepairHull => {
            after.hull = ty.max_hull;
            economy::refill_quote(ship.hull, ty.max_hull, economy::HULL_PRICE_PER_UNIT)
                .ok_or(ValidationError::AlreadyFull("Hull"))?
        }
        ServiceKind::RechargeShields => {
            after.shields = ty.max_shields;
            economy::refill_quote(ship.shields, ty.max_shields, economy::SHIELD_PRICE_PER_UNIT)
                .ok_or(ValidationError::AlreadyFull("Shield bank"))?
        }
        ServiceKind::RepairAll => {
            after.hull = ty.max_hull;
            after.shields = ty.max_shields;
            let hull = economy::refill_quote(ship.hull, ty.max_hull, economy::HULL_PRICE_PER_UNIT);
            let shields = economy::refill_quote(
                ship.shields,
                ty.max_shields,
                economy::SHIELD_PRICE_PER_UNIT,
            );
            match (hull, shields) {
                (Some(h), Some(s)) => h.plus(s),
                (Some(q), None) | (None, Some(q)) => q,
                (None, None) => return Err(ValidationError::AlreadyFull("Hull and shield bank")),
            }
        }
    };
    Ok((quote, after))
}

/// Landing services menu cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServicesState {
    /// Highlighted service row.
    pub cursor: usize,
}

impl ServicesState {
    /// Service under the cursor.
    pub fn selected(&self) -> ServiceKind {
        ServiceKind::ALL[self.cursor.min(ServiceKind::ALL.len() - 1)]
    }
}

/// Landing services actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServicesIntent {
    /// Move the highlight up.
    Up,
    /// Move the highlight down.
    Down,
    /// Buy a service.
    Buy(ServiceKind),
}

/// Translate a key on the services screen.
pub fn keymap(state: &ServicesState, key: Key) -> Option<Intent> {
    let intent = match key {
        Key::Up | Key::Char('k') => ServicesIntent::Up,
        Key::Down | Key::Char('j') => ServicesIntent::Down,
        Key::Enter => ServicesIntent::Buy(state.selected()),
        Key::Char('f') => ServicesIntent::Buy(ServiceKind::Refuel),
        Key::Char('h') => ServicesIntent::Buy(ServiceKind::RepairHull),
        Key::Char('s') => ServicesIntent::Buy(ServiceKind::RechargeShields),
        Key::Char('a') => ServicesIntent::Buy(ServiceKind::RepairAll),
        Key::Esc => return Some(Intent::Back),
        _ => return None,
    };
    Some(Intent::Services(intent))
}

pub(crate) fn handle(
    ctx: &mut SessionContext,
    state: &mut ServicesState,
    intent: ServicesIntent,
) -> Result<Option<Command>, ValidationError> {
    let count = ServiceKind::ALL.len();
    match intent {
        ServicesIntent::Up => {
            state.cursor = (state.cursor + count - 1) % count;
            Ok(None)
        }
        ServicesIntent::Down => {
            state.cursor = (state.cursor + 1) % count;
            Ok(None)
        }
        ServicesIntent::Buy(kind) => buy(ctx, kind).map(Some),
    }
}

fn buy(ctx: &mut SessionContext, kind: ServiceKind) -> Result<Command, ValidationError> {
    let (quote, after) = quote(kind, &ctx.ship, &ctx.ship_type)?;
    ctx.ensure_idle(ActionKey::Service)?;
    if !ctx.player.can_afford(quote.cost) {
        return Err(ValidationError::InsufficientCredits {
            needed: quote.cost,
            available: ctx.player.credits,
        });
    }

    let plan = ServicePlan {
        kind,
        player: ctx.player.id,
        ship: ctx.ship.id,
        quote,
        before: ctx.ship.vitals(),
        after,
    };
    ctx.player.credits -= quote.cost;
    ctx.ship.apply_vitals(after, &ctx.ship_type);
    info!(
        player = %plan.player,
        service = %kind,
        units = quote.units,
        cost = quote.cost,
        "Station service applied locally"
    );
    Ok(Command::PersistService(plan))
}

/// Which durable write of a service failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceFailure {
    /// Ship gauges were not written; nothing durable changed.
    #[error("ship record update failed: {0}")]
    ShipWrite(StoreError),
    /// Ship gauges were written but the balance was not.
    #[error("credit update failed: {0}")]
    CreditWrite(StoreError),
}

/// Result of persisting a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOutcome {
    /// The plan that was executed.
    pub plan: ServicePlan,
    /// Whether both writes landed.
    pub result: Result<(), ServiceFailure>,
}

pub(crate) fn on_outcome(ctx: &mut SessionContext, outcome: ServiceOutcome) -> Option<Command> {
    let ServiceOutcome { plan, result } = outcome;
    let failure = match result {
        Ok(()) => {
            ctx.info(format!(
                "{} complete: {} units for {} credits",
                plan.kind,
                plan.quote.units,
                economy::format_credits(plan.quote.cost)
            ));
            return None;
        }
        Err(failure) => failure,
    };

    ctx.player.credits += plan.quote.cost;
    if ctx.ship.id == plan.ship {
        ctx.ship.apply_vitals(plan.before, &ctx.ship_type);
    }
    warn!(player = %plan.player, service = %plan.kind, %failure, "Station service reverted");
    ctx.fail(format!("{} failed: {failure}. Charges were reverted.", plan.kind));

    match failure {
        ServiceFailure::ShipWrite(_) => None,
        ServiceFailure::CreditWrite(_) => Some(Command::Compensate(Compensation::RestoreShip {
            ship: plan.ship,
            vitals: plan.before,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn courier() -> ShipType {
        ShipType {
            id: "courier".into(),
            name: "Courier".into(),
            max_hull: 100,
            max_shields: 50,
            max_fuel: 200,
            max_cargo: 20,
            slots: Vec::new(),
        }
    }

    fn ship(hull: u32, shields: u32, fuel: u32) -> Ship {
        Ship {
            id: Uuid::new_v4(),
            owner: Uuid::new_v4(),
            name: "Test".into(),
            ship_type: "courier".into(),
            hull,
            shields,
            fuel,
            cargo: 0,
        }
    }

    #[test]
    fn refuel_quote_covers_missing_units() {
        let (q, after) = quote(ServiceKind::Refuel, &ship(100, 50, 150), &courier()).unwrap();
        assert_eq!(q.units, 50);
        assert_eq!(q.cost, 500);
        assert_eq!(after.fuel, 200);
    }

    #[test]
    fn full_gauges_are_rejected() {
        let ty = courier();
        assert_eq!(
            quote(ServiceKind::Refuel, &ship(10, 10, 200), &ty),
            Err(ValidationError::AlreadyFull("Fuel tank"))
        );
        assert_eq!(
            quote(ServiceKind::RepairAll, &ship(100, 50, 0), &ty),
            Err(ValidationError::AlreadyFull("Hull and shield bank"))
        );
    }

    #[test]
    fn repair_all_sums_both_gauges() {
        let (q, after) = quote(ServiceKind::RepairAll, &ship(90, 40, 0), &courier()).unwrap();
        assert_eq!(q.cost, 10 * 50 + 10 * 10);
        assert_eq!((after.hull, after.shields, after.fuel), (100, 50, 0));

        let (q, _) = quote(ServiceKind::RepairAll, &ship(100, 45, 0), &courier()).unwrap();
        assert_eq!(q.cost, 50);
    }

    #[test]
    fn enter_buys_the_highlighted_service() {
        let state = ServicesState { cursor: 2 };
        assert_eq!(
            keymap(&state, Key::Enter),
            Some(Intent::Services(ServicesIntent::Buy(
                ServiceKind::RechargeShields
            )))
        );
        assert_eq!(keymap(&state, Key::Esc), Some(Intent::Back));
    }
}
