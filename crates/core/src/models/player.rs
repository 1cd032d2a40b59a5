use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Credits, FactionId, PlayerId, ShipId, SystemId};

/// Session-owned snapshot of the logged-in player.
///
/// Commands receive copies of the fields they need and report balances back;
/// they never hold this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Stable player identity.
    pub id: PlayerId,
    /// Login name, unique across the universe.
    pub username: String,
    /// Spendable balance.
    pub credits: Credits,
    /// Faction membership, if any.
    #[serde(default)]
    pub faction: Option<FactionId>,
    /// Standing per faction.
    #[serde(default)]
    pub reputation: HashMap<FactionId, i32>,
    /// Star system the player is currently in.
    pub system_id: SystemId,
    /// Active ship.
    pub ship_id: ShipId,
}

impl Player {
    /// Whether the balance covers `amount`.
    pub fn can_afford(&self, amount: Credits) -> bool {
        amount >= 0 && amount <= self.credits
    }

    /// Reputation with a faction, zero when never recorded.
    pub fn reputation_with(&self, faction: &str) -> i32 {
        self.reputation.get(faction).copied().unwrap_or_default()
    }
}
