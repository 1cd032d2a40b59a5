use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{EquipmentCategory, PlayerId, ShipId};

/// Static definition of a slot on a ship type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpec {
    /// Category of item the slot accepts.
    pub slot_type: EquipmentCategory,
    /// Largest item size that fits.
    pub size: u8,
}

/// Catalog entry describing a hull class. Read-only for the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipType {
    /// Catalog id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Hull ceiling.
    pub max_hull: u32,
    /// Shield ceiling.
    pub max_shields: u32,
    /// Fuel tank capacity.
    pub max_fuel: u32,
    /// Cargo hold capacity.
    pub max_cargo: u32,
    /// Mounting points in order.
    #[serde(default)]
    pub slots: Vec<SlotSpec>,
}

/// Lookup table of ship types keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipCatalog {
    types: HashMap<String, ShipType>,
}

impl ShipCatalog {
    /// Catalog from a list of types.
    pub fn new(types: impl IntoIterator<Item = ShipType>) -> Self {
        Self {
            types: types.into_iter().map(|ty| (ty.id.clone(), ty)).collect(),
        }
    }

    /// Type with the given id.
    pub fn get(&self, id: &str) -> Option<&ShipType> {
        self.types.get(id)
    }

    /// Every type, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &ShipType> {
        self.types.values()
    }
}

/// Hull, shield and fuel readings of a ship at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipVitals {
    /// Hull points.
    pub hull: u32,
    /// Shield points.
    pub shields: u32,
    /// Fuel units.
    pub fuel: u32,
}

/// Session-owned snapshot of the player's active ship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ship {
    /// Ship id.
    pub id: ShipId,
    /// Owning player.
    pub owner: PlayerId,
    /// Player-chosen name.
    pub name: String,
    /// Catalog id of the hull class.
    pub ship_type: String,
    /// Hull points.
    pub hull: u32,
    /// Shield points.
    pub shields: u32,
    /// Fuel units.
    pub fuel: u32,
    /// Cargo units aboard.
    pub cargo: u32,
}

impl Ship {
    /// Current hull, shields and fuel.
    pub fn vitals(&self) -> ShipVitals {
        ShipVitals {
            hull: self.hull,
            shields: self.shields,
            fuel: self.fuel,
        }
    }

    /// Overwrite hull, shields and fuel, clamped to the type's maxima.
    pub fn apply_vitals(&mut self, vitals: ShipVitals, ty: &ShipType) {
        self.hull = vitals.hull.min(ty.max_hull);
        self.shields = vitals.shields.min(ty.max_shields);
        self.fuel = vitals.fuel.min(ty.max_fuel);
    }

    /// Clamp every gauge into `[0, max]`.
    pub fn clamp_to(&mut self, ty: &ShipType) {
        self.apply_vitals(self.vitals(), ty);
        self.cargo = self.cargo.min(ty.max_cargo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn courier() -> ShipType {
        ShipType {
            id: "courier".to_string(),
            name: "Courier".to_string(),
            max_hull: 100,
            max_shields: 50,
            max_fuel: 200,
            max_cargo: 20,
            slots: Vec::new(),
        }
    }

    #[test]
    fn clamp_bounds_every_gauge() {
        let ty = courier();
        let mut ship = Ship {
            id: Uuid::new_v4(),
            owner: Uuid::new_v4(),
            name: "Test".to_string(),
            ship_type: ty.id.clone(),
            hull: 140,
            shields: 51,
            fuel: 999,
            cargo: 25,
        };
        ship.clamp_to(&ty);
        assert_eq!(ship.hull, 100);
        assert_eq!(ship.shields, 50);
        assert_eq!(ship.fuel, 200);
        assert_eq!(ship.cargo, 20);
    }

    #[test]
    fn catalog_lookup_by_id() {
        let catalog = ShipCatalog::new([courier()]);
        assert_eq!(catalog.get("courier").map(|ty| ty.max_fuel), Some(200));
        assert!(catalog.get("freighter").is_none());
    }
}
