use std::{fmt, ops::Add};

use serde::{Deserialize, Serialize};

use super::{Credits, EquipmentId, LoadoutId, PlayerId};

/// Equipment category; doubles as the slot type an item fits into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentCategory {
    /// Offensive hardpoint.
    Weapon,
    /// Shield generator.
    Shield,
    /// Drive.
    Engine,
    /// Cargo expansion.
    Cargo,
    /// Anything else.
    Utility,
}

impl EquipmentCategory {
    /// Every category in display order.
    pub const ALL: [EquipmentCategory; 5] = [
        EquipmentCategory::Weapon,
        EquipmentCategory::Shield,
        EquipmentCategory::Engine,
        EquipmentCategory::Cargo,
        EquipmentCategory::Utility,
    ];

    /// The category after this one, wrapping around.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// The category before this one, wrapping around.
    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// Plural display label.
    pub fn label(self) -> &'static str {
        match self {
            EquipmentCategory::Weapon => "Weapons",
            EquipmentCategory::Shield => "Shields",
            EquipmentCategory::Engine => "Engines",
            EquipmentCategory::Cargo => "Cargo",
            EquipmentCategory::Utility => "Utility",
        }
    }
}

impl fmt::Display for EquipmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Additive stat modifiers granted by installed equipment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatBonuses {
    /// Attack modifier.
    #[serde(default)]
    pub attack: i32,
    /// Defense modifier.
    #[serde(default)]
    pub defense: i32,
    /// Speed modifier.
    #[serde(default)]
    pub speed: i32,
    /// Cargo capacity modifier.
    #[serde(default)]
    pub cargo: i32,
}

impl Add for StatBonuses {
    type Output = StatBonuses;

    fn add(self, rhs: Self) -> Self::Output {
        StatBonuses {
            attack: self.attack + rhs.attack,
            defense: self.defense + rhs.defense,
            speed: self.speed + rhs.speed,
            cargo: self.cargo + rhs.cargo,
        }
    }
}

/// Catalog item. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    /// Catalog id.
    pub id: EquipmentId,
    /// Display name.
    pub name: String,
    /// Category and slot type.
    pub category: EquipmentCategory,
    /// Slot size the item requires.
    pub size: u8,
    /// List price.
    pub price: Credits,
    /// Stat modifiers while installed.
    #[serde(default)]
    pub bonuses: StatBonuses,
}

/// One mounting point of a loadout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Category of item the slot accepts.
    pub slot_type: EquipmentCategory,
    /// Largest item size that fits.
    pub size: u8,
    /// Installed item, if any.
    #[serde(default)]
    pub equipment: Option<Equipment>,
}

impl Slot {
    /// Slot with nothing installed.
    pub fn empty(slot_type: EquipmentCategory, size: u8) -> Self {
        Self {
            slot_type,
            size,
            equipment: None,
        }
    }

    /// Same slot type and enough room for the item.
    pub fn compatible_with(&self, equipment: &Equipment) -> bool {
        self.slot_type == equipment.category && self.size >= equipment.size
    }

    /// Whether nothing is installed.
    pub fn is_empty(&self) -> bool {
        self.equipment.is_none()
    }
}

/// Named equipment configuration for one ship type.
///
/// Aggregates are derived from the slots on every call so they can never
/// drift from the slot contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loadout {
    /// Loadout id.
    pub id: LoadoutId,
    /// Owning player.
    pub owner: PlayerId,
    /// Ship type the slots follow.
    pub ship_type: String,
    /// Player-chosen name.
    pub name: String,
    /// Mounting points in ship order.
    pub slots: Vec<Slot>,
}

impl Loadout {
    /// Installed items in slot order.
    pub fn installed(&self) -> impl Iterator<Item = &Equipment> {
        self.slots.iter().filter_map(|slot| slot.equipment.as_ref())
    }

    /// Sum of installed item sizes.
    pub fn used_space(&self) -> u32 {
        self.installed().map(|item| u32::from(item.size)).sum()
    }

    /// Sum of slot sizes.
    pub fn total_space(&self) -> u32 {
        self.slots.iter().map(|slot| u32::from(slot.size)).sum()
    }

    /// Combined bonuses of installed items.
    pub fn bonuses(&self) -> StatBonuses {
        self.installed()
            .fold(StatBonuses::default(), |acc, item| acc + item.bonuses)
    }

    /// Combined list price of installed items.
    pub fn total_cost(&self) -> Credits {
        self.installed().map(|item| item.price).sum()
    }

    /// Slot at `index`, if any.
    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }
}

/// Stack of identical uninstalled items owned by a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Item in the stack.
    pub equipment: Equipment,
    /// Units held.
    pub quantity: u32,
}

/// Uninstalled equipment owned by a player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Stacks, one per equipment id.
    #[serde(default)]
    pub items: Vec<InventoryItem>,
}

impl Inventory {
    /// Units held of `equipment_id`, zero when absent.
    pub fn quantity_of(&self, equipment_id: &str) -> u32 {
        self.find(equipment_id).map(|item| item.quantity).unwrap_or(0)
    }

    /// Stack for `equipment_id`, if held.
    pub fn find(&self, equipment_id: &str) -> Option<&InventoryItem> {
        self.items
            .iter()
            .find(|item| item.equipment.id == equipment_id)
    }

    /// Add `quantity` units, merging into an existing stack.
    pub fn add(&mut self, equipment: Equipment, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self
            .items
            .iter_mut()
            .find(|item| item.equipment.id == equipment.id)
        {
            Some(item) => item.quantity += quantity,
            None => self.items.push(InventoryItem {
                equipment,
                quantity,
            }),
        }
    }

    /// Remove `quantity` units, returning false without change when short.
    pub fn remove(&mut self, equipment_id: &str, quantity: u32) -> bool {
        let Some(pos) = self
            .items
            .iter()
            .position(|item| item.equipment.id == equipment_id)
        else {
            return false;
        };
        if self.items[pos].quantity < quantity {
            return false;
        }
        self.items[pos].quantity -= quantity;
        if self.items[pos].quantity == 0 {
            self.items.remove(pos);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn laser(size: u8) -> Equipment {
        Equipment {
            id: format!("laser-{size}"),
            name: "Pulse Laser".to_string(),
            category: EquipmentCategory::Weapon,
            size,
            price: 1_200,
            bonuses: StatBonuses {
                attack: 10,
                ..StatBonuses::default()
            },
        }
    }

    #[test]
    fn slot_compatibility_checks_type_and_size() {
        let slot = Slot::empty(EquipmentCategory::Weapon, 2);
        assert!(slot.compatible_with(&laser(1)));
        assert!(slot.compatible_with(&laser(2)));
        assert!(!slot.compatible_with(&laser(3)));

        let shield_slot = Slot::empty(EquipmentCategory::Shield, 3);
        assert!(!shield_slot.compatible_with(&laser(1)));
    }

    #[test]
    fn loadout_aggregates_follow_slots() {
        let mut loadout = Loadout {
            id: Uuid::new_v4(),
            owner: Uuid::new_v4(),
            ship_type: "courier".to_string(),
            name: "Raider".to_string(),
            slots: vec![
                Slot::empty(EquipmentCategory::Weapon, 2),
                Slot::empty(EquipmentCategory::Weapon, 1),
            ],
        };
        assert_eq!(loadout.used_space(), 0);
        assert_eq!(loadout.total_space(), 3);

        loadout.slots[0].equipment = Some(laser(2));
        loadout.slots[1].equipment = Some(laser(1));
        assert_eq!(loadout.used_space(), 3);
        assert_eq!(loadout.bonuses().attack, 20);
        assert_eq!(loadout.total_cost(), 2_400);

        loadout.slots[0].equipment = None;
        assert_eq!(loadout.used_space(), 1);
        assert_eq!(loadout.bonuses().attack, 10);
    }

    #[test]
    fn inventory_remove_refuses_shortfall() {
        let mut inventory = Inventory::default();
        inventory.add(laser(1), 2);
        assert!(!inventory.remove("laser-1", 3));
        assert_eq!(inventory.quantity_of("laser-1"), 2);
        assert!(inventory.remove("laser-1", 2));
        assert!(inventory.items.is_empty());
    }
}
