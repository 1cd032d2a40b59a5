//! Shared domain models.

mod equipment;
mod market;
mod mission;
mod player;
mod ship;

use uuid::Uuid;

pub use equipment::{
    Equipment, EquipmentCategory, Inventory, InventoryItem, Loadout, Slot, StatBonuses,
};
pub use market::{
    Auction, AuctionItem, AuctionStatus, BidRecord, Bounty, BountyStatus, Contract,
    ContractStatus, NewAuction, NewBounty, NewContract, Settlement,
};
pub use mission::{Mission, MissionStatus};
pub use player::Player;
pub use ship::{Ship, ShipCatalog, ShipType, ShipVitals, SlotSpec};

/// Credit amounts. Balances never go below zero.
pub type Credits = i64;
/// Player identity.
pub type PlayerId = Uuid;
/// Ship identity.
pub type ShipId = Uuid;
/// Loadout identity.
pub type LoadoutId = Uuid;
/// Auction identity.
pub type AuctionId = Uuid;
/// Contract identity.
pub type ContractId = Uuid;
/// Bounty identity.
pub type BountyId = Uuid;
/// Mission identity.
pub type MissionId = Uuid;
/// Catalog code of an equipment item, e.g. `pulse-laser-1`.
pub type EquipmentId = String;
/// Faction code.
pub type FactionId = String;
/// Star system number.
pub type SystemId = u32;
