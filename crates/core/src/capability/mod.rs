//! Narrow handles to the external subsystems the session talks to.
//!
//! The engine only ever reaches stores and managers through these traits.
//! Every call is fallible and returns a [`StoreError`] on failure.

/// In-memory reference implementation of every capability.
pub mod memory;
/// JSON snapshot persistence for the in-memory world.
pub mod snapshot;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    chat::ChatEntry,
    error::StoreError,
    models::{
        Auction, AuctionId, Bounty, Contract, ContractId, Credits, Equipment, EquipmentCategory,
        FactionId, Inventory, Loadout, LoadoutId, Mission, MissionId, NewAuction, NewBounty,
        NewContract, Player, PlayerId, Settlement, Ship, ShipId, SystemId,
    },
};

pub use memory::{FaultPlan, MemoryWorld, Operation};
pub use snapshot::{SnapshotFile, WorldSnapshot};

/// Result alias for capability calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable player records.
#[async_trait]
pub trait PlayerStore: Send + Sync {
    /// Fetch a player by id.
    async fn get(&self, id: PlayerId) -> StoreResult<Player>;
    /// Overwrite the durable balance.
    async fn update_credits(&self, id: PlayerId, balance: Credits) -> StoreResult<()>;
    /// Apply a signed change to the durable balance and return the new
    /// balance. Fails rather than go negative.
    async fn adjust_credits(&self, id: PlayerId, delta: Credits) -> StoreResult<Credits>;
}

/// Durable ship records.
#[async_trait]
pub trait ShipStore: Send + Sync {
    /// Fetch a ship by id.
    async fn get(&self, id: ShipId) -> StoreResult<Ship>;
    /// Overwrite the fuel gauge.
    async fn update_fuel(&self, id: ShipId, fuel: u32) -> StoreResult<()>;
    /// Overwrite hull and shield gauges.
    async fn update_hull_and_shields(&self, id: ShipId, hull: u32, shields: u32)
        -> StoreResult<()>;
}

/// Equipment catalog.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Fetch one catalog item.
    async fn get_by_id(&self, id: &str) -> StoreResult<Equipment>;
    /// Every catalog item of a category.
    async fn list_by_category(&self, category: EquipmentCategory) -> StoreResult<Vec<Equipment>>;
}

/// Receipt of an equipment purchase or sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeReceipt {
    /// Durable balance after the trade.
    pub balance: Credits,
    /// Inventory after the trade.
    pub inventory: Inventory,
}

/// Equipment ownership and loadout bookkeeping, keyed by player.
#[async_trait]
pub trait OutfittingManager: Send + Sync {
    /// Buy `quantity` units, charging the player's durable balance.
    async fn purchase(
        &self,
        player: PlayerId,
        equipment_id: &str,
        quantity: u32,
    ) -> StoreResult<TradeReceipt>;
    /// Sell `quantity` units back, crediting the player's durable balance.
    async fn sell(
        &self,
        player: PlayerId,
        equipment_id: &str,
        quantity: u32,
    ) -> StoreResult<TradeReceipt>;
    /// Move one item from inventory into a slot and return the whole loadout.
    async fn install(
        &self,
        player: PlayerId,
        loadout: LoadoutId,
        slot: usize,
        equipment_id: &str,
    ) -> StoreResult<Loadout>;
    /// Move the item in a slot back to inventory and return the whole loadout.
    async fn uninstall(&self, player: PlayerId, loadout: LoadoutId, slot: usize)
        -> StoreResult<Loadout>;
    /// Create an empty loadout for a ship type.
    async fn create_loadout(
        &self,
        player: PlayerId,
        ship_type: &str,
        name: &str,
    ) -> StoreResult<Loadout>;
    /// Fetch one loadout.
    async fn get_loadout(&self, player: PlayerId, loadout: LoadoutId) -> StoreResult<Loadout>;
    /// Every loadout the player owns.
    async fn list_loadouts(&self, player: PlayerId) -> StoreResult<Vec<Loadout>>;
    /// Uninstalled equipment the player owns.
    async fn get_inventory(&self, player: PlayerId) -> StoreResult<Inventory>;
}

/// Player-run marketplace: auctions, contracts and bounties.
#[async_trait]
pub trait MarketplaceManager: Send + Sync {
    /// Auctions still accepting bids.
    async fn list_active_auctions(&self) -> StoreResult<Vec<Auction>>;
    /// Place a bid and return the updated auction.
    async fn place_bid(
        &self,
        auction: AuctionId,
        bidder: PlayerId,
        amount: Credits,
    ) -> StoreResult<Auction>;
    /// Buy the lot outright, charging the buyer.
    async fn buyout(&self, auction: AuctionId, buyer: PlayerId)
        -> StoreResult<Settlement<Auction>>;
    /// Withdraw an auction with no bids.
    async fn cancel_auction(&self, auction: AuctionId, seller: PlayerId) -> StoreResult<Auction>;
    /// List an item from the seller's inventory.
    async fn create_auction(&self, listing: NewAuction) -> StoreResult<Auction>;
    /// Contracts nobody has claimed yet.
    async fn list_open_contracts(&self) -> StoreResult<Vec<Contract>>;
    /// Claim an open contract.
    async fn claim_contract(&self, contract: ContractId, claimant: PlayerId)
        -> StoreResult<Contract>;
    /// Complete a claimed contract, paying the escrowed reward to the claimant.
    async fn complete_contract(
        &self,
        contract: ContractId,
        claimant: PlayerId,
    ) -> StoreResult<Settlement<Contract>>;
    /// Record a contract whose reward the poster has already paid into escrow.
    async fn create_contract(&self, posting: NewContract) -> StoreResult<Contract>;
    /// Withdraw an open contract, refunding the escrow to the poster.
    async fn cancel_contract(
        &self,
        contract: ContractId,
        poster: PlayerId,
    ) -> StoreResult<Settlement<Contract>>;
    /// Bounties still open.
    async fn list_active_bounties(&self) -> StoreResult<Vec<Bounty>>;
    /// Record a bounty whose amount and fee the poster has already paid.
    async fn post_bounty(&self, posting: NewBounty) -> StoreResult<Bounty>;
}

/// Presence, faction and username lookups.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Every player currently online.
    async fn online_players(&self) -> StoreResult<Vec<PlayerId>>;
    /// Players currently in a star system.
    async fn players_in_system(&self, system: SystemId) -> StoreResult<Vec<PlayerId>>;
    /// Faction of a player, if any.
    async fn get_player_faction(&self, player: PlayerId) -> StoreResult<Option<FactionId>>;
    /// Resolve a username to a player, `None` when unknown.
    async fn resolve_username(&self, name: &str) -> StoreResult<Option<PlayerId>>;
}

/// Chat fan-out.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Deliver an entry to every recipient, returning how many received it.
    async fn deliver(&self, recipients: &[PlayerId], entry: &ChatEntry) -> StoreResult<usize>;
}

/// Mission generator.
#[async_trait]
pub trait MissionBoard: Send + Sync {
    /// Missions on offer in a system.
    async fn available(&self, system: SystemId) -> StoreResult<Vec<Mission>>;
    /// The player's active mission, if any.
    async fn active_for(&self, player: PlayerId) -> StoreResult<Option<Mission>>;
    /// Take a mission.
    async fn accept(&self, player: PlayerId, mission: MissionId) -> StoreResult<Mission>;
    /// Drop the active mission.
    async fn abandon(&self, player: PlayerId, mission: MissionId) -> StoreResult<Mission>;
}

/// Bundle of every capability handle the executor needs.
#[derive(Clone)]
pub struct Capabilities {
    /// Player store.
    pub players: Arc<dyn PlayerStore>,
    /// Ship store.
    pub ships: Arc<dyn ShipStore>,
    /// Equipment catalog.
    pub items: Arc<dyn ItemStore>,
    /// Outfitting manager.
    pub outfitting: Arc<dyn OutfittingManager>,
    /// Marketplace manager.
    pub marketplace: Arc<dyn MarketplaceManager>,
    /// Presence/faction/username directory.
    pub directory: Arc<dyn Directory>,
    /// Chat fan-out.
    pub chat: Arc<dyn ChatService>,
    /// Mission generator.
    pub missions: Arc<dyn MissionBoard>,
}

impl Capabilities {
    /// Route every capability to one in-memory world.
    pub fn from_world(world: Arc<MemoryWorld>) -> Self {
        Self {
            players: world.clone(),
            ships: world.clone(),
            items: world.clone(),
            outfitting: world.clone(),
            marketplace: world.clone(),
            directory: world.clone(),
            chat: world.clone(),
            missions: world,
        }
    }
}
