use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    ChatService, Directory, ItemStore, MarketplaceManager, MissionBoard, OutfittingManager,
    PlayerStore, ShipStore, StoreResult, TradeReceipt, WorldSnapshot,
};
use crate::{
    chat::ChatEntry,
    economy,
    error::StoreError,
    models::{
        Auction, AuctionId, AuctionItem, AuctionStatus, BidRecord, Bounty, BountyId, BountyStatus,
        Contract, ContractId, ContractStatus, Credits, Equipment, EquipmentCategory, EquipmentId,
        FactionId, Inventory, Loadout, LoadoutId, Mission, MissionId, MissionStatus, NewAuction,
        NewBounty, NewContract, Player, PlayerId, Settlement, Ship, ShipCatalog, ShipId, Slot,
        SystemId,
    },
};

/// Capability call that can be made to fail on purpose.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetPlayer,
    UpdateCredits,
    GetShip,
    UpdateFuel,
    UpdateHullAndShields,
    GetItem,
    ListItems,
    Purchase,
    Sell,
    Install,
    Uninstall,
    CreateLoadout,
    GetLoadout,
    ListLoadouts,
    GetInventory,
    ListAuctions,
    PlaceBid,
    Buyout,
    CancelAuction,
    CreateAuction,
    ListContracts,
    ClaimContract,
    CompleteContract,
    CreateContract,
    CancelContract,
    ListBounties,
    PostBounty,
    Directory,
    Deliver,
    ListMissions,
    AcceptMission,
    AbandonMission,
}

/// Queue of injected failures, consumed one per call.
#[derive(Debug, Default)]
pub struct FaultPlan {
    pending: HashMap<Operation, VecDeque<StoreError>>,
}

impl FaultPlan {
    fn push(&mut self, operation: Operation, error: StoreError) {
        self.pending.entry(operation).or_default().push_back(error);
    }

    fn take(&mut self, operation: Operation) -> Option<StoreError> {
        let queue = self.pending.get_mut(&operation)?;
        let error = queue.pop_front();
        if queue.is_empty() {
            self.pending.remove(&operation);
        }
        error
    }
}

#[derive(Debug, Default)]
struct WorldData {
    players: HashMap<PlayerId, Player>,
    ships: HashMap<ShipId, Ship>,
    ship_types: ShipCatalog,
    equipment: BTreeMap<EquipmentId, Equipment>,
    inventories: HashMap<PlayerId, Inventory>,
    loadouts: HashMap<LoadoutId, Loadout>,
    auctions: HashMap<AuctionId, Auction>,
    contracts: HashMap<ContractId, Contract>,
    bounties: HashMap<BountyId, Bounty>,
    missions: HashMap<MissionId, Mission>,
    online: HashSet<PlayerId>,
    inboxes: HashMap<PlayerId, Vec<ChatEntry>>,
}

impl WorldData {
    fn player_mut(&mut self, id: PlayerId) -> StoreResult<&mut Player> {
        self.players
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("player", id))
    }

    fn player_name(&self, id: PlayerId) -> String {
        self.players
            .get(&id)
            .map(|p| p.username.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Apply a signed balance change, refusing to go negative.
    fn adjust_credits(&mut self, id: PlayerId, delta: Credits) -> StoreResult<Credits> {
        let player = self.player_mut(id)?;
        let next = player.credits + delta;
        if next < 0 {
            return Err(StoreError::InsufficientFunds {
                needed: -delta,
                available: player.credits,
            });
        }
        player.credits = next;
        Ok(next)
    }

    /// Move `amount` between two accounts. Both are checked before either
    /// balance changes. Returns the payer's new balance.
    fn transfer(&mut self, from: PlayerId, to: PlayerId, amount: Credits) -> StoreResult<Credits> {
        let available = self
            .players
            .get(&from)
            .map(|p| p.credits)
            .ok_or_else(|| StoreError::not_found("player", from))?;
        if !self.players.contains_key(&to) {
            return Err(StoreError::not_found("player", to));
        }
        if available < amount {
            return Err(StoreError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        let balance = self.adjust_credits(from, -amount)?;
        self.adjust_credits(to, amount)?;
        Ok(balance)
    }

    fn equipment(&self, id: &str) -> StoreResult<Equipment> {
        self.equipment
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("equipment", id))
    }

    fn owned_loadout_mut(&mut self, player: PlayerId, id: LoadoutId) -> StoreResult<&mut Loadout> {
        match self.loadouts.get_mut(&id) {
            Some(loadout) if loadout.owner == player => Ok(loadout),
            _ => Err(StoreError::not_found("loadout", id)),
        }
    }

    fn give_item(&mut self, player: PlayerId, equipment_id: &str, quantity: u32) {
        if let Some(item) = self.equipment.get(equipment_id).cloned() {
            self.inventories
                .entry(player)
                .or_default()
                .add(item, quantity);
        }
    }

    fn sweep_expired(&mut self, now: DateTime<Utc>) {
        let due: Vec<AuctionId> = self
            .auctions
            .values()
            .filter(|a| a.status == AuctionStatus::Active && a.end_time <= now)
            .map(|a| a.id)
            .collect();
        for id in due {
            self.settle_auction(id);
        }

        let mut refunds = Vec::new();
        for contract in self.contracts.values_mut() {
            if !contract.status.is_terminal() && contract.expires_at <= now {
                contract.status = ContractStatus::Expired;
                refunds.push((contract.poster, contract.reward));
            }
        }
        for bounty in self.bounties.values_mut() {
            if bounty.status == BountyStatus::Active && bounty.expires_at <= now {
                bounty.status = BountyStatus::Expired;
                refunds.push((bounty.poster, bounty.amount));
            }
        }
        for (poster, amount) in refunds {
            if let Err(err) = self.adjust_credits(poster, amount) {
                warn!(%poster, amount, %err, "Escrow refund failed");
            }
        }
    }

    /// Close an auction whose timer ran out.
    fn settle_auction(&mut self, id: AuctionId) {
        let Some(auction) = self.auctions.get(&id).cloned() else {
            return;
        };
        let winner = match auction.highest_bidder.filter(|_| auction.current_bid > 0) {
            Some(bidder) => match self.transfer(bidder, auction.seller, auction.current_bid) {
                Ok(_) => Some(bidder),
                Err(err) => {
                    warn!(auction = %id, %bidder, %err, "Winning bid could not be settled");
                    None
                }
            },
            None => None,
        };
        let status = match winner {
            Some(bidder) => {
                self.give_item(bidder, &auction.item.equipment_id, auction.item.quantity);
                AuctionStatus::Sold
            }
            None => {
                self.give_item(
                    auction.seller,
                    &auction.item.equipment_id,
                    auction.item.quantity,
                );
                AuctionStatus::Expired
            }
        };
        if let Some(entry) = self.auctions.get_mut(&id) {
            entry.status = status;
        }
        debug!(auction = %id, ?status, "Auction closed on timer");
    }
}

/// Single-process universe implementing every capability.
///
/// Enforces the rules a game server would: self-bid rejection, bid floors,
/// funds checks, item escrow for listed lots, expiry with escrow refunds.
pub struct MemoryWorld {
    data: RwLock<WorldData>,
    faults: Mutex<FaultPlan>,
}

impl MemoryWorld {
    /// Build a world from a snapshot.
    pub fn new(snapshot: WorldSnapshot) -> Self {
        let data = WorldData {
            players: snapshot.players.into_iter().map(|p| (p.id, p)).collect(),
            ships: snapshot.ships.into_iter().map(|s| (s.id, s)).collect(),
            ship_types: ShipCatalog::new(snapshot.ship_types),
            equipment: snapshot
                .equipment
                .into_iter()
                .map(|e| (e.id.clone(), e))
                .collect(),
            inventories: snapshot.inventories,
            loadouts: snapshot.loadouts.into_iter().map(|l| (l.id, l)).collect(),
            auctions: snapshot.auctions.into_iter().map(|a| (a.id, a)).collect(),
            contracts: snapshot.contracts.into_iter().map(|c| (c.id, c)).collect(),
            bounties: snapshot.bounties.into_iter().map(|b| (b.id, b)).collect(),
            missions: snapshot.missions.into_iter().map(|m| (m.id, m)).collect(),
            online: snapshot.online.into_iter().collect(),
            inboxes: HashMap::new(),
        };
        Self {
            data: RwLock::new(data),
            faults: Mutex::new(FaultPlan::default()),
        }
    }

    /// Capture the current world for persistence.
    pub fn snapshot(&self) -> WorldSnapshot {
        let data = self.data.read();
        WorldSnapshot {
            players: data.players.values().cloned().collect(),
            ships: data.ships.values().cloned().collect(),
            ship_types: data.ship_types.iter().cloned().collect(),
            equipment: data.equipment.values().cloned().collect(),
            inventories: data.inventories.clone(),
            loadouts: data.loadouts.values().cloned().collect(),
            auctions: data.auctions.values().cloned().collect(),
            contracts: data.contracts.values().cloned().collect(),
            bounties: data.bounties.values().cloned().collect(),
            missions: data.missions.values().cloned().collect(),
            online: data.online.iter().copied().collect(),
            saved_at: Some(Utc::now()),
        }
    }

    /// Make the next call to `operation` fail with `error`.
    pub fn fail_next(&self, operation: Operation, error: StoreError) {
        self.faults.lock().push(operation, error);
    }

    /// Drain messages delivered to a player.
    pub fn take_inbox(&self, player: PlayerId) -> Vec<ChatEntry> {
        self.data
            .write()
            .inboxes
            .remove(&player)
            .unwrap_or_default()
    }

    /// Mark a player as online or offline.
    pub fn set_online(&self, player: PlayerId, online: bool) {
        let mut data = self.data.write();
        if online {
            data.online.insert(player);
        } else {
            data.online.remove(&player);
        }
    }

    /// Read-only copy of a player record.
    pub fn player(&self, id: PlayerId) -> Option<Player> {
        self.data.read().players.get(&id).cloned()
    }

    /// Read-only copy of a player record looked up by username.
    pub fn player_named(&self, name: &str) -> Option<Player> {
        self.data
            .read()
            .players
            .values()
            .find(|p| p.username.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Read-only copy of a ship record.
    pub fn ship(&self, id: ShipId) -> Option<Ship> {
        self.data.read().ships.get(&id).cloned()
    }

    /// Copy of the ship-type catalog.
    pub fn ship_catalog(&self) -> ShipCatalog {
        self.data.read().ship_types.clone()
    }

    /// Read-only copy of a player's inventory.
    pub fn inventory(&self, player: PlayerId) -> Inventory {
        self.data
            .read()
            .inventories
            .get(&player)
            .cloned()
            .unwrap_or_default()
    }

    /// Read-only copy of a loadout.
    pub fn loadout(&self, id: LoadoutId) -> Option<Loadout> {
        self.data.read().loadouts.get(&id).cloned()
    }

    /// Read-only copy of an auction.
    pub fn auction(&self, id: AuctionId) -> Option<Auction> {
        self.data.read().auctions.get(&id).cloned()
    }

    /// Read-only copy of a contract.
    pub fn contract(&self, id: ContractId) -> Option<Contract> {
        self.data.read().contracts.get(&id).cloned()
    }

    /// Number of stored bounties, any status.
    pub fn bounty_count(&self) -> usize {
        self.data.read().bounties.len()
    }

    /// Number of stored contracts, any status.
    pub fn contract_count(&self) -> usize {
        self.data.read().contracts.len()
    }

    fn check(&self, operation: Operation) -> StoreResult<()> {
        match self.faults.lock().take(operation) {
            Some(error) => {
                warn!(?operation, %error, "Injected failure");
                Err(error)
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PlayerStore for MemoryWorld {
    async fn get(&self, id: PlayerId) -> StoreResult<Player> {
        self.check(Operation::GetPlayer)?;
        self.player(id)
            .ok_or_else(|| StoreError::not_found("player", id))
    }

    async fn update_credits(&self, id: PlayerId, balance: Credits) -> StoreResult<()> {
        self.check(Operation::UpdateCredits)?;
        if balance < 0 {
            return Err(StoreError::rejected("balance cannot be negative"));
        }
        let mut data = self.data.write();
        data.player_mut(id)?.credits = balance;
        Ok(())
    }

    async fn adjust_credits(&self, id: PlayerId, delta: Credits) -> StoreResult<Credits> {
        self.check(Operation::UpdateCredits)?;
        self.data.write().adjust_credits(id, delta)
    }
}

#[async_trait]
impl ShipStore for MemoryWorld {
    async fn get(&self, id: ShipId) -> StoreResult<Ship> {
        self.check(Operation::GetShip)?;
        self.ship(id).ok_or_else(|| StoreError::not_found("ship", id))
    }

    async fn update_fuel(&self, id: ShipId, fuel: u32) -> StoreResult<()> {
        self.check(Operation::UpdateFuel)?;
        let mut data = self.data.write();
        let data = &mut *data;
        let ship = data
            .ships
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("ship", id))?;
        let max = data
            .ship_types
            .get(&ship.ship_type)
            .map(|ty| ty.max_fuel)
            .unwrap_or(fuel);
        ship.fuel = fuel.min(max);
        Ok(())
    }

    async fn update_hull_and_shields(
        &self,
        id: ShipId,
        hull: u32,
        shields: u32,
    ) -> StoreResult<()> {
        self.check(Operation::UpdateHullAndShields)?;
        let mut data = self.data.write();
        let data = &mut *data;
        let ship = data
            .ships
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("ship", id))?;
        match data.ship_types.get(&ship.ship_type) {
            Some(ty) => {
                ship.hull = hull.min(ty.max_hull);
                ship.shields = shields.min(ty.max_shields);
            }
            None => {
                ship.hull = hull;
                ship.shields = shields;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ItemStore for MemoryWorld {
    async fn get_by_id(&self, id: &str) -> StoreResult<Equipment> {
        self.check(Operation::GetItem)?;
        self.data.read().equipment(id)
    }

    async fn list_by_category(&self, category: EquipmentCategory) -> StoreResult<Vec<Equipment>> {
        self.check(Operation::ListItems)?;
        let data = self.data.read();
        let mut items: Vec<Equipment> = data
            .equipment
            .values()
            .filter(|item| item.category == category)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.name.cmp(&b.name)));
        Ok(items)
    }
}

#[async_trait]
impl OutfittingManager for MemoryWorld {
    async fn purchase(
        &self,
        player: PlayerId,
        equipment_id: &str,
        quantity: u32,
    ) -> StoreResult<TradeReceipt> {
        self.check(Operation::Purchase)?;
        if quantity == 0 {
            return Err(StoreError::rejected("quantity must be at least 1"));
        }
        let mut data = self.data.write();
        let item = data.equipment(equipment_id)?;
        let cost = item.price.saturating_mul(Credits::from(quantity));
        let balance = data.adjust_credits(player, -cost)?;
        let inventory = data.inventories.entry(player).or_default();
        inventory.add(item, quantity);
        info!(%player, equipment = equipment_id, quantity, cost, "Equipment purchased");
        Ok(TradeReceipt {
            balance,
            inventory: inventory.clone(),
        })
    }

    async fn sell(
        &self,
        player: PlayerId,
        equipment_id: &str,
        quantity: u32,
    ) -> StoreResult<TradeReceipt> {
        self.check(Operation::Sell)?;
        let mut data = self.data.write();
        let item = data.equipment(equipment_id)?;
        let removed = data
            .inventories
            .get_mut(&player)
            .map(|inv| inv.remove(equipment_id, quantity))
            .unwrap_or(false);
        if quantity == 0 || !removed {
            return Err(StoreError::rejected(format!(
                "not enough {} in inventory",
                item.name
            )));
        }
        let proceeds = economy::resale_value(item.price, quantity);
        let balance = data.adjust_credits(player, proceeds)?;
        let inventory = data.inventories.get(&player).cloned().unwrap_or_default();
        info!(%player, equipment = equipment_id, quantity, proceeds, "Equipment sold");
        Ok(TradeReceipt { balance, inventory })
    }

    async fn install(
        &self,
        player: PlayerId,
        loadout: LoadoutId,
        slot: usize,
        equipment_id: &str,
    ) -> StoreResult<Loadout> {
        self.check(Operation::Install)?;
        let mut data = self.data.write();
        let item = data.equipment(equipment_id)?;
        {
            let target = data.owned_loadout_mut(player, loadout)?;
            let slot_ref = target
                .slots
                .get(slot)
                .ok_or_else(|| StoreError::not_found("slot", slot))?;
            if !slot_ref.is_empty() {
                return Err(StoreError::rejected("slot is occupied"));
            }
            if !slot_ref.compatible_with(&item) {
                return Err(StoreError::rejected(format!(
                    "{} does not fit a size {} {} slot",
                    item.name, slot_ref.size, slot_ref.slot_type
                )));
            }
        }
        let taken = data
            .inventories
            .get_mut(&player)
            .map(|inv| inv.remove(equipment_id, 1))
            .unwrap_or(false);
        if !taken {
            return Err(StoreError::rejected(format!("no {} in inventory", item.name)));
        }
        let target = data.owned_loadout_mut(player, loadout)?;
        target.slots[slot].equipment = Some(item);
        Ok(target.clone())
    }

    async fn uninstall(
        &self,
        player: PlayerId,
        loadout: LoadoutId,
        slot: usize,
    ) -> StoreResult<Loadout> {
        self.check(Operation::Uninstall)?;
        let mut data = self.data.write();
        let target = data.owned_loadout_mut(player, loadout)?;
        let removed = target
            .slots
            .get_mut(slot)
            .ok_or_else(|| StoreError::not_found("slot", slot))?
            .equipment
            .take()
            .ok_or_else(|| StoreError::rejected("slot is empty"))?;
        let snapshot = target.clone();
        data.inventories
            .entry(player)
            .or_default()
            .add(removed, 1);
        Ok(snapshot)
    }

    async fn create_loadout(
        &self,
        player: PlayerId,
        ship_type: &str,
        name: &str,
    ) -> StoreResult<Loadout> {
        self.check(Operation::CreateLoadout)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::rejected("loadout name is required"));
        }
        let mut data = self.data.write();
        let ty = data
            .ship_types
            .get(ship_type)
            .cloned()
            .ok_or_else(|| StoreError::not_found("ship type", ship_type))?;
        let loadout = Loadout {
            id: Uuid::new_v4(),
            owner: player,
            ship_type: ty.id.clone(),
            name: name.to_string(),
            slots: ty
                .slots
                .iter()
                .map(|spec| Slot::empty(spec.slot_type, spec.size))
                .collect(),
        };
        data.loadouts.insert(loadout.id, loadout.clone());
        Ok(loadout)
    }

    async fn get_loadout(&self, player: PlayerId, loadout: LoadoutId) -> StoreResult<Loadout> {
        self.check(Operation::GetLoadout)?;
        let mut data = self.data.write();
        data.owned_loadout_mut(player, loadout).map(|l| l.clone())
    }

    async fn list_loadouts(&self, player: PlayerId) -> StoreResult<Vec<Loadout>> {
        self.check(Operation::ListLoadouts)?;
        let data = self.data.read();
        let mut loadouts: Vec<Loadout> = data
            .loadouts
            .values()
            .filter(|l| l.owner == player)
            .cloned()
            .collect();
        loadouts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(loadouts)
    }

    async fn get_inventory(&self, player: PlayerId) -> StoreResult<Inventory> {
        self.check(Operation::GetInventory)?;
        Ok(self.inventory(player))
    }
}

#[async_trait]
impl MarketplaceManager for MemoryWorld {
    async fn list_active_auctions(&self) -> StoreResult<Vec<Auction>> {
        self.check(Operation::ListAuctions)?;
        let mut data = self.data.write();
        data.sweep_expired(Utc::now());
        let mut auctions: Vec<Auction> = data
            .auctions
            .values()
            .filter(|a| a.status == AuctionStatus::Active)
            .cloned()
            .collect();
        auctions.sort_by_key(|a| a.end_time);
        Ok(auctions)
    }

    async fn place_bid(
        &self,
        auction: AuctionId,
        bidder: PlayerId,
        amount: Credits,
    ) -> StoreResult<Auction> {
        self.check(Operation::PlaceBid)?;
        let mut data = self.data.write();
        let available = data
            .players
            .get(&bidder)
            .map(|p| p.credits)
            .ok_or_else(|| StoreError::not_found("player", bidder))?;
        let bidder_name = data.player_name(bidder);
        let lot = data
            .auctions
            .get_mut(&auction)
            .ok_or_else(|| StoreError::not_found("auction", auction))?;
        if lot.seller == bidder {
            return Err(StoreError::rejected("cannot bid on your own auction"));
        }
        if amount > available {
            return Err(StoreError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        lot.record_bid(BidRecord {
            bidder,
            bidder_name,
            amount,
            placed_at: Utc::now(),
        })?;
        info!(%auction, %bidder, amount, "Bid accepted");
        Ok(lot.clone())
    }

    async fn buyout(
        &self,
        auction: AuctionId,
        buyer: PlayerId,
    ) -> StoreResult<Settlement<Auction>> {
        self.check(Operation::Buyout)?;
        let mut data = self.data.write();
        let lot = data
            .auctions
            .get(&auction)
            .cloned()
            .ok_or_else(|| StoreError::not_found("auction", auction))?;
        let price = lot
            .buyout()
            .ok_or_else(|| StoreError::rejected("auction has no buyout price"))?;
        if !lot.is_open_at(Utc::now()) {
            return Err(StoreError::rejected("auction is no longer active"));
        }
        if lot.seller == buyer {
            return Err(StoreError::rejected("cannot buy out your own auction"));
        }
        let balance = data.transfer(buyer, lot.seller, price)?;
        data.give_item(buyer, &lot.item.equipment_id, lot.item.quantity);
        let entry = data
            .auctions
            .get_mut(&auction)
            .ok_or_else(|| StoreError::not_found("auction", auction))?;
        entry.status = AuctionStatus::Sold;
        entry.highest_bidder = Some(buyer);
        info!(%auction, %buyer, price, "Auction bought out");
        Ok(Settlement {
            entity: entry.clone(),
            balance,
        })
    }

    async fn cancel_auction(&self, auction: AuctionId, seller: PlayerId) -> StoreResult<Auction> {
        self.check(Operation::CancelAuction)?;
        let mut data = self.data.write();
        let lot = data
            .auctions
            .get(&auction)
            .cloned()
            .ok_or_else(|| StoreError::not_found("auction", auction))?;
        if !lot.can_cancel(seller) {
            return Err(StoreError::rejected(
                "only the seller may cancel, and only before bids are placed",
            ));
        }
        data.give_item(seller, &lot.item.equipment_id, lot.item.quantity);
        let entry = data
            .auctions
            .get_mut(&auction)
            .ok_or_else(|| StoreError::not_found("auction", auction))?;
        entry.status = AuctionStatus::Cancelled;
        Ok(entry.clone())
    }

    async fn create_auction(&self, listing: NewAuction) -> StoreResult<Auction> {
        self.check(Operation::CreateAuction)?;
        if listing.starting_bid <= 0 {
            return Err(StoreError::rejected("starting bid must be positive"));
        }
        if let Some(buyout) = listing.buyout_price {
            if buyout <= listing.starting_bid {
                return Err(StoreError::rejected("buyout must exceed the starting bid"));
            }
        }
        if !(1..=economy::MAX_AUCTION_HOURS).contains(&listing.duration_hours) {
            return Err(StoreError::rejected("invalid auction duration"));
        }
        let mut data = self.data.write();
        let item = data.equipment(&listing.equipment_id)?;
        let escrowed = data
            .inventories
            .get_mut(&listing.seller)
            .map(|inv| inv.remove(&listing.equipment_id, listing.quantity))
            .unwrap_or(false);
        if listing.quantity == 0 || !escrowed {
            return Err(StoreError::rejected(format!(
                "not enough {} in inventory",
                item.name
            )));
        }
        let auction = Auction {
            id: Uuid::new_v4(),
            seller: listing.seller,
            seller_name: listing.seller_name,
            item: AuctionItem {
                equipment_id: item.id.clone(),
                name: item.name.clone(),
                quantity: listing.quantity,
            },
            starting_bid: listing.starting_bid,
            current_bid: 0,
            highest_bidder: None,
            buyout_price: listing.buyout_price,
            end_time: Utc::now() + Duration::hours(listing.duration_hours),
            status: AuctionStatus::Active,
            bids: Vec::new(),
        };
        data.auctions.insert(auction.id, auction.clone());
        info!(auction = %auction.id, seller = %auction.seller, "Auction listed");
        Ok(auction)
    }

    async fn list_open_contracts(&self) -> StoreResult<Vec<Contract>> {
        self.check(Operation::ListContracts)?;
        let mut data = self.data.write();
        data.sweep_expired(Utc::now());
        let mut contracts: Vec<Contract> = data
            .contracts
            .values()
            .filter(|c| !c.status.is_terminal())
            .cloned()
            .collect();
        contracts.sort_by_key(|c| c.posted_at);
        Ok(contracts)
    }

    async fn claim_contract(
        &self,
        contract: ContractId,
        claimant: PlayerId,
    ) -> StoreResult<Contract> {
        self.check(Operation::ClaimContract)?;
        let mut data = self.data.write();
        let entry = data
            .contracts
            .get_mut(&contract)
            .ok_or_else(|| StoreError::not_found("contract", contract))?;
        if !entry.can_claim(claimant) {
            return Err(StoreError::rejected("contract cannot be claimed"));
        }
        entry.status = ContractStatus::Claimed;
        entry.claimant = Some(claimant);
        Ok(entry.clone())
    }

    async fn complete_contract(
        &self,
        contract: ContractId,
        claimant: PlayerId,
    ) -> StoreResult<Settlement<Contract>> {
        self.check(Operation::CompleteContract)?;
        let mut data = self.data.write();
        let reward = match data.contracts.get(&contract) {
            Some(entry) if entry.can_complete(claimant) => entry.reward,
            Some(_) => return Err(StoreError::rejected("contract cannot be completed by you")),
            None => return Err(StoreError::not_found("contract", contract)),
        };
        let balance = data.adjust_credits(claimant, reward)?;
        let entry = data
            .contracts
            .get_mut(&contract)
            .ok_or_else(|| StoreError::not_found("contract", contract))?;
        entry.status = ContractStatus::Completed;
        let settled = entry.clone();
        info!(%contract, %claimant, reward = settled.reward, "Contract completed");
        Ok(Settlement {
            entity: settled,
            balance,
        })
    }

    async fn create_contract(&self, posting: NewContract) -> StoreResult<Contract> {
        self.check(Operation::CreateContract)?;
        if posting.reward < economy::MIN_CONTRACT_REWARD {
            return Err(StoreError::rejected("reward below minimum"));
        }
        if posting.target.trim().is_empty() {
            return Err(StoreError::rejected("target description is required"));
        }
        let now = Utc::now();
        let contract = Contract {
            id: Uuid::new_v4(),
            poster: posting.poster,
            poster_name: posting.poster_name,
            target: posting.target,
            reward: posting.reward,
            status: ContractStatus::Open,
            claimant: None,
            posted_at: now,
            expires_at: now + Duration::hours(economy::POSTING_LIFETIME_HOURS),
        };
        self.data
            .write()
            .contracts
            .insert(contract.id, contract.clone());
        Ok(contract)
    }

    async fn cancel_contract(
        &self,
        contract: ContractId,
        poster: PlayerId,
    ) -> StoreResult<Settlement<Contract>> {
        self.check(Operation::CancelContract)?;
        let mut data = self.data.write();
        let reward = match data.contracts.get(&contract) {
            Some(entry) if entry.can_cancel(poster) => entry.reward,
            Some(_) => return Err(StoreError::rejected("only open contracts can be withdrawn")),
            None => return Err(StoreError::not_found("contract", contract)),
        };
        let balance = data.adjust_credits(poster, reward)?;
        let entry = data
            .contracts
            .get_mut(&contract)
            .ok_or_else(|| StoreError::not_found("contract", contract))?;
        entry.status = ContractStatus::Expired;
        let settled = entry.clone();
        Ok(Settlement {
            entity: settled,
            balance,
        })
    }

    async fn list_active_bounties(&self) -> StoreResult<Vec<Bounty>> {
        self.check(Operation::ListBounties)?;
        let mut data = self.data.write();
        data.sweep_expired(Utc::now());
        let mut bounties: Vec<Bounty> = data
            .bounties
            .values()
            .filter(|b| b.status == BountyStatus::Active)
            .cloned()
            .collect();
        bounties.sort_by(|a, b| b.amount.cmp(&a.amount));
        Ok(bounties)
    }

    async fn post_bounty(&self, posting: NewBounty) -> StoreResult<Bounty> {
        self.check(Operation::PostBounty)?;
        if posting.amount < economy::MIN_BOUNTY {
            return Err(StoreError::rejected("bounty below minimum"));
        }
        let now = Utc::now();
        let bounty = Bounty {
            id: Uuid::new_v4(),
            poster: posting.poster,
            fee: posting.fee(),
            poster_name: posting.poster_name,
            target_name: posting.target_name,
            reason: posting.reason,
            amount: posting.amount,
            status: BountyStatus::Active,
            posted_at: now,
            expires_at: now + Duration::hours(economy::POSTING_LIFETIME_HOURS),
        };
        self.data.write().bounties.insert(bounty.id, bounty.clone());
        Ok(bounty)
    }
}

#[async_trait]
impl Directory for MemoryWorld {
    async fn online_players(&self) -> StoreResult<Vec<PlayerId>> {
        self.check(Operation::Directory)?;
        Ok(self.data.read().online.iter().copied().collect())
    }

    async fn players_in_system(&self, system: SystemId) -> StoreResult<Vec<PlayerId>> {
        self.check(Operation::Directory)?;
        let data = self.data.read();
        Ok(data
            .online
            .iter()
            .filter(|id| {
                data.players
                    .get(id)
                    .map(|p| p.system_id == system)
                    .unwrap_or(false)
            })
            .copied()
            .collect())
    }

    async fn get_player_faction(&self, player: PlayerId) -> StoreResult<Option<FactionId>> {
        self.check(Operation::Directory)?;
        self.data
            .read()
            .players
            .get(&player)
            .map(|p| p.faction.clone())
            .ok_or_else(|| StoreError::not_found("player", player))
    }

    async fn resolve_username(&self, name: &str) -> StoreResult<Option<PlayerId>> {
        self.check(Operation::Directory)?;
        Ok(self.player_named(name).map(|p| p.id))
    }
}

#[async_trait]
impl ChatService for MemoryWorld {
    async fn deliver(&self, recipients: &[PlayerId], entry: &ChatEntry) -> StoreResult<usize> {
        self.check(Operation::Deliver)?;
        let mut data = self.data.write();
        for recipient in recipients {
            data.inboxes
                .entry(*recipient)
                .or_default()
                .push(entry.clone());
        }
        Ok(recipients.len())
    }
}

#[async_trait]
impl MissionBoard for MemoryWorld {
    async fn available(&self, system: SystemId) -> StoreResult<Vec<Mission>> {
        self.check(Operation::ListMissions)?;
        let data = self.data.read();
        let mut missions: Vec<Mission> = data
            .missions
            .values()
            .filter(|m| m.status == MissionStatus::Available && m.origin == system)
            .cloned()
            .collect();
        missions.sort_by(|a, b| b.reward.cmp(&a.reward));
        Ok(missions)
    }

    async fn active_for(&self, player: PlayerId) -> StoreResult<Option<Mission>> {
        self.check(Operation::ListMissions)?;
        Ok(self
            .data
            .read()
            .missions
            .values()
            .find(|m| m.status == MissionStatus::Active && m.assignee == Some(player))
            .cloned())
    }

    async fn accept(&self, player: PlayerId, mission: MissionId) -> StoreResult<Mission> {
        self.check(Operation::AcceptMission)?;
        let mut data = self.data.write();
        if data
            .missions
            .values()
            .any(|m| m.status == MissionStatus::Active && m.assignee == Some(player))
        {
            return Err(StoreError::rejected("you already have an active mission"));
        }
        let entry = data
            .missions
            .get_mut(&mission)
            .ok_or_else(|| StoreError::not_found("mission", mission))?;
        if entry.status != MissionStatus::Available {
            return Err(StoreError::rejected("mission is no longer available"));
        }
        entry.status = MissionStatus::Active;
        entry.assignee = Some(player);
        Ok(entry.clone())
    }

    async fn abandon(&self, player: PlayerId, mission: MissionId) -> StoreResult<Mission> {
        self.check(Operation::AbandonMission)?;
        let mut data = self.data.write();
        let entry = data
            .missions
            .get_mut(&mission)
            .ok_or_else(|| StoreError::not_found("mission", mission))?;
        if entry.status != MissionStatus::Active || entry.assignee != Some(player) {
            return Err(StoreError::rejected("mission is not yours to abandon"));
        }
        entry.status = MissionStatus::Abandoned;
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> (MemoryWorld, Player, Player) {
        let snapshot = WorldSnapshot::demo("pilot", Utc::now());
        let world = MemoryWorld::new(snapshot);
        let pilot = world.player_named("pilot").expect("pilot seeded");
        let vega = world.player_named("vega").expect("vega seeded");
        (world, pilot, vega)
    }

    #[tokio::test]
    async fn purchase_charges_and_stocks_inventory() {
        let (world, pilot, _) = world();
        let item = world
            .list_by_category(EquipmentCategory::Weapon)
            .await
            .unwrap()
            .remove(0);
        let receipt = world.purchase(pilot.id, &item.id, 2).await.unwrap();
        assert_eq!(receipt.balance, pilot.credits - item.price * 2);
        assert_eq!(receipt.inventory.quantity_of(&item.id), 2);
    }

    #[tokio::test]
    async fn purchase_rejects_shortfall() {
        let (world, pilot, _) = world();
        PlayerStore::update_credits(&world, pilot.id, 10)
            .await
            .unwrap();
        let item = world
            .list_by_category(EquipmentCategory::Weapon)
            .await
            .unwrap()
            .remove(0);
        let err = world.purchase(pilot.id, &item.id, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::InsufficientFunds { .. }));
        assert_eq!(world.player(pilot.id).unwrap().credits, 10);
    }

    #[tokio::test]
    async fn seller_cannot_bid_on_own_auction() {
        let (world, _, vega) = world();
        let lot = world
            .list_active_auctions()
            .await
            .unwrap()
            .into_iter()
            .find(|a| a.seller == vega.id)
            .expect("vega has a listing");
        let err = world
            .place_bid(lot.id, vega.id, lot.minimum_bid())
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::rejected("cannot bid on your own auction"));
    }

    #[tokio::test]
    async fn cancelled_contract_refunds_poster() {
        let (world, pilot, _) = world();
        let contract = world
            .create_contract(NewContract {
                poster: pilot.id,
                poster_name: pilot.username.clone(),
                target: "Escort convoy".to_string(),
                reward: 2_000,
            })
            .await
            .unwrap();
        let settlement = world.cancel_contract(contract.id, pilot.id).await.unwrap();
        assert_eq!(settlement.entity.status, ContractStatus::Expired);
        assert_eq!(settlement.balance, pilot.credits + 2_000);
    }

    #[tokio::test]
    async fn buyout_against_a_missing_seller_moves_no_credits() {
        let mut snapshot = WorldSnapshot::demo("pilot", Utc::now());
        let vega = snapshot
            .players
            .iter()
            .position(|p| p.username == "vega")
            .expect("vega seeded");
        let vega = snapshot.players.remove(vega).id;
        let world = MemoryWorld::new(snapshot);
        let pilot = world.player_named("pilot").expect("pilot seeded");
        let lot = world
            .list_active_auctions()
            .await
            .unwrap()
            .into_iter()
            .find(|a| a.seller == vega && a.buyout().is_some())
            .expect("vega's buyout lot");

        let err = world.buyout(lot.id, pilot.id).await.unwrap_err();

        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(world.player(pilot.id).unwrap().credits, pilot.credits);
        assert_eq!(world.auction(lot.id).unwrap().status, AuctionStatus::Active);
        assert_eq!(
            world.inventory(pilot.id).quantity_of(&lot.item.equipment_id),
            0
        );
    }

    #[tokio::test]
    async fn completion_for_an_unknown_claimant_keeps_the_contract_claimed() {
        let mut snapshot = WorldSnapshot::demo("pilot", Utc::now());
        let now = Utc::now();
        let ghost = Uuid::new_v4();
        let poster = snapshot.players[0].id;
        let contract = Contract {
            id: Uuid::new_v4(),
            poster,
            poster_name: snapshot.players[0].username.clone(),
            target: "Haul reactor cores".to_string(),
            reward: 3_000,
            status: ContractStatus::Claimed,
            claimant: Some(ghost),
            posted_at: now,
            expires_at: now + Duration::hours(24),
        };
        snapshot.contracts.push(contract.clone());
        let world = MemoryWorld::new(snapshot);

        assert!(world.complete_contract(contract.id, ghost).await.is_err());
        assert_eq!(
            world.contract(contract.id).unwrap().status,
            ContractStatus::Claimed
        );
    }

    #[tokio::test]
    async fn unfunded_winning_bid_returns_the_lot_to_the_seller() {
        let mut snapshot = WorldSnapshot::demo("pilot", Utc::now());
        let lyra = snapshot
            .players
            .iter_mut()
            .find(|p| p.username == "lyra")
            .expect("lyra seeded");
        lyra.credits = 100;
        let lyra = lyra.id;
        let lot = snapshot
            .auctions
            .iter_mut()
            .find(|a| a.buyout().is_some())
            .expect("buyout lot seeded");
        lot.current_bid = 4_000;
        lot.highest_bidder = Some(lyra);
        lot.end_time = Utc::now() - Duration::minutes(1);
        let (lot, seller) = (lot.id, lot.seller);
        let equipment_id = snapshot
            .auctions
            .iter()
            .find(|a| a.id == lot)
            .map(|a| a.item.equipment_id.clone())
            .unwrap();
        let world = MemoryWorld::new(snapshot);
        let seller_before = world.player(seller).unwrap();
        let held_before = world.inventory(seller).quantity_of(&equipment_id);

        assert!(world
            .list_active_auctions()
            .await
            .unwrap()
            .iter()
            .all(|a| a.id != lot));

        assert_eq!(world.auction(lot).unwrap().status, AuctionStatus::Expired);
        assert_eq!(world.player(lyra).unwrap().credits, 100);
        assert_eq!(world.player(seller).unwrap().credits, seller_before.credits);
        assert_eq!(
            world.inventory(seller).quantity_of(&equipment_id),
            held_before + 1
        );
        assert_eq!(world.inventory(lyra).quantity_of(&equipment_id), 0);
    }

    #[tokio::test]
    async fn injected_fault_fires_once() {
        let (world, pilot, _) = world();
        world.fail_next(
            Operation::UpdateCredits,
            StoreError::Persistence("disk full".to_string()),
        );
        assert!(PlayerStore::update_credits(&world, pilot.id, 1)
            .await
            .is_err());
        assert!(PlayerStore::update_credits(&world, pilot.id, 1)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn install_moves_item_out_of_inventory() {
        let (world, pilot, _) = world();
        let loadout = world
            .list_loadouts(pilot.id)
            .await
            .unwrap()
            .remove(0);
        let (slot_idx, slot) = loadout
            .slots
            .iter()
            .enumerate()
            .find(|(_, s)| s.is_empty())
            .map(|(i, s)| (i, s.clone()))
            .expect("empty slot");
        let item = world
            .list_by_category(slot.slot_type)
            .await
            .unwrap()
            .into_iter()
            .find(|e| slot.compatible_with(e))
            .expect("compatible item");
        world.purchase(pilot.id, &item.id, 1).await.unwrap();
        let updated = world
            .install(pilot.id, loadout.id, slot_idx, &item.id)
            .await
            .unwrap();
        assert_eq!(updated.slots[slot_idx].equipment.as_ref(), Some(&item));
        assert_eq!(world.inventory(pilot.id).quantity_of(&item.id), 0);
    }
}
