use crate::{
    chat::{ChatEntry, ChatTarget},
    economy::Quote,
    models::{
        AuctionId, ContractId, Credits, EquipmentCategory, EquipmentId, LoadoutId, MissionId,
        NewAuction, NewBounty, NewContract, PlayerId, ShipId, ShipVitals, SystemId,
    },
    screens::ServiceKind,
};

/// Action that may have at most one command outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionKey {
    /// Re-read of the player and ship records.
    RefreshPlayer,
    /// First catalog and inventory load on the outfitter.
    LoadOutfitter,
    /// Catalog page for one category.
    LoadCatalog,
    /// Inventory reload.
    LoadInventory,
    /// Loadout reload.
    LoadLoadout,
    /// Equipment purchase.
    Purchase,
    /// Equipment sale.
    Sell,
    /// Install, uninstall or loadout creation.
    Loadout,
    /// Refuel or repair.
    Service,
    /// Auction list load.
    LoadAuctions,
    /// Contract list load.
    LoadContracts,
    /// Bounty list load.
    LoadBounties,
    /// Auction bid.
    Bid,
    /// Auction buyout.
    Buyout,
    /// Auction withdrawal.
    CancelAuction,
    /// New auction listing.
    CreateAuction,
    /// Contract claim.
    Claim,
    /// Contract completion.
    Complete,
    /// Contract withdrawal.
    CancelContract,
    /// Escrowed contract or bounty posting.
    Post,
    /// Mission board load.
    LoadMissions,
    /// Mission accept or abandon.
    Mission,
    /// Undo of a half-applied write.
    Compensate,
}

impl ActionKey {
    /// Human name used in "still processing" notices.
    pub fn label(self) -> &'static str {
        match self {
            ActionKey::RefreshPlayer => "refresh",
            ActionKey::LoadOutfitter | ActionKey::LoadCatalog => "catalog",
            ActionKey::LoadInventory => "inventory",
            ActionKey::LoadLoadout | ActionKey::Loadout => "loadout",
            ActionKey::Purchase => "purchase",
            ActionKey::Sell => "sale",
            ActionKey::Service => "service",
            ActionKey::LoadAuctions => "auction list",
            ActionKey::LoadContracts => "contract list",
            ActionKey::LoadBounties => "bounty list",
            ActionKey::Bid => "bid",
            ActionKey::Buyout => "buyout",
            ActionKey::CancelAuction => "cancellation",
            ActionKey::CreateAuction => "listing",
            ActionKey::Claim => "claim",
            ActionKey::Complete => "completion",
            ActionKey::CancelContract => "withdrawal",
            ActionKey::Post => "posting",
            ActionKey::LoadMissions => "mission list",
            ActionKey::Mission => "mission",
            ActionKey::Compensate => "rollback",
        }
    }

    /// Actions that read or write the player's balance.
    pub fn moves_credits(self) -> bool {
        matches!(
            self,
            ActionKey::RefreshPlayer
                | ActionKey::Purchase
                | ActionKey::Sell
                | ActionKey::Service
                | ActionKey::Buyout
                | ActionKey::Complete
                | ActionKey::CancelContract
                | ActionKey::Post
                | ActionKey::Compensate
        )
    }
}

/// Durable writes for a station service whose local effect is already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePlan {
    /// Refuel or repair.
    pub kind: ServiceKind,
    /// Player charged for the service.
    pub player: PlayerId,
    /// Ship being serviced.
    pub ship: ShipId,
    /// Units and cost charged.
    pub quote: Quote,
    /// Vitals before the service, used to revert.
    pub before: ShipVitals,
    /// Vitals to persist.
    pub after: ShipVitals,
}

/// Marketplace posting whose reward is paid into escrow up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Posting {
    /// Contract whose reward is escrowed.
    Contract(NewContract),
    /// Bounty whose amount and fee are escrowed.
    Bounty(NewBounty),
}

impl Posting {
    /// Credits taken from the poster.
    pub fn escrow(&self) -> Credits {
        match self {
            Posting::Contract(contract) => contract.reward,
            Posting::Bounty(bounty) => bounty.total_cost(),
        }
    }
}

/// Escrow debit plus the record write that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowPlan {
    /// Record to write once the escrow is taken.
    pub posting: Posting,
    /// Poster whose balance is debited.
    pub player: PlayerId,
}

/// Best-effort undo of a durable write whose companion write failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Put ship gauges back after the credit write failed.
    RestoreShip {
        /// Ship to restore.
        ship: ShipId,
        /// Gauges from before the service.
        vitals: ShipVitals,
    },
    /// Pay the escrow back after the posting record failed.
    RefundCredits {
        /// Poster to refund.
        player: PlayerId,
        /// Escrow taken.
        amount: Credits,
    },
}

/// Chat line on its way out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingChat {
    /// Sending player, excluded from the recipients.
    pub sender: PlayerId,
    /// Line as echoed locally.
    pub entry: ChatEntry,
    /// Audience to resolve.
    pub target: ChatTarget,
}

/// Deferred unit of work. Carries copies of what it needs, never the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Re-read the player and ship records.
    RefreshPlayer {
        /// Session player.
        player: PlayerId,
        /// Active ship.
        ship: ShipId,
    },
    /// Load the opening catalog page and the inventory together.
    OpenOutfitter {
        /// Session player.
        player: PlayerId,
        /// Category of the first page.
        category: EquipmentCategory,
    },
    /// Load the catalog page for one category.
    LoadCatalog {
        /// Category to list.
        category: EquipmentCategory,
    },
    /// Buy equipment into the inventory.
    Purchase {
        /// Buyer.
        player: PlayerId,
        /// Item to buy.
        equipment_id: EquipmentId,
        /// Units to buy.
        quantity: u32,
    },
    /// Sell equipment out of the inventory.
    Sell {
        /// Seller.
        player: PlayerId,
        /// Item to sell.
        equipment_id: EquipmentId,
        /// Units to sell.
        quantity: u32,
    },
    /// Reload the inventory.
    LoadInventory {
        /// Inventory owner.
        player: PlayerId,
    },
    /// Reload one loadout.
    LoadLoadout {
        /// Loadout owner.
        player: PlayerId,
        /// Loadout to read.
        loadout: LoadoutId,
    },
    /// Move an inventory item into a loadout slot.
    Install {
        /// Loadout owner.
        player: PlayerId,
        /// Target loadout.
        loadout: LoadoutId,
        /// Slot index.
        slot: usize,
        /// Item to install.
        equipment_id: EquipmentId,
    },
    /// Move a slot's item back to the inventory.
    Uninstall {
        /// Loadout owner.
        player: PlayerId,
        /// Target loadout.
        loadout: LoadoutId,
        /// Slot index.
        slot: usize,
    },
    /// Create an empty loadout for a ship type.
    CreateLoadout {
        /// Loadout owner.
        player: PlayerId,
        /// Ship type the slots follow.
        ship_type: String,
        /// Loadout name.
        name: String,
    },
    /// Persist a refuel or repair.
    PersistService(ServicePlan),
    /// Undo a half-applied write.
    Compensate(Compensation),
    /// Load the auction list.
    LoadAuctions,
    /// Bid on an auction.
    PlaceBid {
        /// Target lot.
        auction: AuctionId,
        /// Bidding player.
        bidder: PlayerId,
        /// Amount bid.
        amount: Credits,
    },
    /// Buy a lot outright.
    Buyout {
        /// Target lot.
        auction: AuctionId,
        /// Buying player.
        buyer: PlayerId,
    },
    /// Withdraw an unbid lot.
    CancelAuction {
        /// Target lot.
        auction: AuctionId,
        /// Listing player.
        seller: PlayerId,
    },
    /// List an inventory item for auction.
    CreateAuction(NewAuction),
    /// Load the contract list.
    LoadContracts,
    /// Claim an open contract.
    ClaimContract {
        /// Target contract.
        contract: ContractId,
        /// Claiming player.
        claimant: PlayerId,
    },
    /// Complete a claimed contract and collect the reward.
    CompleteContract {
        /// Target contract.
        contract: ContractId,
        /// Claiming player.
        claimant: PlayerId,
    },
    /// Withdraw an open contract and recover the escrow.
    CancelContract {
        /// Target contract.
        contract: ContractId,
        /// Posting player.
        poster: PlayerId,
    },
    /// Load the bounty list.
    LoadBounties,
    /// Take escrow and write a contract or bounty.
    PostEscrow(EscrowPlan),
    /// Route and deliver a chat line.
    SendChat(OutgoingChat),
    /// Load the mission board for a system.
    LoadMissions {
        /// Session player.
        player: PlayerId,
        /// System whose offers to list.
        system: SystemId,
    },
    /// Take an available mission.
    AcceptMission {
        /// Accepting player.
        player: PlayerId,
        /// Target mission.
        mission: MissionId,
    },
    /// Drop the active mission.
    AbandonMission {
        /// Assignee.
        player: PlayerId,
        /// Target mission.
        mission: MissionId,
    },
}

impl Command {
    /// In-flight key this command occupies, if it is gated.
    pub fn action_key(&self) -> Option<ActionKey> {
        let key = match self {
            Command::RefreshPlayer { .. } => ActionKey::RefreshPlayer,
            Command::OpenOutfitter { .. } => ActionKey::LoadOutfitter,
            Command::LoadCatalog { .. } => ActionKey::LoadCatalog,
            Command::Purchase { .. } => ActionKey::Purchase,
            Command::Sell { .. } => ActionKey::Sell,
            Command::LoadInventory { .. } => ActionKey::LoadInventory,
            Command::LoadLoadout { .. } => ActionKey::LoadLoadout,
            Command::Install { .. } | Command::Uninstall { .. } | Command::CreateLoadout { .. } => {
                ActionKey::Loadout
            }
            Command::PersistService(_) => ActionKey::Service,
            Command::LoadAuctions => ActionKey::LoadAuctions,
            Command::PlaceBid { .. } => ActionKey::Bid,
            Command::Buyout { .. } => ActionKey::Buyout,
            Command::CancelAuction { .. } => ActionKey::CancelAuction,
            Command::CreateAuction(_) => ActionKey::CreateAuction,
            Command::LoadContracts => ActionKey::LoadContracts,
            Command::ClaimContract { .. } => ActionKey::Claim,
            Command::CompleteContract { .. } => ActionKey::Complete,
            Command::CancelContract { .. } => ActionKey::CancelContract,
            Command::LoadBounties => ActionKey::LoadBounties,
            Command::PostEscrow(_) => ActionKey::Post,
            Command::LoadMissions { .. } => ActionKey::LoadMissions,
            Command::AcceptMission { .. } | Command::AbandonMission { .. } => ActionKey::Mission,
            Command::Compensate(_) => ActionKey::Compensate,
            Command::SendChat(_) => return None,
        };
        Some(key)
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::RefreshPlayer { .. } => "refresh_player",
            Command::OpenOutfitter { .. } => "open_outfitter",
            Command::LoadCatalog { .. } => "load_catalog",
            Command::Purchase { .. } => "purchase",
            Command::Sell { .. } => "sell",
            Command::LoadInventory { .. } => "load_inventory",
            Command::LoadLoadout { .. } => "load_loadout",
            Command::Install { .. } => "install",
            Command::Uninstall { .. } => "uninstall",
            Command::CreateLoadout { .. } => "create_loadout",
            Command::PersistService(_) => "persist_service",
            Command::Compensate(_) => "compensate",
            Command::LoadAuctions => "load_auctions",
            Command::PlaceBid { .. } => "place_bid",
            Command::Buyout { .. } => "buyout",
            Command::CancelAuction { .. } => "cancel_auction",
            Command::CreateAuction(_) => "create_auction",
            Command::LoadContracts => "load_contracts",
            Command::ClaimContract { .. } => "claim_contract",
            Command::CompleteContract { .. } => "complete_contract",
            Command::CancelContract { .. } => "cancel_contract",
            Command::LoadBounties => "load_bounties",
            Command::PostEscrow(_) => "post_escrow",
            Command::SendChat(_) => "send_chat",
            Command::LoadMissions { .. } => "load_missions",
            Command::AcceptMission { .. } => "accept_mission",
            Command::AbandonMission { .. } => "abandon_mission",
        }
    }
}
