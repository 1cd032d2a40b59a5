//! Runs commands against the capability handles.
//!
//! Every command yields exactly one message. A command never waits on the
//! result of another command; multi-step workflows are split across
//! transitions, except for the fixed write pairs of a service purchase and
//! an escrowed posting, which report which step failed.

use std::time::Instant;

use tracing::{debug, warn};

use super::{
    command::{Command, Compensation, EscrowPlan, OutgoingChat, Posting, ServicePlan},
    message::{Message, Outcome},
};
use crate::{
    capability::{Capabilities, StoreResult},
    chat::{resolve_recipients, RouteError},
    models::{EquipmentCategory, Player, PlayerId, Ship, ShipId, SystemId},
    screens::{
        ChatOutcome, EscrowFailure, MarketOutcome, MissionBoardView, MissionOutcome,
        OutfitterData, OutfitterOutcome, Posted, ServiceFailure, ServiceOutcome, SlotChange,
    },
};

/// Executes [`Command`]s. Cheap to share behind an `Arc`.
#[derive(Clone)]
pub struct Executor {
    caps: Capabilities,
}

impl Executor {
    /// Executor over a set of capability handles.
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }

    /// The handles commands run against.
    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Run one command to completion and package its result.
    pub async fn execute(&self, command: Command) -> Message {
        let name = command.name();
        let started = Instant::now();
        let outcome = self.run(command).await;
        debug!(
            command = name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        Message::Result(outcome)
    }

    async fn run(&self, command: Command) -> Outcome {
        let caps = &self.caps;
        match command {
            Command::RefreshPlayer { player, ship } => {
                Outcome::PlayerRefreshed(traced("refresh_player", self.refresh(player, ship).await))
            }
            Command::OpenOutfitter { player, category } => {
                let result = self.outfitter_data(player, category).await;
                Outcome::Outfitter(OutfitterOutcome::Opened {
                    category,
                    result: traced("open_outfitter", result),
                })
            }
            Command::LoadCatalog { category } => {
                let result = caps.items.list_by_category(category).await;
                Outcome::Outfitter(OutfitterOutcome::CatalogLoaded {
                    category,
                    result: traced("load_catalog", result),
                })
            }
            Command::Purchase {
                player,
                equipment_id,
                quantity,
            } => {
                let result = caps
                    .outfitting
                    .purchase(player, &equipment_id, quantity)
                    .await;
                Outcome::Outfitter(OutfitterOutcome::Purchased {
                    equipment_id,
                    quantity,
                    result: traced("purchase", result),
                })
            }
            Command::Sell {
                player,
                equipment_id,
                quantity,
            } => {
                let result = caps.outfitting.sell(player, &equipment_id, quantity).await;
                Outcome::Outfitter(OutfitterOutcome::Sold {
                    equipment_id,
                    quantity,
                    result: traced("sell", result),
                })
            }
            Command::LoadInventory { player } => {
                let result = caps.outfitting.get_inventory(player).await;
                Outcome::Outfitter(OutfitterOutcome::InventoryLoaded(traced(
                    "load_inventory",
                    result,
                )))
            }
            Command::LoadLoadout { player, loadout } => {
                let result = caps.outfitting.get_loadout(player, loadout).await;
                Outcome::Outfitter(OutfitterOutcome::LoadoutLoaded {
                    loadout,
                    result: traced("load_loadout", result),
                })
            }
            Command::Install {
                player,
                loadout,
                slot,
                equipment_id,
            } => {
                let result = caps
                    .outfitting
                    .install(player, loadout, slot, &equipment_id)
                    .await;
                Outcome::Outfitter(OutfitterOutcome::LoadoutChanged {
                    loadout,
                    slot,
                    change: SlotChange::Install,
                    result: traced("install", result),
                })
            }
            Command::Uninstall {
                player,
                loadout,
                slot,
            } => {
                let result = caps.outfitting.uninstall(player, loadout, slot).await;
                Outcome::Outfitter(OutfitterOutcome::LoadoutChanged {
                    loadout,
                    slot,
                    change: SlotChange::Uninstall,
                    result: traced("uninstall", result),
                })
            }
            Command::CreateLoadout {
                player,
                ship_type,
                name,
            } => {
                let result = caps
                    .outfitting
                    .create_loadout(player, &ship_type, &name)
                    .await;
                Outcome::Outfitter(OutfitterOutcome::LoadoutCreated(traced(
                    "create_loadout",
                    result,
                )))
            }
            Command::PersistService(plan) => {
                let result = self.persist_service(&plan).await;
                if let Err(failure) = &result {
                    warn!(player = %plan.player, service = %plan.kind, %failure, "Service persistence failed");
                }
                Outcome::Services(ServiceOutcome { plan, result })
            }
            Command::Compensate(compensation) => {
                let result = self.compensate(&compensation).await;
                Outcome::Compensated {
                    compensation,
                    result: traced("compensate", result),
                }
            }
            Command::LoadAuctions => Outcome::Market(MarketOutcome::AuctionsLoaded(traced(
                "load_auctions",
                caps.marketplace.list_active_auctions().await,
            ))),
            Command::PlaceBid {
                auction,
                bidder,
                amount,
            } => {
                let result = caps.marketplace.place_bid(auction, bidder, amount).await;
                Outcome::Market(MarketOutcome::BidPlaced {
                    auction,
                    amount,
                    result: traced("place_bid", result),
                })
            }
            Command::Buyout { auction, buyer } => {
                let result = caps.marketplace.buyout(auction, buyer).await;
                Outcome::Market(MarketOutcome::BoughtOut {
                    auction,
                    result: traced("buyout", result),
                })
            }
            Command::CancelAuction { auction, seller } => {
                let result = caps.marketplace.cancel_auction(auction, seller).await;
                Outcome::Market(MarketOutcome::AuctionCancelled {
                    auction,
                    result: traced("cancel_auction", result),
                })
            }
            Command::CreateAuction(listing) => {
                let result = caps.marketplace.create_auction(listing).await;
                Outcome::Market(MarketOutcome::AuctionCreated(traced("create_auction", result)))
            }
            Command::LoadContracts => Outcome::Market(MarketOutcome::ContractsLoaded(traced(
                "load_contracts",
                caps.marketplace.list_open_contracts().await,
            ))),
            Command::ClaimContract { contract, claimant } => {
                let result = caps.marketplace.claim_contract(contract, claimant).await;
                Outcome::Market(MarketOutcome::ContractClaimed {
                    contract,
                    result: traced("claim_contract", result),
                })
            }
            Command::CompleteContract { contract, claimant } => {
                let result = caps.marketplace.complete_contract(contract, claimant).await;
                Outcome::Market(MarketOutcome::ContractCompleted {
                    contract,
                    result: traced("complete_contract", result),
                })
            }
            Command::CancelContract { contract, poster } => {
                let result = caps.marketplace.cancel_contract(contract, poster).await;
                Outcome::Market(MarketOutcome::ContractCancelled {
                    contract,
                    result: traced("cancel_contract", result),
                })
            }
            Command::LoadBounties => Outcome::Market(MarketOutcome::BountiesLoaded(traced(
                "load_bounties",
                caps.marketplace.list_active_bounties().await,
            ))),
            Command::PostEscrow(plan) => {
                let result = self.post_escrow(&plan).await;
                if let Err(failure) = &result {
                    warn!(player = %plan.player, %failure, "Escrowed posting failed");
                }
                Outcome::Market(MarketOutcome::Posted { plan, result })
            }
            Command::SendChat(outgoing) => Outcome::Chat(self.send_chat(outgoing).await),
            Command::LoadMissions { player, system } => {
                let result = self.mission_board(player, system).await;
                Outcome::Missions(MissionOutcome::Loaded(traced("load_missions", result)))
            }
            Command::AcceptMission { player, mission } => {
                let result = caps.missions.accept(player, mission).await;
                Outcome::Missions(MissionOutcome::Accepted(traced("accept_mission", result)))
            }
            Command::AbandonMission { player, mission } => {
                let result = caps.missions.abandon(player, mission).await;
                Outcome::Missions(MissionOutcome::Abandoned(traced("abandon_mission", result)))
            }
        }
    }

    async fn refresh(&self, player: PlayerId, ship: ShipId) -> StoreResult<(Player, Ship)> {
        let player = self.caps.players.get(player).await?;
        let ship = self.caps.ships.get(ship).await?;
        Ok((player, ship))
    }

    async fn outfitter_data(
        &self,
        player: PlayerId,
        category: EquipmentCategory,
    ) -> StoreResult<OutfitterData> {
        Ok(OutfitterData {
            catalog: self.caps.items.list_by_category(category).await?,
            inventory: self.caps.outfitting.get_inventory(player).await?,
            loadouts: self.caps.outfitting.list_loadouts(player).await?,
        })
    }

    /// Ship gauges first, then the balance.
    async fn persist_service(&self, plan: &ServicePlan) -> Result<(), ServiceFailure> {
        let ships = &self.caps.ships;
        let written = if plan.kind.writes_fuel() {
            ships.update_fuel(plan.ship, plan.after.fuel).await
        } else {
            ships
                .update_hull_and_shields(plan.ship, plan.after.hull, plan.after.shields)
                .await
        };
        written.map_err(ServiceFailure::ShipWrite)?;
        self.caps
            .players
            .adjust_credits(plan.player, -plan.quote.cost)
            .await
            .map(|_| ())
            .map_err(ServiceFailure::CreditWrite)
    }

    async fn compensate(&self, compensation: &Compensation) -> StoreResult<()> {
        match compensation {
            Compensation::RestoreShip { ship, vitals } => {
                self.caps.ships.update_fuel(*ship, vitals.fuel).await?;
                self.caps
                    .ships
                    .update_hull_and_shields(*ship, vitals.hull, vitals.shields)
                    .await
            }
            Compensation::RefundCredits { player, amount } => {
                self.caps.players.adjust_credits(*player, *amount).await?;
                Ok(())
            }
        }
    }

    /// Debit the escrow, then record the posting.
    async fn post_escrow(&self, plan: &EscrowPlan) -> Result<Posted, EscrowFailure> {
        self.caps
            .players
            .adjust_credits(plan.player, -plan.posting.escrow())
            .await
            .map_err(EscrowFailure::Debit)?;
        let market = &self.caps.marketplace;
        let recorded = match &plan.posting {
            Posting::Contract(posting) => market
                .create_contract(posting.clone())
                .await
                .map(Posted::Contract),
            Posting::Bounty(posting) => market.post_bounty(posting.clone()).await.map(Posted::Bounty),
        };
        recorded.map_err(EscrowFailure::Record)
    }

    async fn send_chat(&self, outgoing: OutgoingChat) -> ChatOutcome {
        let OutgoingChat {
            sender,
            entry,
            target,
        } = outgoing;
        let result = async {
            let recipients =
                resolve_recipients(self.caps.directory.as_ref(), sender, &target).await?;
            let delivered = self.caps.chat.deliver(&recipients, &entry).await?;
            Ok::<usize, RouteError>(delivered)
        }
        .await;
        if let Err(err) = &result {
            warn!(?target, %err, "Chat routing failed");
        }
        ChatOutcome {
            channel: entry.channel,
            result,
        }
    }

    async fn mission_board(
        &self,
        player: PlayerId,
        system: SystemId,
    ) -> StoreResult<MissionBoardView> {
        Ok(MissionBoardView {
            available: self.caps.missions.available(system).await?,
            active: self.caps.missions.active_for(player).await?,
        })
    }
}

fn traced<T>(command: &'static str, result: StoreResult<T>) -> StoreResult<T> {
    if let Err(err) = &result {
        warn!(command, %err, "Command failed");
    }
    result
}
