use std::sync::Arc;

use chrono::{Duration, Utc};
use spacetrader_core::{
    bootstrap,
    capability::{MarketplaceManager, Operation, PlayerStore},
    chat::ChatKind,
    engine::NoticeLevel,
    models::{ContractStatus, Player},
    screens::{
        AuctionDraft, BountyDraft, ChatIntent, ContractDraft, MarketIntent, MarketTab, MissionIntent,
        OutfitterIntent, ServiceKind, ServicesIntent,
    },
    Capabilities, Intent, MemoryWorld, Message, ScreenKind, SessionRuntime, SessionSettings,
    StoreError, WorldSnapshot,
};

fn demo() -> WorldSnapshot {
    WorldSnapshot::demo("pilot", Utc::now())
}

fn pilot_mut(snapshot: &mut WorldSnapshot) -> &mut Player {
    snapshot
        .players_mut()
        .iter_mut()
        .find(|p| p.username == "pilot")
        .unwrap()
}

async fn start(snapshot: WorldSnapshot) -> (Arc<MemoryWorld>, SessionRuntime) {
    let world = Arc::new(MemoryWorld::new(snapshot));
    let caps = Capabilities::from_world(world.clone());
    let state = bootstrap(&caps, &world.ship_catalog(), "pilot", SessionSettings::default())
        .await
        .unwrap();
    (world, SessionRuntime::new(state, caps))
}

async fn open(runtime: &mut SessionRuntime, screen: ScreenKind) {
    runtime.dispatch(Message::Navigate(screen));
    runtime.settle().await;
    assert_eq!(runtime.state().screen_kind(), screen);
}

fn intent(intent: Intent) -> Message {
    Message::Intent(intent)
}

fn notice(runtime: &SessionRuntime) -> (NoticeLevel, String) {
    let notice = runtime.state().ctx.notice.clone().unwrap();
    (notice.level, notice.text)
}

fn pilot_id(runtime: &SessionRuntime) -> uuid::Uuid {
    runtime.state().ctx.player.id
}

#[tokio::test]
async fn unaffordable_purchase_never_reaches_the_store() {
    let mut snapshot = demo();
    pilot_mut(&mut snapshot).credits = 500;
    let (world, mut runtime) = start(snapshot).await;
    open(&mut runtime, ScreenKind::Outfitter).await;

    let scheduled = runtime.dispatch(intent(Intent::Outfitter(OutfitterIntent::Purchase {
        equipment_id: "beam-laser".into(),
        quantity: 1,
    })));

    assert!(!scheduled);
    assert_eq!(runtime.outstanding(), 0);
    assert_eq!(runtime.state().ctx.player.credits, 500);
    let (level, text) = notice(&runtime);
    assert_eq!(level, NoticeLevel::Warning);
    assert!(text.starts_with("Insufficient credits"));
    let pilot = world.player(pilot_id(&runtime)).unwrap();
    assert_eq!(pilot.credits, 500);
    assert_eq!(world.inventory(pilot.id).quantity_of("beam-laser"), 0);
}

#[tokio::test]
async fn purchase_updates_balance_from_the_store() {
    let (world, mut runtime) = start(demo()).await;
    open(&mut runtime, ScreenKind::Outfitter).await;

    assert!(runtime.dispatch(intent(Intent::Outfitter(OutfitterIntent::Purchase {
        equipment_id: "pulse-laser".into(),
        quantity: 2,
    }))));
    runtime.settle().await;

    assert_eq!(runtime.state().ctx.player.credits, 25_000 - 2 * 1_200);
    let shop = runtime.state().outfitter().unwrap();
    assert_eq!(shop.inventory.quantity_of("pulse-laser"), 2);
    assert_eq!(world.player(pilot_id(&runtime)).unwrap().credits, 22_600);
}

#[tokio::test]
async fn installing_keeps_the_loadout_consistent() {
    let (world, mut runtime) = start(demo()).await;
    open(&mut runtime, ScreenKind::Outfitter).await;
    let loadout = runtime.state().outfitter().unwrap().loadouts[0].id;

    assert!(runtime.dispatch(intent(Intent::Outfitter(OutfitterIntent::Install {
        loadout,
        slot: 2,
        equipment_id: "deflector-mk1".into(),
    }))));
    runtime.settle().await;

    let shop = runtime.state().outfitter().unwrap();
    let fitted = shop.loadout(loadout).unwrap();
    assert_eq!(
        fitted.slot(2).and_then(|s| s.equipment.as_ref()).map(|e| e.id.as_str()),
        Some("deflector-mk1")
    );
    let sizes: u32 = fitted.installed().map(|e| u32::from(e.size)).sum();
    assert_eq!(fitted.used_space(), sizes);
    for slot in &fitted.slots {
        if let Some(item) = &slot.equipment {
            assert!(item.size <= slot.size);
            assert_eq!(item.category, slot.slot_type);
        }
    }
    assert_eq!(shop.inventory.quantity_of("deflector-mk1"), 0);
    assert_eq!(world.inventory(pilot_id(&runtime)).quantity_of("deflector-mk1"), 0);
}

#[tokio::test]
async fn failed_install_reloads_the_stored_loadout() {
    let (world, mut runtime) = start(demo()).await;
    open(&mut runtime, ScreenKind::Outfitter).await;
    let before = runtime.state().outfitter().unwrap().loadouts[0].clone();

    world.fail_next(Operation::Install, StoreError::Persistence("disk full".into()));
    assert!(runtime.dispatch(intent(Intent::Outfitter(OutfitterIntent::Install {
        loadout: before.id,
        slot: 2,
        equipment_id: "deflector-mk1".into(),
    }))));
    runtime.settle().await;

    let shop = runtime.state().outfitter().unwrap();
    assert_eq!(shop.loadout(before.id).unwrap().slots, before.slots);
    assert_eq!(notice(&runtime).0, NoticeLevel::Error);
    assert_eq!(world.inventory(pilot_id(&runtime)).quantity_of("deflector-mk1"), 1);
    assert!(runtime.state().ctx.in_flight.is_empty());
}

#[tokio::test]
async fn rival_bids_climb_by_the_minimum_increment() {
    let mut snapshot = demo();
    let lot = snapshot
        .auctions_mut()
        .iter_mut()
        .find(|a| a.item.equipment_id == "beam-laser")
        .unwrap();
    lot.starting_bid = 1_000;
    let auction = lot.id;
    let (world, mut runtime) = start(snapshot).await;
    open(&mut runtime, ScreenKind::Marketplace).await;
    let bid = intent(Intent::Market(MarketIntent::Bid { auction }));

    assert!(runtime.dispatch(bid.clone()));
    runtime.settle().await;
    assert_eq!(world.auction(auction).unwrap().current_bid, 1_000);

    let lyra = world.player_named("lyra").unwrap().id;
    let rival = world.place_bid(auction, lyra, 1_050).await.unwrap();
    assert_eq!(rival.current_bid, 1_050);

    runtime.dispatch(intent(Intent::Market(MarketIntent::Refresh)));
    runtime.settle().await;
    assert_eq!(
        runtime.state().market().unwrap().auction(auction).unwrap().minimum_bid(),
        1_102
    );
    assert!(runtime.dispatch(bid));
    runtime.settle().await;

    let history: Vec<_> = world
        .auction(auction)
        .unwrap()
        .bids
        .iter()
        .map(|b| b.amount)
        .collect();
    assert_eq!(history, vec![1_000, 1_050, 1_102]);
    assert!(history.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(runtime.state().ctx.player.credits, 25_000);
}

#[tokio::test]
async fn second_bid_is_refused_while_the_first_is_in_flight() {
    let (_world, mut runtime) = start(demo()).await;
    open(&mut runtime, ScreenKind::Marketplace).await;
    let auction = runtime.state().market().unwrap().auctions[0].id;
    let bid = intent(Intent::Market(MarketIntent::Bid { auction }));

    assert!(runtime.dispatch(bid.clone()));
    assert!(!runtime.dispatch(bid));
    assert_eq!(runtime.outstanding(), 1);
    assert!(notice(&runtime).1.starts_with("Still processing"));

    runtime.settle().await;
    assert!(runtime.state().ctx.in_flight.is_empty());
}

#[tokio::test]
async fn bounty_takes_amount_plus_fee_in_escrow() {
    let (world, mut runtime) = start(demo()).await;
    open(&mut runtime, ScreenKind::Marketplace).await;
    let posted_before = world.bounty_count();

    assert!(runtime.dispatch(intent(Intent::Market(MarketIntent::PostBounty(BountyDraft {
        target_name: "redjack".into(),
        reason: "Ambushed a convoy".into(),
        amount: 10_005,
    })))));
    assert_eq!(runtime.state().ctx.player.credits, 25_000 - 11_005);
    runtime.settle().await;

    assert_eq!(runtime.state().ctx.player.credits, 13_995);
    assert_eq!(world.player(pilot_id(&runtime)).unwrap().credits, 13_995);
    assert_eq!(world.bounty_count(), posted_before + 1);
}

#[tokio::test]
async fn bounty_below_minimum_is_rejected_with_the_floor() {
    let mut snapshot = demo();
    pilot_mut(&mut snapshot).credits = 4_500;
    let (world, mut runtime) = start(snapshot).await;
    open(&mut runtime, ScreenKind::Marketplace).await;
    let posted_before = world.bounty_count();

    let draft = |amount| {
        intent(Intent::Market(MarketIntent::PostBounty(BountyDraft {
            target_name: "redjack".into(),
            reason: "Piracy".into(),
            amount,
        })))
    };
    assert!(!runtime.dispatch(draft(4_000)));
    assert_eq!(notice(&runtime).1, "Bounty: must be at least 5,000 credits");

    assert!(!runtime.dispatch(draft(5_000)));
    assert_eq!(
        notice(&runtime).1,
        "Bounty: must be at least 5,000 credits plus a 500 credit fee; you have 4,500"
    );
    assert_eq!(runtime.state().ctx.player.credits, 4_500);
    assert_eq!(world.bounty_count(), posted_before);
}

#[tokio::test]
async fn contract_reward_is_held_in_escrow() {
    let mut snapshot = demo();
    pilot_mut(&mut snapshot).credits = 12_000;
    let (world, mut runtime) = start(snapshot).await;
    open(&mut runtime, ScreenKind::Marketplace).await;
    runtime.dispatch(intent(Intent::Market(MarketIntent::SwitchTab(MarketTab::Contracts))));
    runtime.settle().await;
    let listed_before = world.contract_count();

    assert!(runtime.dispatch(intent(Intent::Market(MarketIntent::PostContract(ContractDraft {
        target: "Clear the Kessler belt of drones".into(),
        reward: 10_000,
    })))));
    assert_eq!(runtime.state().ctx.player.credits, 2_000);
    runtime.settle().await;

    assert_eq!(runtime.state().ctx.player.credits, 2_000);
    assert_eq!(world.player(pilot_id(&runtime)).unwrap().credits, 2_000);
    assert_eq!(world.contract_count(), listed_before + 1);
    let board = runtime.state().market().unwrap();
    assert!(board.contracts.iter().any(|c| c.reward == 10_000));
}

#[tokio::test]
async fn unrecorded_contract_returns_the_escrow() {
    let mut snapshot = demo();
    pilot_mut(&mut snapshot).credits = 12_000;
    let (world, mut runtime) = start(snapshot).await;
    open(&mut runtime, ScreenKind::Marketplace).await;
    let listed_before = world.contract_count();

    world.fail_next(
        Operation::CreateContract,
        StoreError::Unavailable("contract board offline".into()),
    );
    assert!(runtime.dispatch(intent(Intent::Market(MarketIntent::PostContract(ContractDraft {
        target: "Escort me home".into(),
        reward: 10_000,
    })))));
    runtime.settle().await;

    assert_eq!(runtime.state().ctx.player.credits, 12_000);
    assert_eq!(world.player(pilot_id(&runtime)).unwrap().credits, 12_000);
    assert_eq!(world.contract_count(), listed_before);
    let (level, text) = notice(&runtime);
    assert_eq!(level, NoticeLevel::Error);
    assert!(text.contains("Escrow was returned"));
}

#[tokio::test]
async fn full_tank_schedules_no_refuel() {
    let mut snapshot = demo();
    let ship_id = pilot_mut(&mut snapshot).ship_id;
    if let Some(ship) = snapshot.ships_mut().iter_mut().find(|s| s.id == ship_id) {
        ship.fuel = 200;
    }
    let (_world, mut runtime) = start(snapshot).await;
    open(&mut runtime, ScreenKind::Services).await;

    assert!(!runtime.dispatch(intent(Intent::Services(ServicesIntent::Buy(
        ServiceKind::Refuel
    )))));
    let (level, text) = notice(&runtime);
    assert_eq!(level, NoticeLevel::Warning);
    assert!(text.contains("already full"));
    assert_eq!(runtime.state().ctx.player.credits, 25_000);
}

#[tokio::test]
async fn refuel_is_reverted_when_the_balance_write_fails() {
    let (world, mut runtime) = start(demo()).await;
    open(&mut runtime, ScreenKind::Services).await;
    let ship = runtime.state().ctx.ship.id;

    world.fail_next(
        Operation::UpdateCredits,
        StoreError::Persistence("ledger locked".into()),
    );
    assert!(runtime.dispatch(intent(Intent::Services(ServicesIntent::Buy(
        ServiceKind::Refuel
    )))));
    assert_eq!(runtime.state().ctx.ship.fuel, 200);
    assert!(runtime.state().ctx.player.credits < 25_000);
    runtime.settle().await;

    let ctx = &runtime.state().ctx;
    assert_eq!(ctx.player.credits, 25_000);
    assert_eq!(ctx.ship.fuel, 120);
    let (level, text) = notice(&runtime);
    assert_eq!(level, NoticeLevel::Error);
    assert!(text.starts_with("Refuel failed"));
    assert_eq!(world.ship(ship).unwrap().fuel, 120);
    assert_eq!(world.player(pilot_id(&runtime)).unwrap().credits, 25_000);
}

#[tokio::test]
async fn repair_persists_gauges_and_balance() {
    let (world, mut runtime) = start(demo()).await;
    open(&mut runtime, ScreenKind::Services).await;
    let ship = runtime.state().ctx.ship.id;

    assert!(runtime.dispatch(intent(Intent::Services(ServicesIntent::Buy(
        ServiceKind::RepairAll
    )))));
    runtime.settle().await;

    let stored = world.ship(ship).unwrap();
    assert_eq!((stored.hull, stored.shields), (100, 50));
    let credits = runtime.state().ctx.player.credits;
    assert!(credits < 25_000);
    assert_eq!(world.player(pilot_id(&runtime)).unwrap().credits, credits);
    assert_eq!(notice(&runtime).0, NoticeLevel::Info);
}

#[tokio::test]
async fn direct_message_reaches_only_its_recipient() {
    let (world, mut runtime) = start(demo()).await;
    open(&mut runtime, ScreenKind::Chat).await;
    let vega = world.player_named("vega").unwrap().id;
    let lyra = world.player_named("lyra").unwrap().id;

    assert!(runtime.dispatch(intent(Intent::Chat(ChatIntent::Line(
        "/dm vega meet me at the gate".into()
    )))));
    runtime.settle().await;

    let inbox = world.take_inbox(vega);
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].body, "meet me at the gate");
    assert!(world.take_inbox(lyra).is_empty());
}

#[tokio::test]
async fn unknown_recipient_is_reported_in_the_log() {
    let (_world, mut runtime) = start(demo()).await;
    open(&mut runtime, ScreenKind::Chat).await;

    assert!(runtime.dispatch(intent(Intent::Chat(ChatIntent::Line(
        "/dm ghost hello?".into()
    )))));
    runtime.settle().await;

    let last = runtime.state().ctx.chat.log.back().unwrap();
    assert_eq!(last.kind, ChatKind::System);
    assert!(last.body.contains("No player named 'ghost'"));
}

#[tokio::test]
async fn direct_message_to_self_is_reported_in_the_log() {
    let (world, mut runtime) = start(demo()).await;
    open(&mut runtime, ScreenKind::Chat).await;
    let pilot = world.player_named("pilot").unwrap().id;

    assert!(runtime.dispatch(intent(Intent::Chat(ChatIntent::Line(
        "/dm pilot note to self".into()
    )))));
    runtime.settle().await;

    let last = runtime.state().ctx.chat.log.back().unwrap();
    assert_eq!(last.kind, ChatKind::System);
    assert!(last.body.contains("to yourself"));
    assert!(world.take_inbox(pilot).is_empty());
}

#[tokio::test]
async fn accepting_a_mission_moves_it_to_active() {
    let (_world, mut runtime) = start(demo()).await;
    open(&mut runtime, ScreenKind::Missions).await;
    let offer = runtime.state().missions().unwrap().available[0].id;

    assert!(runtime.dispatch(intent(Intent::Missions(MissionIntent::Accept {
        mission: offer
    }))));
    runtime.settle().await;

    let board = runtime.state().missions().unwrap();
    assert_eq!(board.active.as_ref().map(|m| m.id), Some(offer));
    assert!(board.available.iter().all(|m| m.id != offer));
}

#[tokio::test]
async fn balance_moves_run_one_at_a_time() {
    let (world, mut runtime) = start(demo()).await;
    open(&mut runtime, ScreenKind::Outfitter).await;

    assert!(runtime.dispatch(intent(Intent::Outfitter(OutfitterIntent::Purchase {
        equipment_id: "pulse-laser".into(),
        quantity: 1,
    }))));
    runtime.dispatch(Message::Navigate(ScreenKind::Services));
    assert_eq!(runtime.state().screen_kind(), ScreenKind::Services);
    let refuel = intent(Intent::Services(ServicesIntent::Buy(ServiceKind::Refuel)));

    assert!(!runtime.dispatch(refuel.clone()));
    assert_eq!(
        notice(&runtime).1,
        "Still processing the previous purchase request"
    );
    assert_eq!(runtime.state().ctx.ship.fuel, 120);

    runtime.settle().await;
    assert!(runtime.dispatch(refuel));
    runtime.settle().await;

    assert_eq!(runtime.state().ctx.player.credits, 23_000);
    assert_eq!(world.player(pilot_id(&runtime)).unwrap().credits, 23_000);
    assert_eq!(runtime.state().ctx.ship.fuel, 200);
}

#[tokio::test]
async fn balance_changed_elsewhere_is_picked_up_on_tick() {
    let (world, mut runtime) = start(demo()).await;
    let pilot = pilot_id(&runtime);
    PlayerStore::update_credits(&*world, pilot, 30_000)
        .await
        .unwrap();

    let now = runtime.state().ctx.now;
    assert!(!runtime.dispatch(Message::Tick(now + Duration::seconds(5))));
    assert_eq!(runtime.state().ctx.player.credits, 25_000);

    assert!(runtime.dispatch(Message::Tick(now + Duration::seconds(31))));
    runtime.settle().await;
    assert_eq!(runtime.state().ctx.player.credits, 30_000);
}

#[tokio::test]
async fn buyout_pays_the_seller_and_delivers_the_item() {
    let (world, mut runtime) = start(demo()).await;
    open(&mut runtime, ScreenKind::Marketplace).await;
    let auction = runtime
        .state()
        .market()
        .unwrap()
        .auctions
        .iter()
        .find(|a| a.item.equipment_id == "beam-laser")
        .unwrap()
        .id;
    let vega = world.player_named("vega").unwrap().id;

    assert!(runtime.dispatch(intent(Intent::Market(MarketIntent::Buyout { auction }))));
    runtime.settle().await;

    let pilot = pilot_id(&runtime);
    assert_eq!(runtime.state().ctx.player.credits, 20_000);
    assert_eq!(world.player(pilot).unwrap().credits, 20_000);
    assert_eq!(world.player(vega).unwrap().credits, 45_000);
    assert_eq!(world.inventory(pilot).quantity_of("beam-laser"), 1);
    assert!(runtime.state().market().unwrap().auction(auction).is_none());
    assert!(notice(&runtime).1.starts_with("Bought"));
}

#[tokio::test]
async fn auction_listing_checks_the_duration_before_sending() {
    let (world, mut runtime) = start(demo()).await;
    open(&mut runtime, ScreenKind::Marketplace).await;
    let pilot = pilot_id(&runtime);
    let listing = |duration_hours| {
        intent(Intent::Market(MarketIntent::CreateAuction(AuctionDraft {
            equipment_id: "cargo-pod".into(),
            quantity: 1,
            starting_bid: 500,
            buyout_price: Some(900),
            duration_hours,
        })))
    };

    for hours in [0, 73] {
        assert!(!runtime.dispatch(listing(hours)));
        let (level, text) = notice(&runtime);
        assert_eq!(level, NoticeLevel::Warning);
        assert_eq!(text, "Hours: must be between 1 and 72");
    }
    assert_eq!(world.inventory(pilot).quantity_of("cargo-pod"), 2);

    assert!(runtime.dispatch(listing(24)));
    runtime.settle().await;

    assert_eq!(world.inventory(pilot).quantity_of("cargo-pod"), 1);
    let board = runtime.state().market().unwrap();
    assert!(board
        .auctions
        .iter()
        .any(|a| a.seller == pilot && a.item.equipment_id == "cargo-pod"));
}

#[tokio::test]
async fn contract_lifecycle_settles_every_balance_move() {
    let (world, mut runtime) = start(demo()).await;
    open(&mut runtime, ScreenKind::Marketplace).await;
    runtime.dispatch(intent(Intent::Market(MarketIntent::SwitchTab(MarketTab::Contracts))));
    runtime.settle().await;
    let pilot = pilot_id(&runtime);
    let job = runtime
        .state()
        .market()
        .unwrap()
        .contracts
        .iter()
        .find(|c| c.reward == 8_000)
        .unwrap()
        .id;

    assert!(runtime.dispatch(intent(Intent::Market(MarketIntent::Claim { contract: job }))));
    runtime.settle().await;
    let claimed = runtime.state().market().unwrap().contract(job).unwrap();
    assert_eq!(claimed.status, ContractStatus::Claimed);
    assert_eq!(claimed.claimant, Some(pilot));

    assert!(runtime.dispatch(intent(Intent::Market(MarketIntent::Complete { contract: job }))));
    runtime.settle().await;
    assert_eq!(runtime.state().ctx.player.credits, 33_000);
    assert_eq!(world.player(pilot).unwrap().credits, 33_000);
    assert_eq!(world.contract(job).unwrap().status, ContractStatus::Completed);

    assert!(runtime.dispatch(intent(Intent::Market(MarketIntent::PostContract(ContractDraft {
        target: "Chart the Veil nebula".into(),
        reward: 2_000,
    })))));
    runtime.settle().await;
    assert_eq!(world.player(pilot).unwrap().credits, 31_000);
    let own = runtime
        .state()
        .market()
        .unwrap()
        .contracts
        .iter()
        .find(|c| c.poster == pilot)
        .unwrap()
        .id;

    assert!(runtime.dispatch(intent(Intent::Market(MarketIntent::CancelContract {
        contract: own
    }))));
    runtime.settle().await;
    assert_eq!(runtime.state().ctx.player.credits, 33_000);
    assert_eq!(world.player(pilot).unwrap().credits, 33_000);
    assert_eq!(world.contract(own).unwrap().status, ContractStatus::Expired);
}

#[tokio::test]
async fn result_for_a_closed_screen_is_applied_without_follow_up() {
    let (world, mut runtime) = start(demo()).await;
    open(&mut runtime, ScreenKind::Outfitter).await;
    let loadout = runtime.state().outfitter().unwrap().loadouts[0].id;

    assert!(runtime.dispatch(intent(Intent::Outfitter(OutfitterIntent::Install {
        loadout,
        slot: 2,
        equipment_id: "deflector-mk1".into(),
    }))));
    runtime.dispatch(Message::Navigate(ScreenKind::Station));
    assert_eq!(runtime.state().screen_kind(), ScreenKind::Station);

    let result = runtime.recv_result().await.unwrap();
    assert!(!runtime.dispatch(result));

    assert_eq!(runtime.state().screen_kind(), ScreenKind::Station);
    assert_eq!(runtime.outstanding(), 0);
    assert!(runtime.state().ctx.in_flight.is_empty());
    let stored = world.loadout(loadout).unwrap();
    assert_eq!(
        stored.slot(2).and_then(|s| s.equipment.as_ref()).map(|e| e.id.as_str()),
        Some("deflector-mk1")
    );
}

#[tokio::test]
async fn failed_rollback_is_reported_to_the_player() {
    let (world, mut runtime) = start(demo()).await;
    open(&mut runtime, ScreenKind::Services).await;
    let ship = runtime.state().ctx.ship.id;

    world.fail_next(
        Operation::UpdateCredits,
        StoreError::Persistence("ledger locked".into()),
    );
    world.fail_next(
        Operation::UpdateFuel,
        StoreError::Unavailable("drydock offline".into()),
    );
    assert!(runtime.dispatch(intent(Intent::Services(ServicesIntent::Buy(
        ServiceKind::RepairHull
    )))));
    runtime.settle().await;

    let (level, text) = notice(&runtime);
    assert_eq!(level, NoticeLevel::Error);
    assert!(text.starts_with("Could not restore the stored ship record"));
    let ctx = &runtime.state().ctx;
    assert_eq!(ctx.ship.hull, 60);
    assert_eq!(ctx.player.credits, 25_000);
    assert!(ctx.in_flight.is_empty());
    assert_eq!(world.ship(ship).unwrap().hull, 100);
    assert_eq!(world.player(pilot_id(&runtime)).unwrap().credits, 25_000);
}
