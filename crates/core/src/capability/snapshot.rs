use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    economy,
    models::{
        Auction, AuctionItem, AuctionStatus, BidRecord, Bounty, BountyStatus, Contract,
        ContractStatus, Credits, Equipment, EquipmentCategory, Inventory, Loadout, Mission,
        MissionStatus, Player, PlayerId, Ship, ShipType, Slot, SlotSpec, StatBonuses, SystemId,
    },
};

/// Serialized representation of the whole universe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub ships: Vec<Ship>,
    #[serde(default)]
    pub ship_types: Vec<ShipType>,
    #[serde(default)]
    pub(crate) equipment: Vec<Equipment>,
    #[serde(default)]
    pub(crate) inventories: HashMap<PlayerId, Inventory>,
    #[serde(default)]
    pub(crate) loadouts: Vec<Loadout>,
    #[serde(default)]
    pub(crate) auctions: Vec<Auction>,
    #[serde(default)]
    pub(crate) contracts: Vec<Contract>,
    #[serde(default)]
    pub(crate) bounties: Vec<Bounty>,
    #[serde(default)]
    pub(crate) missions: Vec<Mission>,
    #[serde(default)]
    pub(crate) online: Vec<PlayerId>,
    #[serde(default)]
    pub(crate) saved_at: Option<DateTime<Utc>>,
}

impl WorldSnapshot {
    /// Player record by username, case-insensitive.
    pub fn player_named(&self, name: &str) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.username.eq_ignore_ascii_case(name))
    }

    /// When the snapshot was last written, if ever.
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.saved_at
    }

    /// Player records, editable before the world is loaded.
    pub fn players_mut(&mut self) -> &mut Vec<Player> {
        &mut self.players
    }

    /// Ships, editable before the world is loaded.
    pub fn ships_mut(&mut self) -> &mut Vec<Ship> {
        &mut self.ships
    }

    /// Auction listings, editable before the world is loaded.
    pub fn auctions_mut(&mut self) -> &mut Vec<Auction> {
        &mut self.auctions
    }

    /// Starter universe with `username` as the local pilot.
    ///
    /// The pilot's courier is damaged and half-fuelled so every station
    /// service has work to do.
    pub fn demo(username: &str, now: DateTime<Utc>) -> Self {
        let equipment = demo_catalog();
        let item = |id: &str| -> Option<Equipment> {
            let found = equipment.iter().find(|e| e.id == id).cloned();
            if found.is_none() {
                warn!(equipment = id, "Demo catalog has no such item, skipping");
            }
            found
        };
        let ship_types = demo_ship_types();

        let mut world = WorldSnapshot {
            equipment: equipment.clone(),
            ship_types: ship_types.clone(),
            ..WorldSnapshot::default()
        };

        let pilot = world.add_pilot(username, 25_000, Some("federation"), 1, "courier", (60, 20, 120));
        let vega = world.add_pilot("vega", 40_000, Some("federation"), 1, "interceptor", (150, 120, 250));
        let orion = world.add_pilot("orion", 60_000, Some("syndicate"), 2, "freighter", (300, 80, 400));
        let lyra = world.add_pilot("lyra", 15_000, None, 1, "courier", (100, 50, 200));

        let mut hangar = Inventory::default();
        for (id, quantity) in [("deflector-mk1", 1), ("cargo-pod", 2)] {
            if let Some(stock) = item(id) {
                hangar.add(stock, quantity);
            }
        }
        world.inventories.insert(pilot.0, hangar);
        let mut spares = Inventory::default();
        if let Some(scanner) = item("scanner") {
            spares.add(scanner, 1);
        }
        world.inventories.insert(vega.0, spares);

        if let Some(courier) = ship_types.iter().find(|ty| ty.id == "courier") {
            let mut slots: Vec<Slot> = courier
                .slots
                .iter()
                .map(|spec| Slot::empty(spec.slot_type, spec.size))
                .collect();
            if let Some(first) = slots.first_mut() {
                first.equipment = item("pulse-laser");
            }
            world.loadouts.push(Loadout {
                id: Uuid::new_v4(),
                owner: pilot.0,
                ship_type: courier.id.clone(),
                name: "Default".to_string(),
                slots,
            });
        }

        if let Some(beam) = item("beam-laser") {
            world.auctions.push(Auction {
                id: Uuid::new_v4(),
                seller: vega.0,
                seller_name: vega.1.clone(),
                item: AuctionItem {
                    equipment_id: beam.id.clone(),
                    name: beam.name.clone(),
                    quantity: 1,
                },
                starting_bid: 3_000,
                current_bid: 0,
                highest_bidder: None,
                buyout_price: Some(5_000),
                end_time: now + Duration::hours(6),
                status: AuctionStatus::Active,
                bids: Vec::new(),
            });
        }
        if let Some(drive) = item("fusion-drive") {
            world.auctions.push(Auction {
                id: Uuid::new_v4(),
                seller: orion.0,
                seller_name: orion.1.clone(),
                item: AuctionItem {
                    equipment_id: drive.id.clone(),
                    name: drive.name.clone(),
                    quantity: 1,
                },
                starting_bid: 4_000,
                current_bid: 4_200,
                highest_bidder: Some(lyra.0),
                buyout_price: None,
                end_time: now + Duration::hours(20),
                status: AuctionStatus::Active,
                bids: vec![BidRecord {
                    bidder: lyra.0,
                    bidder_name: lyra.1.clone(),
                    amount: 4_200,
                    placed_at: now - Duration::minutes(30),
                }],
            });
        }

        world.contracts.push(Contract {
            id: Uuid::new_v4(),
            poster: orion.0,
            poster_name: orion.1.clone(),
            target: "Escort ore convoy to Sirius".to_string(),
            reward: 8_000,
            status: ContractStatus::Open,
            claimant: None,
            posted_at: now - Duration::hours(2),
            expires_at: now + Duration::hours(economy::POSTING_LIFETIME_HOURS - 2),
        });
        world.bounties.push(Bounty {
            id: Uuid::new_v4(),
            poster: vega.0,
            poster_name: vega.1.clone(),
            target_name: "redjack".to_string(),
            reason: "Piracy near Altair".to_string(),
            amount: 12_000,
            fee: economy::bounty_fee(12_000),
            status: BountyStatus::Active,
            posted_at: now - Duration::hours(5),
            expires_at: now + Duration::hours(economy::POSTING_LIFETIME_HOURS - 5),
        });

        world.add_mission("Medical supplies", "Rush vaccines to the Sirius colony.", 2_500, 1, 2);
        world.add_mission("Belt survey", "Scan the Kessler belt for ore pockets.", 4_000, 1, 3);
        world.add_mission("Ore run", "Haul refined ore back to Sol.", 3_000, 2, 1);

        world.online = world.players.iter().map(|p| p.id).collect();
        world
    }

    fn add_pilot(
        &mut self,
        username: &str,
        credits: Credits,
        faction: Option<&str>,
        system_id: SystemId,
        ship_type: &str,
        (hull, shields, fuel): (u32, u32, u32),
    ) -> (PlayerId, String) {
        let player_id = Uuid::new_v4();
        let ship_id = Uuid::new_v4();
        self.ships.push(Ship {
            id: ship_id,
            owner: player_id,
            name: format!("{username}'s {ship_type}"),
            ship_type: ship_type.to_string(),
            hull,
            shields,
            fuel,
            cargo: 0,
        });
        self.players.push(Player {
            id: player_id,
            username: username.to_string(),
            credits,
            faction: faction.map(str::to_string),
            reputation: faction
                .map(|f| HashMap::from([(f.to_string(), 10)]))
                .unwrap_or_default(),
            system_id,
            ship_id,
        });
        (player_id, username.to_string())
    }

    fn add_mission(
        &mut self,
        title: &str,
        description: &str,
        reward: Credits,
        origin: SystemId,
        destination: SystemId,
    ) {
        self.missions.push(Mission {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            reward,
            origin,
            destination,
            status: MissionStatus::Available,
            assignee: None,
        });
    }
}

fn gear(
    id: &str,
    name: &str,
    category: EquipmentCategory,
    size: u8,
    price: Credits,
    bonuses: StatBonuses,
) -> Equipment {
    Equipment {
        id: id.to_string(),
        name: name.to_string(),
        category,
        size,
        price,
        bonuses,
    }
}

fn demo_catalog() -> Vec<Equipment> {
    use EquipmentCategory::*;
    let none = StatBonuses::default();
    vec![
        gear("pulse-laser", "Pulse Laser", Weapon, 1, 1_200, StatBonuses { attack: 10, ..none }),
        gear("beam-laser", "Beam Laser", Weapon, 2, 3_500, StatBonuses { attack: 22, ..none }),
        gear("missile-rack", "Missile Rack", Weapon, 3, 6_800, StatBonuses { attack: 40, ..none }),
        gear("deflector-mk1", "Deflector Mk I", Shield, 1, 1_500, StatBonuses { defense: 10, ..none }),
        gear("deflector-mk2", "Deflector Mk II", Shield, 2, 4_200, StatBonuses { defense: 25, ..none }),
        gear("ion-drive", "Ion Drive", Engine, 1, 2_000, StatBonuses { speed: 10, ..none }),
        gear("fusion-drive", "Fusion Drive", Engine, 2, 5_500, StatBonuses { speed: 25, ..none }),
        gear("cargo-pod", "Cargo Pod", Cargo, 1, 800, StatBonuses { cargo: 10, ..none }),
        gear("cargo-bay", "Cargo Bay", Cargo, 2, 2_400, StatBonuses { cargo: 30, ..none }),
        gear("scanner", "Long-range Scanner", Utility, 1, 900, none),
        gear("fuel-scoop", "Fuel Scoop", Utility, 1, 1_800, StatBonuses { speed: 2, ..none }),
    ]
}

fn demo_ship_types() -> Vec<ShipType> {
    use EquipmentCategory::*;
    let slots = |specs: &[(EquipmentCategory, u8)]| -> Vec<SlotSpec> {
        specs
            .iter()
            .map(|(slot_type, size)| SlotSpec {
                slot_type: *slot_type,
                size: *size,
            })
            .collect()
    };
    vec![
        ShipType {
            id: "courier".to_string(),
            name: "Courier".to_string(),
            max_hull: 100,
            max_shields: 50,
            max_fuel: 200,
            max_cargo: 20,
            slots: slots(&[(Weapon, 1), (Weapon, 1), (Shield, 1), (Engine, 1), (Cargo, 1), (Utility, 1)]),
        },
        ShipType {
            id: "freighter".to_string(),
            name: "Freighter".to_string(),
            max_hull: 300,
            max_shields: 80,
            max_fuel: 400,
            max_cargo: 120,
            slots: slots(&[(Weapon, 1), (Shield, 2), (Engine, 2), (Cargo, 2), (Cargo, 2), (Utility, 1)]),
        },
        ShipType {
            id: "interceptor".to_string(),
            name: "Interceptor".to_string(),
            max_hull: 150,
            max_shields: 120,
            max_fuel: 250,
            max_cargo: 10,
            slots: slots(&[(Weapon, 2), (Weapon, 2), (Shield, 2), (Engine, 2), (Utility, 1)]),
        },
    ]
}

/// Reads and writes the world snapshot file.
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Create a handle for the snapshot at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the snapshot on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, `None` when the file does not exist yet.
    pub fn load(&self) -> Result<Option<WorldSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let snapshot = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    /// Load the snapshot, seeding and writing one when absent or unreadable.
    pub fn load_or_seed(&self, seed: impl FnOnce() -> WorldSnapshot) -> Result<WorldSnapshot> {
        match self.load() {
            Ok(Some(snapshot)) => {
                info!(path = %self.path.display(), "Loaded world snapshot");
                Ok(snapshot)
            }
            Ok(None) => {
                let snapshot = seed();
                self.persist(&snapshot)?;
                info!(path = %self.path.display(), "Seeded new world snapshot");
                Ok(snapshot)
            }
            Err(err) => {
                warn!("Failed to load world snapshot, reseeding: {err:#}");
                let snapshot = seed();
                self.persist(&snapshot)?;
                Ok(snapshot)
            }
        }
    }

    /// Write the snapshot, creating parent directories as needed.
    pub fn persist(&self, snapshot: &WorldSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let serialised = serde_json::to_vec_pretty(snapshot)?;
        fs::write(&self.path, serialised)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn demo_world_is_consistent() {
        let world = WorldSnapshot::demo("pilot", Utc::now());
        let pilot = world.player_named("pilot").expect("pilot present");
        assert!(world.ships.iter().any(|s| s.id == pilot.ship_id));
        assert_eq!(world.online.len(), world.players.len());
        for loadout in &world.loadouts {
            assert!(loadout.used_space() <= loadout.total_space());
        }
        for auction in &world.auctions {
            assert!(auction.current_bid == 0 || auction.current_bid >= auction.starting_bid);
        }
    }

    #[test]
    fn demo_stocks_every_seeded_item() {
        let world = WorldSnapshot::demo("pilot", Utc::now());
        let pilot = world.player_named("pilot").expect("pilot present");
        let hangar = &world.inventories[&pilot.id];
        assert_eq!(hangar.quantity_of("deflector-mk1"), 1);
        assert_eq!(hangar.quantity_of("cargo-pod"), 2);
        assert_eq!(world.auctions.len(), 2);
        assert!(world.loadouts[0].slots[0].equipment.is_some());
    }

    #[test]
    fn seeding_accessors_edit_the_world() {
        let mut world = WorldSnapshot::demo("pilot", Utc::now());
        let pilot_ship = world.player_named("pilot").expect("pilot present").ship_id;
        if let Some(pilot) = world.players_mut().iter_mut().find(|p| p.username == "pilot") {
            pilot.credits = 7;
        }
        if let Some(ship) = world.ships_mut().iter_mut().find(|s| s.id == pilot_ship) {
            ship.fuel = 0;
        }
        world.auctions_mut().clear();

        assert_eq!(world.player_named("pilot").map(|p| p.credits), Some(7));
        assert_eq!(world.ships.iter().find(|s| s.id == pilot_ship).map(|s| s.fuel), Some(0));
        assert!(world.auctions.is_empty());
    }

    #[test]
    fn snapshot_persists_and_reloads() -> Result<()> {
        let dir = tempdir()?;
        let file = SnapshotFile::new(dir.path().join("nested").join("world.json"));
        assert!(file.load()?.is_none());

        let seeded = file.load_or_seed(|| WorldSnapshot::demo("pilot", Utc::now()))?;
        assert!(file.path().exists());

        let reloaded = file.load()?.expect("snapshot written");
        assert_eq!(reloaded.players.len(), seeded.players.len());
        assert_eq!(
            reloaded.player_named("PILOT").map(|p| p.credits),
            Some(25_000)
        );
        Ok(())
    }

    #[test]
    fn corrupt_snapshot_is_reseeded() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("world.json");
        fs::write(&path, "{ not json")?;
        let file = SnapshotFile::new(&path);
        assert!(file.load().is_err());
        let snapshot = file.load_or_seed(|| WorldSnapshot::demo("pilot", Utc::now()))?;
        assert!(snapshot.player_named("pilot").is_some());
        assert!(file.load()?.is_some());
        Ok(())
    }
}
