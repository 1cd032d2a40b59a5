//! Outfitter: equipment catalog, owned inventory and ship loadouts.
//!
//! Nothing here is changed optimistically. Purchases and sales take the
//! balance the manager reports; install and uninstall replace the whole
//! loadout with the manager's copy.

use tracing::{debug, info};

use super::form::TextField;
use crate::{
    capability::{StoreResult, TradeReceipt},
    economy,
    engine::{ActionKey, Command, Intent, Key, SessionContext},
    error::ValidationError,
    models::{
        Equipment, EquipmentCategory, EquipmentId, Inventory, InventoryItem, Loadout, LoadoutId,
        Slot,
    },
};

/// Longest loadout name.
pub const MAX_LOADOUT_NAME: usize = 32;
/// Largest quantity bought or sold in one go.
pub const MAX_QUANTITY: u32 = 99;

/// Outfitter tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutfitterView {
    /// Equipment for sale.
    Catalog,
    /// Owned, uninstalled equipment.
    Inventory,
    /// Saved loadouts and their slots.
    Loadouts,
}

impl OutfitterView {
    fn next(self) -> Self {
        match self {
            OutfitterView::Catalog => OutfitterView::Inventory,
            OutfitterView::Inventory => OutfitterView::Loadouts,
            OutfitterView::Loadouts => OutfitterView::Catalog,
        }
    }

    /// Tab label.
    pub fn label(self) -> &'static str {
        match self {
            OutfitterView::Catalog => "Catalog",
            OutfitterView::Inventory => "Inventory",
            OutfitterView::Loadouts => "Loadouts",
        }
    }
}

/// Modal overlays on top of the tabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutfitterMode {
    /// Plain browsing.
    Browse,
    /// Choosing an inventory item for an empty slot.
    PickItem {
        /// Slot being filled.
        slot: usize,
        /// Row in the compatible-item list.
        cursor: usize,
    },
    /// Typing the name of a new loadout.
    NameLoadout(TextField),
}

/// Everything the outfitter opens with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutfitterData {
    /// Catalog items of the requested category.
    pub catalog: Vec<Equipment>,
    /// Owned equipment.
    pub inventory: Inventory,
    /// Owned loadouts.
    pub loadouts: Vec<Loadout>,
}

/// Outfitter sub-state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutfitterState {
    /// Active tab.
    pub view: OutfitterView,
    /// Active overlay.
    pub mode: OutfitterMode,
    /// Catalog category shown.
    pub category: EquipmentCategory,
    /// Catalog items of `category`.
    pub catalog: Vec<Equipment>,
    /// Owned equipment.
    pub inventory: Inventory,
    /// Owned loadouts.
    pub loadouts: Vec<Loadout>,
    /// Row in the active tab.
    pub cursor: usize,
    /// Quantity for the next purchase or sale.
    pub quantity: u32,
    /// Loadout whose slots are shown.
    pub open_loadout: Option<LoadoutId>,
    /// Row in the open loadout's slot list.
    pub slot_cursor: usize,
}

impl OutfitterState {
    /// Empty outfitter showing `category`, waiting for its first load.
    pub fn new(category: EquipmentCategory) -> Self {
        Self {
            view: OutfitterView::Catalog,
            mode: OutfitterMode::Browse,
            category,
            catalog: Vec::new(),
            inventory: Inventory::default(),
            loadouts: Vec::new(),
            cursor: 0,
            quantity: 1,
            open_loadout: None,
            slot_cursor: 0,
        }
    }

    /// Catalog item under the cursor.
    pub fn selected_catalog_item(&self) -> Option<&Equipment> {
        self.catalog.get(self.cursor)
    }

    /// Inventory stack under the cursor.
    pub fn selected_inventory_item(&self) -> Option<&InventoryItem> {
        self.inventory.items.get(self.cursor)
    }

    /// Loadout row under the cursor.
    pub fn selected_loadout(&self) -> Option<&Loadout> {
        self.loadouts.get(self.cursor)
    }

    /// Loadout whose slots are shown, if it still exists.
    pub fn open_loadout(&self) -> Option<&Loadout> {
        let id = self.open_loadout?;
        self.loadout(id)
    }

    /// Loadout by id.
    pub fn loadout(&self, id: LoadoutId) -> Option<&Loadout> {
        self.loadouts.iter().find(|l| l.id == id)
    }

    /// Inventory items that fit `slot`.
    pub fn compatible_items(&self, slot: &Slot) -> Vec<&Equipment> {
        self.inventory
            .items
            .iter()
            .map(|item| &item.equipment)
            .filter(|item| slot.compatible_with(item))
            .collect()
    }

    /// Replace a loadout with a fresher copy. Returns false when it is no
    /// longer listed.
    pub fn replace_loadout(&mut self, loadout: Loadout) -> bool {
        match self.loadouts.iter_mut().find(|l| l.id == loadout.id) {
            Some(slot) => {
                *slot = loadout;
                true
            }
            None => false,
        }
    }

    fn rows(&self) -> usize {
        if let OutfitterMode::PickItem { slot, .. } = self.mode {
            return self
                .open_loadout()
                .and_then(|l| l.slot(slot))
                .map(|s| self.compatible_items(s).len())
                .unwrap_or(0);
        }
        match self.view {
            OutfitterView::Catalog => self.catalog.len(),
            OutfitterView::Inventory => self.inventory.items.len(),
            OutfitterView::Loadouts => match self.open_loadout() {
                Some(loadout) => loadout.slots.len(),
                None => self.loadouts.len(),
            },
        }
    }

    fn move_cursor(&mut self, down: bool) {
        let rows = self.rows();
        let step = |cursor: usize| {
            if down {
                (cursor + 1).min(rows.saturating_sub(1))
            } else {
                cursor.saturating_sub(1)
            }
        };
        match &mut self.mode {
            OutfitterMode::PickItem { cursor, .. } => *cursor = step(*cursor),
            OutfitterMode::NameLoadout(_) => {}
            OutfitterMode::Browse => {
                if self.view == OutfitterView::Loadouts && self.open_loadout.is_some() {
                    self.slot_cursor = step(self.slot_cursor);
                } else {
                    self.cursor = step(self.cursor);
                }
            }
        }
    }

    fn clamp_cursor(&mut self) {
        let rows = self.rows();
        self.cursor = self.cursor.min(rows.saturating_sub(1));
    }
}

/// Outfitter actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutfitterIntent {
    /// Next tab.
    NextView,
    /// Move the highlight up.
    Up,
    /// Move the highlight down.
    Down,
    /// Show and load a catalog category.
    SelectCategory(EquipmentCategory),
    /// Change the trade quantity by a step.
    AdjustQuantity(i32),
    /// Buy equipment.
    Purchase {
        /// Catalog id.
        equipment_id: EquipmentId,
        /// Units to buy.
        quantity: u32,
    },
    /// Sell owned equipment back.
    Sell {
        /// Catalog id.
        equipment_id: EquipmentId,
        /// Units to sell.
        quantity: u32,
    },
    /// Show a loadout's slots.
    OpenLoadout(LoadoutId),
    /// Return to the loadout list.
    CloseLoadout,
    /// Open the item picker for an empty slot.
    PickItem {
        /// Slot to fill.
        slot: usize,
    },
    /// Install an owned item into a slot.
    Install {
        /// Target loadout.
        loadout: LoadoutId,
        /// Slot index.
        slot: usize,
        /// Item to install.
        equipment_id: EquipmentId,
    },
    /// Move a slot's item back into inventory.
    Uninstall {
        /// Target loadout.
        loadout: LoadoutId,
        /// Slot index.
        slot: usize,
    },
    /// Open the loadout name prompt.
    BeginNaming,
    /// Type into the name prompt.
    NameType(char),
    /// Delete from the name prompt.
    NameErase,
    /// Submit the name prompt.
    SubmitName,
    /// Create a loadout for the active ship.
    CreateLoadout {
        /// Loadout name.
        name: String,
    },
    /// Close any overlay.
    CancelMode,
}

/// Translate a key on the outfitter.
pub fn keymap(state: &OutfitterState, key: Key) -> Option<Intent> {
    let intent = match &state.mode {
        OutfitterMode::PickItem { slot, cursor } => match key {
            Key::Up => OutfitterIntent::Up,
            Key::Down => OutfitterIntent::Down,
            Key::Esc => OutfitterIntent::CancelMode,
            Key::Enter => {
                let loadout = state.open_loadout()?;
                let item = state.compatible_items(loadout.slot(*slot)?).get(*cursor)?.id.clone();
                OutfitterIntent::Install {
                    loadout: loadout.id,
                    slot: *slot,
                    equipment_id: item,
                }
            }
            _ => return None,
        },
        OutfitterMode::NameLoadout(_) => match key {
            Key::Char(ch) => OutfitterIntent::NameType(ch),
            Key::Backspace => OutfitterIntent::NameErase,
            Key::Enter => OutfitterIntent::SubmitName,
            Key::Esc => OutfitterIntent::CancelMode,
            _ => return None,
        },
        OutfitterMode::Browse => match (state.view, key) {
            (_, Key::Tab) => OutfitterIntent::NextView,
            (_, Key::Up | Key::Char('k')) => OutfitterIntent::Up,
            (_, Key::Down | Key::Char('j')) => OutfitterIntent::Down,
            (OutfitterView::Loadouts, Key::Esc) if state.open_loadout.is_some() => {
                OutfitterIntent::CloseLoadout
            }
            (_, Key::Esc) => return Some(Intent::Back),
            (OutfitterView::Catalog, Key::Left) => {
                OutfitterIntent::SelectCategory(state.category.prev())
            }
            (OutfitterView::Catalog, Key::Right) => {
                OutfitterIntent::SelectCategory(state.category.next())
            }
            (OutfitterView::Catalog | OutfitterView::Inventory, Key::Char('+' | '=')) => {
                OutfitterIntent::AdjustQuantity(1)
            }
            (OutfitterView::Catalog | OutfitterView::Inventory, Key::Char('-')) => {
                OutfitterIntent::AdjustQuantity(-1)
            }
            (OutfitterView::Catalog, Key::Enter | Key::Char('b')) => OutfitterIntent::Purchase {
                equipment_id: state.selected_catalog_item()?.id.clone(),
                quantity: state.quantity,
            },
            (OutfitterView::Inventory, Key::Enter | Key::Char('s')) => OutfitterIntent::Sell {
                equipment_id: state.selected_inventory_item()?.equipment.id.clone(),
                quantity: state.quantity,
            },
            (OutfitterView::Loadouts, Key::Enter | Key::Char('u')) => match state.open_loadout() {
                Some(loadout) => {
                    let slot = loadout.slot(state.slot_cursor)?;
                    if slot.is_empty() && key == Key::Enter {
                        OutfitterIntent::PickItem {
                            slot: state.slot_cursor,
                        }
                    } else if slot.is_empty() {
                        return None;
                    } else {
                        OutfitterIntent::Uninstall {
                            loadout: loadout.id,
                            slot: state.slot_cursor,
                        }
                    }
                }
                None if key == Key::Enter => {
                    OutfitterIntent::OpenLoadout(state.selected_loadout()?.id)
                }
                None => return None,
            },
            (OutfitterView::Loadouts, Key::Char('n')) if state.open_loadout.is_none() => {
                OutfitterIntent::BeginNaming
            }
            _ => return None,
        },
    };
    Some(Intent::Outfitter(intent))
}

pub(crate) fn handle(
    ctx: &mut SessionContext,
    state: &mut OutfitterState,
    intent: OutfitterIntent,
) -> Result<Option<Command>, ValidationError> {
    let player = ctx.player.id;
    match intent {
        OutfitterIntent::NextView => {
            state.view = state.view.next();
            state.cursor = 0;
            state.open_loadout = None;
        }
        OutfitterIntent::Up => state.move_cursor(false),
        OutfitterIntent::Down => state.move_cursor(true),
        OutfitterIntent::SelectCategory(category) => {
            ctx.ensure_idle(ActionKey::LoadCatalog)?;
            state.category = category;
            state.catalog.clear();
            state.cursor = 0;
            return Ok(Some(Command::LoadCatalog { category }));
        }
        OutfitterIntent::AdjustQuantity(step) => {
            let next = i64::from(state.quantity) + i64::from(step);
            state.quantity = next.clamp(1, i64::from(MAX_QUANTITY)) as u32;
        }
        OutfitterIntent::Purchase {
            equipment_id,
            quantity,
        } => {
            let item = state
                .catalog
                .iter()
                .find(|item| item.id == equipment_id)
                .ok_or_else(|| ValidationError::NotFound(format!("Item {equipment_id}")))?;
            if quantity == 0 {
                return Err(ValidationError::field("Quantity", "must be at least 1"));
            }
            let cost = item.price.saturating_mul(i64::from(quantity));
            if !ctx.player.can_afford(cost) {
                return Err(ValidationError::InsufficientCredits {
                    needed: cost,
                    available: ctx.player.credits,
                });
            }
            ctx.ensure_idle(ActionKey::Purchase)?;
            info!(%player, equipment = %equipment_id, quantity, cost, "Purchase requested");
            return Ok(Some(Command::Purchase {
                player,
                equipment_id,
                quantity,
            }));
        }
        OutfitterIntent::Sell {
            equipment_id,
            quantity,
        } => {
            let owned = state.inventory.quantity_of(&equipment_id);
            if owned == 0 {
                return Err(ValidationError::NotFound(format!("Item {equipment_id}")));
            }
            if quantity == 0 || quantity > owned {
                return Err(ValidationError::field(
                    "Quantity",
                    format!("must be between 1 and {owned}"),
                ));
            }
            ctx.ensure_idle(ActionKey::Sell)?;
            return Ok(Some(Command::Sell {
                player,
                equipment_id,
                quantity,
            }));
        }
        OutfitterIntent::OpenLoadout(id) => {
            if state.loadout(id).is_none() {
                return Err(ValidationError::NotFound("Loadout".to_string()));
            }
            state.view = OutfitterView::Loadouts;
            state.open_loadout = Some(id);
            state.slot_cursor = 0;
        }
        OutfitterIntent::CloseLoadout => {
            state.open_loadout = None;
            state.mode = OutfitterMode::Browse;
        }
        OutfitterIntent::PickItem { slot } => {
            let loadout = state
                .open_loadout()
                .ok_or_else(|| ValidationError::illegal("Open a loadout first"))?;
            let target = loadout
                .slot(slot)
                .ok_or_else(|| ValidationError::NotFound(format!("Slot {}", slot + 1)))?;
            if !target.is_empty() {
                return Err(ValidationError::illegal("Slot is occupied"));
            }
            if state.compatible_items(target).is_empty() {
                return Err(ValidationError::illegal(format!(
                    "No size {} {} equipment in inventory",
                    target.size, target.slot_type
                )));
            }
            state.mode = OutfitterMode::PickItem { slot, cursor: 0 };
        }
        OutfitterIntent::Install {
            loadout,
            slot,
            equipment_id,
        } => {
            let target = state
                .loadout(loadout)
                .ok_or_else(|| ValidationError::NotFound("Loadout".to_string()))?
                .slot(slot)
                .ok_or_else(|| ValidationError::NotFound(format!("Slot {}", slot + 1)))?;
            if !target.is_empty() {
                return Err(ValidationError::illegal("Slot is occupied"));
            }
            let item = state
                .inventory
                .find(&equipment_id)
                .map(|stack| &stack.equipment)
                .ok_or_else(|| ValidationError::NotFound(format!("Item {equipment_id}")))?;
            if !target.compatible_with(item) {
                return Err(ValidationError::illegal(format!(
                    "{} needs a size {} {} slot",
                    item.name, item.size, item.category
                )));
            }
            ctx.ensure_idle(ActionKey::Loadout)?;
            state.mode = OutfitterMode::Browse;
            return Ok(Some(Command::Install {
                player,
                loadout,
                slot,
                equipment_id,
            }));
        }
        OutfitterIntent::Uninstall { loadout, slot } => {
            let target = state
                .loadout(loadout)
                .ok_or_else(|| ValidationError::NotFound("Loadout".to_string()))?
                .slot(slot)
                .ok_or_else(|| ValidationError::NotFound(format!("Slot {}", slot + 1)))?;
            if target.is_empty() {
                return Err(ValidationError::illegal("Slot is empty"));
            }
            ctx.ensure_idle(ActionKey::Loadout)?;
            return Ok(Some(Command::Uninstall {
                player,
                loadout,
                slot,
            }));
        }
        OutfitterIntent::BeginNaming => {
            state.mode =
                OutfitterMode::NameLoadout(TextField::text("Loadout name", MAX_LOADOUT_NAME));
        }
        OutfitterIntent::NameType(ch) => {
            if let OutfitterMode::NameLoadout(field) = &mut state.mode {
                field.push(ch);
            }
        }
        OutfitterIntent::NameErase => {
            if let OutfitterMode::NameLoadout(field) = &mut state.mode {
                field.backspace();
            }
        }
        OutfitterIntent::SubmitName => {
            let OutfitterMode::NameLoadout(field) = &state.mode else {
                return Ok(None);
            };
            let name = field.value.clone();
            return handle(ctx, state, OutfitterIntent::CreateLoadout { name });
        }
        OutfitterIntent::CreateLoadout { name } => {
            let name = name.trim().to_string();
            let length = name.chars().count();
            if length == 0 || length > MAX_LOADOUT_NAME {
                return Err(ValidationError::field(
                    "Loadout name",
                    format!("must be 1 to {MAX_LOADOUT_NAME} characters"),
                ));
            }
            ctx.ensure_idle(ActionKey::Loadout)?;
            state.mode = OutfitterMode::Browse;
            return Ok(Some(Command::CreateLoadout {
                player,
                ship_type: ctx.ship.ship_type.clone(),
                name,
            }));
        }
        OutfitterIntent::CancelMode => state.mode = OutfitterMode::Browse,
    }
    Ok(None)
}

/// What a slot write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotChange {
    /// Item moved from inventory into the slot.
    Install,
    /// Item moved from the slot into inventory.
    Uninstall,
}

/// Outfitter command results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutfitterOutcome {
    /// Catalog, inventory and loadouts read together.
    Opened {
        /// Category requested.
        category: EquipmentCategory,
        /// Loaded data.
        result: StoreResult<OutfitterData>,
    },
    /// One catalog category read.
    CatalogLoaded {
        /// Category requested.
        category: EquipmentCategory,
        /// Items of that category.
        result: StoreResult<Vec<Equipment>>,
    },
    /// Purchase settled.
    Purchased {
        /// Item bought.
        equipment_id: EquipmentId,
        /// Units bought.
        quantity: u32,
        /// New balance and inventory.
        result: StoreResult<TradeReceipt>,
    },
    /// Sale settled.
    Sold {
        /// Item sold.
        equipment_id: EquipmentId,
        /// Units sold.
        quantity: u32,
        /// New balance and inventory.
        result: StoreResult<TradeReceipt>,
    },
    /// Inventory re-read.
    InventoryLoaded(StoreResult<Inventory>),
    /// One loadout re-read.
    LoadoutLoaded {
        /// Loadout requested.
        loadout: LoadoutId,
        /// Manager's copy.
        result: StoreResult<Loadout>,
    },
    /// Install or uninstall settled.
    LoadoutChanged {
        /// Loadout written.
        loadout: LoadoutId,
        /// Slot written.
        slot: usize,
        /// Direction of the move.
        change: SlotChange,
        /// Manager's copy after the write.
        result: StoreResult<Loadout>,
    },
    /// New loadout created.
    LoadoutCreated(StoreResult<Loadout>),
}

impl OutfitterOutcome {
    pub(crate) fn action_key(&self) -> ActionKey {
        match self {
            OutfitterOutcome::Opened { .. } => ActionKey::LoadOutfitter,
            OutfitterOutcome::CatalogLoaded { .. } => ActionKey::LoadCatalog,
            OutfitterOutcome::Purchased { .. } => ActionKey::Purchase,
            OutfitterOutcome::Sold { .. } => ActionKey::Sell,
            OutfitterOutcome::InventoryLoaded(_) => ActionKey::LoadInventory,
            OutfitterOutcome::LoadoutLoaded { .. } => ActionKey::LoadLoadout,
            OutfitterOutcome::LoadoutChanged { .. } | OutfitterOutcome::LoadoutCreated(_) => {
                ActionKey::Loadout
            }
        }
    }
}

/// Apply an outfitter result. `state` is `None` when the player has left
/// the outfitter; balances still apply, screen data is dropped.
pub(crate) fn on_outcome(
    ctx: &mut SessionContext,
    state: Option<&mut OutfitterState>,
    outcome: OutfitterOutcome,
) -> Option<Command> {
    let player = ctx.player.id;
    match outcome {
        OutfitterOutcome::Opened { category, result } => match result {
            Ok(data) => {
                let state = state?;
                state.inventory = data.inventory;
                state.loadouts = data.loadouts;
                if state.category == category {
                    state.catalog = data.catalog;
                }
                state.clamp_cursor();
                None
            }
            Err(err) => {
                ctx.fail(format!("Could not open the outfitter: {err}"));
                None
            }
        },
        OutfitterOutcome::CatalogLoaded { category, result } => {
            match result {
                Ok(items) => {
                    if let Some(state) = state.filter(|s| s.category == category) {
                        state.catalog = items;
                        state.clamp_cursor();
                    } else {
                        debug!(%category, "Dropping stale catalog");
                    }
                }
                Err(err) => ctx.fail(format!("Could not load {category}: {err}")),
            }
            None
        }
        OutfitterOutcome::Purchased {
            equipment_id,
            quantity,
            result,
        } => {
            match result {
                Ok(receipt) => {
                    ctx.player.credits = receipt.balance;
                    let name = item_name(&receipt.inventory, &equipment_id);
                    ctx.info(format!(
                        "Purchased {quantity} x {name}. Balance {} cr",
                        economy::format_credits(receipt.balance)
                    ));
                    if let Some(state) = state {
                        state.inventory = receipt.inventory;
                    }
                }
                Err(err) => ctx.fail(format!("Purchase failed: {err}")),
            }
            None
        }
        OutfitterOutcome::Sold {
            equipment_id,
            quantity,
            result,
        } => {
            match result {
                Ok(receipt) => {
                    ctx.player.credits = receipt.balance;
                    ctx.info(format!(
                        "Sold {quantity} x {equipment_id}. Balance {} cr",
                        economy::format_credits(receipt.balance)
                    ));
                    if let Some(state) = state {
                        state.inventory = receipt.inventory;
                        state.clamp_cursor();
                    }
                }
                Err(err) => ctx.fail(format!("Sale failed: {err}")),
            }
            None
        }
        OutfitterOutcome::InventoryLoaded(result) => {
            match result {
                Ok(inventory) => {
                    if let Some(state) = state {
                        state.inventory = inventory;
                        state.clamp_cursor();
                    }
                }
                Err(err) => ctx.fail(format!("Could not load inventory: {err}")),
            }
            None
        }
        OutfitterOutcome::LoadoutLoaded { loadout, result } => {
            match result {
                Ok(fresh) => {
                    if let Some(state) = state {
                        if !state.replace_loadout(fresh) {
                            debug!(%loadout, "Reloaded loadout is no longer listed");
                        }
                    }
                }
                Err(err) => ctx.fail(format!("Could not reload loadout: {err}")),
            }
            None
        }
        OutfitterOutcome::LoadoutChanged {
            loadout,
            slot,
            change,
            result,
        } => match result {
            Ok(fresh) => {
                let verb = match change {
                    SlotChange::Install => "Installed into",
                    SlotChange::Uninstall => "Removed from",
                };
                ctx.info(format!("{verb} slot {}", slot + 1));
                let state = state?;
                state.replace_loadout(fresh);
                state.clamp_cursor();
                if ctx.is_busy(ActionKey::LoadInventory) {
                    return None;
                }
                Some(Command::LoadInventory { player })
            }
            Err(err) => {
                let verb = match change {
                    SlotChange::Install => "Install",
                    SlotChange::Uninstall => "Uninstall",
                };
                ctx.fail(format!("{verb} failed: {err}"));
                let state = state?;
                state.loadout(loadout)?;
                if ctx.is_busy(ActionKey::LoadLoadout) {
                    return None;
                }
                Some(Command::LoadLoadout { player, loadout })
            }
        },
        OutfitterOutcome::LoadoutCreated(result) => {
            match result {
                Ok(loadout) => {
                    ctx.info(format!("Created loadout '{}'", loadout.name));
                    if let Some(state) = state {
                        state.view = OutfitterView::Loadouts;
                        state.open_loadout = Some(loadout.id);
                        state.slot_cursor = 0;
                        state.loadouts.push(loadout);
                    }
                }
                Err(err) => ctx.fail(format!("Could not create loadout: {err}")),
            }
            None
        }
    }
}

fn item_name(inventory: &Inventory, equipment_id: &str) -> String {
    inventory
        .find(equipment_id)
        .map(|item| item.equipment.name.clone())
        .unwrap_or_else(|| equipment_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatBonuses;
    use uuid::Uuid;

    fn gear(id: &str, category: EquipmentCategory, size: u8) -> Equipment {
        Equipment {
            id: id.into(),
            name: id.into(),
            category,
            size,
            price: 1_000,
            bonuses: StatBonuses::default(),
        }
    }

    fn state_with_loadout() -> OutfitterState {
        let mut state = OutfitterState::new(EquipmentCategory::Weapon);
        state.inventory.add(gear("small-gun", EquipmentCategory::Weapon, 1), 1);
        state.inventory.add(gear("big-gun", EquipmentCategory::Weapon, 3), 1);
        state.loadouts.push(Loadout {
            id: Uuid::new_v4(),
            owner: Uuid::new_v4(),
            ship_type: "courier".into(),
            name: "Main".into(),
            slots: vec![
                Slot::empty(EquipmentCategory::Weapon, 2),
                Slot {
                    equipment: Some(gear("old-gun", EquipmentCategory::Weapon, 1)),
                    ..Slot::empty(EquipmentCategory::Weapon, 1)
                },
            ],
        });
        state
    }

    #[test]
    fn picker_only_offers_items_that_fit() {
        let state = state_with_loadout();
        let slot = state.loadouts[0].slot(0).cloned().unwrap();
        let ids: Vec<_> = state
            .compatible_items(&slot)
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["small-gun"]);
    }

    #[test]
    fn enter_on_slots_depends_on_occupancy() {
        let mut state = state_with_loadout();
        let id = state.loadouts[0].id;
        state.view = OutfitterView::Loadouts;
        state.open_loadout = Some(id);
        assert_eq!(
            keymap(&state, Key::Enter),
            Some(Intent::Outfitter(OutfitterIntent::PickItem { slot: 0 }))
        );
        state.slot_cursor = 1;
        assert_eq!(
            keymap(&state, Key::Enter),
            Some(Intent::Outfitter(OutfitterIntent::Uninstall {
                loadout: id,
                slot: 1
            }))
        );
        assert_eq!(
            keymap(&state, Key::Esc),
            Some(Intent::Outfitter(OutfitterIntent::CloseLoadout))
        );
    }

    #[test]
    fn picker_enter_installs_highlighted_item() {
        let mut state = state_with_loadout();
        let id = state.loadouts[0].id;
        state.open_loadout = Some(id);
        state.mode = OutfitterMode::PickItem { slot: 0, cursor: 0 };
        assert_eq!(
            keymap(&state, Key::Enter),
            Some(Intent::Outfitter(OutfitterIntent::Install {
                loadout: id,
                slot: 0,
                equipment_id: "small-gun".into()
            }))
        );
    }

    #[test]
    fn replace_ignores_unknown_loadouts() {
        let mut state = state_with_loadout();
        let mut stranger = state.loadouts[0].clone();
        stranger.id = Uuid::new_v4();
        assert!(!state.replace_loadout(stranger));
        assert_eq!(state.loadouts.len(), 1);
    }
}
