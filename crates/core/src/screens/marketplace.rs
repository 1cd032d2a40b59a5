//! Player marketplace: auctions, contracts and bounties.
//!
//! Auction writes are settled by the manager and the returned balance is
//! adopted as-is. Contract and bounty postings escrow their credits up
//! front: the balance drops locally at once, then a single command debits
//! the durable balance and records the posting. When the record step fails
//! after the debit landed, a compensating command puts the old balance back.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::form::{Form, FormEdit, TextField};
use crate::{
    capability::StoreResult,
    economy,
    engine::{
        ActionKey, Command, Compensation, EscrowPlan, Intent, Key, Posting, SessionContext,
    },
    error::{StoreError, ValidationError},
    models::{
        Auction, AuctionId, Bounty, Contract, ContractId, Credits, NewAuction, NewBounty,
        NewContract, Settlement,
    },
};

/// Most entries kept in the recently-closed window.
pub const HISTORY_LIMIT: usize = 20;
/// How long a closed entry stays in the window, in minutes of session time.
pub const HISTORY_RETENTION_MINUTES: i64 = 10;

/// Marketplace tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketTab {
    /// Item auctions.
    Auctions,
    /// Escrowed job contracts.
    Contracts,
    /// Player bounties.
    Bounties,
}

impl MarketTab {
    /// Display order.
    pub const ALL: [MarketTab; 3] = [MarketTab::Auctions, MarketTab::Contracts, MarketTab::Bounties];

    /// Tab after this one, wrapping.
    pub fn next(self) -> Self {
        match self {
            MarketTab::Auctions => MarketTab::Contracts,
            MarketTab::Contracts => MarketTab::Bounties,
            MarketTab::Bounties => MarketTab::Auctions,
        }
    }

    /// Tab label.
    pub fn label(self) -> &'static str {
        match self {
            MarketTab::Auctions => "Auctions",
            MarketTab::Contracts => "Contracts",
            MarketTab::Bounties => "Bounties",
        }
    }

    fn load_key(self) -> ActionKey {
        match self {
            MarketTab::Auctions => ActionKey::LoadAuctions,
            MarketTab::Contracts => ActionKey::LoadContracts,
            MarketTab::Bounties => ActionKey::LoadBounties,
        }
    }

    fn load_command(self) -> Command {
        match self {
            MarketTab::Auctions => Command::LoadAuctions,
            MarketTab::Contracts => Command::LoadContracts,
            MarketTab::Bounties => Command::LoadBounties,
        }
    }
}

/// Creation form, one per tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketForm {
    /// List an item: id, quantity, starting bid, optional buyout, hours.
    Auction(Form),
    /// Post a contract: target, reward.
    Contract(Form),
    /// Post a bounty: target name, reason, amount.
    Bounty(Form),
}

impl MarketForm {
    /// Blank form for a tab.
    pub fn for_tab(tab: MarketTab) -> Self {
        match tab {
            MarketTab::Auctions => MarketForm::Auction(Form::new(vec![
                TextField::text("Item id", 40),
                TextField::number("Quantity").with_value("1"),
                TextField::number("Starting bid"),
                TextField::number("Buyout").optional(),
                TextField::number("Hours").with_value("24"),
            ])),
            MarketTab::Contracts => MarketForm::Contract(Form::new(vec![
                TextField::text("Target", 80),
                TextField::number("Reward"),
            ])),
            MarketTab::Bounties => MarketForm::Bounty(Form::new(vec![
                TextField::text("Target", 32),
                TextField::text("Reason", 80),
                TextField::number("Amount"),
            ])),
        }
    }

    /// Dialog title.
    pub fn title(&self) -> &'static str {
        match self {
            MarketForm::Auction(_) => "New auction",
            MarketForm::Contract(_) => "New contract",
            MarketForm::Bounty(_) => "New bounty",
        }
    }

    /// Underlying fields.
    pub fn form(&self) -> &Form {
        match self {
            MarketForm::Auction(form) | MarketForm::Contract(form) | MarketForm::Bounty(form) => {
                form
            }
        }
    }

    fn form_mut(&mut self) -> &mut Form {
        match self {
            MarketForm::Auction(form) | MarketForm::Contract(form) | MarketForm::Bounty(form) => {
                form
            }
        }
    }

    fn field(&self, index: usize) -> Result<&TextField, ValidationError> {
        self.form()
            .field(index)
            .ok_or_else(|| ValidationError::illegal("Form is incomplete"))
    }

    /// Parse the fields into the matching submit intent.
    fn draft(&self) -> Result<MarketIntent, ValidationError> {
        Ok(match self {
            MarketForm::Auction(_) => {
                let quantity = self.field(1)?.required_number()?;
                MarketIntent::CreateAuction(AuctionDraft {
                    equipment_id: self.field(0)?.required_text()?,
                    quantity: u32::try_from(quantity)
                        .map_err(|_| ValidationError::field("Quantity", "is too large"))?,
                    starting_bid: self.field(2)?.required_number()?,
                    buyout_price: self.field(3)?.number_value()?,
                    duration_hours: self.field(4)?.required_number()?,
                })
            }
            MarketForm::Contract(_) => MarketIntent::PostContract(ContractDraft {
                target: self.field(0)?.required_text()?,
                reward: self.field(1)?.required_number()?,
            }),
            MarketForm::Bounty(_) => MarketIntent::PostBounty(BountyDraft {
                target_name: self.field(0)?.required_text()?,
                reason: self.field(1)?.required_text()?,
                amount: self.field(2)?.required_number()?,
            }),
        })
    }
}

/// Browse, detail or create, per tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketMode {
    /// List of the active tab.
    Browse,
    /// One entry of the active tab.
    Detail(Uuid),
    /// Creation form of the active tab.
    Create(MarketForm),
}

/// Recently closed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// What closed.
    pub label: String,
    /// When the session noticed.
    pub closed_at: DateTime<Utc>,
}

/// Marketplace sub-state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketState {
    /// Active tab.
    pub tab: MarketTab,
    /// Browse, detail or create.
    pub mode: MarketMode,
    /// Active auctions as last loaded.
    pub auctions: Vec<Auction>,
    /// Open and claimed contracts as last loaded.
    pub contracts: Vec<Contract>,
    /// Active bounties as last loaded.
    pub bounties: Vec<Bounty>,
    /// Highlighted row.
    pub cursor: usize,
    /// Recently closed entries, newest first.
    pub history: VecDeque<HistoryEntry>,
    /// Session time of the last successful load.
    pub last_refresh: Option<DateTime<Utc>>,
}

impl Default for MarketState {
    fn default() -> Self {
        Self {
            tab: MarketTab::Auctions,
            mode: MarketMode::Browse,
            auctions: Vec::new(),
            contracts: Vec::new(),
            bounties: Vec::new(),
            cursor: 0,
            history: VecDeque::new(),
            last_refresh: None,
        }
    }
}

impl MarketState {
    /// Rows in the active tab.
    pub fn rows(&self) -> usize {
        match self.tab {
            MarketTab::Auctions => self.auctions.len(),
            MarketTab::Contracts => self.contracts.len(),
            MarketTab::Bounties => self.bounties.len(),
        }
    }

    /// Id of the highlighted row.
    pub fn selected_id(&self) -> Option<Uuid> {
        match self.tab {
            MarketTab::Auctions => self.auctions.get(self.cursor).map(|a| a.id),
            MarketTab::Contracts => self.contracts.get(self.cursor).map(|c| c.id),
            MarketTab::Bounties => self.bounties.get(self.cursor).map(|b| b.id),
        }
    }

    /// Auction by id.
    pub fn auction(&self, id: AuctionId) -> Option<&Auction> {
        self.auctions.iter().find(|a| a.id == id)
    }

    /// Contract by id.
    pub fn contract(&self, id: ContractId) -> Option<&Contract> {
        self.contracts.iter().find(|c| c.id == id)
    }

    /// Bounty by id.
    pub fn bounty(&self, id: Uuid) -> Option<&Bounty> {
        self.bounties.iter().find(|b| b.id == id)
    }

    /// Id the current detail view or highlight points at.
    fn focused_id(&self) -> Option<Uuid> {
        match &self.mode {
            MarketMode::Detail(id) => Some(*id),
            _ => self.selected_id(),
        }
    }

    fn remember(&mut self, label: String, now: DateTime<Utc>) {
        self.history.push_front(HistoryEntry {
            label,
            closed_at: now,
        });
        self.history.truncate(HISTORY_LIMIT);
    }

    fn prune_history(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::minutes(HISTORY_RETENTION_MINUTES);
        self.history.retain(|entry| entry.closed_at > cutoff);
    }

    fn remove_auction(&mut self, id: AuctionId, label: &str, now: DateTime<Utc>) {
        if let Some(pos) = self.auctions.iter().position(|a| a.id == id) {
            let lot = self.auctions.remove(pos);
            self.remember(format!("{label}: {}", auction_label(&lot)), now);
        }
        self.after_removal(id);
    }

    fn remove_contract(&mut self, id: ContractId, label: &str, now: DateTime<Utc>) {
        if let Some(pos) = self.contracts.iter().position(|c| c.id == id) {
            let contract = self.contracts.remove(pos);
            self.remember(format!("{label}: {}", contract.target), now);
        }
        self.after_removal(id);
    }

    fn after_removal(&mut self, id: Uuid) {
        if self.mode == MarketMode::Detail(id) {
            self.mode = MarketMode::Browse;
        }
        self.cursor = self.cursor.min(self.rows().saturating_sub(1));
    }

    fn upsert_auction(&mut self, auction: Auction) {
        match self.auctions.iter_mut().find(|a| a.id == auction.id) {
            Some(existing) => *existing = auction,
            None => self.auctions.push(auction),
        }
    }

    fn upsert_contract(&mut self, contract: Contract) {
        match self.contracts.iter_mut().find(|c| c.id == contract.id) {
            Some(existing) => *existing = contract,
            None => self.contracts.push(contract),
        }
    }

    fn upsert_bounty(&mut self, bounty: Bounty) {
        match self.bounties.iter_mut().find(|b| b.id == bounty.id) {
            Some(existing) => *existing = bounty,
            None => self.bounties.push(bounty),
        }
    }
}

fn auction_label(auction: &Auction) -> String {
    format!("{} x{}", auction.item.name, auction.item.quantity)
}

/// Parsed auction form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionDraft {
    /// Item to list from inventory.
    pub equipment_id: String,
    /// Units to list.
    pub quantity: u32,
    /// Opening bid.
    pub starting_bid: Credits,
    /// Optional instant-purchase price.
    pub buyout_price: Option<Credits>,
    /// Listing length.
    pub duration_hours: i64,
}

/// Parsed contract form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractDraft {
    /// Job description.
    pub target: String,
    /// Reward held in escrow.
    pub reward: Credits,
}

/// Parsed bounty form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BountyDraft {
    /// Player the bounty is on.
    pub target_name: String,
    /// Why.
    pub reason: String,
    /// Reward, before the posting fee.
    pub amount: Credits,
}

/// Marketplace actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketIntent {
    /// Show a tab and load it.
    SwitchTab(MarketTab),
    /// Move the highlight up.
    Up,
    /// Move the highlight down.
    Down,
    /// Show one entry.
    OpenDetail(Uuid),
    /// Close the detail view or form.
    Dismiss,
    /// Reload the active tab.
    Refresh,
    /// Bid the minimum acceptable amount.
    Bid {
        /// Auction to bid on.
        auction: AuctionId,
    },
    /// Pay the buyout price.
    Buyout {
        /// Auction to buy.
        auction: AuctionId,
    },
    /// Withdraw one of the player's auctions.
    CancelAuction {
        /// Auction to withdraw.
        auction: AuctionId,
    },
    /// Take a contract.
    Claim {
        /// Contract to claim.
        contract: ContractId,
    },
    /// Finish a claimed contract and collect the reward.
    Complete {
        /// Contract to complete.
        contract: ContractId,
    },
    /// Withdraw one of the player's open contracts.
    CancelContract {
        /// Contract to withdraw.
        contract: ContractId,
    },
    /// Open the creation form for the active tab.
    BeginCreate,
    /// Edit the creation form.
    Form(FormEdit),
    /// Submit the creation form.
    Submit,
    /// List an item for auction.
    CreateAuction(AuctionDraft),
    /// Post a contract.
    PostContract(ContractDraft),
    /// Post a bounty.
    PostBounty(BountyDraft),
}

/// Translate a key on the marketplace.
pub fn keymap(state: &MarketState, key: Key) -> Option<Intent> {
    let intent = match &state.mode {
        MarketMode::Create(_) => match key {
            Key::Tab | Key::Down => MarketIntent::Form(FormEdit::Next),
            Key::BackTab | Key::Up => MarketIntent::Form(FormEdit::Prev),
            Key::Char(ch) => MarketIntent::Form(FormEdit::Type(ch)),
            Key::Backspace => MarketIntent::Form(FormEdit::Erase),
            Key::Enter => MarketIntent::Submit,
            Key::Esc => MarketIntent::Dismiss,
            _ => return None,
        },
        MarketMode::Detail(id) => match key {
            Key::Esc => MarketIntent::Dismiss,
            _ => return action_key(state.tab, *id, key).map(Intent::Market),
        },
        MarketMode::Browse => match key {
            Key::Tab => MarketIntent::SwitchTab(state.tab.next()),
            Key::Up | Key::Char('k') => MarketIntent::Up,
            Key::Down | Key::Char('j') => MarketIntent::Down,
            Key::Enter => MarketIntent::OpenDetail(state.selected_id()?),
            Key::Char('r') => MarketIntent::Refresh,
            Key::Char('n') => MarketIntent::BeginCreate,
            Key::Esc => return Some(Intent::Back),
            _ => return action_key(state.tab, state.selected_id()?, key).map(Intent::Market),
        },
    };
    Some(Intent::Market(intent))
}

fn action_key(tab: MarketTab, id: Uuid, key: Key) -> Option<MarketIntent> {
    Some(match (tab, key) {
        (MarketTab::Auctions, Key::Char('b')) => MarketIntent::Bid { auction: id },
        (MarketTab::Auctions, Key::Char('o')) => MarketIntent::Buyout { auction: id },
        (MarketTab::Auctions, Key::Char('x')) => MarketIntent::CancelAuction { auction: id },
        (MarketTab::Contracts, Key::Char('c')) => MarketIntent::Claim { contract: id },
        (MarketTab::Contracts, Key::Char('d')) => MarketIntent::Complete { contract: id },
        (MarketTab::Contracts, Key::Char('x')) => MarketIntent::CancelContract { contract: id },
        _ => return None,
    })
}

/// Load command for the active tab unless one is already outstanding.
pub(crate) fn load(ctx: &SessionContext, state: &MarketState) -> Option<Command> {
    if ctx.is_busy(state.tab.load_key()) {
        return None;
    }
    Some(state.tab.load_command())
}

/// Clock advance: expire history and auto-refresh the visible tab.
pub(crate) fn on_tick(ctx: &SessionContext, state: &mut MarketState) -> Option<Command> {
    state.prune_history(ctx.now);
    if state.mode != MarketMode::Browse {
        return None;
    }
    let due = match state.last_refresh {
        Some(at) => ctx.now - at >= ctx.settings.refresh_interval,
        None => true,
    };
    if !due {
        return None;
    }
    load(ctx, state)
}

pub(crate) fn handle(
    ctx: &mut SessionContext,
    state: &mut MarketState,
    intent: MarketIntent,
) -> Result<Option<Command>, ValidationError> {
    let actor = ctx.player.id;
    let command = match intent {
        MarketIntent::SwitchTab(tab) => {
            state.tab = tab;
            state.mode = MarketMode::Browse;
            state.cursor = 0;
            load(ctx, state)
        }
        MarketIntent::Up => {
            state.cursor = state.cursor.saturating_sub(1);
            None
        }
        MarketIntent::Down => {
            state.cursor = (state.cursor + 1).min(state.rows().saturating_sub(1));
            None
        }
        MarketIntent::OpenDetail(id) => {
            let known = match state.tab {
                MarketTab::Auctions => state.auction(id).is_some(),
                MarketTab::Contracts => state.contract(id).is_some(),
                MarketTab::Bounties => state.bounty(id).is_some(),
            };
            if !known {
                return Err(ValidationError::NotFound(state.tab.label().to_string()));
            }
            state.mode = MarketMode::Detail(id);
            None
        }
        MarketIntent::Dismiss => {
            state.mode = MarketMode::Browse;
            None
        }
        MarketIntent::Refresh => {
            ctx.ensure_idle(state.tab.load_key())?;
            Some(state.tab.load_command())
        }
        MarketIntent::Bid { auction } => {
            let lot = state
                .auction(auction)
                .ok_or_else(|| ValidationError::NotFound("Auction".to_string()))?;
            if !lot.is_open_at(ctx.now) {
                return Err(ValidationError::illegal("Auction is no longer accepting bids"));
            }
            let amount = lot.minimum_bid();
            if !ctx.player.can_afford(amount) {
                return Err(ValidationError::InsufficientCredits {
                    needed: amount,
                    available: ctx.player.credits,
                });
            }
            ctx.ensure_idle(ActionKey::Bid)?;
            info!(%auction, bidder = %actor, amount, "Bid requested");
            Some(Command::PlaceBid {
                auction,
                bidder: actor,
                amount,
            })
        }
        MarketIntent::Buyout { auction } => {
            let lot = state
                .auction(auction)
                .ok_or_else(|| ValidationError::NotFound("Auction".to_string()))?;
            let price = lot
                .buyout()
                .ok_or_else(|| ValidationError::illegal("This auction has no buyout price"))?;
            if !lot.is_open_at(ctx.now) {
                return Err(ValidationError::illegal("Auction is no longer active"));
            }
            if !ctx.player.can_afford(price) {
                return Err(ValidationError::InsufficientCredits {
                    needed: price,
                    available: ctx.player.credits,
                });
            }
            ctx.ensure_idle(ActionKey::Buyout)?;
            info!(%auction, buyer = %actor, price, "Buyout requested");
            Some(Command::Buyout {
                auction,
                buyer: actor,
            })
        }
        MarketIntent::CancelAuction { auction } => {
            let lot = state
                .auction(auction)
                .ok_or_else(|| ValidationError::NotFound("Auction".to_string()))?;
            if !lot.can_cancel(actor) {
                return Err(ValidationError::illegal(
                    "Only the seller can cancel, and only before the first bid",
                ));
            }
            ctx.ensure_idle(ActionKey::CancelAuction)?;
            Some(Command::CancelAuction {
                auction,
                seller: actor,
            })
        }
        MarketIntent::Claim { contract } => {
            let job = state
                .contract(contract)
                .ok_or_else(|| ValidationError::NotFound("Contract".to_string()))?;
            if !job.can_claim(actor) {
                return Err(ValidationError::illegal(
                    "Only open contracts posted by someone else can be claimed",
                ));
            }
            ctx.ensure_idle(ActionKey::Claim)?;
            Some(Command::ClaimContract {
                contract,
                claimant: actor,
            })
        }
        MarketIntent::Complete { contract } => {
            let job = state
                .contract(contract)
                .ok_or_else(|| ValidationError::NotFound("Contract".to_string()))?;
            if !job.can_complete(actor) {
                return Err(ValidationError::illegal(
                    "Only the claimant can complete a claimed contract",
                ));
            }
            ctx.ensure_idle(ActionKey::Complete)?;
            Some(Command::CompleteContract {
                contract,
                claimant: actor,
            })
        }
        MarketIntent::CancelContract { contract } => {
            let job = state
                .contract(contract)
                .ok_or_else(|| ValidationError::NotFound("Contract".to_string()))?;
            if !job.can_cancel(actor) {
                return Err(ValidationError::illegal(
                    "Only the poster can withdraw an unclaimed contract",
                ));
            }
            ctx.ensure_idle(ActionKey::CancelContract)?;
            Some(Command::CancelContract {
                contract,
                poster: actor,
            })
        }
        MarketIntent::BeginCreate => {
            state.mode = MarketMode::Create(MarketForm::for_tab(state.tab));
            None
        }
        MarketIntent::Form(edit) => {
            if let MarketMode::Create(form) = &mut state.mode {
                form.form_mut().apply(edit);
            }
            None
        }
        MarketIntent::Submit => {
            let MarketMode::Create(form) = &state.mode else {
                return Ok(None);
            };
            let intent = form.draft()?;
            return handle(ctx, state, intent);
        }
        MarketIntent::CreateAuction(draft) => {
            let listing = validate_auction(ctx, draft)?;
            ctx.ensure_idle(ActionKey::CreateAuction)?;
            state.mode = MarketMode::Browse;
            Some(Command::CreateAuction(listing))
        }
        MarketIntent::PostContract(draft) => {
            let posting = validate_contract(ctx, draft)?;
            ctx.ensure_idle(ActionKey::Post)?;
            state.mode = MarketMode::Browse;
            Some(escrow(ctx, Posting::Contract(posting)))
        }
        MarketIntent::PostBounty(draft) => {
            let posting = validate_bounty(ctx, draft)?;
            ctx.ensure_idle(ActionKey::Post)?;
            state.mode = MarketMode::Browse;
            Some(escrow(ctx, Posting::Bounty(posting)))
        }
    };
    Ok(command)
}

fn validate_auction(ctx: &SessionContext, draft: AuctionDraft) -> Result<NewAuction, ValidationError> {
    let equipment_id = draft.equipment_id.trim().to_string();
    if equipment_id.is_empty() {
        return Err(ValidationError::field("Item id", "is required"));
    }
    if draft.quantity == 0 {
        return Err(ValidationError::field("Quantity", "must be at least 1"));
    }
    if draft.starting_bid <= 0 {
        return Err(ValidationError::field("Starting bid", "must be positive"));
    }
    let buyout_price = draft.buyout_price.filter(|price| *price > 0);
    if let Some(price) = buyout_price {
        if price <= draft.starting_bid {
            return Err(ValidationError::field(
                "Buyout",
                "must be higher than the starting bid",
            ));
        }
    }
    if !(1..=economy::MAX_AUCTION_HOURS).contains(&draft.duration_hours) {
        return Err(ValidationError::field(
            "Hours",
            format!("must be between 1 and {}", economy::MAX_AUCTION_HOURS),
        ));
    }
    Ok(NewAuction {
        seller: ctx.player.id,
        seller_name: ctx.player.username.clone(),
        equipment_id,
        quantity: draft.quantity,
        starting_bid: draft.starting_bid,
        buyout_price,
        duration_hours: draft.duration_hours,
    })
}

fn validate_contract(
    ctx: &SessionContext,
    draft: ContractDraft,
) -> Result<NewContract, ValidationError> {
    let target = draft.target.trim().to_string();
    if target.is_empty() {
        return Err(ValidationError::field("Target", "is required"));
    }
    if draft.reward < economy::MIN_CONTRACT_REWARD {
        return Err(ValidationError::field(
            "Reward",
            format!(
                "must be at least {} credits",
                economy::format_credits(economy::MIN_CONTRACT_REWARD)
            ),
        ));
    }
    if !ctx.player.can_afford(draft.reward) {
        return Err(ValidationError::InsufficientCredits {
            needed: draft.reward,
            available: ctx.player.credits,
        });
    }
    Ok(NewContract {
        poster: ctx.player.id,
        poster_name: ctx.player.username.clone(),
        target,
        reward: draft.reward,
    })
}

fn validate_bounty(ctx: &SessionContext, draft: BountyDraft) -> Result<NewBounty, ValidationError> {
    let target_name = draft.target_name.trim().to_string();
    let reason = draft.reason.trim().to_string();
    if target_name.is_empty() {
        return Err(ValidationError::field("Target", "is required"));
    }
    if reason.is_empty() {
        return Err(ValidationError::field("Reason", "is required"));
    }
    let minimum = economy::format_credits(economy::MIN_BOUNTY);
    if draft.amount < economy::MIN_BOUNTY {
        return Err(ValidationError::field(
            "Bounty",
            format!("must be at least {minimum} credits"),
        ));
    }
    let total = economy::bounty_total(draft.amount);
    if !ctx.player.can_afford(total) {
        // A balance that cannot cover even the smallest bounty gets the
        // minimum spelled out rather than the shortfall.
        if !ctx.player.can_afford(economy::bounty_total(economy::MIN_BOUNTY)) {
            return Err(ValidationError::field(
                "Bounty",
                format!(
                    "must be at least {minimum} credits plus a {} credit fee; you have {}",
                    economy::format_credits(economy::bounty_fee(economy::MIN_BOUNTY)),
                    economy::format_credits(ctx.player.credits)
                ),
            ));
        }
        return Err(ValidationError::InsufficientCredits {
            needed: total,
            available: ctx.player.credits,
        });
    }
    Ok(NewBounty {
        poster: ctx.player.id,
        poster_name: ctx.player.username.clone(),
        target_name,
        reason,
        amount: draft.amount,
    })
}

fn escrow(ctx: &mut SessionContext, posting: Posting) -> Command {
    let amount = posting.escrow();
    let plan = EscrowPlan {
        posting,
        player: ctx.player.id,
    };
    ctx.player.credits -= amount;
    info!(
        player = %plan.player,
        escrow = amount,
        balance = ctx.player.credits,
        "Escrow taken locally"
    );
    Command::PostEscrow(plan)
}

/// Which step of an escrowed posting failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscrowFailure {
    /// The durable balance was not debited; nothing durable changed.
    #[error("escrow debit failed: {0}")]
    Debit(StoreError),
    /// The balance was debited but the posting was not recorded.
    #[error("posting was not recorded: {0}")]
    Record(StoreError),
}

/// Posting recorded by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Posted {
    /// A contract.
    Contract(Contract),
    /// A bounty.
    Bounty(Bounty),
}

/// Marketplace command results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketOutcome {
    /// Auction list read.
    AuctionsLoaded(StoreResult<Vec<Auction>>),
    /// Contract list read.
    ContractsLoaded(StoreResult<Vec<Contract>>),
    /// Bounty list read.
    BountiesLoaded(StoreResult<Vec<Bounty>>),
    /// Bid write.
    BidPlaced {
        /// Target lot.
        auction: AuctionId,
        /// Amount bid.
        amount: Credits,
        /// Updated lot.
        result: StoreResult<Auction>,
    },
    /// Buyout write.
    BoughtOut {
        /// Target lot.
        auction: AuctionId,
        /// Sold lot and the buyer's balance.
        result: StoreResult<Settlement<Auction>>,
    },
    /// Auction withdrawal.
    AuctionCancelled {
        /// Target lot.
        auction: AuctionId,
        /// Cancelled lot.
        result: StoreResult<Auction>,
    },
    /// New listing.
    AuctionCreated(StoreResult<Auction>),
    /// Contract claim.
    ContractClaimed {
        /// Target contract.
        contract: ContractId,
        /// Claimed contract.
        result: StoreResult<Contract>,
    },
    /// Contract completion.
    ContractCompleted {
        /// Target contract.
        contract: ContractId,
        /// Completed contract and the claimant's balance.
        result: StoreResult<Settlement<Contract>>,
    },
    /// Contract withdrawal.
    ContractCancelled {
        /// Target contract.
        contract: ContractId,
        /// Expired contract and the poster's balance.
        result: StoreResult<Settlement<Contract>>,
    },
    /// Escrowed posting.
    Posted {
        /// Writes that were attempted.
        plan: EscrowPlan,
        /// Created record, or the step that failed.
        result: Result<Posted, EscrowFailure>,
    },
}

impl MarketOutcome {
    pub(crate) fn action_key(&self) -> ActionKey {
        match self {
            MarketOutcome::AuctionsLoaded(_) => ActionKey::LoadAuctions,
            MarketOutcome::ContractsLoaded(_) => ActionKey::LoadContracts,
            MarketOutcome::BountiesLoaded(_) => ActionKey::LoadBounties,
            MarketOutcome::BidPlaced { .. } => ActionKey::Bid,
            MarketOutcome::BoughtOut { .. } => ActionKey::Buyout,
            MarketOutcome::AuctionCancelled { .. } => ActionKey::CancelAuction,
            MarketOutcome::AuctionCreated(_) => ActionKey::CreateAuction,
            MarketOutcome::ContractClaimed { .. } => ActionKey::Claim,
            MarketOutcome::ContractCompleted { .. } => ActionKey::Complete,
            MarketOutcome::ContractCancelled { .. } => ActionKey::CancelContract,
            MarketOutcome::Posted { .. } => ActionKey::Post,
        }
    }
}

/// Apply a marketplace result. `state` is `None` when the player has left
/// the marketplace; balances and escrow reverts still apply.
pub(crate) fn on_outcome(
    ctx: &mut SessionContext,
    state: Option<&mut MarketState>,
    outcome: MarketOutcome,
) -> Option<Command> {
    let now = ctx.now;
    match outcome {
        MarketOutcome::AuctionsLoaded(result) => match result {
            Ok(auctions) => {
                let state = state?;
                let closed: Vec<String> = state
                    .auctions
                    .iter()
                    .filter(|old| !auctions.iter().any(|a| a.id == old.id))
                    .map(|old| format!("Closed: {}", auction_label(old)))
                    .collect();
                state.auctions = auctions;
                finish_load(state, MarketTab::Auctions, closed, now);
            }
            Err(err) => ctx.fail(format!("Could not load auctions: {err}")),
        },
        MarketOutcome::ContractsLoaded(result) => match result {
            Ok(contracts) => {
                let state = state?;
                let closed: Vec<String> = state
                    .contracts
                    .iter()
                    .filter(|old| !contracts.iter().any(|c| c.id == old.id))
                    .map(|old| format!("Closed: {}", old.target))
                    .collect();
                state.contracts = contracts;
                finish_load(state, MarketTab::Contracts, closed, now);
            }
            Err(err) => ctx.fail(format!("Could not load contracts: {err}")),
        },
        MarketOutcome::BountiesLoaded(result) => match result {
            Ok(bounties) => {
                let state = state?;
                let closed: Vec<String> = state
                    .bounties
                    .iter()
                    .filter(|old| !bounties.iter().any(|b| b.id == old.id))
                    .map(|old| format!("Closed: bounty on {}", old.target_name))
                    .collect();
                state.bounties = bounties;
                finish_load(state, MarketTab::Bounties, closed, now);
            }
            Err(err) => ctx.fail(format!("Could not load bounties: {err}")),
        },
        MarketOutcome::BidPlaced {
            auction,
            amount,
            result,
        } => match result {
            Ok(lot) => {
                ctx.info(format!(
                    "Bid of {} cr placed on {}",
                    economy::format_credits(lot.current_bid),
                    lot.item.name
                ));
                if let Some(state) = state {
                    state.upsert_auction(lot);
                }
            }
            Err(err) => {
                warn!(%auction, amount, %err, "Bid rejected");
                ctx.fail(format!("Bid failed: {err}"));
            }
        },
        MarketOutcome::BoughtOut { auction, result } => match result {
            Ok(settlement) => {
                ctx.player.credits = settlement.balance;
                ctx.info(format!(
                    "Bought {}. Balance {} cr",
                    auction_label(&settlement.entity),
                    economy::format_credits(settlement.balance)
                ));
                if let Some(state) = state {
                    state.remove_auction(auction, "Bought", now);
                }
            }
            Err(err) => ctx.fail(format!("Buyout failed: {err}")),
        },
        MarketOutcome::AuctionCancelled { auction, result } => match result {
            Ok(lot) => {
                ctx.info(format!("Auction for {} cancelled", lot.item.name));
                if let Some(state) = state {
                    state.remove_auction(auction, "Cancelled", now);
                }
            }
            Err(err) => ctx.fail(format!("Cancel failed: {err}")),
        },
        MarketOutcome::AuctionCreated(result) => match result {
            Ok(lot) => {
                ctx.info(format!("Listed {}", auction_label(&lot)));
                if let Some(state) = state {
                    state.upsert_auction(lot);
                }
            }
            Err(err) => ctx.fail(format!("Listing failed: {err}")),
        },
        MarketOutcome::ContractClaimed { contract, result } => match result {
            Ok(job) => {
                ctx.info(format!("Claimed contract: {}", job.target));
                if let Some(state) = state {
                    state.upsert_contract(job);
                }
            }
            Err(err) => {
                debug!(%contract, %err, "Claim rejected");
                ctx.fail(format!("Claim failed: {err}"));
            }
        },
        MarketOutcome::ContractCompleted { contract, result } => match result {
            Ok(settlement) => {
                ctx.player.credits = settlement.balance;
                ctx.info(format!(
                    "Contract complete. {} cr paid out",
                    economy::format_credits(settlement.entity.reward)
                ));
                if let Some(state) = state {
                    state.remove_contract(contract, "Completed", now);
                }
            }
            Err(err) => ctx.fail(format!("Completion failed: {err}")),
        },
        MarketOutcome::ContractCancelled { contract, result } => match result {
            Ok(settlement) => {
                ctx.player.credits = settlement.balance;
                ctx.info(format!(
                    "Contract withdrawn. {} cr refunded",
                    economy::format_credits(settlement.entity.reward)
                ));
                if let Some(state) = state {
                    state.remove_contract(contract, "Withdrawn", now);
                }
            }
            Err(err) => ctx.fail(format!("Withdrawal failed: {err}")),
        },
        MarketOutcome::Posted { plan, result } => return on_posted(ctx, state, plan, result),
    }
    None
}

fn finish_load(state: &mut MarketState, tab: MarketTab, closed: Vec<String>, now: DateTime<Utc>) {
    for label in closed {
        state.remember(label, now);
    }
    if let MarketMode::Detail(id) = state.mode {
        let still_listed = match tab {
            MarketTab::Auctions => state.auction(id).is_some(),
            MarketTab::Contracts => state.contract(id).is_some(),
            MarketTab::Bounties => state.bounty(id).is_some(),
        };
        if state.tab == tab && !still_listed {
            state.mode = MarketMode::Browse;
        }
    }
    if state.tab == tab {
        state.cursor = state.cursor.min(state.rows().saturating_sub(1));
        state.last_refresh = Some(now);
    }
}

fn on_posted(
    ctx: &mut SessionContext,
    state: Option<&mut MarketState>,
    plan: EscrowPlan,
    result: Result<Posted, EscrowFailure>,
) -> Option<Command> {
    let failure = match result {
        Ok(posted) => {
            ctx.info(format!(
                "Posted. {} cr held in escrow",
                economy::format_credits(plan.posting.escrow())
            ));
            if let Some(state) = state {
                match posted {
                    Posted::Contract(contract) => state.upsert_contract(contract),
                    Posted::Bounty(bounty) => state.upsert_bounty(bounty),
                }
            }
            return None;
        }
        Err(failure) => failure,
    };

    let amount = plan.posting.escrow();
    ctx.player.credits += amount;
    warn!(player = %plan.player, %failure, "Escrowed posting reverted");
    ctx.fail(format!("Posting failed: {failure}. Escrow was returned."));
    match failure {
        EscrowFailure::Debit(_) => None,
        EscrowFailure::Record(_) => Some(Command::Compensate(Compensation::RefundCredits {
            player: plan.player,
            amount,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuctionItem, AuctionStatus, BountyStatus};

    fn lot(now: DateTime<Utc>) -> Auction {
        Auction {
            id: Uuid::new_v4(),
            seller: Uuid::new_v4(),
            seller_name: "vega".into(),
            item: AuctionItem {
                equipment_id: "beam-laser".into(),
                name: "Beam Laser".into(),
                quantity: 1,
            },
            starting_bid: 1_000,
            current_bid: 0,
            highest_bidder: None,
            buyout_price: Some(2_000),
            end_time: now + Duration::hours(1),
            status: AuctionStatus::Active,
            bids: Vec::new(),
        }
    }

    #[test]
    fn browse_keys_act_on_the_highlighted_row() {
        let now = Utc::now();
        let mut state = MarketState::default();
        state.auctions.push(lot(now));
        let id = state.auctions[0].id;
        assert_eq!(
            keymap(&state, Key::Char('b')),
            Some(Intent::Market(MarketIntent::Bid { auction: id }))
        );
        assert_eq!(
            keymap(&state, Key::Enter),
            Some(Intent::Market(MarketIntent::OpenDetail(id)))
        );
        assert_eq!(keymap(&state, Key::Char('c')), None);
        assert_eq!(keymap(&state, Key::Esc), Some(Intent::Back));
    }

    #[test]
    fn create_mode_captures_letters() {
        let state = MarketState {
            mode: MarketMode::Create(MarketForm::for_tab(MarketTab::Contracts)),
            ..MarketState::default()
        };
        assert_eq!(
            keymap(&state, Key::Char('b')),
            Some(Intent::Market(MarketIntent::Form(FormEdit::Type('b'))))
        );
        assert_eq!(
            keymap(&state, Key::Esc),
            Some(Intent::Market(MarketIntent::Dismiss))
        );
    }

    #[test]
    fn bounty_form_parses_into_a_draft() {
        let mut form = MarketForm::for_tab(MarketTab::Bounties);
        for ch in "redjack".chars() {
            form.form_mut().apply(FormEdit::Type(ch));
        }
        form.form_mut().apply(FormEdit::Next);
        for ch in "piracy".chars() {
            form.form_mut().apply(FormEdit::Type(ch));
        }
        form.form_mut().apply(FormEdit::Next);
        for ch in "6000".chars() {
            form.form_mut().apply(FormEdit::Type(ch));
        }
        assert_eq!(
            form.draft(),
            Ok(MarketIntent::PostBounty(BountyDraft {
                target_name: "redjack".into(),
                reason: "piracy".into(),
                amount: 6_000,
            }))
        );
    }

    #[test]
    fn posted_bounty_replaces_an_already_listed_copy() {
        let now = Utc::now();
        let bounty = Bounty {
            id: Uuid::new_v4(),
            poster: Uuid::new_v4(),
            poster_name: "pilot".into(),
            target_name: "redjack".into(),
            reason: "piracy".into(),
            amount: 6_000,
            fee: economy::bounty_fee(6_000),
            status: BountyStatus::Active,
            posted_at: now,
            expires_at: now + Duration::hours(72),
        };
        let mut state = MarketState::default();
        state.bounties.push(bounty.clone());

        state.upsert_bounty(Bounty {
            amount: 7_000,
            ..bounty.clone()
        });

        assert_eq!(state.bounties.len(), 1);
        assert_eq!(state.bounties[0].amount, 7_000);
    }

    #[test]
    fn history_is_bounded_and_expires() {
        let now = Utc::now();
        let mut state = MarketState::default();
        for i in 0..(HISTORY_LIMIT + 5) {
            state.remember(format!("entry {i}"), now);
        }
        assert_eq!(state.history.len(), HISTORY_LIMIT);
        assert_eq!(state.history[0].label, format!("entry {}", HISTORY_LIMIT + 4));

        state.prune_history(now + Duration::minutes(HISTORY_RETENTION_MINUTES + 1));
        assert!(state.history.is_empty());
    }
}
