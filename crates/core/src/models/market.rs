use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AuctionId, BountyId, ContractId, Credits, EquipmentId, PlayerId};
use crate::{economy, error::StoreError};

/// Lifecycle of an auction lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionStatus {
    /// Accepting bids.
    Active,
    /// Closed with a winning bid or a buyout.
    Sold,
    /// Closed without a winning bid.
    Expired,
    /// Withdrawn by the seller before any bid.
    Cancelled,
}

impl AuctionStatus {
    /// True once the lot can no longer change hands.
    pub fn is_terminal(self) -> bool {
        !matches!(self, AuctionStatus::Active)
    }
}

/// Entry in an auction's append-only bid history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidRecord {
    /// Bidding player.
    pub bidder: PlayerId,
    /// Bidder's username at the time of the bid.
    pub bidder_name: String,
    /// Amount bid.
    pub amount: Credits,
    /// When the bid was accepted.
    pub placed_at: DateTime<Utc>,
}

/// Equipment offered by an auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionItem {
    /// Catalog id of the offered item.
    pub equipment_id: EquipmentId,
    /// Display name of the offered item.
    pub name: String,
    /// Units in the lot.
    pub quantity: u32,
}

/// Timed sale of equipment between players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    /// Lot id.
    pub id: AuctionId,
    /// Listing player.
    pub seller: PlayerId,
    /// Seller's username.
    pub seller_name: String,
    /// Offered equipment.
    pub item: AuctionItem,
    /// Floor for the first bid.
    pub starting_bid: Credits,
    /// Zero until the first bid lands.
    pub current_bid: Credits,
    /// Player holding the current bid.
    pub highest_bidder: Option<PlayerId>,
    /// Instant-sale price, when offered.
    pub buyout_price: Option<Credits>,
    /// When bidding closes.
    pub end_time: DateTime<Utc>,
    /// Lifecycle status.
    pub status: AuctionStatus,
    /// Accepted bids, oldest first.
    #[serde(default)]
    pub bids: Vec<BidRecord>,
}

impl Auction {
    /// Smallest amount the next bid must reach.
    pub fn minimum_bid(&self) -> Credits {
        economy::next_bid(self.starting_bid, self.current_bid)
    }

    /// Whether bids are accepted at `now`.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status == AuctionStatus::Active && now < self.end_time
    }

    /// Buyout price when one is set and positive.
    pub fn buyout(&self) -> Option<Credits> {
        self.buyout_price.filter(|price| *price > 0)
    }

    /// Only the seller may cancel, and only before the first bid.
    pub fn can_cancel(&self, actor: PlayerId) -> bool {
        self.seller == actor && self.status == AuctionStatus::Active && self.current_bid == 0
    }

    /// Append a bid, enforcing the floor and monotonic current bid.
    pub fn record_bid(&mut self, bid: BidRecord) -> Result<(), StoreError> {
        if !self.is_open_at(bid.placed_at) {
            return Err(StoreError::rejected("auction is no longer accepting bids"));
        }
        let minimum = self.minimum_bid();
        if bid.amount < minimum || bid.amount < self.current_bid {
            return Err(StoreError::rejected(format!(
                "bid must be at least {minimum} credits"
            )));
        }
        self.current_bid = bid.amount;
        self.highest_bidder = Some(bid.bidder);
        self.bids.push(bid);
        Ok(())
    }

    /// Remaining bidding time, never negative.
    pub fn time_left(&self, now: DateTime<Utc>) -> chrono::Duration {
        (self.end_time - now).max(chrono::Duration::zero())
    }
}

/// Listing request for a new auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAuction {
    /// Listing player.
    pub seller: PlayerId,
    /// Seller's username.
    pub seller_name: String,
    /// Catalog id of the item to list.
    pub equipment_id: EquipmentId,
    /// Units to list.
    pub quantity: u32,
    /// Floor for the first bid.
    pub starting_bid: Credits,
    /// Optional instant-sale price.
    pub buyout_price: Option<Credits>,
    /// Bidding window in hours.
    pub duration_hours: i64,
}

/// Lifecycle of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    /// Waiting for a claimant.
    Open,
    /// Taken by a claimant.
    Claimed,
    /// Paid out to the claimant.
    Completed,
    /// Lapsed before completion.
    Expired,
}

impl ContractStatus {
    /// True once the contract can no longer change.
    pub fn is_terminal(self) -> bool {
        matches!(self, ContractStatus::Completed | ContractStatus::Expired)
    }
}

/// Job posting whose reward sits in escrow from the moment it is posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    /// Contract id.
    pub id: ContractId,
    /// Posting player.
    pub poster: PlayerId,
    /// Poster's username.
    pub poster_name: String,
    /// Job description.
    pub target: String,
    /// Escrowed reward.
    pub reward: Credits,
    /// Lifecycle status.
    pub status: ContractStatus,
    /// Set only while claimed or after completion.
    pub claimant: Option<PlayerId>,
    /// When the contract was posted.
    pub posted_at: DateTime<Utc>,
    /// When an unclaimed contract lapses.
    pub expires_at: DateTime<Utc>,
}

impl Contract {
    /// Any open contract may be claimed by someone other than its poster.
    pub fn can_claim(&self, actor: PlayerId) -> bool {
        self.status == ContractStatus::Open && self.poster != actor
    }

    /// Only the claimant may complete a claimed contract.
    pub fn can_complete(&self, actor: PlayerId) -> bool {
        self.status == ContractStatus::Claimed && self.claimant == Some(actor)
    }

    /// Only the poster may cancel, and only while open.
    pub fn can_cancel(&self, actor: PlayerId) -> bool {
        self.status == ContractStatus::Open && self.poster == actor
    }
}

/// Posting request for a new contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContract {
    /// Posting player.
    pub poster: PlayerId,
    /// Poster's username.
    pub poster_name: String,
    /// Job description.
    pub target: String,
    /// Reward to escrow.
    pub reward: Credits,
}

/// Lifecycle of a bounty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BountyStatus {
    /// Open for hunters.
    Active,
    /// Collected by a hunter.
    Claimed,
    /// Lapsed uncollected.
    Expired,
}

impl BountyStatus {
    /// True once the bounty is closed.
    pub fn is_terminal(self) -> bool {
        !matches!(self, BountyStatus::Active)
    }
}

/// Price on a named player's head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounty {
    /// Bounty id.
    pub id: BountyId,
    /// Posting player.
    pub poster: PlayerId,
    /// Poster's username.
    pub poster_name: String,
    /// Username of the wanted player.
    pub target_name: String,
    /// Stated reason.
    pub reason: String,
    /// Reward paid to the hunter.
    pub amount: Credits,
    /// Posting fee kept by the board.
    pub fee: Credits,
    /// Lifecycle status.
    pub status: BountyStatus,
    /// When the bounty was posted.
    pub posted_at: DateTime<Utc>,
    /// When the bounty lapses.
    pub expires_at: DateTime<Utc>,
}

/// Posting request for a new bounty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBounty {
    /// Posting player.
    pub poster: PlayerId,
    /// Poster's username.
    pub poster_name: String,
    /// Username of the wanted player.
    pub target_name: String,
    /// Stated reason.
    pub reason: String,
    /// Reward offered.
    pub amount: Credits,
}

impl NewBounty {
    /// Posting fee for this amount.
    pub fn fee(&self) -> Credits {
        economy::bounty_fee(self.amount)
    }

    /// Amount plus the fixed posting fee.
    pub fn total_cost(&self) -> Credits {
        economy::bounty_total(self.amount)
    }
}

/// Entity returned by a settling operation together with the actor's new
/// durable balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement<T> {
    /// The settled entity.
    pub entity: T,
    /// Actor's balance after the operation.
    pub balance: Credits,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn auction(now: DateTime<Utc>) -> Auction {
        Auction {
            id: Uuid::new_v4(),
            seller: Uuid::new_v4(),
            seller_name: "seller".to_string(),
            item: AuctionItem {
                equipment_id: "laser-1".to_string(),
                name: "Pulse Laser".to_string(),
                quantity: 1,
            },
            starting_bid: 1_000,
            current_bid: 0,
            highest_bidder: None,
            buyout_price: None,
            end_time: now + Duration::hours(1),
            status: AuctionStatus::Active,
            bids: Vec::new(),
        }
    }

    fn bid(amount: Credits, at: DateTime<Utc>) -> BidRecord {
        BidRecord {
            bidder: Uuid::new_v4(),
            bidder_name: "bidder".to_string(),
            amount,
            placed_at: at,
        }
    }

    #[test]
    fn bids_raise_monotonically() {
        let now = Utc::now();
        let mut lot = auction(now);
        assert_eq!(lot.minimum_bid(), 1_000);
        lot.record_bid(bid(1_000, now)).unwrap();
        assert_eq!(lot.minimum_bid(), 1_050);
        assert!(lot.record_bid(bid(1_049, now)).is_err());
        lot.record_bid(bid(1_050, now)).unwrap();
        assert_eq!(lot.current_bid, 1_050);
        assert!(lot
            .bids
            .windows(2)
            .all(|pair| pair[0].amount <= pair[1].amount));
    }

    #[test]
    fn closed_auction_rejects_bids() {
        let now = Utc::now();
        let mut lot = auction(now);
        assert!(lot.record_bid(bid(1_000, now + Duration::hours(2))).is_err());
        lot.status = AuctionStatus::Sold;
        assert!(lot.record_bid(bid(5_000, now)).is_err());
    }

    #[test]
    fn cancel_only_by_seller_before_bids() {
        let now = Utc::now();
        let mut lot = auction(now);
        let seller = lot.seller;
        assert!(lot.can_cancel(seller));
        assert!(!lot.can_cancel(Uuid::new_v4()));
        lot.record_bid(bid(1_000, now)).unwrap();
        assert!(!lot.can_cancel(seller));
    }

    #[test]
    fn contract_roles() {
        let now = Utc::now();
        let poster = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut contract = Contract {
            id: Uuid::new_v4(),
            poster,
            poster_name: "poster".to_string(),
            target: "Deliver ore".to_string(),
            reward: 10_000,
            status: ContractStatus::Open,
            claimant: None,
            posted_at: now,
            expires_at: now + Duration::hours(72),
        };
        assert!(!contract.can_claim(poster));
        assert!(contract.can_claim(other));
        assert!(contract.can_cancel(poster));

        contract.status = ContractStatus::Claimed;
        contract.claimant = Some(other);
        assert!(contract.can_complete(other));
        assert!(!contract.can_complete(poster));
        assert!(!contract.can_cancel(poster));
    }
}
