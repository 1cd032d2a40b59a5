//! Fixed prices and fee policies.
//!
//! Everything here is a pure function of its inputs; the fee and increment
//! policies are not configurable per call.

use crate::models::Credits;

/// Price of one unit of fuel.
pub const FUEL_PRICE_PER_UNIT: Credits = 10;
/// Price of one point of hull repair.
pub const HULL_PRICE_PER_UNIT: Credits = 50;
/// Price of one point of shield recharge.
pub const SHIELD_PRICE_PER_UNIT: Credits = 10;

/// Minimum raise over the current bid, in percent.
pub const BID_INCREMENT_PERCENT: Credits = 5;
/// Posting fee charged on top of a bounty, in percent.
pub const BOUNTY_FEE_PERCENT: Credits = 10;
/// Smallest bounty that may be posted.
pub const MIN_BOUNTY: Credits = 5_000;
/// Smallest contract reward that may be posted.
pub const MIN_CONTRACT_REWARD: Credits = 1_000;
/// Share of the list price refunded when equipment is sold back.
pub const RESALE_PERCENT: Credits = 50;
/// Longest auction a seller may list.
pub const MAX_AUCTION_HOURS: i64 = 72;
/// Lifetime of contracts and bounties before the manager expires them.
pub const POSTING_LIFETIME_HOURS: i64 = 72;

/// Units needed to top a gauge up and what they cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    /// Units to add.
    pub units: u32,
    /// Total price of those units.
    pub cost: Credits,
}

impl Quote {
    /// Combine two quotes into one bill.
    pub fn plus(self, other: Quote) -> Quote {
        Quote {
            units: self.units + other.units,
            cost: self.cost + other.cost,
        }
    }
}

/// Quote for filling `current` up to `max`; `None` when already full.
pub fn refill_quote(current: u32, max: u32, unit_price: Credits) -> Option<Quote> {
    if current >= max {
        return None;
    }
    let units = max - current;
    Some(Quote {
        units,
        cost: Credits::from(units) * unit_price,
    })
}

/// Smallest acceptable bid: `max(starting, current * 1.05)`, truncated.
pub fn next_bid(starting_bid: Credits, current_bid: Credits) -> Credits {
    let raised = current_bid.saturating_mul(100 + BID_INCREMENT_PERCENT) / 100;
    starting_bid.max(raised)
}

/// Posting fee for a bounty of `amount`, truncated.
pub fn bounty_fee(amount: Credits) -> Credits {
    amount.saturating_mul(BOUNTY_FEE_PERCENT) / 100
}

/// Total charged when posting a bounty of `amount`.
pub fn bounty_total(amount: Credits) -> Credits {
    amount.saturating_add(bounty_fee(amount))
}

/// Credits paid for selling `quantity` units listed at `price`.
pub fn resale_value(price: Credits, quantity: u32) -> Credits {
    price.saturating_mul(Credits::from(quantity)).saturating_mul(RESALE_PERCENT) / 100
}

/// Format a credit amount with thousands separators.
pub fn format_credits(value: Credits) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refill_quote_is_none_when_full() {
        assert_eq!(refill_quote(100, 100, FUEL_PRICE_PER_UNIT), None);
        assert_eq!(refill_quote(120, 100, FUEL_PRICE_PER_UNIT), None);
        assert_eq!(
            refill_quote(50, 100, FUEL_PRICE_PER_UNIT),
            Some(Quote {
                units: 50,
                cost: 500
            })
        );
        assert_eq!(
            refill_quote(90, 100, HULL_PRICE_PER_UNIT).map(|q| q.cost),
            Some(500)
        );
    }

    #[test]
    fn next_bid_uses_starting_bid_until_first_bid() {
        assert_eq!(next_bid(1_000, 0), 1_000);
        assert_eq!(next_bid(1_000, 1_000), 1_050);
        assert_eq!(next_bid(1_000, 1_999), 2_098);
        assert_eq!(next_bid(5_000, 1_000), 5_000);
    }

    #[test]
    fn bounty_fee_truncates() {
        assert_eq!(bounty_fee(5_000), 500);
        assert_eq!(bounty_total(5_000), 5_500);
        assert_eq!(bounty_fee(5_005), 500);
        assert_eq!(bounty_total(5_009), 5_509);
    }

    #[test]
    fn resale_is_half_price() {
        assert_eq!(resale_value(1_001, 2), 1_001);
        assert_eq!(resale_value(999, 1), 499);
    }

    #[test]
    fn credits_are_grouped() {
        assert_eq!(format_credits(0), "0");
        assert_eq!(format_credits(999), "999");
        assert_eq!(format_credits(5_000), "5,000");
        assert_eq!(format_credits(1_234_567), "1,234,567");
        assert_eq!(format_credits(-4_500), "-4,500");
    }
}
