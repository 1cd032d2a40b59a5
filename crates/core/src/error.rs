//! Error taxonomy shared by the engine and the capability interfaces.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Credits;

/// Failure reported by an external store or manager.
///
/// These are remote failures: the transition function never produces them
/// itself, it only receives them inside command results.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum StoreError {
    /// The referenced entity does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Entity kind, e.g. `player` or `auction`.
        kind: String,
        /// Identifier that failed to resolve.
        id: String,
    },
    /// The durable balance could not cover the operation.
    #[error("insufficient funds: need {needed} credits, have {available}")]
    InsufficientFunds {
        /// Credits the operation required.
        needed: Credits,
        /// Credits actually available.
        available: Credits,
    },
    /// The manager refused the operation under its own rules.
    #[error("rejected: {0}")]
    Rejected(String),
    /// The write did not reach durable storage.
    #[error("persistence failure: {0}")]
    Persistence(String),
    /// The subsystem could not be reached.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Convenience constructor for [`StoreError::NotFound`].
    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        StoreError::NotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`StoreError::Rejected`].
    pub fn rejected(reason: impl Into<String>) -> Self {
        StoreError::Rejected(reason.into())
    }
}

/// Local validation failure, raised before any command is scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Balance below the cost of the action.
    #[error("Insufficient credits: need {needed}, have {available}")]
    InsufficientCredits {
        /// Credits the action costs.
        needed: Credits,
        /// Credits the player holds.
        available: Credits,
    },
    /// Gauge already at its maximum.
    #[error("{0} is already full")]
    AlreadyFull(&'static str),
    /// Input field outside its allowed range.
    #[error("{field}: {reason}")]
    InvalidField {
        /// Field label as shown on the form.
        field: &'static str,
        /// What is wrong with the value.
        reason: String,
    },
    /// Referenced entity is not loaded.
    #[error("{0} not found")]
    NotFound(String),
    /// Action not allowed in the entity's current state.
    #[error("{0}")]
    IllegalState(String),
    /// Same action already in flight.
    #[error("Still processing the previous {0} request")]
    Busy(&'static str),
}

impl ValidationError {
    pub(crate) fn field(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn illegal(reason: impl Into<String>) -> Self {
        ValidationError::IllegalState(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_user_facing() {
        let err = StoreError::not_found("auction", "abc");
        assert_eq!(err.to_string(), "auction abc not found");

        let err = ValidationError::InsufficientCredits {
            needed: 500,
            available: 120,
        };
        assert_eq!(err.to_string(), "Insufficient credits: need 500, have 120");

        let err = ValidationError::AlreadyFull("Fuel tank");
        assert_eq!(err.to_string(), "Fuel tank is already full");
    }
}
