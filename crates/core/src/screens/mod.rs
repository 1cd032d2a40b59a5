//! Per-screen sub-states, key maps and transition rules.
//!
//! Each screen module exposes a pure `keymap` from keys to intents, a
//! `handle` that validates an intent and returns at most one command, and an
//! `on_outcome` that folds a command result back into the session.

pub mod chat;
pub mod form;
pub mod marketplace;
pub mod missions;
pub mod outfitter;
pub mod services;
pub mod station;

pub use chat::{ChatIntent, ChatOutcome};
pub use form::{FieldKind, Form, FormEdit, TextField};
pub use marketplace::{
    AuctionDraft, BountyDraft, ContractDraft, EscrowFailure, HistoryEntry, MarketForm,
    MarketIntent, MarketMode, MarketOutcome, MarketState, MarketTab, Posted,
};
pub use missions::{MissionBoardView, MissionIntent, MissionOutcome, MissionState};
pub use outfitter::{
    OutfitterData, OutfitterIntent, OutfitterMode, OutfitterOutcome, OutfitterState,
    OutfitterView, SlotChange,
};
pub use services::{ServiceFailure, ServiceKind, ServiceOutcome, ServicesIntent, ServicesState};
pub use station::{StationIntent, StationState};
