#![warn(clippy::all, missing_docs)]

//! Core session engine for the spacetrader terminal client.
//!
//! This crate hosts the domain models, economy rules, capability
//! interfaces and their in-memory reference world, the chat router, the
//! per-screen transition rules and the message-driven engine used by the
//! terminal UI and any future frontends.

pub mod capability;
pub mod chat;
pub mod config;
pub mod economy;
pub mod engine;
pub mod error;
pub mod models;
pub mod screens;

pub use capability::{Capabilities, MemoryWorld, SnapshotFile, StoreResult, WorldSnapshot};
pub use config::AppConfig;
pub use engine::{
    bootstrap, transition, Command, Executor, Intent, Key, Message, Outcome, ScreenKind,
    SessionRuntime, SessionSettings, SessionState,
};
pub use error::{StoreError, ValidationError};
