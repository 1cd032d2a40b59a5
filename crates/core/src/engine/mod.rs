//! Message-driven session engine.
//!
//! A single task owns the [`SessionState`] and feeds it [`Message`]s one at
//! a time through [`transition`]. Anything that touches a store is returned
//! as a [`Command`], run by the [`Executor`] off that task, and comes back as
//! another message.

mod command;
mod executor;
mod message;
mod runtime;
mod state;
mod transition;

pub use command::{ActionKey, Command, Compensation, EscrowPlan, OutgoingChat, Posting, ServicePlan};
pub use executor::Executor;
pub use message::{Intent, Key, Message, Outcome};
pub use runtime::{bootstrap, SessionRuntime};
pub use state::{
    Notice, NoticeLevel, Screen, ScreenKind, SessionContext, SessionSettings, SessionState,
};
pub use transition::{transition, update};
