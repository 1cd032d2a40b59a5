use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use tokio::{spawn, sync::mpsc};
use tracing::{info, warn};

use super::{
    executor::Executor,
    message::Message,
    state::{SessionSettings, SessionState},
    transition::update,
    Command,
};
use crate::{capability::Capabilities, models::ShipCatalog};

const RESULT_QUEUE: usize = 64;

/// Drives one session: applies messages in order on the caller's task and
/// runs scheduled commands on the tokio runtime.
pub struct SessionRuntime {
    state: SessionState,
    executor: Arc<Executor>,
    tx: mpsc::Sender<Message>,
    rx: mpsc::Receiver<Message>,
    outstanding: usize,
}

impl SessionRuntime {
    /// Runtime over an initial state.
    pub fn new(state: SessionState, caps: Capabilities) -> Self {
        let (tx, rx) = mpsc::channel(RESULT_QUEUE);
        Self {
            state,
            executor: Arc::new(Executor::new(caps)),
            tx,
            rx,
            outstanding: 0,
        }
    }

    /// Current session state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Consume the runtime, keeping the state.
    pub fn into_state(self) -> SessionState {
        self.state
    }

    /// Commands spawned whose result has not been received yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Apply one message. Returns true when it scheduled a command.
    pub fn dispatch(&mut self, message: Message) -> bool {
        match update(&mut self.state, message) {
            Some(command) => {
                self.spawn(command);
                true
            }
            None => false,
        }
    }

    fn spawn(&mut self, command: Command) {
        self.outstanding += 1;
        let executor = self.executor.clone();
        let sender = self.tx.clone();
        spawn(async move {
            let message = executor.execute(command).await;
            if sender.send(message).await.is_err() {
                warn!("Session closed before a command result arrived");
            }
        });
    }

    /// Wait for the next command result without applying it.
    pub async fn recv_result(&mut self) -> Option<Message> {
        let message = self.rx.recv().await?;
        self.outstanding = self.outstanding.saturating_sub(1);
        Some(message)
    }

    /// Apply results, and anything they schedule, until nothing is
    /// outstanding.
    pub async fn settle(&mut self) {
        while self.outstanding > 0 {
            match self.recv_result().await {
                Some(message) => {
                    self.dispatch(message);
                }
                None => break,
            }
        }
    }
}

/// Build the opening session for `username` from the stores.
pub async fn bootstrap(
    caps: &Capabilities,
    catalog: &ShipCatalog,
    username: &str,
    settings: SessionSettings,
) -> Result<SessionState> {
    let player_id = caps
        .directory
        .resolve_username(username)
        .await
        .with_context(|| format!("resolve pilot {username}"))?
        .ok_or_else(|| anyhow!("no pilot named {username}"))?;
    let player = caps
        .players
        .get(player_id)
        .await
        .context("load pilot record")?;
    let ship = caps
        .ships
        .get(player.ship_id)
        .await
        .context("load ship record")?;
    let ship_type = catalog
        .get(&ship.ship_type)
        .cloned()
        .ok_or_else(|| anyhow!("unknown ship type {}", ship.ship_type))?;
    info!(player = %player.id, ship = %ship.name, credits = player.credits, "Session bootstrapped");
    Ok(SessionState::new(player, ship, ship_type, settings, Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        capability::{MemoryWorld, WorldSnapshot},
        engine::ScreenKind,
    };

    async fn runtime() -> (Arc<MemoryWorld>, SessionRuntime) {
        let world = Arc::new(MemoryWorld::new(WorldSnapshot::demo("pilot", Utc::now())));
        let caps = Capabilities::from_world(world.clone());
        let state = bootstrap(&caps, &world.ship_catalog(), "pilot", SessionSettings::default())
            .await
            .unwrap();
        (world, SessionRuntime::new(state, caps))
    }

    #[tokio::test]
    async fn bootstrap_rejects_unknown_pilots() {
        let world = Arc::new(MemoryWorld::new(WorldSnapshot::demo("pilot", Utc::now())));
        let caps = Capabilities::from_world(world.clone());
        let err = bootstrap(&caps, &world.ship_catalog(), "ghost", SessionSettings::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[tokio::test]
    async fn opening_a_screen_loads_it() {
        let (_world, mut runtime) = runtime().await;
        assert!(runtime.dispatch(Message::Navigate(ScreenKind::Outfitter)));
        assert_eq!(runtime.outstanding(), 1);
        runtime.settle().await;
        assert_eq!(runtime.outstanding(), 0);
        let shop = runtime.state().outfitter().unwrap();
        assert!(!shop.catalog.is_empty());
        assert!(!shop.loadouts.is_empty());
        assert!(runtime.state().ctx.in_flight.is_empty());
    }
}
