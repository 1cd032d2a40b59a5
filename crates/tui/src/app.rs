use std::{io, sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use spacetrader_core::{Intent, Key, MemoryWorld, Message, SessionRuntime, SnapshotFile};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::render::{self, Theme};

enum AppEvent {
    Input(Event),
    Tick,
}

pub struct SpaceTraderApp {
    runtime: SessionRuntime,
    world: Arc<MemoryWorld>,
    store: SnapshotFile,
    tick_rate: Duration,
    theme: Theme,
}

impl SpaceTraderApp {
    pub fn new(
        runtime: SessionRuntime,
        world: Arc<MemoryWorld>,
        store: SnapshotFile,
        tick_rate: Duration,
    ) -> Self {
        Self {
            runtime,
            world,
            store,
            tick_rate,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx, self.tick_rate);

        let outcome = self.event_loop(&mut terminal, &mut event_rx).await;

        restore_terminal(&mut terminal)?;
        self.persist_world();
        outcome
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        event_rx: &mut mpsc::Receiver<AppEvent>,
    ) -> Result<()> {
        loop {
            terminal.draw(|frame| render::draw(frame, self.runtime.state(), &self.theme))?;
            if self.runtime.state().should_quit {
                break;
            }

            tokio::select! {
                maybe_event = event_rx.recv() => {
                    if !self.process_app_event(maybe_event) {
                        break;
                    }
                }
                Some(result) = self.runtime.recv_result() => {
                    self.runtime.dispatch(result);
                }
            }
        }
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) => {
                if key.kind != KeyEventKind::Release {
                    self.handle_key(key);
                }
                true
            }
            Some(AppEvent::Input(_)) => true,
            Some(AppEvent::Tick) => {
                self.handle_tick();
                true
            }
            None => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.runtime.dispatch(Message::Intent(Intent::Quit));
            return;
        }
        match map_key(key) {
            Some(key) => {
                self.runtime.dispatch(Message::Key(key));
            }
            None => debug!(?key.code, "Unmapped key"),
        }
    }

    fn handle_tick(&mut self) {
        self.runtime.dispatch(Message::Tick(Utc::now()));
        let player = self.runtime.state().ctx.player.id;
        for entry in self.world.take_inbox(player) {
            self.runtime.dispatch(Message::ChatReceived(entry));
        }
    }

    fn persist_world(&self) {
        match self.store.persist(&self.world.snapshot()) {
            Ok(()) => info!(path = %self.store.path().display(), "World saved"),
            Err(err) => error!(?err, "Failed to save world"),
        }
    }
}

fn map_key(key: KeyEvent) -> Option<Key> {
    let mapped = match key.code {
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Esc,
        KeyCode::Tab => Key::Tab,
        KeyCode::BackTab => Key::BackTab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Char(ch) => Key::Char(ch),
        _ => return None,
    };
    Some(mapped)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>, tick_rate: Duration) {
    thread::spawn(move || loop {
        match event::poll(tick_rate) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossterm_keys_map_to_session_keys() {
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert_eq!(map_key(key(KeyCode::Char('b'))), Some(Key::Char('b')));
        assert_eq!(map_key(key(KeyCode::BackTab)), Some(Key::BackTab));
        assert_eq!(map_key(key(KeyCode::F(5))), None);
    }
}
