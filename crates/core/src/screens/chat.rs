//! Chat screen: composer input, slash commands and outgoing routing.

use tracing::{debug, warn};

use crate::{
    chat::{
        parse_line, Channel, ChatCommand, ChatEntry, ChatInput, ChatKind, ChatState, ChatTarget,
        RouteError, HELP_LINES,
    },
    engine::{Command, Intent, Key, OutgoingChat, SessionContext},
};

/// Chat actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatIntent {
    /// Open the composer.
    Compose,
    /// Open the composer with `/` typed.
    ComposeCommand,
    /// Type into the composer.
    Type(char),
    /// Delete the last character.
    Erase,
    /// Close the composer without sending.
    Cancel,
    /// Submit the composer line.
    Submit,
    /// Switch to the next channel.
    NextChannel,
    /// Treat `text` as a submitted line.
    Line(String),
}

/// Translate a key on the chat screen.
pub fn keymap(chat: &ChatState, key: Key) -> Option<Intent> {
    let intent = if chat.composer.is_composing() {
        match key {
            Key::Char(ch) => ChatIntent::Type(ch),
            Key::Backspace => ChatIntent::Erase,
            Key::Enter => ChatIntent::Submit,
            Key::Esc => ChatIntent::Cancel,
            Key::Tab => ChatIntent::NextChannel,
            _ => return None,
        }
    } else {
        match key {
            Key::Enter | Key::Char('i') | Key::Char('t') => ChatIntent::Compose,
            Key::Char('/') => ChatIntent::ComposeCommand,
            Key::Tab => ChatIntent::NextChannel,
            Key::Esc => return Some(Intent::Back),
            _ => return None,
        }
    };
    Some(Intent::Chat(intent))
}

pub(crate) fn handle(ctx: &mut SessionContext, intent: ChatIntent) -> Option<Command> {
    match intent {
        ChatIntent::Compose => {
            ctx.chat.composer.begin();
            None
        }
        ChatIntent::ComposeCommand => {
            ctx.chat.composer.begin_with("/");
            None
        }
        ChatIntent::Type(ch) => {
            ctx.chat.composer.push(ch);
            None
        }
        ChatIntent::Erase => {
            ctx.chat.composer.backspace();
            None
        }
        ChatIntent::Cancel => {
            ctx.chat.composer.cancel();
            None
        }
        ChatIntent::NextChannel => {
            ctx.chat.cycle_channel();
            None
        }
        ChatIntent::Submit => {
            let line = ctx.chat.composer.submit()?;
            submit_line(ctx, &line)
        }
        ChatIntent::Line(text) => {
            let line = crate::chat::sanitize(&text);
            if line.is_empty() {
                return None;
            }
            submit_line(ctx, &line)
        }
    }
}

fn submit_line(ctx: &mut SessionContext, line: &str) -> Option<Command> {
    let now = ctx.now;
    match parse_line(line) {
        ChatInput::Say(text) => send(ctx, ChatKind::Say, text, None),
        ChatInput::Command(ChatCommand::Me(action)) => send(ctx, ChatKind::Emote, action, None),
        ChatInput::Command(ChatCommand::Help) => {
            for help in HELP_LINES {
                ctx.chat.notify(*help, now);
            }
            None
        }
        ChatInput::Command(ChatCommand::Clear) => {
            ctx.chat.clear();
            None
        }
        ChatInput::Command(ChatCommand::Dm { recipient, body }) => {
            ctx.chat.dm_target = Some(recipient.clone());
            ctx.chat.channel = Channel::Direct;
            match body {
                Some(body) => send(ctx, ChatKind::Say, body, Some(recipient)),
                None => {
                    ctx.chat
                        .notify(format!("Direct messages now go to {recipient}"), now);
                    None
                }
            }
        }
        ChatInput::Command(ChatCommand::Usage(usage)) => {
            ctx.chat.notify(format!("Usage: {usage}"), now);
            None
        }
        ChatInput::Command(ChatCommand::Unknown(name)) => {
            ctx.chat
                .notify(format!("Unknown command /{name}. Type /help for a list."), now);
            None
        }
    }
}

fn send(
    ctx: &mut SessionContext,
    kind: ChatKind,
    body: String,
    recipient: Option<String>,
) -> Option<Command> {
    let now = ctx.now;
    let channel = ctx.chat.channel;
    let target = match channel {
        Channel::Global | Channel::Trade => ChatTarget::Everyone,
        Channel::System => ChatTarget::System(ctx.player.system_id),
        Channel::Faction => match &ctx.player.faction {
            Some(faction) => ChatTarget::Faction(faction.clone()),
            None => {
                ctx.chat
                    .notify("You are not a member of any faction.", now);
                return None;
            }
        },
        Channel::Direct => match recipient.or_else(|| ctx.chat.dm_target.clone()) {
            Some(name) => ChatTarget::User(name),
            None => {
                ctx.chat
                    .notify("No direct recipient. Use /dm <name> first.", now);
                return None;
            }
        },
    };
    let recipient_name = match &target {
        ChatTarget::User(name) => Some(name.clone()),
        _ => None,
    };
    let entry = ChatEntry {
        channel,
        kind,
        sender: Some(ctx.player.id),
        sender_name: ctx.player.username.clone(),
        recipient_name,
        body,
        sent_at: now,
    };
    ctx.chat.push(entry.clone());
    debug!(channel = %channel, ?target, "Chat line queued");
    Some(Command::SendChat(OutgoingChat {
        sender: ctx.player.id,
        entry,
        target,
    }))
}

/// Result of routing and delivering one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOutcome {
    /// Channel the line was sent on.
    pub channel: Channel,
    /// Number of recipients reached.
    pub result: Result<usize, RouteError>,
}

pub(crate) fn on_outcome(ctx: &mut SessionContext, outcome: ChatOutcome) {
    let now = ctx.now;
    match outcome.result {
        Ok(count) => debug!(channel = %outcome.channel, count, "Chat delivered"),
        Err(RouteError::UnknownRecipient(name)) => {
            ctx.chat.push(ChatEntry::system(
                outcome.channel,
                format!("No player named '{name}'. Message not delivered."),
                now,
            ));
        }
        Err(RouteError::SelfAddressed) => {
            ctx.chat.push(ChatEntry::system(
                outcome.channel,
                "You cannot send a direct message to yourself.",
                now,
            ));
        }
        Err(err) => {
            warn!(channel = %outcome.channel, %err, "Chat delivery failed");
            ctx.chat.push(ChatEntry::system(
                outcome.channel,
                format!("Message not delivered: {err}"),
                now,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composing_captures_letters_that_are_shortcuts_when_idle() {
        let mut chat = ChatState::default();
        assert_eq!(
            keymap(&chat, Key::Char('t')),
            Some(Intent::Chat(ChatIntent::Compose))
        );
        chat.composer.begin();
        assert_eq!(
            keymap(&chat, Key::Char('t')),
            Some(Intent::Chat(ChatIntent::Type('t')))
        );
        assert_eq!(
            keymap(&chat, Key::Esc),
            Some(Intent::Chat(ChatIntent::Cancel))
        );
    }

    #[test]
    fn idle_escape_leaves_the_screen() {
        let chat = ChatState::default();
        assert_eq!(keymap(&chat, Key::Esc), Some(Intent::Back));
        assert_eq!(
            keymap(&chat, Key::Char('/')),
            Some(Intent::Chat(ChatIntent::ComposeCommand))
        );
    }
}
