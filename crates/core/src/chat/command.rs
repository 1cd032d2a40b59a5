/// Prefix that turns a line into a command.
const COMMAND_PREFIX: char = '/';

/// Lines shown by `/help`.
pub const HELP_LINES: &[&str] = &[
    "/help                 show this list",
    "/dm <name> [message]  message one player, or switch the direct channel to them",
    "/me <action>          describe an action",
    "/clear                clear the scrollback",
    "Tab cycles channels: Global, System, Faction, Direct, Trade",
];

/// Parsed composer submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    /// Plain text for the active channel.
    Say(String),
    /// Reserved-prefix command.
    Command(ChatCommand),
}

/// Recognised chat commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// `/help`
    Help,
    /// `/clear`
    Clear,
    /// `/me <action>`
    Me(String),
    /// `/dm <name> [message]`
    Dm {
        /// Username to resolve.
        recipient: String,
        /// Message to send now, if any.
        body: Option<String>,
    },
    /// Known command with missing arguments; carries the usage line.
    Usage(&'static str),
    /// Anything else after the prefix.
    Unknown(String),
}

/// Split a sanitised line into chat text or a command.
pub fn parse_line(text: &str) -> ChatInput {
    let Some(rest) = text.strip_prefix(COMMAND_PREFIX) else {
        return ChatInput::Say(text.to_string());
    };
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    let command = match name.to_ascii_lowercase().as_str() {
        "help" | "?" => ChatCommand::Help,
        "clear" => ChatCommand::Clear,
        "me" if args.is_empty() => ChatCommand::Usage("/me <action>"),
        "me" => ChatCommand::Me(args.to_string()),
        "dm" | "msg" | "w" => {
            let (recipient, body) = match args.split_once(char::is_whitespace) {
                Some((recipient, body)) => (recipient, Some(body.trim())),
                None => (args, None),
            };
            if recipient.is_empty() {
                ChatCommand::Usage("/dm <name> [message]")
            } else {
                ChatCommand::Dm {
                    recipient: recipient.to_string(),
                    body: body.filter(|b| !b.is_empty()).map(str::to_string),
                }
            }
        }
        other => ChatCommand::Unknown(other.to_string()),
    };
    ChatInput::Command(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_said() {
        assert_eq!(parse_line("hello there"), ChatInput::Say("hello there".into()));
    }

    #[test]
    fn dm_with_and_without_body() {
        assert_eq!(
            parse_line("/dm vega selling ore"),
            ChatInput::Command(ChatCommand::Dm {
                recipient: "vega".into(),
                body: Some("selling ore".into())
            })
        );
        assert_eq!(
            parse_line("/dm vega"),
            ChatInput::Command(ChatCommand::Dm {
                recipient: "vega".into(),
                body: None
            })
        );
        assert_eq!(
            parse_line("/dm"),
            ChatInput::Command(ChatCommand::Usage("/dm <name> [message]"))
        );
    }

    #[test]
    fn other_commands() {
        assert_eq!(parse_line("/HELP"), ChatInput::Command(ChatCommand::Help));
        assert_eq!(parse_line("/clear"), ChatInput::Command(ChatCommand::Clear));
        assert_eq!(
            parse_line("/me waves"),
            ChatInput::Command(ChatCommand::Me("waves".into()))
        );
        assert_eq!(
            parse_line("/me"),
            ChatInput::Command(ChatCommand::Usage("/me <action>"))
        );
        assert_eq!(
            parse_line("/dance now"),
            ChatInput::Command(ChatCommand::Unknown("dance".into()))
        );
    }
}
