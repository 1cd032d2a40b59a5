use once_cell::sync::Lazy;
use regex::Regex;

/// Longest message the composer accepts, in characters.
pub const MAX_MESSAGE_LEN: usize = 200;

const ESC: char = '\u{1b}';

static ANSI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b(?:\[[0-?]*[ -/]*[@-~]|\][^\x07\x1b]*(?:\x07|\x1b\\)?|[@-_])")
        .expect("failed to compile ANSI escape regex")
});

/// Message input line: `Idle -> Composing -> Idle`.
///
/// `ESC` is accepted while composing so a pasted escape sequence survives
/// intact until [`sanitize`] removes it as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Composer {
    /// Not accepting text.
    #[default]
    Idle,
    /// Accepting text into the buffer.
    Composing {
        /// Raw text typed so far.
        buffer: String,
    },
}

impl Composer {
    /// Start composing with an empty buffer.
    pub fn begin(&mut self) {
        if !self.is_composing() {
            *self = Composer::Composing {
                buffer: String::new(),
            };
        }
    }

    /// Start composing with `text` already typed, e.g. `/` or `/dm name `.
    pub fn begin_with(&mut self, text: &str) {
        *self = Composer::Composing {
            buffer: String::new(),
        };
        for ch in text.chars() {
            self.push(ch);
        }
    }

    /// Whether the composer is accepting text.
    pub fn is_composing(&self) -> bool {
        matches!(self, Composer::Composing { .. })
    }

    /// Current buffer, empty when idle.
    pub fn buffer(&self) -> &str {
        match self {
            Composer::Idle => "",
            Composer::Composing { buffer } => buffer,
        }
    }

    /// Append a character. Returns false when it was refused.
    pub fn push(&mut self, ch: char) -> bool {
        let Composer::Composing { buffer } = self else {
            return false;
        };
        if ch.is_control() && ch != ESC {
            return false;
        }
        if buffer.chars().count() >= MAX_MESSAGE_LEN {
            return false;
        }
        buffer.push(ch);
        true
    }

    /// Remove the last character.
    pub fn backspace(&mut self) {
        if let Composer::Composing { buffer } = self {
            buffer.pop();
        }
    }

    /// Drop the buffer and return to idle.
    pub fn cancel(&mut self) {
        *self = Composer::Idle;
    }

    /// Return to idle, yielding the sanitised text if anything remains.
    pub fn submit(&mut self) -> Option<String> {
        let raw = match std::mem::take(self) {
            Composer::Idle => return None,
            Composer::Composing { buffer } => buffer,
        };
        let text = sanitize(&raw);
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Remove ANSI escape sequences, then any leftover control characters.
pub fn sanitize(raw: &str) -> String {
    let stripped = ANSI_RE.replace_all(raw, "");
    stripped
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}
