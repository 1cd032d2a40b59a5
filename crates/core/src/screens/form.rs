//! Minimal text-entry form used by the create/post dialogs.

use crate::{error::ValidationError, models::Credits};

/// What a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Any printable text.
    Text,
    /// ASCII digits only.
    Number,
}

/// One labelled input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
    /// Label shown before the value.
    pub label: &'static str,
    /// Current text.
    pub value: String,
    /// Accepted characters.
    pub kind: FieldKind,
    /// Longest accepted value, in characters.
    pub max_len: usize,
    /// Blank is allowed.
    pub optional: bool,
}

impl TextField {
    /// Required text field.
    pub fn text(label: &'static str, max_len: usize) -> Self {
        Self {
            label,
            value: String::new(),
            kind: FieldKind::Text,
            max_len,
            optional: false,
        }
    }

    /// Required numeric field.
    pub fn number(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            kind: FieldKind::Number,
            max_len: 12,
            optional: false,
        }
    }

    /// Mark the field as optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Pre-fill the field.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Append a character if the field accepts it.
    pub fn push(&mut self, ch: char) -> bool {
        let accepted = match self.kind {
            FieldKind::Text => !ch.is_control(),
            FieldKind::Number => ch.is_ascii_digit(),
        };
        if !accepted || self.value.chars().count() >= self.max_len {
            return false;
        }
        self.value.push(ch);
        true
    }

    /// Remove the last character.
    pub fn backspace(&mut self) {
        self.value.pop();
    }

    /// Trimmed text; an error when required and blank.
    pub fn required_text(&self) -> Result<String, ValidationError> {
        let value = self.value.trim();
        if value.is_empty() {
            return Err(ValidationError::field(self.label, "is required"));
        }
        Ok(value.to_string())
    }

    /// Parsed number; `None` when optional and blank.
    pub fn number_value(&self) -> Result<Option<Credits>, ValidationError> {
        let value = self.value.trim();
        if value.is_empty() {
            return if self.optional {
                Ok(None)
            } else {
                Err(ValidationError::field(self.label, "is required"))
            };
        }
        value
            .parse::<Credits>()
            .map(Some)
            .map_err(|_| ValidationError::field(self.label, "must be a whole number"))
    }

    /// Parsed number for a required field.
    pub fn required_number(&self) -> Result<Credits, ValidationError> {
        self.number_value()?
            .ok_or_else(|| ValidationError::field(self.label, "is required"))
    }
}

/// Edit operation on the focused field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEdit {
    /// Focus the next field.
    Next,
    /// Focus the previous field.
    Prev,
    /// Type a character.
    Type(char),
    /// Delete a character.
    Erase,
}

/// Ordered fields with one focused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    /// Fields in display order.
    pub fields: Vec<TextField>,
    /// Index of the focused field.
    pub focus: usize,
}

impl Form {
    /// Form over `fields`, focusing the first.
    pub fn new(fields: Vec<TextField>) -> Self {
        Self { fields, focus: 0 }
    }

    /// Apply an edit.
    pub fn apply(&mut self, edit: FormEdit) {
        let count = self.fields.len().max(1);
        match edit {
            FormEdit::Next => self.focus = (self.focus + 1) % count,
            FormEdit::Prev => self.focus = (self.focus + count - 1) % count,
            FormEdit::Type(ch) => {
                if let Some(field) = self.fields.get_mut(self.focus) {
                    field.push(ch);
                }
            }
            FormEdit::Erase => {
                if let Some(field) = self.fields.get_mut(self.focus) {
                    field.backspace();
                }
            }
        }
    }

    /// Field by index.
    pub fn field(&self, index: usize) -> Option<&TextField> {
        self.fields.get(index)
    }
}
