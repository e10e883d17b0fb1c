//! Option declarations and values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::RiggingError;

/// The value an option takes once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Switch(bool),
    Choice(String),
}

impl OptionValue {
    /// Switches are truthy when on. Choices are truthy unless they select `none`.
    pub fn is_truthy(&self) -> bool {
        match self {
            OptionValue::Switch(on) => *on,
            OptionValue::Choice(value) => value != "none",
        }
    }

    pub fn as_switch(&self) -> Option<bool> {
        match self {
            OptionValue::Switch(on) => Some(*on),
            OptionValue::Choice(_) => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Switch(on) => write!(f, "{}", on),
            OptionValue::Choice(value) => f.write_str(value),
        }
    }
}

/// What values an option accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "choices", rename_all = "lowercase")]
pub enum OptionKind {
    /// A boolean `--with` / `--without` toggle.
    Switch,
    /// One of a fixed set of string values.
    Choice(Vec<String>),
}

/// A user-toggleable build option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionDecl {
    pub id: String,
    pub kind: OptionKind,
    pub default: OptionValue,
    pub description: String,
}

impl OptionDecl {
    /// A switch option with the given default.
    pub fn switch(id: impl Into<String>, default: bool) -> Self {
        OptionDecl {
            id: id.into(),
            kind: OptionKind::Switch,
            default: OptionValue::Switch(default),
            description: String::new(),
        }
    }

    /// A choice option; the default must be one of `choices`.
    pub fn choice(
        id: impl Into<String>,
        choices: impl IntoIterator<Item = impl Into<String>>,
        default: impl Into<String>,
    ) -> Self {
        OptionDecl {
            id: id.into(),
            kind: OptionKind::Choice(choices.into_iter().map(Into::into).collect()),
            default: OptionValue::Choice(default.into()),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_switch(&self) -> bool {
        matches!(self.kind, OptionKind::Switch)
    }

    /// Parse a raw request value for this option.
    pub fn parse_value(&self, raw: &str) -> Result<OptionValue, RiggingError> {
        match &self.kind {
            OptionKind::Switch => parse_switch(raw)
                .map(OptionValue::Switch)
                .ok_or_else(|| RiggingError::InvalidOptionValue {
                    option: self.id.clone(),
                    value: raw.to_string(),
                    expected: "a boolean (true/false, on/off, yes/no)".to_string(),
                }),
            OptionKind::Choice(choices) => {
                if choices.iter().any(|c| c == raw) {
                    Ok(OptionValue::Choice(raw.to_string()))
                } else {
                    Err(RiggingError::InvalidOptionValue {
                        option: self.id.clone(),
                        value: raw.to_string(),
                        expected: format!("one of: {}", choices.join(", ")),
                    })
                }
            }
        }
    }

    /// Whether `value` is acceptable for this option.
    pub fn accepts(&self, value: &str) -> bool {
        self.parse_value(value).is_ok()
    }
}

fn parse_switch(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}
