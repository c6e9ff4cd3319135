use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    domain::{CommandSet, Vocabulary},
    error::ControlError,
};

pub const SET_QUERY_PREFIX: &str = "set";

/// Fixed-width `'0'`/`'1'` rendering of a [`CommandSet`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedCommand(String);

impl EncodedCommand {
    pub fn from_bits(bits: impl IntoIterator<Item = bool>) -> Self {
        Self(
            bits.into_iter()
                .map(|bit| if bit { '1' } else { '0' })
                .collect(),
        )
    }

    /// Validates a bit pattern against the width of `vocabulary`.
    pub fn parse(vocabulary: Vocabulary, bits: &str) -> Result<Self, ControlError> {
        if bits.len() != vocabulary.width() {
            return Err(ControlError::invalid_encoding(
                bits,
                format!(
                    "expected {} bits for the {} vocabulary, got {}",
                    vocabulary.width(),
                    vocabulary.as_str(),
                    bits.len()
                ),
            ));
        }
        if let Some(bad) = bits.chars().find(|ch| *ch != '0' && *ch != '1') {
            return Err(ControlError::invalid_encoding(
                bits,
                format!("unexpected character '{bad}'"),
            ));
        }
        Ok(Self(bits.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn width(&self) -> usize {
        self.0.len()
    }

    pub fn bit(&self, index: usize) -> Option<bool> {
        self.0.as_bytes().get(index).map(|byte| *byte == b'1')
    }

    /// Rebuilds the command state this pattern describes.
    pub fn to_command_set(&self, vocabulary: Vocabulary) -> Result<CommandSet, ControlError> {
        let checked = Self::parse(vocabulary, &self.0)?;
        let mut set = CommandSet::new(vocabulary);
        for (index, command) in vocabulary.commands().iter().enumerate() {
            set.set(*command, checked.bit(index).unwrap_or(false))?;
        }
        Ok(set)
    }
}

impl fmt::Display for EncodedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Query-string convention expected by the control endpoint.
///
/// The two conventions are not negotiated; the receiver accepts exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointMode {
    /// `?00010000`
    Bare,
    /// `?set00010000`
    #[default]
    SetPrefixed,
}

impl EndpointMode {
    pub fn query(self, encoded: &EncodedCommand) -> String {
        match self {
            EndpointMode::Bare => encoded.as_str().to_string(),
            EndpointMode::SetPrefixed => format!("{SET_QUERY_PREFIX}{encoded}"),
        }
    }

    /// Extracts the bit pattern from a query written in this convention.
    pub fn bits_from_query(self, query: &str) -> Option<&str> {
        match self {
            EndpointMode::Bare => Some(query),
            EndpointMode::SetPrefixed => query.strip_prefix(SET_QUERY_PREFIX),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EndpointMode::Bare => "bare",
            EndpointMode::SetPrefixed => "set_prefixed",
        }
    }
}

impl FromStr for EndpointMode {
    type Err = ControlError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "bare" => Ok(EndpointMode::Bare),
            "set_prefixed" | "set" => Ok(EndpointMode::SetPrefixed),
            other => Err(ControlError::Config(format!(
                "unknown endpoint mode '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
