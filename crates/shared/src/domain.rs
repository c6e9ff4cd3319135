use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error::ControlError, protocol::EncodedCommand};

/// One boolean flag understood by the vehicle's control endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Forward,
    Reverse,
    Left,
    Right,
    TurretLeft,
    TurretRight,
    TurretElev,
    Fire,
    Ignition,
    Autonomy,
}

impl Command {
    pub const ALL: [Command; 10] = [
        Command::Forward,
        Command::Reverse,
        Command::Left,
        Command::Right,
        Command::TurretLeft,
        Command::TurretRight,
        Command::TurretElev,
        Command::Fire,
        Command::Ignition,
        Command::Autonomy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Command::Forward => "forward",
            Command::Reverse => "reverse",
            Command::Left => "left",
            Command::Right => "right",
            Command::TurretLeft => "turret_left",
            Command::TurretRight => "turret_right",
            Command::TurretElev => "turret_elev",
            Command::Fire => "fire",
            Command::Ignition => "ignition",
            Command::Autonomy => "autonomy",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = ControlError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|command| command.as_str() == name)
            .ok_or_else(|| ControlError::UnknownCommand(name.to_string()))
    }
}

const BASE_COMMANDS: [Command; 8] = [
    Command::Forward,
    Command::Reverse,
    Command::Left,
    Command::Right,
    Command::TurretLeft,
    Command::TurretRight,
    Command::TurretElev,
    Command::Fire,
];

/// Ordered command list agreed with the vehicle firmware.
///
/// The index of a command in [`Vocabulary::commands`] is its bit position in
/// every [`EncodedCommand`]. `Extended` appends `ignition` and `autonomy` to
/// `Base` so that base positions never move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vocabulary {
    Base,
    #[default]
    Extended,
}

impl Vocabulary {
    pub fn commands(self) -> &'static [Command] {
        match self {
            Vocabulary::Base => &BASE_COMMANDS,
            Vocabulary::Extended => &Command::ALL,
        }
    }

    /// Number of bits in an encoded command for this vocabulary.
    pub fn width(self) -> usize {
        self.commands().len()
    }

    pub fn position(self, command: Command) -> Option<usize> {
        self.commands().iter().position(|known| *known == command)
    }

    pub fn contains(self, command: Command) -> bool {
        self.position(command).is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Vocabulary::Base => "base",
            Vocabulary::Extended => "extended",
        }
    }
}

impl FromStr for Vocabulary {
    type Err = ControlError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "base" => Ok(Vocabulary::Base),
            "extended" => Ok(Vocabulary::Extended),
            other => Err(ControlError::Config(format!("unknown vocabulary '{other}'"))),
        }
    }
}

/// Current on/off state of every command in a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSet {
    vocabulary: Vocabulary,
    values: Vec<bool>,
}

impl CommandSet {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self {
            vocabulary,
            values: vec![false; vocabulary.width()],
        }
    }

    pub fn vocabulary(&self) -> Vocabulary {
        self.vocabulary
    }

    pub fn get(&self, command: Command) -> Option<bool> {
        self.vocabulary
            .position(command)
            .map(|index| self.values[index])
    }

    pub fn set(&mut self, command: Command, value: bool) -> Result<(), ControlError> {
        let index = self
            .vocabulary
            .position(command)
            .ok_or_else(|| ControlError::UnknownCommand(command.to_string()))?;
        self.values[index] = value;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|value| *value = false);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Command, bool)> + '_ {
        self.vocabulary
            .commands()
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }

    pub fn active(&self) -> impl Iterator<Item = Command> + '_ {
        self.iter()
            .filter_map(|(command, value)| value.then_some(command))
    }

    pub fn encode(&self) -> EncodedCommand {
        EncodedCommand::from_bits(self.values.iter().copied())
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
