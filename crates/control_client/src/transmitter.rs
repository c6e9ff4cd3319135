use std::{str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use shared::{
    domain::{Command, CommandSet, Vocabulary},
    error::ControlError,
    protocol::EncodedCommand,
};
use tracing::debug;

use crate::transport::{ControlEndpoint, ControlTransport};

/// How `set_command` treats the commands it does not name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetBehaviour {
    /// Other commands keep their state.
    #[default]
    Latching,
    /// Every command is stopped (and that stop transmitted) before the named
    /// command is applied, so at most one command is ever on.
    Exclusive,
}

impl FromStr for SetBehaviour {
    type Err = ControlError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "latching" => Ok(SetBehaviour::Latching),
            "exclusive" => Ok(SetBehaviour::Exclusive),
            other => Err(ControlError::Config(format!(
                "unknown set behaviour '{other}'"
            ))),
        }
    }
}

/// Label pair shown next to the autonomy switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutonomyLabels {
    pub state: &'static str,
    pub button: &'static str,
}

impl AutonomyLabels {
    pub fn for_state(enabled: bool) -> Self {
        if enabled {
            Self {
                state: "ON",
                button: "Switch OFF",
            }
        } else {
            Self {
                state: "OFF",
                button: "Switch ON",
            }
        }
    }
}

pub trait AutonomyIndicator: Send + Sync {
    fn show(&self, labels: AutonomyLabels);
}

/// Owns the command state for one vehicle and flushes it on every change.
pub struct CommandTransmitter {
    endpoint: ControlEndpoint,
    commands: CommandSet,
    behaviour: SetBehaviour,
    transport: Arc<dyn ControlTransport>,
    autonomy_indicator: Option<Arc<dyn AutonomyIndicator>>,
}

impl CommandTransmitter {
    pub fn new(
        endpoint: ControlEndpoint,
        vocabulary: Vocabulary,
        transport: Arc<dyn ControlTransport>,
    ) -> Self {
        Self {
            endpoint,
            commands: CommandSet::new(vocabulary),
            behaviour: SetBehaviour::default(),
            transport,
            autonomy_indicator: None,
        }
    }

    pub fn with_behaviour(mut self, behaviour: SetBehaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn with_autonomy_indicator(mut self, indicator: Arc<dyn AutonomyIndicator>) -> Self {
        self.autonomy_indicator = Some(indicator);
        self
    }

    pub fn state(&self) -> &CommandSet {
        &self.commands
    }

    pub fn endpoint(&self) -> &ControlEndpoint {
        &self.endpoint
    }

    pub fn vocabulary(&self) -> Vocabulary {
        self.commands.vocabulary()
    }

    pub fn encoded(&self) -> EncodedCommand {
        self.commands.encode()
    }

    /// Sets one command and transmits. Commands outside the active
    /// vocabulary are rejected before anything is sent.
    pub fn set_command(&mut self, command: Command, value: bool) -> Result<bool, ControlError> {
        if !self.vocabulary().contains(command) {
            return Err(ControlError::UnknownCommand(command.to_string()));
        }
        if self.behaviour == SetBehaviour::Exclusive {
            self.stop_all();
        }
        self.commands.set(command, value)?;
        self.transmit();
        Ok(true)
    }

    pub fn set_command_by_name(&mut self, name: &str, value: bool) -> Result<bool, ControlError> {
        let command = name.parse::<Command>()?;
        self.set_command(command, value)
    }

    pub fn stop_all(&mut self) -> EncodedCommand {
        self.commands.clear();
        self.transmit()
    }

    pub fn toggle_autonomy(&mut self) -> Result<bool, ControlError> {
        let enabled = !self
            .commands
            .get(Command::Autonomy)
            .ok_or_else(|| ControlError::UnknownCommand(Command::Autonomy.to_string()))?;
        self.commands.set(Command::Autonomy, enabled)?;
        if let Some(indicator) = &self.autonomy_indicator {
            indicator.show(AutonomyLabels::for_state(enabled));
        }
        self.transmit();
        Ok(enabled)
    }

    /// Replaces the whole command state with `encoded` and transmits it.
    pub fn apply(&mut self, encoded: &EncodedCommand) -> Result<EncodedCommand, ControlError> {
        self.commands = encoded.to_command_set(self.vocabulary())?;
        Ok(self.transmit())
    }

    /// Sends the current state without waiting for the vehicle.
    pub fn transmit(&self) -> EncodedCommand {
        let encoded = self.commands.encode();
        let url = self.endpoint.request_url(&encoded);
        debug!(bits = %encoded, url = %url, "transmitting command state");
        self.transport.dispatch(url);
        encoded
    }
}

#[cfg(test)]
#[path = "tests/transmitter_tests.rs"]
mod tests;
