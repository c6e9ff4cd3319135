//! Client side of the vehicle remote control: command state and its
//! transmission, sensor polling, and the keyboard table that drives both.

pub mod config;
pub mod keymap;
pub mod poller;
pub mod transmitter;
pub mod transport;

pub use config::{load_settings, load_settings_with, Settings};
pub use keymap::{handle_key, Key, KeyAction};
pub use poller::{
    DisplaySurface, HttpSensorSource, LatestReading, PollerHandle, SensorPoller, SensorSource,
};
pub use transmitter::{AutonomyIndicator, AutonomyLabels, CommandTransmitter, SetBehaviour};
pub use transport::{
    ControlEndpoint, ControlTransport, HttpControlTransport, SHUTDOWN_DRAIN_TIMEOUT,
};
