mod display;
mod interactive;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use control_client::{
    config::DEFAULT_CONFIG_PATH,
    load_settings,
    poller::{poll_once, PollOutcome},
    CommandTransmitter, ControlTransport, HttpControlTransport, HttpSensorSource, SensorPoller,
    SetBehaviour, Settings, SHUTDOWN_DRAIN_TIMEOUT,
};
use shared::{
    domain::Vocabulary,
    protocol::{EncodedCommand, EndpointMode},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::display::StdoutDisplay;

/// Remote control panel for the tank: drives it from the keyboard and shows
/// its sensor readout.
#[derive(Parser, Debug)]
struct Cli {
    /// Settings file; missing files fall back to defaults
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Vehicle host name or address
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    control_port: Option<u16>,
    /// Query convention of the control endpoint: bare or set_prefixed
    #[arg(long)]
    mode: Option<EndpointMode>,
    /// Command vocabulary the vehicle understands: base or extended
    #[arg(long)]
    vocabulary: Option<Vocabulary>,
    /// Stop every command before setting a new one
    #[arg(long)]
    exclusive: bool,
    #[command(subcommand)]
    command: Option<PanelCommand>,
}

#[derive(Subcommand, Debug)]
enum PanelCommand {
    /// Drive the vehicle from the keyboard (default)
    Interactive,
    /// Set one command and send the resulting state
    Set { command: String, state: Switch },
    /// Send all-stop
    Stop,
    /// Send a raw bit pattern
    Send { bits: String },
    /// Print sensor readings as they arrive
    Sensor {
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Fetch a single reading and exit
        #[arg(long)]
        once: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Switch {
    On,
    Off,
}

impl Cli {
    fn settings(&self) -> Settings {
        self.apply_overrides(load_settings(&self.config))
    }

    /// Flags are the last layer, above the settings file and environment.
    fn apply_overrides(&self, mut settings: Settings) -> Settings {
        if let Some(host) = &self.host {
            settings.vehicle_host = host.clone();
        }
        if let Some(port) = self.control_port {
            settings.control_port = port;
        }
        if let Some(mode) = self.mode {
            settings.endpoint_mode = mode;
        }
        if let Some(vocabulary) = self.vocabulary {
            settings.vocabulary = vocabulary;
        }
        if self.exclusive {
            settings.set_behaviour = SetBehaviour::Exclusive;
        }
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(PanelCommand::Interactive));

    // Dispatch warnings would scroll over the interactive screen.
    let default_filter = if interactive { "error" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = cli.settings();

    match cli.command.unwrap_or(PanelCommand::Interactive) {
        PanelCommand::Interactive => interactive::run(&settings).await,
        PanelCommand::Set { command, state } => {
            let value = matches!(state, Switch::On);
            one_shot(&settings, |transmitter| {
                transmitter.set_command_by_name(&command, value)?;
                Ok(())
            })
            .await
        }
        PanelCommand::Stop => {
            one_shot(&settings, |transmitter| {
                transmitter.stop_all();
                Ok(())
            })
            .await
        }
        PanelCommand::Send { bits } => {
            one_shot(&settings, |transmitter| send_pattern(transmitter, &bits)).await
        }
        PanelCommand::Sensor { interval_ms, once } => {
            let source = HttpSensorSource::new(settings.sensor_url()?);
            if once {
                match poll_once(&source, &StdoutDisplay).await {
                    PollOutcome::Updated => {}
                    PollOutcome::Empty => eprintln!("no sensor data"),
                    PollOutcome::Failed => anyhow::bail!("failed to read {}", source.url()),
                }
                return Ok(());
            }

            let interval = interval_ms
                .map(std::time::Duration::from_millis)
                .unwrap_or_else(|| settings.poll_interval());
            info!(url = %source.url(), ?interval, "polling sensor data");
            let handle = SensorPoller::start(Arc::new(source), Arc::new(StdoutDisplay), interval)?;
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for ctrl-c")?;
            handle.stop();
            Ok(())
        }
    }
}

pub(crate) fn build_transmitter(
    settings: &Settings,
    transport: Arc<dyn ControlTransport>,
) -> Result<CommandTransmitter> {
    let endpoint = settings.control_endpoint()?;
    Ok(CommandTransmitter::new(endpoint, settings.vocabulary, transport)
        .with_behaviour(settings.set_behaviour))
}

/// Validates `bits` against the transmitter's vocabulary; nothing is sent on error.
fn send_pattern(transmitter: &mut CommandTransmitter, bits: &str) -> Result<()> {
    let encoded = EncodedCommand::parse(transmitter.vocabulary(), bits)?;
    transmitter.apply(&encoded)?;
    Ok(())
}

async fn one_shot(
    settings: &Settings,
    apply: impl FnOnce(&mut CommandTransmitter) -> Result<()>,
) -> Result<()> {
    let transport = Arc::new(HttpControlTransport::new()?);
    let mut transmitter = build_transmitter(settings, transport.clone())?;
    apply(&mut transmitter)?;
    if transport.drain_within(SHUTDOWN_DRAIN_TIMEOUT).await {
        info!(bits = %transmitter.encoded(), endpoint = %transmitter.endpoint().base(), "sent");
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
