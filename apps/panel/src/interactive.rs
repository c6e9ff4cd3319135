use std::{
    io::{self, Stdout, Write},
    sync::Arc,
    time::Duration,
};

use anyhow::Result;
use control_client::{
    handle_key, AutonomyLabels, CommandTransmitter, HttpControlTransport, HttpSensorSource, Key,
    LatestReading, SensorPoller, Settings, SHUTDOWN_DRAIN_TIMEOUT,
};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{
        Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
        KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::Print,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use shared::{domain::Command, protocol::EncodedCommand};
use tracing::debug;
use url::Url;

use crate::{
    build_transmitter,
    display::{sanitize_reading, AutonomyLabelCell},
};

const REDRAW_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PanelInput {
    Quit,
    ToggleAutonomy,
    Key { key: Key, pressed: bool },
    Ignore,
}

fn classify(event: &KeyEvent) -> PanelInput {
    let pressed = event.kind != KeyEventKind::Release;
    match event.code {
        KeyCode::Esc if pressed => PanelInput::Quit,
        KeyCode::Char('c') if pressed && event.modifiers.contains(KeyModifiers::CONTROL) => {
            PanelInput::Quit
        }
        KeyCode::Char('t') | KeyCode::Char('T') if pressed => PanelInput::ToggleAutonomy,
        KeyCode::Char('t') | KeyCode::Char('T') => PanelInput::Ignore,
        KeyCode::Char(ch) => PanelInput::Key {
            key: Key::from_char(ch),
            pressed,
        },
        KeyCode::Enter => PanelInput::Key {
            key: Key::Enter,
            pressed,
        },
        _ => PanelInput::Ignore,
    }
}

#[derive(Debug, Default)]
struct PanelStatus {
    last_sent: Option<EncodedCommand>,
    last_error: Option<String>,
    release_events: bool,
}

/// Applies one input. Returns `false` when the panel should close.
fn apply_input(
    transmitter: &mut CommandTransmitter,
    status: &mut PanelStatus,
    input: PanelInput,
) -> bool {
    let outcome = match input {
        PanelInput::Quit => return false,
        PanelInput::Ignore => return true,
        PanelInput::ToggleAutonomy => transmitter.toggle_autonomy().map(|_| true),
        PanelInput::Key { key, pressed } => handle_key(transmitter, key, pressed),
    };
    match outcome {
        Ok(true) => {
            status.last_sent = Some(transmitter.encoded());
            status.last_error = None;
        }
        Ok(false) => {}
        Err(err) => status.last_error = Some(err.to_string()),
    }
    true
}

fn render(
    transmitter: &CommandTransmitter,
    autonomy: AutonomyLabels,
    reading: Option<&str>,
    status: &PanelStatus,
    webcam: &Url,
) -> Vec<String> {
    let endpoint = transmitter.endpoint();
    let mut lines = vec![
        format!(
            "Control {} ({})   Webcam {}",
            endpoint.base(),
            endpoint.mode().as_str(),
            webcam
        ),
        String::new(),
        transmitter
            .state()
            .iter()
            .map(|(command, on)| format!("[{}] {command}", if on { 'x' } else { ' ' }))
            .collect::<Vec<_>>()
            .join("  "),
        format!(
            "Last sent: {}",
            status
                .last_sent
                .as_ref()
                .map(|encoded| encoded.to_string())
                .unwrap_or_else(|| "-".into())
        ),
    ];
    if transmitter.vocabulary().contains(Command::Autonomy) {
        lines.push(format!(
            "Autonomy: {:<3}  [T] {}",
            autonomy.state, autonomy.button
        ));
    }
    lines.push(format!(
        "Sensor: {}",
        reading
            .map(sanitize_reading)
            .unwrap_or_else(|| "-".into())
    ));
    lines.push(String::new());
    lines.push(
        "W/S/A/D drive  Q/E turret  Z elevate  Space fire  I ignition  Enter stop  Esc quit".into(),
    );
    if !status.release_events {
        lines.push("Key release is not reported by this terminal; press Enter to stop.".into());
    }
    if let Some(err) = &status.last_error {
        lines.push(format!("Error: {err}"));
    }
    lines
}

/// Pairs lines with screen rows; lines past the last addressable row are dropped.
fn screen_rows(lines: &[String]) -> impl Iterator<Item = (u16, &str)> {
    (0..=u16::MAX).zip(lines.iter().map(String::as_str))
}

fn draw(stdout: &mut Stdout, lines: &[String]) -> io::Result<()> {
    queue!(stdout, Clear(ClearType::All))?;
    for (row, line) in screen_rows(lines) {
        queue!(stdout, MoveTo(0, row), Print(line))?;
    }
    stdout.flush()
}

/// Raw mode and the alternate screen are undone on drop, including on error paths.
struct TerminalGuard {
    release_events: bool,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, Hide)?;
        let release_events = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if release_events {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        Ok(Self { release_events })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        if self.release_events {
            let _ = execute!(stdout, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(stdout, Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

pub async fn run(settings: &Settings) -> Result<()> {
    let transport = Arc::new(HttpControlTransport::new()?);
    let autonomy = Arc::new(AutonomyLabelCell::default());
    let mut transmitter =
        build_transmitter(settings, transport.clone())?.with_autonomy_indicator(autonomy.clone());

    let reading = Arc::new(LatestReading::new());
    let source = Arc::new(HttpSensorSource::new(settings.sensor_url()?));
    let poller = SensorPoller::start(source, reading.clone(), settings.poll_interval())?;
    let webcam = settings.webcam_url()?;

    let guard = TerminalGuard::enter()?;
    let mut status = PanelStatus {
        release_events: guard.release_events,
        ..PanelStatus::default()
    };
    let result = event_loop(
        &mut transmitter,
        &mut status,
        &autonomy,
        &reading,
        &webcam,
    )
    .await;

    // Restore the terminal before any wait so a silent vehicle cannot leave it raw.
    drop(guard);
    poller.stop();
    debug!("closing panel, stopping vehicle");
    transmitter.stop_all();
    transport.drain_within(SHUTDOWN_DRAIN_TIMEOUT).await;
    result
}

async fn event_loop(
    transmitter: &mut CommandTransmitter,
    status: &mut PanelStatus,
    autonomy: &AutonomyLabelCell,
    reading: &LatestReading,
    webcam: &Url,
) -> Result<()> {
    let mut stdout = io::stdout();
    let mut events = EventStream::new();
    let mut redraw = tokio::time::interval(REDRAW_INTERVAL);

    loop {
        tokio::select! {
            _ = redraw.tick() => {}
            event = events.next() => {
                let Some(event) = event else { return Ok(()) };
                if let Event::Key(key) = event? {
                    if !apply_input(transmitter, status, classify(&key)) {
                        return Ok(());
                    }
                }
            }
        }
        let latest = reading.latest();
        let lines = render(
            transmitter,
            autonomy.current(),
            latest.as_deref(),
            status,
            webcam,
        );
        draw(&mut stdout, &lines)?;
    }
}

#[cfg(test)]
#[path = "tests/interactive_tests.rs"]
mod tests;
