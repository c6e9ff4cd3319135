use std::{fs, path::Path, str::FromStr, time::Duration};

use serde::Deserialize;
use shared::{domain::Vocabulary, error::ControlError, protocol::EndpointMode};
use tracing::warn;
use url::Url;

use crate::{transmitter::SetBehaviour, transport::ControlEndpoint};

pub const DEFAULT_CONFIG_PATH: &str = "panel.toml";
pub const SENSOR_DATA_PATH: &str = "sensordata.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub vehicle_host: String,
    pub control_port: u16,
    pub webcam_port: u16,
    pub endpoint_mode: EndpointMode,
    pub vocabulary: Vocabulary,
    pub set_behaviour: SetBehaviour,
    /// Base the sensor file is resolved against; `http://<vehicle_host>` when unset.
    pub sensor_base_url: Option<String>,
    pub poll_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vehicle_host: "127.0.0.1".into(),
            control_port: 3000,
            webcam_port: 8080,
            endpoint_mode: EndpointMode::SetPrefixed,
            vocabulary: Vocabulary::Extended,
            set_behaviour: SetBehaviour::Latching,
            sensor_base_url: None,
            poll_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    vehicle_host: Option<String>,
    control_port: Option<u16>,
    webcam_port: Option<u16>,
    endpoint_mode: Option<EndpointMode>,
    vocabulary: Option<Vocabulary>,
    set_behaviour: Option<SetBehaviour>,
    sensor_base_url: Option<String>,
    poll_interval_ms: Option<u64>,
}

/// Defaults, then the TOML file at `path` if it exists, then `PANEL_*`
/// environment variables.
pub fn load_settings(path: &Path) -> Settings {
    load_settings_with(path, |key| std::env::var(key).ok())
}

/// [`load_settings`] with environment lookups routed through `lookup`.
pub fn load_settings_with(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Err(err) = apply_file(&mut settings, &raw) {
            warn!(path = %path.display(), error = %err, "ignoring unreadable settings file");
        }
    }

    apply_env(&mut settings, lookup);
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) -> Result<(), toml::de::Error> {
    let file: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file.vehicle_host {
        settings.vehicle_host = v;
    }
    if let Some(v) = file.control_port {
        settings.control_port = v;
    }
    if let Some(v) = file.webcam_port {
        settings.webcam_port = v;
    }
    if let Some(v) = file.endpoint_mode {
        settings.endpoint_mode = v;
    }
    if let Some(v) = file.vocabulary {
        settings.vocabulary = v;
    }
    if let Some(v) = file.set_behaviour {
        settings.set_behaviour = v;
    }
    if let Some(v) = file.sensor_base_url {
        settings.sensor_base_url = Some(v);
    }
    if let Some(v) = file.poll_interval_ms {
        settings.poll_interval_ms = v;
    }

    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("PANEL_VEHICLE_HOST") {
        settings.vehicle_host = v;
    }
    if let Some(v) = parse_env(&lookup, "PANEL_CONTROL_PORT") {
        settings.control_port = v;
    }
    if let Some(v) = parse_env(&lookup, "PANEL_WEBCAM_PORT") {
        settings.webcam_port = v;
    }
    if let Some(v) = parse_env(&lookup, "PANEL_ENDPOINT_MODE") {
        settings.endpoint_mode = v;
    }
    if let Some(v) = parse_env(&lookup, "PANEL_VOCABULARY") {
        settings.vocabulary = v;
    }
    if let Some(v) = parse_env(&lookup, "PANEL_SET_BEHAVIOUR") {
        settings.set_behaviour = v;
    }
    if let Some(v) = lookup("PANEL_SENSOR_BASE_URL") {
        settings.sensor_base_url = Some(v);
    }
    if let Some(v) = parse_env(&lookup, "PANEL_POLL_INTERVAL_MS") {
        settings.poll_interval_ms = v;
    }
}

fn parse_env<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, value = %raw, error = %err, "ignoring invalid environment override");
            None
        }
    }
}

impl Settings {
    pub fn control_endpoint(&self) -> Result<ControlEndpoint, ControlError> {
        ControlEndpoint::parse(
            &format!("http://{}:{}/", self.vehicle_host, self.control_port),
            self.endpoint_mode,
        )
    }

    pub fn sensor_url(&self) -> Result<Url, ControlError> {
        let mut base = self
            .sensor_base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.vehicle_host));
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base)
            .and_then(|base| base.join(SENSOR_DATA_PATH))
            .map_err(|err| ControlError::InvalidEndpoint(format!("sensor url '{base}': {err}")))
    }

    pub fn webcam_url(&self) -> Result<Url, ControlError> {
        let raw = format!("http://{}:{}/", self.vehicle_host, self.webcam_port);
        Url::parse(&raw).map_err(|err| ControlError::InvalidEndpoint(format!("'{raw}': {err}")))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
