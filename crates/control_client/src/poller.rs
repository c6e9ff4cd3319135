use std::{
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::error::ControlError;
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::debug;
use url::Url;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[async_trait]
pub trait SensorSource: Send + Sync {
    async fn fetch(&self) -> Result<String>;
}

pub struct HttpSensorSource {
    http: Client,
    url: Url,
}

impl HttpSensorSource {
    pub fn new(url: Url) -> Self {
        Self {
            http: Client::new(),
            url,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl SensorSource for HttpSensorSource {
    async fn fetch(&self) -> Result<String> {
        let response = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .with_context(|| format!("failed to fetch sensor data from {}", self.url))?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Receives sensor text verbatim. Escaping, if any, is the surface's job.
pub trait DisplaySurface: Send + Sync {
    fn show(&self, reading: &str);
}

/// Display surface that only remembers the most recent reading.
#[derive(Debug, Clone, Default)]
pub struct LatestReading {
    inner: Arc<RwLock<Option<String>>>,
}

impl LatestReading {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DisplaySurface for LatestReading {
    fn show(&self, reading: &str) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(reading.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Updated,
    Empty,
    Failed,
}

/// One poll cycle: an empty body leaves the display untouched and failures
/// are dropped until the next cycle.
pub async fn poll_once(source: &dyn SensorSource, display: &dyn DisplaySurface) -> PollOutcome {
    match source.fetch().await {
        Ok(reading) if reading.is_empty() => PollOutcome::Empty,
        Ok(reading) => {
            display.show(&reading);
            PollOutcome::Updated
        }
        Err(err) => {
            debug!(error = %err, "sensor poll failed");
            PollOutcome::Failed
        }
    }
}

pub struct SensorPoller;

impl SensorPoller {
    /// Starts polling on the current tokio runtime. The first fetch happens
    /// one `interval` after start.
    pub fn start(
        source: Arc<dyn SensorSource>,
        display: Arc<dyn DisplaySurface>,
        interval: Duration,
    ) -> Result<PollerHandle, ControlError> {
        if interval.is_zero() {
            return Err(ControlError::Config(
                "poll interval must be greater than zero".into(),
            ));
        }
        let runtime =
            Handle::try_current().map_err(|err| ControlError::Runtime(err.to_string()))?;
        let task = runtime.spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                poll_once(source.as_ref(), display.as_ref()).await;
            }
        });
        Ok(PollerHandle { task })
    }
}

/// Polling stops when the handle is stopped or dropped.
pub struct PollerHandle {
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
#[path = "tests/poller_tests.rs"]
mod tests;
