use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use reqwest::Client;
use shared::{
    error::ControlError,
    protocol::{EncodedCommand, EndpointMode},
};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, warn};
use url::Url;

/// How long exit paths wait for in-flight commands before giving up on them.
pub const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Where encoded commands go and how the query string is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlEndpoint {
    base: Url,
    mode: EndpointMode,
}

impl ControlEndpoint {
    pub fn new(base: Url, mode: EndpointMode) -> Result<Self, ControlError> {
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(ControlError::InvalidEndpoint(format!(
                "control endpoint must be an http(s) url, got '{base}'"
            )));
        }
        Ok(Self { base, mode })
    }

    pub fn parse(raw: &str, mode: EndpointMode) -> Result<Self, ControlError> {
        let base = Url::parse(raw)
            .map_err(|err| ControlError::InvalidEndpoint(format!("'{raw}': {err}")))?;
        Self::new(base, mode)
    }

    pub fn mode(&self) -> EndpointMode {
        self.mode
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn request_url(&self, encoded: &EncodedCommand) -> Url {
        let mut url = self.base.clone();
        url.set_query(Some(&self.mode.query(encoded)));
        url
    }
}

/// Outbound path for command requests.
///
/// `dispatch` must not block: the transmitter calls it from input handlers
/// and never waits for, or learns about, the outcome.
pub trait ControlTransport: Send + Sync {
    fn dispatch(&self, url: Url);
}

pub struct HttpControlTransport {
    http: Client,
    runtime: Handle,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl HttpControlTransport {
    /// Must be called from within a tokio runtime; requests are spawned on it.
    pub fn new() -> Result<Self, ControlError> {
        Self::with_client(Client::new())
    }

    pub fn with_client(http: Client) -> Result<Self, ControlError> {
        let runtime =
            Handle::try_current().map_err(|err| ControlError::Runtime(err.to_string()))?;
        Ok(Self {
            http,
            runtime,
            in_flight: Mutex::new(Vec::new()),
        })
    }

    /// Waits for every request dispatched so far. One-shot callers use this
    /// before exiting so the runtime is not torn down under them.
    pub async fn drain(&self) {
        let pending = {
            let mut guard = self
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        for handle in pending {
            let _ = handle.await;
        }
    }

    /// [`drain`](Self::drain) bounded by `limit`. Returns `false` when some
    /// requests were still pending; those keep running detached.
    pub async fn drain_within(&self, limit: Duration) -> bool {
        match tokio::time::timeout(limit, self.drain()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(?limit, "gave up waiting for in-flight commands");
                false
            }
        }
    }
}

impl ControlTransport for HttpControlTransport {
    fn dispatch(&self, url: Url) {
        let http = self.http.clone();
        let handle = self.runtime.spawn(async move {
            match http.get(url.clone()).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(url = %url, "command delivered");
                }
                Ok(response) => {
                    warn!(
                        url = %url,
                        status = %response.status(),
                        "control endpoint rejected command"
                    );
                }
                Err(err) => {
                    warn!(url = %url, error = %err, "command dispatch failed");
                }
            }
        });

        let mut guard = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        guard.retain(|pending| !pending.is_finished());
        guard.push(handle);
    }
}
