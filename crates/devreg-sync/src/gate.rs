use std::time::Duration;

use async_trait::async_trait;
use devreg_oci::{HttpRegistryClient, OciResult};

use crate::error::{SyncError, SyncResult};

/// One health check against the registry.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// What is being probed, for log lines and errors.
    fn endpoint(&self) -> &str;

    /// HTTP status of a single check. `Err` means the endpoint could not be
    /// reached at all.
    async fn probe(&self) -> OciResult<u16>;
}

/// Bare `GET` on the registry root.
pub struct HttpProbe {
    client: HttpRegistryClient,
    host: String,
}

impl HttpProbe {
    pub fn new(client: HttpRegistryClient, host: impl Into<String>) -> Self {
        Self {
            client,
            host: host.into(),
        }
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    fn endpoint(&self) -> &str {
        &self.host
    }

    async fn probe(&self) -> OciResult<u16> {
        Ok(self.client.probe(&self.host).await?.as_u16())
    }
}

/// Blocks startup until the registry answers `200 OK`.
///
/// Non-200 answers are retried forever at a fixed interval. A transport
/// failure is not retried: it usually means a wrong host, and waiting would
/// never fix that.
#[derive(Clone, Debug)]
pub struct ReadinessGate {
    interval: Duration,
}

impl ReadinessGate {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Probe until ready. Returns the number of probes made.
    pub async fn await_ready(&self, probe: &dyn HealthProbe) -> SyncResult<u32> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let status = probe.probe().await.map_err(|source| SyncError::Transport {
                endpoint: probe.endpoint().to_string(),
                source,
            })?;
            if status == 200 {
                tracing::info!(endpoint = probe.endpoint(), attempts, "registry is up and running");
                return Ok(attempts);
            }
            tracing::warn!(endpoint = probe.endpoint(), attempts, status, "waiting for registry to start...");
            tokio::time::sleep(self.interval).await;
        }
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
