use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use devreg_index::IndexSnapshot;
use devreg_oci::{HttpRegistryClient, RegistryTransport};

use crate::catalog::{Catalog, PublishedCatalog};
use crate::config::RegistryConfig;
use crate::error::{SyncError, SyncResult};
use crate::gate::{HealthProbe, HttpProbe, ReadinessGate};
use crate::pull::PullResolver;
use crate::push::PushSynchronizer;
use crate::reference::ReferenceBuilder;

/// Phase of startup that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartupStage {
    Readiness,
    Index,
    Publish,
}

impl fmt::Display for StartupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Readiness => write!(f, "readiness"),
            Self::Index => write!(f, "index"),
            Self::Publish => write!(f, "publish"),
        }
    }
}

/// Startup failure: which phase, and why.
#[derive(Debug, thiserror::Error)]
#[error("startup aborted during {stage}: {error}")]
pub struct StartupFailure {
    pub stage: StartupStage,
    #[source]
    pub error: SyncError,
}

/// Result of the one-time startup synchronization.
///
/// There is no partial mode: either every stack was published and the
/// catalog can be served, or startup was aborted.
#[derive(Debug)]
pub enum StartupOutcome {
    Ready(PublishedCatalog),
    Aborted(StartupFailure),
}

impl StartupOutcome {
    pub fn into_result(self) -> Result<PublishedCatalog, StartupFailure> {
        match self {
            Self::Ready(catalog) => Ok(catalog),
            Self::Aborted(failure) => Err(failure),
        }
    }

    fn aborted(stage: StartupStage, error: SyncError) -> Self {
        tracing::error!(%stage, "startup aborted: {error}");
        Self::Aborted(StartupFailure { stage, error })
    }
}

/// Readiness gate → index load → push of every stack, in that order, on a
/// single task.
pub struct Startup {
    gate: ReadinessGate,
    probe: Arc<dyn HealthProbe>,
    index_path: PathBuf,
    synchronizer: PushSynchronizer,
    resolver: PullResolver,
}

impl Startup {
    /// Wire startup against the registry described by `config`.
    pub fn from_config(config: &RegistryConfig, index_path: impl Into<PathBuf>) -> SyncResult<Self> {
        let client = HttpRegistryClient::new(&config.client_config()).map_err(SyncError::Client)?;
        let probe = Arc::new(HttpProbe::new(client.clone(), config.host.clone()));
        Ok(Self::new(config, index_path, Arc::new(client), probe))
    }

    pub fn new(
        config: &RegistryConfig,
        index_path: impl Into<PathBuf>,
        transport: Arc<dyn RegistryTransport>,
        probe: Arc<dyn HealthProbe>,
    ) -> Self {
        let references = ReferenceBuilder::new(config.host.clone());
        Self {
            gate: ReadinessGate::new(config.probe_interval()),
            probe,
            index_path: index_path.into(),
            synchronizer: PushSynchronizer::new(transport.clone(), references.clone(), config.stacks_root.clone()),
            resolver: PullResolver::new(transport, references, config.pull_deadline()),
        }
    }

    pub async fn run(self) -> StartupOutcome {
        if let Err(e) = self.gate.await_ready(self.probe.as_ref()).await {
            return StartupOutcome::aborted(StartupStage::Readiness, e);
        }

        let index = match IndexSnapshot::load(&self.index_path).await {
            Ok(index) => index.into_shared(),
            Err(e) => return StartupOutcome::aborted(StartupStage::Index, e.into()),
        };

        let report = match self.synchronizer.push_all(&index).await {
            Ok(report) => report,
            Err(e) => return StartupOutcome::aborted(StartupStage::Publish, e),
        };
        tracing::info!(stacks = report.len(), "published all stacks");

        let catalog = Catalog::new(index, Arc::new(self.resolver));
        StartupOutcome::Ready(PublishedCatalog::new(catalog, report))
    }
}
