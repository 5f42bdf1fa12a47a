use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What to serve: the host path of the dataset the container exposes
/// read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadSpec {
    pub dataset: PathBuf,
}

impl WorkloadSpec {
    pub fn new(dataset: impl Into<PathBuf>) -> Self {
        Self {
            dataset: dataset.into(),
        }
    }
}

/// Starts a workload bound to a host port. Must return as soon as the
/// process is spawned; readiness is the probe's job.
#[async_trait::async_trait]
pub trait WorkloadLauncher: Send + Sync {
    async fn launch(&self, port: u16, workload: &WorkloadSpec) -> anyhow::Result<()>;
}

/// One readiness check against a bound port. `false` means "not yet";
/// the orchestrator owns the retry budget.
#[async_trait::async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn is_ready(&self, port: u16) -> bool;
}

/// Looks up and stops whatever process publishes a port. Nothing
/// publishing the port is a silent no-op, not an error.
#[async_trait::async_trait]
pub trait ProcessController: Send + Sync {
    async fn stop_by_port(&self, port: u16) -> anyhow::Result<()>;
}
