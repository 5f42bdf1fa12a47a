use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::allocator::PortAllocator;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::runtime::{ProcessController, ReadinessProbe, WorkloadLauncher, WorkloadSpec};
use crate::store::SessionStore;
use crate::teardown::TeardownManager;

/// Drives the full session lifecycle: release-then-reserve-then-assign
/// for a new request, launch-and-health-check for activation, rollback
/// on failure.
pub struct SessionOrchestrator {
    cfg: SessionConfig,
    store: SessionStore,
    allocator: PortAllocator,
    teardown: TeardownManager,
    launcher: Arc<dyn WorkloadLauncher>,
    probe: Arc<dyn ReadinessProbe>,
}

impl SessionOrchestrator {
    pub fn new(
        db: Arc<DatabaseConnection>,
        cfg: SessionConfig,
        launcher: Arc<dyn WorkloadLauncher>,
        probe: Arc<dyn ReadinessProbe>,
        controller: Arc<dyn ProcessController>,
    ) -> Self {
        let allocator = PortAllocator::new(cfg.clone());
        Self::with_allocator(db, cfg, allocator, launcher, probe, controller)
    }

    /// Variant taking a pre-built allocator (e.g. one with a seeded rng).
    pub fn with_allocator(
        db: Arc<DatabaseConnection>,
        cfg: SessionConfig,
        allocator: PortAllocator,
        launcher: Arc<dyn WorkloadLauncher>,
        probe: Arc<dyn ReadinessProbe>,
        controller: Arc<dyn ProcessController>,
    ) -> Self {
        let store = SessionStore::new(db);
        let teardown = TeardownManager::new(store.clone(), controller);
        Self {
            cfg,
            store,
            allocator,
            teardown,
            launcher,
            probe,
        }
    }

    /// Reserves a port for the user and promotes it to an assignment.
    ///
    /// A user holds at most one active session, so any previous session
    /// is torn down first (idempotent when there is none).
    pub async fn request_port(&self, user_id: &str) -> Result<u16, SessionError> {
        self.teardown.release(user_id).await?;

        self.allocator.reserve(&self.store, user_id).await?;
        let port = self.store.promote_to_assignment(user_id).await?;
        tracing::info!(user_id, port, "port assigned");
        Ok(port)
    }

    /// The port currently held by the user in any lifecycle state, if
    /// any.
    pub async fn current_port(&self, user_id: &str) -> Result<Option<u16>, SessionError> {
        Ok(self.store.current_state(user_id).await?.map(|s| s.port()))
    }

    /// Launches the user's container on their held port and waits for it
    /// to become reachable.
    ///
    /// Every failure path leaves the user with zero records: a spawn
    /// failure and an exhausted probe budget both tear the session down
    /// (stopping any half-started container) before the error is
    /// returned.
    pub async fn activate(
        &self,
        user_id: &str,
        workload: &WorkloadSpec,
    ) -> Result<u16, SessionError> {
        let Some(state) = self.store.current_state(user_id).await? else {
            return Err(SessionError::NoPortReserved);
        };
        let port = state.port();

        if let Err(e) = self.launcher.launch(port, workload).await {
            self.teardown.release(user_id).await?;
            return Err(SessionError::LaunchFailed(e));
        }

        for attempt in 1..=self.cfg.max_start_attempts {
            if self.probe.is_ready(port).await {
                self.store.record_running(user_id, port).await?;
                tracing::info!(user_id, port, attempt, "container ready");
                return Ok(port);
            }
            if attempt < self.cfg.max_start_attempts {
                tokio::time::sleep(self.cfg.start_poll_interval).await;
            }
        }

        tracing::warn!(
            user_id,
            port,
            attempts = self.cfg.max_start_attempts,
            "container never became ready, rolling back"
        );
        self.teardown.release(user_id).await?;
        Err(SessionError::StartupTimeout { port })
    }

    /// Explicit teardown entry point for callers.
    pub async fn release(&self, user_id: &str) -> Result<Option<u16>, SessionError> {
        self.teardown.release(user_id).await
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }
}
