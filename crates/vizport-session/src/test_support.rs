use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::runtime::{ProcessController, ReadinessProbe, WorkloadLauncher, WorkloadSpec};

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Fresh migrated database. A single pooled connection keeps the whole
/// suite on one in-memory sqlite instance.
pub async fn memory_db() -> Arc<DatabaseConnection> {
    init_tracing();
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1);
    let db = Database::connect(opts).await.expect("connect in-memory db");
    vizport_migration::Migrator::up(&db, None)
        .await
        .expect("apply migrations");
    Arc::new(db)
}

/// Records every launch; optionally refuses to spawn.
#[derive(Default)]
pub struct RecordingLauncher {
    pub refuse: bool,
    pub launched: Mutex<Vec<u16>>,
}

#[async_trait::async_trait]
impl WorkloadLauncher for RecordingLauncher {
    async fn launch(&self, port: u16, _workload: &WorkloadSpec) -> anyhow::Result<()> {
        if self.refuse {
            anyhow::bail!("spawn refused");
        }
        self.launched.lock().unwrap().push(port);
        Ok(())
    }
}

/// Becomes ready on the nth call; `u32::MAX` never succeeds.
pub struct ScriptedProbe {
    ready_on_call: u32,
    calls: AtomicU32,
}

impl ScriptedProbe {
    pub fn ready_on_call(n: u32) -> Self {
        Self {
            ready_on_call: n,
            calls: AtomicU32::new(0),
        }
    }

    pub fn never_ready() -> Self {
        Self::ready_on_call(u32::MAX)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ReadinessProbe for ScriptedProbe {
    async fn is_ready(&self, _port: u16) -> bool {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        call >= self.ready_on_call
    }
}

/// Records every stop request.
#[derive(Default)]
pub struct RecordingController {
    pub stopped: Mutex<Vec<u16>>,
}

#[async_trait::async_trait]
impl ProcessController for RecordingController {
    async fn stop_by_port(&self, port: u16) -> anyhow::Result<()> {
        self.stopped.lock().unwrap().push(port);
        Ok(())
    }
}
