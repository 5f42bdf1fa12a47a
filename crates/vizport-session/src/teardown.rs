use std::sync::Arc;

use crate::error::SessionError;
use crate::runtime::ProcessController;
use crate::store::SessionStore;

/// Unconditional, idempotent cleanup: stop whatever container holds the
/// user's port, then drop the user's rows from all three record sets.
#[derive(Clone)]
pub struct TeardownManager {
    store: SessionStore,
    controller: Arc<dyn ProcessController>,
}

impl TeardownManager {
    pub fn new(store: SessionStore, controller: Arc<dyn ProcessController>) -> Self {
        Self { store, controller }
    }

    /// Releases the user's port, returning it, or `None` when the user
    /// holds nothing (calling twice is a no-op, not an error).
    pub async fn release(&self, user_id: &str) -> Result<Option<u16>, SessionError> {
        let Some(state) = self.store.current_state(user_id).await? else {
            return Ok(None);
        };
        let port = state.port();

        // The record may still be an assignment while a half-started
        // container already holds the port (the activation rollback
        // path), so the stop request is unconditional. The controller
        // resolves the container by port at stop time and treats an
        // empty lookup as a no-op.
        self.controller
            .stop_by_port(port)
            .await
            .map_err(|source| SessionError::ProcessControl { port, source })?;

        self.store.clear_user(user_id).await?;
        tracing::info!(user_id, port, "session released");
        Ok(Some(port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingController, memory_db};

    #[tokio::test]
    async fn release_is_idempotent() {
        let store = SessionStore::new(memory_db().await);
        let controller = Arc::new(RecordingController::default());
        let teardown = TeardownManager::new(store.clone(), controller.clone());

        store.insert_reservation("alice", 5001).await.unwrap();

        assert_eq!(teardown.release("alice").await.unwrap(), Some(5001));
        assert_eq!(teardown.release("alice").await.unwrap(), None);
        assert_eq!(store.current_state("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn release_with_no_session_skips_the_controller() {
        let store = SessionStore::new(memory_db().await);
        let controller = Arc::new(RecordingController::default());
        let teardown = TeardownManager::new(store, controller.clone());

        assert_eq!(teardown.release("nobody").await.unwrap(), None);
        assert!(controller.stopped.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn release_stops_the_container_on_the_held_port() {
        let store = SessionStore::new(memory_db().await);
        let controller = Arc::new(RecordingController::default());
        let teardown = TeardownManager::new(store.clone(), controller.clone());

        store.record_running("alice", 5002).await.unwrap();

        assert_eq!(teardown.release("alice").await.unwrap(), Some(5002));
        assert_eq!(*controller.stopped.lock().unwrap(), vec![5002]);
        assert_eq!(store.count_held().await.unwrap(), 0);
    }
}
