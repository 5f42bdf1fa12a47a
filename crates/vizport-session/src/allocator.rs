use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tokio::sync::Mutex;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::store::SessionStore;

/// Optimistic, retry-based port allocation over the fixed pool.
///
/// No lock is held over the pool: the allocator recomputes the free view
/// per call, picks candidates in random order, and lets the store's
/// unique port index arbitrate races. The bounded candidate count caps
/// worst-case latency under contention.
pub struct PortAllocator {
    cfg: SessionConfig,
    rng: Mutex<StdRng>,
}

impl PortAllocator {
    pub fn new(cfg: SessionConfig) -> Self {
        Self::with_rng(cfg, StdRng::from_entropy())
    }

    /// Seeded variant so candidate order is reproducible.
    pub fn with_rng(cfg: SessionConfig, rng: StdRng) -> Self {
        Self {
            cfg,
            rng: Mutex::new(rng),
        }
    }

    /// Reserves a free port for `user_id`, or fails with
    /// [`SessionError::NoPortAvailable`] once the pool or the attempt
    /// budget is exhausted.
    pub async fn reserve(
        &self,
        store: &SessionStore,
        user_id: &str,
    ) -> Result<u16, SessionError> {
        let busy = store.busy_ports().await?;
        let mut free: Vec<u16> = self
            .cfg
            .valid_ports()
            .filter(|p| !busy.contains(p))
            .collect();

        {
            let mut rng = self.rng.lock().await;
            free.shuffle(&mut *rng);
        }
        free.truncate(self.cfg.max_reservation_attempts);

        self.try_candidates(store, user_id, free).await
    }

    async fn try_candidates(
        &self,
        store: &SessionStore,
        user_id: &str,
        candidates: Vec<u16>,
    ) -> Result<u16, SessionError> {
        for port in candidates {
            match store.insert_reservation(user_id, port).await {
                Ok(()) => {
                    tracing::debug!(user_id, port, "port reserved");
                    return Ok(port);
                }
                // Lost the race for this candidate; try the next one.
                Err(SessionError::Conflict) => {
                    tracing::debug!(user_id, port, "reservation candidate already claimed");
                }
                Err(e) => return Err(e),
            }
        }
        Err(SessionError::NoPortAvailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SessionState;
    use crate::test_support::memory_db;

    fn small_pool() -> SessionConfig {
        SessionConfig {
            base_port: 5000,
            max_instances: 3,
            ..SessionConfig::default()
        }
    }

    #[tokio::test]
    async fn reserves_within_the_valid_range() {
        let store = SessionStore::new(memory_db().await);
        let allocator = PortAllocator::new(small_pool());

        let port = allocator.reserve(&store, "alice").await.unwrap();
        assert!((5000..5003).contains(&port));
        assert_eq!(
            store.current_state("alice").await.unwrap(),
            Some(SessionState::Reserved(port))
        );
    }

    #[tokio::test]
    async fn drains_the_pool_then_fails() {
        let store = SessionStore::new(memory_db().await);
        let allocator = PortAllocator::new(small_pool());

        let mut seen = std::collections::HashSet::new();
        for user in ["a", "b", "c"] {
            seen.insert(allocator.reserve(&store, user).await.unwrap());
        }
        assert_eq!(seen.len(), 3);

        let err = allocator.reserve(&store, "d").await.unwrap_err();
        assert!(matches!(err, SessionError::NoPortAvailable));
    }

    #[tokio::test]
    async fn seeded_rng_makes_candidate_order_reproducible() {
        let pick = |seed: u64| async move {
            let store = SessionStore::new(memory_db().await);
            let allocator =
                PortAllocator::with_rng(small_pool(), StdRng::seed_from_u64(seed));
            allocator.reserve(&store, "alice").await.unwrap()
        };

        assert_eq!(pick(7).await, pick(7).await);
    }

    #[tokio::test]
    async fn conflicting_candidates_are_skipped() {
        let store = SessionStore::new(memory_db().await);
        let allocator = PortAllocator::new(small_pool());

        // Simulate a stale free view: the first two candidates were
        // claimed after the free set was computed.
        store.insert_reservation("rival-1", 5000).await.unwrap();
        store.insert_reservation("rival-2", 5001).await.unwrap();

        let port = allocator
            .try_candidates(&store, "alice", vec![5000, 5001, 5002])
            .await
            .unwrap();
        assert_eq!(port, 5002);
    }

    #[tokio::test]
    async fn attempt_budget_bounds_candidates_tried() {
        let cfg = SessionConfig {
            max_reservation_attempts: 1,
            ..small_pool()
        };
        let store = SessionStore::new(memory_db().await);
        let allocator = PortAllocator::new(cfg);

        store.insert_reservation("rival", 5000).await.unwrap();
        let err = allocator
            .try_candidates(&store, "alice", vec![5000])
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NoPortAvailable));
    }

    #[tokio::test]
    async fn concurrent_requests_for_the_last_port_have_one_winner() {
        let cfg = SessionConfig {
            base_port: 5000,
            max_instances: 1,
            ..SessionConfig::default()
        };
        let store = SessionStore::new(memory_db().await);
        let allocator = PortAllocator::new(cfg);

        let (a, b) = tokio::join!(
            allocator.reserve(&store, "alice"),
            allocator.reserve(&store, "bob"),
        );

        let winners = [a.is_ok(), b.is_ok()].iter().filter(|w| **w).count();
        assert_eq!(winners, 1);
        for res in [a, b] {
            if let Err(e) = res {
                // The losing race is absorbed; callers only ever see
                // pool exhaustion.
                assert!(matches!(e, SessionError::NoPortAvailable));
            }
        }
    }
}
