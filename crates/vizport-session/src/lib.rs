//! Port/session lifecycle manager for containerized visualization
//! backends.
//!
//! A fixed pool of TCP ports is multiplexed among many users. Each user
//! gets exclusive, time-bounded access to one port, backed by an isolated
//! container. The lifecycle for a user is a small state machine recorded
//! in the database:
//!
//! ```text
//! Reservation --(promote)--> Assignment --(health check)--> Running
//!       \__________________ teardown ______________________/
//! ```
//!
//! Concurrent reservation attempts are serialized solely by the store's
//! unique index on the port column; the allocator retries a bounded
//! number of shuffled candidates and swallows lost races.

pub mod allocator;
pub mod config;
pub mod docker;
pub mod error;
pub mod orchestrator;
pub mod probe;
pub mod runtime;
pub mod store;
pub mod teardown;

pub use allocator::PortAllocator;
pub use config::SessionConfig;
pub use error::SessionError;
pub use orchestrator::SessionOrchestrator;
pub use runtime::{ProcessController, ReadinessProbe, WorkloadLauncher, WorkloadSpec};
pub use store::{SessionState, SessionStore};
pub use teardown::TeardownManager;

#[cfg(test)]
pub(crate) mod test_support;
