use thiserror::Error;

/// Failure taxonomy for the session lifecycle.
///
/// `Conflict` is an internal signal: the allocator's retry loop absorbs
/// it and callers of the public operations never see it. Everything else
/// propagates typed to the caller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Pool exhausted, or every sampled candidate lost its race.
    /// Recoverable; the caller may retry later.
    #[error("no port available")]
    NoPortAvailable,

    /// A reservation insert hit the unique port index: another request
    /// claimed the candidate first.
    #[error("port already claimed")]
    Conflict,

    /// Lookup or activation for a user with no live record. Caller
    /// error, not transient.
    #[error("no port reserved for user")]
    NoPortReserved,

    /// The container never answered the readiness probe within the
    /// attempt budget. All state has been rolled back before this is
    /// returned.
    #[error("container on port {port} did not become ready in time")]
    StartupTimeout { port: u16 },

    /// The container process failed to spawn at all. The orchestrator
    /// releases the user's port before returning this.
    #[error("failed to launch workload container")]
    LaunchFailed(#[source] anyhow::Error),

    /// A live container could not be stopped.
    #[error("failed to stop container on port {port}")]
    ProcessControl {
        port: u16,
        #[source]
        source: anyhow::Error,
    },

    /// Storage failure. Fatal; propagated unmodified.
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}
