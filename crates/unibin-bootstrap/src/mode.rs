//! Start-mode resolution
//!
//! The runtime's cluster module marks forked workers by setting a worker-id
//! environment variable before spawning them. That ambient signal is read
//! exactly once at bootstrap entry and carried as an explicit mode from then
//! on; the bootstrap never re-reads the environment.

/// Environment variable the runtime's cluster module sets on forked
/// workers. Cleared before the embedded program runs so it cannot
/// re-trigger clustering setup.
pub const WORKER_ID_ENV: &str = "NODE_UNIQUE_ID";

/// How this process was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Direct invocation; the embedded program gets a synthetic argv[1].
    Standalone,
    /// Forked by the runtime's cluster module; initialization goes through
    /// the clustering setup entry point and argv is left alone.
    ClusterWorker,
}

impl StartMode {
    /// Resolve the mode from the worker-id variable's presence.
    pub fn from_worker_id(worker_id: Option<&str>) -> Self {
        match worker_id {
            Some(id) if !id.is_empty() => StartMode::ClusterWorker,
            _ => StartMode::Standalone,
        }
    }
}
