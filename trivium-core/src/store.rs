//! Persistence surface for the publish queue.
//!
//! The host owns the durable key-value store; this crate only requires that
//! the job list round-trips verbatim. The queue flushes on every
//! state-changing mutation, so a crash between enqueue and processing cannot
//! lose accepted work.

use async_trait::async_trait;

use crate::error::SyncError;
use crate::models::QueueJob;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Restore the persisted job list (startup).
    async fn load(&self) -> Result<Vec<QueueJob>, SyncError>;

    /// Replace the persisted job list (flush on every mutation).
    async fn persist(&self, jobs: &[QueueJob]) -> Result<(), SyncError>;
}

/// In-memory store for tests and for hosts that persist elsewhere.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: std::sync::Mutex<Vec<QueueJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with pre-existing jobs (restart scenarios).
    pub fn with_jobs(jobs: Vec<QueueJob>) -> Self {
        Self {
            jobs: std::sync::Mutex::new(jobs),
        }
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn load(&self) -> Result<Vec<QueueJob>, SyncError> {
        Ok(self
            .jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    async fn persist(&self, jobs: &[QueueJob]) -> Result<(), SyncError> {
        *self
            .jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = jobs.to_vec();
        Ok(())
    }
}
