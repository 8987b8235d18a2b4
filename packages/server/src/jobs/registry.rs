//! Thread-safe, injectable job registry.
//!
//! One mutex guards the whole map. Every access is a short closure under
//! the lock - field reads and writes only, never network or model calls -
//! and readers get cloned snapshots so the lock is released before any
//! serialization happens. Construct an instance per server (or per test);
//! there is no global.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use super::{Job, JobSummary};

/// Registry of all jobs known to this process. State is in-memory and
/// ephemeral; nothing survives a restart.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<Uuid, Job>>,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created job.
    pub fn insert(&self, job: Job) {
        self.lock().insert(job.id, job);
    }

    /// Mutate one job under the lock. Returns false for unknown ids.
    pub fn update<F>(&self, id: Uuid, mutate: F) -> bool
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.lock();
        match jobs.get_mut(&id) {
            Some(job) => {
                mutate(job);
                true
            }
            None => false,
        }
    }

    /// Clone one job out for a reader.
    pub fn snapshot(&self, id: Uuid) -> Option<Job> {
        self.lock().get(&id).cloned()
    }

    /// Condensed summaries of every job, unordered.
    pub fn summaries(&self) -> Vec<JobSummary> {
        self.lock().values().map(JobSummary::from).collect()
    }

    /// Number of jobs tracked.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Job>> {
        // A poisoned lock only means another worker panicked mid-update;
        // the map itself is still usable.
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
