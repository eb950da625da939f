//! Scan job lifecycle state.
//!
//! A job moves Created → Running → (Completed | Cancelled), or to Failed when
//! the request is refused during expansion or a worker dies. The engine keeps
//! a [`JobHandle`] for the active job so `cancel()` and `progress()` can reach
//! it from other tasks; workers receive the token and counter at spawn time.

use crate::types::JobId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

/// Lifecycle state of a scan job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Accepted, addresses not yet expanded.
    Created,
    /// Workers are probing.
    Running,
    /// Every unit was probed.
    Completed,
    /// Stopped early by a cancellation request.
    Cancelled,
    /// Ended by an error; no results are returned.
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Snapshot of an active job's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobProgress {
    /// Job the snapshot belongs to.
    pub job_id: JobId,
    /// State at the time of the snapshot.
    pub state: JobState,
    /// Units probed so far.
    pub completed: u64,
    /// Units in the job; zero until addresses are expanded.
    pub total: u64,
}

impl JobProgress {
    /// Completion ratio in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Shared handle to the active job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: JobId,
    token: CancellationToken,
    completed: Arc<AtomicU64>,
    total: Arc<AtomicU64>,
    state: Arc<Mutex<JobState>>,
}

impl JobHandle {
    /// Create the handle of a freshly accepted job.
    pub fn new() -> Self {
        Self {
            id: JobId::new(),
            token: CancellationToken::new(),
            completed: Arc::new(AtomicU64::new(0)),
            total: Arc::new(AtomicU64::new(0)),
            state: Arc::new(Mutex::new(JobState::Created)),
        }
    }

    /// Identifier of the job.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Token observed by the workers.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Counter incremented by the workers after each unit.
    pub fn completed_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.completed)
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Enter the Running state with `total` units.
    pub fn start(&self, total: u64) {
        self.total.store(total, Ordering::Release);
        *self.lock_state() = JobState::Running;
    }

    /// Enter a final state.
    pub fn finish(&self, state: JobState) {
        *self.lock_state() = state;
    }

    /// Current state.
    pub fn state(&self) -> JobState {
        *self.lock_state()
    }

    /// Current progress.
    pub fn progress(&self) -> JobProgress {
        JobProgress {
            job_id: self.id,
            state: self.state(),
            completed: self.completed.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Acquire),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for JobHandle {
    fn default() -> Self {
        Self::new()
    }
}
