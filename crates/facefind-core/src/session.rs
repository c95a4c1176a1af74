//! Run supersession.
//!
//! Each new validation or matching run takes a fresh [`RunId`]. Completions
//! from an older run are dropped by checking [`RunTracker::is_current`]
//! before applying them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(u64);

impl RunId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// Issues monotonically increasing run ids and remembers the latest.
#[derive(Debug, Default)]
pub struct RunTracker {
    latest: AtomicU64,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run, superseding every earlier one.
    pub fn begin(&self) -> RunId {
        RunId(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, run: RunId) -> bool {
        self.latest.load(Ordering::SeqCst) == run.0
    }

    /// Return `value` only if `run` has not been superseded.
    pub fn accept<T>(&self, run: RunId, value: T) -> Option<T> {
        if self.is_current(run) {
            Some(value)
        } else {
            tracing::debug!(%run, "dropping stale completion");
            None
        }
    }
}
