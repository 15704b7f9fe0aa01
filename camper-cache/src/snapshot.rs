//! Point-in-time views of a pool.
//!
//! A [`Snapshot`] is what screens render from. It is an immutable value:
//! the pool hands out a fresh one on every read and never changes one it
//! already gave away.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use camper_core::{CamperError, Timestamp};

/// Lifecycle state of a pool's entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SnapshotState {
    /// Nothing fetched yet, or the data expired.
    #[default]
    Idle,
    /// A fetch is in flight. Old data may still be present.
    Loading,
    /// Data is within its fresh TTL.
    Fresh,
    /// Data is present but past its fresh TTL or was invalidated.
    Stale,
    /// The last fetch failed. Old data may still be present.
    Error,
}

impl SnapshotState {
    /// Short lowercase name, used in the status bar and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Fresh => "fresh",
            Self::Stale => "stale",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SnapshotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable view of one cache entry.
///
/// The data is shared behind an `Arc`, so taking a snapshot on every render
/// does not copy the payload.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub(crate) data: Option<Arc<T>>,
    pub(crate) state: SnapshotState,
    pub(crate) error: Option<CamperError>,
    pub(crate) fetched_at: Option<Timestamp>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            state: self.state,
            error: self.error.clone(),
            fetched_at: self.fetched_at,
        }
    }
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            data: None,
            state: SnapshotState::Idle,
            error: None,
            fetched_at: None,
        }
    }
}

impl<T> Snapshot<T> {
    /// The cached value, if any.
    pub fn data(&self) -> Option<&T> {
        self.data.as_deref()
    }

    /// Shared handle to the cached value.
    pub fn shared(&self) -> Option<Arc<T>> {
        self.data.clone()
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn state(&self) -> SnapshotState {
        self.state
    }

    /// The error from the last fetch. Only set in [`SnapshotState::Error`].
    pub fn error(&self) -> Option<&CamperError> {
        self.error.as_ref()
    }

    /// When the data was last confirmed by the server.
    pub fn fetched_at(&self) -> Option<Timestamp> {
        self.fetched_at
    }

    /// True when there is data worth rendering, whatever its age.
    pub fn usable(&self) -> bool {
        self.has_data()
    }

    /// True when the data is within its fresh TTL.
    pub fn fresh(&self) -> bool {
        self.state == SnapshotState::Fresh
    }

    pub fn loading(&self) -> bool {
        self.state == SnapshotState::Loading
    }

    /// Age of the data at `now`, or `None` when nothing was ever fetched.
    pub fn age_at(&self, now: Timestamp) -> Option<Duration> {
        self.fetched_at
            .map(|at| (now - at).to_std().unwrap_or(Duration::ZERO))
    }
}

// ============================================================================
// TESTS
// ============================================================================
