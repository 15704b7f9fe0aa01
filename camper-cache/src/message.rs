//! Messages exchanged between background work and the event loop.
//!
//! Background futures never touch a pool. They resolve into a [`Completion`]
//! which the loop hands to the owning pool; the pool answers with a
//! [`CacheEvent`] for the screen.

use std::any::Any;
use std::fmt;
use std::time::Duration;

use camper_core::CamperError;

/// Notification emitted by a pool after it applied a completion.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// The pool's snapshot changed; re-read it.
    PoolUpdated { key: String },
    /// The snapshot changed and a confirmed mutation still waits on server
    /// data. Re-read it and start a fetch through the pool.
    RefreshNeeded { key: String },
    /// A mutation was rolled back. The screen shows `error` as a failed action.
    MutationFailed { key: String, error: CamperError },
}

impl CacheEvent {
    pub fn key(&self) -> &str {
        match self {
            Self::PoolUpdated { key }
            | Self::RefreshNeeded { key }
            | Self::MutationFailed { key, .. } => key,
        }
    }

    /// True if this event concerns the pool under `key`.
    pub fn is_for(&self, key: &str) -> bool {
        self.key() == key
    }
}

/// What kind of background work produced a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Fetch,
    Mutation,
}

/// Outcome of background work, addressed to a pool by key.
///
/// The payload is type-erased so one loop can carry completions for pools of
/// any value type. Only the pool that produced the work knows how to open it.
pub struct Completion {
    key: String,
    kind: CompletionKind,
    elapsed: Duration,
    failed: bool,
    canceled: bool,
    payload: Box<dyn Any + Send>,
}

impl Completion {
    pub(crate) fn new(
        key: String,
        kind: CompletionKind,
        elapsed: Duration,
        failed: bool,
        canceled: bool,
        payload: Box<dyn Any + Send>,
    ) -> Self {
        Self {
            key,
            kind,
            elapsed,
            failed,
            canceled,
            payload,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> CompletionKind {
        self.kind
    }

    /// Wall time the background work took.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// True if the work ended in a real error (not a cancellation).
    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn canceled(&self) -> bool {
        self.canceled
    }

    pub(crate) fn into_payload(self) -> Box<dyn Any + Send> {
        self.payload
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("elapsed", &self.elapsed)
            .field("failed", &self.failed)
            .field("canceled", &self.canceled)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_key() {
        let updated = CacheEvent::PoolUpdated {
            key: "todos".to_string(),
        };
        let failed = CacheEvent::MutationFailed {
            key: "todos".to_string(),
            error: CamperError::Canceled,
        };
        assert!(updated.is_for("todos"));
        assert_eq!(failed.key(), "todos");
        assert!(!failed.is_for("schedule"));
        let refresh = CacheEvent::RefreshNeeded {
            key: "todos".to_string(),
        };
        assert_eq!(refresh.key(), "todos");
    }

    #[test]
    fn test_completion_debug_hides_payload() {
        let completion = Completion::new(
            "todos".to_string(),
            CompletionKind::Fetch,
            Duration::from_millis(12),
            false,
            false,
            Box::new(5_u32),
        );
        let rendered = format!("{:?}", completion);
        assert!(rendered.contains("todos"));
        assert!(rendered.contains("Fetch"));
    }
}
