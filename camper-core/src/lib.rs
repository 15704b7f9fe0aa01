//! camper Core - Record Types
//!
//! Plain data carried between the REST client, the cache and the screens.
//! This crate contains ONLY data types and errors - no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::{CacheError, CamperError, CamperResult, RemoteError};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Numeric identifier the remote service assigns to projects and recordings.
pub type RecordId = i64;

/// An account the user can reach. Search fans out across all of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: String,
    pub name: String,
}

impl AccountInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// A todo inside a todolist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoInfo {
    pub id: RecordId,
    pub content: String,
    pub description: String,
    pub completed: bool,
    pub due_on: Option<String>,
    pub assignees: Vec<String>,
    pub position: i32,
}

/// A schedule entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntryInfo {
    pub id: RecordId,
    pub summary: String,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub all_day: bool,
    pub participants: Vec<String>,
}

/// A recurring check-in question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinQuestionInfo {
    pub id: RecordId,
    pub title: String,
    pub paused: bool,
    pub answers_count: u32,
    pub frequency: String,
}

/// One answer to a check-in question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinAnswerInfo {
    pub id: RecordId,
    pub author: String,
    pub content: String,
    pub created_at: Timestamp,
}

/// A search hit, tagged with the account it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultInfo {
    pub id: RecordId,
    pub title: String,
    pub kind: String,
    pub project: String,
    pub account_id: String,
    pub account_name: String,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_info_new() {
        let acct = AccountInfo::new("42", "Acme");
        assert_eq!(acct.id, "42");
        assert_eq!(acct.name, "Acme");
    }
}
