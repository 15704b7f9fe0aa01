//! camper Test Utilities
//!
//! Shared test infrastructure for the camper workspace:
//! - Counting and scripted fetchers
//! - Scripted mutations over todo lists
//! - Proptest generators for record types
//! - Fixtures and assertions

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

pub use camper_cache::{FetchContext, Fetcher, Mutation};
pub use camper_core::{
    AccountInfo, CacheError, CamperError, CamperResult, RecordId, RemoteError, SearchResultInfo,
    Timestamp, TodoInfo,
};

// ============================================================================
// MOCK FETCHERS
// ============================================================================

/// Fetcher that counts invocations and replays a script.
///
/// Each call pops the next scripted result; once the script runs out every
/// call returns the fallback.
pub struct CountingFetcher<T> {
    calls: Arc<AtomicUsize>,
    script: Mutex<VecDeque<CamperResult<T>>>,
    fallback: CamperResult<T>,
}

impl<T: Clone> CountingFetcher<T> {
    /// Always returns `value`.
    pub fn returning(value: T) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            script: Mutex::new(VecDeque::new()),
            fallback: Ok(value),
        }
    }

    /// Returns the scripted results in order, then `fallback`.
    pub fn scripted(script: Vec<CamperResult<T>>, fallback: CamperResult<T>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            script: Mutex::new(script.into()),
            fallback,
        }
    }

    /// Handle for reading the call count after the fetcher is moved into a pool.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_result(&self) -> CamperResult<T> {
        let scripted = self.script.lock().ok().and_then(|mut script| script.pop_front());
        scripted.unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> Fetcher<T> for CountingFetcher<T> {
    async fn fetch(&self, _ctx: &FetchContext) -> CamperResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.next_result()
    }
}

/// Fetcher that never answers. Only cancellation ends it.
#[derive(Debug, Default, Clone, Copy)]
pub struct HangingFetcher;

#[async_trait]
impl<T: Send + 'static> Fetcher<T> for HangingFetcher {
    async fn fetch(&self, ctx: &FetchContext) -> CamperResult<T> {
        ctx.canceled().await;
        Err(CamperError::Canceled)
    }
}

// ============================================================================
// MOCK MUTATIONS
// ============================================================================

/// How a scripted mutation's remote call ends.
#[derive(Debug, Clone)]
pub enum RemoteOutcome {
    Succeed,
    Fail(CamperError),
    /// Wait until canceled.
    Hang,
}

/// Sets the completion flag of one todo.
#[derive(Debug, Clone)]
pub struct SetCompleted {
    pub todo_id: RecordId,
    pub completed: bool,
    pub outcome: RemoteOutcome,
    pub refetch: bool,
}

impl SetCompleted {
    pub fn new(todo_id: RecordId, completed: bool) -> Self {
        Self {
            todo_id,
            completed,
            outcome: RemoteOutcome::Succeed,
            refetch: false,
        }
    }

    pub fn failing(mut self, error: CamperError) -> Self {
        self.outcome = RemoteOutcome::Fail(error);
        self
    }

    pub fn hanging(mut self) -> Self {
        self.outcome = RemoteOutcome::Hang;
        self
    }

    pub fn with_refetch(mut self) -> Self {
        self.refetch = true;
        self
    }
}

#[async_trait]
impl Mutation<Vec<TodoInfo>> for SetCompleted {
    fn apply_locally(&self, current: &Vec<TodoInfo>) -> Vec<TodoInfo> {
        current
            .iter()
            .cloned()
            .map(|mut todo| {
                if todo.id == self.todo_id {
                    todo.completed = self.completed;
                }
                todo
            })
            .collect()
    }

    async fn apply_remotely(&self, ctx: &FetchContext) -> CamperResult<()> {
        match &self.outcome {
            RemoteOutcome::Succeed => Ok(()),
            RemoteOutcome::Fail(error) => Err(error.clone()),
            RemoteOutcome::Hang => {
                ctx.canceled().await;
                Err(CamperError::Canceled)
            }
        }
    }

    fn is_reflected_in(&self, remote: &Vec<TodoInfo>) -> bool {
        remote
            .iter()
            .any(|todo| todo.id == self.todo_id && todo.completed == self.completed)
    }

    fn refetch_on_success(&self) -> bool {
        self.refetch
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for camper record types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a Timestamp between 2020 and 2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(chrono::Utc::now)
        })
    }

    pub fn arb_todo() -> impl Strategy<Value = TodoInfo> {
        (
            1i64..1_000_000,
            "[a-zA-Z ]{1,40}",
            any::<bool>(),
            prop::option::of("2026-0[1-9]-[12][0-9]"),
            0i32..500,
        )
            .prop_map(|(id, content, completed, due_on, position)| TodoInfo {
                id,
                content,
                description: String::new(),
                completed,
                due_on,
                assignees: vec![],
                position,
            })
    }

    /// A todo list with distinct ids.
    pub fn arb_todo_list() -> impl Strategy<Value = Vec<TodoInfo>> {
        prop::collection::vec(arb_todo(), 1..20).prop_map(|mut todos| {
            for (i, todo) in todos.iter_mut().enumerate() {
                todo.id = i as RecordId + 1;
            }
            todos
        })
    }

    pub fn arb_search_result(account: AccountInfo) -> impl Strategy<Value = SearchResultInfo> {
        (1i64..1_000_000, "[a-z ]{1,30}", arb_timestamp()).prop_map(move |(id, title, created_at)| {
            SearchResultInfo {
                id,
                title,
                kind: "Todo".to_string(),
                project: "Launch".to_string(),
                account_id: account.id.clone(),
                account_name: account.name.clone(),
                created_at,
            }
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records for common scenarios.

    use super::*;

    pub fn todo(id: RecordId, content: &str, completed: bool) -> TodoInfo {
        TodoInfo {
            id,
            content: content.to_string(),
            description: String::new(),
            completed,
            due_on: None,
            assignees: vec![],
            position: id as i32,
        }
    }

    /// Three open todos with ids 1, 2, 3.
    pub fn todo_list() -> Vec<TodoInfo> {
        vec![
            todo(1, "Draft release notes", false),
            todo(2, "Review pricing page", false),
            todo(3, "Book venue", false),
        ]
    }

    pub fn accounts() -> Vec<AccountInfo> {
        vec![
            AccountInfo::new("1001", "Acme"),
            AccountInfo::new("1002", "Globex"),
            AccountInfo::new("1003", "Initech"),
        ]
    }

    pub fn search_result(id: RecordId, account: &AccountInfo, created_at: Timestamp) -> SearchResultInfo {
        SearchResultInfo {
            id,
            title: format!("Result {id}"),
            kind: "Message".to_string(),
            project: "Launch".to_string(),
            account_id: account.id.clone(),
            account_name: account.name.clone(),
            created_at,
        }
    }

    pub fn server_error(endpoint: &str) -> CamperError {
        RemoteError::Status {
            endpoint: endpoint.to_string(),
            status: 500,
            message: "internal error".to_string(),
        }
        .into()
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for camper results.

    use super::*;

    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &CamperResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    #[track_caller]
    pub fn assert_canceled<T: std::fmt::Debug>(result: &CamperResult<T>) {
        match result {
            Err(CamperError::Canceled) => {}
            other => panic!("Expected Canceled, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_not_usable<T: std::fmt::Debug>(result: &CamperResult<T>) {
        match result {
            Err(CamperError::Cache(CacheError::NotUsable { .. })) => {}
            other => panic!("Expected NotUsable, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_remote_error<T: std::fmt::Debug>(result: &CamperResult<T>) {
        match result {
            Err(CamperError::Remote(_)) => {}
            other => panic!("Expected Remote error, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
