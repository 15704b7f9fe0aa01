//! Session tiers: global, account and project realms.
//!
//! Data that outlives navigation (the account list, cross-account search)
//! sits in the global realm. Per-account and per-project pools sit in
//! realms that are torn down when the user moves elsewhere, so nothing from
//! one project ever renders on another project's screen.

use camper_core::RecordId;

use crate::fetcher::FetchContext;
use crate::message::{CacheEvent, Completion};
use crate::registry::Realm;

/// The three realm tiers of one interactive session.
#[derive(Debug)]
pub struct Session {
    global: Realm,
    account: Option<(String, Realm)>,
    project: Option<(RecordId, Realm)>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            global: Realm::root("global"),
            account: None,
            project: None,
        }
    }

    pub fn global(&mut self) -> &mut Realm {
        &mut self.global
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account.as_ref().map(|(id, _)| id.as_str())
    }

    pub fn project_id(&self) -> Option<RecordId> {
        self.project.as_ref().map(|(id, _)| *id)
    }

    /// The realm for `account_id`, replacing any realm for another account.
    ///
    /// Switching accounts tears down the old account realm and the project
    /// realm under it.
    pub fn ensure_account(&mut self, account_id: &str) -> &mut Realm {
        let current = match self.account.take() {
            Some((id, realm)) if id == account_id => (id, realm),
            previous => {
                self.leave_project();
                if let Some((old, mut realm)) = previous {
                    tracing::info!(from = %old, to = %account_id, "switching account");
                    realm.teardown();
                }
                let realm = Realm::new(format!("account:{account_id}"), self.global.context());
                (account_id.to_string(), realm)
            }
        };
        &mut self.account.insert(current).1
    }

    /// The realm for `project_id`, replacing any realm for another project.
    ///
    /// The project realm hangs off the account realm when there is one.
    pub fn ensure_project(&mut self, project_id: RecordId) -> &mut Realm {
        let current = match self.project.take() {
            Some((id, realm)) if id == project_id => (id, realm),
            previous => {
                if let Some((old, mut realm)) = previous {
                    tracing::debug!(project_id = old, "leaving project");
                    realm.teardown();
                }
                let parent = match &self.account {
                    Some((_, realm)) => realm.context(),
                    None => self.global.context(),
                };
                (project_id, Realm::new(format!("project:{project_id}"), parent))
            }
        };
        &mut self.project.insert(current).1
    }

    /// Tear down the project realm, if any.
    pub fn leave_project(&mut self) {
        if let Some((id, mut realm)) = self.project.take() {
            tracing::debug!(project_id = id, "leaving project");
            realm.teardown();
        }
    }

    /// Tear down every realm. The session can be reused afterwards.
    pub fn shutdown(&mut self) {
        self.leave_project();
        if let Some((_, mut realm)) = self.account.take() {
            realm.teardown();
        }
        self.global.teardown();
        self.global = Realm::root("global");
    }

    /// Context for work in the innermost active realm.
    pub fn context(&self) -> &FetchContext {
        if let Some((_, realm)) = &self.project {
            return realm.context();
        }
        if let Some((_, realm)) = &self.account {
            return realm.context();
        }
        self.global.context()
    }

    /// Route a completion to whichever realm owns its pool.
    ///
    /// Completions for pools that no longer exist are dropped.
    pub fn deliver(&mut self, completion: Completion) -> Option<CacheEvent> {
        let completion = match &mut self.project {
            Some((_, realm)) => match realm.deliver(completion) {
                Ok(event) => return event,
                Err(completion) => completion,
            },
            None => completion,
        };
        let completion = match &mut self.account {
            Some((_, realm)) => match realm.deliver(completion) {
                Ok(event) => return event,
                Err(completion) => completion,
            },
            None => completion,
        };
        match self.global.deliver(completion) {
            Ok(event) => event,
            Err(completion) => {
                tracing::debug!(key = %completion.key(), "dropping completion for unknown pool");
                None
            }
        }
    }

    /// Mark every pool in every realm stale.
    pub fn invalidate_all(&mut self) {
        self.global.invalidate();
        if let Some((_, realm)) = &mut self.account {
            realm.invalidate();
        }
        if let Some((_, realm)) = &mut self.project {
            realm.invalidate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::fetcher_fn;
    use crate::pool::{Pool, PoolConfig};
    use camper_core::CamperError;

    fn todo_pool(key: &str) -> Pool<Vec<u32>> {
        Pool::new(
            key,
            PoolConfig::new(),
            fetcher_fn(|_ctx| async { Ok::<_, CamperError>(vec![1, 2, 3]) }),
        )
    }

    #[test]
    fn test_ensure_project_reuses_realm() {
        let mut session = Session::new();
        session.ensure_account("1");
        session
            .ensure_project(10)
            .pool("todos", || todo_pool("todos"))
            .expect("new pool")
            .set(vec![1]);

        assert!(session.ensure_project(10).contains("todos"));
    }

    #[test]
    fn test_switching_project_tears_down_old_realm() {
        let mut session = Session::new();
        session.ensure_account("1");
        session
            .ensure_project(10)
            .pool("todos", || todo_pool("todos"))
            .expect("new pool");
        let old_ctx = session.context().clone();

        let realm = session.ensure_project(11);
        assert!(!realm.contains("todos"));
        assert!(old_ctx.is_canceled());
        assert_eq!(session.project_id(), Some(11));
    }

    #[test]
    fn test_switching_account_tears_down_project() {
        let mut session = Session::new();
        session.ensure_account("1");
        session.ensure_project(10);
        let project_ctx = session.context().clone();

        session.ensure_account("2");
        assert!(project_ctx.is_canceled());
        assert_eq!(session.project_id(), None);
        assert_eq!(session.account_id(), Some("2"));
    }

    #[test]
    fn test_project_context_is_child_of_account() {
        let mut session = Session::new();
        let account_ctx = session.ensure_account("1").context().clone();
        let project_ctx = session.ensure_project(10).context().clone();

        account_ctx.cancel();
        assert!(project_ctx.is_canceled());
    }

    #[tokio::test]
    async fn test_completion_after_leave_is_dropped() {
        let mut session = Session::new();
        session.ensure_account("1");
        let realm = session.ensure_project(10);
        let ctx = realm.context().clone();
        let task = realm
            .pool("todos", || todo_pool("todos"))
            .expect("new pool")
            .fetch(&ctx)
            .expect("fetch should start");

        session.leave_project();
        let completion = task.into_completion().await;
        assert!(session.deliver(completion).is_none());
    }

    #[tokio::test]
    async fn test_deliver_reaches_global_realm() {
        let mut session = Session::new();
        session.ensure_account("1");
        let ctx = session.global().context().clone();
        let task = session
            .global()
            .pool("accounts", || todo_pool("accounts"))
            .expect("new pool")
            .fetch(&ctx)
            .expect("fetch should start");

        let event = session.deliver(task.into_completion().await);
        assert!(matches!(event, Some(CacheEvent::PoolUpdated { .. })));
    }

    #[test]
    fn test_shutdown_cancels_everything() {
        let mut session = Session::new();
        let global_ctx = session.global().context().clone();
        session.ensure_account("1");
        session.ensure_project(10);

        session.shutdown();
        assert!(global_ctx.is_canceled());
        assert_eq!(session.account_id(), None);
        assert_eq!(session.project_id(), None);
        assert!(!session.context().is_canceled());
    }
}
