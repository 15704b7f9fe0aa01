//! Typed access to every pool the screens read.
//!
//! The hub owns the cache [`Session`] and knows how to build each pool:
//! its key, its realm, and the REST call behind its fetcher. Screens ask
//! the hub for a pool by record ids and never construct one themselves.

use crate::api_client::RestClient;
use crate::config::TuiConfig;
use camper_cache::{
    fetcher_fn, CacheEvent, Completion, FetchContext, KeyedPool, MetricsSummary, MutatingPool,
    Pool, PoolConfig, PoolMetrics, Poller, Session,
};
use camper_core::{
    AccountInfo, CamperResult, CheckinAnswerInfo, CheckinQuestionInfo, RecordId, RemoteError,
    ScheduleEntryInfo, TodoInfo,
};
use std::sync::Arc;

pub struct Hub {
    session: Session,
    client: Arc<RestClient>,
    pool_config: PoolConfig,
    accounts: Vec<AccountInfo>,
    metrics: PoolMetrics,
    poller: Poller,
}

impl Hub {
    pub fn new(config: &TuiConfig, client: Arc<RestClient>) -> Self {
        Self {
            session: Session::new(),
            client,
            pool_config: config.pool_config(),
            accounts: config.accounts(),
            metrics: PoolMetrics::new(),
            poller: Poller::new(),
        }
    }

    pub fn client(&self) -> Arc<RestClient> {
        Arc::clone(&self.client)
    }

    pub fn accounts(&self) -> &[AccountInfo] {
        &self.accounts
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut PoolMetrics {
        &mut self.metrics
    }

    pub fn summary(&self) -> MetricsSummary {
        self.metrics.summary()
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    pub fn poller_mut(&mut self) -> &mut Poller {
        &mut self.poller
    }

    // ========================================================================
    // SCOPE
    // ========================================================================

    /// Enter an account. Switching to another account drops every pool of
    /// the previous one.
    pub fn enter_account(&mut self, account_id: &str) -> CamperResult<()> {
        if !self.accounts.iter().any(|a| a.id == account_id) {
            return Err(RemoteError::UnknownAccount {
                account_id: account_id.to_string(),
            }
            .into());
        }
        if let Some(previous) = self.session.account_id() {
            if previous != account_id {
                self.forget_metrics();
            }
        }
        self.session.ensure_account(account_id);
        Ok(())
    }

    /// Context for work started by the current project screen.
    pub fn context(&self) -> FetchContext {
        self.session.context().clone()
    }

    /// Context for cross-account work such as search.
    pub fn global_context(&mut self) -> FetchContext {
        self.session.global().context().clone()
    }

    fn account_id(&self) -> CamperResult<String> {
        self.session.account_id().map(str::to_string).ok_or_else(|| {
            RemoteError::UnknownAccount {
                account_id: String::new(),
            }
            .into()
        })
    }

    // ========================================================================
    // POOLS
    // ========================================================================

    pub fn todos(
        &mut self,
        project_id: RecordId,
        todolist_id: RecordId,
    ) -> CamperResult<&mut MutatingPool<Vec<TodoInfo>>> {
        let account_id = self.account_id()?;
        let client = Arc::clone(&self.client);
        let config = self.pool_config.clone();
        let key = todos_key(project_id, todolist_id);
        let pool_key = key.clone();
        self.session.ensure_project(project_id).pool(&key, move || {
            MutatingPool::new(
                pool_key,
                config,
                fetcher_fn(move |_ctx| {
                    let client = Arc::clone(&client);
                    let account_id = account_id.clone();
                    async move { client.list_todos(&account_id, project_id, todolist_id).await }
                }),
            )
        })
    }

    pub fn schedule_entries(
        &mut self,
        project_id: RecordId,
        schedule_id: RecordId,
    ) -> CamperResult<&mut Pool<Vec<ScheduleEntryInfo>>> {
        let account_id = self.account_id()?;
        let client = Arc::clone(&self.client);
        let config = self.pool_config.clone();
        let key = schedule_key(project_id, schedule_id);
        let pool_key = key.clone();
        self.session.ensure_project(project_id).pool(&key, move || {
            Pool::new(
                pool_key,
                config,
                fetcher_fn(move |_ctx| {
                    let client = Arc::clone(&client);
                    let account_id = account_id.clone();
                    async move {
                        client
                            .list_schedule_entries(&account_id, project_id, schedule_id)
                            .await
                    }
                }),
            )
        })
    }

    pub fn checkins(
        &mut self,
        project_id: RecordId,
        questionnaire_id: RecordId,
    ) -> CamperResult<&mut Pool<Vec<CheckinQuestionInfo>>> {
        let account_id = self.account_id()?;
        let client = Arc::clone(&self.client);
        let config = self.pool_config.clone();
        let key = checkins_key(project_id, questionnaire_id);
        let pool_key = key.clone();
        self.session.ensure_project(project_id).pool(&key, move || {
            Pool::new(
                pool_key,
                config,
                fetcher_fn(move |_ctx| {
                    let client = Arc::clone(&client);
                    let account_id = account_id.clone();
                    async move {
                        client
                            .list_checkin_questions(&account_id, project_id, questionnaire_id)
                            .await
                    }
                }),
            )
        })
    }

    /// Answers to one question. All questions of a project share one keyed pool.
    pub fn checkin_answers(
        &mut self,
        project_id: RecordId,
        question_id: RecordId,
    ) -> CamperResult<&mut Pool<Vec<CheckinAnswerInfo>>> {
        let account_id = self.account_id()?;
        let client = Arc::clone(&self.client);
        let config = self.pool_config.clone();
        let key = answers_family_key(project_id);
        let family = self.session.ensure_project(project_id).pool(&key, move || {
            KeyedPool::new(answers_family_key(project_id), move |question_id: &RecordId| {
                let question_id = *question_id;
                let client = Arc::clone(&client);
                let account_id = account_id.clone();
                Pool::new(
                    answers_key(project_id, question_id),
                    config.clone(),
                    fetcher_fn(move |_ctx| {
                        let client = Arc::clone(&client);
                        let account_id = account_id.clone();
                        async move {
                            client
                                .list_checkin_answers(&account_id, project_id, question_id)
                                .await
                        }
                    }),
                )
            })
        })?;
        Ok(family.get(&question_id))
    }

    // ========================================================================
    // LOOP PLUMBING
    // ========================================================================

    /// Apply a finished fetch or mutation and report what changed.
    pub fn deliver(&mut self, completion: Completion) -> Option<CacheEvent> {
        self.metrics.record_completion(&completion);
        self.session.deliver(completion)
    }

    pub fn invalidate_all(&mut self) {
        self.session.invalidate_all();
    }

    /// Cancel all in-flight work and drop every pool.
    pub fn shutdown(&mut self) {
        self.session.shutdown();
        tracing::info!("hub shut down");
    }

    /// Drop stats for every pool outside the global realm.
    fn forget_metrics(&mut self) {
        let global = self.session.global();
        self.metrics.retain_stats(|key| global.contains(key));
    }
}

pub fn todos_key(project_id: RecordId, todolist_id: RecordId) -> String {
    format!("todos:{project_id}:{todolist_id}")
}

pub fn schedule_key(project_id: RecordId, schedule_id: RecordId) -> String {
    format!("schedule-entries:{project_id}:{schedule_id}")
}

pub fn checkins_key(project_id: RecordId, questionnaire_id: RecordId) -> String {
    format!("checkins:{project_id}:{questionnaire_id}")
}

pub fn answers_family_key(project_id: RecordId) -> String {
    format!("checkin-answers:{project_id}")
}

pub fn answers_key(project_id: RecordId, question_id: RecordId) -> String {
    format!("checkin-answers:{project_id}:{question_id}")
}
