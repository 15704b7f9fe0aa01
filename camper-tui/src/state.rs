//! Application state and the event handlers that drive it.
//!
//! Every handler returns the [`Command`]s the event loop should run next.
//! Handlers never block and never await; remote work leaves as a command
//! and comes back later as a [`TuiEvent`].

use crate::api_client::RestClient;
use crate::config::TuiConfig;
use crate::events::TuiEvent;
use crate::hub::{self, Hub};
use crate::keys::{map_key, map_text_key, Action, TextInput};
use crate::mutations::{TodoCompleteMutation, TodoTarget, TodoTrashMutation};
use crate::nav::View;
use crate::notifications::{NotificationLevel, Notifications};
use crate::theme::CamperTheme;
use camper_cache::{
    fan_out, merge, snapshot_quality, CacheEvent, Completion, ConfirmGuard, ConfirmStep,
    Debouncer, FanOutStatus, FanOutSummary, FetchContext, FetchTask, Generation, Snapshot,
    SubmitGuard, SubmitResolution, Ticket,
};
use camper_core::{
    AccountInfo, CacheError, CamperError, CamperResult, CheckinAnswerInfo, CheckinQuestionInfo,
    RecordId, ScheduleEntryInfo, SearchResultInfo, TodoInfo,
};
use crossterm::event::KeyEvent;
use futures_util::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Work for the event loop.
pub enum Command {
    /// Run in the background and feed the result back as an event.
    Spawn(BoxFuture<'static, TuiEvent>),
    /// Deliver the event after the delay.
    After(Duration, TuiEvent),
}

impl Command {
    fn completion(future: BoxFuture<'static, Completion>) -> Self {
        Command::Spawn(future.map(TuiEvent::Cache).boxed())
    }

    fn fetch<T: Send + 'static>(task: Option<FetchTask<T>>) -> Option<Self> {
        task.map(|task| Self::completion(task.into_completion()))
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Spawn(_) => f.write_str("Spawn(..)"),
            Command::After(delay, event) => f.debug_tuple("After").field(delay).field(event).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Modal {
    pub title: String,
    pub message: String,
}

// ============================================================================
// VIEW STATE
// ============================================================================

#[derive(Debug, Default)]
pub struct TodosViewState {
    pub snapshot: Snapshot<Vec<TodoInfo>>,
    pub selected: Option<RecordId>,
}

impl TodosViewState {
    pub fn selected_todo(&self) -> Option<&TodoInfo> {
        let id = self.selected?;
        self.snapshot.data()?.iter().find(|t| t.id == id)
    }
}

#[derive(Debug, Default)]
pub struct ScheduleViewState {
    pub snapshot: Snapshot<Vec<ScheduleEntryInfo>>,
    pub selected: Option<RecordId>,
}

#[derive(Debug, Default)]
pub struct CheckinsViewState {
    pub questions: Snapshot<Vec<CheckinQuestionInfo>>,
    pub answers: Snapshot<Vec<CheckinAnswerInfo>>,
    pub selected: Option<RecordId>,
    /// Draft answer while the composer is open.
    pub composer: Option<String>,
    pub submit: SubmitGuard,
}

#[derive(Debug)]
pub struct SearchViewState {
    pub input: String,
    /// Query the current results belong to.
    pub query: String,
    pub debouncer: Debouncer,
    pub generation: Generation,
    pub in_flight: Option<FetchContext>,
    pub results: Vec<SearchResultInfo>,
    pub selected: usize,
    pub failure: Option<String>,
}

impl SearchViewState {
    fn new(debounce: Duration) -> Self {
        Self {
            input: String::new(),
            query: String::new(),
            debouncer: Debouncer::new(debounce),
            generation: Generation::new(),
            in_flight: None,
            results: Vec::new(),
            selected: 0,
            failure: None,
        }
    }

    pub fn searching(&self) -> bool {
        self.in_flight.is_some()
    }
}

/// Data a poll started from, compared against what the poll brings back.
#[derive(Debug)]
enum PollBaseline {
    Todos(Option<Arc<Vec<TodoInfo>>>),
    Schedule(Option<Arc<Vec<ScheduleEntryInfo>>>),
    Checkins(Option<Arc<Vec<CheckinQuestionInfo>>>),
}

// ============================================================================
// APP
// ============================================================================

pub struct App {
    pub config: TuiConfig,
    pub theme: CamperTheme,
    pub hub: Hub,
    pub active_view: View,

    pub todos: TodosViewState,
    pub schedule: ScheduleViewState,
    pub checkins: CheckinsViewState,
    pub search: SearchViewState,

    pub trash_confirm: ConfirmGuard<RecordId>,
    pub notifications: Notifications,
    pub modal: Option<Modal>,
    pub should_quit: bool,

    polls: HashMap<View, PollBaseline>,
}

impl App {
    pub fn new(config: TuiConfig, client: Arc<RestClient>) -> Self {
        let hub = Hub::new(&config, client);
        let search = SearchViewState::new(Duration::from_millis(config.cache.search_debounce_ms));
        let trash_confirm = ConfirmGuard::new(Duration::from_millis(config.cache.confirm_window_ms));
        Self {
            config,
            theme: CamperTheme::campfire(),
            hub,
            active_view: View::Todos,
            todos: TodosViewState::default(),
            schedule: ScheduleViewState::default(),
            checkins: CheckinsViewState::default(),
            search,
            trash_confirm,
            notifications: Notifications::default(),
            modal: None,
            should_quit: false,
            polls: HashMap::new(),
        }
    }

    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.notifications.push(level, message);
    }

    /// Enter the configured account, register pollers and open the first view.
    pub fn start(&mut self) -> Vec<Command> {
        let account_id = self.config.scope.account_id.clone();
        if let Err(err) = self.hub.enter_account(&account_id) {
            self.report("open account", &err);
            return Vec::new();
        }

        let mut commands = Vec::new();
        for view in View::all() {
            if let Some(tag) = view.poll_tag() {
                let poll = self.config.poll_config(tag);
                let delay = poll.base;
                self.hub.poller_mut().add(poll);
                commands.push(Command::After(delay, TuiEvent::Poll(*view)));
            }
        }
        commands.extend(self.open_view(View::Todos));
        self.sync();
        commands
    }

    pub fn handle_event(&mut self, event: TuiEvent) -> Vec<Command> {
        let commands = match event {
            TuiEvent::Input(key) => self.handle_key(key),
            TuiEvent::Tick | TuiEvent::Resize { .. } => Vec::new(),
            TuiEvent::Cache(completion) => self.handle_completion(completion),
            TuiEvent::SearchDebounce { ticket, query } => self.handle_search_debounce(ticket, query),
            TuiEvent::SearchResults {
                ticket,
                query,
                summary,
            } => {
                self.handle_search_results(ticket, &query, summary);
                Vec::new()
            }
            TuiEvent::ConfirmExpired(ticket) => {
                if self.trash_confirm.expire(ticket) {
                    self.notify(NotificationLevel::Info, "Trash not confirmed");
                }
                Vec::new()
            }
            TuiEvent::AnswerSubmitted { ticket, result } => self.handle_answer_submitted(ticket, result),
            TuiEvent::Poll(view) => self.handle_poll(view),
        };
        self.sync();
        commands
    }

    // ========================================================================
    // INPUT
    // ========================================================================

    /// True while keystrokes go to a text field.
    pub fn text_focus(&self) -> bool {
        match self.active_view {
            View::Search => true,
            View::Checkins => self.checkins.composer.is_some(),
            View::Todos | View::Schedule => false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Command> {
        if self.modal.is_some() {
            self.modal = None;
            return Vec::new();
        }
        if self.text_focus() {
            return match map_text_key(key) {
                Some(input) => self.handle_text(input),
                None => Vec::new(),
            };
        }
        match map_key(key) {
            Some(action) => self.handle_action(action),
            None => Vec::new(),
        }
    }

    pub fn handle_action(&mut self, action: Action) -> Vec<Command> {
        if action != Action::DeleteItem {
            self.trash_confirm.reset();
        }
        match action {
            Action::Quit => {
                self.should_quit = true;
                Vec::new()
            }
            Action::NextView => self.open_view(self.active_view.next()),
            Action::PrevView => self.open_view(self.active_view.previous()),
            Action::SwitchView(index) => match View::from_index(index) {
                Some(view) => self.open_view(view),
                None => Vec::new(),
            },
            Action::MoveDown => self.move_selection(true),
            Action::MoveUp => self.move_selection(false),
            Action::Select => self.toggle_selected_todo(),
            Action::DeleteItem => self.trash_selected_todo(),
            Action::NewItem => {
                if self.active_view == View::Checkins && self.checkins.selected.is_some() {
                    self.checkins.composer = Some(String::new());
                }
                Vec::new()
            }
            Action::Refresh => self.fetch_view(self.active_view, true),
            Action::OpenHelp => {
                self.modal = Some(Modal {
                    title: "Keybindings".to_string(),
                    message: "j/k move • Tab switch view • space toggle todo • d d trash • \
                              n answer check-in • r refresh • q quit"
                        .to_string(),
                });
                Vec::new()
            }
            Action::Confirm => Vec::new(),
            Action::Cancel => {
                self.notifications.dismiss();
                Vec::new()
            }
        }
    }

    fn handle_text(&mut self, input: TextInput) -> Vec<Command> {
        if let TextInput::Escape(action) = input {
            return self.handle_action(action);
        }
        if self.active_view == View::Search {
            return self.handle_search_text(input);
        }
        self.handle_composer_text(input)
    }

    fn move_selection(&mut self, forward: bool) -> Vec<Command> {
        match self.active_view {
            View::Todos => {
                let items = self.todos.snapshot.data().map(Vec::as_slice).unwrap_or_default();
                step_selection(items, &mut self.todos.selected, forward);
                Vec::new()
            }
            View::Schedule => {
                let items = self.schedule.snapshot.data().map(Vec::as_slice).unwrap_or_default();
                step_selection(items, &mut self.schedule.selected, forward);
                Vec::new()
            }
            View::Checkins => {
                let items = self.checkins.questions.data().map(Vec::as_slice).unwrap_or_default();
                step_selection(items, &mut self.checkins.selected, forward);
                self.sync();
                self.fetch_answers(false).into_iter().collect()
            }
            View::Search => {
                let len = self.search.results.len();
                if len > 0 {
                    self.search.selected = if forward {
                        (self.search.selected + 1) % len
                    } else {
                        (self.search.selected + len - 1) % len
                    };
                }
                Vec::new()
            }
        }
    }

    // ========================================================================
    // NAVIGATION AND FETCHING
    // ========================================================================

    pub fn open_view(&mut self, view: View) -> Vec<Command> {
        for other in View::all() {
            if let Some(tag) = other.poll_tag() {
                self.hub.poller_mut().set_focused(tag, *other == view);
            }
        }
        self.active_view = view;
        self.sync();

        let quality = match view {
            View::Todos => snapshot_quality(&self.todos.snapshot),
            View::Schedule => snapshot_quality(&self.schedule.snapshot),
            View::Checkins => snapshot_quality(&self.checkins.questions),
            View::Search => 1.0,
        };
        self.hub.metrics_mut().record_navigation(view.title(), quality);
        tracing::debug!(view = view.title(), quality, "view opened");

        self.fetch_view(view, false)
    }

    /// Start fetches for the pools behind `view`. `force` ignores freshness.
    pub fn fetch_view(&mut self, view: View, force: bool) -> Vec<Command> {
        let ctx = self.hub.context();
        let scope = &self.config.scope;
        let started = match view {
            View::Todos => self
                .hub
                .todos(scope.project_id, scope.todolist_id)
                .map(|pool| Command::fetch(if force { pool.fetch(&ctx) } else { pool.fetch_if_stale(&ctx) })),
            View::Schedule => self
                .hub
                .schedule_entries(scope.project_id, scope.schedule_id)
                .map(|pool| Command::fetch(if force { pool.fetch(&ctx) } else { pool.fetch_if_stale(&ctx) })),
            View::Checkins => self
                .hub
                .checkins(scope.project_id, scope.questionnaire_id)
                .map(|pool| Command::fetch(if force { pool.fetch(&ctx) } else { pool.fetch_if_stale(&ctx) })),
            View::Search => {
                if force && !self.search.query.is_empty() {
                    let query = self.search.query.clone();
                    return vec![self.start_search(query)];
                }
                return Vec::new();
            }
        };

        let mut commands = Vec::new();
        match started {
            Ok(command) => commands.extend(command),
            Err(err) => self.report("load data", &err),
        }
        if view == View::Checkins {
            commands.extend(self.fetch_answers(force));
        }
        commands
    }

    fn fetch_answers(&mut self, force: bool) -> Option<Command> {
        let question_id = self.checkins.selected?;
        let ctx = self.hub.context();
        let project_id = self.config.scope.project_id;
        match self.hub.checkin_answers(project_id, question_id) {
            Ok(pool) => Command::fetch(if force { pool.fetch(&ctx) } else { pool.fetch_if_stale(&ctx) }),
            Err(err) => {
                self.report("load answers", &err);
                None
            }
        }
    }

    /// Copy the current snapshots out of the pools for rendering.
    pub fn sync(&mut self) {
        let scope = &self.config.scope;
        self.todos.snapshot = self
            .hub
            .todos(scope.project_id, scope.todolist_id)
            .map(|pool| pool.get())
            .unwrap_or_default();
        self.schedule.snapshot = self
            .hub
            .schedule_entries(scope.project_id, scope.schedule_id)
            .map(|pool| pool.get())
            .unwrap_or_default();
        self.checkins.questions = self
            .hub
            .checkins(scope.project_id, scope.questionnaire_id)
            .map(|pool| pool.get())
            .unwrap_or_default();

        keep_selection(
            self.todos.snapshot.data().map(Vec::as_slice).unwrap_or_default(),
            &mut self.todos.selected,
        );
        keep_selection(
            self.schedule.snapshot.data().map(Vec::as_slice).unwrap_or_default(),
            &mut self.schedule.selected,
        );
        keep_selection(
            self.checkins.questions.data().map(Vec::as_slice).unwrap_or_default(),
            &mut self.checkins.selected,
        );

        self.checkins.answers = match self.checkins.selected {
            Some(question_id) => self
                .hub
                .checkin_answers(scope.project_id, question_id)
                .map(|pool| pool.get())
                .unwrap_or_default(),
            None => Snapshot::default(),
        };
    }

    fn handle_completion(&mut self, completion: Completion) -> Vec<Command> {
        match self.hub.deliver(completion) {
            Some(CacheEvent::PoolUpdated { key }) => {
                self.sync();
                self.settle_poll(&key);
            }
            Some(CacheEvent::RefreshNeeded { key }) => {
                self.sync();
                self.settle_poll(&key);
                if let Some(view) = self.key_view(&key) {
                    return self.fetch_view(view, false);
                }
            }
            Some(CacheEvent::MutationFailed { key, error }) => {
                tracing::warn!(key = %key, error = %error, "mutation rolled back");
                self.notify(NotificationLevel::Error, format!("Could not update todo: {error}"));
            }
            None => {}
        }
        Vec::new()
    }

    // ========================================================================
    // POLLING
    // ========================================================================

    fn view_key(&self, view: View) -> Option<String> {
        let scope = &self.config.scope;
        match view {
            View::Todos => Some(hub::todos_key(scope.project_id, scope.todolist_id)),
            View::Schedule => Some(hub::schedule_key(scope.project_id, scope.schedule_id)),
            View::Checkins => Some(hub::checkins_key(scope.project_id, scope.questionnaire_id)),
            View::Search => None,
        }
    }

    fn handle_poll(&mut self, view: View) -> Vec<Command> {
        let Some(tag) = view.poll_tag() else {
            return Vec::new();
        };

        self.sync();
        let baseline = match view {
            View::Todos => PollBaseline::Todos(self.todos.snapshot.shared()),
            View::Schedule => PollBaseline::Schedule(self.schedule.snapshot.shared()),
            View::Checkins => PollBaseline::Checkins(self.checkins.questions.shared()),
            View::Search => return Vec::new(),
        };
        self.polls.insert(view, baseline);

        let mut commands = self.fetch_view(view, true);
        if let Some(interval) = self.hub.poller().interval(tag) {
            commands.push(Command::After(interval, TuiEvent::Poll(view)));
        }
        commands
    }

    fn key_view(&self, key: &str) -> Option<View> {
        View::all()
            .iter()
            .copied()
            .find(|v| self.view_key(*v).as_deref() == Some(key))
    }

    /// Compare a polled pool against its baseline and adjust its interval.
    fn settle_poll(&mut self, key: &str) {
        let Some(view) = self.key_view(key) else {
            return;
        };
        let Some(baseline) = self.polls.remove(&view) else {
            return;
        };
        let changed = match baseline {
            PollBaseline::Todos(before) => differs(before, &self.todos.snapshot),
            PollBaseline::Schedule(before) => differs(before, &self.schedule.snapshot),
            PollBaseline::Checkins(before) => differs(before, &self.checkins.questions),
        };
        if let Some(tag) = view.poll_tag() {
            if changed {
                self.hub.poller_mut().record_hit(tag);
            } else {
                self.hub.poller_mut().record_miss(tag);
            }
        }
    }

    // ========================================================================
    // TODOS
    // ========================================================================

    fn todo_target(&self, todo_id: RecordId) -> TodoTarget {
        TodoTarget {
            account_id: self.config.scope.account_id.clone(),
            project_id: self.config.scope.project_id,
            todo_id,
        }
    }

    /// Flip the selected todo at once; the server call follows.
    fn toggle_selected_todo(&mut self) -> Vec<Command> {
        if self.active_view != View::Todos {
            return Vec::new();
        }
        let Some(todo) = self.todos.selected_todo() else {
            return Vec::new();
        };
        let mutation = TodoCompleteMutation::new(
            self.hub.client(),
            self.todo_target(todo.id),
            !todo.completed,
        );
        self.apply_todo_mutation(mutation)
    }

    /// First press arms, a second press on the same todo inside the window trashes it.
    fn trash_selected_todo(&mut self) -> Vec<Command> {
        if self.active_view != View::Todos {
            return Vec::new();
        }
        let Some(todo) = self.todos.selected_todo() else {
            return Vec::new();
        };
        let (todo_id, content) = (todo.id, todo.content.clone());

        match self.trash_confirm.trigger(todo_id) {
            ConfirmStep::Armed { ticket, timeout } => {
                self.notify(
                    NotificationLevel::Warning,
                    format!("Press d again to trash \"{content}\""),
                );
                vec![Command::After(timeout, TuiEvent::ConfirmExpired(ticket))]
            }
            ConfirmStep::Fired(todo_id) => {
                let mutation = TodoTrashMutation::new(self.hub.client(), self.todo_target(todo_id));
                self.apply_todo_mutation(mutation)
            }
        }
    }

    fn apply_todo_mutation<M>(&mut self, mutation: M) -> Vec<Command>
    where
        M: camper_cache::Mutation<Vec<TodoInfo>> + 'static,
    {
        let ctx = self.hub.context();
        let scope = &self.config.scope;
        let applied = self
            .hub
            .todos(scope.project_id, scope.todolist_id)
            .and_then(|pool| pool.apply(&ctx, mutation));
        match applied {
            Ok(task) => vec![Command::completion(task.into_completion())],
            Err(CamperError::Cache(CacheError::NotUsable { .. })) => {
                self.notify(NotificationLevel::Warning, "Todos are still loading");
                Vec::new()
            }
            Err(err) => {
                self.report("update todo", &err);
                Vec::new()
            }
        }
    }

    // ========================================================================
    // SEARCH
    // ========================================================================

    fn handle_search_text(&mut self, input: TextInput) -> Vec<Command> {
        match input {
            TextInput::Insert(c) => self.search.input.push(c),
            TextInput::Backspace => {
                self.search.input.pop();
            }
            TextInput::Submit => {
                let query = self.search.input.trim().to_string();
                if query.is_empty() {
                    return Vec::new();
                }
                self.search.debouncer.cancel();
                return vec![self.start_search(query)];
            }
            TextInput::Cancel => {
                self.search.debouncer.cancel();
                if let Some(ctx) = self.search.in_flight.take() {
                    ctx.cancel();
                }
                self.search.generation.next();
                self.search.input.clear();
                self.search.query.clear();
                self.search.results.clear();
                self.search.failure = None;
                return Vec::new();
            }
            TextInput::Escape(_) => return Vec::new(),
        }

        let query = self.search.input.trim().to_string();
        if query.is_empty() || query == self.search.query {
            self.search.debouncer.cancel();
            return Vec::new();
        }
        let ticket = self.search.debouncer.schedule();
        vec![Command::After(
            self.search.debouncer.delay(),
            TuiEvent::SearchDebounce { ticket, query },
        )]
    }

    fn handle_search_debounce(&mut self, ticket: Ticket, query: String) -> Vec<Command> {
        if !self.search.debouncer.fire(ticket) || query == self.search.query {
            return Vec::new();
        }
        vec![self.start_search(query)]
    }

    /// Query every account at once. A newer search cancels this one.
    fn start_search(&mut self, query: String) -> Command {
        if let Some(previous) = self.search.in_flight.take() {
            previous.cancel();
        }
        let ctx = self.hub.global_context().child();
        self.search.in_flight = Some(ctx.clone());
        self.search.query = query.clone();
        let ticket = self.search.generation.next();

        let accounts: Vec<AccountInfo> = self.hub.accounts().to_vec();
        let client = self.hub.client();
        let cap = self.config.cache.search_result_cap;
        let max_concurrent = self.config.cache.max_concurrent;
        tracing::debug!(query = %query, accounts = accounts.len(), "search started");

        Command::Spawn(
            async move {
                let results = fan_out(&ctx, &accounts, max_concurrent, |account| {
                    let client = Arc::clone(&client);
                    let query = query.clone();
                    async move { client.search(&account, &query).await }
                })
                .await;
                let summary = merge(results, cap, |a, b| b.created_at.cmp(&a.created_at));
                TuiEvent::SearchResults {
                    ticket,
                    query,
                    summary,
                }
            }
            .boxed(),
        )
    }

    fn handle_search_results(&mut self, ticket: Ticket, query: &str, summary: FanOutSummary<SearchResultInfo>) {
        let Some(summary) = self.search.generation.accept(ticket, summary) else {
            tracing::debug!(query = %query, "dropping results of superseded search");
            return;
        };
        self.search.in_flight = None;
        self.search.results = summary.items;
        self.search.selected = 0;
        self.search.failure = summary.status.message("search");
        let level = match summary.status {
            FanOutStatus::Complete => return,
            FanOutStatus::Partial { .. } => NotificationLevel::Warning,
            FanOutStatus::Failed { .. } => NotificationLevel::Error,
        };
        if let Some(message) = self.search.failure.clone() {
            self.notify(level, message);
        }
    }

    // ========================================================================
    // CHECK-INS
    // ========================================================================

    fn handle_composer_text(&mut self, input: TextInput) -> Vec<Command> {
        let Some(draft) = self.checkins.composer.as_mut() else {
            return Vec::new();
        };
        match input {
            TextInput::Insert(c) => draft.push(c),
            TextInput::Backspace => {
                draft.pop();
            }
            TextInput::Submit => return self.submit_answer(),
            TextInput::Cancel => {
                if !self.checkins.submit.cancel() {
                    self.checkins.composer = None;
                }
            }
            TextInput::Escape(_) => {}
        }
        Vec::new()
    }

    fn submit_answer(&mut self) -> Vec<Command> {
        let Some(question_id) = self.checkins.selected else {
            return Vec::new();
        };
        let content = self
            .checkins
            .composer
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if content.is_empty() {
            self.notify(NotificationLevel::Warning, "Answer is empty");
            return Vec::new();
        }

        let parent = self.hub.context();
        let (ticket, ctx) = self.checkins.submit.begin(&parent);
        let client = self.hub.client();
        let account_id = self.config.scope.account_id.clone();
        let project_id = self.config.scope.project_id;

        vec![Command::Spawn(
            async move {
                let result = ctx
                    .run(client.create_checkin_answer(&account_id, project_id, question_id, &content))
                    .await;
                TuiEvent::AnswerSubmitted { ticket, result }
            }
            .boxed(),
        )]
    }

    fn handle_answer_submitted(
        &mut self,
        ticket: Ticket,
        result: CamperResult<CheckinAnswerInfo>,
    ) -> Vec<Command> {
        match self.checkins.submit.resolve(ticket, result) {
            SubmitResolution::Applied(answer) => {
                tracing::info!(answer_id = answer.id, "check-in answer posted");
                self.checkins.composer = None;
                self.notify(NotificationLevel::Success, "Answer posted");
                self.fetch_answers(true).into_iter().collect()
            }
            SubmitResolution::Failed(err) => {
                self.notify(NotificationLevel::Error, format!("Could not post answer: {err}"));
                Vec::new()
            }
            SubmitResolution::Canceled | SubmitResolution::Stale => Vec::new(),
        }
    }

    // ========================================================================
    // ERRORS
    // ========================================================================

    fn report(&mut self, action: &str, err: &CamperError) {
        if err.is_canceled() {
            return;
        }
        tracing::warn!(action, error = %err, "action failed");
        self.notify(NotificationLevel::Error, format!("Could not {action}: {err}"));
    }
}

fn differs<T: PartialEq>(before: Option<Arc<T>>, after: &Snapshot<T>) -> bool {
    before.as_deref() != after.data()
}

// ============================================================================
// SELECTION
// ============================================================================

trait HasRecordId {
    fn record_id(&self) -> RecordId;
}

impl HasRecordId for TodoInfo {
    fn record_id(&self) -> RecordId {
        self.id
    }
}

impl HasRecordId for ScheduleEntryInfo {
    fn record_id(&self) -> RecordId {
        self.id
    }
}

impl HasRecordId for CheckinQuestionInfo {
    fn record_id(&self) -> RecordId {
        self.id
    }
}

fn step_selection<T: HasRecordId>(items: &[T], selected: &mut Option<RecordId>, forward: bool) {
    if items.is_empty() {
        *selected = None;
        return;
    }
    let index = selected.and_then(|id| items.iter().position(|item| item.record_id() == id));
    let next = match (index, forward) {
        (None, _) => 0,
        (Some(i), true) => (i + 1) % items.len(),
        (Some(0), false) => items.len() - 1,
        (Some(i), false) => i - 1,
    };
    *selected = Some(items[next].record_id());
}

/// Keep the selection on an existing item, falling back to the first one.
fn keep_selection<T: HasRecordId>(items: &[T], selected: &mut Option<RecordId>) {
    let still_there = selected.is_some_and(|id| items.iter().any(|item| item.record_id() == id));
    if !still_there {
        *selected = items.first().map(HasRecordId::record_id);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn todo(id: RecordId) -> TodoInfo {
        TodoInfo {
            id,
            content: format!("todo {id}"),
            description: String::new(),
            completed: false,
            due_on: None,
            assignees: vec![],
            position: id as i32,
        }
    }

    #[test]
    fn test_step_selection_wraps() {
        let items = vec![todo(1), todo(2), todo(3)];
        let mut selected = None;
        step_selection(&items, &mut selected, true);
        assert_eq!(selected, Some(1));
        step_selection(&items, &mut selected, false);
        assert_eq!(selected, Some(3));
        step_selection(&items, &mut selected, true);
        assert_eq!(selected, Some(1));
    }

    #[test]
    fn test_keep_selection_falls_back_to_first() {
        let items = vec![todo(4), todo(5)];
        let mut selected = Some(9);
        keep_selection(&items, &mut selected);
        assert_eq!(selected, Some(4));

        let mut selected = Some(5);
        keep_selection(&items, &mut selected);
        assert_eq!(selected, Some(5));

        let mut selected = Some(5);
        keep_selection::<TodoInfo>(&[], &mut selected);
        assert_eq!(selected, None);
    }

    #[test]
    fn test_differs_compares_data() {
        let snap: Snapshot<Vec<u8>> = Snapshot::default();
        assert!(!differs(None, &snap));
        assert!(differs(Some(Arc::new(vec![1])), &snap));
    }
}
