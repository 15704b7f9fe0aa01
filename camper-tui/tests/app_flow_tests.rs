//! Screen flows driven through `App` without a terminal or network.
//!
//! Commands returned by the handlers are inspected, never run; remote
//! results are fed back by hand as events.

use camper_cache::{FanOutStatus, FanOutSummary, Generation, PoolEvent, PoolEventKind, SnapshotState};
use camper_core::{CheckinAnswerInfo, CheckinQuestionInfo};
use camper_test_utils::fixtures;
use camper_tui::api_client::RestClient;
use camper_tui::config::{
    AccountConfig, CacheConfig, PollIntervals, ScopeConfig, ThemeConfig, TuiConfig,
};
use camper_tui::events::TuiEvent;
use camper_tui::keys::Action;
use camper_tui::nav::View;
use camper_tui::notifications::NotificationLevel;
use camper_tui::state::{App, Command};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use std::time::Duration;

fn base_config() -> TuiConfig {
    TuiConfig {
        api_base_url: "http://localhost:8080".to_string(),
        user_agent: "camper-tests (dev@example.com)".to_string(),
        access_token: "test-token".to_string(),
        request_timeout_ms: 5_000,
        refresh_interval_ms: 250,
        log_path: "tmp/camper.log".into(),
        theme: ThemeConfig {
            name: "campfire".to_string(),
        },
        accounts: vec![
            AccountConfig {
                id: "1001".to_string(),
                name: "Acme".to_string(),
            },
            AccountConfig {
                id: "1002".to_string(),
                name: "Globex".to_string(),
            },
        ],
        scope: ScopeConfig {
            account_id: "1001".to_string(),
            project_id: 7,
            todolist_id: 8,
            schedule_id: 9,
            questionnaire_id: 10,
        },
        cache: CacheConfig {
            fresh_ttl_ms: 30_000,
            stale_ttl_ms: 0,
            search_debounce_ms: 400,
            confirm_window_ms: 3_000,
            search_result_cap: 50,
            max_concurrent: 5,
        },
        poll: PollIntervals {
            base_ms: 30_000,
            background_ms: 120_000,
            max_ms: 300_000,
        },
    }
}

fn started_app() -> App {
    let config = base_config();
    let client = Arc::new(RestClient::new(&config).expect("client builds"));
    let mut app = App::new(config, client);
    app.start();
    app
}

/// App on the todo view with three open todos cached and the first selected.
fn app_with_todos() -> App {
    let mut app = started_app();
    app.hub
        .todos(7, 8)
        .expect("todo pool")
        .set(fixtures::todo_list());
    app.handle_event(TuiEvent::Tick);
    app
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn latest_level(app: &App) -> Option<NotificationLevel> {
    app.notifications.latest().map(|n| n.level)
}

fn question(id: i64, title: &str) -> CheckinQuestionInfo {
    CheckinQuestionInfo {
        id,
        title: title.to_string(),
        paused: false,
        answers_count: 0,
        frequency: "every_day".to_string(),
    }
}

// ============================================================================
// STARTUP
// ============================================================================

#[test]
fn start_schedules_polls_and_loads_todos() {
    let config = base_config();
    let client = Arc::new(RestClient::new(&config).expect("client builds"));
    let mut app = App::new(config, client);
    let commands = app.start();

    let polls: Vec<View> = commands
        .iter()
        .filter_map(|c| match c {
            Command::After(delay, TuiEvent::Poll(view)) => {
                assert_eq!(*delay, Duration::from_millis(30_000));
                Some(*view)
            }
            _ => None,
        })
        .collect();
    assert_eq!(polls, vec![View::Todos, View::Schedule, View::Checkins]);

    let spawns = commands.iter().filter(|c| matches!(c, Command::Spawn(_))).count();
    assert_eq!(spawns, 1);
    assert_eq!(app.active_view, View::Todos);
    assert_eq!(app.todos.snapshot.state(), SnapshotState::Loading);
}

#[test]
fn unknown_account_is_reported() {
    let mut config = base_config();
    config.scope.account_id = "9999".to_string();
    let client = Arc::new(RestClient::new(&config).expect("client builds"));
    let mut app = App::new(config, client);

    assert!(app.start().is_empty());
    assert_eq!(latest_level(&app), Some(NotificationLevel::Error));
}

// ============================================================================
// TODOS
// ============================================================================

#[test]
fn toggle_shows_before_server_answers() {
    let mut app = app_with_todos();
    assert_eq!(app.todos.selected, Some(1));

    let commands = app.handle_key(key(KeyCode::Char(' ')));
    assert!(matches!(commands.as_slice(), [Command::Spawn(_)]));

    app.sync();
    let first = app.todos.selected_todo().expect("selection kept");
    assert!(first.completed);
}

#[test]
fn trash_needs_two_presses() {
    let mut app = app_with_todos();

    let commands = app.handle_action(Action::DeleteItem);
    match commands.as_slice() {
        [Command::After(delay, TuiEvent::ConfirmExpired(_))] => {
            assert_eq!(*delay, Duration::from_millis(3_000));
        }
        other => panic!("expected confirm timer, got {:?}", other),
    }
    assert_eq!(app.trash_confirm.armed_target(), Some(&1));
    assert_eq!(latest_level(&app), Some(NotificationLevel::Warning));

    let commands = app.handle_action(Action::DeleteItem);
    assert!(matches!(commands.as_slice(), [Command::Spawn(_)]));
    assert!(!app.trash_confirm.is_armed());

    app.sync();
    let ids: Vec<i64> = app
        .todos
        .snapshot
        .data()
        .map(|todos| todos.iter().map(|t| t.id).collect())
        .unwrap_or_default();
    assert_eq!(ids, vec![2, 3]);
}

#[test]
fn other_key_disarms_trash() {
    let mut app = app_with_todos();
    app.handle_action(Action::DeleteItem);
    assert!(app.trash_confirm.is_armed());

    app.handle_action(Action::MoveDown);
    assert!(!app.trash_confirm.is_armed());
    assert_eq!(app.todos.selected, Some(2));

    let commands = app.handle_action(Action::DeleteItem);
    assert!(matches!(commands.as_slice(), [Command::After(..)]));
    assert_eq!(app.trash_confirm.armed_target(), Some(&2));
}

#[test]
fn confirm_timeout_disarms() {
    let mut app = app_with_todos();
    let commands = app.handle_action(Action::DeleteItem);
    let Some(Command::After(_, TuiEvent::ConfirmExpired(ticket))) = commands.into_iter().next() else {
        panic!("expected confirm timer");
    };

    app.handle_event(TuiEvent::ConfirmExpired(ticket));
    assert!(!app.trash_confirm.is_armed());
    assert_eq!(
        app.notifications.latest().map(|n| n.message.as_str()),
        Some("Trash not confirmed")
    );
}

#[test]
fn stale_confirm_timer_is_ignored() {
    let mut app = app_with_todos();
    let first = app.handle_action(Action::DeleteItem);
    let Some(Command::After(_, TuiEvent::ConfirmExpired(old_ticket))) = first.into_iter().next() else {
        panic!("expected confirm timer");
    };
    app.handle_action(Action::MoveDown);
    app.handle_action(Action::DeleteItem);

    app.handle_event(TuiEvent::ConfirmExpired(old_ticket));
    assert_eq!(app.trash_confirm.armed_target(), Some(&2));
}

// ============================================================================
// SEARCH
// ============================================================================

#[test]
fn typing_debounces_search() {
    let mut app = started_app();
    app.handle_action(Action::SwitchView(3));
    assert!(app.text_focus());

    let first = app.handle_key(key(KeyCode::Char('r')));
    let second = app.handle_key(key(KeyCode::Char('e')));
    let (Some(Command::After(delay, TuiEvent::SearchDebounce { ticket: t1, query: q1 })),
         Some(Command::After(_, TuiEvent::SearchDebounce { ticket: t2, query: q2 }))) =
        (first.into_iter().next(), second.into_iter().next())
    else {
        panic!("expected debounce timers");
    };
    assert_eq!(delay, Duration::from_millis(400));
    assert_eq!(q2, "re");

    assert!(app
        .handle_event(TuiEvent::SearchDebounce { ticket: t1, query: q1 })
        .is_empty());
    assert!(!app.search.searching());

    let commands = app.handle_event(TuiEvent::SearchDebounce { ticket: t2, query: q2 });
    assert!(matches!(commands.as_slice(), [Command::Spawn(_)]));
    assert!(app.search.searching());
    assert_eq!(app.search.query, "re");
}

#[test]
fn superseded_search_results_are_dropped() {
    let mut app = started_app();
    app.handle_action(Action::SwitchView(3));
    let accounts = fixtures::accounts();
    let now = chrono::Utc::now();

    let old = app.search.generation.next();
    let current = app.search.generation.next();

    app.handle_event(TuiEvent::SearchResults {
        ticket: old,
        query: "old".to_string(),
        summary: FanOutSummary {
            items: vec![fixtures::search_result(1, &accounts[0], now)],
            status: FanOutStatus::Complete,
        },
    });
    assert!(app.search.results.is_empty());

    app.handle_event(TuiEvent::SearchResults {
        ticket: current,
        query: "new".to_string(),
        summary: FanOutSummary {
            items: vec![fixtures::search_result(2, &accounts[0], now)],
            status: FanOutStatus::Partial {
                failed: vec!["Globex".to_string()],
            },
        },
    });
    assert_eq!(app.search.results.len(), 1);
    assert_eq!(app.search.results[0].id, 2);
    assert_eq!(app.search.failure.as_deref(), Some("could not search: Globex"));
    assert_eq!(latest_level(&app), Some(NotificationLevel::Warning));
}

#[test]
fn escape_clears_search() {
    let mut app = started_app();
    app.handle_action(Action::SwitchView(3));
    app.handle_key(key(KeyCode::Char('x')));
    app.handle_key(key(KeyCode::Enter));
    assert!(app.search.searching());

    app.handle_key(key(KeyCode::Esc));
    assert!(!app.search.searching());
    assert!(app.search.input.is_empty());
    assert!(app.search.query.is_empty());
}

// ============================================================================
// CHECK-INS
// ============================================================================

fn app_with_composer() -> App {
    let mut app = started_app();
    app.hub
        .checkins(7, 10)
        .expect("checkins pool")
        .set(vec![question(11, "What did you work on?"), question(12, "Any blockers?")]);
    app.handle_action(Action::SwitchView(2));
    app.handle_event(TuiEvent::Tick);
    assert_eq!(app.checkins.selected, Some(11));

    app.handle_action(Action::NewItem);
    for ch in "Shipped it".chars() {
        app.handle_key(key(KeyCode::Char(ch)));
    }
    app
}

fn answer() -> CheckinAnswerInfo {
    CheckinAnswerInfo {
        id: 99,
        author: "Ada".to_string(),
        content: "Shipped it".to_string(),
        created_at: chrono::Utc::now(),
    }
}

#[test]
fn answer_submit_applies() {
    let mut app = app_with_composer();
    assert_eq!(app.checkins.composer.as_deref(), Some("Shipped it"));

    let commands = app.handle_key(key(KeyCode::Enter));
    assert!(matches!(commands.as_slice(), [Command::Spawn(_)]));
    assert!(app.checkins.submit.in_flight());

    // First ticket a fresh guard hands out.
    let ticket = Generation::new().next();
    app.handle_event(TuiEvent::AnswerSubmitted {
        ticket,
        result: Ok(answer()),
    });
    assert!(app.checkins.composer.is_none());
    assert!(!app.checkins.submit.in_flight());
    assert_eq!(latest_level(&app), Some(NotificationLevel::Success));
}

#[test]
fn canceled_submit_is_silent() {
    let mut app = app_with_composer();
    app.handle_key(key(KeyCode::Enter));
    let before = app.notifications.len();

    app.handle_key(key(KeyCode::Esc));
    assert!(!app.checkins.submit.in_flight());
    assert!(app.checkins.composer.is_some());

    let ticket = Generation::new().next();
    app.handle_event(TuiEvent::AnswerSubmitted {
        ticket,
        result: Ok(answer()),
    });
    assert_eq!(app.notifications.len(), before);
    assert!(app.checkins.composer.is_some());

    app.handle_key(key(KeyCode::Esc));
    assert!(app.checkins.composer.is_none());
}

#[test]
fn failed_submit_keeps_draft() {
    let mut app = app_with_composer();
    app.handle_key(key(KeyCode::Enter));

    let ticket = Generation::new().next();
    app.handle_event(TuiEvent::AnswerSubmitted {
        ticket,
        result: Err(fixtures::server_error("/answers.json")),
    });
    assert_eq!(app.checkins.composer.as_deref(), Some("Shipped it"));
    assert_eq!(latest_level(&app), Some(NotificationLevel::Error));
}

// ============================================================================
// POLLING
// ============================================================================

#[test]
fn poll_reschedules_itself() {
    let mut app = app_with_todos();
    let commands = app.handle_event(TuiEvent::Poll(View::Todos));

    assert!(commands
        .iter()
        .any(|c| matches!(c, Command::After(d, TuiEvent::Poll(View::Todos)) if *d == Duration::from_millis(30_000))));
}

#[test]
fn search_is_never_polled() {
    let mut app = started_app();
    assert!(app.handle_event(TuiEvent::Poll(View::Search)).is_empty());
}

fn fetched(key: &str) -> PoolEvent {
    PoolEvent {
        at: chrono::Utc::now(),
        key: key.to_string(),
        kind: PoolEventKind::FetchComplete,
        duration: Duration::from_millis(20),
    }
}

#[test]
fn switching_account_forgets_every_pool_stat() {
    let mut app = started_app();
    app.hub.metrics_mut().record(fetched("todos:7:8"));
    // Push the todo event out of the event ring.
    for _ in 0..150 {
        app.hub.metrics_mut().record(fetched("schedule-entries:7:9"));
    }
    assert_eq!(app.hub.summary().active_pools, 2);

    app.hub.enter_account("1002").expect("known account");
    assert_eq!(app.hub.summary().active_pools, 0);
    assert!(app.hub.metrics().stats("todos:7:8").is_none());
}
