//! View rendering dispatch.

pub mod checkins;
pub mod schedule;
pub mod search;
pub mod todos;

use crate::nav::View;
use crate::notifications::NotificationLevel;
use crate::state::App;
use crate::theme::notification_color;
use crate::widgets::{PoolBadge, StatusLine};
use camper_cache::{Snapshot, SnapshotState};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Frame,
};

pub fn render_view(f: &mut Frame<'_>, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(f.size());

    render_header(f, app, layout[0]);

    match app.active_view {
        View::Todos => todos::render(f, app, layout[1]),
        View::Schedule => schedule::render(f, app, layout[1]),
        View::Checkins => checkins::render(f, app, layout[1]),
        View::Search => search::render(f, app, layout[1]),
    }

    render_footer(f, app, layout[2]);

    let summary = app.hub.summary();
    StatusLine {
        badge: active_badge(app),
        summary: &summary,
        theme: &app.theme,
    }
    .render(f, layout[3]);

    if let Some(modal) = &app.modal {
        render_modal(f, app, &modal.title, &modal.message);
    }
}

fn active_badge(app: &App) -> Option<PoolBadge> {
    match app.active_view {
        View::Todos => Some(PoolBadge::from_snapshot(&app.todos.snapshot)),
        View::Schedule => Some(PoolBadge::from_snapshot(&app.schedule.snapshot)),
        View::Checkins => Some(PoolBadge::from_snapshot(&app.checkins.questions)),
        View::Search => None,
    }
}

fn render_header(f: &mut Frame<'_>, app: &App, area: Rect) {
    let titles: Vec<Line> = View::all()
        .iter()
        .map(|view| Line::from(format!("{} {}", view.index() + 1, view.title())))
        .collect();
    let account = app
        .hub
        .accounts()
        .iter()
        .find(|a| a.id == app.config.scope.account_id)
        .map(|a| a.name.as_str())
        .unwrap_or("no account");

    let tabs = Tabs::new(titles)
        .select(app.active_view.index())
        .style(Style::default().fg(app.theme.text_dim))
        .highlight_style(
            Style::default()
                .fg(app.theme.primary)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().borders(Borders::ALL).title(Span::styled(
            format!("CAMPER | {}", account),
            Style::default().fg(app.theme.primary),
        )));
    f.render_widget(tabs, area);
}

fn render_footer(f: &mut Frame<'_>, app: &App, area: Rect) {
    let help = match app.active_view {
        View::Todos => "j/k move • space toggle • d d trash • r refresh • ? help • q quit",
        View::Schedule => "j/k move • r refresh • Tab switch view • ? help • q quit",
        View::Checkins if app.checkins.composer.is_some() => "Enter post • Esc cancel",
        View::Checkins => "j/k question • n answer • r refresh • ? help • q quit",
        View::Search => "type to search • Enter search now • Esc clear • Tab switch view",
    };
    let (text, style) = if let Some(note) = app.notifications.latest() {
        let label = match note.level {
            NotificationLevel::Info => "INFO",
            NotificationLevel::Warning => "WARN",
            NotificationLevel::Error => "ERROR",
            NotificationLevel::Success => "OK",
        };
        (
            format!("{}: {}", label, note.message),
            Style::default().fg(notification_color(note.level, &app.theme)),
        )
    } else {
        (help.to_string(), Style::default().fg(app.theme.text_dim))
    };
    let footer = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL))
        .style(style);
    f.render_widget(footer, area);
}

fn render_modal(f: &mut Frame<'_>, app: &App, title: &str, message: &str) {
    let area = centered(f.size(), 60, 20);
    f.render_widget(Clear, area);
    let paragraph = Paragraph::new(message.to_string())
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(app.theme.text))
        .block(
            Block::default()
                .title(title.to_string())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border_focus)),
        );
    f.render_widget(paragraph, area);
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

/// Text to show in place of a list that has nothing to render yet.
///
/// Returns `None` once the snapshot holds data, even if that data is stale or
/// the last refresh failed: old data is always better than a blank screen.
pub fn placeholder<T>(snap: &Snapshot<T>, noun: &str) -> Option<String> {
    if snap.has_data() {
        return None;
    }
    Some(match (snap.state(), snap.error()) {
        (SnapshotState::Error, Some(err)) => format!("Could not load {noun}: {err}"),
        (SnapshotState::Loading, _) => format!("Loading {noun}…"),
        _ => format!("No {noun} loaded"),
    })
}

/// Bordered list block whose title carries the pool state.
pub fn list_block<'a, T>(title: &'a str, snap: &Snapshot<T>, app: &App) -> Block<'a> {
    let badge = PoolBadge::from_snapshot(snap);
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border))
        .title(Line::from(vec![
            Span::styled(format!("{} ", title), Style::default().fg(app.theme.text)),
            badge.span(&app.theme),
        ]))
}

pub fn render_placeholder(f: &mut Frame<'_>, block: Block<'_>, message: String, app: &App, area: Rect) {
    let paragraph = Paragraph::new(message)
        .style(Style::default().fg(app.theme.text_dim))
        .wrap(Wrap { trim: true })
        .block(block);
    f.render_widget(paragraph, area);
}
