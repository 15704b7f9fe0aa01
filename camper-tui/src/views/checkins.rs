//! Automatic check-ins: questions on the left, answers and composer on the right.

use crate::state::App;
use crate::views::{list_block, placeholder, render_placeholder};
use crate::widgets::InputBar;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    render_questions(f, app, chunks[0]);

    if app.checkins.composer.is_some() {
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(chunks[1]);
        render_answers(f, app, right[0]);
        render_composer(f, app, right[1]);
    } else {
        render_answers(f, app, chunks[1]);
    }
}

fn render_questions(f: &mut Frame<'_>, app: &App, area: Rect) {
    let snap = &app.checkins.questions;
    let block = list_block("Check-ins", snap, app);
    if let Some(message) = placeholder(snap, "questions") {
        render_placeholder(f, block, message, app, area);
        return;
    }

    let questions = snap.data().map(Vec::as_slice).unwrap_or_default();
    let items: Vec<ListItem> = questions
        .iter()
        .map(|q| {
            let style = if q.paused {
                Style::default().fg(app.theme.text_dim)
            } else {
                Style::default().fg(app.theme.text)
            };
            ListItem::new(Line::from(vec![
                Span::styled(q.title.clone(), style),
                Span::styled(
                    format!("  ({}, {} answers)", q.frequency, q.answers_count),
                    Style::default().fg(app.theme.text_dim),
                ),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    if let Some(selected) = app.checkins.selected {
        state.select(questions.iter().position(|q| q.id == selected));
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().fg(app.theme.primary).bg(app.theme.bg_highlight));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_answers(f: &mut Frame<'_>, app: &App, area: Rect) {
    let snap = &app.checkins.answers;
    let block = list_block("Answers", snap, app);
    if let Some(message) = placeholder(snap, "answers") {
        render_placeholder(f, block, message, app, area);
        return;
    }

    let items: Vec<ListItem> = snap
        .data()
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .map(|answer| {
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(
                        answer.author.clone(),
                        Style::default()
                            .fg(app.theme.secondary)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  {}", answer.created_at.format("%b %d %H:%M")),
                        Style::default().fg(app.theme.text_dim),
                    ),
                ]),
                Line::from(answer.content.clone()),
            ])
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

fn render_composer(f: &mut Frame<'_>, app: &App, area: Rect) {
    let title = if app.checkins.submit.in_flight() {
        "Posting… (Esc to cancel)"
    } else {
        "Your answer"
    };
    InputBar {
        title,
        value: app.checkins.composer.as_deref().unwrap_or_default(),
        placeholder: "Type an answer and press Enter",
        style: Style::default().fg(app.theme.text),
        placeholder_style: Style::default().fg(app.theme.text_dim),
        focused: !app.checkins.submit.in_flight(),
    }
    .render(f, area);
}
